//! End-to-end planning of a shipment queue.
//!
//! Packs an immutable snapshot of the queue, resolves every shipment's route
//! concurrently, estimates costs and merges everything into a [`LoadReport`].

use std::collections::HashMap;

use tracing::info;

use crate::cost::{CostConfig, CostEstimate, estimate};
use crate::model::{Container, Shipment, ShipmentId, ValidationError, validate_queue};
use crate::packing::{PackingConfig, pack_with_config};
use crate::report::{LoadReport, ReportOptions, build_report};
use crate::route::{LookupOptions, RouteError, RouteInfo, RouteProvider, lookup_routes};

/// Every parameter of a planning run besides the container and the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlanSettings {
    pub packing: PackingConfig,
    pub cost: CostConfig,
    pub lookup: LookupOptions,
    pub report: ReportOptions,
}

/// Plans the load for a queue snapshot.
///
/// Route failures never fail the plan; they degrade the affected shipment's
/// estimate to the fallback distance.
///
/// # Returns
/// The report, or a `ValidationError` for duplicate shipment ids or an
/// invalid cost configuration
pub async fn plan_load<P: RouteProvider>(
    container: &Container,
    shipments: &[Shipment],
    settings: &PlanSettings,
    provider: &P,
) -> Result<LoadReport, ValidationError> {
    validate_queue(shipments)?;
    settings.cost.validate()?;

    let placement = pack_with_config(container, shipments, settings.packing);
    let routes = lookup_routes(provider, shipments, settings.lookup).await;
    let costs = estimate_costs(&routes, &settings.cost);
    let report = build_report(shipments, &placement, &costs, &settings.report);

    info!(
        shipments = shipments.len(),
        placed = report.placed_count,
        rejected = report.rejected_count,
        fallback_routes = report.totals.fallback_estimates,
        overloaded = report.overload_warning,
        "load plan built"
    );
    Ok(report)
}

/// Converts route lookup outcomes into cost estimates.
pub fn estimate_costs(
    routes: &HashMap<ShipmentId, Result<RouteInfo, RouteError>>,
    config: &CostConfig,
) -> HashMap<ShipmentId, CostEstimate> {
    routes
        .iter()
        .map(|(id, outcome)| {
            let estimate = match outcome {
                Ok(route) => estimate(
                    Some(route.distance_miles),
                    Some(route.duration_hours),
                    config,
                ),
                Err(_) => estimate(None, None, config),
            };
            (*id, estimate)
        })
        .collect()
}
