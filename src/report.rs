//! Aggregation of packing and cost results into one presentation contract.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::cost::{CostEstimate, DistanceSource};
use crate::model::{Container, Shape, Shipment, ShipmentId};
use crate::packing::{ItemOutcome, PlacementResult};
use crate::types::{Dimensional, Vec3};

/// Thresholds for advisory warnings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportOptions {
    /// Weight per cubic foot above which a placed shipment is flagged.
    pub density_alert_lb_per_cuft: f64,
    /// Share of the placed weight on one half of the floor above which the
    /// load is flagged as unbalanced. `None` disables the alert.
    pub balance_alert_share: Option<f64>,
}

impl ReportOptions {
    pub const DEFAULT_DENSITY_ALERT: f64 = 60.0;
    pub const DEFAULT_BALANCE_ALERT: Option<f64> = None;
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            density_alert_lb_per_cuft: Self::DEFAULT_DENSITY_ALERT,
            balance_alert_share: Self::DEFAULT_BALANCE_ALERT,
        }
    }
}

/// Split line of a weight balance check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BalanceAxis {
    /// Halves ahead of and behind the mid-length line.
    FrontRear,
    /// Halves on either side of the mid-width line.
    LeftRight,
}

/// Placed weight on each half of the container floor.
///
/// An item straddling a mid line is split in proportion to its extent on
/// each side, as if its weight were spread evenly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct WeightBalance {
    /// Weight with `x < length / 2`.
    pub front: f64,
    pub rear: f64,
    /// Weight with `y < width / 2`.
    pub left: f64,
    pub right: f64,
}

impl WeightBalance {
    pub fn from_placement(placement: &PlacementResult) -> Self {
        let container = placement.container;
        let mut balance = Self::default();
        for item in &placement.items {
            let Some(bounds) = item.bounding_box() else {
                continue;
            };
            let front = share_below(bounds.min.x, bounds.max.x, container.length() / 2.0);
            let left = share_below(bounds.min.y, bounds.max.y, container.width() / 2.0);
            balance.front += item.weight * front;
            balance.rear += item.weight * (1.0 - front);
            balance.left += item.weight * left;
            balance.right += item.weight * (1.0 - left);
        }
        balance
    }

    /// Share of the placed weight on the heavier half, `None` for an empty load.
    pub fn heavier_share(&self, axis: BalanceAxis) -> Option<f64> {
        let (a, b) = match axis {
            BalanceAxis::FrontRear => (self.front, self.rear),
            BalanceAxis::LeftRight => (self.left, self.right),
        };
        let total = a + b;
        (total > 0.0).then(|| a.max(b) / total)
    }
}

/// Fraction of `[min, max]` lying below `mid`.
fn share_below(min: f64, max: f64, mid: f64) -> f64 {
    ((mid - min) / (max - min)).clamp(0.0, 1.0)
}

/// Advisory findings. None of them blocks loading.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    /// Placed weight exceeds the container capacity.
    Overload { total_weight: f64, max_weight: f64 },
    /// Some shipments could not be placed.
    RejectedItems { count: usize },
    /// The route lookup failed and the cost uses the fallback distance.
    RouteUnavailable { shipment_id: ShipmentId },
    /// A shipment is unusually dense for its footprint.
    HighDensity {
        shipment_id: ShipmentId,
        lb_per_cuft: f64,
    },
    /// One half of the floor carries more than the configured share of the
    /// placed weight.
    Imbalance {
        axis: BalanceAxis,
        heavier_share: f64,
    },
}

/// Merged geometry and cost view of one shipment.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ReportLine {
    pub shipment_id: ShipmentId,
    pub label: String,
    pub shape: Shape,
    pub hazmat: bool,
    pub origin: String,
    pub destination: String,
    pub dims: Vec3,
    pub weight: f64,
    pub outcome: ItemOutcome,
    pub cost: Option<CostEstimate>,
}

/// Cost figures summed over all shipments with an estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct CostTotals {
    pub distance_miles: f64,
    pub fuel_cost: f64,
    pub wage_cost: f64,
    pub total_cost: f64,
    /// Largest shift count among shipments with a known duration.
    pub max_shift_count: Option<u32>,
    /// Number of estimates based on the fallback distance.
    pub fallback_estimates: usize,
}

/// Complete result of one planning run, in queue order.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LoadReport {
    pub container: Container,
    pub placed_count: usize,
    pub rejected_count: usize,
    pub rejected_ids: Vec<ShipmentId>,
    pub total_weight: f64,
    /// `total_weight / max_weight`
    pub weight_utilization: f64,
    /// `max_weight - total_weight`, negative when overloaded.
    pub weight_headroom: f64,
    /// Placed footprint volume over container volume.
    pub volume_utilization: f64,
    pub overload_warning: bool,
    pub balance: WeightBalance,
    pub lines: Vec<ReportLine>,
    pub totals: CostTotals,
    pub warnings: Vec<ReportWarning>,
}

/// Rounds a currency amount to cents.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the report for a packed queue.
///
/// # Parameters
/// * `shipments` - The queue snapshot that was packed
/// * `placement` - Packing result for that snapshot
/// * `costs` - Per-shipment estimates; shipments without one get `cost: None`
/// * `options` - Warning thresholds
pub fn build_report(
    shipments: &[Shipment],
    placement: &PlacementResult,
    costs: &HashMap<ShipmentId, CostEstimate>,
    options: &ReportOptions,
) -> LoadReport {
    let by_id: HashMap<ShipmentId, &Shipment> = shipments.iter().map(|s| (s.id, s)).collect();
    let container = placement.container;
    let mut warnings = Vec::new();

    if placement.over_capacity {
        warnings.push(ReportWarning::Overload {
            total_weight: placement.total_weight,
            max_weight: container.max_weight(),
        });
    }
    if !placement.is_complete() {
        warnings.push(ReportWarning::RejectedItems {
            count: placement.rejected_count(),
        });
    }

    let mut totals = CostTotals::default();
    let mut lines = Vec::with_capacity(placement.items.len());

    for item in &placement.items {
        let shipment = by_id.get(&item.shipment_id);
        let cost = costs.get(&item.shipment_id).copied();

        if let Some(estimate) = cost {
            totals.distance_miles += estimate.distance_miles;
            totals.fuel_cost += estimate.fuel_cost;
            totals.wage_cost += estimate.wage_cost;
            totals.total_cost += estimate.total_cost;
            totals.max_shift_count = totals.max_shift_count.max(estimate.shift_count);
            if estimate.distance_source == DistanceSource::Fallback {
                totals.fallback_estimates += 1;
                warnings.push(ReportWarning::RouteUnavailable {
                    shipment_id: item.shipment_id,
                });
            }
        }

        if item.fits() {
            let density = item.weight / item.dims.volume();
            if density > options.density_alert_lb_per_cuft {
                warnings.push(ReportWarning::HighDensity {
                    shipment_id: item.shipment_id,
                    lb_per_cuft: density,
                });
            }
        }

        lines.push(ReportLine {
            shipment_id: item.shipment_id,
            label: shipment
                .map(|s| s.label.clone())
                .unwrap_or_else(|| format!("Shipment {}", item.shipment_id)),
            shape: shipment.map(|s| s.shape).unwrap_or_default(),
            hazmat: item.hazmat,
            origin: shipment.map(|s| s.origin.clone()).unwrap_or_default(),
            destination: shipment.map(|s| s.destination.clone()).unwrap_or_default(),
            dims: item.dims,
            weight: item.weight,
            outcome: item.outcome,
            cost,
        });
    }

    let balance = WeightBalance::from_placement(placement);
    if let Some(limit) = options.balance_alert_share {
        for axis in [BalanceAxis::FrontRear, BalanceAxis::LeftRight] {
            if let Some(share) = balance.heavier_share(axis).filter(|share| *share > limit) {
                warnings.push(ReportWarning::Imbalance {
                    axis,
                    heavier_share: share,
                });
            }
        }
    }

    LoadReport {
        container,
        placed_count: placement.placed_count(),
        rejected_count: placement.rejected_count(),
        rejected_ids: placement.rejected_ids.clone(),
        total_weight: placement.total_weight,
        weight_utilization: placement.total_weight / container.max_weight(),
        weight_headroom: placement.weight_headroom(),
        volume_utilization: placement.placed_volume() / container.volume(),
        overload_warning: placement.over_capacity,
        balance,
        lines,
        totals,
        warnings,
    }
}

impl LoadReport {
    /// Copy of the report with every currency amount rounded to cents, for rendering.
    pub fn for_presentation(&self) -> Self {
        let mut report = self.clone();
        for line in &mut report.lines {
            line.cost = line.cost.map(|cost| cost.for_presentation());
        }
        report.totals.fuel_cost = round_currency(report.totals.fuel_cost);
        report.totals.wage_cost = round_currency(report.totals.wage_cost);
        report.totals.total_cost = round_currency(report.totals.total_cost);
        report
    }

    pub fn line(&self, id: ShipmentId) -> Option<&ReportLine> {
        self.lines.iter().find(|line| line.shipment_id == id)
    }
}
