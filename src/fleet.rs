//! Truck selection from a fleet and multi-truck convoy planning.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::model::{Container, Shipment, ShipmentId};
use crate::packing::{PackingConfig, PlacementResult, pack_with_config};
use crate::types::Dimensional;

/// A truck type available for loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TruckProfile {
    pub name: String,
    pub container: Container,
}

impl TruckProfile {
    pub fn new(name: impl Into<String>, container: Container) -> Self {
        Self {
            name: name.into(),
            container,
        }
    }
}

/// Name, length, width, height (ft) and payload (lb) of the standard fleet.
const STANDARD_FLEET: [(&str, f64, f64, f64, f64); 4] = [
    ("Cargo van", 12.0, 5.5, 5.0, 3_500.0),
    ("26 ft box truck", 26.0, 8.0, 8.0, 10_000.0),
    ("48 ft dry van", 48.0, 8.5, 9.0, 43_000.0),
    ("53 ft dry van", 53.0, 8.5, 9.0, 45_000.0),
];

/// Standard truck profiles used when the caller supplies no fleet.
pub fn default_fleet() -> Vec<TruckProfile> {
    STANDARD_FLEET
        .iter()
        .filter_map(|&(name, length, width, height, max_weight)| {
            Container::new(length, width, height, max_weight)
                .ok()
                .map(|container| TruckProfile::new(name, container))
        })
        .collect()
}

/// The truck chosen for a queue and the packing that justified the choice.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct TruckSelection {
    pub truck: TruckProfile,
    pub placement: PlacementResult,
}

/// Orders profiles by volume, then by payload (smallest first).
fn by_size(a: &TruckProfile, b: &TruckProfile) -> Ordering {
    a.container
        .volume()
        .partial_cmp(&b.container.volume())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.container
                .max_weight()
                .partial_cmp(&b.container.max_weight())
                .unwrap_or(Ordering::Equal)
        })
}

/// Picks the smallest truck that takes the whole queue within its weight capacity.
///
/// # Returns
/// `None` if no profile in the fleet can take every shipment
pub fn select_truck(
    fleet: &[TruckProfile],
    shipments: &[Shipment],
    config: PackingConfig,
) -> Option<TruckSelection> {
    let mut candidates: Vec<&TruckProfile> = fleet.iter().collect();
    candidates.sort_by(|a, b| by_size(a, b));

    candidates.into_iter().find_map(|truck| {
        let placement = pack_with_config(&truck.container, shipments, config);
        (placement.is_complete() && !placement.over_capacity).then(|| TruckSelection {
            truck: truck.clone(),
            placement,
        })
    })
}

/// Why a shipment can never ride in a truck of the convoy's profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnloadableReason {
    DimensionsExceedTruck,
    TooHeavyForTruck,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct UnloadableShipment {
    pub shipment_id: ShipmentId,
    pub reason: UnloadableReason,
}

/// Loads of several trucks of the same profile.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Convoy {
    pub truck: TruckProfile,
    /// One packing per truck; each lists only the shipments offered to that truck.
    pub loads: Vec<PlacementResult>,
    pub unloadable: Vec<UnloadableShipment>,
    /// Shipments left over once the truck limit was reached, in queue order.
    pub remaining: Vec<ShipmentId>,
}

impl Convoy {
    pub fn truck_count(&self) -> usize {
        self.loads.len()
    }
}

/// Spreads a queue over up to `max_trucks` trucks of one profile.
///
/// Each truck takes the longest queue prefix that stays within its weight
/// capacity; shipments it rejected are offered to the next truck, keeping
/// their relative order. Shipments that exceed the truck on an axis or in
/// weight are set aside up front.
pub fn plan_convoy(
    truck: &TruckProfile,
    shipments: &[Shipment],
    config: PackingConfig,
    max_trucks: usize,
) -> Convoy {
    let container = truck.container;
    let mut unloadable = Vec::new();
    let mut queue: Vec<Shipment> = Vec::with_capacity(shipments.len());

    for shipment in shipments {
        if !shipment
            .dimensions()
            .fits_within(&container.dimensions(), config.tolerance())
        {
            unloadable.push(UnloadableShipment {
                shipment_id: shipment.id,
                reason: UnloadableReason::DimensionsExceedTruck,
            });
        } else if shipment.weight > container.max_weight() {
            unloadable.push(UnloadableShipment {
                shipment_id: shipment.id,
                reason: UnloadableReason::TooHeavyForTruck,
            });
        } else {
            queue.push(shipment.clone());
        }
    }

    let mut loads = Vec::new();
    while !queue.is_empty() && loads.len() < max_trucks {
        let trial = pack_with_config(&container, &queue, config);
        let cut = weight_cut(&trial);
        let placement = pack_with_config(&container, &queue[..cut], config);
        if placement.placed_count() == 0 {
            break;
        }

        let loaded: HashSet<ShipmentId> = placement
            .items
            .iter()
            .filter(|item| item.fits())
            .map(|item| item.shipment_id)
            .collect();
        queue.retain(|shipment| !loaded.contains(&shipment.id));
        loads.push(placement);
    }

    let remaining: Vec<ShipmentId> = queue.iter().map(|shipment| shipment.id).collect();
    info!(
        truck = %truck.name,
        trucks = loads.len(),
        unloadable = unloadable.len(),
        remaining = remaining.len(),
        "convoy planned"
    );

    Convoy {
        truck: truck.clone(),
        loads,
        unloadable,
        remaining,
    }
}

/// Length of the queue prefix whose placed weight stays within capacity.
///
/// Shelf packing of a prefix places its items exactly as packing the whole
/// queue does, so the trial result is valid for the prefix.
fn weight_cut(trial: &PlacementResult) -> usize {
    let max_weight = trial.container.max_weight();
    let mut loaded = 0.0;
    for (idx, item) in trial.items.iter().enumerate() {
        if !item.fits() {
            continue;
        }
        if loaded + item.weight > max_weight {
            return idx;
        }
        loaded += item.weight;
    }
    trial.items.len()
}
