//! Deterministic shelf packing of a shipment queue into one container.
//!
//! Items are processed strictly in queue order, without sorting or rotation.
//! A cursor fills the container left to right along the length, wraps to a
//! new row across the width, and wraps to a new layer up the height:
//! - a row advances by the widest item placed in it
//! - a layer advances by the tallest item placed in it
//! - a rejected item leaves the cursor untouched
//!
//! Weight is never a rejection criterion. An overweight load is still
//! geometrically placed and reported through `PlacementResult::over_capacity`.

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::geometry::{fits_with_tolerance, overlaps, within_clearance};
use crate::model::{Container, Shipment, ShipmentId};
use crate::types::{BoundingBox, Dimensional, Vec3};

/// Configuration for the packing engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// General numerical tolerance for boundary comparisons, see [`PackingConfig::tolerance`]
    pub general_epsilon: f64,
    /// Minimum XY clearance between hazmat and non-hazmat items of the same
    /// layer. `None` disables segregation.
    pub hazmat_clearance: Option<f64>,
}

impl PackingConfig {
    pub const DEFAULT_GENERAL_EPSILON: f64 = 1e-6;
    /// Largest tolerance a box may overshoot a container wall by, in feet.
    pub const MAX_GENERAL_EPSILON: f64 = 1e-3;
    pub const DEFAULT_HAZMAT_CLEARANCE: Option<f64> = None;

    /// The boundary tolerance actually applied, clamped to
    /// `[0, MAX_GENERAL_EPSILON]`. A non-finite value falls back to the default.
    pub fn tolerance(&self) -> f64 {
        if self.general_epsilon.is_finite() {
            self.general_epsilon.clamp(0.0, Self::MAX_GENERAL_EPSILON)
        } else {
            Self::DEFAULT_GENERAL_EPSILON
        }
    }

    /// Creates a builder for custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
            hazmat_clearance: Self::DEFAULT_HAZMAT_CLEARANCE,
        }
    }
}

/// Builder for [`PackingConfig`].
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets the general tolerance.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Enables hazmat segregation with the given clearance in feet.
    pub fn hazmat_clearance(mut self, clearance: Option<f64>) -> Self {
        self.config.hazmat_clearance = clearance;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Reasons why a shipment could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The footprint exceeds the container on at least one axis.
    DimensionsExceedContainer,
    /// No layer with enough headroom remains above the cursor.
    NoRemainingLayer,
    /// The slot would put hazmat and non-hazmat cargo next to each other.
    HazmatSegregation,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::DimensionsExceedContainer => "dimensions_exceed_container",
            RejectionReason::NoRemainingLayer => "no_remaining_layer",
            RejectionReason::HazmatSegregation => "hazmat_segregation",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::DimensionsExceedContainer => {
                write!(f, "Item exceeds the container in at least one dimension")
            }
            RejectionReason::NoRemainingLayer => {
                write!(f, "No remaining layer has room for the item")
            }
            RejectionReason::HazmatSegregation => {
                write!(f, "Item would be placed too close to segregated cargo")
            }
        }
    }
}

/// Outcome of packing a single shipment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Lower corner of the item and the index of the layer it sits in.
    Placed { position: Vec3, layer: usize },
    Rejected { reason: RejectionReason },
}

/// Packing result for one shipment, in queue order.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacedItem {
    pub shipment_id: ShipmentId,
    pub dims: Vec3,
    pub weight: f64,
    pub hazmat: bool,
    pub outcome: ItemOutcome,
}

impl PlacedItem {
    /// Whether the item was placed.
    pub fn fits(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Placed { .. })
    }

    /// Lower corner of a placed item.
    pub fn position(&self) -> Option<Vec3> {
        match self.outcome {
            ItemOutcome::Placed { position, .. } => Some(position),
            ItemOutcome::Rejected { .. } => None,
        }
    }

    pub fn layer(&self) -> Option<usize> {
        match self.outcome {
            ItemOutcome::Placed { layer, .. } => Some(layer),
            ItemOutcome::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self.outcome {
            ItemOutcome::Placed { .. } => None,
            ItemOutcome::Rejected { reason } => Some(reason),
        }
    }

    /// Box occupied by a placed item.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.position()
            .map(|position| BoundingBox::from_position_and_dims(position, self.dims))
    }
}

/// Result of one packing run.
///
/// `items` maps 1:1 to the input queue. `rejected_ids` lists the ids of
/// rejected items in queue order.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacementResult {
    pub container: Container,
    pub items: Vec<PlacedItem>,
    /// Weight of all placed items in pounds.
    pub total_weight: f64,
    /// `total_weight > container.max_weight()`
    pub over_capacity: bool,
    pub rejected_ids: Vec<ShipmentId>,
}

impl PlacementResult {
    /// Indicates whether every shipment was placed.
    pub fn is_complete(&self) -> bool {
        self.rejected_ids.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.items.len() - self.rejected_ids.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected_ids.len()
    }

    /// Sum of the footprint volumes of all placed items.
    pub fn placed_volume(&self) -> f64 {
        self.items
            .iter()
            .filter(|item| item.fits())
            .map(|item| item.dims.volume())
            .sum()
    }

    /// Remaining payload before the container is at capacity; negative when overloaded.
    pub fn weight_headroom(&self) -> f64 {
        self.container.max_weight() - self.total_weight
    }
}

/// Events emitted while packing, for live visualization.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// An item was placed.
    ItemPlaced {
        id: ShipmentId,
        position: Vec3,
        layer: usize,
        dims: Vec3,
        total_weight: f64,
    },
    /// An item could not be placed.
    ItemRejected {
        id: ShipmentId,
        dims: Vec3,
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished {
        placed: usize,
        rejected: usize,
        total_weight: f64,
        over_capacity: bool,
    },
}

/// Shelf cursor. Copied before every attempt so a rejection never moves it.
#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    x: f64,
    y: f64,
    z: f64,
    /// Widest item in the current row.
    row_width: f64,
    /// Tallest item in the current layer.
    layer_height: f64,
    layer: usize,
}

impl Cursor {
    /// Finds the slot for an item of `dims` and the cursor after placing it.
    ///
    /// # Returns
    /// `Some((position, layer, next_cursor))`, or `None` when every remaining
    /// layer is too low
    fn slot_for(&self, dims: Vec3, container: &Container, eps: f64) -> Option<(Vec3, usize, Cursor)> {
        let mut next = *self;

        if next.x + dims.x > container.length() + eps {
            next.x = 0.0;
            next.y += next.row_width;
            next.row_width = 0.0;
        }

        if next.y + dims.y > container.width() + eps {
            next.x = 0.0;
            next.y = 0.0;
            next.z += next.layer_height;
            next.row_width = 0.0;
            next.layer_height = 0.0;
            next.layer += 1;
        }

        if next.z + dims.z > container.height() + eps {
            return None;
        }

        let position = Vec3::new(next.x, next.y, next.z);
        let layer = next.layer;
        next.x += dims.x;
        next.row_width = next.row_width.max(dims.y);
        next.layer_height = next.layer_height.max(dims.z);
        Some((position, layer, next))
    }
}

/// Packs a queue of shipments into the container with default configuration.
///
/// # Parameters
/// * `container` - The container to load
/// * `items` - Shipments in loading order
///
/// # Returns
/// `PlacementResult` with one entry per shipment
pub fn pack(container: &Container, items: &[Shipment]) -> PlacementResult {
    pack_with_config(container, items, PackingConfig::default())
}

/// Like [`pack`], with custom parameters.
pub fn pack_with_config(
    container: &Container,
    items: &[Shipment],
    config: PackingConfig,
) -> PlacementResult {
    pack_with_progress(container, items, config, |_| {})
}

/// Packs with a live progress callback.
///
/// Calls `on_event` once per shipment and once at the end (suitable for SSE).
pub fn pack_with_progress(
    container: &Container,
    items: &[Shipment],
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PlacementResult {
    let eps = config.tolerance();
    let mut cursor = Cursor::default();
    let mut placed: Vec<PlacedItem> = Vec::with_capacity(items.len());
    let mut rejected_ids = Vec::new();
    let mut total_weight = 0.0;

    for shipment in items {
        let dims = shipment.dimensions();
        let outcome = if !dims.fits_within(&container.dimensions(), eps) {
            ItemOutcome::Rejected {
                reason: RejectionReason::DimensionsExceedContainer,
            }
        } else {
            match cursor.slot_for(dims, container, eps) {
                None => ItemOutcome::Rejected {
                    reason: RejectionReason::NoRemainingLayer,
                },
                Some((position, layer, next)) => {
                    let bounds = BoundingBox::from_position_and_dims(position, dims);
                    if violates_segregation(shipment, &bounds, layer, &placed, &config) {
                        ItemOutcome::Rejected {
                            reason: RejectionReason::HazmatSegregation,
                        }
                    } else {
                        debug_assert!(fits_with_tolerance(&bounds, container, eps));
                        debug_assert!(
                            !placed
                                .iter()
                                .filter_map(PlacedItem::bounding_box)
                                .any(|other| overlaps(&other, &bounds))
                        );
                        cursor = next;
                        ItemOutcome::Placed { position, layer }
                    }
                }
            }
        };

        match outcome {
            ItemOutcome::Placed { position, layer } => {
                total_weight += shipment.weight;
                debug!(
                    id = shipment.id,
                    x = position.x,
                    y = position.y,
                    z = position.z,
                    layer,
                    "placed shipment"
                );
                on_event(&PackEvent::ItemPlaced {
                    id: shipment.id,
                    position,
                    layer,
                    dims,
                    total_weight,
                });
            }
            ItemOutcome::Rejected { reason } => {
                debug!(id = shipment.id, reason = reason.code(), "rejected shipment");
                rejected_ids.push(shipment.id);
                on_event(&PackEvent::ItemRejected {
                    id: shipment.id,
                    dims,
                    reason_code: reason.code().to_string(),
                    reason_text: reason.to_string(),
                });
            }
        }

        placed.push(PlacedItem {
            shipment_id: shipment.id,
            dims,
            weight: shipment.weight,
            hazmat: shipment.hazmat,
            outcome,
        });
    }

    let over_capacity = total_weight > container.max_weight();
    on_event(&PackEvent::Finished {
        placed: placed.len() - rejected_ids.len(),
        rejected: rejected_ids.len(),
        total_weight,
        over_capacity,
    });

    PlacementResult {
        container: *container,
        items: placed,
        total_weight,
        over_capacity,
        rejected_ids,
    }
}

/// Checks whether placing `shipment` at `bounds` would bring hazmat and
/// non-hazmat cargo within the configured clearance of each other in the
/// same layer.
fn violates_segregation(
    shipment: &Shipment,
    bounds: &BoundingBox,
    layer: usize,
    placed: &[PlacedItem],
    config: &PackingConfig,
) -> bool {
    let Some(clearance) = config.hazmat_clearance else {
        return false;
    };

    placed
        .iter()
        .filter(|other| other.hazmat != shipment.hazmat && other.layer() == Some(layer))
        .filter_map(PlacedItem::bounding_box)
        .any(|other| within_clearance(bounds, &other, clearance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fits;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn trailer() -> Container {
        Container::new(50.0, 8.0, 10.0, 45_000.0).unwrap()
    }

    fn item(id: ShipmentId, dims: (f64, f64, f64), weight: f64) -> Shipment {
        Shipment::new(id, dims, weight).unwrap()
    }

    fn hazmat(id: ShipmentId, dims: (f64, f64, f64)) -> Shipment {
        item(id, dims, 500.0).with_hazmat(true)
    }

    fn segregated(clearance: f64) -> PackingConfig {
        PackingConfig::builder()
            .hazmat_clearance(Some(clearance))
            .build()
    }

    fn random_queue(rng: &mut SmallRng, len: usize) -> Vec<Shipment> {
        (0..len)
            .map(|id| {
                let dims = (
                    rng.random_range(0.5..60.0),
                    rng.random_range(0.5..9.0),
                    rng.random_range(0.5..11.0),
                );
                item(id, dims, rng.random_range(10.0..5_000.0))
                    .with_hazmat(rng.random_bool(0.2))
            })
            .collect()
    }

    #[test]
    fn single_item_placed_at_origin() {
        let result = pack(&trailer(), &[item(1, (10.0, 4.0, 4.0), 3000.0)]);

        assert!(result.is_complete());
        assert_eq!(result.items.len(), 1);
        assert!(result.items[0].fits());
        assert_eq!(result.items[0].position(), Some(Vec3::zero()));
        assert_eq!(result.total_weight, 3000.0);
        assert!(!result.over_capacity);
    }

    #[test]
    fn empty_queue_yields_empty_result() {
        let result = pack(&trailer(), &[]);
        assert!(result.items.is_empty());
        assert!(result.rejected_ids.is_empty());
        assert_eq!(result.total_weight, 0.0);
        assert!(!result.over_capacity);
    }

    #[test]
    fn second_item_wraps_to_next_row() {
        let items = [item(1, (30.0, 3.0, 4.0), 100.0), item(2, (30.0, 4.0, 4.0), 100.0)];
        let result = pack(&trailer(), &items);

        assert_eq!(result.items[0].position(), Some(Vec3::new(0.0, 0.0, 0.0)));
        assert_eq!(result.items[1].position(), Some(Vec3::new(0.0, 3.0, 0.0)));
        assert_eq!(result.items[1].layer(), Some(0));
    }

    #[test]
    fn row_advances_by_widest_item_in_row() {
        let items = [
            item(1, (20.0, 2.0, 1.0), 10.0),
            item(2, (20.0, 5.0, 1.0), 10.0),
            item(3, (20.0, 3.0, 1.0), 10.0),
        ];
        let result = pack(&trailer(), &items);

        assert_eq!(result.items[1].position(), Some(Vec3::new(20.0, 0.0, 0.0)));
        assert_eq!(result.items[2].position(), Some(Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn full_rows_wrap_to_next_layer_by_tallest_item() {
        let items = [
            item(1, (30.0, 4.0, 3.0), 10.0),
            item(2, (30.0, 4.0, 5.0), 10.0),
            item(3, (30.0, 4.0, 4.0), 10.0),
        ];
        let result = pack(&trailer(), &items);

        assert_eq!(result.items[1].position(), Some(Vec3::new(0.0, 4.0, 0.0)));
        assert_eq!(result.items[2].position(), Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(result.items[2].layer(), Some(1));
    }

    #[test]
    fn oversized_item_rejected_without_moving_cursor() {
        let items = [item(1, (60.0, 4.0, 4.0), 100.0), item(2, (10.0, 4.0, 4.0), 100.0)];
        let result = pack(&trailer(), &items);

        assert_eq!(result.rejected_ids, vec![1]);
        assert_eq!(
            result.items[0].rejection(),
            Some(RejectionReason::DimensionsExceedContainer)
        );
        assert_eq!(result.items[1].position(), Some(Vec3::zero()));
        assert_eq!(result.total_weight, 100.0);
    }

    #[test]
    fn item_rejected_when_no_layer_remains() {
        let container = Container::new(10.0, 4.0, 4.0, 1000.0).unwrap();
        let items = [
            item(1, (10.0, 4.0, 3.0), 10.0),
            item(2, (10.0, 4.0, 3.0), 10.0),
            item(3, (10.0, 4.0, 1.0), 10.0),
        ];
        let result = pack(&container, &items);

        assert_eq!(
            result.items[1].rejection(),
            Some(RejectionReason::NoRemainingLayer)
        );
        // The rejected item did not consume the new layer.
        assert_eq!(result.items[2].position(), Some(Vec3::new(0.0, 0.0, 3.0)));
        assert_eq!(result.rejected_ids, vec![2]);
    }

    #[test]
    fn item_taller_than_current_row_slot_still_stays_in_bounds() {
        let container = Container::new(20.0, 8.0, 6.0, 1000.0).unwrap();
        let items = [
            item(1, (10.0, 3.0, 2.0), 10.0),
            item(2, (10.0, 6.0, 2.0), 10.0),
            item(3, (10.0, 6.0, 2.0), 10.0),
        ];
        let result = pack(&container, &items);

        // Row 0 is 6 wide after item 2; item 3 cannot start at y=6 and goes up a layer.
        assert_eq!(result.items[2].position(), Some(Vec3::new(0.0, 0.0, 2.0)));
        for placed in result.items.iter().filter_map(PlacedItem::bounding_box) {
            assert!(fits(&placed, &container));
        }
    }

    #[test]
    fn oversized_tolerance_is_clamped_to_wall_limit() {
        let config = PackingConfig::builder().general_epsilon(0.5).build();
        assert_eq!(config.tolerance(), PackingConfig::MAX_GENERAL_EPSILON);

        let container = trailer();
        let items = [item(1, (40.0, 4.0, 4.0), 100.0), item(2, (10.4, 4.0, 4.0), 100.0)];
        let result = pack_with_config(&container, &items, config);

        // 40 + 10.4 overshoots the wall by far more than the clamped tolerance.
        assert_eq!(result.items[1].position(), Some(Vec3::new(0.0, 4.0, 0.0)));
        for placed in result.items.iter().filter_map(PlacedItem::bounding_box) {
            assert!(fits(&placed, &container), "box {placed:?} leaves the container");
        }
    }

    #[test]
    fn non_finite_tolerance_uses_default() {
        let config = PackingConfig::builder().general_epsilon(f64::NAN).build();
        assert_eq!(config.tolerance(), PackingConfig::DEFAULT_GENERAL_EPSILON);
        let negative = PackingConfig::builder().general_epsilon(-1.0).build();
        assert_eq!(negative.tolerance(), 0.0);
    }

    #[test]
    fn weight_over_capacity_is_reported_not_rejected() {
        let container = Container::new(50.0, 8.0, 10.0, 5_000.0).unwrap();
        let items = [item(1, (10.0, 4.0, 4.0), 3000.0), item(2, (10.0, 4.0, 4.0), 3000.0)];
        let result = pack(&container, &items);

        assert!(result.is_complete());
        assert_eq!(result.total_weight, 6000.0);
        assert!(result.over_capacity);
        assert_eq!(result.weight_headroom(), -1000.0);
    }

    #[test]
    fn capacity_flag_is_strict() {
        let container = Container::new(50.0, 8.0, 10.0, 3_000.0).unwrap();
        let result = pack(&container, &[item(1, (10.0, 4.0, 4.0), 3000.0)]);
        assert!(!result.over_capacity);
    }

    #[test]
    fn cylinders_pack_by_bounding_box() {
        let drum = item(1, (3.0, 3.0, 4.0), 400.0).with_shape(crate::model::Shape::Cylinder);
        let crate_box = item(2, (3.0, 3.0, 4.0), 400.0);
        let result = pack(&trailer(), &[drum, crate_box]);

        assert_eq!(result.items[1].position(), Some(Vec3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn segregation_disabled_by_default() {
        let items = [item(1, (10.0, 4.0, 4.0), 100.0), hazmat(2, (10.0, 4.0, 4.0))];
        let result = pack(&trailer(), &items);
        assert!(result.is_complete());
    }

    #[test]
    fn hazmat_next_to_general_cargo_rejected() {
        let items = [
            item(1, (10.0, 4.0, 4.0), 100.0),
            hazmat(2, (10.0, 4.0, 4.0)),
            item(3, (10.0, 4.0, 4.0), 100.0),
        ];
        let result = pack_with_config(&trailer(), &items, segregated(0.0));

        assert_eq!(
            result.items[1].rejection(),
            Some(RejectionReason::HazmatSegregation)
        );
        assert_eq!(result.rejected_ids, vec![2]);
        assert_eq!(result.items[2].position(), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn general_cargo_next_to_hazmat_rejected() {
        let items = [
            hazmat(1, (10.0, 4.0, 4.0)),
            hazmat(2, (10.0, 4.0, 4.0)),
            item(3, (10.0, 4.0, 4.0), 100.0),
        ];
        let result = pack_with_config(&trailer(), &items, segregated(2.0));

        assert_eq!(result.placed_count(), 2);
        assert_eq!(
            result.items[2].rejection(),
            Some(RejectionReason::HazmatSegregation)
        );
    }

    #[test]
    fn hazmat_in_separate_layer_is_allowed() {
        let container = Container::new(10.0, 4.0, 10.0, 1000.0).unwrap();
        let items = [item(1, (10.0, 4.0, 4.0), 100.0), hazmat(2, (10.0, 4.0, 4.0))];
        let result = pack_with_config(&container, &items, segregated(1.0));

        assert!(result.is_complete());
        assert_eq!(result.items[1].position(), Some(Vec3::new(0.0, 0.0, 4.0)));
    }

    #[test]
    fn hazmat_clearance_measured_in_xy() {
        let container = Container::new(20.0, 20.0, 10.0, 1000.0).unwrap();
        let items = [
            item(1, (10.0, 1.0, 1.0), 100.0),
            item(2, (10.0, 6.0, 1.0), 100.0),
            hazmat(3, (8.0, 1.0, 1.0)),
        ];

        // Item 3 opens the second row at y=6: two feet from item 2, five from item 1.
        let loose = pack_with_config(&container, &items, segregated(1.0));
        assert!(loose.is_complete());
        assert_eq!(loose.items[2].position(), Some(Vec3::new(0.0, 6.0, 0.0)));

        let tight = pack_with_config(&container, &items, segregated(3.0));
        assert_eq!(tight.rejected_ids, vec![3]);
    }

    #[test]
    fn progress_events_follow_queue_order() {
        let items = [
            item(1, (10.0, 4.0, 4.0), 100.0),
            item(2, (60.0, 4.0, 4.0), 100.0),
            item(3, (10.0, 4.0, 4.0), 100.0),
        ];
        let mut events = Vec::new();
        let result =
            pack_with_progress(&trailer(), &items, PackingConfig::default(), |evt| {
                events.push(evt.clone())
            });

        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], PackEvent::ItemPlaced { id: 1, .. }));
        assert!(matches!(events[1], PackEvent::ItemRejected { id: 2, .. }));
        assert!(matches!(
            events[2],
            PackEvent::ItemPlaced { id: 3, total_weight, .. } if total_weight == 200.0
        ));
        assert!(matches!(
            events[3],
            PackEvent::Finished { placed: 2, rejected: 1, .. }
        ));
        assert_eq!(result.placed_count(), 2);
    }

    #[test]
    fn randomized_queues_never_overlap_or_leave_container() {
        let container = trailer();
        let mut rng = SmallRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let len = rng.random_range(0..40);
            let queue = random_queue(&mut rng, len);
            let config = if rng.random_bool(0.5) {
                segregated(rng.random_range(0.0..2.0))
            } else {
                PackingConfig::default()
            };
            let result = pack_with_config(&container, &queue, config);

            let boxes: Vec<BoundingBox> = result
                .items
                .iter()
                .filter_map(PlacedItem::bounding_box)
                .collect();
            for (i, a) in boxes.iter().enumerate() {
                assert!(fits(a, &container), "box {a:?} leaves the container");
                for b in &boxes[i + 1..] {
                    assert!(!overlaps(a, b), "boxes {a:?} and {b:?} overlap");
                }
            }
        }
    }

    #[test]
    fn randomized_queues_preserve_order_and_report_capacity() {
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..200 {
            let container =
                Container::new(50.0, 8.0, 10.0, rng.random_range(1_000.0..60_000.0)).unwrap();
            let len = rng.random_range(0..30);
            let queue = random_queue(&mut rng, len);
            let result = pack(&container, &queue);

            let ids: Vec<_> = result.items.iter().map(|i| i.shipment_id).collect();
            let expected: Vec<_> = queue.iter().map(|s| s.id).collect();
            assert_eq!(ids, expected);

            let rejected: Vec<_> = result
                .items
                .iter()
                .filter(|i| !i.fits())
                .map(|i| i.shipment_id)
                .collect();
            assert_eq!(result.rejected_ids, rejected);

            let placed_weight: f64 = result
                .items
                .iter()
                .filter(|i| i.fits())
                .map(|i| i.weight)
                .sum();
            assert!((result.total_weight - placed_weight).abs() < 1e-6);
            assert_eq!(
                result.over_capacity,
                result.total_weight > container.max_weight()
            );
        }
    }

    #[test]
    fn randomized_queues_keep_hazmat_segregated() {
        let mut rng = SmallRng::seed_from_u64(0xa2a7);

        for _ in 0..100 {
            let clearance = rng.random_range(0.0..3.0);
            let len = rng.random_range(0..40);
            let queue = random_queue(&mut rng, len);
            let result = pack_with_config(&trailer(), &queue, segregated(clearance));

            let placed: Vec<&PlacedItem> = result.items.iter().filter(|i| i.fits()).collect();
            for (i, a) in placed.iter().enumerate() {
                for b in &placed[i + 1..] {
                    if a.hazmat == b.hazmat || a.layer() != b.layer() {
                        continue;
                    }
                    let (Some(box_a), Some(box_b)) = (a.bounding_box(), b.bounding_box()) else {
                        continue;
                    };
                    assert!(
                        !within_clearance(&box_b, &box_a, clearance),
                        "items {} and {} violate segregation",
                        a.shipment_id,
                        b.shipment_id
                    );
                }
            }
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(7);
        let queue = random_queue(&mut rng, 50);
        let config = segregated(0.5);

        let first = pack_with_config(&trailer(), &queue, config);
        let second = pack_with_config(&trailer(), &queue, config);
        assert_eq!(first, second);
    }
}
