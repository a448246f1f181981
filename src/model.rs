//! Data models for load planning.
//!
//! This module defines the fundamental data structures shared by the packing
//! engine, the cost estimator and the report builder:
//! - `Container`: The trailer or box being loaded, with its weight capacity
//! - `Shipment`: A cargo item queued for loading, with its route endpoints
//! - `Shape`: Rendering hint for a shipment
//!
//! Both `Container` and `Shipment` are validated on construction, including
//! when they are deserialized, so a packing run never sees a non-positive
//! dimension or weight.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{Dimensional, Vec3};

/// Identifier of a shipment, unique within one queue.
pub type ShipmentId = usize;

/// Validation error for static configuration and shipment data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Duplicate shipment id: {0}")]
    DuplicateShipment(ShipmentId),
}

pub(crate) fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

pub(crate) fn validate_weight(value: f64, name: &str) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// The transport container being loaded.
///
/// Immutable once constructed. All three dimensions (feet) and the weight
/// capacity (pounds) are strictly positive and finite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "ContainerSpec")]
pub struct Container {
    length: f64,
    width: f64,
    height: f64,
    max_weight: f64,
}

/// Unvalidated wire form of a [`Container`].
#[derive(Deserialize)]
struct ContainerSpec {
    length: f64,
    width: f64,
    height: f64,
    max_weight: f64,
}

impl TryFrom<ContainerSpec> for Container {
    type Error = ValidationError;

    fn try_from(spec: ContainerSpec) -> Result<Self, Self::Error> {
        Container::new(spec.length, spec.width, spec.height, spec.max_weight)
    }
}

impl Container {
    /// Creates a new container after validating every parameter.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::Container;
    ///
    /// assert!(Container::new(50.0, 8.0, 10.0, 45_000.0).is_ok());
    /// assert!(Container::new(50.0, 0.0, 10.0, 45_000.0).is_err());
    /// ```
    pub fn new(
        length: f64,
        width: f64,
        height: f64,
        max_weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimension(length, "Container length")?;
        validate_dimension(width, "Container width")?;
        validate_dimension(height, "Container height")?;
        validate_weight(max_weight, "Container max weight")?;
        Ok(Self {
            length,
            width,
            height,
            max_weight,
        })
    }

    /// A 53 ft dry van trailer: 53 x 8.5 x 9 ft, 45,000 lb payload.
    pub const fn standard_trailer() -> Self {
        Self {
            length: 53.0,
            width: 8.5,
            height: 9.0,
            max_weight: 45_000.0,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Maximum payload in pounds.
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }
}

/// Rendering shape of a shipment.
///
/// Packing always uses the enclosing rectangular box, so a cylinder of
/// diameter `d` occupies a `length × width` footprint like any box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Box,
    Cylinder,
}

/// A cargo item queued for loading.
///
/// # Fields
/// * `id` - Identifier, unique within the queue
/// * `label` - Display name
/// * `length`, `width`, `height` - Footprint in feet
/// * `weight` - Weight in pounds
/// * `shape` - Rendering hint, no effect on placement
/// * `hazmat` - Whether the item is subject to segregation
/// * `origin`, `destination` - Opaque location identifiers for route lookup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "ShipmentSpec")]
pub struct Shipment {
    pub id: ShipmentId,
    pub label: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub shape: Shape,
    pub hazmat: bool,
    pub origin: String,
    pub destination: String,
}

#[derive(Deserialize)]
struct ShipmentSpec {
    id: ShipmentId,
    #[serde(default)]
    label: Option<String>,
    length: f64,
    width: f64,
    height: f64,
    weight: f64,
    #[serde(default)]
    shape: Shape,
    #[serde(default)]
    hazmat: bool,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    destination: String,
}

impl TryFrom<ShipmentSpec> for Shipment {
    type Error = ValidationError;

    fn try_from(spec: ShipmentSpec) -> Result<Self, Self::Error> {
        let mut shipment = Shipment::new(
            spec.id,
            (spec.length, spec.width, spec.height),
            spec.weight,
        )?
        .with_shape(spec.shape)
        .with_hazmat(spec.hazmat)
        .with_route(spec.origin, spec.destination);
        if let Some(label) = spec.label {
            shipment.label = label;
        }
        Ok(shipment)
    }
}

impl Shipment {
    /// Creates a new box-shaped, non-hazardous shipment with validation.
    ///
    /// The label defaults to `"Shipment {id}"`; route endpoints start empty.
    ///
    /// # Parameters
    /// * `id` - Identifier
    /// * `dims` - Footprint (length, width, height) in feet
    /// * `weight` - Weight in pounds
    pub fn new(
        id: ShipmentId,
        dims: (f64, f64, f64),
        weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimension(dims.0, "Length")?;
        validate_dimension(dims.1, "Width")?;
        validate_dimension(dims.2, "Height")?;
        validate_weight(weight, "Weight")?;
        Ok(Self {
            id,
            label: format!("Shipment {id}"),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            weight,
            shape: Shape::Box,
            hazmat: false,
            origin: String::new(),
            destination: String::new(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_hazmat(mut self, hazmat: bool) -> Self {
        self.hazmat = hazmat;
        self
    }

    pub fn with_route(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.origin = origin.into();
        self.destination = destination.into();
        self
    }
}

impl Dimensional for Shipment {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }
}

/// Checks that every shipment id in a queue is unique.
///
/// Ids key the per-shipment cost map and the rejected set, so duplicates
/// would make the report ambiguous.
pub fn validate_queue(shipments: &[Shipment]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(shipments.len());
    for shipment in shipments {
        if !seen.insert(shipment.id) {
            return Err(ValidationError::DuplicateShipment(shipment.id));
        }
    }
    Ok(())
}
