//! Route-based operating cost and driver-shift estimation.
//!
//! Converts a route distance and duration into fuel, wage and marked-up
//! totals. Figures stay unrounded here; rounding to cents happens only when a
//! report is rendered.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::ValidationError;
use crate::report::round_currency;

/// Maximum continuous driving duration covered by one shift, in hours.
pub const SHIFT_HOURS: f64 = 12.0;

/// Cost parameters owned by the caller for the duration of one report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostConfig {
    /// Diesel price in dollars per gallon.
    pub diesel_price_per_gallon: f64,
    /// Fuel economy of the truck in miles per gallon.
    pub truck_mpg: f64,
    /// Driver pay in dollars per mile.
    pub wage_per_mile: f64,
    /// Markup applied to the base cost, in percent.
    pub markup_percent: f64,
    /// Distance assumed when the route lookup failed, in miles.
    pub fallback_distance_miles: f64,
}

impl CostConfig {
    pub const DEFAULT_DIESEL_PRICE: f64 = 4.0;
    pub const DEFAULT_TRUCK_MPG: f64 = 6.5;
    pub const DEFAULT_WAGE_PER_MILE: f64 = 0.65;
    pub const DEFAULT_MARKUP_PERCENT: f64 = 20.0;
    pub const DEFAULT_FALLBACK_DISTANCE: f64 = 500.0;

    /// Checks every parameter.
    ///
    /// Fuel economy must be strictly positive; prices, wage, markup and the
    /// fallback distance must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.truck_mpg.is_finite() || self.truck_mpg <= 0.0 {
            return Err(ValidationError::InvalidConfiguration(format!(
                "truck_mpg must be positive, got: {}",
                self.truck_mpg
            )));
        }
        for (name, value) in [
            ("diesel_price_per_gallon", self.diesel_price_per_gallon),
            ("wage_per_mile", self.wage_per_mile),
            ("markup_percent", self.markup_percent),
            ("fallback_distance_miles", self.fallback_distance_miles),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "{} must be non-negative, got: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            diesel_price_per_gallon: Self::DEFAULT_DIESEL_PRICE,
            truck_mpg: Self::DEFAULT_TRUCK_MPG,
            wage_per_mile: Self::DEFAULT_WAGE_PER_MILE,
            markup_percent: Self::DEFAULT_MARKUP_PERCENT,
            fallback_distance_miles: Self::DEFAULT_FALLBACK_DISTANCE,
        }
    }
}

/// Where the distance used for an estimate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Route,
    Fallback,
}

/// Cost and schedule figures for one shipment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct CostEstimate {
    pub distance_miles: f64,
    pub distance_source: DistanceSource,
    /// Absent when the route lookup failed or returned no duration.
    pub duration_hours: Option<f64>,
    pub fuel_gallons: f64,
    pub fuel_cost: f64,
    pub wage_cost: f64,
    pub base_cost: f64,
    pub total_cost: f64,
    /// Absent whenever the duration is absent.
    pub shift_count: Option<u32>,
}

impl CostEstimate {
    /// Copy with every currency amount rounded to cents.
    pub fn for_presentation(&self) -> Self {
        Self {
            fuel_cost: round_currency(self.fuel_cost),
            wage_cost: round_currency(self.wage_cost),
            base_cost: round_currency(self.base_cost),
            total_cost: round_currency(self.total_cost),
            ..*self
        }
    }
}

/// Number of 12-hour shifts needed to drive `duration_hours`.
///
/// # Returns
/// `None` for a missing, zero, negative or non-finite duration
///
/// # Example
/// ```
/// use load_planner::cost::shift_count;
///
/// assert_eq!(shift_count(Some(12.0)), Some(1));
/// assert_eq!(shift_count(Some(12.01)), Some(2));
/// assert_eq!(shift_count(None), None);
/// ```
pub fn shift_count(duration_hours: Option<f64>) -> Option<u32> {
    duration_hours
        .filter(|hours| hours.is_finite() && *hours > 0.0)
        .map(|hours| (hours / SHIFT_HOURS).ceil() as u32)
}

/// Estimates the cost of one route.
///
/// A missing distance is replaced by `config.fallback_distance_miles`, and in
/// that case the duration is ignored: a duration without a routed distance is
/// not trusted for scheduling.
///
/// # Parameters
/// * `distance_miles` - Routed distance, `None` if the lookup failed
/// * `duration_hours` - Routed driving time, if known
/// * `config` - Cost parameters
pub fn estimate(
    distance_miles: Option<f64>,
    duration_hours: Option<f64>,
    config: &CostConfig,
) -> CostEstimate {
    let routed = distance_miles.filter(|miles| miles.is_finite() && *miles >= 0.0);
    let (distance_miles, distance_source, duration_hours) = match routed {
        Some(miles) => (miles, DistanceSource::Route, duration_hours),
        None => (config.fallback_distance_miles, DistanceSource::Fallback, None),
    };
    let duration_hours = duration_hours.filter(|hours| hours.is_finite() && *hours > 0.0);

    let fuel_gallons = distance_miles / config.truck_mpg;
    let fuel_cost = fuel_gallons * config.diesel_price_per_gallon;
    let wage_cost = distance_miles * config.wage_per_mile;
    let base_cost = fuel_cost + wage_cost;
    let total_cost = base_cost * (1.0 + config.markup_percent / 100.0);

    CostEstimate {
        distance_miles,
        distance_source,
        duration_hours,
        fuel_gallons,
        fuel_cost,
        wage_cost,
        base_cost,
        total_cost,
        shift_count: shift_count(duration_hours),
    }
}
