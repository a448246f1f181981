//! Route lookup boundary.
//!
//! Distance and duration between two location identifiers come from an
//! external, potentially slow and potentially failing service. Lookups for a
//! queue are fanned out with bounded concurrency, each one bounded by a
//! timeout; a failed lookup only affects its own shipment.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::model::{Shipment, ShipmentId};

/// Distance and driving time of one route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteInfo {
    pub distance_miles: f64,
    pub duration_hours: f64,
}

impl RouteInfo {
    /// Rejects negative or non-finite figures.
    pub fn validated(self) -> Result<Self, RouteError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(self.distance_miles) && valid(self.duration_hours) {
            Ok(self)
        } else {
            Err(RouteError::Malformed(format!(
                "distance {} mi / duration {} h",
                self.distance_miles, self.duration_hours
            )))
        }
    }
}

/// Why a route lookup produced no usable result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("route service unreachable: {0}")]
    Unreachable(String),
    #[error("route lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("route service returned malformed data: {0}")]
    Malformed(String),
    #[error("no route between '{origin}' and '{destination}'")]
    NotFound { origin: String, destination: String },
}

impl RouteError {
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::Unreachable(_) => "unreachable",
            RouteError::Timeout(_) => "timeout",
            RouteError::Malformed(_) => "malformed",
            RouteError::NotFound { .. } => "not_found",
        }
    }
}

/// Source of route distances and durations.
pub trait RouteProvider: Send + Sync {
    fn lookup_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> impl Future<Output = Result<RouteInfo, RouteError>> + Send;
}

/// Fan-out parameters for [`lookup_routes`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LookupOptions {
    /// Upper bound for each individual lookup.
    pub timeout: Duration,
    /// Maximum number of lookups in flight.
    pub concurrency: usize,
}

impl LookupOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_CONCURRENCY: usize = 4;
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }
}

/// Looks up the route of every shipment.
///
/// Lookups run concurrently, at most `options.concurrency` at a time, and each
/// is dropped (cancelled) once it exceeds `options.timeout`. Completion order
/// is unspecified; the map is keyed by shipment id.
pub async fn lookup_routes<P: RouteProvider>(
    provider: &P,
    shipments: &[Shipment],
    options: LookupOptions,
) -> HashMap<ShipmentId, Result<RouteInfo, RouteError>> {
    let lookups: Vec<_> = shipments
        .iter()
        .map(|shipment| lookup_one(provider, shipment, options.timeout))
        .collect();
    stream::iter(lookups)
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await
}

async fn lookup_one<P: RouteProvider>(
    provider: &P,
    shipment: &Shipment,
    timeout: Duration,
) -> (ShipmentId, Result<RouteInfo, RouteError>) {
    let outcome = tokio::time::timeout(
        timeout,
        provider.lookup_route(&shipment.origin, &shipment.destination),
    )
    .await
    .unwrap_or(Err(RouteError::Timeout(timeout)))
    .and_then(RouteInfo::validated);

    match &outcome {
        Ok(route) => debug!(
            id = shipment.id,
            miles = route.distance_miles,
            hours = route.duration_hours,
            "route resolved"
        ),
        Err(err) => warn!(
            id = shipment.id,
            origin = %shipment.origin,
            destination = %shipment.destination,
            "route lookup failed: {err}"
        ),
    }
    (shipment.id, outcome)
}

/// One entry of a route table file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteTableEntry {
    pub origin: String,
    pub destination: String,
    pub distance_miles: f64,
    pub duration_hours: f64,
}

/// Error while loading a route table file.
#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("could not read route table: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse route table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory table of known routes.
///
/// Lookups are symmetric: a route from A to B also answers B to A.
#[derive(Clone, Debug, Default)]
pub struct StaticRouteTable {
    routes: HashMap<(String, String), RouteInfo>,
}

impl StaticRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(
        mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        route: RouteInfo,
    ) -> Self {
        self.insert(origin, destination, route);
        self
    }

    pub fn insert(
        &mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        route: RouteInfo,
    ) {
        self.routes
            .insert((normalize(&origin.into()), normalize(&destination.into())), route);
    }

    /// Builds a table from a JSON array of [`RouteTableEntry`].
    pub fn from_json(raw: &str) -> Result<Self, RouteTableError> {
        let entries: Vec<RouteTableEntry> = serde_json::from_str(raw)?;
        let mut table = Self::new();
        for entry in entries {
            table.insert(
                entry.origin,
                entry.destination,
                RouteInfo {
                    distance_miles: entry.distance_miles,
                    duration_hours: entry.duration_hours,
                },
            );
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, RouteTableError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn get(&self, origin: &str, destination: &str) -> Option<RouteInfo> {
        let origin = normalize(origin);
        let destination = normalize(destination);
        self.routes
            .get(&(origin.clone(), destination.clone()))
            .or_else(|| self.routes.get(&(destination, origin)))
            .copied()
    }
}

fn normalize(location: &str) -> String {
    location.trim().to_lowercase()
}

impl RouteProvider for StaticRouteTable {
    async fn lookup_route(&self, origin: &str, destination: &str) -> Result<RouteInfo, RouteError> {
        self.get(origin, destination)
            .ok_or_else(|| RouteError::NotFound {
                origin: origin.to_string(),
                destination: destination.to_string(),
            })
    }
}

/// Route service reached over HTTP.
///
/// Issues `GET {endpoint}?origin=..&destination=..` and expects a JSON body
/// `{"distance_miles": f64, "duration_hours": f64}`.
#[derive(Clone, Debug)]
pub struct HttpRouteProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRouteProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RouteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|err| RouteError::Unreachable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("load-planner/{version}")
}

impl RouteProvider for HttpRouteProvider {
    async fn lookup_route(&self, origin: &str, destination: &str) -> Result<RouteInfo, RouteError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("origin", origin), ("destination", destination)])
            .send()
            .await
            .map_err(|err| RouteError::Unreachable(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RouteError::NotFound {
                origin: origin.to_string(),
                destination: destination.to_string(),
            });
        }
        if !status.is_success() {
            return Err(RouteError::Unreachable(format!("HTTP {status}")));
        }

        response
            .json::<RouteInfo>()
            .await
            .map_err(|err| RouteError::Malformed(err.to_string()))
    }
}

/// Route provider selected by the service configuration.
#[derive(Clone, Debug)]
pub enum RouteBackend {
    Http(HttpRouteProvider),
    Table(StaticRouteTable),
    /// No provider configured; every lookup fails and degrades to the fallback.
    Disabled,
}

impl RouteBackend {
    pub fn describe(&self) -> String {
        match self {
            RouteBackend::Http(provider) => format!("http ({})", provider.endpoint()),
            RouteBackend::Table(table) => format!("route table ({} routes)", table.len()),
            RouteBackend::Disabled => "disabled".to_string(),
        }
    }
}

impl RouteProvider for RouteBackend {
    async fn lookup_route(&self, origin: &str, destination: &str) -> Result<RouteInfo, RouteError> {
        match self {
            RouteBackend::Http(provider) => provider.lookup_route(origin, destination).await,
            RouteBackend::Table(table) => table.lookup_route(origin, destination).await,
            RouteBackend::Disabled => Err(RouteError::Unreachable(
                "no route provider configured".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn route(miles: f64, hours: f64) -> RouteInfo {
        RouteInfo {
            distance_miles: miles,
            duration_hours: hours,
        }
    }

    fn shipment(id: ShipmentId, origin: &str, destination: &str) -> Shipment {
        Shipment::new(id, (4.0, 4.0, 4.0), 100.0)
            .unwrap()
            .with_route(origin, destination)
    }

    /// Answers after a delay; `"stuck"` never answers in time.
    struct SlowProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowProvider {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl RouteProvider for SlowProvider {
        async fn lookup_route(
            &self,
            origin: &str,
            _destination: &str,
        ) -> Result<RouteInfo, RouteError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = if origin == "stuck" { 3_600 } else { 1 };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(route(100.0, 2.0))
        }
    }

    #[tokio::test]
    async fn table_lookup_is_symmetric_and_case_insensitive() {
        let table = StaticRouteTable::new().with_route("Dallas, TX", "Houston, TX", route(239.0, 3.6));

        assert_eq!(
            table.lookup_route("dallas, tx", "Houston, TX").await,
            Ok(route(239.0, 3.6))
        );
        assert_eq!(
            table.lookup_route("Houston, TX", " Dallas, TX ").await,
            Ok(route(239.0, 3.6))
        );
        assert!(matches!(
            table.lookup_route("Dallas, TX", "Austin, TX").await,
            Err(RouteError::NotFound { .. })
        ));
    }

    #[test]
    fn table_parses_json_entries() {
        let raw = r#"[
            {"origin": "A", "destination": "B", "distance_miles": 10.0, "duration_hours": 0.5},
            {"origin": "B", "destination": "C", "distance_miles": 20.0, "duration_hours": 1.0}
        ]"#;
        let table = StaticRouteTable::from_json(raw).expect("valid table");
        assert_eq!(table.len(), 2);
        assert!(StaticRouteTable::from_json("{").is_err());
    }

    #[test]
    fn malformed_routes_are_rejected() {
        assert!(route(10.0, 1.0).validated().is_ok());
        assert!(matches!(
            route(-1.0, 1.0).validated(),
            Err(RouteError::Malformed(_))
        ));
        assert!(route(10.0, f64::NAN).validated().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_lookups_do_not_block_the_rest() {
        let provider = SlowProvider::new();
        let shipments = [
            shipment(1, "a", "b"),
            shipment(2, "stuck", "b"),
            shipment(3, "c", "d"),
        ];
        let options = LookupOptions {
            timeout: Duration::from_secs(5),
            concurrency: 3,
        };

        let results = lookup_routes(&provider, &shipments, options).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[&1], Ok(route(100.0, 2.0)));
        assert_eq!(results[&2], Err(RouteError::Timeout(Duration::from_secs(5))));
        assert_eq!(results[&3], Ok(route(100.0, 2.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_respects_concurrency_limit() {
        let provider = SlowProvider::new();
        let shipments: Vec<_> = (0..10).map(|id| shipment(id, "a", "b")).collect();
        let options = LookupOptions {
            timeout: Duration::from_secs(5),
            concurrency: 2,
        };

        let results = lookup_routes(&provider, &shipments, options).await;

        assert_eq!(results.len(), 10);
        assert!(results.values().all(Result::is_ok));
        assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_backend_always_fails() {
        let backend = RouteBackend::Disabled;
        assert!(matches!(
            backend.lookup_route("a", "b").await,
            Err(RouteError::Unreachable(_))
        ));
        assert_eq!(backend.describe(), "disabled");
    }
}
