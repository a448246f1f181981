use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::cost::CostConfig;
use crate::model::Container;
use crate::packing::PackingConfig;
use crate::planner::PlanSettings;
use crate::report::ReportOptions;
use crate::route::{HttpRouteProvider, LookupOptions, RouteBackend, StaticRouteTable};

/// Complete service configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planning: PlanningConfig,
    pub routing: RoutingConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planning: PlanningConfig::from_env(),
            routing: RoutingConfig::from_env(),
        }
    }

    /// Planning settings for a request that overrides nothing.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            packing: self.planning.packing(),
            cost: self.planning.cost(),
            lookup: self.routing.lookup(),
            report: self.planning.report(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let host_value =
            env_string("LOAD_PLANNER_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse LOAD_PLANNER_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (default_ip, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match env_string("LOAD_PLANNER_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "LOAD_PLANNER_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse LOAD_PLANNER_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Defaults for planning requests that do not override them.
#[derive(Clone, Debug)]
pub struct PlanningConfig {
    container: Container,
    cost: CostConfig,
    packing: PackingConfig,
    report: ReportOptions,
}

impl PlanningConfig {
    const LENGTH_VAR: &'static str = "LOAD_PLANNER_CONTAINER_LENGTH";
    const WIDTH_VAR: &'static str = "LOAD_PLANNER_CONTAINER_WIDTH";
    const HEIGHT_VAR: &'static str = "LOAD_PLANNER_CONTAINER_HEIGHT";
    const MAX_WEIGHT_VAR: &'static str = "LOAD_PLANNER_CONTAINER_MAX_WEIGHT";
    const DIESEL_VAR: &'static str = "LOAD_PLANNER_DIESEL_PRICE";
    const MPG_VAR: &'static str = "LOAD_PLANNER_TRUCK_MPG";
    const WAGE_VAR: &'static str = "LOAD_PLANNER_WAGE_PER_MILE";
    const MARKUP_VAR: &'static str = "LOAD_PLANNER_MARKUP_PERCENT";
    const FALLBACK_VAR: &'static str = "LOAD_PLANNER_FALLBACK_DISTANCE";
    const CLEARANCE_VAR: &'static str = "LOAD_PLANNER_HAZMAT_CLEARANCE";
    const EPSILON_VAR: &'static str = "LOAD_PLANNER_GENERAL_EPSILON";
    const DENSITY_VAR: &'static str = "LOAD_PLANNER_DENSITY_ALERT";
    const BALANCE_VAR: &'static str = "LOAD_PLANNER_BALANCE_ALERT";

    fn from_env() -> Self {
        let trailer = Container::standard_trailer();
        let positive = |value: f64| value > 0.0;
        let non_negative = |value: f64| value >= 0.0;

        let container = Container::new(
            load_f64(Self::LENGTH_VAR, trailer.length(), positive, "must be greater than 0"),
            load_f64(Self::WIDTH_VAR, trailer.width(), positive, "must be greater than 0"),
            load_f64(Self::HEIGHT_VAR, trailer.height(), positive, "must be greater than 0"),
            load_f64(
                Self::MAX_WEIGHT_VAR,
                trailer.max_weight(),
                positive,
                "must be greater than 0",
            ),
        )
        .unwrap_or_else(|err| {
            warn!("Invalid default container ({}). Using 53 ft trailer.", err);
            trailer
        });

        let cost = CostConfig {
            diesel_price_per_gallon: load_f64(
                Self::DIESEL_VAR,
                CostConfig::DEFAULT_DIESEL_PRICE,
                non_negative,
                "must not be negative",
            ),
            truck_mpg: load_f64(
                Self::MPG_VAR,
                CostConfig::DEFAULT_TRUCK_MPG,
                positive,
                "must be greater than 0",
            ),
            wage_per_mile: load_f64(
                Self::WAGE_VAR,
                CostConfig::DEFAULT_WAGE_PER_MILE,
                non_negative,
                "must not be negative",
            ),
            markup_percent: load_f64(
                Self::MARKUP_VAR,
                CostConfig::DEFAULT_MARKUP_PERCENT,
                non_negative,
                "must not be negative",
            ),
            fallback_distance_miles: load_f64(
                Self::FALLBACK_VAR,
                CostConfig::DEFAULT_FALLBACK_DISTANCE,
                non_negative,
                "must not be negative",
            ),
        };

        let hazmat_clearance = env_string(Self::CLEARANCE_VAR).map(|_| {
            let clearance = load_f64(Self::CLEARANCE_VAR, 0.0, non_negative, "must not be negative");
            info!("Hazmat segregation enabled with {} ft clearance", clearance);
            clearance
        });

        let packing = PackingConfig::builder()
            .general_epsilon(load_f64(
                Self::EPSILON_VAR,
                PackingConfig::DEFAULT_GENERAL_EPSILON,
                valid_epsilon,
                "must be greater than 0 and at most 0.001",
            ))
            .hazmat_clearance(hazmat_clearance)
            .build();

        let report = ReportOptions {
            density_alert_lb_per_cuft: load_f64(
                Self::DENSITY_VAR,
                ReportOptions::DEFAULT_DENSITY_ALERT,
                positive,
                "must be greater than 0",
            ),
            balance_alert_share: env_string(Self::BALANCE_VAR).map(|_| {
                load_f64(
                    Self::BALANCE_VAR,
                    1.0,
                    |value| value > 0.5 && value <= 1.0,
                    "must be greater than 0.5 and at most 1",
                )
            }),
        };

        Self {
            container,
            cost,
            packing,
            report,
        }
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn cost(&self) -> CostConfig {
        self.cost
    }

    pub fn packing(&self) -> PackingConfig {
        self.packing
    }

    pub fn report(&self) -> ReportOptions {
        self.report
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            container: Container::standard_trailer(),
            cost: CostConfig::default(),
            packing: PackingConfig::default(),
            report: ReportOptions::default(),
        }
    }
}

/// Configuration for route lookups.
#[derive(Clone, Debug, Default)]
pub struct RoutingConfig {
    endpoint: Option<String>,
    table_path: Option<PathBuf>,
    lookup: LookupOptions,
}

impl RoutingConfig {
    const ENDPOINT_VAR: &'static str = "LOAD_PLANNER_ROUTE_ENDPOINT";
    const TABLE_VAR: &'static str = "LOAD_PLANNER_ROUTE_TABLE";
    const TIMEOUT_VAR: &'static str = "LOAD_PLANNER_ROUTE_TIMEOUT_MS";
    const CONCURRENCY_VAR: &'static str = "LOAD_PLANNER_ROUTE_CONCURRENCY";

    fn from_env() -> Self {
        let default_timeout_ms = LookupOptions::DEFAULT_TIMEOUT.as_millis() as f64;
        let timeout_ms = load_f64(
            Self::TIMEOUT_VAR,
            default_timeout_ms,
            |value| value >= 1.0,
            "must be at least 1",
        );
        let concurrency = load_f64(
            Self::CONCURRENCY_VAR,
            LookupOptions::DEFAULT_CONCURRENCY as f64,
            |value| value >= 1.0 && value.fract() == 0.0,
            "must be a positive integer",
        );

        Self {
            endpoint: env_string(Self::ENDPOINT_VAR),
            table_path: env_string(Self::TABLE_VAR).map(PathBuf::from),
            lookup: LookupOptions {
                timeout: Duration::from_millis(timeout_ms as u64),
                concurrency: concurrency as usize,
            },
        }
    }

    pub fn lookup(&self) -> LookupOptions {
        self.lookup
    }

    /// Builds the route provider.
    ///
    /// A route table takes precedence over the HTTP endpoint. Any setup failure
    /// is logged and leaves routing disabled, so plans still fall back to the
    /// configured distance.
    pub fn build_backend(&self) -> RouteBackend {
        if let Some(path) = &self.table_path {
            return match StaticRouteTable::load(path) {
                Ok(table) if table.is_empty() => {
                    warn!("Route table {} has no routes. Routing disabled.", path.display());
                    RouteBackend::Disabled
                }
                Ok(table) => RouteBackend::Table(table),
                Err(err) => {
                    warn!("Route table {} unusable: {}. Routing disabled.", path.display(), err);
                    RouteBackend::Disabled
                }
            };
        }

        match &self.endpoint {
            Some(endpoint) => match HttpRouteProvider::new(endpoint.clone(), self.lookup.timeout) {
                Ok(provider) => RouteBackend::Http(provider),
                Err(err) => {
                    warn!("Route endpoint {} unusable: {}. Routing disabled.", endpoint, err);
                    RouteBackend::Disabled
                }
            },
            None => RouteBackend::Disabled,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn valid_epsilon(value: f64) -> bool {
    value > 0.0 && value <= PackingConfig::MAX_GENERAL_EPSILON
}

fn parse_f64(raw: &str, validator: impl Fn(f64) -> bool) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => Ok(value),
        Ok(value) => Err(format!("invalid value {value}")),
        Err(err) => Err(format!("not a number: {err}")),
    }
}

fn load_f64(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match parse_f64(&raw, validator) {
            Ok(value) => value,
            Err(reason) => {
                warn!(
                    "{} contains '{}' ({}): {}. Using {}.",
                    var_name, raw, reason, invalid_hint, default
                );
                default
            }
        },
        None => default,
    }
}
