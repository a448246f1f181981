//! REST API for the load planning service.
//!
//! Exposes packing, cost estimation, full load plans and truck selection over
//! HTTP. Uses Axum as the web framework and supports CORS.

use std::convert::Infallible;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{AppConfig, PlanningConfig};
use crate::cost::{CostConfig, CostEstimate, DistanceSource, estimate};
use crate::fleet::{
    Convoy, TruckProfile, TruckSelection, UnloadableReason, UnloadableShipment, default_fleet,
    plan_convoy, select_truck,
};
use crate::model::{Container, Shape, Shipment, ValidationError, validate_queue};
use crate::packing::{
    ItemOutcome, PackEvent, PackingConfig, PlacedItem, PlacementResult, RejectionReason,
    pack_with_config, pack_with_progress,
};
use crate::planner::{PlanSettings, plan_load};
use crate::report::{BalanceAxis, CostTotals, LoadReport, ReportLine, ReportWarning, WeightBalance};
use crate::route::RouteBackend;
use crate::types::Vec3;

#[derive(Clone)]
struct ApiState {
    planning: PlanningConfig,
    settings: PlanSettings,
    routes: Arc<RouteBackend>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>load_planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// Without `container` the configured default trailer is loaded.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "length": 53.0, "width": 8.5, "height": 9.0, "max_weight": 45000.0 },
        "shipments": [
            {
                "id": 1,
                "label": "Pallets",
                "length": 10.0,
                "width": 4.0,
                "height": 4.0,
                "weight": 3000.0,
                "origin": "Chicago, IL",
                "destination": "Denver, CO"
            }
        ],
        "hazmat_clearance": null
    })
)]
pub struct PackRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub container: Option<Container>,
    pub shipments: Vec<Shipment>,
    /// Overrides the configured hazmat clearance in feet.
    #[serde(default)]
    #[schema(nullable = true)]
    pub hazmat_clearance: Option<f64>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    container: Container,
    shipments: Vec<Shipment>,
    packing: PackingConfig,
}

#[derive(Debug)]
enum RequestValidationError {
    InvalidShipments(ValidationError),
    InvalidClearance(f64),
    InvalidCostConfig(ValidationError),
    EmptyFleet,
    InvalidTruckLimit,
}

impl PackRequest {
    fn into_validated(
        self,
        defaults: &PlanningConfig,
    ) -> Result<ValidatedPackRequest, RequestValidationError> {
        validate_queue(&self.shipments).map_err(RequestValidationError::InvalidShipments)?;

        let mut packing = defaults.packing();
        if let Some(clearance) = self.hazmat_clearance {
            if !clearance.is_finite() || clearance < 0.0 {
                return Err(RequestValidationError::InvalidClearance(clearance));
            }
            packing.hazmat_clearance = Some(clearance);
        }

        Ok(ValidatedPackRequest {
            container: self.container.unwrap_or_else(|| defaults.container()),
            shipments: self.shipments,
            packing,
        })
    }
}

/// Per-request cost parameters; omitted fields keep the configured value.
#[derive(Clone, Copy, Debug, Default, Deserialize, ToSchema)]
pub struct CostOverrides {
    #[schema(nullable = true)]
    pub diesel_price_per_gallon: Option<f64>,
    #[schema(nullable = true)]
    pub truck_mpg: Option<f64>,
    #[schema(nullable = true)]
    pub wage_per_mile: Option<f64>,
    #[schema(nullable = true)]
    pub markup_percent: Option<f64>,
    #[schema(nullable = true)]
    pub fallback_distance_miles: Option<f64>,
}

impl CostOverrides {
    fn apply(self, base: CostConfig) -> Result<CostConfig, RequestValidationError> {
        let config = CostConfig {
            diesel_price_per_gallon: self
                .diesel_price_per_gallon
                .unwrap_or(base.diesel_price_per_gallon),
            truck_mpg: self.truck_mpg.unwrap_or(base.truck_mpg),
            wage_per_mile: self.wage_per_mile.unwrap_or(base.wage_per_mile),
            markup_percent: self.markup_percent.unwrap_or(base.markup_percent),
            fallback_distance_miles: self
                .fallback_distance_miles
                .unwrap_or(base.fallback_distance_miles),
        };
        config
            .validate()
            .map_err(RequestValidationError::InvalidCostConfig)?;
        Ok(config)
    }
}

/// Request structure for the plan endpoint.
#[derive(Deserialize, ToSchema)]
pub struct PlanRequest {
    #[serde(flatten)]
    pub load: PackRequest,
    #[serde(default)]
    #[schema(nullable = true)]
    pub cost: Option<CostOverrides>,
}

/// Request structure for the estimate endpoint.
///
/// A missing or negative distance is priced at the fallback distance.
#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "distance_miles": 1000.0, "duration_hours": 16.0 }))]
pub struct EstimateRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub distance_miles: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub cost: Option<CostOverrides>,
}

/// Request structure for the truck selection endpoint.
///
/// Without `fleet` the standard fleet is searched.
#[derive(Deserialize, ToSchema)]
pub struct SelectTruckRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub fleet: Option<Vec<TruckProfile>>,
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub hazmat_clearance: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct SelectTruckResponse {
    /// `null` if no truck in the fleet takes every shipment.
    pub selection: Option<TruckSelection>,
}

/// Request structure for the convoy endpoint.
///
/// Without `truck` the configured default trailer is used.
#[derive(Deserialize, ToSchema)]
pub struct ConvoyRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub truck: Option<TruckProfile>,
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub hazmat_clearance: Option<f64>,
    #[serde(default = "default_max_trucks")]
    pub max_trucks: usize,
}

fn default_max_trucks() -> usize {
    10
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn cost_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid cost configuration",
        details,
    )
}

impl IntoResponse for RequestValidationError {
    fn into_response(self) -> Response {
        match self {
            RequestValidationError::InvalidShipments(err) => validation_error(err.to_string()),
            RequestValidationError::InvalidClearance(value) => validation_error(format!(
                "hazmat_clearance must be non-negative, got: {}",
                value
            )),
            RequestValidationError::InvalidCostConfig(err) => cost_config_error(err.to_string()),
            RequestValidationError::EmptyFleet => {
                validation_error("At least one truck profile must be specified")
            }
            RequestValidationError::InvalidTruckLimit => {
                validation_error("max_trucks must be at least 1")
            }
        }
    }
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(payload)| payload)
        .map_err(json_deserialize_error)
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    defaults: &PlanningConfig,
) -> Result<ValidatedPackRequest, Response> {
    parse_json(payload)?
        .into_validated(defaults)
        .map_err(IntoResponse::into_response)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_pack,
        handle_pack_stream,
        handle_estimate,
        handle_plan,
        handle_select_truck,
        handle_convoy
    ),
    components(
        schemas(
            PackRequest,
            PlanRequest,
            EstimateRequest,
            SelectTruckRequest,
            SelectTruckResponse,
            ConvoyRequest,
            CostOverrides,
            ErrorResponse,
            Container,
            Shipment,
            Shape,
            Vec3,
            PlacementResult,
            PlacedItem,
            ItemOutcome,
            RejectionReason,
            PackEvent,
            CostEstimate,
            DistanceSource,
            LoadReport,
            ReportLine,
            ReportWarning,
            WeightBalance,
            BalanceAxis,
            CostTotals,
            TruckProfile,
            TruckSelection,
            Convoy,
            UnloadableShipment,
            UnloadableReason
        )
    ),
    tags(
        (name = "packing", description = "Shelf packing of shipment queues"),
        (name = "planning", description = "Cost estimates, load reports and truck selection")
    )
)]
struct ApiDoc;

impl ApiState {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            planning: config.planning.clone(),
            settings: config.plan_settings(),
            routes: Arc::new(config.routing.build_backend()),
        }
    }
}

/// Builds the router with all endpoints and middleware.
fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // API endpoints
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/estimate", post(handle_estimate))
        .route("/plan", post(handle_plan))
        .route("/select_truck", post(handle_select_truck))
        .route("/convoy", post(handle_convoy))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: AppConfig) -> std::io::Result<()> {
    let state = ApiState::from_config(&config);
    let routing = state.routes.describe();
    let app = router(state);
    let api = &config.api;

    let addr = api.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running on http://{}:{}", api.display_host(), api.port());
    if api.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", api.port());
    }
    info!("Route provider: {}", routing);
    info!(
        "Endpoints: POST /pack, /pack_stream, /estimate, /plan, /select_truck, /convoy; GET /docs"
    );

    axum::serve(listener, app).await.inspect_err(|err| {
        error!("API server terminated with an error: {err}");
    })
}

/// Handler for POST /pack endpoint.
///
/// Packs the shipments into the container in queue order.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Placement for every shipment", body = PlacementResult),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, &state.planning) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!("New pack request: {} shipments", request.shipments.len());
    let result = pack_with_config(&request.container, &request.shipments, request.packing);
    info!(
        "Result: {} placed, {} rejected, over capacity: {}",
        result.placed_count(),
        result.rejected_count(),
        result.over_capacity
    );

    (StatusCode::OK, Json(result)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, &state.planning) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let mut receiver_open = true;
        pack_with_progress(
            &request.container,
            &request.shipments,
            request.packing,
            |evt| {
                if !receiver_open {
                    return;
                }
                if let Ok(json) = serde_json::to_string(evt) {
                    // Receiver has closed the stream; remaining events are discarded.
                    receiver_open = tx.blocking_send(json).is_ok();
                }
            },
        );
    });

    let stream =
        ReceiverStream::new(rx).map(|msg| Ok::<_, Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /estimate endpoint.
///
/// Estimates cost and shifts for a single route.
#[utoipa::path(
    post,
    path = "/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Cost estimate, rounded to cents", body = CostEstimate),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid cost configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_estimate(
    State(state): State<ApiState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let config = match request.cost.unwrap_or_default().apply(state.settings.cost) {
        Ok(config) => config,
        Err(err) => return err.into_response(),
    };

    let result = estimate(request.distance_miles, request.duration_hours, &config);
    (StatusCode::OK, Json(result.for_presentation())).into_response()
}

/// Handler for POST /plan endpoint.
///
/// Packs the queue, resolves routes through the configured provider and
/// returns the merged load report.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Load report, currency rounded to cents", body = LoadReport),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or cost configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let PlanRequest { load, cost } = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let request = match load.into_validated(&state.planning) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let cost = match cost.unwrap_or_default().apply(state.settings.cost) {
        Ok(cost) => cost,
        Err(err) => return err.into_response(),
    };

    let settings = PlanSettings {
        packing: request.packing,
        cost,
        ..state.settings
    };
    info!("New plan request: {} shipments", request.shipments.len());
    match plan_load(
        &request.container,
        &request.shipments,
        &settings,
        state.routes.as_ref(),
    )
    .await
    {
        Ok(report) => (StatusCode::OK, Json(report.for_presentation())).into_response(),
        Err(err) => validation_error(err.to_string()),
    }
}

/// Handler for POST /select_truck endpoint.
///
/// Picks the smallest truck that takes every shipment within its payload.
#[utoipa::path(
    post,
    path = "/select_truck",
    request_body = SelectTruckRequest,
    responses(
        (status = 200, description = "Selected truck, or null", body = SelectTruckResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_select_truck(
    State(state): State<ApiState>,
    payload: Result<Json<SelectTruckRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let fleet = request.fleet.unwrap_or_else(default_fleet);
    if fleet.is_empty() {
        return RequestValidationError::EmptyFleet.into_response();
    }
    let load = PackRequest {
        container: None,
        shipments: request.shipments,
        hazmat_clearance: request.hazmat_clearance,
    };
    let load = match load.into_validated(&state.planning) {
        Ok(load) => load,
        Err(err) => return err.into_response(),
    };

    let selection = select_truck(&fleet, &load.shipments, load.packing);
    info!(
        "Truck selection over {} profiles: {}",
        fleet.len(),
        selection
            .as_ref()
            .map_or("none fits", |selection| selection.truck.name.as_str())
    );
    (StatusCode::OK, Json(SelectTruckResponse { selection })).into_response()
}

/// Handler for POST /convoy endpoint.
///
/// Spreads the queue over several trucks of one profile.
#[utoipa::path(
    post,
    path = "/convoy",
    request_body = ConvoyRequest,
    responses(
        (status = 200, description = "One packing per truck", body = Convoy),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_convoy(
    State(state): State<ApiState>,
    payload: Result<Json<ConvoyRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if request.max_trucks == 0 {
        return RequestValidationError::InvalidTruckLimit.into_response();
    }
    let truck = request
        .truck
        .unwrap_or_else(|| TruckProfile::new("Default trailer", state.planning.container()));
    let load = PackRequest {
        container: Some(truck.container),
        shipments: request.shipments,
        hazmat_clearance: request.hazmat_clearance,
    };
    let load = match load.into_validated(&state.planning) {
        Ok(load) => load,
        Err(err) => return err.into_response(),
    };

    let convoy = plan_convoy(&truck, &load.shipments, load.packing, request.max_trucks);
    (StatusCode::OK, Json(convoy)).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
