use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    response::Json,
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use earthdata_client::EarthdataClient;
use terraflux_common::Config;
use terraflux_store::{
    DataSourceService, ImpactService, InterventionService, OptimizationService, SatelliteService,
    Store,
};

mod rest;

pub struct AppState {
    pub interventions: InterventionService,
    pub readings: SatelliteService,
    pub impacts: ImpactService,
    pub optimizations: OptimizationService,
    pub sources: DataSourceService,
    pub earthdata: EarthdataClient,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Terraflux climate intervention tracking API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

fn interventions_routes() -> Router<Arc<AppState>> {
    use rest::interventions as h;
    Router::new()
        .route("/", axum::routing::post(h::create).get(h::list))
        .route("/near", get(h::near))
        .route("/statistics", get(h::statistics))
        .route("/stats/total-capacity", get(h::total_capacity))
        .route("/stats/capacity-by-kind", get(h::capacity_by_kind))
        .route("/operator/{operator}", get(h::by_operator))
        .route("/kind/{kind}", get(h::by_kind))
        .route("/status/{status}", get(h::by_status))
        .route("/{id}", get(h::get).put(h::update).delete(h::delete))
}

fn satellite_routes() -> Router<Arc<AppState>> {
    use rest::satellite as h;
    Router::new()
        .route("/", axum::routing::post(h::create).get(h::list))
        .route("/near", get(h::locate))
        .route("/time-range", get(h::time_range))
        .route("/statistics", get(h::statistics))
        .route("/grid-cell/{cell}", get(h::by_grid_cell))
        .route("/grid-cell/{cell}/latest", get(h::latest_in_cell))
        .route("/satellite/{satellite_id}", get(h::by_satellite))
        .route("/{id}", get(h::get).put(h::update).delete(h::delete))
}

fn impacts_routes() -> Router<Arc<AppState>> {
    use rest::impacts as h;
    Router::new()
        .route("/", axum::routing::post(h::create).get(h::list))
        .route("/effectiveness-range", get(h::effectiveness_range))
        .route("/best-performing", get(h::best_performing))
        .route("/statistics", get(h::statistics))
        .route("/intervention/{id}", get(h::by_intervention))
        .route("/grid-cell/{cell}", get(h::by_grid_cell))
        .route("/{id}", get(h::get).put(h::update).delete(h::delete))
}

fn optimization_routes() -> Router<Arc<AppState>> {
    use rest::optimizations as h;
    Router::new()
        .route("/", axum::routing::post(h::create).get(h::list))
        .route("/best-performing", get(h::best_performing))
        .route("/statistics", get(h::statistics))
        .route("/operator/{operator}", get(h::by_operator))
        .route("/grid-cell/{cell}", get(h::by_grid_cell))
        .route("/algorithm/{algorithm}", get(h::by_algorithm))
        .route("/status/{status}", get(h::by_status))
        .route("/{id}", get(h::get).put(h::update).delete(h::delete))
}

fn sources_routes() -> Router<Arc<AppState>> {
    use rest::sources as h;
    Router::new()
        .route("/", axum::routing::post(h::create).get(h::list))
        .route("/active", get(h::active))
        .route("/statistics", get(h::statistics))
        .route("/provider/{provider}", get(h::by_provider))
        .route("/kind/{kind}", get(h::by_kind))
        .route("/auth/{requires_auth}", get(h::by_auth))
        .route("/frequency/{frequency}", get(h::by_frequency))
        .route("/search/{term}", get(h::search))
        .route("/{id}", get(h::get).put(h::update).delete(h::delete))
}

fn climate_routes() -> Router<Arc<AppState>> {
    use rest::climate as h;
    Router::new()
        .route("/co2", get(h::co2))
        .route("/temperature", get(h::temperature))
        .route("/biomass", get(h::biomass))
        .route("/historical", get(h::historical))
        .route("/optimization", get(h::optimization))
        .route("/satellite-imagery", get(h::satellite_imagery))
}

pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/interventions", interventions_routes())
        .nest("/satellite-data", satellite_routes())
        .nest("/impacts", impacts_routes())
        .nest("/optimization-results", optimization_routes())
        .nest("/data-sources", sources_routes())
        .nest("/climate-data", climate_routes());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Operational data changes between requests: never cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("terraflux=info".parse()?))
        .init();

    let config = Config::from_env();
    let store = Store::new();

    let state = Arc::new(AppState {
        interventions: InterventionService::new(store.clone()),
        readings: SatelliteService::new(store.clone()),
        impacts: ImpactService::new(store.clone()),
        optimizations: OptimizationService::new(store.clone()),
        sources: DataSourceService::new(store),
        earthdata: EarthdataClient::new(&config.power_base_url),
    });

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Terraflux API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
