// Solar Estimate API v0.1
use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::estimate::AppState;
use services::power::PowerClient;
use services::pvgis::PvgisClient;

/// OpenAPI document for the Solar Estimate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Solar Estimate API",
        version = "0.1.0",
        description = "Rooftop solar potential estimates in the shape of the Google Solar API \
            buildingInsights response. Roof area comes from a GeoJSON outline projected to UTM, \
            irradiance from the NASA POWER climatology and energy yield from a PVGIS PVcalc \
            simulation.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Estimate", description = "Solar potential estimates"),
    ),
    paths(
        routes::health::health_check,
        routes::estimate::estimate_solar_potential,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::estimate::EstimateRequest,
            routes::estimate::GeoJsonPolygon,
            routes::estimate::PolygonType,
            services::assembler::EstimateResponse,
            services::assembler::BuildingInsights,
            services::assembler::SolarPotential,
            services::assembler::RoofSegment,
            services::assembler::IrradianceStatsResponse,
            services::assembler::Assumptions,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solar_estimate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // One pooled client per provider
    let power_http = services::http::build_client(&config.user_agent, config.http_timeout)
        .expect("Failed to build NASA POWER HTTP client");
    let pvgis_http = services::http::build_client(&config.user_agent, config.http_timeout)
        .expect("Failed to build PVGIS HTTP client");

    let app_state = AppState {
        power: PowerClient::new(
            power_http,
            &config.power_api_url,
            config.irradiance_start_year,
            config.irradiance_end_year,
        ),
        pvgis: PvgisClient::new(pvgis_http, &config.pvgis_api_url),
        default_system_kw: config.default_system_kw,
    };
    tracing::info!(
        power = %config.power_api_url,
        pvgis = %config.pvgis_api_url,
        timeout_secs = config.http_timeout.as_secs(),
        "Provider clients configured"
    );

    // CORS: browsers call the estimate endpoint directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = routes::build_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
