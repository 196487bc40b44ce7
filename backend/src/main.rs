use axum::http::{HeaderValue, Method};
use axum::Router;
use rideshare::{handlers, services::sweeper, store::seed, utils, Config, RideService};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let service = Arc::new(RideService::from_config(&config));

    if config.seed_demo {
        seed::seed_demo(&service).await?;
    }

    // Expire pending matches and stuck wallet rows in the background
    sweeper::spawn_expiry_sweeper(service.clone(), config.sweep_interval);

    let port = config.port;
    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(service: Arc<RideService>) -> Router {
    handlers::router(service).layer(create_cors_layer())
}

fn create_cors_layer() -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}
