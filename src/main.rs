use axum::{
    body::Body,
    http::{header, header::HeaderMap, HeaderValue, Request},
    middleware::{from_fn, Next},
    response::IntoResponse,
};
use opendal::services::S3;
use opendal::Operator;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use givebridge::{auth, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    // Ensure critical environment variables are set
    env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    // Initialize Tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "givebridge=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GiveBridge application...");

    // Database Setup
    tracing::info!("Initializing database connection pool...");
    let db_pool = db::init_pool().await?;
    tracing::info!("Database connection pool initialized successfully");

    // Object storage for donation images (S3 compatible). Optional: the
    // image upload route answers 503 while unconfigured.
    let storage = match build_storage() {
        Ok(op) => Some(op),
        Err(e) => {
            tracing::warn!("Object storage disabled: {}", e);
            None
        }
    };

    let state = AppState { db: db_pool, storage };

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(
                env::var("RATE_LIMIT_PER_SECOND")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1200),
            )
            .burst_size(
                env::var("RATE_LIMIT_BURST")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(2400),
            )
            .finish()
            .expect("governor config"),
    );

    // CORS configuration (no permissive mode)
    let cors = {
        let env_mode = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .filter_map(|s| {
                        let trimmed = s.trim();
                        if trimmed.is_empty() {
                            return None;
                        }
                        match trimmed.parse::<HeaderValue>() {
                            Ok(value) => Some(value),
                            Err(_) => {
                                tracing::warn!("Ignoring invalid ALLOWED_ORIGINS entry: {}", trimmed);
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| {
                if env_mode == "production" {
                    panic!("ALLOWED_ORIGINS must contain at least one valid origin in production")
                }
                vec![
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://127.0.0.1:3000"),
                ]
            });

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true)
    };

    let app = givebridge::app(state)
        .layer(from_fn(require_auth))
        .layer(cors)
        .layer(GovernorLayer { config: governor_config })
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_storage() -> anyhow::Result<Operator> {
    let endpoint = env::var("OBJECT_STORAGE_ENDPOINT")
        .map_err(|_| anyhow::anyhow!("OBJECT_STORAGE_ENDPOINT not set"))?;
    let bucket_name = env::var("OBJECT_STORAGE_BUCKET")
        .map_err(|_| anyhow::anyhow!("OBJECT_STORAGE_BUCKET not set"))?;
    let region = env::var("OBJECT_STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let access_key = env::var("OBJECT_STORAGE_ACCESS_KEY_ID")
        .map_err(|_| anyhow::anyhow!("OBJECT_STORAGE_ACCESS_KEY_ID not set"))?;
    let secret_key = env::var("OBJECT_STORAGE_SECRET_ACCESS_KEY")
        .map_err(|_| anyhow::anyhow!("OBJECT_STORAGE_SECRET_ACCESS_KEY not set"))?;

    let op: Operator = Operator::new(
        S3::default()
            .endpoint(&endpoint)
            .bucket(&bucket_name)
            .region(&region)
            .access_key_id(&access_key)
            .secret_access_key(&secret_key),
    )?
    .finish();
    Ok(op)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}

async fn require_auth(req: Request<Body>, next: Next) -> impl IntoResponse {
    // Guard only API endpoints here; /health and /auth stay open.
    let path = req.uri().path();
    if req.method() == axum::http::Method::OPTIONS || !path.starts_with("/api/") {
        return next.run(req).await;
    }

    // Check headers for token
    let headers: &HeaderMap = req.headers();
    if let Some(token) = auth::extract_token_from_headers(headers) {
        if auth::validate_token_str(&token).is_ok() {
            return next.run(req).await;
        }
    }

    // Not authenticated: API routes get 401.
    (axum::http::StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
