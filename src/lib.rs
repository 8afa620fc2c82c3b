pub mod auth;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod matching;
pub mod routes;
pub mod validate;

use axum::{
    routing::{get, post, put},
    Router,
};
use opendal::Operator;

use db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub storage: Option<Operator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Auth routes
        .route("/auth/dev/login", post(auth::dev_login))
        .route("/auth/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        // Profiles
        .route("/api/donors", get(routes::profiles::list_donors).post(routes::profiles::create_donor))
        .route("/api/donors/{id}", get(routes::profiles::donor_detail))
        .route(
            "/api/recipients",
            get(routes::profiles::list_recipients).post(routes::profiles::create_recipient),
        )
        .route("/api/ngos", get(routes::profiles::list_ngos).post(routes::profiles::create_ngo))
        // Donations
        .route(
            "/api/donations",
            get(routes::donations::list_donations).post(routes::donations::create_donation),
        )
        .route(
            "/api/donations/{id}",
            put(routes::donations::update_donation).delete(routes::donations::delete_donation),
        )
        .route("/api/donations/{id}/match", post(routes::donations::match_donation))
        .route("/api/donations/{id}/status", post(routes::donations::transition_donation))
        .route("/api/donations/image/upload", post(routes::donations::generate_upload_url))
        // Requests
        .route(
            "/api/requests",
            get(routes::requests::list_requests).post(routes::requests::create_request),
        )
        .route("/api/requests/{id}/status", post(routes::requests::transition_request))
        // Matches and feedback
        .route("/api/matches", get(routes::matches::list_matches))
        .route(
            "/api/feedback",
            get(routes::feedback::list_feedback).post(routes::feedback::create_feedback),
        )
        // Reports
        .route("/api/reports/summary", get(routes::reports::summary))
        .route("/api/reports/export", get(routes::reports::export_csv))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
