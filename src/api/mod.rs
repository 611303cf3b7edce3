mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app::App;

pub fn router(app: Arc<App>) -> Router {
    let alerts = get(handlers::list_alerts)
        .post(handlers::create_alert)
        .delete(handlers::delete_alert);

    Router::new()
        .route("/alerts", alerts.clone())
        .route("/api/alerts", alerts)
        .route("/callback", post(handlers::callback))
        .route("/api/callback", post(handlers::callback))
        .route("/login", post(handlers::login))
        .route("/api/login", post(handlers::login))
        .with_state(app)
        .layer(TraceLayer::new_for_http())
}
