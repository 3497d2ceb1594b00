//! HTTP route handlers for the catalog API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                              - Redirect to /login.html
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (database)
//!
//! # Auth (rate limited)
//! POST   /auth/registro                 - Register a customer
//! POST   /auth/login                    - Exchange credentials for a token
//!
//! # Products
//! GET    /productos                     - List (?q=, ?category=)
//! GET    /productos/{id}                - Detail
//! POST   /productos                     - Create (admin, multipart)
//! PUT    /productos/{id}                - Update (admin, multipart)
//! DELETE /productos/{id}                - Delete (admin)
//!
//! # Cart (token)
//! GET    /carrito                       - Cart lines
//! POST   /carrito/finalizar             - Checkout
//! POST   /carrito/{product_id}          - Add units
//! PUT    /carrito/{product_id}          - Set quantity
//! DELETE /carrito/{product_id}          - Remove line
//!
//! # Favorites (token)
//! GET    /favoritos
//! POST   /favoritos/{product_id}
//! DELETE /favoritos/{product_id}
//!
//! # Reviews
//! GET    /resenas/{product_id}
//! POST   /resenas/{product_id}          - token
//! GET    /resenas/{product_id}/promedio
//!
//! # Files
//! GET    /uploads/*                     - Product images
//! GET    /*                             - Static frontend
//! ```

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod health;
pub mod products;
pub mod reviews;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequestParts},
    response::Redirect,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::services::uploads::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Room for the text fields and multipart framing around an image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// `{"message": text}`
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

/// `Path` extractor whose rejection is a JSON [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct IdPath<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/registro", post(auth::register))
        .route("/login", post(auth::login))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/finalizar", post(cart::checkout))
        .route(
            "/{product_id}",
            post(cart::add).put(cart::update).delete(cart::remove),
        )
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route(
            "/{product_id}",
            post(favorites::add).delete(favorites::remove),
        )
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/{product_id}", get(reviews::index).post(reviews::create))
        .route("/{product_id}/promedio", get(reviews::average))
}

/// Create all API routes, without files or middleware.
pub fn routes(auth_rate_limit: bool) -> Router<AppState> {
    let auth = if auth_rate_limit {
        auth_routes().layer(auth_rate_limiter())
    } else {
        auth_routes()
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/", get(|| async { Redirect::to("/login.html") }))
        .nest("/auth", auth)
        .nest("/productos", product_routes())
        .nest("/carrito", cart_routes())
        .nest("/favoritos", favorite_routes())
        .nest("/resenas", review_routes())
}

/// Build the full application: routes, file serving, and middleware.
///
/// Sentry layers are added by the binary on top of this.
pub fn router(state: AppState) -> Router {
    let config = state.config();
    let uploads = ServeDir::new(&config.upload_dir);
    let public = ServeDir::new(&config.public_dir);

    routes(config.auth_rate_limit)
        .nest_service("/uploads", uploads)
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
