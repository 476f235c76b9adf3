use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod db;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest(
            "/api/v1",
            api_routes()
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                ))
                .layer(cors),
        )
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    trace_id = tracing::field::Empty,
                )
            }),
        )
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/auth/me",
            get(handlers::auth::me).patch(handlers::auth::update_me),
        )
        .route("/auth/sign-out", post(handlers::auth::sign_out))
        .route(
            "/modules",
            get(handlers::content::list_modules).post(handlers::content::create_module),
        )
        .route(
            "/modules/{id}",
            get(handlers::content::get_module).patch(handlers::content::update_module),
        )
        .route(
            "/modules/{id}/questions",
            post(handlers::content::add_question),
        )
        .route(
            "/modules/{id}/attempts",
            post(handlers::content::submit_attempt),
        )
        .route("/progress", get(handlers::progress::list_progress))
        .route("/achievements", get(handlers::progress::achievements))
        .route(
            "/emergency-procedures",
            get(handlers::content::list_procedures),
        )
        .route(
            "/emergency-procedures/{id}",
            get(handlers::content::get_procedure),
        )
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{id}", patch(handlers::admin::update_user))
        .route(
            "/users/{id}/achievements",
            post(handlers::admin::grant_achievement),
        )
        .route("/achievements", post(handlers::admin::create_achievement))
        .route(
            "/emergency-procedures",
            post(handlers::admin::create_procedure),
        )
        .route(
            "/emergency-procedures/{id}",
            patch(handlers::admin::update_procedure),
        )
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}
