pub mod auth;
pub mod error;
mod todos;
mod users;
mod validation;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes: registration and login
    let public_routes = Router::new()
        .route("/users", post(users::register))
        .route("/users/sessions", post(users::login));

    // Protected routes behind the session middleware. Merging with the
    // public router combines the method routers for /users/sessions, so
    // login stays open while logout requires a session.
    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/sessions", delete(users::logout))
        .route("/todos", get(todos::list_todos))
        .route("/todos", post(todos::create_todo))
        .route("/todos/:id", delete(todos::delete_todo))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
