// rest/mod.rs — Public REST API server.
//
// Axum HTTP server bridging the routes to the task service.
//
// Endpoints:
//   POST   /login
//   GET    /health
//   GET    /tasks
//   POST   /tasks
//   GET    /tasks/{id}
//   PUT    /tasks/{id}
//   PATCH  /tasks/{id}
//   POST   /tasks/{id}/dependencies
//   DELETE /tasks/{id}/dependencies/{edge_id}
//   PATCH  /tasks/{id}/assign

pub mod auth;
pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    // Everything under /tasks requires a resolved actor.
    let tasks = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::update_task),
        )
        .route(
            "/tasks/{id}/dependencies",
            post(routes::tasks::add_dependency),
        )
        .route(
            "/tasks/{id}/dependencies/{edge_id}",
            delete(routes::tasks::remove_dependency),
        )
        .route("/tasks/{id}/assign", patch(routes::tasks::assign_task))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_auth,
        ));

    Router::new()
        // Health + login (no auth)
        .route("/health", get(routes::health::health))
        .route("/login", post(routes::login::login))
        .merge(tasks)
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
