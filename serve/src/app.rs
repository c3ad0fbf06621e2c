//! Axum router assembly: every handler shares one [`AppState`] (§9).

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use config::AppConfig;

use crate::routes::{approve, chat, conversations, files, mcp_servers, models, providers, settings, tools};
use crate::state::AppState;

pub fn router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let api = Router::new()
        .route("/chat/stream", post(chat::stream))
        .route("/chat/retry", post(chat::retry))
        .route("/chat/update", post(chat::update))
        .route("/tools/approve", get(approve::approve))
        .route("/conversations", get(conversations::list))
        .route(
            "/conversations/:id",
            get(conversations::get).delete(conversations::delete).patch(conversations::rename),
        )
        .route("/conversations/:id/messages", get(conversations::messages))
        .route("/providers", get(providers::list).post(providers::create))
        .route("/providers/:id", delete(providers::delete))
        .route("/models", get(models::list).post(models::create))
        .route("/models/*id", delete(models::delete))
        .route("/mcp-servers", get(mcp_servers::list).post(mcp_servers::create))
        .route("/mcp-servers/:id", delete(mcp_servers::delete))
        .route("/tools", get(tools::list).post(tools::create))
        .route("/tools/:id", delete(tools::delete))
        .route("/settings", get(settings::get).put(settings::update))
        .route("/files", post(files::register))
        .route("/files/:id", get(files::get).delete(files::delete))
        .with_state(state.clone());

    // Uploaded files' bytes are served straight off disk; the entity metadata
    // above goes through the Store instead (§6: "Uploaded files served under
    // /data/resources/").
    let resources = ServeDir::new(&state.resource_dir);

    let mut router = Router::new()
        .nest("/api", api)
        .nest_service("/data/resources", resources);

    if config.is_dev() {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
