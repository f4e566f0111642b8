use axum::{
    Router,
    routing::{get, get_service},
};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::api::handlers::socket::game_socket;
use crate::api::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let home = ServeFile::new(&state.config.server.home_page);

    Router::new()
        .route("/", get_service(home))
        .route("/ws", get(game_socket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
