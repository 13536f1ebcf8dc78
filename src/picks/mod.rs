mod log;
mod pick;
mod reset;
mod status;

use axum::{routing::{get, post}, Router};

use crate::AppState;

/// `reset_enabled` mounts `POST /api/reset`, which has no authentication.
pub fn router(reset_enabled: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/api/status", get(status::status))
        .route("/api/pick", post(pick::pick))
        .route("/api/participants", get(log::participants))
        .route("/api/picks-log", get(log::picks_log));

    if reset_enabled {
        router.route("/api/reset", post(reset::reset))
    } else {
        router
    }
}
