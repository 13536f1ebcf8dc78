pub mod appresult;
pub mod caller;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod participants;
pub mod picks;
pub mod res;
pub mod rooms;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};

use ledger::Ledger;
use notify::Notifier;
use rooms::RoomBook;

/// Everything a handler can reach. Built once in `main`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub ledger: Ledger,
    pub rooms: RoomBook,
    pub notifier: Notifier,
}

pub fn router(state: AppState, reset_enabled: bool) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(picks::router(reset_enabled))
        .merge(rooms::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
