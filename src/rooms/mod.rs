mod book;
mod email;
mod new;
mod pick;
mod room;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use book::{Room, RoomBook, RoomStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rooms", get(room::list_rooms).post(new::new_room))
        .route("/api/rooms/{room_id}", get(room::room))
        .route("/api/rooms/{room_id}/pick", post(pick::pick_winner))
}
