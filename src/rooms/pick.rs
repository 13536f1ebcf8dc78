use axum::{debug_handler, extract::{Path, State}, Json};
use uuid::Uuid;

use crate::{notify::{self, Notifier}, AppResult, AppState};

use super::{Room, RoomBook};

/// The winner is committed before anyone is told; mail goes out in the
/// background and can't change the result.
#[debug_handler(state = AppState)]
pub(crate) async fn pick_winner(
    State(rooms): State<RoomBook>,
    State(notifier): State<Notifier>,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<Room>> {
    let room = rooms.pick_winner(room_id).await?;

    tokio::spawn(notify::announce_winner(notifier, room.clone()));

    Ok(Json(room))
}
