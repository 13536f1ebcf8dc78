use axum::{debug_handler, extract::{Path, State}, Json};
use uuid::Uuid;

use crate::{AppResult, AppState};

use super::{Room, RoomBook};

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(rooms): State<RoomBook>,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.get_room(room_id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_rooms(State(rooms): State<RoomBook>) -> Json<Vec<Room>> {
    Json(rooms.list_rooms().await)
}
