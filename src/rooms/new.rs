use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{AppResult, AppState};

use super::{Room, RoomBook};

/// Emails may come as a list or as one blob separated by commas, semicolons
/// or newlines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EmailList {
    List(Vec<String>),
    Text(String),
}

impl Default for EmailList {
    fn default() -> Self {
        EmailList::List(Vec::new())
    }
}

impl EmailList {
    fn into_vec(self) -> Vec<String> {
        match self {
            EmailList::List(list) => list,
            EmailList::Text(text) => text
                .split([',', ';', '\n'])
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    emails: EmailList,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    State(rooms): State<RoomBook>,
    Json(NewRoomRequest { name, description, emails }): Json<NewRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = rooms.create_room(&name, &description, &emails.into_vec()).await?;
    Ok((StatusCode::CREATED, Json(room)))
}
