use axum::{debug_handler, extract::State, Json};
use serde::Serialize;

use crate::{ledger::{Ledger, PickRecord}, AppState};

#[derive(Serialize)]
pub(crate) struct ParticipantsResponse {
    count: usize,
    participants: Vec<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn participants(State(ledger): State<Ledger>) -> Json<ParticipantsResponse> {
    let participants = ledger.participants();
    Json(ParticipantsResponse {
        count: participants.len(),
        participants,
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn picks_log(State(ledger): State<Ledger>) -> Json<Vec<PickRecord>> {
    Json(ledger.picks_log().await)
}
