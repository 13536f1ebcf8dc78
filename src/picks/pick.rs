use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{caller::Caller, ledger::Ledger, AppResult, AppState};

#[derive(Serialize)]
pub(crate) struct PickResponse {
    participant: String,
    #[serde(with = "time::serde::rfc3339")]
    picked_at: OffsetDateTime,
}

#[debug_handler(state = AppState)]
pub(crate) async fn pick(
    State(ledger): State<Ledger>,
    caller: Caller,
) -> AppResult<Json<PickResponse>> {
    let record = ledger.pick(&caller).await?;

    Ok(Json(PickResponse {
        participant: record.participant,
        picked_at: record.picked_at,
    }))
}
