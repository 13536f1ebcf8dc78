use axum::{debug_handler, extract::State, Json};
use serde::Serialize;

use crate::{caller::Caller, ledger::Ledger, AppResult, AppState};

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    identity: String,
    eligible: bool,
    selection: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn status(
    State(ledger): State<Ledger>,
    caller: Caller,
) -> AppResult<Json<StatusResponse>> {
    let eligibility = ledger.check_eligibility(&caller.identity).await?;

    Ok(Json(StatusResponse {
        identity: caller.identity,
        eligible: eligibility.eligible,
        selection: eligibility.selection,
    }))
}
