use axum::{debug_handler, extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::{caller::Caller, ledger::Ledger, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn reset(
    State(ledger): State<Ledger>,
    caller: Caller,
) -> AppResult<Json<Value>> {
    warn!(identity = %caller.identity, user_agent = %caller.user_agent, "ledger reset requested");
    ledger.reset_all().await?;
    Ok(Json(json!({ "reset": true })))
}
