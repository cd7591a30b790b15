//! Remote worker callback handler

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{db::Repository, errors::Result};
use cardforge_generation::dispatch::Dispatcher;

#[derive(Serialize)]
pub struct CallbackResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<Uuid>,
    pub created: u32,
}

/// Receive a worker callback.
///
/// The body is taken raw: the shared-secret header is checked before the
/// payload is parsed, so a forged request is rejected without touching it.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<CallbackResponse>> {
    let secret = headers
        .get("x-callback-secret")
        .and_then(|v| v.to_str().ok());

    let repo = Repository::new(state.db.clone());
    let dispatcher = Dispatcher::new(repo, state.store.clone(), &state.config)?;

    let ack = dispatcher.handle_callback(secret, &body).await?;

    Ok(Json(CallbackResponse {
        ok: true,
        deck_id: ack.deck_id,
        created: ack.created,
    }))
}
