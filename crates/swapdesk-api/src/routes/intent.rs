//! Natural-language intent endpoint

use amm::{Notification, Notifier};
use axum::{extract::State, Json};

use crate::dto::{intent_error, ApiResult, IntentRequest, IntentResponse};
use crate::AppState;

/// POST /intent - Resolve free text into a pending operation.
///
/// On success the operation is posted to the handoff slot for the matching
/// form to load.
pub async fn resolve_intent(
    State(state): State<AppState>,
    Json(request): Json<IntentRequest>,
) -> ApiResult<IntentResponse> {
    let text = request.text.trim();
    let registry = state.registry().await;

    let resolved = match state.resolver().resolve(text, &registry).await {
        Ok(intent) => intent.to_pending().map(|pending| (intent, pending)),
        Err(e) => Err(e),
    };

    match resolved {
        Ok((intent, pending)) => {
            let summary = intent.summary();
            state.handoff().post(pending.clone()).await;
            state
                .notifications()
                .notify(Notification::success(format!("Successfully processed: {}", text)));
            Ok(Json(IntentResponse {
                intent,
                pending,
                summary,
            }))
        }
        Err(e) => {
            state
                .notifications()
                .notify(Notification::error(format!("Failed to process request: {}", e)));
            Err(intent_error(e))
        }
    }
}
