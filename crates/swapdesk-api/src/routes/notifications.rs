//! Notification feed

use axum::{extract::State, http::StatusCode, Json};

use crate::dto::NotificationsResponse;
use crate::AppState;

/// GET /notifications - Recent notifications, oldest first
pub async fn list(State(state): State<AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        notifications: state.notifications().entries(),
    })
}

/// DELETE /notifications
pub async fn clear(State(state): State<AppState>) -> StatusCode {
    state.notifications().clear();
    StatusCode::NO_CONTENT
}
