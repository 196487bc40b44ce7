use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, CurrentSession};
use crate::error::RideError;
use crate::models::Notification;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

pub async fn list(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<ListQuery>,
) -> Json<NotificationList> {
    Json(NotificationList {
        unread_count: service.unread_count(&session).await,
        notifications: service.list_notifications(&session, query.include_archived).await,
    })
}

pub async fn mark_read(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, RideError> {
    Ok(Json(service.mark_read(&session, notification_id).await?))
}

pub async fn mark_all_read(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<MarkAllReadResponse> {
    Json(MarkAllReadResponse {
        updated: service.mark_all_read(&session).await,
    })
}

pub async fn archive(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, RideError> {
    Ok(Json(service.archive_notification(&session, notification_id).await?))
}
