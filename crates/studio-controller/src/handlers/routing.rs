//! Routing matrix handlers.
//!
//! - `POST   /api/v1/routes` - Create a route
//! - `GET    /api/v1/routes/{route_id}` - Fetch a route
//! - `PATCH  /api/v1/routes/{route_id}` - Partial update
//! - `DELETE /api/v1/routes/{route_id}` - Delete a route
//! - `POST   /api/v1/routes/{route_id}/toggle` - Flip active flag
//! - `POST   /api/v1/routes/{route_id}/volume` - Set audio volume
//! - `POST   /api/v1/routes/{route_id}/destinations/{destination_id}` - Add destination
//! - `DELETE /api/v1/routes/{route_id}/destinations/{destination_id}` - Remove destination
//! - `GET    /api/v1/rooms/{room_id}/routes` - List a room's routes
//! - `GET    /api/v1/rooms/{room_id}/matrix` - Routing matrix snapshot
//! - `POST   /api/v1/rooms/{room_id}/participants/{participant_id}/auto-route`
//! - `PATCH  /api/v1/sources/audio/{source_id}/levels` - Set source volume/gain
//!
//! Levels are validated here: out-of-range volume or gain is a 400, while the
//! matrix itself clamps.

use crate::errors::StudioError;
use crate::models::{AudioSource, MediumParams, Route, RouteUpdate, RoutingMatrixSnapshot};
use crate::routes::AppState;
use crate::routing::levels::Level;
use crate::types::{DestinationId, Medium, ParticipantId, RoomId, RouteId, SourceId};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Request body for `POST /api/v1/routes`.
#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub room_id: RoomId,
    #[serde(rename = "type")]
    pub medium: Medium,
    pub source_id: SourceId,
    #[serde(default)]
    pub destinations: Vec<DestinationId>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Request body for `PATCH /api/v1/routes/{route_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateRouteRequest {
    #[serde(default)]
    pub destinations: Option<Vec<DestinationId>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Request body for `POST /api/v1/routes/{route_id}/volume`.
#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: f64,
}

/// Request body for `PATCH /api/v1/sources/audio/{source_id}/levels`.
#[derive(Debug, Deserialize)]
pub struct SourceLevelsRequest {
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub gain: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
}

/// Unwrap a JSON body, turning axum's rejection into our error shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StudioError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| StudioError::Validation(rejection.body_text()))
}

fn optional_level(field: &str, value: Option<f64>) -> Result<Option<Level>, StudioError> {
    value.map(|v| Level::parse_input(field, v)).transpose()
}

#[instrument(skip_all, name = "studio.http.create_route")]
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRouteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Route>), StudioError> {
    let request = body(payload)?;
    let params = MediumParams {
        volume: optional_level("volume", request.volume)?,
        quality: request.quality,
    };

    let route = state
        .matrix
        .create_route(
            &request.room_id,
            request.medium,
            &request.source_id,
            request.destinations,
            params,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(route)))
}

#[instrument(skip_all, name = "studio.http.get_route", fields(route_id = %route_id))]
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<RouteId>,
) -> Result<Json<Route>, StudioError> {
    Ok(Json(state.matrix.get_route(&route_id).await?))
}

#[instrument(skip_all, name = "studio.http.update_route", fields(route_id = %route_id))]
pub async fn update_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<RouteId>,
    payload: Result<Json<UpdateRouteRequest>, JsonRejection>,
) -> Result<Json<Route>, StudioError> {
    let request = body(payload)?;
    let update = RouteUpdate {
        destinations: request.destinations,
        is_active: request.is_active,
        volume: optional_level("volume", request.volume)?,
        quality: request.quality,
    };

    Ok(Json(state.matrix.update_route(&route_id, update).await?))
}

#[instrument(skip_all, name = "studio.http.delete_route", fields(route_id = %route_id))]
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<RouteId>,
) -> Result<Json<DeletedResponse>, StudioError> {
    state.matrix.delete_route(&route_id).await?;
    Ok(Json(DeletedResponse {
        message: "Route deleted".to_string(),
    }))
}

#[instrument(skip_all, name = "studio.http.toggle_route", fields(route_id = %route_id))]
pub async fn toggle_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<RouteId>,
) -> Result<Json<Route>, StudioError> {
    Ok(Json(state.matrix.toggle_active(&route_id).await?))
}

#[instrument(skip_all, name = "studio.http.set_route_volume", fields(route_id = %route_id))]
pub async fn set_route_volume(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<RouteId>,
    payload: Result<Json<VolumeRequest>, JsonRejection>,
) -> Result<Json<Route>, StudioError> {
    let request = body(payload)?;
    let volume = Level::parse_input("volume", request.volume)?;

    Ok(Json(
        state
            .matrix
            .set_route_volume(&route_id, volume.value())
            .await?,
    ))
}

#[instrument(skip_all, name = "studio.http.add_destination", fields(route_id = %route_id))]
pub async fn add_destination(
    State(state): State<Arc<AppState>>,
    Path((route_id, destination_id)): Path<(RouteId, DestinationId)>,
) -> Result<Json<Route>, StudioError> {
    Ok(Json(
        state
            .matrix
            .add_destination(&route_id, destination_id)
            .await?,
    ))
}

#[instrument(skip_all, name = "studio.http.remove_destination", fields(route_id = %route_id))]
pub async fn remove_destination(
    State(state): State<Arc<AppState>>,
    Path((route_id, destination_id)): Path<(RouteId, DestinationId)>,
) -> Result<Json<Route>, StudioError> {
    Ok(Json(
        state
            .matrix
            .remove_destination(&route_id, &destination_id)
            .await?,
    ))
}

#[instrument(skip_all, name = "studio.http.list_routes", fields(room_id = %room_id))]
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<Vec<Route>>, StudioError> {
    Ok(Json(state.matrix.list_routes(&room_id).await?))
}

#[instrument(skip_all, name = "studio.http.routing_matrix", fields(room_id = %room_id))]
pub async fn routing_matrix(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoutingMatrixSnapshot>, StudioError> {
    Ok(Json(state.matrix.routing_matrix(&room_id).await?))
}

#[instrument(
    skip_all,
    name = "studio.http.auto_route",
    fields(room_id = %room_id, participant_id = %participant_id)
)]
pub async fn auto_route_participant(
    State(state): State<Arc<AppState>>,
    Path((room_id, participant_id)): Path<(RoomId, ParticipantId)>,
) -> Result<Json<Vec<Route>>, StudioError> {
    Ok(Json(
        state
            .matrix
            .auto_route_participant(&room_id, &participant_id)
            .await?,
    ))
}

#[instrument(skip_all, name = "studio.http.set_source_levels", fields(source_id = %source_id))]
pub async fn set_source_levels(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<SourceId>,
    payload: Result<Json<SourceLevelsRequest>, JsonRejection>,
) -> Result<Json<AudioSource>, StudioError> {
    let request = body(payload)?;
    let volume = optional_level("volume", request.volume)?;
    let gain = optional_level("gain", request.gain)?;
    if volume.is_none() && gain.is_none() {
        return Err(StudioError::Validation(
            "At least one of volume or gain is required".to_string(),
        ));
    }

    Ok(Json(
        state
            .matrix
            .set_source_levels(
                &source_id,
                volume.map(|v| v.value()),
                gain.map(|g| g.value()),
            )
            .await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_level_rejects_out_of_range() {
        assert!(optional_level("volume", None).unwrap().is_none());
        assert_eq!(
            optional_level("volume", Some(0.5)).unwrap(),
            Some(Level::clamped(0.5))
        );
        assert!(matches!(
            optional_level("gain", Some(1.7)),
            Err(StudioError::Validation(msg)) if msg.contains("gain")
        ));
    }

    #[test]
    fn test_create_request_parses_type_field() {
        let request: CreateRouteRequest = serde_json::from_value(serde_json::json!({
            "room_id": "r1",
            "type": "video",
            "source_id": "cam-1",
            "destinations": ["p2"]
        }))
        .unwrap();

        assert_eq!(request.medium, Medium::Video);
        assert_eq!(request.destinations, vec![DestinationId::from("p2")]);
        assert!(request.volume.is_none());
    }
}
