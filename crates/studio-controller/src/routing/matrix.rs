//! Routing matrix.
//!
//! Per room, a directed mapping from audio/video sources to destinations
//! (other participants or external outputs). The matrix is the consistency
//! gatekeeper: it validates every route against the source directory before
//! persisting it, and serializes read-modify-write cycles on routes within a
//! room through a per-room async lock held only across that room's store
//! round trips. Different rooms never contend.

use crate::errors::StudioError;
use crate::models::{
    AudioSource, MediumParams, OutputCatalog, Route, RouteUpdate, RoutingMatrixSnapshot, Source,
};
use crate::observability::metrics;
use crate::repositories::{ParticipantDirectory, RouteStore, SourceDirectory};
use crate::routing::levels::Level;
use crate::types::{DestinationId, Medium, ParticipantId, RoomId, RouteId, SourceId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Per-room audio/video routing.
pub struct RoutingMatrix {
    sources: Arc<dyn SourceDirectory>,
    participants: Arc<dyn ParticipantDirectory>,
    routes: Arc<dyn RouteStore>,
    outputs: OutputCatalog,
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for RoutingMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingMatrix")
            .field("outputs", &self.outputs)
            .field("locked_rooms", &self.room_locks.len())
            .finish_non_exhaustive()
    }
}

impl RoutingMatrix {
    pub fn new(
        sources: Arc<dyn SourceDirectory>,
        participants: Arc<dyn ParticipantDirectory>,
        routes: Arc<dyn RouteStore>,
        outputs: OutputCatalog,
    ) -> Self {
        Self {
            sources,
            participants,
            routes,
            outputs,
            room_locks: DashMap::new(),
        }
    }

    /// External output catalog.
    #[must_use]
    pub fn outputs(&self) -> &OutputCatalog {
        &self.outputs
    }

    fn room_lock(&self, room_id: &RoomId) -> Arc<Mutex<()>> {
        // Clone out of the shard before awaiting on the mutex
        Arc::clone(self.room_locks.entry(room_id.clone()).or_default().value())
    }

    /// Look up a source and check it belongs to `room_id` and `medium`.
    async fn validate_source(
        &self,
        room_id: &RoomId,
        medium: Medium,
        source_id: &SourceId,
    ) -> Result<Source, StudioError> {
        let Some(source) = self.sources.get_source(medium, source_id).await? else {
            if self
                .sources
                .get_source(medium.other(), source_id)
                .await?
                .is_some()
            {
                warn!(
                    target: "studio.routing",
                    source_id = %source_id,
                    medium = medium.as_str(),
                    "Route source has the wrong medium"
                );
                return Err(StudioError::Inconsistent(format!(
                    "Source {} is not a {} source",
                    source_id, medium
                )));
            }
            return Err(StudioError::UnknownSource(source_id.to_string()));
        };

        if source.room_id() != room_id {
            warn!(
                target: "studio.routing",
                source_id = %source_id,
                source_room = %source.room_id(),
                room_id = %room_id,
                "Route source belongs to another room"
            );
            return Err(StudioError::Inconsistent(format!(
                "Source {} does not belong to room {}",
                source_id, room_id
            )));
        }

        Ok(source)
    }

    /// Create a route after validating its source.
    ///
    /// # Errors
    ///
    /// - `UnknownSource` if the source does not exist
    /// - `Inconsistent` if it exists in another room or with another medium
    /// - `Validation` if a video route is given a volume
    #[instrument(skip_all, name = "studio.routing.create_route", fields(room_id = %room_id, source_id = %source_id))]
    pub async fn create_route(
        &self,
        room_id: &RoomId,
        medium: Medium,
        source_id: &SourceId,
        destinations: Vec<DestinationId>,
        params: MediumParams,
    ) -> Result<Route, StudioError> {
        self.validate_source(room_id, medium, source_id).await?;
        check_volume_allowed(medium, params.volume.is_some(), "new route")?;
        let route = self
            .insert_route(room_id, medium, source_id, destinations, params)
            .await?;
        metrics::record_route_created(medium, "manual");
        Ok(route)
    }

    async fn insert_route(
        &self,
        room_id: &RoomId,
        medium: Medium,
        source_id: &SourceId,
        destinations: Vec<DestinationId>,
        params: MediumParams,
    ) -> Result<Route, StudioError> {
        let params = MediumParams {
            volume: params.volume.map(|v| Level::clamped(v.value())),
            quality: params.quality,
        }
        .or_defaults(medium);
        let route = Route::new(
            room_id.clone(),
            medium,
            source_id.clone(),
            destinations,
            params,
        );

        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;
        self.routes.insert(route.clone()).await?;

        info!(
            target: "studio.routing",
            route_id = %route.id,
            room_id = %room_id,
            medium = medium.as_str(),
            destinations = route.destinations.len(),
            "Route created"
        );
        Ok(route)
    }

    /// Fetch a route.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub async fn get_route(&self, route_id: &RouteId) -> Result<Route, StudioError> {
        self.routes
            .get(route_id)
            .await?
            .ok_or_else(|| route_not_found(route_id))
    }

    /// All routes in a room, in creation order.
    pub async fn list_routes(&self, room_id: &RoomId) -> Result<Vec<Route>, StudioError> {
        self.routes.list_by_room(room_id).await
    }

    /// Delete a route.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub async fn delete_route(&self, route_id: &RouteId) -> Result<(), StudioError> {
        let route = self.get_route(route_id).await?;
        let lock = self.room_lock(&route.room_id);
        let _guard = lock.lock().await;

        if !self.routes.delete(route_id).await? {
            return Err(route_not_found(route_id));
        }
        info!(target: "studio.routing", route_id = %route_id, room_id = %route.room_id, "Route deleted");
        Ok(())
    }

    /// Read-modify-write a route under its room's lock.
    ///
    /// The route is re-read after the lock is taken so concurrent mutations in
    /// the same room never overwrite each other, and its source is validated
    /// again since sources can disappear after creation. `mutate` returns
    /// whether it changed anything; unchanged routes are not written back.
    async fn mutate_route<F>(&self, route_id: &RouteId, mutate: F) -> Result<Route, StudioError>
    where
        F: FnOnce(&mut Route) -> Result<bool, StudioError>,
    {
        let room_id = self.get_route(route_id).await?.room_id;
        let lock = self.room_lock(&room_id);
        let _guard = lock.lock().await;

        let mut route = self.get_route(route_id).await?;
        self.validate_source(&route.room_id, route.medium, &route.source_id)
            .await?;
        if mutate(&mut route)? {
            self.routes.save(route.clone()).await?;
        }
        Ok(route)
    }

    /// Add a destination; no-op if already present.
    pub async fn add_destination(
        &self,
        route_id: &RouteId,
        destination: DestinationId,
    ) -> Result<Route, StudioError> {
        let route = self
            .mutate_route(route_id, |route| Ok(route.add_destination(destination)))
            .await?;
        debug!(target: "studio.routing", route_id = %route_id, destinations = route.destinations.len(), "Destination added");
        Ok(route)
    }

    /// Remove a destination; no-op if absent. An empty destination set is
    /// legal and the route is kept.
    pub async fn remove_destination(
        &self,
        route_id: &RouteId,
        destination: &DestinationId,
    ) -> Result<Route, StudioError> {
        let route = self
            .mutate_route(route_id, |route| Ok(route.remove_destination(destination)))
            .await?;
        debug!(target: "studio.routing", route_id = %route_id, destinations = route.destinations.len(), "Destination removed");
        Ok(route)
    }

    /// Flip a route between active and inactive.
    pub async fn toggle_active(&self, route_id: &RouteId) -> Result<Route, StudioError> {
        let route = self
            .mutate_route(route_id, |route| {
                route.is_active = !route.is_active;
                Ok(true)
            })
            .await?;
        info!(target: "studio.routing", route_id = %route_id, is_active = route.is_active, "Route toggled");
        Ok(route)
    }

    /// Set an audio route's volume, clamped into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// `Validation` if the route is a video route.
    pub async fn set_route_volume(
        &self,
        route_id: &RouteId,
        volume: f64,
    ) -> Result<Route, StudioError> {
        let level = Level::clamped(volume);
        self.mutate_route(route_id, |route| {
            check_volume_allowed(route.medium, true, route.id.as_str())?;
            let changed = route.volume != Some(level);
            route.volume = Some(level);
            Ok(changed)
        })
        .await
    }

    /// Partial update; `None` fields are untouched and an empty update
    /// returns the route unchanged.
    pub async fn update_route(
        &self,
        route_id: &RouteId,
        update: RouteUpdate,
    ) -> Result<Route, StudioError> {
        if update.is_empty() {
            return self.get_route(route_id).await;
        }
        let update = RouteUpdate {
            volume: update.volume.map(|v| Level::clamped(v.value())),
            ..update
        };
        self.mutate_route(route_id, |route| {
            check_volume_allowed(route.medium, update.volume.is_some(), route.id.as_str())?;
            Ok(update.apply(route))
        })
        .await
    }

    /// Create one route per source owned by `participant_id`.
    ///
    /// Each route targets every other current participant plus the medium's
    /// default external output, audio routes first. Existing participants'
    /// routes are not extended to include the newcomer.
    #[instrument(skip_all, name = "studio.routing.auto_route", fields(room_id = %room_id, participant_id = %participant_id))]
    pub async fn auto_route_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Vec<Route>, StudioError> {
        let sources = self
            .sources
            .get_sources_by_participant(participant_id)
            .await?;
        let others = self
            .participants
            .list_other_participants(room_id, participant_id)
            .await?;

        let mut ordered: Vec<&Source> = sources.iter().collect();
        ordered.sort_by_key(|s| s.medium());

        let mut created = Vec::with_capacity(ordered.len());
        for source in ordered {
            if source.room_id() != room_id {
                warn!(
                    target: "studio.routing",
                    source_id = %source.id(),
                    source_room = %source.room_id(),
                    room_id = %room_id,
                    "Skipping participant source from another room"
                );
                continue;
            }

            let medium = source.medium();
            let mut destinations: Vec<DestinationId> =
                others.iter().map(DestinationId::from).collect();
            destinations.push(self.outputs.default_for(medium).clone());

            let route = self
                .insert_route(
                    room_id,
                    medium,
                    source.id(),
                    destinations,
                    MediumParams::defaults_for(medium),
                )
                .await?;
            metrics::record_route_created(medium, "auto");
            created.push(route);
        }

        info!(
            target: "studio.routing",
            room_id = %room_id,
            participant_id = %participant_id,
            routes_created = created.len(),
            "Auto-routed participant"
        );
        Ok(created)
    }

    /// Snapshot of a room's sources, routes, participants and outputs.
    pub async fn routing_matrix(
        &self,
        room_id: &RoomId,
    ) -> Result<RoutingMatrixSnapshot, StudioError> {
        let (audio_sources, video_sources) = self.sources.list_sources(room_id).await?;
        let routes = self.routes.list_by_room(room_id).await?;
        let participants = self.participants.list_participants(room_id).await?;

        Ok(RoutingMatrixSnapshot {
            room_id: room_id.clone(),
            audio_sources,
            video_sources,
            routes,
            participants,
            external_outputs: self.outputs.outputs().to_vec(),
        })
    }

    /// Set an audio source's volume and/or gain, clamped into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such audio source.
    pub async fn set_source_levels(
        &self,
        source_id: &SourceId,
        volume: Option<f64>,
        gain: Option<f64>,
    ) -> Result<AudioSource, StudioError> {
        let source = self
            .sources
            .update_audio_levels(
                source_id,
                volume.map(Level::clamped),
                gain.map(Level::clamped),
            )
            .await?
            .ok_or_else(|| {
                StudioError::NotFound(format!("Audio source {} not found", source_id))
            })?;

        debug!(
            target: "studio.routing",
            source_id = %source_id,
            volume = source.volume.value(),
            gain = source.gain.value(),
            "Source levels updated"
        );
        Ok(source)
    }
}

/// Only audio routes carry a volume.
fn check_volume_allowed(medium: Medium, has_volume: bool, route: &str) -> Result<(), StudioError> {
    if has_volume && medium == Medium::Video {
        return Err(StudioError::Validation(format!(
            "Route {} is a video route and has no volume",
            route
        )));
    }
    Ok(())
}

fn route_not_found(route_id: &RouteId) -> StudioError {
    StudioError::NotFound(format!("Route {} not found", route_id))
}
