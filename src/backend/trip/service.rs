//! Trip Command Service
//!
//! Orchestrates every trip command: load the aggregate, apply one pure
//! mutation from `shared::trip`, persist the result with an optimistic
//! version check, and only then broadcast the matching event on the
//! trip's channel. A client reacting to a broadcast and immediately
//! re-fetching therefore never observes stale state.
//!
//! Collaborators (store, directory, forecast, profiles, notifier) are
//! injected so tests can run the full command surface against in-memory
//! fakes.

use crate::backend::directory::{ForecastProvider, PlaceCategory, PlaceDirectory};
use crate::backend::error::ApiError;
use crate::backend::profiles::{ProfileStore, UserProfile};
use crate::backend::realtime::TripBroadcast;
use crate::backend::trip::store::{CheckInRecord, CheckInStore, TripStore, VersionedTrip};
use crate::shared::geo::{distance_km, GeoPoint};
use crate::shared::{
    CoverImg, DateWindow, JoinOutcome, Progression, TimeField, ToggleOutcome, Trip, TripError,
    TripEventName, TripQuery, TripStage,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Bounded retries for the optimistic version check
const MAX_CAS_RETRIES: u32 = 3;

/// Member list entry joined with display fields
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberProjection {
    pub user_id: String,
    pub username: String,
    pub profile_url: Option<String>,
    pub date: Vec<DateWindow>,
}

/// Result of one check-in command
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutcome {
    /// The new current stop, or the unchanged last stop when done
    pub current_place: Option<String>,
    /// Whether the itinerary has been walked to the end
    pub all_done: bool,
    /// Members a check-in record was created for by this call
    pub checked_in: Vec<String>,
}

/// The collaborative trip engine
pub struct TripService {
    store: Arc<dyn TripStore>,
    check_ins: Arc<dyn CheckInStore>,
    directory: Arc<dyn PlaceDirectory>,
    forecast: Arc<dyn ForecastProvider>,
    profiles: Arc<dyn ProfileStore>,
    notifier: TripBroadcast,
    checkin_radius_km: f64,
}

impl TripService {
    pub fn new(
        store: Arc<dyn TripStore>,
        check_ins: Arc<dyn CheckInStore>,
        directory: Arc<dyn PlaceDirectory>,
        forecast: Arc<dyn ForecastProvider>,
        profiles: Arc<dyn ProfileStore>,
        notifier: TripBroadcast,
        checkin_radius_km: f64,
    ) -> Self {
        Self {
            store,
            check_ins,
            directory,
            forecast,
            profiles,
            notifier,
            checkin_radius_km,
        }
    }

    /// The notifier handle, for the SSE subscription endpoint
    pub fn notifier(&self) -> &TripBroadcast {
        &self.notifier
    }

    async fn load(&self, trip_id: &str) -> Result<VersionedTrip, ApiError> {
        self.store
            .fetch(trip_id)
            .await?
            .ok_or_else(|| {
                TripError::TripNotFound {
                    trip_id: trip_id.to_string(),
                }
                .into()
            })
    }

    /// Load → mutate → compare-and-swap persist, retrying on conflict
    ///
    /// The mutation runs against a fresh snapshot on every attempt, so a
    /// losing writer re-validates everything before persisting again.
    async fn mutate<T>(
        &self,
        trip_id: &str,
        op: impl Fn(&mut Trip) -> Result<T, TripError>,
    ) -> Result<(Trip, T), ApiError> {
        for attempt in 0..MAX_CAS_RETRIES {
            let VersionedTrip { mut trip, version } = self.load(trip_id).await?;
            let value = op(&mut trip)?;
            if self.store.update(&trip, version).await? {
                return Ok((trip, value));
            }
            tracing::debug!(
                "[Trip] Version conflict on trip {} (attempt {}), retrying",
                trip_id,
                attempt + 1
            );
        }
        Err(TripError::upstream(format!(
            "storage contention on trip {}, gave up after {} attempts",
            trip_id, MAX_CAS_RETRIES
        ))
        .into())
    }

    async fn member_projections(&self, trip: &Trip) -> Result<Vec<MemberProjection>, ApiError> {
        let mut projections = Vec::with_capacity(trip.member.len());
        for member in &trip.member {
            let profile = self
                .profiles
                .fetch(&member.user_id)
                .await?
                .unwrap_or_else(|| UserProfile::bare(&member.user_id));
            projections.push(MemberProjection {
                user_id: member.user_id.clone(),
                username: profile.username,
                profile_url: profile.profile_url,
                date: member.date.clone(),
            });
        }
        Ok(projections)
    }

    // ---- Trip lifecycle ----

    /// Create a trip owned by `user_id`, minting id and invite token
    pub async fn create_trip(&self, user_id: &str) -> Result<Trip, ApiError> {
        let trip = Trip::new(user_id);
        self.store.insert(&trip).await?;
        tracing::info!("[Trip] Created trip {} for user {}", trip.trip_id, user_id);
        Ok(trip)
    }

    /// Owner-only destructive delete; subscribers are told to detach
    pub async fn delete_trip(&self, requester: &str, trip_id: &str) -> Result<(), ApiError> {
        let VersionedTrip { trip, .. } = self.load(trip_id).await?;
        if !trip.is_owner(requester) {
            return Err(TripError::denied(trip_id, requester).into());
        }
        if !self.store.delete(trip_id, requester).await? {
            return Err(TripError::TripNotFound {
                trip_id: trip_id.to_string(),
            }
            .into());
        }
        self.notifier
            .publish(trip_id, TripEventName::RemoveGroup, json!({ "tripId": trip_id }));
        self.notifier.remove_channel(trip_id);
        tracing::info!("[Trip] Deleted trip {}", trip_id);
        Ok(())
    }

    /// Member-only read of the invite token
    pub async fn invite_link(&self, requester: &str, trip_id: &str) -> Result<String, ApiError> {
        let VersionedTrip { trip, .. } = self.load(trip_id).await?;
        trip.require_member(requester)?;
        Ok(trip.invite_link)
    }

    /// Resolve an invite token and join; idempotent for existing members
    pub async fn verify_invitation(
        &self,
        user_id: &str,
        invite_link: &str,
    ) -> Result<(String, Vec<MemberProjection>), ApiError> {
        let VersionedTrip { trip, .. } = self
            .store
            .fetch_by_invite(invite_link)
            .await?
            .ok_or_else(|| TripError::InviteNotFound {
                invite_link: invite_link.to_string(),
            })?;

        if trip.is_member(user_id) {
            let projections = self.member_projections(&trip).await?;
            return Ok((trip.trip_id, projections));
        }

        let trip_id = trip.trip_id.clone();
        let (trip, outcome) = self.mutate(&trip_id, |t| t.add_member(user_id)).await?;

        if outcome == JoinOutcome::Joined {
            let profile = self
                .profiles
                .fetch(user_id)
                .await?
                .unwrap_or_else(|| UserProfile::bare(user_id));
            self.notifier.publish(
                &trip_id,
                TripEventName::AddMember,
                json!({
                    "userId": user_id,
                    "username": profile.username,
                    "profileUrl": profile.profile_url,
                    "date": [],
                }),
            );
        }

        let projections = self.member_projections(&trip).await?;
        Ok((trip_id, projections))
    }

    // ---- Member Registry ----

    /// Remove a member (owner or self), cascading selectBy cleanup
    pub async fn remove_member(
        &self,
        requester: &str,
        trip_id: &str,
        target: &str,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.remove_member(requester, target))
            .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::RemoveMember,
            json!({ "deleteId": target }),
        );
        Ok(())
    }

    /// Replace the caller's availability windows
    pub async fn set_availability(
        &self,
        user_id: &str,
        trip_id: &str,
        windows: Vec<DateWindow>,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| {
            t.set_member_availability(user_id, windows.clone())
        })
        .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::UpdateDate,
            json!({ "userId": user_id, "date": windows }),
        );
        Ok(())
    }

    /// Owner-only trip-wide window; records the date, transitions nothing
    pub async fn set_trip_date(
        &self,
        requester: &str,
        trip_id: &str,
        window: DateWindow,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.set_trip_date(requester, window.clone()))
            .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::UpdateTripDate,
            json!({ "date": window }),
        );
        Ok(())
    }

    // ---- Snapshot queries ----

    /// Member-only state snapshot, dispatched on a closed selector
    pub async fn information(
        &self,
        user_id: &str,
        trip_id: &str,
        query: TripQuery,
    ) -> Result<serde_json::Value, ApiError> {
        let VersionedTrip { trip, .. } = self.load(trip_id).await?;
        trip.require_member(user_id)?;
        let value = match query {
            TripQuery::Member => serde_json::to_value(self.member_projections(&trip).await?)?,
            TripQuery::AllPlace => serde_json::to_value(&trip.place)?,
            TripQuery::AllPlaceForEachDate => json!({
                "place": trip.place,
                "plan": trip.plan,
            }),
            TripQuery::All => serde_json::to_value(&trip)?,
        };
        Ok(value)
    }

    // ---- Place Selection Ledger ----

    /// Toggle the caller's nomination of a place
    ///
    /// Place identity is resolved first (hard failure); the forecast
    /// attached to a fresh nomination is best-effort and degrades to
    /// empty without failing the command.
    pub async fn toggle_place(
        &self,
        user_id: &str,
        trip_id: &str,
        category: PlaceCategory,
        place_id: &str,
    ) -> Result<ToggleOutcome, ApiError> {
        let record = self.directory.resolve(category, place_id).await?;

        let (trip, outcome) = self
            .mutate(trip_id, |t| t.toggle_place(user_id, place_id))
            .await?;

        match &outcome {
            ToggleOutcome::Added => {
                let date = trip.date.start.unwrap_or_else(|| chrono::Utc::now().date_naive());
                let forecast = self
                    .forecast
                    .forecast(
                        record.location.province.as_deref().unwrap_or(""),
                        record.location.district.as_deref().unwrap_or(""),
                        date,
                        1,
                    )
                    .await;
                self.notifier.publish(
                    trip_id,
                    TripEventName::AddPlace,
                    json!({
                        "place": record,
                        "selectBy": [user_id],
                        "forecast": forecast,
                    }),
                );
            }
            ToggleOutcome::Updated { select_by } => {
                self.notifier.publish(
                    trip_id,
                    TripEventName::UpdatePlace,
                    json!({ "placeId": place_id, "selectBy": select_by }),
                );
            }
            ToggleOutcome::Removed => {
                self.notifier.publish(
                    trip_id,
                    TripEventName::RemovePlace,
                    json!({ "placeId": place_id }),
                );
            }
        }
        Ok(outcome)
    }

    /// Owner-only ledger removal, purging the place from the plan too
    pub async fn remove_place(
        &self,
        requester: &str,
        trip_id: &str,
        place_id: &str,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.remove_place(requester, place_id))
            .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::RemovePlace,
            json!({ "placeId": place_id }),
        );
        Ok(())
    }

    // ---- Itinerary Plan ----

    /// Schedule a nominated place on a day bucket
    pub async fn add_place_to_day(
        &self,
        user_id: &str,
        trip_id: &str,
        day: u32,
        place_id: &str,
    ) -> Result<(), ApiError> {
        let (_, entry) = self
            .mutate(trip_id, |t| {
                t.require_member(user_id)?;
                t.add_place_to_day(day, place_id)
            })
            .await?;
        // display attributes come from the cache populated at nomination
        let record = self.directory.lookup(place_id).await?;
        self.notifier.publish(
            trip_id,
            TripEventName::AddPlacePlan,
            json!({ "day": day, "place": entry, "placeInfo": record }),
        );
        Ok(())
    }

    /// Add a free-form activity to a day bucket
    pub async fn add_activity(
        &self,
        user_id: &str,
        trip_id: &str,
        day: u32,
        name: &str,
    ) -> Result<(), ApiError> {
        let (_, activity) = self
            .mutate(trip_id, |t| {
                t.require_member(user_id)?;
                t.add_activity(day, name, user_id)
            })
            .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::AddActivity,
            json!({ "day": day, "activity": activity }),
        );
        Ok(())
    }

    /// Remove a plan item (place or activity) from a day
    pub async fn remove_item(
        &self,
        user_id: &str,
        trip_id: &str,
        day: u32,
        item_id: &str,
    ) -> Result<(), ApiError> {
        let (_, removed) = self
            .mutate(trip_id, |t| {
                t.require_member(user_id)?;
                t.remove_item(day, item_id)
            })
            .await?;
        for item in removed {
            self.notifier.publish(
                trip_id,
                TripEventName::RemoveItemPlan,
                json!({ "day": day, "itemId": item.item_id, "kind": item.kind }),
            );
        }
        Ok(())
    }

    /// Update a plan item's start or end time
    pub async fn set_time(
        &self,
        user_id: &str,
        trip_id: &str,
        item_id: &str,
        field: TimeField,
        value: &str,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| {
            t.require_member(user_id)?;
            t.set_time(item_id, field, value)
        })
        .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::UpdatePlanTime,
            json!({ "itemId": item_id, "field": field, "value": value }),
        );
        Ok(())
    }

    // ---- Stage Machine ----

    /// Owner-only stage advance; generates day buckets on the
    /// invitation → placeSelect transition, exactly once
    pub async fn set_stage(
        &self,
        requester: &str,
        trip_id: &str,
        stage: TripStage,
    ) -> Result<(), ApiError> {
        let (trip, generated) = self
            .mutate(trip_id, |t| t.set_stage(requester, stage))
            .await?;
        let payload = if generated {
            json!({ "stage": stage.as_str(), "plan": trip.plan })
        } else {
            json!({ "stage": stage.as_str() })
        };
        self.notifier
            .publish(trip_id, TripEventName::UpdateStage, payload);
        Ok(())
    }

    /// Owner-only, irreversible itinerary finalization
    pub async fn finalize(&self, requester: &str, trip_id: &str) -> Result<(), ApiError> {
        let (trip, _) = self.mutate(trip_id, |t| t.finalize(requester)).await?;
        self.notifier.publish(
            trip_id,
            TripEventName::UpdateStage,
            json!({
                "stage": trip.current_stage.as_str(),
                "currentPlace": trip.current_place,
                "successCreate": trip.success_create,
            }),
        );
        Ok(())
    }

    // ---- Metadata ----

    /// Owner-only rename
    pub async fn rename(&self, requester: &str, trip_id: &str, name: &str) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.rename(requester, name)).await?;
        self.notifier
            .publish(trip_id, TripEventName::UpdateName, json!({ "name": name }));
        Ok(())
    }

    /// Update the shared note
    pub async fn set_note(&self, requester: &str, trip_id: &str, note: &str) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.set_note(requester, note)).await?;
        self.notifier
            .publish(trip_id, TripEventName::UpdateNote, json!({ "note": note }));
        Ok(())
    }

    /// Replace the cover image reference
    pub async fn set_cover_img(
        &self,
        requester: &str,
        trip_id: &str,
        cover: CoverImg,
    ) -> Result<(), ApiError> {
        self.mutate(trip_id, |t| t.set_cover_img(requester, cover.clone()))
            .await?;
        self.notifier.publish(
            trip_id,
            TripEventName::UpdateCoverImg,
            json!({ "coverImg": cover }),
        );
        Ok(())
    }

    // ---- Check-in progression ----

    /// Advance the itinerary after a confirmed on-site check-in
    ///
    /// The geolocation must be within the configured radius of the
    /// place's cached coordinates; an out-of-range attempt mutates
    /// nothing. One member's confirmed presence checks in the whole
    /// party: every member lacking a record at the place gets one.
    pub async fn check_in(
        &self,
        user_id: &str,
        trip_id: &str,
        place_id: &str,
        location: GeoPoint,
    ) -> Result<CheckInOutcome, ApiError> {
        let VersionedTrip { trip, .. } = self.load(trip_id).await?;
        trip.require_member(user_id)?;

        let record = self
            .directory
            .lookup(place_id)
            .await?
            .ok_or_else(|| TripError::PlaceNotFound {
                place_id: place_id.to_string(),
            })?;

        let distance = distance_km(location, GeoPoint::new(record.latitude, record.longitude));
        if distance > self.checkin_radius_km {
            return Err(TripError::OutOfRange {
                distance_km: distance,
                threshold_km: self.checkin_radius_km,
            }
            .into());
        }

        let (trip, progression) = self
            .mutate(trip_id, |t| t.advance_current_place())
            .await?;

        let mut checked_in = Vec::new();
        for member in &trip.member {
            if !self.check_ins.exists(&member.user_id, place_id).await? {
                self.check_ins
                    .insert(&CheckInRecord {
                        user_id: member.user_id.clone(),
                        place_id: place_id.to_string(),
                        province: record.location.province.clone(),
                        timestamp: chrono::Utc::now(),
                    })
                    .await?;
                checked_in.push(member.user_id.clone());
            }
        }

        tracing::info!(
            "[Trip] Check-in at {} on trip {} by {} ({} member records)",
            place_id,
            trip_id,
            user_id,
            checked_in.len()
        );

        Ok(CheckInOutcome {
            current_place: trip.current_place.clone(),
            all_done: progression == Progression::Completed,
            checked_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::directory::{PlaceContact, PlaceLocation, PlaceRecord};
    use crate::shared::TripEvent;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MemoryTripStore {
        trips: Mutex<HashMap<String, VersionedTrip>>,
        /// Number of initial update attempts to reject with a version conflict
        conflicts: AtomicU32,
    }

    impl MemoryTripStore {
        fn new() -> Self {
            Self {
                trips: Mutex::new(HashMap::new()),
                conflicts: AtomicU32::new(0),
            }
        }

        fn with_conflicts(n: u32) -> Self {
            let store = Self::new();
            store.conflicts.store(n, Ordering::SeqCst);
            store
        }
    }

    #[async_trait]
    impl TripStore for MemoryTripStore {
        async fn insert(&self, trip: &Trip) -> Result<(), ApiError> {
            self.trips.lock().unwrap().insert(
                trip.trip_id.clone(),
                VersionedTrip {
                    trip: trip.clone(),
                    version: 0,
                },
            );
            Ok(())
        }

        async fn fetch(&self, trip_id: &str) -> Result<Option<VersionedTrip>, ApiError> {
            Ok(self.trips.lock().unwrap().get(trip_id).cloned())
        }

        async fn fetch_by_invite(
            &self,
            invite_link: &str,
        ) -> Result<Option<VersionedTrip>, ApiError> {
            Ok(self
                .trips
                .lock()
                .unwrap()
                .values()
                .find(|v| v.trip.invite_link == invite_link)
                .cloned())
        }

        async fn update(&self, trip: &Trip, expected_version: i64) -> Result<bool, ApiError> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
            let mut trips = self.trips.lock().unwrap();
            match trips.get_mut(&trip.trip_id) {
                Some(stored) if stored.version == expected_version => {
                    stored.trip = trip.clone();
                    stored.version += 1;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn delete(&self, trip_id: &str, owner: &str) -> Result<bool, ApiError> {
            let mut trips = self.trips.lock().unwrap();
            let matches = trips
                .get(trip_id)
                .map(|v| v.trip.create_by == owner)
                .unwrap_or(false);
            if matches {
                trips.remove(trip_id);
            }
            Ok(matches)
        }
    }

    struct MemoryCheckInStore {
        records: Mutex<Vec<CheckInRecord>>,
    }

    impl MemoryCheckInStore {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CheckInStore for MemoryCheckInStore {
        async fn exists(&self, user_id: &str, place_id: &str) -> Result<bool, ApiError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.user_id == user_id && r.place_id == place_id))
        }

        async fn insert(&self, record: &CheckInRecord) -> Result<(), ApiError> {
            let mut records = self.records.lock().unwrap();
            if !records
                .iter()
                .any(|r| r.user_id == record.user_id && r.place_id == record.place_id)
            {
                records.push(record.clone());
            }
            Ok(())
        }
    }

    struct FakePlaceDirectory {
        places: HashMap<String, PlaceRecord>,
    }

    impl FakePlaceDirectory {
        fn new() -> Self {
            Self {
                places: HashMap::new(),
            }
        }

        fn with_place(mut self, place_id: &str, lat: f64, lon: f64) -> Self {
            self.places.insert(
                place_id.to_string(),
                PlaceRecord {
                    place_id: place_id.to_string(),
                    place_name: format!("Place {}", place_id),
                    category: crate::backend::directory::PlaceCategory::Attraction,
                    cover_img: Vec::new(),
                    introduction: None,
                    latitude: lat,
                    longitude: lon,
                    contact: PlaceContact::default(),
                    location: PlaceLocation {
                        address: None,
                        district: Some("Phra Nakhon".to_string()),
                        province: Some("Bangkok".to_string()),
                    },
                    weekday_text: None,
                },
            );
            self
        }
    }

    #[async_trait]
    impl PlaceDirectory for FakePlaceDirectory {
        async fn resolve(
            &self,
            _category: crate::backend::directory::PlaceCategory,
            place_id: &str,
        ) -> Result<PlaceRecord, ApiError> {
            self.places
                .get(place_id)
                .cloned()
                .ok_or_else(|| {
                    TripError::PlaceNotFound {
                        place_id: place_id.to_string(),
                    }
                    .into()
                })
        }

        async fn lookup(&self, place_id: &str) -> Result<Option<PlaceRecord>, ApiError> {
            Ok(self.places.get(place_id).cloned())
        }
    }

    struct NullForecast;

    #[async_trait]
    impl ForecastProvider for NullForecast {
        async fn forecast(
            &self,
            _province: &str,
            _district: &str,
            _date: NaiveDate,
            _duration_days: u8,
        ) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    struct MemoryProfileStore;

    #[async_trait]
    impl ProfileStore for MemoryProfileStore {
        async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError> {
            Ok(Some(UserProfile {
                user_id: user_id.to_string(),
                username: format!("{}-name", user_id),
                profile_url: None,
            }))
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn service_with(store: MemoryTripStore, directory: FakePlaceDirectory) -> TripService {
        TripService::new(
            Arc::new(store),
            Arc::new(MemoryCheckInStore::new()),
            Arc::new(directory),
            Arc::new(NullForecast),
            Arc::new(MemoryProfileStore),
            TripBroadcast::new(),
            3.0,
        )
    }

    fn service() -> TripService {
        service_with(
            MemoryTripStore::new(),
            FakePlaceDirectory::new()
                .with_place("p1", 13.75, 100.49)
                .with_place("p2", 13.76, 100.50),
        )
    }

    async fn drain(rx: &mut tokio::sync::broadcast::Receiver<TripEvent>) -> Vec<TripEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let info = svc
            .information("alice", &trip.trip_id, TripQuery::All)
            .await
            .unwrap();
        assert_eq!(info["tripId"], trip.trip_id);
        assert_eq!(info["createBy"], "alice");
    }

    #[tokio::test]
    async fn information_is_member_gated() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let err = svc
            .information("mallory", &trip.trip_id, TripQuery::All)
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Trip(TripError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn invitation_joins_and_is_idempotent() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let link = svc.invite_link("alice", &trip.trip_id).await.unwrap();

        let (trip_id, members) = svc.verify_invitation("bob", &link).await.unwrap();
        assert_eq!(trip_id, trip.trip_id);
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].username, "bob-name");

        // joining again changes nothing
        let (_, members) = svc.verify_invitation("bob", &link).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn invitation_rejects_unknown_token_and_full_trip() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let link = svc.invite_link("alice", &trip.trip_id).await.unwrap();

        assert_matches!(
            svc.verify_invitation("bob", "no-such-token").await.unwrap_err(),
            ApiError::Trip(TripError::InviteNotFound { .. })
        );

        for user in ["bob", "carol", "dave"] {
            svc.verify_invitation(user, &link).await.unwrap();
        }
        assert_matches!(
            svc.verify_invitation("eve", &link).await.unwrap_err(),
            ApiError::Trip(TripError::CapacityExceeded { capacity: 4 })
        );
    }

    #[tokio::test]
    async fn events_publish_only_after_persistence() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let mut rx = svc.notifier().subscribe(&trip.trip_id);

        svc.toggle_place(
            "alice",
            &trip.trip_id,
            crate::backend::directory::PlaceCategory::Attraction,
            "p1",
        )
        .await
        .unwrap();

        let events = drain(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, TripEventName::AddPlace);
        // state visible to a subscriber re-fetching on the event
        let info = svc
            .information("alice", &trip.trip_id, TripQuery::AllPlace)
            .await
            .unwrap();
        assert_eq!(info[0]["placeId"], "p1");
    }

    #[tokio::test]
    async fn toggle_emits_add_update_remove() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let link = svc.invite_link("alice", &trip.trip_id).await.unwrap();
        svc.verify_invitation("bob", &link).await.unwrap();
        let mut rx = svc.notifier().subscribe(&trip.trip_id);
        let category = crate::backend::directory::PlaceCategory::Attraction;

        let out = svc.toggle_place("alice", &trip.trip_id, category, "p1").await.unwrap();
        assert_eq!(out, ToggleOutcome::Added);
        let out = svc.toggle_place("bob", &trip.trip_id, category, "p1").await.unwrap();
        assert_matches!(out, ToggleOutcome::Updated { .. });
        svc.toggle_place("alice", &trip.trip_id, category, "p1").await.unwrap();
        let out = svc.toggle_place("bob", &trip.trip_id, category, "p1").await.unwrap();
        assert_eq!(out, ToggleOutcome::Removed);

        let names: Vec<_> = drain(&mut rx).await.into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                TripEventName::AddPlace,
                TripEventName::UpdatePlace,
                TripEventName::UpdatePlace,
                TripEventName::RemovePlace,
            ]
        );
    }

    #[tokio::test]
    async fn toggle_fails_before_mutation_for_unknown_place() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let err = svc
            .toggle_place(
                "alice",
                &trip.trip_id,
                crate::backend::directory::PlaceCategory::Attraction,
                "ghost",
            )
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Trip(TripError::PlaceNotFound { .. }));
        let info = svc
            .information("alice", &trip.trip_id, TripQuery::AllPlace)
            .await
            .unwrap();
        assert_eq!(info, serde_json::json!([]));
    }

    #[tokio::test]
    async fn version_conflicts_are_retried() {
        let svc = service_with(
            MemoryTripStore::with_conflicts(2),
            FakePlaceDirectory::new().with_place("p1", 13.75, 100.49),
        );
        let trip = svc.create_trip("alice").await.unwrap();
        let out = svc
            .toggle_place(
                "alice",
                &trip.trip_id,
                crate::backend::directory::PlaceCategory::Attraction,
                "p1",
            )
            .await
            .unwrap();
        assert_eq!(out, ToggleOutcome::Added);
    }

    #[tokio::test]
    async fn persistent_conflict_surfaces_as_upstream_error() {
        let svc = service_with(
            MemoryTripStore::with_conflicts(10),
            FakePlaceDirectory::new().with_place("p1", 13.75, 100.49),
        );
        let trip = svc.create_trip("alice").await.unwrap();
        let err = svc
            .toggle_place(
                "alice",
                &trip.trip_id,
                crate::backend::directory::PlaceCategory::Attraction,
                "p1",
            )
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Trip(TripError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn delete_trip_tells_subscribers_to_detach() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let mut rx = svc.notifier().subscribe(&trip.trip_id);

        assert_matches!(
            svc.delete_trip("bob", &trip.trip_id).await.unwrap_err(),
            ApiError::Trip(TripError::PermissionDenied { .. })
        );
        svc.delete_trip("alice", &trip.trip_id).await.unwrap();

        let events = drain(&mut rx).await;
        assert_eq!(events.last().unwrap().name, TripEventName::RemoveGroup);
        assert_matches!(
            svc.information("alice", &trip.trip_id, TripQuery::All)
                .await
                .unwrap_err(),
            ApiError::Trip(TripError::TripNotFound { .. })
        );
    }

    async fn finalized_single_stop_trip(svc: &TripService) -> (String, String) {
        let trip = svc.create_trip("alice").await.unwrap();
        let trip_id = trip.trip_id.clone();
        svc.set_trip_date(
            "alice",
            &trip_id,
            DateWindow::new(date("2024-01-01"), date("2024-01-01")),
        )
        .await
        .unwrap();
        svc.set_stage("alice", &trip_id, TripStage::PlaceSelect)
            .await
            .unwrap();
        svc.toggle_place(
            "alice",
            &trip_id,
            crate::backend::directory::PlaceCategory::Attraction,
            "p1",
        )
        .await
        .unwrap();
        svc.add_place_to_day("alice", &trip_id, 1, "p1").await.unwrap();
        svc.finalize("alice", &trip_id).await.unwrap();
        (trip_id, "p1".to_string())
    }

    #[tokio::test]
    async fn check_in_within_radius_advances_and_records_all_members() {
        let svc = service();
        let (trip_id, place_id) = finalized_single_stop_trip(&svc).await;
        let link = svc.invite_link("alice", &trip_id).await.unwrap();
        svc.verify_invitation("bob", &link).await.unwrap();

        let outcome = svc
            .check_in("alice", &trip_id, &place_id, GeoPoint::new(13.751, 100.491))
            .await
            .unwrap();
        assert!(outcome.all_done);
        let mut checked = outcome.checked_in.clone();
        checked.sort();
        assert_eq!(checked, vec!["alice".to_string(), "bob".to_string()]);

        // a second check-in at the same place creates no new records
        let outcome = svc
            .check_in("bob", &trip_id, &place_id, GeoPoint::new(13.751, 100.491))
            .await
            .unwrap();
        assert!(outcome.checked_in.is_empty());
    }

    #[tokio::test]
    async fn check_in_out_of_range_mutates_nothing() {
        let svc = service();
        let (trip_id, place_id) = finalized_single_stop_trip(&svc).await;
        let before = svc
            .information("alice", &trip_id, TripQuery::All)
            .await
            .unwrap();

        // Chiang Mai is far outside a 3 km radius of Bangkok
        let err = svc
            .check_in("alice", &trip_id, &place_id, GeoPoint::new(18.79, 98.98))
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Trip(TripError::OutOfRange { .. }));

        let after = svc
            .information("alice", &trip_id, TripQuery::All)
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn check_in_requires_finalized_trip() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        svc.toggle_place(
            "alice",
            &trip.trip_id,
            crate::backend::directory::PlaceCategory::Attraction,
            "p1",
        )
        .await
        .unwrap();
        let err = svc
            .check_in("alice", &trip.trip_id, "p1", GeoPoint::new(13.75, 100.49))
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Trip(TripError::NotFinalized { .. }));
    }

    #[tokio::test]
    async fn stage_change_broadcasts_generated_plan() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        svc.set_trip_date(
            "alice",
            &trip.trip_id,
            DateWindow::new(date("2024-01-01"), date("2024-01-03")),
        )
        .await
        .unwrap();
        let mut rx = svc.notifier().subscribe(&trip.trip_id);

        svc.set_stage("alice", &trip.trip_id, TripStage::PlaceSelect)
            .await
            .unwrap();
        let events = drain(&mut rx).await;
        assert_eq!(events[0].name, TripEventName::UpdateStage);
        assert_eq!(events[0].payload["plan"].as_array().unwrap().len(), 3);

        svc.set_stage("alice", &trip.trip_id, TripStage::PlanSelect)
            .await
            .unwrap();
        let events = drain(&mut rx).await;
        assert!(events[0].payload.get("plan").is_none());
    }

    #[tokio::test]
    async fn member_removal_emits_delete_id() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        let link = svc.invite_link("alice", &trip.trip_id).await.unwrap();
        svc.verify_invitation("bob", &link).await.unwrap();
        let mut rx = svc.notifier().subscribe(&trip.trip_id);

        svc.remove_member("alice", &trip.trip_id, "bob").await.unwrap();
        let events = drain(&mut rx).await;
        assert_eq!(events[0].name, TripEventName::RemoveMember);
        assert_eq!(events[0].payload["deleteId"], "bob");
    }

    #[tokio::test]
    async fn invite_link_is_member_only() {
        let svc = service();
        let trip = svc.create_trip("alice").await.unwrap();
        assert_matches!(
            svc.invite_link("mallory", &trip.trip_id).await.unwrap_err(),
            ApiError::Trip(TripError::PermissionDenied { .. })
        );
    }
}
