//! Trip Aggregate
//!
//! This module defines the `Trip` root aggregate and every pure mutation
//! the synchronization engine performs on it: membership, availability
//! windows, the place-selection ledger, day-by-day plan construction,
//! the stage machine and check-in progression.
//!
//! All mutations here are synchronous and in-memory. The backend service
//! loads a trip, applies one of these mutations, persists the result with
//! an optimistic version check and only then broadcasts the matching
//! event, so a client reacting to a broadcast never observes stale state.
//!
//! Wire shape matches the JSON payloads the clients already speak
//! (camelCase field names, `HH:MM` time strings, ISO calendar dates).

use crate::shared::error::TripError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed member cap per trip
pub const MAX_MEMBERS: usize = 4;

/// One proposed or agreed date window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

/// A trip participant and their proposed availability windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripMember {
    pub user_id: String,
    #[serde(default)]
    pub date: Vec<DateWindow>,
}

/// One nominated place and the members who nominated it
///
/// Invariant: `select_by` is never empty — an entry loses its last voter
/// and is pruned in the same mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceVote {
    pub place_id: String,
    pub select_by: Vec<String>,
}

/// A scheduled place visit inside one day bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanPlace {
    /// Unique per insertion; the same placeId can be planned twice
    pub place_plan_id: String,
    pub place_id: String,
    /// `HH:MM` 24-hour local time, empty until set
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub select_by: Vec<String>,
    /// `"success"` once check-in progression has passed this stop
    #[serde(default)]
    pub status: String,
}

/// A free-form activity inside one day bucket
///
/// Invariant: `name` is unique within its day bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanActivity {
    pub activity_id: String,
    pub name: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub select_by: Vec<String>,
}

/// One calendar day's slice of the itinerary plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    /// 1-indexed position within the trip window
    pub day: u32,
    #[serde(default)]
    pub place: Vec<PlanPlace>,
    #[serde(default)]
    pub activity: Vec<PlanActivity>,
}

/// Reference to an externally stored cover image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoverImg {
    pub url: String,
    pub file_name: String,
}

/// Owner-driven workflow position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TripStage {
    Invitation,
    PlaceSelect,
    PlanSelect,
    Finish,
}

impl TripStage {
    /// Wire name, stable contract with the clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invitation => "invitation",
            Self::PlaceSelect => "placeSelect",
            Self::PlanSelect => "planSelect",
            Self::Finish => "finish",
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            Self::Invitation => 0,
            Self::PlaceSelect => 1,
            Self::PlanSelect => 2,
            Self::Finish => 3,
        }
    }
}

impl std::fmt::Display for TripStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector for state-snapshot reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TripQuery {
    Member,
    AllPlace,
    AllPlaceForEachDate,
    All,
}

/// Which time field of a plan item to update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimeField {
    StartTime,
    EndTime,
}

/// Result of an idempotent join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user was already a member; nothing changed
    AlreadyMember,
    Joined,
}

/// Net effect of toggling a nomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// New ledger entry created with the caller as sole voter
    Added,
    /// Voter set changed but the entry survives
    Updated { select_by: Vec<String> },
    /// The caller was the last voter; the entry was pruned
    Removed,
}

/// A plan item removed by `remove_item`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovedPlanItem {
    pub item_id: String,
    pub kind: PlanItemKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlanItemKind {
    Place,
    Activity,
}

/// Result of one check-in advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progression {
    /// `current_place` moved to the next stop in sequence
    Advanced { next_place_plan_id: String },
    /// The current stop was the last one; the pointer does not move
    Completed,
}

/// The root aggregate for one collaboratively planned journey
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: String,
    /// Owner; immutable after creation
    pub create_by: String,
    #[serde(default)]
    pub name: String,
    pub member: Vec<TripMember>,
    #[serde(default)]
    pub place: Vec<PlaceVote>,
    #[serde(default)]
    pub date: DateWindow,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub plan: Vec<DayBucket>,
    pub invite_link: String,
    pub current_stage: TripStage,
    #[serde(default)]
    pub current_place: Option<String>,
    #[serde(default)]
    pub success_create: bool,
    #[serde(default)]
    pub cover_img: Option<CoverImg>,
}

impl Trip {
    /// Create a new trip owned by `creator`, minting the id and invite token
    pub fn new(creator: impl Into<String>) -> Self {
        let creator = creator.into();
        Self {
            trip_id: Uuid::new_v4().to_string(),
            create_by: creator.clone(),
            name: String::new(),
            member: vec![TripMember {
                user_id: creator,
                date: Vec::new(),
            }],
            place: Vec::new(),
            date: DateWindow::default(),
            note: String::new(),
            plan: Vec::new(),
            invite_link: Uuid::new_v4().to_string(),
            current_stage: TripStage::Invitation,
            current_place: None,
            success_create: false,
            cover_img: None,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.create_by == user_id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member.iter().any(|m| m.user_id == user_id)
    }

    /// Member-only read guard used by the snapshot queries
    pub fn require_member(&self, user_id: &str) -> Result<(), TripError> {
        if self.is_member(user_id) {
            Ok(())
        } else {
            Err(TripError::denied(&self.trip_id, user_id))
        }
    }

    fn require_owner(&self, user_id: &str) -> Result<(), TripError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(TripError::denied(&self.trip_id, user_id))
        }
    }

    // ---- Member Registry ----

    /// Idempotent join, bounded by [`MAX_MEMBERS`]
    pub fn add_member(&mut self, user_id: &str) -> Result<JoinOutcome, TripError> {
        if self.is_member(user_id) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        if self.member.len() >= MAX_MEMBERS {
            return Err(TripError::CapacityExceeded {
                capacity: MAX_MEMBERS,
            });
        }
        self.member.push(TripMember {
            user_id: user_id.to_string(),
            date: vec![DateWindow::default()],
        });
        Ok(JoinOutcome::Joined)
    }

    /// Remove a member, cascading their id out of every selectBy set
    ///
    /// Allowed for the owner or for the member removing themselves. Ledger
    /// and plan entries left with an empty voter set are pruned.
    pub fn remove_member(&mut self, requester: &str, target: &str) -> Result<(), TripError> {
        if !self.is_owner(requester) && requester != target {
            return Err(TripError::denied(&self.trip_id, requester));
        }
        if !self.is_member(target) {
            return Err(TripError::MemberNotFound {
                trip_id: self.trip_id.clone(),
                user_id: target.to_string(),
            });
        }
        self.member.retain(|m| m.user_id != target);

        for entry in &mut self.place {
            entry.select_by.retain(|u| u != target);
        }
        self.place.retain(|entry| !entry.select_by.is_empty());

        for bucket in &mut self.plan {
            for place in &mut bucket.place {
                place.select_by.retain(|u| u != target);
            }
            bucket.place.retain(|p| !p.select_by.is_empty());
            for activity in &mut bucket.activity {
                activity.select_by.retain(|u| u != target);
            }
            bucket.activity.retain(|a| !a.select_by.is_empty());
        }
        Ok(())
    }

    /// Replace a member's own availability windows
    pub fn set_member_availability(
        &mut self,
        user_id: &str,
        windows: Vec<DateWindow>,
    ) -> Result<(), TripError> {
        let member = self
            .member
            .iter_mut()
            .find(|m| m.user_id == user_id)
            .ok_or_else(|| TripError::MemberNotFound {
                trip_id: self.trip_id.clone(),
                user_id: user_id.to_string(),
            })?;
        member.date = windows;
        Ok(())
    }

    // ---- Trip-wide date window ----

    /// Record the agreed trip window; owner-only, no stage transition
    pub fn set_trip_date(&mut self, requester: &str, window: DateWindow) -> Result<(), TripError> {
        self.require_owner(requester)?;
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if end < start {
                return Err(TripError::InvalidDateRange {
                    trip_id: self.trip_id.clone(),
                    message: format!("end {} precedes start {}", end, start),
                });
            }
        }
        self.date = window;
        Ok(())
    }

    // ---- Place Selection Ledger ----

    /// Toggle the caller's nomination of `place_id`
    ///
    /// The caller must already be resolvable as a member; place identity is
    /// resolved by the caller (directory collaborator) before this runs.
    pub fn toggle_place(&mut self, user_id: &str, place_id: &str) -> Result<ToggleOutcome, TripError> {
        self.require_member(user_id)?;
        if let Some(idx) = self.place.iter().position(|p| p.place_id == place_id) {
            let entry = &mut self.place[idx];
            if entry.select_by.iter().any(|u| u == user_id) {
                entry.select_by.retain(|u| u != user_id);
                if entry.select_by.is_empty() {
                    self.place.remove(idx);
                    return Ok(ToggleOutcome::Removed);
                }
                return Ok(ToggleOutcome::Updated {
                    select_by: entry.select_by.clone(),
                });
            }
            entry.select_by.push(user_id.to_string());
            return Ok(ToggleOutcome::Updated {
                select_by: entry.select_by.clone(),
            });
        }
        self.place.push(PlaceVote {
            place_id: place_id.to_string(),
            select_by: vec![user_id.to_string()],
        });
        Ok(ToggleOutcome::Added)
    }

    /// Owner-only ledger removal; also purges the place from every day bucket
    pub fn remove_place(&mut self, requester: &str, place_id: &str) -> Result<(), TripError> {
        self.require_owner(requester)?;
        let before = self.place.len();
        self.place.retain(|p| p.place_id != place_id);
        if self.place.len() == before {
            return Err(TripError::PlaceNotFound {
                place_id: place_id.to_string(),
            });
        }
        for bucket in &mut self.plan {
            bucket.place.retain(|p| p.place_id != place_id);
        }
        Ok(())
    }

    // ---- Itinerary Plan ----

    /// Rebuild the day buckets from the trip window (inclusive span)
    ///
    /// Always overwrites `plan`; the stage machine guards against
    /// regeneration by only calling this on the invitation transition.
    pub fn generate_day_buckets(&mut self) -> Result<(), TripError> {
        let (start, end) = match (self.date.start, self.date.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(TripError::InvalidDateRange {
                    trip_id: self.trip_id.clone(),
                    message: "trip date window is not set".to_string(),
                })
            }
        };
        if end < start {
            return Err(TripError::InvalidDateRange {
                trip_id: self.trip_id.clone(),
                message: format!("end {} precedes start {}", end, start),
            });
        }
        self.plan = start
            .iter_days()
            .take_while(|d| *d <= end)
            .enumerate()
            .map(|(i, date)| DayBucket {
                date,
                day: i as u32 + 1,
                place: Vec::new(),
                activity: Vec::new(),
            })
            .collect();
        Ok(())
    }

    fn bucket_mut(&mut self, day: u32) -> Result<&mut DayBucket, TripError> {
        let trip_id = self.trip_id.clone();
        self.plan
            .iter_mut()
            .find(|b| b.day == day)
            .ok_or(TripError::DayNotFound { trip_id, day })
    }

    /// Schedule a nominated place on a day
    ///
    /// Copies the ledger entry's current voter set into the new plan entry
    /// (a snapshot, not a live reference) and mints a fresh placePlanId.
    pub fn add_place_to_day(&mut self, day: u32, place_id: &str) -> Result<PlanPlace, TripError> {
        let select_by = self
            .place
            .iter()
            .find(|p| p.place_id == place_id)
            .map(|p| p.select_by.clone())
            .ok_or_else(|| TripError::PlaceNotFound {
                place_id: place_id.to_string(),
            })?;
        let entry = PlanPlace {
            place_plan_id: Uuid::new_v4().to_string(),
            place_id: place_id.to_string(),
            start_time: String::new(),
            end_time: String::new(),
            select_by,
            status: String::new(),
        };
        let bucket = self.bucket_mut(day)?;
        bucket.place.push(entry.clone());
        Ok(entry)
    }

    /// Add a free-form activity; names are unique within a day
    pub fn add_activity(
        &mut self,
        day: u32,
        name: &str,
        user_id: &str,
    ) -> Result<PlanActivity, TripError> {
        let bucket = self.bucket_mut(day)?;
        if bucket.activity.iter().any(|a| a.name == name) {
            return Err(TripError::DuplicateActivity {
                day,
                name: name.to_string(),
            });
        }
        let activity = PlanActivity {
            activity_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            start_time: String::new(),
            end_time: String::new(),
            select_by: vec![user_id.to_string()],
        };
        bucket.activity.push(activity.clone());
        Ok(activity)
    }

    /// Remove every place or activity in `day` matching `item_id`
    pub fn remove_item(&mut self, day: u32, item_id: &str) -> Result<Vec<RemovedPlanItem>, TripError> {
        let bucket = self.bucket_mut(day)?;
        let mut removed = Vec::new();
        bucket.place.retain(|p| {
            if p.place_plan_id == item_id {
                removed.push(RemovedPlanItem {
                    item_id: p.place_plan_id.clone(),
                    kind: PlanItemKind::Place,
                });
                false
            } else {
                true
            }
        });
        bucket.activity.retain(|a| {
            if a.activity_id == item_id {
                removed.push(RemovedPlanItem {
                    item_id: a.activity_id.clone(),
                    kind: PlanItemKind::Activity,
                });
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            return Err(TripError::PlanItemNotFound {
                item_id: item_id.to_string(),
            });
        }
        Ok(removed)
    }

    /// Update startTime/endTime of the plan item matching `item_id`
    ///
    /// No cross-item overlap validation: overlapping windows are permitted.
    pub fn set_time(
        &mut self,
        item_id: &str,
        field: TimeField,
        value: &str,
    ) -> Result<(), TripError> {
        for bucket in &mut self.plan {
            if let Some(place) = bucket.place.iter_mut().find(|p| p.place_plan_id == item_id) {
                match field {
                    TimeField::StartTime => place.start_time = value.to_string(),
                    TimeField::EndTime => place.end_time = value.to_string(),
                }
                return Ok(());
            }
            if let Some(activity) = bucket.activity.iter_mut().find(|a| a.activity_id == item_id) {
                match field {
                    TimeField::StartTime => activity.start_time = value.to_string(),
                    TimeField::EndTime => activity.end_time = value.to_string(),
                }
                return Ok(());
            }
        }
        Err(TripError::PlanItemNotFound {
            item_id: item_id.to_string(),
        })
    }

    /// A day's places sorted ascending by startTime
    ///
    /// Lexicographic comparison of the zero-padded `HH:MM` strings; equal
    /// or blank times keep insertion order (stable sort, blanks first).
    pub fn sorted_day_places(bucket: &DayBucket) -> Vec<PlanPlace> {
        let mut places = bucket.place.clone();
        places.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        places
    }

    /// All stops in calendar-day order, each day internally time-sorted
    pub fn flatten_stops(&self) -> Vec<PlanPlace> {
        self.plan.iter().flat_map(|b| Self::sorted_day_places(b)).collect()
    }

    // ---- Stage Machine ----

    /// Whether the stage machine accepts `from → to`
    ///
    /// Only forward movement is defined, and nothing moves once the
    /// itinerary has been finalized.
    pub fn can_transition(&self, from: TripStage, to: TripStage) -> bool {
        !self.success_create && to.ordinal() > from.ordinal()
    }

    /// Owner-only stage advance
    ///
    /// The invitation → placeSelect transition requires the trip window to
    /// be set and generates the day buckets exactly once; re-entering a
    /// later stage never regenerates them. Returns whether buckets were
    /// generated by this call.
    pub fn set_stage(&mut self, requester: &str, new_stage: TripStage) -> Result<bool, TripError> {
        self.require_owner(requester)?;
        let from = self.current_stage;
        if !self.can_transition(from, new_stage) {
            return Err(TripError::InvalidStageTransition {
                from: from.as_str().to_string(),
                to: new_stage.as_str().to_string(),
            });
        }
        let mut generated = false;
        if from == TripStage::Invitation && new_stage.ordinal() >= TripStage::PlaceSelect.ordinal() {
            self.generate_day_buckets()?;
            generated = true;
        }
        self.current_stage = new_stage;
        Ok(generated)
    }

    /// Owner-only, irreversible itinerary finalization
    ///
    /// Points `current_place` at the first time-sorted place of the first
    /// day that has any, flips `success_create` and enters `finish`.
    /// Calling it again is a state-level no-op.
    pub fn finalize(&mut self, requester: &str) -> Result<(), TripError> {
        self.require_owner(requester)?;
        if self.success_create {
            return Ok(());
        }
        self.current_place = self
            .plan
            .iter()
            .map(|b| Self::sorted_day_places(b))
            .find(|places| !places.is_empty())
            .map(|places| places[0].place_plan_id.clone());
        self.success_create = true;
        self.current_stage = TripStage::Finish;
        Ok(())
    }

    // ---- Check-in progression ----

    /// Advance the current-stop pointer after a confirmed check-in
    ///
    /// The pointer moves to the next stop of the flattened, time-sorted
    /// sequence; at the last stop progression reports completion instead
    /// of advancing past the end. The stop just confirmed is marked
    /// `"success"`. Monotonic: the pointer never moves backward.
    pub fn advance_current_place(&mut self) -> Result<Progression, TripError> {
        if !self.success_create {
            return Err(TripError::NotFinalized {
                trip_id: self.trip_id.clone(),
            });
        }
        let stops = self.flatten_stops();
        let current = match &self.current_place {
            Some(id) => id.clone(),
            None => return Ok(Progression::Completed),
        };
        let idx = stops
            .iter()
            .position(|s| s.place_plan_id == current)
            .ok_or(TripError::PlanItemNotFound {
                item_id: current.clone(),
            })?;
        self.mark_stop_success(&current);
        match stops.get(idx + 1) {
            Some(next) => {
                self.current_place = Some(next.place_plan_id.clone());
                Ok(Progression::Advanced {
                    next_place_plan_id: next.place_plan_id.clone(),
                })
            }
            None => Ok(Progression::Completed),
        }
    }

    fn mark_stop_success(&mut self, place_plan_id: &str) {
        for bucket in &mut self.plan {
            if let Some(place) = bucket
                .place
                .iter_mut()
                .find(|p| p.place_plan_id == place_plan_id)
            {
                place.status = "success".to_string();
            }
        }
    }

    // ---- Metadata ----

    /// Owner-only rename
    pub fn rename(&mut self, requester: &str, name: &str) -> Result<(), TripError> {
        self.require_owner(requester)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Any member may update the shared note
    pub fn set_note(&mut self, requester: &str, note: &str) -> Result<(), TripError> {
        self.require_member(requester)?;
        self.note = note.to_string();
        Ok(())
    }

    /// Any member may replace the cover image reference
    pub fn set_cover_img(&mut self, requester: &str, cover: CoverImg) -> Result<(), TripError> {
        self.require_member(requester)?;
        self.cover_img = Some(cover);
        Ok(())
    }
}
