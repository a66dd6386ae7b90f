//! Real-time Trip Event System
//!
//! This module defines the events the engine broadcasts on a trip's
//! channel after a mutation is persisted. Event names are a stable wire
//! contract with the clients; the payload is the JSON projection of
//! whatever the mutation changed.
use serde::{Deserialize, Serialize};

/// Named domain events, one per broadcast the engine emits
///
/// The serialized names are exactly what subscribed clients dispatch on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TripEventName {
    AddMember,
    RemoveMember,
    /// A member changed their own availability windows
    UpdateDate,
    /// The owner set the trip-wide window
    UpdateTripDate,
    AddPlace,
    RemovePlace,
    /// A ledger entry's voter list changed
    UpdatePlace,
    AddPlacePlan,
    AddActivity,
    RemoveItemPlan,
    UpdatePlanTime,
    UpdateStage,
    UpdateName,
    UpdateNote,
    UpdateCoverImg,
    /// The trip was deleted; clients should detach from the channel
    RemoveGroup,
}

impl TripEventName {
    /// Wire name used as the SSE event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddMember => "addMember",
            Self::RemoveMember => "removeMember",
            Self::UpdateDate => "updateDate",
            Self::UpdateTripDate => "updateTripDate",
            Self::AddPlace => "addPlace",
            Self::RemovePlace => "removePlace",
            Self::UpdatePlace => "updatePlace",
            Self::AddPlacePlan => "addPlacePlan",
            Self::AddActivity => "addActivity",
            Self::RemoveItemPlan => "removeItemPlan",
            Self::UpdatePlanTime => "updatePlanTime",
            Self::UpdateStage => "updateStage",
            Self::UpdateName => "updateName",
            Self::UpdateNote => "updateNote",
            Self::UpdateCoverImg => "updateCoverImg",
            Self::RemoveGroup => "removeGroup",
        }
    }
}

/// One event broadcast to every subscriber of a trip's channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripEvent {
    /// Event name, stable contract
    pub name: TripEventName,
    /// Event payload (JSON projection of the change)
    pub payload: serde_json::Value,
    /// RFC3339 timestamp of when the event was emitted
    pub timestamp: String,
}

impl TripEvent {
    /// Create a new event stamped with the current time
    pub fn new(name: TripEventName, payload: serde_json::Value) -> Self {
        Self {
            name,
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_the_wire_contract() {
        let expected = [
            (TripEventName::AddMember, "addMember"),
            (TripEventName::RemoveMember, "removeMember"),
            (TripEventName::UpdateDate, "updateDate"),
            (TripEventName::UpdateTripDate, "updateTripDate"),
            (TripEventName::AddPlace, "addPlace"),
            (TripEventName::RemovePlace, "removePlace"),
            (TripEventName::UpdatePlace, "updatePlace"),
            (TripEventName::AddPlacePlan, "addPlacePlan"),
            (TripEventName::AddActivity, "addActivity"),
            (TripEventName::RemoveItemPlan, "removeItemPlan"),
            (TripEventName::UpdatePlanTime, "updatePlanTime"),
            (TripEventName::UpdateStage, "updateStage"),
            (TripEventName::UpdateName, "updateName"),
            (TripEventName::UpdateNote, "updateNote"),
            (TripEventName::UpdateCoverImg, "updateCoverImg"),
            (TripEventName::RemoveGroup, "removeGroup"),
        ];
        for (name, wire) in expected {
            assert_eq!(name.as_str(), wire);
            assert_eq!(
                serde_json::to_string(&name).unwrap(),
                format!("\"{}\"", wire)
            );
        }
    }

    #[test]
    fn event_carries_payload_and_timestamp() {
        let event = TripEvent::new(
            TripEventName::UpdateStage,
            serde_json::json!({"stage": "placeSelect"}),
        );
        assert_eq!(event.payload["stage"], "placeSelect");
        assert!(!event.timestamp.is_empty());
    }

    #[test]
    fn event_serialization_round_trip() {
        let event = TripEvent::new(TripEventName::AddPlace, serde_json::json!({"placeId": "p1"}));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TripEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
