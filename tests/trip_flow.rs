//! End-to-end domain flow tests
//!
//! Walks a trip through its whole lifecycle using the public aggregate
//! API: creation, invitation joins, availability, place nomination,
//! plan construction, stage advancement, finalization and check-in
//! progression.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tripstream::shared::{
    DateWindow, Progression, TimeField, Trip, TripError, TripStage,
};

fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

#[test]
fn full_trip_lifecycle() {
    // owner creates, friends join
    let mut trip = Trip::new("alice");
    trip.add_member("bob").unwrap();
    trip.add_member("carol").unwrap();

    // members propose availability, owner settles the window
    trip.set_member_availability(
        "bob",
        vec![DateWindow::new(date("2024-04-12"), date("2024-04-16"))],
    )
    .unwrap();
    trip.set_trip_date("alice", DateWindow::new(date("2024-04-13"), date("2024-04-14")))
        .unwrap();

    // advancing out of invitation builds one bucket per calendar day
    assert!(trip.set_stage("alice", TripStage::PlaceSelect).unwrap());
    assert_eq!(trip.plan.len(), 2);

    // nominations accumulate voters
    trip.toggle_place("alice", "grand-palace").unwrap();
    trip.toggle_place("bob", "grand-palace").unwrap();
    trip.toggle_place("carol", "wat-pho").unwrap();
    assert_eq!(trip.place.len(), 2);

    // plan construction
    trip.set_stage("alice", TripStage::PlanSelect).unwrap();
    let palace = trip.add_place_to_day(1, "grand-palace").unwrap();
    let wat = trip.add_place_to_day(1, "wat-pho").unwrap();
    let dinner = trip.add_activity(1, "street food dinner", "carol").unwrap();
    trip.set_time(&palace.place_plan_id, TimeField::StartTime, "09:00")
        .unwrap();
    trip.set_time(&wat.place_plan_id, TimeField::StartTime, "13:30")
        .unwrap();
    trip.set_time(&dinner.activity_id, TimeField::StartTime, "18:00")
        .unwrap();

    // finalization points at the earliest stop
    trip.finalize("alice").unwrap();
    assert!(trip.success_create);
    assert_eq!(trip.current_stage, TripStage::Finish);
    assert_eq!(
        trip.current_place.as_deref(),
        Some(palace.place_plan_id.as_str())
    );

    // check-ins walk the itinerary in time order, then complete
    assert_eq!(
        trip.advance_current_place().unwrap(),
        Progression::Advanced {
            next_place_plan_id: wat.place_plan_id.clone()
        }
    );
    assert_eq!(trip.advance_current_place().unwrap(), Progression::Completed);
    assert_eq!(
        trip.current_place.as_deref(),
        Some(wat.place_plan_id.as_str())
    );
    assert!(trip.plan[0].place.iter().all(|p| p.status == "success"));
}

#[test]
fn leaving_member_mid_planning_keeps_the_trip_consistent() {
    let mut trip = Trip::new("alice");
    trip.add_member("bob").unwrap();
    trip.set_trip_date("alice", DateWindow::new(date("2024-07-01"), date("2024-07-02")))
        .unwrap();
    trip.set_stage("alice", TripStage::PlaceSelect).unwrap();

    trip.toggle_place("bob", "solo-pick").unwrap();
    trip.toggle_place("bob", "shared-pick").unwrap();
    trip.toggle_place("alice", "shared-pick").unwrap();
    trip.add_place_to_day(1, "solo-pick").unwrap();
    trip.add_place_to_day(2, "shared-pick").unwrap();

    trip.remove_member("bob", "bob").unwrap();

    // bob's solo nomination is gone everywhere; the shared one survives
    assert_eq!(trip.place.len(), 1);
    assert_eq!(trip.place[0].place_id, "shared-pick");
    assert!(trip.plan[0].place.is_empty());
    assert_eq!(trip.plan[1].place.len(), 1);
    assert_eq!(trip.plan[1].place[0].select_by, vec!["alice".to_string()]);
}

#[test]
fn finalization_freezes_the_stage_machine() {
    let mut trip = Trip::new("alice");
    trip.set_trip_date("alice", DateWindow::new(date("2024-07-01"), date("2024-07-01")))
        .unwrap();
    trip.set_stage("alice", TripStage::PlaceSelect).unwrap();
    trip.finalize("alice").unwrap();

    assert_matches!(
        trip.set_stage("alice", TripStage::PlanSelect),
        Err(TripError::InvalidStageTransition { .. })
    );
}

#[test]
fn owner_can_skip_stages_forward() {
    let mut trip = Trip::new("alice");
    trip.set_trip_date("alice", DateWindow::new(date("2024-07-01"), date("2024-07-03")))
        .unwrap();
    // invitation straight to planSelect still generates buckets
    let generated = trip.set_stage("alice", TripStage::PlanSelect).unwrap();
    assert!(generated);
    assert_eq!(trip.plan.len(), 3);
    assert_eq!(trip.current_stage, TripStage::PlanSelect);
}

#[test]
fn rejoining_after_removal_starts_fresh() {
    let mut trip = Trip::new("alice");
    trip.add_member("bob").unwrap();
    trip.set_member_availability(
        "bob",
        vec![DateWindow::new(date("2024-07-01"), date("2024-07-05"))],
    )
    .unwrap();

    trip.remove_member("alice", "bob").unwrap();
    trip.add_member("bob").unwrap();

    // previous availability does not survive removal
    let bob = trip.member.iter().find(|m| m.user_id == "bob").unwrap();
    assert_eq!(bob.date, vec![DateWindow::default()]);
}
