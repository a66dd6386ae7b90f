//! Trip HTTP Handlers
//!
//! Thin axum handlers for the trip command surface. Each one extracts
//! the authenticated caller, forwards to [`TripService`] and serializes
//! the result; domain and infrastructure failures surface through
//! `ApiError`'s `IntoResponse`.
//!
//! [`TripService`]: crate::backend::trip::service::TripService

use crate::backend::directory::PlaceCategory;
use crate::backend::error::ApiError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::{CoverImg, DateWindow, TimeField, TripQuery, TripStage};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripIdBody {
    pub trip_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripIdQuery {
    pub trip_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInvitationQuery {
    pub invite_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberBody {
    pub trip_id: String,
    pub delete_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBody {
    pub trip_id: String,
    pub date: Vec<DateWindow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDateBody {
    pub trip_id: String,
    pub date: DateWindow,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InformationQuery {
    pub trip_id: String,
    #[serde(rename = "type")]
    pub query: TripQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TogglePlaceBody {
    pub trip_id: String,
    pub place_id: String,
    pub category: PlaceCategory,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePlaceBody {
    pub trip_id: String,
    pub place_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePlanBody {
    pub trip_id: String,
    pub day: u32,
    pub place_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBody {
    pub trip_id: String,
    pub day: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemBody {
    pub trip_id: String,
    pub day: u32,
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTimeBody {
    pub trip_id: String,
    pub item_id: String,
    pub field: TimeField,
    pub time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBody {
    pub trip_id: String,
    pub stage: TripStage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameBody {
    pub trip_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub trip_id: String,
    pub note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImgBody {
    pub trip_id: String,
    pub cover_img: CoverImg,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInBody {
    pub trip_id: String,
    pub place_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    fn ok() -> Json<Self> {
        Json(Self { message: "success" })
    }
}

/// `POST /trip` - create a trip owned by the caller
pub async fn create_trip(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trip = state.service.create_trip(&user.user_id).await?;
    Ok(Json(serde_json::to_value(&trip)?))
}

/// `DELETE /trip` - owner-only trip deletion
pub async fn delete_trip(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<TripIdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete_trip(&user.user_id, &body.trip_id).await?;
    Ok(MessageResponse::ok())
}

/// `GET /trip/invitation` - member-only read of the invite token
pub async fn get_invitation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TripIdQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let link = state.service.invite_link(&user.user_id, &query.trip_id).await?;
    Ok(Json(json!({ "inviteLink": link })))
}

/// `GET /trip/verifyInvitation` - resolve an invite token and join
pub async fn verify_invitation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<VerifyInvitationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (trip_id, members) = state
        .service
        .verify_invitation(&user.user_id, &query.invite_link)
        .await?;
    Ok(Json(json!({ "tripId": trip_id, "member": members })))
}

/// `DELETE /trip/member` - remove a member (owner or self)
pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<RemoveMemberBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .remove_member(&user.user_id, &body.trip_id, &body.delete_id)
        .await?;
    Ok(MessageResponse::ok())
}

/// `POST /trip/date` - replace the caller's availability windows
pub async fn set_availability(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .set_availability(&user.user_id, &body.trip_id, body.date)
        .await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/date` - owner-only trip-wide window
pub async fn set_trip_date(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<TripDateBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .set_trip_date(&user.user_id, &body.trip_id, body.date)
        .await?;
    Ok(MessageResponse::ok())
}

/// `GET /trip/information` - member-only state snapshot
pub async fn get_information(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<InformationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let value = state
        .service
        .information(&user.user_id, &query.trip_id, query.query)
        .await?;
    Ok(Json(value))
}

/// `POST /trip/place` - toggle the caller's nomination of a place
pub async fn toggle_place(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<TogglePlaceBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .toggle_place(&user.user_id, &body.trip_id, body.category, &body.place_id)
        .await?;
    Ok(MessageResponse::ok())
}

/// `DELETE /trip/place` - owner-only ledger removal
pub async fn remove_place(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<RemovePlaceBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .remove_place(&user.user_id, &body.trip_id, &body.place_id)
        .await?;
    Ok(MessageResponse::ok())
}

/// `POST /trip/plan/place` - schedule a nominated place on a day
pub async fn add_place_to_day(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<PlacePlanBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .add_place_to_day(&user.user_id, &body.trip_id, body.day, &body.place_id)
        .await?;
    Ok(MessageResponse::ok())
}

/// `POST /trip/plan/activity` - add a free-form activity to a day
pub async fn add_activity(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ActivityBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .add_activity(&user.user_id, &body.trip_id, body.day, &body.name)
        .await?;
    Ok(MessageResponse::ok())
}

/// `DELETE /trip/plan/item` - remove a plan item from a day
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<RemoveItemBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .remove_item(&user.user_id, &body.trip_id, body.day, &body.item_id)
        .await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/plan/time` - update a plan item's start or end time
pub async fn set_plan_time(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<PlanTimeBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .set_time(&user.user_id, &body.trip_id, &body.item_id, body.field, &body.time)
        .await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/stage` - owner-only stage advance
pub async fn set_stage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<StageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .set_stage(&user.user_id, &body.trip_id, body.stage)
        .await?;
    Ok(MessageResponse::ok())
}

/// `POST /trip/finalize` - owner-only, irreversible finalization
pub async fn finalize(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<TripIdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.finalize(&user.user_id, &body.trip_id).await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/name` - owner-only rename
pub async fn set_name(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<NameBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.rename(&user.user_id, &body.trip_id, &body.name).await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/note` - update the shared note
pub async fn set_note(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<NoteBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.set_note(&user.user_id, &body.trip_id, &body.note).await?;
    Ok(MessageResponse::ok())
}

/// `PUT /trip/coverImg` - replace the cover image reference
pub async fn set_cover_img(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CoverImgBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .set_cover_img(&user.user_id, &body.trip_id, body.cover_img)
        .await?;
    Ok(MessageResponse::ok())
}

/// `POST /trip/checkIn` - on-site check-in, advances the itinerary
pub async fn check_in(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CheckInBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .service
        .check_in(
            &user.user_id,
            &body.trip_id,
            &body.place_id,
            crate::shared::geo::GeoPoint::new(body.latitude, body.longitude),
        )
        .await?;
    Ok(Json(serde_json::to_value(&outcome)?))
}
