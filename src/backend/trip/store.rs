//! Trip Persistence
//!
//! The Trip aggregate is stored as one JSONB document per row with an
//! optimistic version counter. Every mutation is a compare-and-swap:
//! `UPDATE ... WHERE trip_id = $1 AND version = $2`. A losing writer
//! observes zero affected rows and retries the whole command against a
//! fresh snapshot, so concurrent members can never silently clobber each
//! other's edits.
//!
//! Check-in records live in their own append-only table, unique per
//! member/place pair.

use crate::backend::error::ApiError;
use crate::shared::Trip;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

/// A trip snapshot together with the version it was read at
#[derive(Debug, Clone)]
pub struct VersionedTrip {
    pub trip: Trip,
    pub version: i64,
}

/// Persistence seam for the Trip aggregate
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Insert a freshly created trip at version 0
    async fn insert(&self, trip: &Trip) -> Result<(), ApiError>;

    /// Fetch by trip id
    async fn fetch(&self, trip_id: &str) -> Result<Option<VersionedTrip>, ApiError>;

    /// Fetch by invite token
    async fn fetch_by_invite(&self, invite_link: &str) -> Result<Option<VersionedTrip>, ApiError>;

    /// Compare-and-swap update; `false` means the version check failed
    async fn update(&self, trip: &Trip, expected_version: i64) -> Result<bool, ApiError>;

    /// Delete a trip owned by `owner`; `false` if no such row
    async fn delete(&self, trip_id: &str, owner: &str) -> Result<bool, ApiError>;
}

/// One member's check-in at a place
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInRecord {
    pub user_id: String,
    pub place_id: String,
    pub province: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Persistence seam for check-in records
#[async_trait]
pub trait CheckInStore: Send + Sync {
    /// Whether this member already has a record at this place
    async fn exists(&self, user_id: &str, place_id: &str) -> Result<bool, ApiError>;

    /// Insert a record; inserting an existing member/place pair is a no-op
    async fn insert(&self, record: &CheckInRecord) -> Result<(), ApiError>;
}

/// Postgres-backed trip store
#[derive(Clone)]
pub struct PgTripStore {
    pool: PgPool,
}

impl PgTripStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TripRow {
    doc: Json<Trip>,
    version: i64,
}

impl From<TripRow> for VersionedTrip {
    fn from(row: TripRow) -> Self {
        Self {
            trip: row.doc.0,
            version: row.version,
        }
    }
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn insert(&self, trip: &Trip) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO trips (trip_id, invite_link, create_by, doc, version)
            VALUES ($1, $2, $3, $4, 0)
            "#,
        )
        .bind(&trip.trip_id)
        .bind(&trip.invite_link)
        .bind(&trip.create_by)
        .bind(Json(trip))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, trip_id: &str) -> Result<Option<VersionedTrip>, ApiError> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"SELECT doc, version FROM trips WHERE trip_id = $1"#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn fetch_by_invite(&self, invite_link: &str) -> Result<Option<VersionedTrip>, ApiError> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"SELECT doc, version FROM trips WHERE invite_link = $1"#,
        )
        .bind(invite_link)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update(&self, trip: &Trip, expected_version: i64) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET doc = $3, invite_link = $4, version = version + 1, updated_at = NOW()
            WHERE trip_id = $1 AND version = $2
            "#,
        )
        .bind(&trip.trip_id)
        .bind(expected_version)
        .bind(Json(trip))
        .bind(&trip.invite_link)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, trip_id: &str, owner: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM trips WHERE trip_id = $1 AND create_by = $2"#)
            .bind(trip_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Postgres-backed check-in store
#[derive(Clone)]
pub struct PgCheckInStore {
    pool: PgPool,
}

impl PgCheckInStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckInStore for PgCheckInStore {
    async fn exists(&self, user_id: &str, place_id: &str) -> Result<bool, ApiError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"SELECT 1 FROM check_ins WHERE user_id = $1 AND place_id = $2"#,
        )
        .bind(user_id)
        .bind(place_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, record: &CheckInRecord) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO check_ins (user_id, place_id, province, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, place_id) DO NOTHING
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.place_id)
        .bind(&record.province)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
