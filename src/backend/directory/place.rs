//! Place Directory Cache
//!
//! Resolves a place identifier + category to normalized place attributes.
//! Cache-aside: a hit in the `places` table returns immediately; a miss
//! fetches from the external tourism directory, persists the normalized
//! record and then returns it.
//!
//! Resolution failures are hard failures for the caller — place identity
//! is required for ledger and plan correctness — so an unresolvable id
//! maps to `PlaceNotFound` and a transport failure to
//! `UpstreamUnavailable`.

use crate::backend::error::ApiError;
use crate::shared::TripError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

/// Supported directory categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaceCategory {
    Attraction,
    Shop,
    Accommodation,
    Restaurant,
}

impl PlaceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attraction => "ATTRACTION",
            Self::Shop => "SHOP",
            Self::Accommodation => "ACCOMMODATION",
            Self::Restaurant => "RESTAURANT",
        }
    }

    /// Lowercase path segment used by the external directory API
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Attraction => "attraction",
            Self::Shop => "shop",
            Self::Accommodation => "accommodation",
            Self::Restaurant => "restaurant",
        }
    }
}

/// Contact details of a place
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceContact {
    pub phone: Option<String>,
    pub url: Option<String>,
}

/// Normalized location of a place
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceLocation {
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
}

/// Normalized place attributes returned by the directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub place_id: String,
    pub place_name: String,
    pub category: PlaceCategory,
    #[serde(default)]
    pub cover_img: Vec<String>,
    pub introduction: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub contact: PlaceContact,
    #[serde(default)]
    pub location: PlaceLocation,
    pub weekday_text: Option<Vec<String>>,
}

/// Place resolution collaborator
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    /// Resolve a place, fetching and caching on miss
    async fn resolve(&self, category: PlaceCategory, place_id: &str)
        -> Result<PlaceRecord, ApiError>;

    /// Cache-only lookup for places already resolved during nomination
    async fn lookup(&self, place_id: &str) -> Result<Option<PlaceRecord>, ApiError>;
}

/// Cache-aside directory client over the `places` table
pub struct HttpPlaceDirectory {
    pool: PgPool,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPlaceDirectory {
    pub fn new(pool: PgPool, base_url: String, api_key: String) -> Self {
        Self {
            pool,
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn load_cached(&self, place_id: &str) -> Result<Option<PlaceRecord>, ApiError> {
        #[derive(sqlx::FromRow)]
        struct PlaceRow {
            place_id: String,
            place_name: String,
            category: String,
            cover_img: Json<Vec<String>>,
            introduction: Option<String>,
            latitude: f64,
            longitude: f64,
            contact: Json<PlaceContact>,
            address: Option<String>,
            district: Option<String>,
            province: Option<String>,
            weekday_text: Option<Json<Vec<String>>>,
        }

        let row = sqlx::query_as::<_, PlaceRow>(
            r#"
            SELECT place_id, place_name, category, cover_img, introduction,
                   latitude, longitude, contact, address, district, province, weekday_text
            FROM places
            WHERE place_id = $1
            "#,
        )
        .bind(place_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PlaceRecord {
            place_id: row.place_id,
            place_name: row.place_name,
            category: match row.category.as_str() {
                "SHOP" => PlaceCategory::Shop,
                "ACCOMMODATION" => PlaceCategory::Accommodation,
                "RESTAURANT" => PlaceCategory::Restaurant,
                _ => PlaceCategory::Attraction,
            },
            cover_img: row.cover_img.0,
            introduction: row.introduction,
            latitude: row.latitude,
            longitude: row.longitude,
            contact: row.contact.0,
            location: PlaceLocation {
                address: row.address,
                district: row.district,
                province: row.province,
            },
            weekday_text: row.weekday_text.map(|j| j.0),
        }))
    }

    async fn store(&self, record: &PlaceRecord) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO places (place_id, place_name, category, cover_img, introduction,
                                latitude, longitude, contact, address, district, province,
                                weekday_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (place_id) DO NOTHING
            "#,
        )
        .bind(&record.place_id)
        .bind(&record.place_name)
        .bind(record.category.as_str())
        .bind(Json(&record.cover_img))
        .bind(&record.introduction)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(Json(&record.contact))
        .bind(&record.location.address)
        .bind(&record.location.district)
        .bind(&record.location.province)
        .bind(record.weekday_text.as_ref().map(Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_remote(
        &self,
        category: PlaceCategory,
        place_id: &str,
    ) -> Result<PlaceRecord, ApiError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            category.path_segment(),
            place_id
        );

        let response = self
            .client
            .get(&url)
            .header("Accept-Language", "th")
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| TripError::upstream(format!("place directory request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TripError::PlaceNotFound {
                place_id: place_id.to_string(),
            }
            .into());
        }
        if !response.status().is_success() {
            return Err(TripError::upstream(format!(
                "place directory returned {}",
                response.status()
            ))
            .into());
        }

        let body: DirectoryResponse = response
            .json()
            .await
            .map_err(|e| TripError::upstream(format!("place directory payload invalid: {}", e)))?;

        Ok(body.result.into_record(category))
    }
}

#[async_trait]
impl PlaceDirectory for HttpPlaceDirectory {
    async fn resolve(
        &self,
        category: PlaceCategory,
        place_id: &str,
    ) -> Result<PlaceRecord, ApiError> {
        if let Some(record) = self.load_cached(place_id).await? {
            tracing::debug!("[Directory] Cache hit for place {}", place_id);
            return Ok(record);
        }

        tracing::info!(
            "[Directory] Cache miss for place {}, fetching from upstream",
            place_id
        );
        let record = self.fetch_remote(category, place_id).await?;
        self.store(&record).await?;
        Ok(record)
    }

    async fn lookup(&self, place_id: &str) -> Result<Option<PlaceRecord>, ApiError> {
        self.load_cached(place_id).await
    }
}

// Upstream directory payload, reduced to the fields the engine keeps.

#[derive(Deserialize)]
struct DirectoryResponse {
    result: DirectoryResult,
}

#[derive(Deserialize)]
struct DirectoryResult {
    place_id: String,
    place_name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    web_picture_urls: Vec<String>,
    #[serde(default)]
    place_information: DirectoryInformation,
    #[serde(default)]
    contact: DirectoryContact,
    #[serde(default)]
    location: DirectoryLocation,
    #[serde(default)]
    opening_hours: Option<DirectoryOpeningHours>,
}

#[derive(Default, Deserialize)]
struct DirectoryInformation {
    introduction: Option<String>,
}

#[derive(Default, Deserialize)]
struct DirectoryContact {
    #[serde(default)]
    phones: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Default, Deserialize)]
struct DirectoryLocation {
    address: Option<String>,
    district: Option<String>,
    province: Option<String>,
}

#[derive(Deserialize)]
struct DirectoryOpeningHours {
    weekday_text: Option<Vec<String>>,
}

impl DirectoryResult {
    fn into_record(self, category: PlaceCategory) -> PlaceRecord {
        PlaceRecord {
            place_id: self.place_id,
            place_name: self.place_name,
            category,
            cover_img: self.web_picture_urls,
            introduction: self.place_information.introduction,
            latitude: self.latitude,
            longitude: self.longitude,
            contact: PlaceContact {
                phone: self.contact.phones.into_iter().next(),
                url: self.contact.urls.into_iter().next(),
            },
            location: PlaceLocation {
                address: self.location.address,
                district: self.location.district,
                province: self.location.province,
            },
            // accommodations carry no opening hours upstream
            weekday_text: self.opening_hours.and_then(|h| h.weekday_text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_names_are_uppercase() {
        assert_eq!(
            serde_json::to_string(&PlaceCategory::Attraction).unwrap(),
            "\"ATTRACTION\""
        );
        let parsed: PlaceCategory = serde_json::from_str("\"RESTAURANT\"").unwrap();
        assert_eq!(parsed, PlaceCategory::Restaurant);
    }

    #[test]
    fn path_segments_are_lowercase() {
        assert_eq!(PlaceCategory::Accommodation.path_segment(), "accommodation");
        assert_eq!(PlaceCategory::Shop.path_segment(), "shop");
    }

    #[test]
    fn upstream_payload_normalizes_to_record() {
        let body = serde_json::json!({
            "result": {
                "place_id": "P03000001",
                "place_name": "Grand Palace",
                "latitude": 13.75,
                "longitude": 100.49,
                "web_picture_urls": ["https://img.example/1.jpg"],
                "place_information": { "introduction": "Royal residence" },
                "contact": { "phones": ["021234567"], "urls": [] },
                "location": {
                    "address": "Na Phra Lan Rd",
                    "district": "Phra Nakhon",
                    "province": "Bangkok"
                },
                "opening_hours": { "weekday_text": ["Mon: 08:30-15:30"] }
            }
        });
        let parsed: DirectoryResponse = serde_json::from_value(body).unwrap();
        let record = parsed.result.into_record(PlaceCategory::Attraction);
        assert_eq!(record.place_name, "Grand Palace");
        assert_eq!(record.contact.phone.as_deref(), Some("021234567"));
        assert_eq!(record.contact.url, None);
        assert_eq!(record.location.province.as_deref(), Some("Bangkok"));
        assert_eq!(record.weekday_text.unwrap().len(), 1);
    }

    #[test]
    fn sparse_upstream_payload_still_parses() {
        let body = serde_json::json!({
            "result": {
                "place_id": "P1",
                "place_name": "Somewhere",
                "latitude": 0.0,
                "longitude": 0.0
            }
        });
        let parsed: DirectoryResponse = serde_json::from_value(body).unwrap();
        let record = parsed.result.into_record(PlaceCategory::Shop);
        assert!(record.cover_img.is_empty());
        assert_eq!(record.introduction, None);
        assert_eq!(record.weekday_text, None);
    }
}
