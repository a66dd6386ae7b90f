//! Weather Forecast Client
//!
//! Best-effort forecast enrichment for newly nominated places. The
//! external service only answers for a bounded window, so requested
//! dates are clamped: past dates are coerced to today, and anything
//! beyond the horizon returns empty. Every upstream failure degrades to
//! an empty forecast — this collaborator never fails a caller.

use async_trait::async_trait;
use chrono::NaiveDate;

/// How far ahead the external service can forecast
const FORECAST_HORIZON_DAYS: i64 = 7;

/// Forecast collaborator; always succeeds, possibly with an empty result
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Forecast for a location and date; `Value::Null` means no data
    async fn forecast(
        &self,
        province: &str,
        district: &str,
        date: NaiveDate,
        duration_days: u8,
    ) -> serde_json::Value;
}

/// Clamp a requested date into the service's supported window
///
/// Past dates are coerced to `today`; dates beyond the horizon are
/// unsupported and yield `None` (callers report an empty forecast).
pub fn clamp_forecast_date(requested: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    if requested < today {
        return Some(today);
    }
    if (requested - today).num_days() > FORECAST_HORIZON_DAYS {
        return None;
    }
    Some(requested)
}

/// HTTP forecast client
pub struct HttpForecastProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpForecastProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn fetch(
        &self,
        province: &str,
        district: &str,
        date: NaiveDate,
        duration_days: u8,
    ) -> Result<serde_json::Value, reqwest::Error> {
        let url = format!("{}/forecast/location", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("province", province),
                ("amphoe", district),
                ("date", &date.format("%Y-%m-%d").to_string()),
                ("duration", &duration_days.to_string()),
            ])
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }
}

#[async_trait]
impl ForecastProvider for HttpForecastProvider {
    async fn forecast(
        &self,
        province: &str,
        district: &str,
        date: NaiveDate,
        duration_days: u8,
    ) -> serde_json::Value {
        let today = chrono::Utc::now().date_naive();
        let Some(date) = clamp_forecast_date(date, today) else {
            tracing::debug!(
                "[Forecast] Date {} beyond horizon, returning empty",
                date
            );
            return serde_json::Value::Null;
        };

        match self.fetch(province, district, date, duration_days).await {
            Ok(value) => value,
            Err(e) => {
                // best-effort only; the nomination itself must not fail
                tracing::warn!("[Forecast] Lookup failed, returning empty: {}", e);
                serde_json::Value::Null
            }
        }
    }
}
