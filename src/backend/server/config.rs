//! Server Configuration
//!
//! Loads server configuration from environment variables. The database
//! is required: the trip engine is stateless across restarts only
//! because every aggregate lives in Postgres, so startup fails fast
//! when `DATABASE_URL` is missing or unreachable. The external service
//! settings fall back to defaults suitable for local development.

use sqlx::PgPool;

/// Runtime configuration resolved from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub place_api_url: String,
    pub place_api_key: String,
    pub forecast_api_url: String,
    pub forecast_api_key: String,
    /// Maximum distance (km) a check-in may be from the place
    pub checkin_radius_km: f64,
}

impl ServerConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("[Config] JWT_SECRET not set, using development default");
            "your-secret-key-change-in-production".to_string()
        });

        let checkin_radius_km = std::env::var("CHECKIN_RADIUS_KM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3.0);

        Self {
            port,
            jwt_secret,
            place_api_url: std::env::var("PLACE_API_URL")
                .unwrap_or_else(|_| "https://tatapi.tourismthailand.org/tatapi/v5".to_string()),
            place_api_key: std::env::var("PLACE_API_KEY").unwrap_or_default(),
            forecast_api_url: std::env::var("FORECAST_API_URL")
                .unwrap_or_else(|_| "https://data.tmd.go.th/nwpapi/v1".to_string()),
            forecast_api_key: std::env::var("FORECAST_API_KEY").unwrap_or_default(),
            checkin_radius_km,
        }
    }
}

/// Connect to Postgres and run migrations
///
/// # Errors
///
/// Fails when `DATABASE_URL` is unset, the connection cannot be
/// established, or migrations cannot be applied. All three are startup
/// failures for this server.
pub async fn load_database() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL must be set; the trip engine requires Postgres")?;

    tracing::info!("[Config] Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;
    tracing::info!("[Config] Database connection pool created");

    tracing::info!("[Config] Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("[Config] Database migrations completed");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_sane() {
        // isolate from the ambient environment
        let config = ServerConfig {
            port: 3000,
            jwt_secret: "s".to_string(),
            place_api_url: "http://localhost".to_string(),
            place_api_key: String::new(),
            forecast_api_url: "http://localhost".to_string(),
            forecast_api_key: String::new(),
            checkin_radius_km: 3.0,
        };
        assert_eq!(config.port, 3000);
        assert_eq!(config.checkin_radius_km, 3.0);
    }
}
