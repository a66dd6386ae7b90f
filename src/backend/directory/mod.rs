//! External Collaborator Clients
//!
//! Thin clients for the third-party services the trip engine consumes:
//! the tourism place directory (cache-aside over the `places` table) and
//! the weather forecast service (best-effort, degrades to empty).
//!
//! Both are exposed as traits so the trip service takes them as injected
//! dependencies and tests can substitute fakes.

/// Place directory cache
pub mod place;

/// Weather forecast client
pub mod forecast;

pub use forecast::{ForecastProvider, HttpForecastProvider};
pub use place::{
    HttpPlaceDirectory, PlaceCategory, PlaceContact, PlaceDirectory, PlaceLocation, PlaceRecord,
};
