//! Weather service for SkyCast
//!
//! Provides forecasts and location search via the Open-Meteo APIs, with
//! persistent caching and a saved-locations list.

pub mod types;
pub mod normalize;
pub mod storage;
pub mod cache;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod orchestrator;
pub mod search;

pub use types::*;
pub use cache::{CacheLookup, WeatherCache};
pub use geocode::GeocodingClient;
pub use location::{favorites_first, LocationStore};
pub use normalize::{classify_query, SearchQuery};
pub use orchestrator::{
    FetchOutcome, Notification, WeatherOrchestrator, WeatherState, WeatherStateHandle,
    FETCH_FAILED_MESSAGE,
};
pub use provider::WeatherProvider;
pub use search::{SearchCoordinator, SearchView};
pub use storage::{KvStore, MemoryStore, SqliteStore};
