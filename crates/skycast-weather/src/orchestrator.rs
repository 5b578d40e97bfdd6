//! Weather orchestration: cache-or-fetch decisions and the observable state.
//!
//! All async work runs on the caller's runtime; user-visible notifications
//! are sent via mpsc so a front end can drain them on its own thread.

use chrono::Utc;
use parking_lot::RwLock;
use skycast_core::Config;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::cache::{CacheLookup, WeatherCache};
use crate::location::LocationStore;
use crate::provider::WeatherProvider;
use crate::storage::KvStore;
use crate::types::{Location, WeatherResult, WeatherSnapshot};

/// Error shown whenever a fetch fails, regardless of cause
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch weather data. Please try again.";

/// Observable weather state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub current_weather: Option<WeatherSnapshot>,
    pub saved_locations: Vec<Location>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Shared handle to the weather state. The lock is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct WeatherStateHandle {
    inner: Arc<RwLock<WeatherState>>,
}

impl WeatherStateHandle {
    /// Copy of the current state
    pub fn snapshot(&self) -> WeatherState {
        self.inner.read().clone()
    }

    pub fn current_weather(&self) -> Option<WeatherSnapshot> {
        self.inner.read().current_weather.clone()
    }

    pub fn saved_locations(&self) -> Vec<Location> {
        self.inner.read().saved_locations.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut WeatherState) -> R) -> R {
        f(&mut self.inner.write())
    }
}

/// User-visible messages from weather operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    FetchFailed { title: String, description: String },
    Refreshed { location_name: String },
}

/// How a fetch request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    CacheHit,
    Fetched,
    Failed,
}

pub struct WeatherOrchestrator {
    provider: WeatherProvider,
    cache: WeatherCache,
    locations: LocationStore,
    state: WeatherStateHandle,
    generation: AtomicU64,
    notifier: Option<Sender<Notification>>,
}

impl WeatherOrchestrator {
    pub fn new(provider: WeatherProvider, cache: WeatherCache, locations: LocationStore) -> Self {
        Self {
            provider,
            cache,
            locations,
            state: WeatherStateHandle::default(),
            generation: AtomicU64::new(0),
            notifier: None,
        }
    }

    /// Build the provider, cache and location store from configuration over one store.
    pub fn from_config(config: &Config, store: Arc<dyn KvStore>) -> WeatherResult<Self> {
        let provider = WeatherProvider::from_config(&config.weather)?;
        let cache = WeatherCache::new(store.clone(), config.weather.freshness_minutes);
        let locations = LocationStore::new(store);
        Ok(Self::new(provider, cache, locations))
    }

    /// Send notifications to this channel
    pub fn with_notifier(mut self, tx: Sender<Notification>) -> Self {
        self.notifier = Some(tx);
        self
    }

    pub fn state(&self) -> WeatherStateHandle {
        self.state.clone()
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Restore saved locations and the last viewed snapshot. With no last
    /// snapshot, the first saved location is fetched; a cold start with
    /// nothing saved makes no provider calls.
    pub async fn initialize(&self) {
        let saved = self.locations.list();
        let last_viewed = self.cache.last_viewed();
        tracing::info!(
            "Initializing with {} saved locations (last viewed: {})",
            saved.len(),
            last_viewed.is_some()
        );

        let first = saved.first().cloned();
        let has_last_viewed = last_viewed.is_some();
        self.state.update(|s| {
            s.saved_locations = saved;
            if last_viewed.is_some() {
                s.current_weather = last_viewed;
            }
        });

        if !has_last_viewed {
            if let Some(location) = first {
                self.fetch_weather(&location).await;
            }
        }
    }

    /// Show weather for a location, from cache when fresh.
    pub async fn fetch_weather(&self, location: &Location) -> FetchOutcome {
        self.load(location, false).await
    }

    /// Refetch the displayed location, bypassing the freshness window.
    /// Returns `None` when nothing is displayed.
    pub async fn refresh_weather(&self) -> Option<FetchOutcome> {
        let location = self.state.current_weather()?.location;
        let outcome = self.load(&location, true).await;
        if outcome == FetchOutcome::Fetched {
            self.notify(Notification::Refreshed {
                location_name: location.name.clone(),
            });
        }
        Some(outcome)
    }

    pub fn add_location(&self, location: &Location) {
        let saved = self.locations.upsert(location);
        self.state.update(|s| s.saved_locations = saved);
    }

    /// Remove a saved location. Removing the displayed location switches to
    /// the first remaining one, or clears the display when none remain.
    pub async fn remove_location(&self, id: &str) {
        let saved = self.locations.remove(id);
        let next = saved.first().cloned();
        let was_displayed = self.state.update(|s| {
            s.saved_locations = saved;
            let displayed = s
                .current_weather
                .as_ref()
                .is_some_and(|w| w.location.id == id);
            if displayed && next.is_none() {
                s.current_weather = None;
            }
            displayed
        });

        if was_displayed {
            if let Some(location) = next {
                self.fetch_weather(&location).await;
            }
        }
    }

    pub fn toggle_favorite(&self, id: &str) {
        let saved = self.locations.toggle_favorite(id);
        self.state.update(|s| s.saved_locations = saved);
    }

    async fn load(&self, location: &Location, force: bool) -> FetchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let stale = match self.cache.lookup(&location.id, Utc::now()) {
            CacheLookup::Fresh(snapshot) if !force => {
                tracing::debug!("Serving fresh cached weather for {}", location.id);
                self.cache.set_last_viewed(&snapshot);
                self.apply(generation, |s| {
                    s.current_weather = Some(snapshot);
                    s.is_loading = false;
                });
                return FetchOutcome::CacheHit;
            }
            CacheLookup::Fresh(snapshot) | CacheLookup::Stale(snapshot) => Some(snapshot),
            CacheLookup::Missing => None,
        };

        match self.provider.fetch_forecast(location).await {
            Ok(snapshot) => {
                self.cache.put(&snapshot);
                self.cache.set_last_viewed(&snapshot);
                let saved = self.locations.upsert(location);
                self.state.update(|s| s.saved_locations = saved);
                self.apply(generation, |s| {
                    s.current_weather = Some(snapshot);
                    s.is_loading = false;
                });
                FetchOutcome::Fetched
            }
            Err(e) => {
                tracing::warn!("Weather fetch failed for {}: {}", location.name, e);
                let shown = self.apply(generation, |s| {
                    s.error = Some(FETCH_FAILED_MESSAGE.to_string());
                    s.is_loading = false;
                    if s.current_weather.is_none() {
                        s.current_weather = stale;
                    }
                });
                // The notification always accompanies the error flag
                if shown {
                    self.notify(Notification::FetchFailed {
                        title: "Error fetching weather data".to_string(),
                        description: e.user_message().to_string(),
                    });
                }
                FetchOutcome::Failed
            }
        }
    }

    /// Apply a display update only if no newer request has started since `generation`.
    /// Returns whether the update was applied.
    fn apply(&self, generation: u64, f: impl FnOnce(&mut WeatherState)) -> bool {
        self.state.update(|s| {
            if self.generation.load(Ordering::SeqCst) == generation {
                f(s);
                true
            } else {
                tracing::debug!("Discarding result of superseded request {}", generation);
                false
            }
        })
    }

    fn notify(&self, notification: Notification) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::storage::MemoryStore;

    fn offline_orchestrator() -> WeatherOrchestrator {
        let mut config = Config::default();
        // Nothing listens here; any provider call fails fast
        config.weather.forecast_url = "http://127.0.0.1:9/v1/forecast".to_string();
        config.weather.request_timeout_secs = 1;
        WeatherOrchestrator::from_config(&config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_with_nothing_displayed() {
        let orchestrator = offline_orchestrator();
        assert_eq!(orchestrator.refresh_weather().await, None);
    }

    #[tokio::test]
    async fn test_add_and_toggle_update_state() {
        let orchestrator = offline_orchestrator();
        let berlin = Location::new("Berlin", 52.52, 13.41);

        orchestrator.add_location(&berlin);
        orchestrator.add_location(&berlin);
        assert_eq!(orchestrator.state().saved_locations(), vec![berlin.clone()]);

        orchestrator.toggle_favorite(&berlin.id);
        assert!(orchestrator.state().saved_locations()[0].favorite);
    }

    #[tokio::test]
    async fn test_failed_fetch_sets_error_and_notifies() {
        let (tx, rx) = std::sync::mpsc::channel();
        let orchestrator = offline_orchestrator().with_notifier(tx);
        let berlin = Location::new("Berlin", 52.52, 13.41);

        let outcome = orchestrator.fetch_weather(&berlin).await;

        assert_eq!(outcome, FetchOutcome::Failed);
        let state = orchestrator.state().snapshot();
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(!state.is_loading);
        assert!(state.current_weather.is_none());
        assert!(state.saved_locations.is_empty());
        assert!(matches!(rx.try_recv(), Ok(Notification::FetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_remove_last_displayed_location_clears_display() {
        let orchestrator = offline_orchestrator();
        let berlin = Location::new("Berlin", 52.52, 13.41);
        orchestrator.add_location(&berlin);
        orchestrator.state.update(|s| {
            s.current_weather = Some(WeatherSnapshot {
                location: berlin.clone(),
                current: crate::types::CurrentConditions {
                    time: Utc::now().fixed_offset(),
                    temperature: 20.0,
                    weather_code: 0,
                    wind_speed: 3.0,
                    wind_direction: 0.0,
                    humidity: None,
                    apparent_temperature: None,
                    precipitation: None,
                    pressure: None,
                    uv_index: None,
                },
                daily: vec![],
                hourly: vec![],
                alerts: vec![],
                last_updated: Utc::now(),
            })
        });

        orchestrator.remove_location(&berlin.id).await;

        let state = orchestrator.state().snapshot();
        assert!(state.saved_locations.is_empty());
        assert!(state.current_weather.is_none());
    }
}
