//! Debounced location search.
//!
//! Each `submit` records itself as the active query, sleeps for the debounce
//! window and only proceeds if nothing newer arrived meanwhile. Results are
//! applied only while their originating query is still the active one, so a
//! slow response can never overwrite a newer search.

use parking_lot::Mutex;
use skycast_core::SearchConfig;
use std::time::Duration;

use crate::geocode::GeocodingClient;
use crate::location::favorites_first;
use crate::normalize::classify_query;
use crate::types::{Location, WeatherResult};

/// What the location picker should list
#[derive(Debug, Clone, PartialEq)]
pub enum SearchView {
    /// Query too short: saved locations, favorites first
    Saved(Vec<Location>),
    /// Live geocoding results for the active query
    Results(Vec<Location>),
}

#[derive(Debug, Default)]
struct SearchState {
    active_query: String,
    generation: u64,
    results: Vec<Location>,
    searching: bool,
}

pub struct SearchCoordinator {
    client: GeocodingClient,
    debounce: Duration,
    min_query_len: usize,
    state: Mutex<SearchState>,
}

impl SearchCoordinator {
    pub fn new(client: GeocodingClient, debounce: Duration, min_query_len: usize) -> Self {
        Self {
            client,
            debounce,
            min_query_len,
            state: Mutex::new(SearchState::default()),
        }
    }

    pub fn from_config(config: &SearchConfig) -> WeatherResult<Self> {
        Ok(Self::new(
            GeocodingClient::from_config(config)?,
            Duration::from_millis(config.debounce_ms),
            config.min_query_len,
        ))
    }

    /// Submit the current text of the search box.
    ///
    /// Returns `None` when this call was superseded by a newer one, either
    /// during the debounce window or while the request was in flight.
    pub async fn submit(&self, query: &str) -> Option<Vec<Location>> {
        let generation = {
            let mut state = self.state.lock();
            state.active_query = query.to_string();
            state.generation += 1;
            state.generation
        };

        tokio::time::sleep(self.debounce).await;

        let trimmed = query.trim();
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                tracing::debug!("Search '{}' superseded during debounce", query);
                return None;
            }
            if self.is_short(trimmed) {
                state.results.clear();
                state.searching = false;
                return Some(Vec::new());
            }
            state.searching = true;
        }

        let results = match self.client.search(&classify_query(trimmed)).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Location search failed for '{}': {}", trimmed, e);
                Vec::new()
            }
        };

        let mut state = self.state.lock();
        // Only the newest call owns the in-flight flag
        if state.generation == generation {
            state.searching = false;
        }
        if state.active_query != query {
            tracing::debug!("Discarding results for stale search '{}'", query);
            return None;
        }
        state.results = results.clone();
        Some(results)
    }

    /// Results of the most recently applied search
    pub fn results(&self) -> Vec<Location> {
        self.state.lock().results.clone()
    }

    /// True while a geocoding request for the newest query is in flight
    pub fn is_searching(&self) -> bool {
        self.state.lock().searching
    }

    /// Saved locations while the query is too short, live results otherwise
    pub fn view(&self, saved: &[Location]) -> SearchView {
        let state = self.state.lock();
        if self.is_short(state.active_query.trim()) {
            SearchView::Saved(favorites_first(saved))
        } else {
            SearchView::Results(state.results.clone())
        }
    }

    fn is_short(&self, trimmed: &str) -> bool {
        trimmed.chars().count() < self.min_query_len
    }
}
