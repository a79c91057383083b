//! The weather query pipeline.
//!
//! A [`QueryContext`] is created per search and passed by value; nothing about
//! the last search is kept in shared state. Current conditions are always
//! fetched before the forecast, and a failure anywhere aborts the whole query.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::favorites::FavoriteCity;
use crate::model::{CurrentConditions, Forecast, GeoSuggestion, LocationReference};
use crate::provider::WeatherProvider;

/// Autocomplete terms shorter than this are not sent to the provider.
pub const MIN_SUGGESTION_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub location: LocationReference,
    /// What the user typed or picked, kept for display and favorites.
    pub label: Option<String>,
}

impl QueryContext {
    pub fn new(location: LocationReference) -> Self {
        Self {
            location,
            label: None,
        }
    }

    pub fn labelled(location: LocationReference, label: impl Into<String>) -> Self {
        Self {
            location,
            label: Some(label.into()),
        }
    }

    /// Free-text search; validates the input.
    pub fn from_input(input: &str) -> Result<Self> {
        let location = LocationReference::name(input)?;
        let label = location.to_string();
        Ok(Self::labelled(location, label))
    }

    pub fn from_suggestion(suggestion: &GeoSuggestion) -> Self {
        Self::labelled(suggestion.to_reference(), suggestion.label())
    }

    /// Favorite entry built from this query. A plain name search saves only
    /// the name; coordinates and the learned identifier are kept only when
    /// the query itself was by coordinates.
    pub fn to_favorite(&self, current: &CurrentConditions) -> FavoriteCity {
        let name = self
            .label
            .clone()
            .unwrap_or_else(|| current.location_label());
        let coord = self.location.coord();
        let id = match coord {
            Some(_) => self.location.identifier().or(current.city_id),
            None => self.location.identifier(),
        };
        FavoriteCity::named(name).with_id(id).with_coord(coord)
    }
}

/// Combined result of a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// The context that produced the report, with the location identifier
    /// backfilled where the response provided one.
    pub context: QueryContext,
    pub current: CurrentConditions,
    pub forecast: Forecast,
}

impl WeatherReport {
    pub fn label(&self) -> String {
        self.current.location_label()
    }
}

/// Fetch current conditions, then the forecast for the same location.
pub async fn fetch_weather(
    provider: &dyn WeatherProvider,
    context: QueryContext,
) -> Result<WeatherReport> {
    let current = provider.fetch_current(&context.location).await?;

    let context = QueryContext {
        location: context.location.with_identifier(current.city_id),
        ..context
    };

    let forecast = provider.fetch_forecast(&context.location).await?;

    tracing::debug!(
        location = %context.location,
        entries = forecast.entries.len(),
        "weather query complete"
    );

    Ok(WeatherReport {
        context,
        current,
        forecast,
    })
}

/// Look up a favorite by its most precise reference. A failed identifier
/// lookup is retried once by name.
pub async fn fetch_favorite(
    provider: &dyn WeatherProvider,
    favorite: &FavoriteCity,
) -> Result<WeatherReport> {
    let reference = favorite.preferred_reference();
    let by_id = matches!(reference, LocationReference::Id(_));
    let context = QueryContext::labelled(reference, favorite.name.clone());

    match fetch_weather(provider, context).await {
        Err(err) if by_id => {
            tracing::warn!(
                name = %favorite.name,
                error = %err,
                "lookup by city id failed, retrying by name"
            );
            let context = QueryContext::labelled(favorite.name_reference(), favorite.name.clone());
            fetch_weather(provider, context).await
        }
        result => result,
    }
}

/// Handle for one dispatched suggestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Orders autocomplete requests so a slow, older response can never
/// replace the results of a newer one.
#[derive(Debug, Default)]
pub struct SuggestionTracker {
    latest: AtomicU64,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns `None` when a newer request was issued while this one ran.
    /// Provider failures degrade to an empty list.
    pub async fn suggest(
        &self,
        provider: &dyn WeatherProvider,
        term: &str,
        limit: u8,
    ) -> Option<Vec<GeoSuggestion>> {
        let ticket = self.issue();
        let term = term.trim();

        let suggestions = if term.chars().count() < MIN_SUGGESTION_CHARS {
            Vec::new()
        } else {
            provider
                .search_locations(term, limit)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(term, error = %err, "failed to fetch city suggestions");
                    Vec::new()
                })
        };

        if self.is_current(ticket) {
            Some(suggestions)
        } else {
            tracing::debug!(term, "discarding stale suggestions");
            None
        }
    }
}
