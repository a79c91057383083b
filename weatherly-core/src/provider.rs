use crate::{
    Config,
    error::Result,
    model::{CurrentConditions, Forecast, GeoSuggestion, LocationReference},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Source of current conditions, forecasts and location suggestions.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, location: &LocationReference) -> Result<CurrentConditions>;

    async fn fetch_forecast(&self, location: &LocationReference) -> Result<Forecast>;

    /// Geocoding candidates for a partially typed city name.
    async fn search_locations(&self, term: &str, limit: u8) -> Result<Vec<GeoSuggestion>>;
}

/// Construct the configured provider.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    Ok(Box::new(OpenWeatherProvider::from_config(config)?))
}
