//! Core library for the `weatherly` weather lookup tool.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather provider abstraction and the query pipeline
//! - Icon code classification and the weather scene engine
//! - Favorites and theme preferences on local storage
//!
//! It is used by `weatherly-cli`, but contains no presentation code and can
//! back any other front end through [`view::RenderModel`] and
//! [`scene::SceneRenderer`].

pub mod classify;
pub mod config;
pub mod error;
pub mod favorites;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod query;
pub mod scene;
pub mod storage;
pub mod view;

pub use classify::{Classification, RainIntensity, WeatherCategory, classify};
pub use config::Config;
pub use error::WeatherError;
pub use favorites::{AddOutcome, FavoriteCity, FavoriteRef, FavoritesStore};
pub use model::{Coord, CurrentConditions, Forecast, ForecastEntry, GeoSuggestion, LocationReference};
pub use preferences::{Color, Pixels, PreferenceChange, PreferencesStore, ThemePreferences};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use query::{QueryContext, SuggestionTracker, WeatherReport, fetch_favorite, fetch_weather};
pub use scene::{CloudMotion, Scene, SceneRenderer, ThemeEngine};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use view::RenderModel;
