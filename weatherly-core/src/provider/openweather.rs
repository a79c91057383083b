use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    Config,
    config::{DEFAULT_API_BASE_URL, DEFAULT_GEO_BASE_URL},
    error::{Result, WeatherError},
    model::{
        Coord, CurrentConditions, Forecast, ForecastEntry, GeoSuggestion, LocationReference, Wind,
    },
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    api_base_url: String,
    geo_base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Self::with_endpoints(api_key, DEFAULT_API_BASE_URL, DEFAULT_GEO_BASE_URL, timeout)
    }

    /// Point the provider at custom base URLs (proxies, mock servers).
    pub fn with_endpoints(
        api_key: String,
        api_base_url: &str,
        geo_base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::NetworkFailure(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            geo_base_url: geo_base_url.trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?;
        Self::with_endpoints(
            api_key.to_owned(),
            &config.api_base_url,
            &config.geo_base_url,
            config.timeout(),
        )
        .context("Failed to set up the OpenWeather client")
    }

    async fn get(
        &self,
        url: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> std::result::Result<(StatusCode, String), reqwest::Error> {
        params.push(("appid", self.api_key.clone()));

        let res = self.http.get(url).query(&params).send().await?;
        let status = res.status();
        let body = res.text().await?;
        Ok((status, body))
    }

    fn transport_error(&self, err: reqwest::Error, map: fn(String) -> WeatherError) -> WeatherError {
        if err.is_timeout() {
            WeatherError::Timeout(self.timeout)
        } else {
            map(err.to_string())
        }
    }
}

/// Query parameters selecting a location on the weather endpoints.
fn location_params(location: &LocationReference) -> Vec<(&'static str, String)> {
    let mut params = match location {
        LocationReference::Name(name) => vec![("q", name.clone())],
        LocationReference::Qualified {
            name,
            country,
            state,
        } => {
            let q = match state {
                Some(state) => format!("{name},{state},{country}"),
                None => format!("{name},{country}"),
            };
            vec![("q", q)]
        }
        LocationReference::Coordinates { coord, .. } => {
            vec![("lat", coord.lat.to_string()), ("lon", coord.lon.to_string())]
        }
        LocationReference::Id(id) => vec![("id", id.to_string())],
    };
    params.push(("units", "metric".to_string()));
    params
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

impl From<OwWind> for Wind {
    fn from(w: OwWind) -> Self {
        Wind {
            speed: w.speed,
            deg: w.deg.round().rem_euclid(360.0) as u16,
            gust: w.gust,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    id: Option<u64>,
    name: String,
    coord: OwCoord,
    weather: Vec<OwWeather>,
    main: OwMain,
    visibility: Option<u32>,
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    dt: i64,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

/// Icon and description of the first weather element, if any.
fn primary_weather(weather: &[OwWeather]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.icon.clone(), w.description.clone()))
        .unwrap_or_else(|| (String::new(), "Unknown".to_string()))
}

impl From<OwCurrentResponse> for CurrentConditions {
    fn from(parsed: OwCurrentResponse) -> Self {
        let (icon, description) = primary_weather(&parsed.weather);

        CurrentConditions {
            city_id: parsed.id.filter(|id| *id != 0),
            name: parsed.name,
            country: parsed.sys.country,
            coord: Coord {
                lat: parsed.coord.lat,
                lon: parsed.coord.lon,
            },
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            temp_min_c: parsed.main.temp_min,
            temp_max_c: parsed.main.temp_max,
            humidity_pct: parsed.main.humidity,
            pressure_hpa: parsed.main.pressure,
            visibility_m: parsed.visibility,
            wind: parsed.wind.into(),
            clouds_pct: parsed.clouds.all,
            sunrise: unix_to_utc(parsed.sys.sunrise).unwrap_or_default(),
            sunset: unix_to_utc(parsed.sys.sunset).unwrap_or_default(),
            observation_time: unix_to_utc(parsed.dt).unwrap_or_else(Utc::now),
            timezone_offset: parsed.timezone,
            icon,
            description,
        }
    }
}

impl From<OwForecastEntry> for ForecastEntry {
    fn from(entry: OwForecastEntry) -> Self {
        let (icon, description) = primary_weather(&entry.weather);

        ForecastEntry {
            time: unix_to_utc(entry.dt).unwrap_or_else(Utc::now),
            temperature_c: entry.main.temp,
            temp_min_c: entry.main.temp_min,
            temp_max_c: entry.main.temp_max,
            humidity_pct: entry.main.humidity,
            pressure_hpa: entry.main.pressure,
            wind_speed_mps: entry.wind.speed,
            icon,
            description,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_current(&self, location: &LocationReference) -> Result<CurrentConditions> {
        let url = format!("{}/weather", self.api_base_url);
        tracing::debug!(%location, "requesting current conditions");

        let (status, body) = self
            .get(&url, location_params(location))
            .await
            .map_err(|e| {
                self.transport_error(e, |msg| {
                    WeatherError::NetworkFailure(format!(
                        "failed to reach OpenWeather (current weather): {msg}"
                    ))
                })
            })?;

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }
        if !status.is_success() {
            return Err(WeatherError::NetworkFailure(format!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::NetworkFailure(format!("failed to parse OpenWeather current JSON: {e}"))
        })?;

        Ok(parsed.into())
    }

    async fn fetch_forecast(&self, location: &LocationReference) -> Result<Forecast> {
        let url = format!("{}/forecast", self.api_base_url);
        tracing::debug!(%location, "requesting 5-day forecast");

        let (status, body) = self
            .get(&url, location_params(location))
            .await
            .map_err(|e| self.transport_error(e, WeatherError::ForecastUnavailable))?;

        if !status.is_success() {
            return Err(WeatherError::ForecastUnavailable(format!(
                "OpenWeather forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OwForecastResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::ForecastUnavailable(format!(
                "failed to parse OpenWeather forecast JSON: {e}"
            ))
        })?;

        Ok(Forecast {
            city_name: parsed.city.name,
            country: parsed.city.country,
            timezone_offset: parsed.city.timezone,
            entries: parsed.list.into_iter().map(ForecastEntry::from).collect(),
        })
    }

    async fn search_locations(&self, term: &str, limit: u8) -> Result<Vec<GeoSuggestion>> {
        let url = format!("{}/direct", self.geo_base_url);
        tracing::debug!(term, limit, "requesting location suggestions");

        let params = vec![("q", term.to_string()), ("limit", limit.to_string())];
        let (status, body) = self.get(&url, params).await.map_err(|e| {
            self.transport_error(e, |msg| {
                WeatherError::NetworkFailure(format!("failed to reach OpenWeather geocoding: {msg}"))
            })
        })?;

        if !status.is_success() {
            return Err(WeatherError::NetworkFailure(format!(
                "OpenWeather geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: Vec<OwGeoEntry> = serde_json::from_str(&body).map_err(|e| {
            WeatherError::NetworkFailure(format!("failed to parse OpenWeather geocoding JSON: {e}"))
        })?;

        Ok(parsed
            .into_iter()
            .map(|g| GeoSuggestion {
                name: g.name,
                state: g.state.filter(|s| !s.is_empty()),
                country: g.country,
                coord: Coord {
                    lat: g.lat,
                    lon: g.lon,
                },
            })
            .collect())
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
