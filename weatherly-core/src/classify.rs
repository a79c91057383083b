//! Weather icon code classification.
//!
//! Icon codes look like `"10d"`: two digits for the condition family and a
//! trailing `d`/`n` for day or night.
//! See: https://openweathermap.org/weather-conditions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainIntensity {
    Light,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    Clear,
    Clouds,
    Rain(RainIntensity),
    Thunderstorm,
    Snow,
    Fog,
    /// Unrecognised code; themed like clear sky.
    Unknown,
}

impl WeatherCategory {
    /// Map the two-digit condition prefix of an icon code.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "01" => Self::Clear,
            "02" | "03" | "04" => Self::Clouds,
            "09" => Self::Rain(RainIntensity::Heavy),
            "10" => Self::Rain(RainIntensity::Light),
            "11" => Self::Thunderstorm,
            "13" => Self::Snow,
            "50" => Self::Fog,
            _ => Self::Unknown,
        }
    }

    pub fn is_stormy(&self) -> bool {
        matches!(self, Self::Rain(_) | Self::Thunderstorm)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Cloudy",
            Self::Rain(RainIntensity::Light) => "Rain",
            Self::Rain(RainIntensity::Heavy) => "Heavy Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Fog => "Fog",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: WeatherCategory,
    pub is_daytime: bool,
}

impl Classification {
    pub const CLEAR_DAY: Self = Self {
        category: WeatherCategory::Clear,
        is_daytime: true,
    };
}

/// Classify an icon code. Never fails: anything unrecognised is `Unknown`.
pub fn classify(icon: &str) -> Classification {
    let prefix = icon.get(..2).unwrap_or_default();

    Classification {
        category: WeatherCategory::from_prefix(prefix),
        is_daytime: icon.contains('d'),
    }
}
