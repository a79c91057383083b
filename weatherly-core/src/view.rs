//! Plain data handed to a presentation layer.

use serde::{Deserialize, Serialize};

use crate::classify::{Classification, classify};
use crate::model::{CurrentConditions, ForecastEntry};
use crate::preferences::ThemePreferences;
use crate::query::WeatherReport;
use crate::scene::Scene;

/// CSS custom properties derived from the theme preferences, in a fixed
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeVariables(pub Vec<(String, String)>);

impl ThemeVariables {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<&ThemePreferences> for ThemeVariables {
    fn from(prefs: &ThemePreferences) -> Self {
        let vars = [
            ("--primary-color", prefs.primary_color.to_string()),
            ("--secondary-color", prefs.secondary_color.to_string()),
            ("--background-color", prefs.background_color.to_string()),
            ("--accent-color", prefs.accent_color.to_string()),
            ("--font-size", prefs.font_size.to_string()),
            ("--border-radius", prefs.border_radius.to_string()),
        ];
        Self(vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub label: String,
    pub current: CurrentConditions,
    /// At most five midday samples, one per day.
    pub daily: Vec<ForecastEntry>,
    pub classification: Classification,
    pub scene: Scene,
    pub theme: ThemeVariables,
}

impl RenderModel {
    pub fn new(report: &WeatherReport, scene: Scene, prefs: &ThemePreferences) -> Self {
        Self {
            label: report.label(),
            current: report.current.clone(),
            daily: report.forecast.daily(),
            classification: classify(&report.current.icon),
            scene,
            theme: prefs.into(),
        }
    }
}
