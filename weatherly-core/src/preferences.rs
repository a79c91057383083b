use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherError};
use crate::storage::{KeyValueStore, THEME_KEY};

/// Percentage the secondary colour is blended toward white.
pub const SECONDARY_LIGHTEN_PCT: u8 = 20;

/// `#rrggbb` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend each channel `percent`% of the way toward white, rounding down.
    pub fn lighten(self, percent: u8) -> Self {
        let pct = u16::from(percent.min(100));
        let channel = |c: u8| {
            let c = u16::from(c);
            // Bounded by 255 since pct <= 100.
            (c + (255 - c) * pct / 100) as u8
        };
        Self::rgb(channel(self.r), channel(self.g), channel(self.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WeatherError::invalid_input(format!("'{s}' is not a #rrggbb colour"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = WeatherError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// CSS pixel length such as `16px`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pixels(pub u16);

impl fmt::Display for Pixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl FromStr for Pixels {
    type Err = WeatherError;

    /// Reads the leading integer and ignores the rest, so `16.5px` is 16.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        s[..end]
            .parse()
            .map(Pixels)
            .map_err(|_| WeatherError::invalid_input(format!("'{s}' is not a pixel length")))
    }
}

impl TryFrom<String> for Pixels {
    type Error = WeatherError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Pixels> for String {
    fn from(px: Pixels) -> Self {
        px.to_string()
    }
}

/// User-customisable visual styling. Fields missing from a stored record,
/// or holding a value that does not parse, take their default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredTheme")]
pub struct ThemePreferences {
    pub primary_color: Color,
    /// Cached `primary_color.lighten(20)`, except for the stock defaults.
    pub secondary_color: Color,
    pub background_color: Color,
    pub accent_color: Color,
    pub font_size: Pixels,
    pub border_radius: Pixels,
}

impl Default for ThemePreferences {
    fn default() -> Self {
        Self {
            primary_color: Color::rgb(0x1e, 0x88, 0xe5),
            secondary_color: Color::rgb(0x64, 0xb5, 0xf6),
            background_color: Color::rgb(0x0a, 0x19, 0x29),
            accent_color: Color::rgb(0xff, 0x98, 0x00),
            font_size: Pixels(16),
            border_radius: Pixels(12),
        }
    }
}

/// Raw shape of the theme record. Values stay untyped so one bad field
/// cannot reject the others.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredTheme {
    primary_color: Option<serde_json::Value>,
    secondary_color: Option<serde_json::Value>,
    background_color: Option<serde_json::Value>,
    accent_color: Option<serde_json::Value>,
    font_size: Option<serde_json::Value>,
    border_radius: Option<serde_json::Value>,
}

fn stored_or<T: FromStr>(name: &str, value: Option<serde_json::Value>, fallback: T) -> T {
    let Some(value) = value else {
        return fallback;
    };
    match value.as_str().map(str::parse) {
        Some(Ok(parsed)) => parsed,
        _ => {
            tracing::warn!(field = name, %value, "ignoring invalid theme value");
            fallback
        }
    }
}

impl From<StoredTheme> for ThemePreferences {
    fn from(raw: StoredTheme) -> Self {
        let d = ThemePreferences::default();
        Self {
            primary_color: stored_or("primaryColor", raw.primary_color, d.primary_color),
            secondary_color: stored_or("secondaryColor", raw.secondary_color, d.secondary_color),
            background_color: stored_or(
                "backgroundColor",
                raw.background_color,
                d.background_color,
            ),
            accent_color: stored_or("accentColor", raw.accent_color, d.accent_color),
            font_size: stored_or("fontSize", raw.font_size, d.font_size),
            border_radius: stored_or("borderRadius", raw.border_radius, d.border_radius),
        }
    }
}

/// A single preference control change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceChange {
    Primary(Color),
    Accent(Color),
    Background(Color),
    FontSize(Pixels),
    BorderRadius(Pixels),
}

impl ThemePreferences {
    /// Set the primary colour and re-derive the secondary one.
    pub fn with_primary(mut self, primary: Color) -> Self {
        self.primary_color = primary;
        self.secondary_color = primary.lighten(SECONDARY_LIGHTEN_PCT);
        self
    }

    pub fn apply(self, change: PreferenceChange) -> Self {
        match change {
            PreferenceChange::Primary(c) => self.with_primary(c),
            PreferenceChange::Accent(c) => Self {
                accent_color: c,
                ..self
            },
            PreferenceChange::Background(c) => Self {
                background_color: c,
                ..self
            },
            PreferenceChange::FontSize(px) => Self {
                font_size: px,
                ..self
            },
            PreferenceChange::BorderRadius(px) => Self {
                border_radius: px,
                ..self
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreferencesStore<S> {
    storage: S,
}

impl<S: KeyValueStore> PreferencesStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Result<ThemePreferences> {
        match self.storage.read(THEME_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| WeatherError::storage(format!("theme record is corrupt: {err}"))),
            None => Ok(ThemePreferences::default()),
        }
    }

    pub fn save(&self, prefs: &ThemePreferences) -> Result<()> {
        let raw = serde_json::to_string(prefs)
            .map_err(|err| WeatherError::storage(format!("failed to encode theme: {err}")))?;
        self.storage.write(THEME_KEY, &raw)
    }

    pub fn reset_to_default(&self) -> Result<ThemePreferences> {
        let defaults = ThemePreferences::default();
        self.save(&defaults)?;
        Ok(defaults)
    }

    /// Load, apply one change and persist immediately.
    pub fn update(&self, change: PreferenceChange) -> Result<ThemePreferences> {
        let prefs = self.load()?.apply(change);
        self.save(&prefs)?;
        Ok(prefs)
    }
}
