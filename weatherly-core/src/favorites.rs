use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherError};
use crate::model::{Coord, LocationReference};
use crate::storage::{FAVORITES_KEY, KeyValueStore};

/// A saved location shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coord>,
}

impl FavoriteCity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            coord: None,
        }
    }

    pub fn with_id(mut self, id: Option<u64>) -> Self {
        self.id = id;
        self
    }

    pub fn with_coord(mut self, coord: Option<Coord>) -> Self {
        self.coord = coord;
        self
    }

    /// Same name ignoring case, or same identifier when both have one.
    pub fn is_same_city(&self, other: &FavoriteCity) -> bool {
        names_match(&self.name, &other.name)
            || matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }

    /// Best reference for looking this city up: coordinates, then id, then name.
    pub fn preferred_reference(&self) -> LocationReference {
        if let Some(coord) = self.coord {
            LocationReference::Coordinates { coord, id: self.id }
        } else if let Some(id) = self.id {
            LocationReference::Id(id)
        } else {
            self.name_reference()
        }
    }

    pub fn name_reference(&self) -> LocationReference {
        LocationReference::Name(self.name.clone())
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Identifies a favorite for removal or lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteRef {
    Id(u64),
    Name(String),
}

impl FavoriteRef {
    fn matches(&self, city: &FavoriteCity) -> bool {
        match self {
            Self::Id(id) => city.id == Some(*id),
            Self::Name(name) => names_match(&city.name, name),
        }
    }
}

impl From<&FavoriteCity> for FavoriteRef {
    fn from(city: &FavoriteCity) -> Self {
        match city.id {
            Some(id) => Self::Id(id),
            None => Self::Name(city.name.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Nothing changed; `index` points at the existing entry.
    AlreadyExists { index: usize },
}

/// Ordered favorites list, most recently added first.
#[derive(Debug, Clone)]
pub struct FavoritesStore<S> {
    storage: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Result<Vec<FavoriteCity>> {
        let Some(raw) = self.storage.read(FAVORITES_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|err| WeatherError::storage(format!("favorites record is corrupt: {err}")))
    }

    pub fn add(&self, city: FavoriteCity) -> Result<AddOutcome> {
        let name = city.name.trim().to_string();
        if name.is_empty() {
            return Err(WeatherError::invalid_input("Favorite city needs a name"));
        }
        let city = FavoriteCity { name, ..city };

        let mut favorites = self.list()?;
        if let Some(index) = favorites.iter().position(|fav| fav.is_same_city(&city)) {
            tracing::debug!(name = %city.name, index, "favorite already present");
            return Ok(AddOutcome::AlreadyExists { index });
        }

        favorites.insert(0, city);
        self.persist(&favorites)?;
        Ok(AddOutcome::Added)
    }

    /// Remove every entry matching `target`; returns how many were removed.
    pub fn remove(&self, target: &FavoriteRef) -> Result<usize> {
        let mut favorites = self.list()?;
        let before = favorites.len();
        favorites.retain(|fav| !target.matches(fav));

        let removed = before - favorites.len();
        if removed > 0 {
            self.persist(&favorites)?;
        }
        Ok(removed)
    }

    pub fn find(&self, target: &FavoriteRef) -> Result<Option<(usize, FavoriteCity)>> {
        Ok(self
            .list()?
            .into_iter()
            .enumerate()
            .find(|(_, fav)| target.matches(fav)))
    }

    fn persist(&self, favorites: &[FavoriteCity]) -> Result<()> {
        let raw = serde_json::to_string(favorites)
            .map_err(|err| WeatherError::storage(format!("failed to encode favorites: {err}")))?;
        self.storage.write(FAVORITES_KEY, &raw)
    }
}
