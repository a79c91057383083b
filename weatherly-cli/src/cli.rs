use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use weatherly_core::{
    AddOutcome, CloudMotion, Color, Config, FavoriteCity, FavoriteRef, FavoritesStore, FileStore,
    LocationReference, Pixels, PreferenceChange, PreferencesStore, QueryContext, RenderModel,
    SuggestionTracker, ThemeEngine, ThemePreferences, WeatherProvider, WeatherReport,
    fetch_favorite, fetch_weather, provider::provider_from_config, view::ThemeVariables,
};

use crate::output::{self, TerminalRenderer};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherly", version, about = "Weather lookup with favorites and themes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key and display options.
    Configure,

    /// Show current weather and the 5-day forecast.
    Show {
        #[command(flatten)]
        location: LocationArgs,

        /// Use the Nth autocomplete suggestion for CITY (1-based).
        #[arg(long, requires = "city")]
        pick: Option<usize>,

        /// Add the location to favorites after a successful lookup.
        #[arg(long)]
        save: bool,

        /// Print the render model as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List city suggestions for a partial name.
    Suggest {
        term: String,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Inspect or change theme preferences.
    Theme {
        #[command(subcommand)]
        action: ThemeCommand,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// City name, e.g. "London" or "Paris, FR".
    pub city: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true, conflicts_with = "city")]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Provider city identifier.
    #[arg(long, conflicts_with_all = ["city", "lat"])]
    pub id: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    List,

    /// Add a city by name, optionally with coordinates or an identifier.
    Add {
        name: String,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(long)]
        id: Option<u64>,
    },

    /// Remove a favorite by name or identifier.
    Remove {
        #[arg(required_unless_present = "id")]
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        id: Option<u64>,
    },

    /// Show weather for a saved favorite.
    Show {
        name: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ThemeCommand {
    Show,

    /// Change one or more preferences.
    Set {
        /// Primary colour (#rrggbb); the secondary colour is derived from it.
        #[arg(long)]
        primary: Option<Color>,

        #[arg(long)]
        accent: Option<Color>,

        #[arg(long)]
        background: Option<Color>,

        /// Font size, e.g. 16 or 16px.
        #[arg(long)]
        font_size: Option<Pixels>,

        #[arg(long)]
        border_radius: Option<Pixels>,
    },

    /// Restore the default theme.
    Reset,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                location,
                pick,
                save,
                json,
            } => {
                let app = App::load()?;
                let context = app.resolve_context(location, pick).await?;
                let report = fetch_weather(app.provider()?.as_ref(), context)
                    .await
                    .map_err(user_error)?;
                if save {
                    app.save_favorite(report.context.to_favorite(&report.current))?;
                }
                app.present(&report, json)
            }
            Command::Suggest { term } => {
                let app = App::load()?;
                let provider = app.provider()?;
                let tracker = SuggestionTracker::new();
                let suggestions = tracker
                    .suggest(provider.as_ref(), &term, app.config.suggestion_limit)
                    .await
                    .unwrap_or_default();
                output::print_suggestions(&suggestions);
                Ok(())
            }
            Command::Favorites { action } => App::load()?.favorites(action).await,
            Command::Theme { action } => App::load()?.theme(action),
        }
    }
}

/// Interactive configuration, mirrors what lands in `config.toml`.
fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key);

    let motions = vec!["category", "wind"];
    let current = match config.cloud_motion {
        CloudMotion::Category => 0,
        CloudMotion::Wind => 1,
    };
    let motion = Select::new("Cloud animation speed follows:", motions)
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read cloud motion")?;
    config.cloud_motion = if motion == "wind" {
        CloudMotion::Wind
    } else {
        CloudMotion::Category
    };

    config.save()?;
    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

/// Prefix remote errors the way the search panel reports them.
fn user_error(err: weatherly_core::WeatherError) -> anyhow::Error {
    if err.is_remote() {
        anyhow!("{err}. Please try again.")
    } else {
        err.into()
    }
}

struct App {
    config: Config,
    store: FileStore,
}

impl App {
    fn load() -> anyhow::Result<Self> {
        let config = Config::load()?;
        let store = config.file_store()?;
        Ok(Self { config, store })
    }

    fn provider(&self) -> anyhow::Result<Box<dyn WeatherProvider>> {
        provider_from_config(&self.config)
    }

    fn favorites_store(&self) -> FavoritesStore<FileStore> {
        FavoritesStore::new(self.store.clone())
    }

    fn preferences_store(&self) -> PreferencesStore<FileStore> {
        PreferencesStore::new(self.store.clone())
    }

    async fn resolve_context(
        &self,
        args: LocationArgs,
        pick: Option<usize>,
    ) -> anyhow::Result<QueryContext> {
        if let Some(id) = args.id {
            return Ok(QueryContext::new(LocationReference::id(id)));
        }
        if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
            return Ok(QueryContext::new(LocationReference::coordinates(lat, lon)?));
        }

        let city = args.city.unwrap_or_default();
        let Some(pick) = pick else {
            return Ok(QueryContext::from_input(&city)?);
        };

        // Validate before spending a geocoding request.
        LocationReference::name(&city)?;
        let provider = self.provider()?;
        let suggestions = SuggestionTracker::new()
            .suggest(provider.as_ref(), &city, self.config.suggestion_limit)
            .await
            .unwrap_or_default();
        let chosen = pick
            .checked_sub(1)
            .and_then(|i| suggestions.get(i))
            .ok_or_else(|| anyhow!("No suggestion #{pick} for '{city}'"))?;

        Ok(QueryContext::from_suggestion(chosen))
    }

    /// Theme preferences for display; storage trouble must not block the
    /// weather output.
    fn display_preferences(&self) -> ThemePreferences {
        self.preferences_store().load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default theme");
            ThemePreferences::default()
        })
    }

    fn present(&self, report: &WeatherReport, json: bool) -> anyhow::Result<()> {
        let classification = weatherly_core::classify(&report.current.icon);
        let mut renderer = TerminalRenderer::default();
        let scene = ThemeEngine::new(self.config.cloud_motion).apply(
            &mut renderer,
            classification,
            report.current.wind.speed,
        );

        let model = RenderModel::new(report, scene, &self.display_preferences());
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&model).context("Failed to encode render model")?
            );
        } else {
            output::print_report(&model);
            renderer.print();
        }
        Ok(())
    }

    fn save_favorite(&self, city: FavoriteCity) -> anyhow::Result<()> {
        let name = city.name.clone();
        match self.favorites_store().add(city)? {
            AddOutcome::Added => println!("Added {name} to favorites"),
            AddOutcome::AlreadyExists { index } => {
                println!("{name} is already in favorites (#{})", index + 1)
            }
        }
        Ok(())
    }

    async fn favorites(&self, action: FavoritesCommand) -> anyhow::Result<()> {
        let store = self.favorites_store();

        match action {
            FavoritesCommand::List => output::print_favorites(&store.list()?),
            FavoritesCommand::Add { name, lat, lon, id } => {
                LocationReference::name(&name)?;
                let coord = match (lat, lon) {
                    (Some(lat), Some(lon)) => LocationReference::coordinates(lat, lon)?.coord(),
                    _ => None,
                };
                self.save_favorite(FavoriteCity::named(name.trim()).with_id(id).with_coord(coord))?;
            }
            FavoritesCommand::Remove { name, id } => {
                let target = match (id, name) {
                    (Some(id), _) => FavoriteRef::Id(id),
                    (None, Some(name)) => FavoriteRef::Name(name.trim().to_string()),
                    (None, None) => bail!("Give a favorite name or --id"),
                };
                match store.remove(&target)? {
                    0 => println!("No matching favorite"),
                    n => println!("Removed {n} favorite(s)"),
                }
            }
            FavoritesCommand::Show { name, json } => {
                let (_, favorite) = store
                    .find(&FavoriteRef::Name(name.trim().to_string()))?
                    .ok_or_else(|| anyhow!("'{name}' is not in favorites"))?;
                let report = fetch_favorite(self.provider()?.as_ref(), &favorite)
                    .await
                    .map_err(user_error)?;
                self.present(&report, json)?;
            }
        }
        Ok(())
    }

    fn theme(&self, action: ThemeCommand) -> anyhow::Result<()> {
        let store = self.preferences_store();

        let prefs = match action {
            ThemeCommand::Show => store.load()?,
            ThemeCommand::Reset => store.reset_to_default()?,
            ThemeCommand::Set {
                primary,
                accent,
                background,
                font_size,
                border_radius,
            } => {
                let changes: Vec<PreferenceChange> = [
                    primary.map(PreferenceChange::Primary),
                    accent.map(PreferenceChange::Accent),
                    background.map(PreferenceChange::Background),
                    font_size.map(PreferenceChange::FontSize),
                    border_radius.map(PreferenceChange::BorderRadius),
                ]
                .into_iter()
                .flatten()
                .collect();
                if changes.is_empty() {
                    bail!("Nothing to change; pass at least one preference flag");
                }

                let prefs = changes
                    .into_iter()
                    .fold(store.load()?, ThemePreferences::apply);
                store.save(&prefs)?;
                prefs
            }
        };

        output::print_theme(&ThemeVariables::from(&prefs));
        Ok(())
    }
}
