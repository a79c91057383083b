//! Weather theme and particle animation engine.
//!
//! The engine turns a [`Classification`] into a [`Scene`]: a theme class,
//! overlay opacities, the background cloud cycle and a list of particle
//! layers with per-particle randomised timing. A [`SceneRenderer`] paints it.
//! Rendering problems never reach the caller; the engine falls back to a
//! plain clear-day scene instead.

use rand::Rng;
use rand::distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, RainIntensity, WeatherCategory};
use crate::error::{Result, WeatherError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeClass {
    ClearDay,
    ClearNight,
    Rainy,
    Snowy,
    Thunder,
    Fog,
}

impl ThemeClass {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::ClearDay => "weather-clear-day",
            Self::ClearNight => "weather-clear-night",
            Self::Rainy => "weather-rainy",
            Self::Snowy => "weather-snowy",
            Self::Thunder => "weather-thunder",
            Self::Fog => "weather-fog",
        }
    }

    pub fn for_classification(c: Classification) -> Self {
        match c.category {
            WeatherCategory::Rain(_) => Self::Rainy,
            WeatherCategory::Thunderstorm => Self::Thunder,
            WeatherCategory::Snow => Self::Snowy,
            WeatherCategory::Fog => Self::Fog,
            WeatherCategory::Clear | WeatherCategory::Clouds | WeatherCategory::Unknown => {
                if c.is_daytime {
                    Self::ClearDay
                } else {
                    Self::ClearNight
                }
            }
        }
    }
}

/// Opacities of the shared background elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overlays {
    pub clouds: f64,
    pub stars: f64,
    /// `None` when the sun-ray layer is hidden.
    pub sun_rays: Option<f64>,
}

impl Overlays {
    pub const BASELINE: Self = Self {
        clouds: 0.5,
        stars: 0.3,
        sun_rays: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Rain,
    Snow,
    Fog,
    Lightning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub left_pct: f64,
    pub top_pct: f64,
    /// Drop height or flake diameter; `None` for full-width elements.
    pub size_px: Option<f64>,
    /// `None` leaves the renderer's default animation length.
    pub duration_secs: Option<f64>,
    pub delay_secs: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleLayer {
    pub kind: LayerKind,
    pub particles: Vec<Particle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub theme: ThemeClass,
    pub overlays: Overlays,
    pub cloud_cycle_secs: f64,
    pub layers: Vec<ParticleLayer>,
}

impl Scene {
    fn baseline(theme: ThemeClass) -> Self {
        Self {
            theme,
            overlays: Overlays::BASELINE,
            cloud_cycle_secs: CALM_CLOUD_CYCLE_SECS,
            layers: Vec::new(),
        }
    }

    /// Applied when the real scene could not be rendered.
    pub fn fallback() -> Self {
        Self::baseline(ThemeClass::ClearDay)
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&ParticleLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }
}

/// How the background cloud layer speed is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudMotion {
    /// Fast for rain and thunderstorms, slow otherwise.
    #[default]
    Category,
    /// Scales with the reported wind speed.
    Wind,
}

const STORMY_CLOUD_CYCLE_SECS: f64 = 40.0;
const CALM_CLOUD_CYCLE_SECS: f64 = 80.0;
const FASTEST_CLOUD_CYCLE_SECS: f64 = 20.0;
const CLOUD_CYCLE_SECS_PER_MPS: f64 = 4.0;

const SUN_RAYS: f64 = 0.6;
const DIM_SUN_RAYS: f64 = 0.3;
const NIGHT_STARS: f64 = 0.8;
const OVERCAST_CLOUDS: f64 = 0.7;

/// Per-particle ranges for randomly scattered effects.
struct Scatter {
    kind: LayerKind,
    count: usize,
    size_px: (f64, f64),
    duration_secs: (f64, f64),
    delay_secs: (f64, f64),
    opacity: (f64, f64),
}

const LIGHT_RAIN: Scatter = Scatter {
    kind: LayerKind::Rain,
    count: 100,
    size_px: (10.0, 30.0),
    duration_secs: (0.7, 1.2),
    delay_secs: (0.0, 2.0),
    opacity: (0.3, 0.7),
};

const HEAVY_RAIN: Scatter = Scatter {
    count: 200,
    ..LIGHT_RAIN
};

const SNOW: Scatter = Scatter {
    kind: LayerKind::Snow,
    count: 100,
    size_px: (3.0, 8.0),
    duration_secs: (10.0, 20.0),
    delay_secs: (0.0, 5.0),
    opacity: (0.4, 1.0),
};

/// Scatter tables used by the engine.
struct Effects {
    light_rain: Scatter,
    heavy_rain: Scatter,
    snow: Scatter,
}

const EFFECTS: Effects = Effects {
    light_rain: LIGHT_RAIN,
    heavy_rain: HEAVY_RAIN,
    snow: SNOW,
};

const FOG_BANDS: [(f64, f64, f64); 3] = [(0.0, 60.0, 0.3), (30.0, 80.0, 0.25), (60.0, 100.0, 0.2)];
const LIGHTNING_DELAYS_SECS: [f64; 3] = [0.0, 2.5, 5.0];

fn uniform((low, high): (f64, f64)) -> Result<Uniform<f64>> {
    Uniform::new(low, high)
        .map_err(|e| WeatherError::AnimationFailure(format!("invalid range {low}..{high}: {e}")))
}

fn scatter<R: Rng + ?Sized>(effect: &Scatter, rng: &mut R) -> Result<ParticleLayer> {
    let left = uniform((0.0, 100.0))?;
    let size = uniform(effect.size_px)?;
    let duration = uniform(effect.duration_secs)?;
    let delay = uniform(effect.delay_secs)?;
    let opacity = uniform(effect.opacity)?;

    let particles = (0..effect.count)
        .map(|_| Particle {
            left_pct: left.sample(rng),
            top_pct: 0.0,
            size_px: Some(size.sample(rng)),
            duration_secs: Some(duration.sample(rng)),
            delay_secs: delay.sample(rng),
            opacity: opacity.sample(rng),
        })
        .collect();

    Ok(ParticleLayer {
        kind: effect.kind,
        particles,
    })
}

fn fog() -> ParticleLayer {
    let particles = FOG_BANDS
        .iter()
        .map(|&(top_pct, duration, opacity)| Particle {
            left_pct: 0.0,
            top_pct,
            size_px: None,
            duration_secs: Some(duration),
            delay_secs: 0.0,
            opacity,
        })
        .collect();

    ParticleLayer {
        kind: LayerKind::Fog,
        particles,
    }
}

fn lightning() -> ParticleLayer {
    let particles = LIGHTNING_DELAYS_SECS
        .iter()
        .map(|&delay_secs| Particle {
            left_pct: 0.0,
            top_pct: 0.0,
            size_px: None,
            duration_secs: None,
            delay_secs,
            opacity: 1.0,
        })
        .collect();

    ParticleLayer {
        kind: LayerKind::Lightning,
        particles,
    }
}

/// Presentation side of the engine.
pub trait SceneRenderer {
    /// Remove every particle layer and reset overlays.
    fn clear(&mut self) -> Result<()>;

    fn apply(&mut self, scene: &Scene) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeEngine {
    cloud_motion: CloudMotion,
}

impl ThemeEngine {
    pub fn new(cloud_motion: CloudMotion) -> Self {
        Self { cloud_motion }
    }

    pub fn cloud_cycle_secs(&self, category: WeatherCategory, wind_speed_mps: f64) -> f64 {
        match self.cloud_motion {
            CloudMotion::Category if category.is_stormy() => STORMY_CLOUD_CYCLE_SECS,
            CloudMotion::Category => CALM_CLOUD_CYCLE_SECS,
            CloudMotion::Wind if !wind_speed_mps.is_finite() => CALM_CLOUD_CYCLE_SECS,
            CloudMotion::Wind => (CALM_CLOUD_CYCLE_SECS - CLOUD_CYCLE_SECS_PER_MPS * wind_speed_mps)
                .clamp(FASTEST_CLOUD_CYCLE_SECS, CALM_CLOUD_CYCLE_SECS),
        }
    }

    /// Build the scene for a classification. If any layer fails to build,
    /// the whole scene is replaced by [`Scene::fallback`].
    pub fn compose<R: Rng + ?Sized>(
        &self,
        classification: Classification,
        wind_speed_mps: f64,
        rng: &mut R,
    ) -> Scene {
        self.compose_with(&EFFECTS, classification, wind_speed_mps, rng)
    }

    fn compose_with<R: Rng + ?Sized>(
        &self,
        effects: &Effects,
        classification: Classification,
        wind_speed_mps: f64,
        rng: &mut R,
    ) -> Scene {
        let mut scene = Scene::baseline(ThemeClass::for_classification(classification));
        let day = classification.is_daytime;

        let layers: Vec<Result<ParticleLayer>> = match classification.category {
            WeatherCategory::Clear => {
                if day {
                    scene.overlays.sun_rays = Some(SUN_RAYS);
                } else {
                    scene.overlays.stars = NIGHT_STARS;
                }
                vec![]
            }
            WeatherCategory::Clouds => {
                if day {
                    scene.overlays.clouds = OVERCAST_CLOUDS;
                    scene.overlays.sun_rays = Some(DIM_SUN_RAYS);
                }
                vec![]
            }
            WeatherCategory::Rain(RainIntensity::Light) => {
                vec![scatter(&effects.light_rain, rng)]
            }
            WeatherCategory::Rain(RainIntensity::Heavy) => {
                vec![scatter(&effects.heavy_rain, rng)]
            }
            WeatherCategory::Thunderstorm => {
                vec![scatter(&effects.heavy_rain, rng), Ok(lightning())]
            }
            WeatherCategory::Snow => vec![scatter(&effects.snow, rng)],
            WeatherCategory::Fog => vec![Ok(fog())],
            WeatherCategory::Unknown => vec![],
        };

        match layers.into_iter().collect::<Result<Vec<_>>>() {
            Ok(layers) => scene.layers = layers,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    theme = scene.theme.css_class(),
                    "weather animation failed, using default theme"
                );
                return Scene::fallback();
            }
        }

        scene.cloud_cycle_secs = self.cloud_cycle_secs(classification.category, wind_speed_mps);
        scene
    }

    /// Clear the renderer and paint the scene for `classification`.
    /// Returns the scene that ended up applied.
    pub fn apply<S: SceneRenderer + ?Sized>(
        &self,
        renderer: &mut S,
        classification: Classification,
        wind_speed_mps: f64,
    ) -> Scene {
        let scene = self.compose(classification, wind_speed_mps, &mut rand::rng());
        self.apply_scene(renderer, scene)
    }

    pub fn apply_scene<S: SceneRenderer + ?Sized>(&self, renderer: &mut S, scene: Scene) -> Scene {
        if let Err(err) = renderer.clear() {
            tracing::warn!(error = %err, "failed to clear weather animations");
        }

        let Err(err) = renderer.apply(&scene) else {
            return scene;
        };
        tracing::warn!(error = %err, theme = scene.theme.css_class(), "falling back to default theme");

        let fallback = Scene::fallback();
        if let Err(err) = renderer.clear().and_then(|()| renderer.apply(&fallback)) {
            tracing::warn!(error = %err, "default theme could not be applied either");
        }
        fallback
    }
}
