use chrono::{DateTime, FixedOffset, Utc};
use weatherly_core::error::Result;
use weatherly_core::scene::LayerKind;
use weatherly_core::view::ThemeVariables;
use weatherly_core::{
    CurrentConditions, FavoriteCity, ForecastEntry, GeoSuggestion, RenderModel, Scene,
    SceneRenderer,
};

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

pub fn print_report(model: &RenderModel) {
    let current = &model.current;

    println!("{}", model.label);
    println!(
        "  {}°C (feels like {}°C), {}",
        round_c(current.temperature_c),
        round_c(current.feels_like_c),
        current.description
    );
    println!(
        "  High {}°C / Low {}°C",
        round_c(current.temp_max_c),
        round_c(current.temp_min_c)
    );
    println!("  Humidity    {}%", current.humidity_pct);
    println!("  Pressure    {} hPa", current.pressure_hpa);
    println!("  Visibility  {}", visibility(current.visibility_m));
    println!(
        "  Wind        {} km/h {} ({}°)",
        kmh(current.wind.speed),
        cardinal(current.wind.deg),
        current.wind.deg
    );
    println!("  Gusts       {}", gust(current.wind.gust));
    println!("  Clouds      {}%", current.clouds_pct);
    println!("  Sunrise     {}", local_time(current, current.sunrise));
    println!("  Sunset      {}", local_time(current, current.sunset));
    println!("  {}", current.coord);

    if !model.daily.is_empty() {
        println!();
        println!("Forecast");
        for entry in &model.daily {
            println!("{}", forecast_row(entry, current.local_offset()));
        }
    }
}

pub fn print_suggestions(suggestions: &[GeoSuggestion]) {
    if suggestions.is_empty() {
        println!("No suggestions");
        return;
    }
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("{:>2}. {}  ({})", i + 1, suggestion.label(), suggestion.coord);
    }
}

pub fn print_favorites(favorites: &[FavoriteCity]) {
    if favorites.is_empty() {
        println!("No favorites yet");
        return;
    }
    for (i, city) in favorites.iter().enumerate() {
        let mut line = format!("{:>2}. {}", i + 1, city.name);
        if let Some(id) = city.id {
            line.push_str(&format!("  #{id}"));
        }
        if let Some(coord) = city.coord {
            line.push_str(&format!("  ({coord})"));
        }
        println!("{line}");
    }
}

pub fn print_theme(vars: &ThemeVariables) {
    for (name, value) in &vars.0 {
        println!("{name}: {value};");
    }
}

/// Text stand-in for the animated background: records what a graphical
/// renderer would paint.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    lines: Vec<String>,
}

impl TerminalRenderer {
    pub fn print(&self) {
        if self.lines.is_empty() {
            return;
        }
        println!();
        for line in &self.lines {
            println!("{line}");
        }
    }
}

impl SceneRenderer for TerminalRenderer {
    fn clear(&mut self) -> Result<()> {
        self.lines.clear();
        Ok(())
    }

    fn apply(&mut self, scene: &Scene) -> Result<()> {
        self.lines.push(format!(
            "Scene: {} (clouds cycle {:.0}s)",
            scene.theme.css_class(),
            scene.cloud_cycle_secs
        ));
        for layer in &scene.layers {
            self.lines.push(format!(
                "  {} x{}",
                layer_name(layer.kind),
                layer.particles.len()
            ));
        }
        Ok(())
    }
}

fn forecast_row(entry: &ForecastEntry, offset: FixedOffset) -> String {
    format!(
        "  {:<11} {:>4}°C  {:>3}/{:<3}°C  {:>3}%  {:>3} km/h  {:>4} hPa  {}",
        entry.time.with_timezone(&offset).format("%a %b %-d"),
        round_c(entry.temperature_c),
        round_c(entry.temp_max_c),
        round_c(entry.temp_min_c),
        entry.humidity_pct,
        kmh(entry.wind_speed_mps),
        entry.pressure_hpa,
        entry.description
    )
}

fn layer_name(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Rain => "rain drops",
        LayerKind::Snow => "snowflakes",
        LayerKind::Fog => "fog bands",
        LayerKind::Lightning => "lightning flashes",
    }
}

fn round_c(celsius: f64) -> i64 {
    celsius.round() as i64
}

fn kmh(mps: f64) -> i64 {
    (mps * 3.6).round() as i64
}

fn cardinal(deg: u16) -> &'static str {
    let index = (f64::from(deg) / 45.0).round() as usize % COMPASS.len();
    COMPASS[index]
}

fn visibility(metres: Option<u32>) -> String {
    match metres {
        Some(m) => format!("{:.1} km", f64::from(m) / 1000.0),
        None => "N/A".to_string(),
    }
}

fn gust(mps: Option<f64>) -> String {
    match mps {
        Some(speed) => format!("{} km/h", kmh(speed)),
        None => "N/A".to_string(),
    }
}

fn local_time(current: &CurrentConditions, at: DateTime<Utc>) -> String {
    at.with_timezone(&current.local_offset())
        .format("%H:%M")
        .to_string()
}
