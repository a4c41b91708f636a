//! Plain-text rendering of the orchestrator state

use crate::orchestrator::{ErrorKind, FetchState};

/// Render a state snapshot for the terminal.
///
/// Partial data is always shown: a weather reading without a resolved place
/// name still renders, with the error underneath.
#[must_use]
pub fn render(state: &FetchState) -> String {
    if state.loading {
        return "⏳ Detecting your location and fetching the weather...".to_string();
    }

    let mut lines = Vec::new();

    if !state.location_name.is_empty() {
        lines.push(format!("📍 {}", state.location_name));
    }

    if let Some(weather) = &state.weather {
        lines.push(format!("🌡️ Temperature: {}", weather.format_temperature()));
        lines.push(format!("💧 Humidity: {}", weather.format_humidity()));
    }

    if let Some(message) = &state.error {
        let prefix = match state.error_kind {
            Some(ErrorKind::Permission) => "🔒",
            Some(ErrorKind::Weather) => "☁️",
            Some(ErrorKind::Location) | None => "⚠️",
        };
        lines.push(format!("{prefix} {message}"));
    }

    if lines.is_empty() {
        lines.push("No weather data yet.".to_string());
    }

    lines.join("\n")
}
