//! Weather data orchestration
//!
//! One fetch cycle runs geolocation, then the place-name and weather lookups,
//! and publishes every step into an observable [`FetchState`]. Geolocation is
//! a hard dependency: its failure ends the cycle. The two lookups are soft
//! dependencies: each failure only degrades its own part of the state, and
//! when both fail the weather failure is the one reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::LookupFailed;
use crate::geolocation::{GeolocationProvider, LocateError};
use crate::models::{Coordinates, PlaceName, WeatherReading};
use crate::resolvers::{LocationNameResolver, WeatherResolver};

pub const PERMISSION_DENIED_MESSAGE: &str =
    "Location access denied. Please enable location permissions to use this app.";
pub const POSITION_UNAVAILABLE_MESSAGE: &str =
    "Unable to determine your location. Please check your device settings.";
pub const LOCATE_TIMEOUT_MESSAGE: &str = "Location request timed out. Please try again.";
pub const LOCATE_FALLBACK_MESSAGE: &str =
    "Unable to access your location. Please enable location services and try again.";
pub const LOCATION_NAME_FAILED_MESSAGE: &str =
    "Unable to determine your location name. Continuing with coordinates...";
pub const WEATHER_FAILED_MESSAGE: &str =
    "Unable to fetch weather data. Please check your internet connection and try again.";

/// Coarse error category shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Location,
    Weather,
    Permission,
}

/// A classified, user-facing failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorReport {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Map a geolocation failure to its classification and message
#[must_use]
pub fn classify_locate_error(error: &LocateError) -> ErrorReport {
    match error {
        LocateError::PermissionDenied => {
            ErrorReport::new(ErrorKind::Permission, PERMISSION_DENIED_MESSAGE)
        }
        LocateError::PositionUnavailable => {
            ErrorReport::new(ErrorKind::Location, POSITION_UNAVAILABLE_MESSAGE)
        }
        LocateError::Timeout => ErrorReport::new(ErrorKind::Location, LOCATE_TIMEOUT_MESSAGE),
        LocateError::Unknown { message, .. } if message.trim().is_empty() => {
            ErrorReport::new(ErrorKind::Location, LOCATE_FALLBACK_MESSAGE)
        }
        LocateError::Unknown { message, .. } => {
            ErrorReport::new(ErrorKind::Location, message.clone())
        }
        LocateError::Unsupported => ErrorReport::new(ErrorKind::Location, error.to_string()),
    }
}

/// Everything the UI needs to render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchState {
    pub coordinates: Option<Coordinates>,
    /// Structured place name; `None` when unresolved or when the coordinate fallback is shown
    pub place: Option<PlaceName>,
    /// Rendered place name, empty until the first successful locate
    pub location_name: String,
    pub weather: Option<WeatherReading>,
    pub loading: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl FetchState {
    fn begin_cycle(&mut self) {
        self.loading = true;
        self.error = None;
        self.error_kind = None;
    }

    fn clear_data(&mut self) {
        self.coordinates = None;
        self.place = None;
        self.location_name.clear();
        self.weather = None;
    }

    fn report(&mut self, report: ErrorReport) {
        self.error_kind = Some(report.kind);
        self.error = Some(report.message);
    }
}

/// Combined result of the place-name and weather lookups
#[derive(Debug, Clone, PartialEq)]
pub struct LookupMerge {
    pub place: Option<PlaceName>,
    pub location_name: String,
    pub weather: Option<WeatherReading>,
    pub failure: Option<ErrorReport>,
}

impl LookupMerge {
    fn apply_to(self, state: &mut FetchState) {
        state.place = self.place;
        state.location_name = self.location_name;
        if let Some(weather) = self.weather {
            state.weather = Some(weather);
        }
        if let Some(failure) = self.failure {
            state.report(failure);
        }
    }
}

/// The later stage's failure replaces the earlier one
#[must_use]
pub fn last_failure_wins(
    earlier: Option<ErrorReport>,
    later: Option<ErrorReport>,
) -> Option<ErrorReport> {
    later.or(earlier)
}

/// Merge the two soft-dependency outcomes. Independent of the order in
/// which the lookups actually completed.
#[must_use]
pub fn merge_lookups(
    coordinates: Coordinates,
    place: Result<PlaceName, LookupFailed>,
    weather: Result<WeatherReading, LookupFailed>,
) -> LookupMerge {
    let (place, location_name, name_failure) = match place {
        Ok(place) => {
            let name = place.display_name();
            (Some(place), name, None)
        }
        Err(_) => (
            None,
            coordinates.format_fixed2(),
            Some(ErrorReport::new(
                ErrorKind::Location,
                LOCATION_NAME_FAILED_MESSAGE,
            )),
        ),
    };

    let (weather, weather_failure) = match weather {
        Ok(reading) => (Some(reading), None),
        Err(_) => (
            None,
            Some(ErrorReport::new(ErrorKind::Weather, WEATHER_FAILED_MESSAGE)),
        ),
    };

    LookupMerge {
        place,
        location_name,
        weather,
        failure: last_failure_wins(name_failure, weather_failure),
    }
}

/// How the place-name and weather lookups are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupMode {
    /// Weather is requested after the place-name lookup settles
    #[default]
    Sequential,
    /// Both lookups run at once
    Concurrent,
}

/// Result of calling `fetch` or `refetch`
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The cycle ran to completion; carries the final state
    Completed(FetchState),
    /// Another cycle was in flight; nothing was changed
    AlreadyInFlight,
}

/// Sequences geolocation, place-name and weather lookups
pub struct WeatherDataOrchestrator {
    geolocation: GeolocationProvider,
    names: Arc<dyn LocationNameResolver>,
    weather: Arc<dyn WeatherResolver>,
    mode: LookupMode,
    state: watch::Sender<FetchState>,
    in_flight: AtomicBool,
}

/// Held for the duration of a cycle. Dropping it ends the cycle, even when the
/// cycle future is cancelled mid-flight.
struct CycleGuard<'a> {
    orchestrator: &'a WeatherDataOrchestrator,
}

impl<'a> CycleGuard<'a> {
    fn acquire(orchestrator: &'a WeatherDataOrchestrator) -> Option<Self> {
        orchestrator
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { orchestrator })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator
            .state
            .send_modify(|state| state.loading = false);
        self.orchestrator.in_flight.store(false, Ordering::Release);
    }
}

impl WeatherDataOrchestrator {
    pub fn new(
        geolocation: GeolocationProvider,
        names: Arc<dyn LocationNameResolver>,
        weather: Arc<dyn WeatherResolver>,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            geolocation,
            names,
            weather,
            mode: LookupMode::default(),
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: LookupMode) -> Self {
        self.mode = mode;
        self
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state mutation
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one fetch cycle, keeping any data from previous cycles that this
    /// cycle does not replace.
    pub async fn fetch(&self) -> CycleOutcome {
        self.run_guarded(false).await
    }

    /// Clear coordinates, place name and weather, then run a fetch cycle.
    pub async fn refetch(&self) -> CycleOutcome {
        self.run_guarded(true).await
    }

    async fn run_guarded(&self, reset: bool) -> CycleOutcome {
        let Some(guard) = CycleGuard::acquire(self) else {
            warn!("Fetch requested while a cycle is in flight; ignoring");
            return CycleOutcome::AlreadyInFlight;
        };

        if reset {
            self.state.send_modify(FetchState::clear_data);
        }
        self.run_cycle().await;

        drop(guard);
        CycleOutcome::Completed(self.state())
    }

    #[instrument(name = "fetch_cycle", skip(self), fields(mode = ?self.mode))]
    async fn run_cycle(&self) {
        self.state.send_modify(FetchState::begin_cycle);

        let coordinates = match self.geolocation.locate().await {
            Ok(coordinates) => coordinates,
            Err(error) => {
                let report = classify_locate_error(&error);
                warn!(kind = ?report.kind, "Geolocation failed: {}", error);
                self.state.send_modify(|state| state.report(report));
                return;
            }
        };
        self.state
            .send_modify(|state| state.coordinates = Some(coordinates));

        let (latitude, longitude) = (coordinates.latitude, coordinates.longitude);
        let (place, weather) = match self.mode {
            LookupMode::Sequential => {
                let place = self.names.resolve(latitude, longitude).await;
                let weather = self.weather.resolve(latitude, longitude).await;
                (place, weather)
            }
            LookupMode::Concurrent => tokio::join!(
                self.names.resolve(latitude, longitude),
                self.weather.resolve(latitude, longitude)
            ),
        };

        if let Err(error) = &place {
            warn!("Place name unavailable, falling back to coordinates: {}", error);
        }
        if let Err(error) = &weather {
            warn!("Weather unavailable: {}", error);
        }

        let merged = merge_lookups(coordinates, place, weather);
        info!(
            location = %merged.location_name,
            has_weather = merged.weather.is_some(),
            "Fetch cycle resolved"
        );
        self.state.send_modify(|state| merged.apply_to(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupService;
    use crate::geolocation::{LocationSource, Position, PositionError, PositionOptions};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const LONDON: Coordinates = Coordinates {
        latitude: 51.5072,
        longitude: -0.1275,
    };

    struct FakeSource(Result<Coordinates, u16>);

    #[async_trait]
    impl LocationSource for FakeSource {
        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<Position, PositionError> {
            self.0
                .map(Position::now)
                .map_err(|code| PositionError::new(code, "fake failure"))
        }
    }

    #[derive(Default)]
    struct FakeNames {
        place: Option<PlaceName>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationNameResolver for FakeNames {
        async fn resolve(&self, _lat: f64, _lon: f64) -> Result<PlaceName, LookupFailed> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.place
                .clone()
                .ok_or_else(|| LookupFailed::new(LookupService::LocationName, "fake"))
        }
    }

    #[derive(Default)]
    struct FakeWeather {
        reading: Option<WeatherReading>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherResolver for FakeWeather {
        async fn resolve(&self, _lat: f64, _lon: f64) -> Result<WeatherReading, LookupFailed> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reading
                .ok_or_else(|| LookupFailed::new(LookupService::Weather, "fake"))
        }
    }

    fn london_names() -> Arc<FakeNames> {
        Arc::new(FakeNames {
            place: Some(PlaceName::new("London", "United Kingdom")),
            ..FakeNames::default()
        })
    }

    fn mild_weather() -> Arc<FakeWeather> {
        Arc::new(FakeWeather {
            reading: Some(WeatherReading::new(16.5, 72.0)),
            ..FakeWeather::default()
        })
    }

    fn orchestrator(
        location: Result<Coordinates, u16>,
        names: Arc<FakeNames>,
        weather: Arc<FakeWeather>,
    ) -> WeatherDataOrchestrator {
        WeatherDataOrchestrator::new(
            GeolocationProvider::new(FakeSource(location)),
            names,
            weather,
        )
    }

    fn completed(outcome: CycleOutcome) -> FetchState {
        match outcome {
            CycleOutcome::Completed(state) => state,
            CycleOutcome::AlreadyInFlight => panic!("cycle was rejected"),
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let o = orchestrator(Ok(LONDON), london_names(), mild_weather());
        let state = o.state();
        assert!(!state.loading);
        assert_eq!(state.coordinates, None);
        assert_eq!(state.location_name, "");
        assert_eq!(state.error_kind, None);
    }

    #[tokio::test]
    async fn test_successful_cycle() {
        let o = orchestrator(Ok(LONDON), london_names(), mild_weather());
        let state = completed(o.fetch().await);

        assert_eq!(state.coordinates, Some(LONDON));
        assert_eq!(state.place, Some(PlaceName::new("London", "United Kingdom")));
        assert_eq!(state.location_name, "London, United Kingdom");
        assert_eq!(state.weather, Some(WeatherReading::new(16.5, 72.0)));
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.error_kind, None);
    }

    #[tokio::test]
    async fn test_name_failure_falls_back_to_coordinates() {
        let o = orchestrator(Ok(LONDON), Arc::new(FakeNames::default()), mild_weather());
        let state = completed(o.fetch().await);

        assert_eq!(state.location_name, "51.51, -0.13");
        assert_eq!(state.place, None);
        assert_eq!(state.error_kind, Some(ErrorKind::Location));
        assert_eq!(state.error.as_deref(), Some(LOCATION_NAME_FAILED_MESSAGE));
        assert_eq!(state.weather, Some(WeatherReading::new(16.5, 72.0)));
    }

    #[tokio::test]
    async fn test_weather_failure_keeps_place_name() {
        let o = orchestrator(Ok(LONDON), london_names(), Arc::new(FakeWeather::default()));
        let state = completed(o.fetch().await);

        assert_eq!(state.location_name, "London, United Kingdom");
        assert_eq!(state.weather, None);
        assert_eq!(state.error_kind, Some(ErrorKind::Weather));
        assert_eq!(state.error.as_deref(), Some(WEATHER_FAILED_MESSAGE));
    }

    #[rstest]
    #[case(LookupMode::Sequential)]
    #[case(LookupMode::Concurrent)]
    #[tokio::test]
    async fn test_weather_failure_wins_when_both_lookups_fail(#[case] mode: LookupMode) {
        let o = orchestrator(
            Ok(LONDON),
            Arc::new(FakeNames::default()),
            Arc::new(FakeWeather::default()),
        )
        .with_mode(mode);
        let state = completed(o.fetch().await);

        assert_eq!(state.error_kind, Some(ErrorKind::Weather));
        assert_eq!(state.error.as_deref(), Some(WEATHER_FAILED_MESSAGE));
        assert_eq!(state.location_name, "51.51, -0.13");
        assert!(!state.loading);
    }

    #[rstest]
    #[case(1, ErrorKind::Permission, PERMISSION_DENIED_MESSAGE)]
    #[case(2, ErrorKind::Location, POSITION_UNAVAILABLE_MESSAGE)]
    #[case(3, ErrorKind::Location, LOCATE_TIMEOUT_MESSAGE)]
    #[case(9, ErrorKind::Location, "fake failure")]
    #[tokio::test]
    async fn test_geolocation_failure_is_terminal(
        #[case] code: u16,
        #[case] kind: ErrorKind,
        #[case] message: &str,
    ) {
        let names = london_names();
        let weather = mild_weather();
        let o = orchestrator(Err(code), names.clone(), weather.clone());
        let state = completed(o.fetch().await);

        assert_eq!(state.error_kind, Some(kind));
        assert_eq!(state.error.as_deref(), Some(message));
        assert_eq!(state.coordinates, None);
        assert_eq!(state.location_name, "");
        assert_eq!(state.weather, None);
        assert!(!state.loading);
        assert_eq!(names.calls.load(Ordering::SeqCst), 0);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_geolocation() {
        let o = WeatherDataOrchestrator::new(
            GeolocationProvider::unsupported(),
            london_names(),
            mild_weather(),
        );
        let state = completed(o.fetch().await);

        assert_eq!(state.error_kind, Some(ErrorKind::Location));
        assert_eq!(
            state.error.as_deref(),
            Some("Geolocation is not supported on this device")
        );
    }

    #[rstest]
    #[case("", LOCATE_FALLBACK_MESSAGE)]
    #[case("   ", LOCATE_FALLBACK_MESSAGE)]
    #[case("kCLErrorDomain error 0", "kCLErrorDomain error 0")]
    fn test_unknown_locate_error_uses_raw_message(#[case] raw: &str, #[case] expected: &str) {
        let report = classify_locate_error(&LocateError::Unknown {
            code: 9,
            message: raw.to_string(),
        });
        assert_eq!(report, ErrorReport::new(ErrorKind::Location, expected));
    }

    #[tokio::test]
    async fn test_refetch_clears_previous_data() {
        let names = london_names();
        let o = WeatherDataOrchestrator::new(
            GeolocationProvider::new(FakeSource(Ok(LONDON))),
            names,
            mild_weather(),
        );
        completed(o.fetch().await);

        let failing = WeatherDataOrchestrator {
            geolocation: GeolocationProvider::new(FakeSource(Err(2))),
            ..o
        };
        let state = completed(failing.refetch().await);
        assert_eq!(state.coordinates, None);
        assert_eq!(state.location_name, "");
        assert_eq!(state.weather, None);
        assert_eq!(state.error_kind, Some(ErrorKind::Location));
    }

    #[tokio::test]
    async fn test_repeated_refetch_ends_idle() {
        let o = orchestrator(Ok(LONDON), london_names(), mild_weather());
        for _ in 0..3 {
            let state = completed(o.refetch().await);
            assert!(!state.loading);
            assert_eq!(state.location_name, "London, United Kingdom");
        }
        assert!(!o.is_in_flight());
    }

    #[tokio::test]
    async fn test_loading_only_while_in_flight_and_overlap_rejected() {
        let gate = Arc::new(Notify::new());
        let weather = Arc::new(FakeWeather {
            reading: Some(WeatherReading::new(10.0, 50.0)),
            gate: Some(gate.clone()),
            ..FakeWeather::default()
        });
        let o = Arc::new(orchestrator(Ok(LONDON), london_names(), weather));
        let mut rx = o.subscribe();

        let running = tokio::spawn({
            let o = o.clone();
            async move { o.fetch().await }
        });

        rx.wait_for(|state| state.loading && state.coordinates.is_some())
            .await
            .unwrap();
        let before = o.state();
        assert_eq!(o.fetch().await, CycleOutcome::AlreadyInFlight);
        assert_eq!(o.refetch().await, CycleOutcome::AlreadyInFlight);
        assert_eq!(o.state(), before);

        gate.notify_one();
        let state = completed(running.await.unwrap());
        assert!(!state.loading);
        assert_eq!(state.weather, Some(WeatherReading::new(10.0, 50.0)));
    }

    #[tokio::test]
    async fn test_cancelled_cycle_releases_loading() {
        let weather = Arc::new(FakeWeather {
            gate: Some(Arc::new(Notify::new())),
            ..FakeWeather::default()
        });
        let o = Arc::new(orchestrator(Ok(LONDON), london_names(), weather));
        let mut rx = o.subscribe();

        let running = tokio::spawn({
            let o = o.clone();
            async move { o.fetch().await }
        });
        rx.wait_for(|state| state.loading).await.unwrap();

        running.abort();
        let _ = running.await;

        assert!(!o.state().loading);
        assert!(!o.is_in_flight());
    }

    #[test]
    fn test_merge_is_explicit_last_failure_wins() {
        let name_failure = ErrorReport::new(ErrorKind::Location, "a");
        let weather_failure = ErrorReport::new(ErrorKind::Weather, "b");

        assert_eq!(
            last_failure_wins(Some(name_failure.clone()), Some(weather_failure.clone())),
            Some(weather_failure.clone())
        );
        assert_eq!(
            last_failure_wins(Some(name_failure.clone()), None),
            Some(name_failure)
        );
        assert_eq!(last_failure_wins(None, None), None);
    }

    #[test]
    fn test_fetch_state_serializes_for_ui() {
        let state = FetchState {
            error_kind: Some(ErrorKind::Permission),
            ..FetchState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["errorKind"], "permission");
        assert_eq!(json["loading"], false);
        assert_eq!(json["locationName"], "");
    }
}
