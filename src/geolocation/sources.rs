//! Location source implementations

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::{LocationSource, Position, PositionError, PositionOptions, TIMEOUT};
use crate::models::Coordinates;

/// Always reports the same fix, taken at the time of the request
#[derive(Debug, Clone)]
pub struct StaticLocationSource {
    coordinates: Coordinates,
}

impl StaticLocationSource {
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationSource for StaticLocationSource {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, PositionError> {
        Ok(Position::now(self.coordinates))
    }
}

/// Applies `maximum_age` and `timeout` on top of another source.
///
/// A fix no older than `maximum_age` is served from memory; otherwise the
/// inner source is queried and must answer within `timeout`.
pub struct CachingSource<S> {
    inner: S,
    last_fix: Mutex<Option<Position>>,
}

impl<S: LocationSource> CachingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, options: &PositionOptions) -> Option<Position> {
        let last_fix = *self.last_fix.lock().ok()?;
        last_fix.filter(|fix| fix.captured_at.elapsed() <= options.maximum_age)
    }

    fn remember(&self, position: Position) {
        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some(position);
        }
    }
}

#[async_trait]
impl<S: LocationSource> LocationSource for CachingSource<S> {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, PositionError> {
        if let Some(fix) = self.cached(options) {
            debug!(
                "Reusing fix captured {:.1}s ago",
                fix.captured_at.elapsed().as_secs_f64()
            );
            return Ok(fix);
        }

        let position = tokio::time::timeout(options.timeout, self.inner.current_position(options))
            .await
            .map_err(|_| PositionError::new(TIMEOUT, "Timed out waiting for a position fix"))??;

        self.remember(position);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl LocationSource for CountingSource {
        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<Position, PositionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Position::now(Coordinates::new(48.1374, 11.5755)))
        }
    }

    #[tokio::test]
    async fn test_static_source_reports_its_coordinates() {
        let source = StaticLocationSource::new(Coordinates::new(1.5, 2.5));
        let position = source
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!(position.coordinates, Coordinates::new(1.5, 2.5));
    }

    #[tokio::test]
    async fn test_fresh_fix_is_reused() {
        let inner = CountingSource::default();
        let calls = inner.calls.clone();
        let source = CachingSource::new(inner);
        let options = PositionOptions::default();

        source.current_position(&options).await.unwrap();
        source.current_position(&options).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_fix_is_refreshed() {
        let inner = CountingSource::default();
        let calls = inner.calls.clone();
        let source = CachingSource::new(inner);
        let options = PositionOptions {
            maximum_age: Duration::ZERO,
            ..PositionOptions::default()
        };

        source.current_position(&options).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        source.current_position(&options).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_source_times_out_with_code_3() {
        let source = CachingSource::new(CountingSource {
            delay: Duration::from_secs(5),
            ..CountingSource::default()
        });
        let options = PositionOptions {
            timeout: Duration::from_millis(20),
            ..PositionOptions::default()
        };

        let error = source.current_position(&options).await.unwrap_err();
        assert_eq!(error.code, TIMEOUT);
    }
}
