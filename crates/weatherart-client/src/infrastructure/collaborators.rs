//! Argument- and file-backed implementations of the publish collaborators.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use weatherart_core::Forecast;

use crate::application::publish_artwork::{ForecastSource, ImageGenerator, SourceError};

/// A forecast supplied up front, e.g. from `--min` / `--max`.
#[derive(Debug, Clone)]
pub struct StaticForecast {
    forecast: Forecast,
}

impl StaticForecast {
    pub fn new(forecast: Forecast) -> Self {
        Self { forecast }
    }
}

#[async_trait]
impl ForecastSource for StaticForecast {
    async fn forecast(&self) -> Result<Forecast, SourceError> {
        Ok(self.forecast.clone())
    }
}

/// Returns the bytes of an existing image file, ignoring the prompt.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageGenerator for FileImageSource {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, SourceError> {
        debug!(path = %self.path.display(), %prompt, "reading image instead of generating");
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| SourceError(format!("cannot read {}: {e}", self.path.display())))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use weatherart_core::TemperatureRange;

    #[test]
    fn test_static_forecast_returns_given_values() {
        let forecast = Forecast {
            date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            temperatures: TemperatureRange::new(9.0, 17.0),
            description: "Fog".to_string(),
        };

        let got = tokio_test::block_on(StaticForecast::new(forecast.clone()).forecast()).unwrap();

        assert_eq!(got, forecast);
    }

    #[tokio::test]
    async fn test_file_image_source_reads_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("weatherart_src_{}.bin", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"\x89PNG").unwrap();

        // Act
        let bytes = FileImageSource::new(&path).generate("ignored").await.unwrap();

        // Assert
        assert_eq!(bytes, b"\x89PNG");
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let result = FileImageSource::new("/nonexistent/weatherart/image.png")
            .generate("x")
            .await;

        let error = tokio_test::assert_err!(result);
        assert!(error.0.contains("/nonexistent/weatherart/image.png"));
    }
}
