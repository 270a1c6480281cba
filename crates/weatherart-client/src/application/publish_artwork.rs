//! PublishArtworkUseCase: the daily forecast-to-display run.
//!
//! ```text
//! ForecastSource ──► prompt ──► ImageGenerator ──► codec (embed min/max, PNG)
//!                                                        │
//!        LastUploadStore ◄── select ◄── upload ◄─────────┘
//!              │
//!              └── replace-last: delete the previous run's picture
//! ```
//!
//! The weather feed and the image model sit behind [`ForecastSource`] and
//! [`ImageGenerator`]; this module only fixes the order of the steps and
//! what happens when one of them fails.  Anything that goes wrong before
//! the upload has been acknowledged is returned as an error.  Cleaning up
//! the previous picture is best-effort and only logged.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{info, warn};
use weatherart_core::codec::{embed_in_image_bytes, ClampReport};
use weatherart_core::domain::artwork::{pick_latest, ImageFileType};
use weatherart_core::{CodecError, ContentId, Forecast, TemperatureRange, UploadRequest};

use super::device_session::{DeviceSession, SessionError};

// ── Collaborator seams ────────────────────────────────────────────────────────

/// Error raised by a forecast or image collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

/// Supplies the forecast the artwork is based on.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(&self) -> Result<Forecast, SourceError>;
}

/// Produces encoded image bytes (PNG or JPEG) for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, SourceError>;
}

/// Remembers the id of the last picture this tool uploaded.
pub trait LastUploadStore: Send + Sync {
    fn load(&self) -> Option<ContentId>;
    fn save(&self, id: &ContentId);
}

// ── Errors and results ────────────────────────────────────────────────────────

/// Errors returned by the publish and push use cases.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("forecast unavailable: {0}")]
    Forecast(#[source] SourceError),

    #[error("image generation failed: {0}")]
    Generation(#[source] SourceError),

    #[error("could not embed the forecast: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The file is neither PNG nor JPEG.
    #[error("unsupported image format (expected PNG or JPEG)")]
    UnsupportedImage,

    /// The upload may have succeeded but its id could not be determined.
    #[error("upload finished but the new content id could not be determined")]
    ContentIdUnknown,
}

/// What a successful publish (or push) did.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub content_id: ContentId,
    /// The previous picture, if it was deleted.
    pub replaced: Option<ContentId>,
    /// The range embedded in the pixels, after clamping and rounding.
    pub embedded: Option<TemperatureRange>,
}

/// Upload settings shared by the publish and push use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub category: String,
    pub matte: String,
    /// Delete the previously uploaded picture once the new one is shown.
    pub replace_last: bool,
}

/// Builds the image-model prompt for a forecast.
pub fn prompt_for(forecast: &Forecast) -> String {
    format!(
        "Ambient artwork for {}: {}, low {:.1}°C, high {:.1}°C",
        forecast.date.format("%A %-d %B"),
        forecast.description,
        forecast.temperatures.min,
        forecast.temperatures.max,
    )
}

// ── PublishArtworkUseCase ─────────────────────────────────────────────────────

/// The publish use case.
pub struct PublishArtworkUseCase<'a> {
    forecast: &'a dyn ForecastSource,
    generator: &'a dyn ImageGenerator,
    store: &'a dyn LastUploadStore,
    settings: UploadSettings,
}

impl<'a> PublishArtworkUseCase<'a> {
    pub fn new(
        forecast: &'a dyn ForecastSource,
        generator: &'a dyn ImageGenerator,
        store: &'a dyn LastUploadStore,
        settings: UploadSettings,
    ) -> Self {
        Self {
            forecast,
            generator,
            store,
            settings,
        }
    }

    /// Runs the whole pipeline and closes `session` afterwards, whatever
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] naming the first step that failed.
    pub async fn run(&self, session: &mut DeviceSession) -> Result<PublishOutcome, PublishError> {
        let result = self.publish(session).await;
        session.close().await;
        result
    }

    async fn publish(&self, session: &mut DeviceSession) -> Result<PublishOutcome, PublishError> {
        let forecast = self.forecast.forecast().await.map_err(PublishError::Forecast)?;
        info!(
            date = %forecast.date,
            min = forecast.temperatures.min,
            max = forecast.temperatures.max,
            "forecast obtained"
        );

        let prompt = prompt_for(&forecast);
        let source = self
            .generator
            .generate(&prompt)
            .await
            .map_err(PublishError::Generation)?;

        let encoded = embed_in_image_bytes(&source, forecast.temperatures)?;
        log_clamping(encoded.clamped, forecast.temperatures, encoded.stored);

        let request = UploadRequest::new(
            &self.settings.category,
            &self.settings.matte,
            ImageFileType::Png,
            now_local(),
        );
        let mut outcome =
            upload_and_show(session, &encoded.png, &request, self.store, &self.settings, true)
                .await?;
        outcome.embedded = Some(encoded.stored);
        Ok(outcome)
    }
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

fn log_clamping(clamped: ClampReport, requested: TemperatureRange, stored: TemperatureRange) {
    if clamped.any() {
        warn!(
            requested_min = requested.min,
            requested_max = requested.max,
            stored_min = stored.min,
            stored_max = stored.max,
            "forecast outside the embeddable range; clamped"
        );
    }
}

// ── Shared upload flow ────────────────────────────────────────────────────────

/// Uploads, selects, records, and optionally replaces the previous picture.
///
/// With `recover` set, a transport failure during the upload is followed by
/// a fresh listing of the category: the newest item that was not present
/// before the upload is taken to be ours.  When no such item exists the
/// first transport error is returned, and when the listing itself fails
/// the result is `ContentIdUnknown`.  Nothing is selected or remembered in
/// either case.
pub(crate) async fn upload_and_show(
    session: &mut DeviceSession,
    bytes: &[u8],
    request: &UploadRequest,
    store: &dyn LastUploadStore,
    settings: &UploadSettings,
    recover: bool,
) -> Result<PublishOutcome, PublishError> {
    let category = settings.category.as_str();
    let previous = store.load();

    let before: HashSet<ContentId> = if recover {
        session
            .list(Some(category))
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect()
    } else {
        HashSet::new()
    };

    info!(bytes = bytes.len(), %category, "uploading image");
    let content_id = match session.upload(bytes, request).await {
        Ok(id) => id,
        Err(SessionError::Transport { operation, reason }) if recover => {
            warn!("upload did not complete cleanly ({reason}); looking for the new item");
            match recover_content_id(session, category, &before).await? {
                Some(id) => id,
                None => return Err(SessionError::Transport { operation, reason }.into()),
            }
        }
        Err(e) => return Err(e.into()),
    };

    session.select(&content_id, Some(category)).await?;
    info!(content_id = %content_id, "new image selected");
    store.save(&content_id);

    let mut replaced = None;
    if settings.replace_last {
        if let Some(previous) = previous.filter(|p| *p != content_id) {
            info!(content_id = %previous, "removing previously uploaded image");
            match session.delete(&previous).await {
                Ok(()) => replaced = Some(previous),
                Err(e) => warn!(content_id = %previous, "could not delete previous image: {e}"),
            }
        }
    }

    Ok(PublishOutcome {
        content_id,
        replaced,
        embedded: None,
    })
}

/// Returns the newest item that appeared since `before` was taken, if any.
async fn recover_content_id(
    session: &mut DeviceSession,
    category: &str,
    before: &HashSet<ContentId>,
) -> Result<Option<ContentId>, PublishError> {
    let after = session.list(Some(category)).await.map_err(|e| {
        warn!("could not list the device after a failed upload: {e}");
        PublishError::ContentIdUnknown
    })?;
    let fresh = after.iter().filter(|item| !before.contains(&item.id));
    Ok(pick_latest(fresh).map(|item| item.id.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::device_session::{
        DeviceConnector, DeviceLink, DeviceLocator, LinkError, LocatorError, SessionConfig,
        SessionState, WakeOutcome,
    };
    use std::io::Cursor;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use image::{ImageFormat, Rgb, RgbImage};
    use weatherart_core::{decode, ArtworkItem, DeviceEndpoint};

    // ── In-memory display ─────────────────────────────────────────────────────

    /// Shared state of a pretend display.
    #[derive(Default)]
    pub(crate) struct FakeDisplay {
        pub items: Vec<ArtworkItem>,
        pub uploads: Vec<Vec<u8>>,
        pub selected: Vec<ContentId>,
        pub deleted: Vec<ContentId>,
        pub closes: usize,
        /// Store the upload but report a transport failure.
        pub drop_upload_ack: bool,
        /// Report a transport failure without storing anything.
        pub lose_upload: bool,
        pub fail_delete: bool,
        next_id: u32,
    }

    pub(crate) type Display = Arc<Mutex<FakeDisplay>>;

    struct FakeLink(Display);

    #[async_trait]
    impl DeviceLink for FakeLink {
        async fn authorize(&mut self) -> Result<Option<String>, LinkError> {
            Ok(None)
        }

        async fn list(&mut self, category: Option<&str>) -> Result<Vec<ArtworkItem>, LinkError> {
            let display = self.0.lock().unwrap();
            Ok(display
                .items
                .iter()
                .filter(|i| category.map_or(true, |c| i.category == c))
                .cloned()
                .collect())
        }

        async fn upload(
            &mut self,
            bytes: &[u8],
            request: &UploadRequest,
        ) -> Result<ContentId, LinkError> {
            let mut display = self.0.lock().unwrap();
            if display.lose_upload {
                return Err(LinkError::transport("connection reset during upload"));
            }
            display.next_id += 1;
            let id = ContentId::new(format!("MY_F{:04}", 100 + display.next_id));
            display.uploads.push(bytes.to_vec());
            display.items.push(ArtworkItem {
                id: id.clone(),
                category: request.category.clone(),
                created: weatherart_core::domain::artwork::parse_device_timestamp(
                    &request.image_date,
                ),
                digest: None,
            });
            if display.drop_upload_ack {
                return Err(LinkError::transport("image_added never arrived"));
            }
            Ok(id)
        }

        async fn select(&mut self, id: &ContentId, _: Option<&str>) -> Result<(), LinkError> {
            self.0.lock().unwrap().selected.push(id.clone());
            Ok(())
        }

        async fn delete(&mut self, id: &ContentId) -> Result<(), LinkError> {
            let mut display = self.0.lock().unwrap();
            if display.fail_delete {
                return Err(LinkError::Remote {
                    code: "-10".to_string(),
                });
            }
            display.deleted.push(id.clone());
            display.items.retain(|i| &i.id != id);
            Ok(())
        }

        async fn close(&mut self) {
            self.0.lock().unwrap().closes += 1;
        }
    }

    struct FakeConnector(Display);

    #[async_trait]
    impl DeviceConnector for FakeConnector {
        async fn connect(&self, _: SocketAddr) -> Result<Box<dyn DeviceLink>, LinkError> {
            Ok(Box::new(FakeLink(Arc::clone(&self.0))))
        }
    }

    struct FixedLocator;

    impl DeviceLocator for FixedLocator {
        fn resolve(&self, _: &DeviceEndpoint) -> Result<SocketAddr, LocatorError> {
            Ok("192.168.1.20:8002".parse().unwrap())
        }

        fn wake(&self, _: &DeviceEndpoint) -> WakeOutcome {
            WakeOutcome::Skipped {
                reason: "test".to_string(),
            }
        }
    }

    pub(crate) fn fake_session(display: &Display) -> DeviceSession {
        DeviceSession::open(
            DeviceEndpoint::default(),
            Arc::new(FixedLocator),
            Arc::new(FakeConnector(Arc::clone(display))),
            SessionConfig::default(),
        )
        .unwrap()
    }

    // ── Collaborator doubles ──────────────────────────────────────────────────

    #[derive(Default)]
    pub(crate) struct MemoryStore(pub Mutex<Option<ContentId>>);

    impl LastUploadStore for MemoryStore {
        fn load(&self) -> Option<ContentId> {
            self.0.lock().unwrap().clone()
        }

        fn save(&self, id: &ContentId) {
            *self.0.lock().unwrap() = Some(id.clone());
        }
    }

    struct FixedForecast(TemperatureRange);

    #[async_trait]
    impl ForecastSource for FixedForecast {
        async fn forecast(&self) -> Result<Forecast, SourceError> {
            Ok(Forecast {
                date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                temperatures: self.0,
                description: "Partly cloudy".to_string(),
            })
        }
    }

    struct RecordingGenerator {
        bytes: Vec<u8>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<Vec<u8>, SourceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.bytes.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ImageGenerator for FailingGenerator {
        async fn generate(&self, _: &str) -> Result<Vec<u8>, SourceError> {
            Err(SourceError("quota exceeded".to_string()))
        }
    }

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, Rgb([40, 120, 200]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn generator(bytes: Vec<u8>) -> RecordingGenerator {
        RecordingGenerator {
            bytes,
            prompts: Mutex::default(),
        }
    }

    pub(crate) fn settings(replace_last: bool) -> UploadSettings {
        UploadSettings {
            category: "MY-C0002".to_string(),
            matte: "none".to_string(),
            replace_last,
        }
    }

    fn old_item(id: &str) -> ArtworkItem {
        ArtworkItem {
            id: ContentId::from(id),
            category: "MY-C0002".to_string(),
            created: NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0),
            digest: None,
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_publish_uploads_image_carrying_forecast() {
        // Arrange
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let forecast = FixedForecast(TemperatureRange::new(12.3, 24.5));
        let generator = generator(png(64, 36));
        let store = MemoryStore::default();
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(false));

        // Act
        let outcome = use_case.run(&mut session).await.unwrap();

        // Assert
        let display = display.lock().unwrap();
        assert_eq!(display.uploads.len(), 1);
        let uploaded = image::load_from_memory(&display.uploads[0]).unwrap().to_rgb8();
        assert_eq!(decode(&uploaded), Some(TemperatureRange::new(12.3, 24.5)));
        assert_eq!(display.selected, vec![outcome.content_id.clone()]);
        assert_eq!(store.load(), Some(outcome.content_id.clone()));
        assert_eq!(outcome.embedded, Some(TemperatureRange::new(12.3, 24.5)));
        assert_eq!(display.closes, 1);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(generator.prompts.lock().unwrap()[0].contains("Partly cloudy"));
    }

    #[tokio::test]
    async fn test_publish_replaces_previous_upload() {
        // Arrange
        let display: Display = Arc::default();
        display.lock().unwrap().items.push(old_item("MY_F0001"));
        let mut session = fake_session(&display);
        let store = MemoryStore(Mutex::new(Some(ContentId::from("MY_F0001"))));
        let forecast = FixedForecast(TemperatureRange::new(1.0, 2.0));
        let generator = generator(png(16, 16));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(true));

        // Act
        let outcome = use_case.run(&mut session).await.unwrap();

        // Assert
        assert_eq!(outcome.replaced, Some(ContentId::from("MY_F0001")));
        assert_eq!(display.lock().unwrap().deleted, vec![ContentId::from("MY_F0001")]);
    }

    #[tokio::test]
    async fn test_failed_replace_is_only_a_warning() {
        let display: Display = Arc::default();
        display.lock().unwrap().fail_delete = true;
        let mut session = fake_session(&display);
        let store = MemoryStore(Mutex::new(Some(ContentId::from("MY_F0001"))));
        let forecast = FixedForecast(TemperatureRange::new(1.0, 2.0));
        let generator = generator(png(16, 16));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(true));

        let outcome = use_case.run(&mut session).await.unwrap();

        assert_eq!(outcome.replaced, None);
        assert_eq!(store.load(), Some(outcome.content_id));
    }

    #[tokio::test]
    async fn test_publish_recovers_id_after_lost_acknowledgement() {
        // Arrange
        let display: Display = Arc::default();
        {
            let mut d = display.lock().unwrap();
            d.items.push(old_item("MY_F0001"));
            d.drop_upload_ack = true;
        }
        let mut session = fake_session(&display);
        let store = MemoryStore::default();
        let forecast = FixedForecast(TemperatureRange::new(5.0, 9.0));
        let generator = generator(png(16, 16));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(false));

        // Act
        let outcome = use_case.run(&mut session).await.unwrap();

        // Assert
        assert_eq!(outcome.content_id, ContentId::from("MY_F0101"));
        assert_eq!(display.lock().unwrap().selected, vec![ContentId::from("MY_F0101")]);
    }

    #[tokio::test]
    async fn test_lost_upload_fails_without_selecting_existing_item() {
        // Arrange
        let display: Display = Arc::default();
        {
            let mut d = display.lock().unwrap();
            d.items.push(old_item("MY_F0001"));
            d.lose_upload = true;
        }
        let mut session = fake_session(&display);
        let store = MemoryStore(Mutex::new(Some(ContentId::from("MY_F0050"))));
        let forecast = FixedForecast(TemperatureRange::new(5.0, 9.0));
        let generator = generator(png(16, 16));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(true));

        // Act
        let result = use_case.run(&mut session).await;

        // Assert
        assert!(matches!(
            result,
            Err(PublishError::Session(SessionError::Transport { .. }))
        ));
        let display = display.lock().unwrap();
        assert!(display.uploads.is_empty());
        assert!(display.selected.is_empty());
        assert!(display.deleted.is_empty());
        assert_eq!(store.load(), Some(ContentId::from("MY_F0050")));
        assert_eq!(display.closes, 1);
    }

    #[tokio::test]
    async fn test_clamped_forecast_is_still_published() {
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore::default();
        let forecast = FixedForecast(TemperatureRange::new(-80.0, 75.0));
        let generator = generator(png(16, 16));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(false));

        let outcome = use_case.run(&mut session).await.unwrap();

        assert_eq!(outcome.embedded, Some(TemperatureRange::new(-50.0, 60.0)));
    }

    #[tokio::test]
    async fn test_generation_failure_closes_session_without_upload() {
        // Arrange
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore::default();
        let forecast = FixedForecast(TemperatureRange::new(1.0, 2.0));
        let use_case =
            PublishArtworkUseCase::new(&forecast, &FailingGenerator, &store, settings(false));

        // Act
        let result = use_case.run(&mut session).await;

        // Assert
        assert!(matches!(result, Err(PublishError::Generation(_))));
        assert!(display.lock().unwrap().uploads.is_empty());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_too_small_image_fails_loud() {
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore::default();
        let forecast = FixedForecast(TemperatureRange::new(1.0, 2.0));
        let generator = generator(png(4, 2));
        let use_case = PublishArtworkUseCase::new(&forecast, &generator, &store, settings(false));

        let result = use_case.run(&mut session).await;

        assert!(matches!(
            result,
            Err(PublishError::Codec(CodecError::TooSmall { .. }))
        ));
        assert!(display.lock().unwrap().uploads.is_empty());
    }

    #[test]
    fn test_prompt_mentions_conditions_and_range() {
        let forecast = Forecast {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            temperatures: TemperatureRange::new(-2.0, 7.5),
            description: "Snow showers".to_string(),
        };

        let prompt = prompt_for(&forecast);

        assert!(prompt.contains("Sunday 1 March"));
        assert!(prompt.contains("Snow showers"));
        assert!(prompt.contains("low -2.0°C, high 7.5°C"));
    }
}
