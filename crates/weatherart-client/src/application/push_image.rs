//! PushImageUseCase: upload an existing image file unchanged.
//!
//! Unlike the publish run, nothing is embedded and there is no recovery
//! step: if the display does not acknowledge the upload with an id the
//! push fails, and the user can check Art Mode by hand.

use chrono::Local;
use tracing::info;
use weatherart_core::domain::artwork::ImageFileType;
use weatherart_core::UploadRequest;

use super::device_session::DeviceSession;
use super::publish_artwork::{
    upload_and_show, LastUploadStore, PublishError, PublishOutcome, UploadSettings,
};

/// The push use case.
pub struct PushImageUseCase<'a> {
    store: &'a dyn LastUploadStore,
    settings: UploadSettings,
}

impl<'a> PushImageUseCase<'a> {
    pub fn new(store: &'a dyn LastUploadStore, settings: UploadSettings) -> Self {
        Self { store, settings }
    }

    /// Uploads `bytes` as-is, selects it, and closes `session`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::UnsupportedImage`] for anything but PNG or
    /// JPEG, otherwise the session error of the failing step.
    pub async fn run(
        &self,
        session: &mut DeviceSession,
        bytes: &[u8],
    ) -> Result<PublishOutcome, PublishError> {
        let result = self.push(session, bytes).await;
        session.close().await;
        result
    }

    async fn push(
        &self,
        session: &mut DeviceSession,
        bytes: &[u8],
    ) -> Result<PublishOutcome, PublishError> {
        let file_type = ImageFileType::sniff(bytes).ok_or(PublishError::UnsupportedImage)?;
        info!(file_type = file_type.as_str(), bytes = bytes.len(), "pushing image");
        let request = UploadRequest::new(
            &self.settings.category,
            &self.settings.matte,
            file_type,
            Local::now().naive_local(),
        );
        upload_and_show(session, bytes, &request, self.store, &self.settings, false).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_session::{SessionError, SessionState};
    use crate::application::publish_artwork::tests::{
        fake_session, png, settings, Display, MemoryStore,
    };
    use std::sync::{Arc, Mutex};
    use weatherart_core::ContentId;

    #[tokio::test]
    async fn test_push_uploads_bytes_unchanged() {
        // Arrange
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore::default();
        let bytes = png(10, 10);

        // Act
        let outcome = PushImageUseCase::new(&store, settings(false))
            .run(&mut session, &bytes)
            .await
            .unwrap();

        // Assert
        let display = display.lock().unwrap();
        assert_eq!(display.uploads, vec![bytes]);
        assert_eq!(display.selected, vec![outcome.content_id.clone()]);
        assert_eq!(outcome.embedded, None);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_push_without_replace_keeps_previous() {
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore(Mutex::new(Some(ContentId::from("MY_F0001"))));

        let outcome = PushImageUseCase::new(&store, settings(false))
            .run(&mut session, &png(10, 10))
            .await
            .unwrap();

        assert_eq!(outcome.replaced, None);
        assert!(display.lock().unwrap().deleted.is_empty());
    }

    #[tokio::test]
    async fn test_push_rejects_unknown_format_before_connecting() {
        let display: Display = Arc::default();
        let mut session = fake_session(&display);
        let store = MemoryStore::default();

        let result = PushImageUseCase::new(&store, settings(false))
            .run(&mut session, b"GIF89a")
            .await;

        assert!(matches!(result, Err(PublishError::UnsupportedImage)));
        assert!(display.lock().unwrap().uploads.is_empty());
    }

    #[tokio::test]
    async fn test_push_does_not_guess_id_after_lost_acknowledgement() {
        let display: Display = Arc::default();
        display.lock().unwrap().drop_upload_ack = true;
        let mut session = fake_session(&display);
        let store = MemoryStore::default();

        let result = PushImageUseCase::new(&store, settings(false))
            .run(&mut session, &png(10, 10))
            .await;

        assert!(matches!(
            result,
            Err(PublishError::Session(SessionError::Transport { operation: "upload", .. }))
        ));
        assert!(display.lock().unwrap().selected.is_empty());
        assert_eq!(store.load(), None);
    }
}
