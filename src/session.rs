//! Interactive session state: form input, loading flag and current image
//!
//! A session mirrors one screen of the app. Generation is the only operation
//! gated by the loading flag; share and save may run concurrently with each
//! other since each writes its own temp file.

use crate::codec::DisplayableImage;
use crate::error::{Error, PhotoAccess, Result};
use crate::output::OutputSink;
use crate::request::{LogoAttachment, QrRequest};
use crate::transport::QrService;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Text of the acknowledgment shown after a successful save
pub const SAVED_MESSAGE: &str = "QR code saved to gallery!";

/// Shared "request in flight" indicator
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    /// Whether a generation request is outstanding.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the flag, returning a guard that lowers it on drop.
    ///
    /// Returns `None` when the flag is already raised.
    fn raise(&self) -> Option<LoadingGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadingGuard(self.0.clone()))
    }
}

struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    /// Operation failed
    Error,
    /// Operation succeeded
    Success,
    /// Informational
    Info,
}

/// Auto-dismissing message presented after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Message text
    pub text: String,
}

impl Notice {
    /// Failure notice carrying the error's user message.
    pub fn error(err: &Error) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: err.user_message(),
        }
    }

    /// Success notice.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// Informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }
}

/// Form state plus the most recent generated image
pub struct Session {
    service: Arc<dyn QrService>,
    sink: OutputSink,
    url: String,
    logo: Option<LogoAttachment>,
    image: Option<DisplayableImage>,
    loading: LoadingFlag,
}

impl Session {
    /// Start an empty session.
    pub fn new(service: Arc<dyn QrService>, sink: OutputSink) -> Self {
        Self {
            service,
            sink,
            url: String::new(),
            logo: None,
            image: None,
            loading: LoadingFlag::default(),
        }
    }

    /// Replace the target URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Current target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether generation can be attempted with the current input.
    pub fn can_generate(&self) -> bool {
        !self.url.is_empty() && !self.loading.is_set()
    }

    /// Attach or replace the logo, subject to photo library read access.
    pub fn pick_logo(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        if !self.sink.permissions().granted(PhotoAccess::Read) {
            return Err(Error::Permission(PhotoAccess::Read));
        }
        let logo = LogoAttachment::new(path);
        tracing::debug!(logo = %logo.path().display(), replaced = self.logo.is_some(), "Logo selected");
        self.logo = Some(logo);
        Ok(())
    }

    /// Drop the attached logo.
    pub fn clear_logo(&mut self) {
        self.logo = None;
    }

    /// Path of the attached logo, if any
    pub fn logo(&self) -> Option<&Path> {
        self.logo.as_ref().map(LogoAttachment::path)
    }

    /// Handle observing the loading state
    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Most recent successfully generated image
    pub fn image(&self) -> Option<&DisplayableImage> {
        self.image.as_ref()
    }

    /// Request a QR code for the current input.
    ///
    /// On success the current image is replaced; on failure it is left as it
    /// was. The loading flag is cleared on every exit path.
    pub async fn generate(&mut self) -> Result<&DisplayableImage> {
        let request = QrRequest::new(self.url.clone(), self.logo.clone())?;

        let _guard = self
            .loading
            .raise()
            .ok_or_else(|| Error::Other("A QR code request is already in progress".to_string()))?;

        let image = generate_image(self.service.as_ref(), &request).await?;
        Ok(self.image.insert(image))
    }

    /// Share the current image.
    pub async fn share(&self) -> Result<PathBuf> {
        let image = self.image.as_ref().ok_or(Error::NoImage)?;
        self.sink.share(image).await
    }

    /// Save the current image into the photo library.
    pub async fn save(&self) -> Result<PathBuf> {
        let image = self.image.as_ref().ok_or(Error::NoImage)?;
        self.sink.save(image).await
    }
}

/// Run one request through the service and decode the reply.
pub async fn generate_image(
    service: &dyn QrService,
    request: &QrRequest,
) -> Result<DisplayableImage> {
    let hex_payload = service.generate(request).await?;
    let image = DisplayableImage::from_hex(&hex_payload).inspect_err(|e| {
        tracing::warn!(hex_len = hex_payload.len(), "Malformed QR payload: {e}");
    })?;
    tracing::info!(url = request.target_url(), "Generated QR code");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::platform::{ConfiguredPermissions, DirectoryLibrary, ShareTarget};
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct FixedService {
        reply: Mutex<Option<Result<String>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<QrRequest>>,
    }

    impl FixedService {
        fn replying(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl QrService for FixedService {
        async fn generate(&self, request: &QrRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::Transport { message: None }))
        }
    }

    struct NoopShare;

    #[async_trait::async_trait]
    impl ShareTarget for NoopShare {
        async fn share(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn sink(dir: &Path, permissions: ConfiguredPermissions) -> OutputSink {
        OutputSink::new(
            dir.join("cache"),
            Arc::new(NoopShare),
            Arc::new(DirectoryLibrary::new(dir.join("library"))),
            Arc::new(permissions),
        )
    }

    #[tokio::test]
    async fn empty_url_never_reaches_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("89504e47".to_string()));
        let mut session = Session::new(
            service.clone(),
            sink(dir.path(), ConfiguredPermissions::allow_all()),
        );

        assert!(!session.can_generate());
        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert!(session.image().is_none());
    }

    #[tokio::test]
    async fn generate_sets_image_and_clears_flag() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("89504e47".to_string()));
        let mut session = Session::new(
            service.clone(),
            sink(dir.path(), ConfiguredPermissions::allow_all()),
        );
        let flag = session.loading_flag();

        session.set_url("https://example.com");
        let image = session.generate().await.unwrap();
        assert_eq!(image.data_uri(), "data:image/png;base64,iVBORw==");
        assert!(!flag.is_set());
        assert!(session.can_generate());

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen[0].target_url(), "https://example.com");
        assert!(seen[0].logo().is_none());
    }

    #[tokio::test]
    async fn failure_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("00ff".to_string()));
        let mut session = Session::new(
            service.clone(),
            sink(dir.path(), ConfiguredPermissions::allow_all()),
        );
        session.set_url("https://example.com");
        session.generate().await.unwrap();

        let err = session.generate().await.unwrap_err();
        assert_eq!(Notice::error(&err).text, "Failed to generate QR code");
        assert_eq!(session.image().unwrap().to_bytes().unwrap(), vec![0x00, 0xff]);
        assert!(!session.loading_flag().is_set());
    }

    #[tokio::test]
    async fn malformed_payload_produces_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("89504e4".to_string()));
        let mut session =
            Session::new(service, sink(dir.path(), ConfiguredPermissions::allow_all()));
        session.set_url("https://example.com");

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(session.image().is_none());
    }

    #[tokio::test]
    async fn busy_flag_refuses_second_generation() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("00".to_string()));
        let mut session = Session::new(
            service.clone(),
            sink(dir.path(), ConfiguredPermissions::allow_all()),
        );
        session.set_url("https://example.com");

        let held = session.loading_flag().raise().unwrap();
        assert!(!session.can_generate());
        assert!(session.generate().await.is_err());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);

        drop(held);
        assert!(session.generate().await.is_ok());
    }

    #[tokio::test]
    async fn logo_pick_respects_read_permission() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("00".to_string()));
        let denied = ConfiguredPermissions {
            read: false,
            write: true,
        };
        let mut session = Session::new(service, sink(dir.path(), denied));

        let err = session.pick_logo("/tmp/logo.png").unwrap_err();
        assert_eq!(
            Notice::error(&err).text,
            "We need access to your photos to select a logo"
        );
        assert!(session.logo().is_none());
    }

    #[tokio::test]
    async fn logo_pick_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("00".to_string()));
        let mut session =
            Session::new(service, sink(dir.path(), ConfiguredPermissions::allow_all()));

        session.pick_logo("/tmp/first.png").unwrap();
        session.pick_logo("/tmp/second.jpg").unwrap();
        assert_eq!(session.logo(), Some(Path::new("/tmp/second.jpg")));

        session.clear_logo();
        assert!(session.logo().is_none());
    }

    #[tokio::test]
    async fn share_and_save_need_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("00".to_string()));
        let session = Session::new(service, sink(dir.path(), ConfiguredPermissions::allow_all()));

        let share = session.share().await.unwrap_err();
        let save = session.save().await.unwrap_err();
        assert_eq!(share.user_message(), "Generate a QR code first");
        assert_eq!(save.user_message(), "Generate a QR code first");
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn save_respects_write_permission() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("89504e47".to_string()));
        let denied = ConfiguredPermissions {
            read: true,
            write: false,
        };
        let mut session = Session::new(service, sink(dir.path(), denied));
        session.set_url("https://example.com");
        session.generate().await.unwrap();

        let err = session.save().await.unwrap_err();
        assert!(matches!(err, Error::Permission(PhotoAccess::Write)));
        assert!(!dir.path().join("library").exists());
    }

    #[tokio::test]
    async fn concurrent_share_and_save_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = FixedService::replying(Ok("89504e47".to_string()));
        let mut session =
            Session::new(service, sink(dir.path(), ConfiguredPermissions::allow_all()));
        session.set_url("https://example.com");
        session.generate().await.unwrap();

        let (first, second, saved) =
            tokio::join!(session.share(), session.share(), session.save());
        let (first, second, saved) = (first.unwrap(), second.unwrap(), saved.unwrap());

        assert_ne!(first, second);
        assert_eq!(tokio::fs::read(&first).await.unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);
        assert!(saved.starts_with(dir.path().join("library")));
        assert_eq!(Notice::success(SAVED_MESSAGE).kind, NoticeKind::Success);
    }
}
