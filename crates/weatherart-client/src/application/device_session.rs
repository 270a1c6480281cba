//! DeviceSession: the connection lifecycle to one display.
//!
//! # State machine (for beginners)
//!
//! ```text
//!            first operation
//!   Idle ─────────────────────► Connecting ──► Connected ──► Authorized ◄─┐
//!     │        (wake + grace)        │              │            │  list  │
//!     │                              │ attempts     │ timeout /  │ upload │
//!     │ close()                      │ exhausted    │ refusal    │ select │
//!     ▼                              ▼              ▼            │ delete ┘
//!   Closed ◄──── close() ──────── Failed ◄──────────┘            │
//!     ▲                              ▲   channel lost            │
//!     └──────────── close() ─────────┼───────────────────────────┘
//! ```
//!
//! The session does nothing on the network until the first device
//! operation.  That operation optionally wakes the display, connects with a
//! bounded number of attempts, and waits for the pairing handshake.  After
//! that every operation is one request/response exchange under its own
//! timeout.
//!
//! The wake grace interval is only waited out when a packet was actually
//! sent ([`WakeOutcome::Sent`]).  A skipped or failed wake cannot have
//! started the display, so the session goes straight to connecting.
//!
//! `Failed` and `Closed` are terminal: any further operation returns
//! [`SessionError::Unusable`].  The session is used from one task at a time
//! (`&mut self` everywhere) and never retries anything in the background.
//!
//! # Seams
//!
//! The session owns no sockets itself.  Address resolution and the wake
//! packet come from a [`DeviceLocator`]; the channel comes from a
//! [`DeviceConnector`] that hands back a [`DeviceLink`].  The infrastructure
//! layer provides the real implementations; tests use recording doubles.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{self, error::Elapsed};
use tracing::{debug, info, warn};
use weatherart_core::{ArtworkItem, CleanupFilter, ContentId, DeviceEndpoint, UploadRequest};

// ── Locator seam ──────────────────────────────────────────────────────────────

/// Error raised when the display's address cannot be determined.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// No address is configured and the MAC could not be found.
    #[error("device address is unresolvable: {reason}")]
    Unresolvable { reason: String },
}

/// What happened to a wake request.  Waking never fails the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The magic packet left the host.
    Sent { target: SocketAddr },
    /// Nothing was sent, e.g. because no MAC is configured.
    Skipped { reason: String },
    /// The socket refused to send.
    Failed { reason: String },
}

/// Finds and wakes the display.
pub trait DeviceLocator: Send + Sync {
    /// Returns the socket address of the art channel.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Unresolvable`] when neither a configured
    /// address nor a neighbour-table entry for the MAC exists.
    fn resolve(&self, endpoint: &DeviceEndpoint) -> Result<SocketAddr, LocatorError>;

    /// Broadcasts a Wake-on-LAN packet.  Fire-and-forget.
    fn wake(&self, endpoint: &DeviceEndpoint) -> WakeOutcome;
}

// ── Channel seam ──────────────────────────────────────────────────────────────

/// Errors reported by a [`DeviceLink`] or [`DeviceConnector`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// Network or framing problem; the channel may still be usable.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The channel is gone and cannot carry further requests.
    #[error("channel closed by the device")]
    Disconnected,

    /// The device answered with an error.
    #[error("device returned error {code}")]
    Remote { code: String },

    /// The device (or its user) refused the pairing request.
    #[error("pairing refused by the device")]
    Denied,
}

impl LinkError {
    pub fn transport(reason: impl fmt::Display) -> Self {
        LinkError::Transport {
            reason: reason.to_string(),
        }
    }
}

/// Opens channels to the display.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Opens a channel.  Does not wait for the pairing handshake.
    async fn connect(&self, addr: SocketAddr) -> Result<Box<dyn DeviceLink>, LinkError>;
}

/// One open channel to the display.
///
/// Dropping a link releases its transport.
#[async_trait]
pub trait DeviceLink: Send {
    /// Waits for the pairing handshake.  Returns the pairing token the device
    /// issued, if any.
    async fn authorize(&mut self) -> Result<Option<String>, LinkError>;

    /// Lists stored items, restricted to `category` when given.
    async fn list(&mut self, category: Option<&str>) -> Result<Vec<ArtworkItem>, LinkError>;

    /// Stores an image and returns its new id.
    async fn upload(
        &mut self,
        bytes: &[u8],
        request: &UploadRequest,
    ) -> Result<ContentId, LinkError>;

    /// Displays a stored item.
    async fn select(&mut self, id: &ContentId, category: Option<&str>) -> Result<(), LinkError>;

    /// Deletes one stored item.
    async fn delete(&mut self, id: &ContentId) -> Result<(), LinkError>;

    /// Closes the channel gracefully.
    async fn close(&mut self);
}

// ── Session types ─────────────────────────────────────────────────────────────

/// Lifecycle state of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Authorized,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Authorized => "authorized",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Timing and wake behaviour of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Limit for a single connection attempt.
    pub connect_timeout: Duration,
    /// Total connection attempts before giving up.  Values below 1 act as 1.
    pub connect_attempts: u32,
    /// Fixed pause between failed attempts.
    pub retry_backoff: Duration,
    /// How long to wait for the user to approve pairing.
    pub authorization_timeout: Duration,
    /// Limit for list / select / delete exchanges.
    pub request_timeout: Duration,
    /// Limit for a whole upload, including the byte transfer.
    pub upload_timeout: Duration,
    /// Send a Wake-on-LAN packet before connecting.
    pub wake: bool,
    /// Pause after a wake packet was sent.
    pub wake_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            connect_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            authorization_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
            upload_timeout: Duration::from_secs(25),
            wake: false,
            wake_grace: Duration::from_secs(8),
        }
    }
}

/// Errors returned by [`DeviceSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The display's address could not be determined.
    #[error(transparent)]
    Unresolvable(#[from] LocatorError),

    /// Every connection attempt failed or timed out.
    #[error("device at {addr} unreachable after {attempts} attempt(s)")]
    Unreachable { addr: SocketAddr, attempts: u32 },

    /// The pairing prompt was not answered in time.
    #[error("pairing was not approved within {after:?}")]
    AuthorizationTimeout { after: Duration },

    /// The pairing request was refused.
    #[error("pairing was refused by the device")]
    AuthorizationDenied,

    /// An exchange failed on the wire.  The caller may retry.
    #[error("{operation} failed: {reason}")]
    Transport {
        operation: &'static str,
        reason: String,
    },

    /// The device rejected the request.  Not retried.
    #[error("{operation} rejected by the device with error {code}")]
    Remote {
        operation: &'static str,
        code: String,
    },

    /// The session is closed or failed.
    #[error("session is {state} and cannot be used")]
    Unusable { state: SessionState },
}

/// Result of deleting one item during [`DeviceSession::remove_by_filter`].
#[derive(Debug)]
pub struct DeletionOutcome {
    pub id: ContentId,
    pub result: Result<(), SessionError>,
}

impl DeletionOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

// ── DeviceSession ─────────────────────────────────────────────────────────────

/// A serial, stateful connection to one display.
pub struct DeviceSession {
    endpoint: DeviceEndpoint,
    addr: SocketAddr,
    locator: Arc<dyn DeviceLocator>,
    connector: Arc<dyn DeviceConnector>,
    config: SessionConfig,
    state: SessionState,
    link: Option<Box<dyn DeviceLink>>,
    token: Option<String>,
}

impl DeviceSession {
    /// Creates a session in the `Idle` state.
    ///
    /// The address is resolved here, before anything is woken or connected,
    /// so a display that cannot be located fails fast.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unresolvable`] if the locator cannot produce
    /// an address.
    pub fn open(
        endpoint: DeviceEndpoint,
        locator: Arc<dyn DeviceLocator>,
        connector: Arc<dyn DeviceConnector>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let addr = locator.resolve(&endpoint)?;
        debug!(%addr, "device address resolved");
        Ok(Self {
            endpoint,
            addr,
            locator,
            connector,
            config,
            state: SessionState::Idle,
            link: None,
            token: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Address of the art channel.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Pairing token issued by the device during this session, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Lists stored items.
    ///
    /// # Errors
    ///
    /// Any connection error on first use, then `Transport`, `Remote`, or
    /// `Unusable`.
    pub async fn list(&mut self, category: Option<&str>) -> Result<Vec<ArtworkItem>, SessionError> {
        self.ensure_authorized().await?;
        let limit = self.config.request_timeout;
        let link = self.link_mut()?;
        let result = time::timeout(limit, link.list(category)).await;
        self.settle("list", limit, result)
    }

    /// Uploads an encoded image.
    ///
    /// A `Transport` error does not prove the image was not stored; callers
    /// that need the id should list the category again.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list), with the upload timeout.
    pub async fn upload(
        &mut self,
        bytes: &[u8],
        request: &UploadRequest,
    ) -> Result<ContentId, SessionError> {
        self.ensure_authorized().await?;
        let limit = self.config.upload_timeout;
        let link = self.link_mut()?;
        let result = time::timeout(limit, link.upload(bytes, request)).await;
        let id = self.settle("upload", limit, result)?;
        info!(content_id = %id, bytes = bytes.len(), "image uploaded");
        Ok(id)
    }

    /// Displays a stored item.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list).
    pub async fn select(
        &mut self,
        id: &ContentId,
        category: Option<&str>,
    ) -> Result<(), SessionError> {
        self.ensure_authorized().await?;
        let limit = self.config.request_timeout;
        let link = self.link_mut()?;
        let result = time::timeout(limit, link.select(id, category)).await;
        self.settle("select", limit, result)
    }

    /// Deletes one stored item.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list).
    pub async fn delete(&mut self, id: &ContentId) -> Result<(), SessionError> {
        self.ensure_authorized().await?;
        let limit = self.config.request_timeout;
        let link = self.link_mut()?;
        let result = time::timeout(limit, link.delete(id)).await;
        self.settle("delete", limit, result)
    }

    /// Lists, filters client-side, and deletes every match individually.
    ///
    /// Returns one outcome per matching item.  A failed deletion does not
    /// stop the remaining ones.
    ///
    /// # Errors
    ///
    /// Only the initial listing can fail the whole call.
    pub async fn remove_by_filter(
        &mut self,
        filter: &CleanupFilter,
    ) -> Result<Vec<DeletionOutcome>, SessionError> {
        let items = self.list(filter.category.as_deref()).await?;
        let matches: Vec<ContentId> = items
            .into_iter()
            .filter(|item| filter.matches(item))
            .map(|item| item.id)
            .collect();
        debug!(matches = matches.len(), "cleanup filter applied");

        let mut outcomes = Vec::with_capacity(matches.len());
        for id in matches {
            let result = self.delete(&id).await;
            if let Err(e) = &result {
                warn!(content_id = %id, "could not delete: {e}");
            }
            outcomes.push(DeletionOutcome { id, result });
        }
        Ok(outcomes)
    }

    /// Releases the channel.  Idempotent; a failed session stays `Failed`.
    pub async fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if time::timeout(self.config.request_timeout, link.close())
                .await
                .is_err()
            {
                debug!("graceful close timed out; dropping the channel");
            }
        }
        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        debug!(state = %self.state, "session closed");
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn link_mut(&mut self) -> Result<&mut (dyn DeviceLink + 'static), SessionError> {
        let state = self.state;
        self.link
            .as_deref_mut()
            .ok_or(SessionError::Unusable { state })
    }

    fn fail(&mut self) {
        self.state = SessionState::Failed;
        self.link = None;
    }

    /// Drives `Idle` to `Authorized`.  A no-op once authorized.
    async fn ensure_authorized(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Authorized => return Ok(()),
            SessionState::Idle => {}
            state => return Err(SessionError::Unusable { state }),
        }

        if self.config.wake {
            self.wake().await;
        }

        self.state = SessionState::Connecting;
        let mut link = match self.connect_with_retry().await {
            Ok(link) => link,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };
        self.state = SessionState::Connected;
        info!(addr = %self.addr, "channel open; waiting for pairing approval");

        let limit = self.config.authorization_timeout;
        let error = match time::timeout(limit, link.authorize()).await {
            Ok(Ok(token)) => {
                if token.is_some() {
                    self.token = token;
                }
                self.link = Some(link);
                self.state = SessionState::Authorized;
                info!(addr = %self.addr, "session authorized");
                return Ok(());
            }
            Ok(Err(LinkError::Denied)) => SessionError::AuthorizationDenied,
            Ok(Err(e)) => SessionError::Transport {
                operation: "authorize",
                reason: e.to_string(),
            },
            Err(_) => SessionError::AuthorizationTimeout { after: limit },
        };
        warn!("pairing failed: {error}");
        let _ = time::timeout(self.config.request_timeout, link.close()).await;
        self.fail();
        Err(error)
    }

    async fn wake(&mut self) {
        match self.locator.wake(&self.endpoint) {
            WakeOutcome::Sent { target } => {
                info!(%target, grace = ?self.config.wake_grace, "wake packet sent; waiting for the display");
                time::sleep(self.config.wake_grace).await;
            }
            WakeOutcome::Skipped { reason } => warn!("wake skipped: {reason}"),
            WakeOutcome::Failed { reason } => warn!("wake packet not sent: {reason}"),
        }
    }

    async fn connect_with_retry(&mut self) -> Result<Box<dyn DeviceLink>, SessionError> {
        let attempts = self.config.connect_attempts.max(1);
        for attempt in 1..=attempts {
            match time::timeout(self.config.connect_timeout, self.connector.connect(self.addr))
                .await
            {
                Ok(Ok(link)) => {
                    debug!(attempt, addr = %self.addr, "connected");
                    return Ok(link);
                }
                Ok(Err(e)) => warn!(attempt, attempts, addr = %self.addr, "connect failed: {e}"),
                Err(_) => warn!(
                    attempt,
                    attempts,
                    addr = %self.addr,
                    "connect timed out after {:?}",
                    self.config.connect_timeout
                ),
            }
            if attempt < attempts {
                time::sleep(self.config.retry_backoff).await;
            }
        }
        Err(SessionError::Unreachable {
            addr: self.addr,
            attempts,
        })
    }

    /// Maps one exchange result onto the session, moving to `Failed` when
    /// the channel is gone.
    fn settle<T>(
        &mut self,
        operation: &'static str,
        limit: Duration,
        result: Result<Result<T, LinkError>, Elapsed>,
    ) -> Result<T, SessionError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(LinkError::Remote { code })) => Err(SessionError::Remote { operation, code }),
            Ok(Err(LinkError::Transport { reason })) => {
                Err(SessionError::Transport { operation, reason })
            }
            Ok(Err(LinkError::Disconnected)) => {
                self.fail();
                Err(SessionError::Transport {
                    operation,
                    reason: LinkError::Disconnected.to_string(),
                })
            }
            Ok(Err(LinkError::Denied)) => {
                self.fail();
                Err(SessionError::AuthorizationDenied)
            }
            Err(_) => Err(SessionError::Transport {
                operation,
                reason: format!("no response within {limit:?}"),
            }),
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.link.take().is_some() {
            debug!(addr = %self.addr, "session dropped without close(); channel released");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
