//! WebSocket link to the display's Art Mode application.
//!
//! [`ArtChannel`] owns one open WebSocket and implements
//! [`DeviceLink`].  Requests are sent as `ms.channel.emit` frames and the
//! link then reads frames until the matching `d2d_service_message`
//! arrives.  Frames that answer something else (broadcasts, late replies
//! to earlier requests) are logged and skipped.
//!
//! Matching rules:
//!
//! - A response whose `id`/`request_id` equals the request's id matches.
//! - A response without any id matches if its event name is one the
//!   request expects.  Older firmware omits the id on some replies.
//! - An `error` response for the request's id (or without an id) fails the
//!   request with [`LinkError::Remote`].
//!
//! `select_image` is the one request the device does not always answer.
//! The link waits [`SELECT_REPLY_WAIT`] for `image_selected` or an error
//! and treats silence as success.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::error::ProtocolError as WsProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;
use weatherart_core::protocol::{
    channel_url, encode_request, parse_event, ArtRequest, ArtResponse, ChannelEvent,
};
use weatherart_core::{ArtworkItem, ContentId, UploadRequest};

use super::upload::{device_tls_connector, send_image};
use super::ArtChannelConfig;
use crate::application::device_session::{DeviceConnector, DeviceLink, LinkError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `select_image` waits for a reply before assuming success.
pub const SELECT_REPLY_WAIT: Duration = Duration::from_secs(2);

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens [`ArtChannel`]s.
pub struct ArtChannelConnector {
    config: ArtChannelConfig,
}

impl ArtChannelConnector {
    pub fn new(config: ArtChannelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DeviceConnector for ArtChannelConnector {
    async fn connect(&self, addr: SocketAddr) -> Result<Box<dyn DeviceLink>, LinkError> {
        let url = channel_url(
            self.config.secure,
            addr.ip(),
            addr.port(),
            &self.config.client_name,
            self.config.token.as_deref(),
        );
        let connector = if self.config.secure {
            Some(Connector::NativeTls(
                device_tls_connector().map_err(LinkError::transport)?,
            ))
        } else {
            None
        };

        debug!(%addr, secure = self.config.secure, "opening art channel");
        let (ws, _response) = connect_async_tls_with_config(url.as_str(), None, false, connector)
            .await
            .map_err(LinkError::transport)?;
        info!(%addr, "art channel open");
        Ok(Box::new(ArtChannel::new(ws)))
    }
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// One open art channel.
pub struct ArtChannel {
    ws: Socket,
    closed: bool,
}

impl ArtChannel {
    pub fn new(ws: Socket) -> Self {
        Self { ws, closed: false }
    }

    /// Sends `request` with a fresh id and returns that id.
    async fn send(&mut self, request: &ArtRequest) -> Result<Uuid, LinkError> {
        let id = Uuid::new_v4();
        let frame = encode_request(request, id).map_err(LinkError::transport)?;
        debug!(request = request.name(), %id, "art request");
        self.ws
            .send(Message::text(frame))
            .await
            .map_err(map_ws_error)?;
        Ok(id)
    }

    /// Reads the next parseable event from the channel.
    async fn next_event(&mut self) -> Result<ChannelEvent, LinkError> {
        loop {
            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => return Err(LinkError::Disconnected),
            };
            match message {
                Message::Text(text) => match parse_event(&text) {
                    Ok(event) => return Ok(event),
                    Err(e) => warn!(error = %e, "ignoring unparseable frame"),
                },
                Message::Close(frame) => {
                    debug!(?frame, "device closed the art channel");
                    return Err(LinkError::Disconnected);
                }
                _ => {}
            }
        }
    }

    /// Reads until a response to `id` with one of the `expected` events
    /// arrives.
    async fn await_response(
        &mut self,
        id: Uuid,
        expected: &[&str],
    ) -> Result<ArtResponse, LinkError> {
        loop {
            match self.next_event().await? {
                ChannelEvent::Art(response) => {
                    let mine = response.answers(id);
                    let unaddressed = response.id.is_none();
                    if let Some(code) = response.error_code() {
                        if mine || unaddressed {
                            return Err(LinkError::Remote { code });
                        }
                        continue;
                    }
                    if expected.contains(&response.event.as_str()) && (mine || unaddressed) {
                        return Ok(response);
                    }
                    debug!(event = %response.event, "skipping unrelated art response");
                }
                ChannelEvent::Unauthorized => return Err(LinkError::Denied),
                ChannelEvent::Connected { .. } | ChannelEvent::Ready => {}
                ChannelEvent::Other { event } => debug!(%event, "skipping channel event"),
            }
        }
    }
}

#[async_trait]
impl DeviceLink for ArtChannel {
    async fn authorize(&mut self) -> Result<Option<String>, LinkError> {
        let mut token = None;
        loop {
            match self.next_event().await? {
                ChannelEvent::Connected { token: issued } => {
                    debug!(token_issued = issued.is_some(), "channel connected");
                    if issued.is_some() {
                        token = issued;
                    }
                }
                ChannelEvent::Ready => return Ok(token),
                ChannelEvent::Unauthorized => return Err(LinkError::Denied),
                ChannelEvent::Art(_) | ChannelEvent::Other { .. } => {}
            }
        }
    }

    async fn list(&mut self, category: Option<&str>) -> Result<Vec<ArtworkItem>, LinkError> {
        let id = self
            .send(&ArtRequest::ContentList {
                category: category.map(str::to_string),
            })
            .await?;
        let response = self.await_response(id, &["content_list"]).await?;
        let items = response.content_list().map_err(LinkError::transport)?;
        Ok(match category {
            Some(category) => items
                .into_iter()
                .filter(|item| item.category == category)
                .collect(),
            None => items,
        })
    }

    async fn upload(
        &mut self,
        bytes: &[u8],
        request: &UploadRequest,
    ) -> Result<ContentId, LinkError> {
        let connection_id = Uuid::new_v4().as_u128() as u32;
        let id = self
            .send(&ArtRequest::SendImage {
                file_type: request.file_type,
                file_size: bytes.len(),
                matte: request.matte.clone(),
                image_date: request.image_date.clone(),
                connection_id,
            })
            .await?;

        let ready = self.await_response(id, &["ready_to_use"]).await?;
        let target = ready.upload_target().map_err(LinkError::transport)?;
        debug!(ip = %target.ip, port = target.port, "device ready for image bytes");
        send_image(&target, bytes, request.file_type).await?;

        let added = self.await_response(id, &["image_added"]).await?;
        added
            .content_id()
            .ok_or_else(|| LinkError::transport("image_added carried no content_id"))
    }

    async fn select(&mut self, id: &ContentId, category: Option<&str>) -> Result<(), LinkError> {
        let request_id = self
            .send(&ArtRequest::SelectImage {
                content_id: id.clone(),
                category: category.map(str::to_string),
                show: true,
            })
            .await?;
        let reply = time::timeout(
            SELECT_REPLY_WAIT,
            self.await_response(request_id, &["image_selected"]),
        )
        .await;
        match reply {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                debug!(content_id = %id, "no reply to select_image; assuming it was shown");
                Ok(())
            }
        }
    }

    async fn delete(&mut self, id: &ContentId) -> Result<(), LinkError> {
        let request_id = self
            .send(&ArtRequest::DeleteImageList {
                content_ids: vec![id.clone()],
            })
            .await?;
        self.await_response(request_id, &["image_deleted"]).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "art channel close was not clean");
        }
    }
}

/// Sorts WebSocket failures into "channel is gone" and everything else.
fn map_ws_error(e: WsError) -> LinkError {
    match e {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(WsProtocolError::ResetWithoutClosingHandshake) => {
            LinkError::Disconnected
        }
        WsError::Io(io) if is_disconnect(&io) => LinkError::Disconnected,
        other => LinkError::transport(other),
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
