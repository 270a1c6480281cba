//! Art-channel message types.
//!
//! The display exposes a WebSocket channel per application.  Art Mode lives
//! at `/api/v2/channels/com.samsung.art-app`.  Traffic is JSON text frames:
//!
//! ```text
//! client → device   {"method":"ms.channel.emit",
//!                    "params":{"event":"art_app_request","to":"host",
//!                              "data":"{\"request\":\"get_content_list\",\"id\":\"…\"}"}}
//!
//! device → client   {"event":"ms.channel.connect","data":{"token":"…"}}
//!                   {"event":"ms.channel.ready"}
//!                   {"event":"d2d_service_message",
//!                    "data":"{\"event\":\"content_list\",\"id\":\"…\",…}"}
//! ```
//!
//! Note the double encoding: the inner `data` is itself a JSON document
//! carried as a string.  Every request carries a fresh UUID `id` and the
//! device echoes it (as `id` or `request_id`) in the matching response.

use std::net::{IpAddr, SocketAddr};

use base64::Engine as _;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::ProtocolError;
use crate::domain::artwork::{parse_device_timestamp, ArtworkItem, ContentId, ImageFileType};

/// Path of the Art Mode channel.
pub const ART_CHANNEL_PATH: &str = "/api/v2/channels/com.samsung.art-app";

const EVENT_CONNECT: &str = "ms.channel.connect";
const EVENT_READY: &str = "ms.channel.ready";
const EVENT_UNAUTHORIZED: &str = "ms.channel.unauthorized";
const EVENT_D2D: &str = "d2d_service_message";

/// Builds the channel URL.
///
/// The client name is shown on the TV's approval prompt and is sent
/// base64-encoded.  A previously issued `token` skips the prompt.
///
/// ```rust
/// use weatherart_core::protocol::channel_url;
///
/// let url = channel_url(true, "192.168.1.20".parse().unwrap(), 8002, "WeatherArt", None);
/// assert_eq!(
///     url,
///     "wss://192.168.1.20:8002/api/v2/channels/com.samsung.art-app?name=V2VhdGhlckFydA=="
/// );
/// ```
pub fn channel_url(
    secure: bool,
    host: IpAddr,
    port: u16,
    client_name: &str,
    token: Option<&str>,
) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let name = base64::engine::general_purpose::STANDARD.encode(client_name);
    let mut url = format!(
        "{scheme}://{}{ART_CHANNEL_PATH}?name={name}",
        SocketAddr::new(host, port)
    );
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.push_str("&token=");
        url.push_str(token);
    }
    url
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// A request sent to the art application.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtRequest {
    /// List stored items, optionally restricted to one category.
    ContentList { category: Option<String> },
    /// Announce an upload; the device answers with a socket to send bytes to.
    SendImage {
        file_type: ImageFileType,
        file_size: usize,
        matte: String,
        image_date: String,
        connection_id: u32,
    },
    /// Display a stored item.
    SelectImage {
        content_id: ContentId,
        category: Option<String>,
        show: bool,
    },
    /// Delete stored items.
    DeleteImageList { content_ids: Vec<ContentId> },
}

impl ArtRequest {
    /// The `request` name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ArtRequest::ContentList { .. } => "get_content_list",
            ArtRequest::SendImage { .. } => "send_image",
            ArtRequest::SelectImage { .. } => "select_image",
            ArtRequest::DeleteImageList { .. } => "delete_image_list",
        }
    }

    /// The inner `data` document for this request.
    pub fn to_data(&self, id: Uuid) -> Value {
        let id = id.to_string();
        let mut data = match self {
            ArtRequest::ContentList { category } => {
                let mut data = json!({});
                if let Some(category) = category {
                    data["category"] = json!(category);
                }
                data
            }
            ArtRequest::SendImage {
                file_type,
                file_size,
                matte,
                image_date,
                connection_id,
            } => json!({
                "file_type": file_type.as_str(),
                "conn_info": {
                    "d2d_mode": "socket",
                    "connection_id": connection_id,
                    "id": id,
                },
                "image_date": image_date,
                "matte_id": matte,
                "portrait_matte_id": matte,
                "file_size": file_size,
            }),
            ArtRequest::SelectImage {
                content_id,
                category,
                show,
            } => json!({
                "category_id": category,
                "content_id": content_id,
                "show": show,
            }),
            ArtRequest::DeleteImageList { content_ids } => json!({
                "content_id_list": content_ids
                    .iter()
                    .map(|id| json!({ "content_id": id }))
                    .collect::<Vec<_>>(),
            }),
        };
        data["request"] = json!(self.name());
        data["id"] = json!(id);
        data["request_id"] = json!(id);
        data
    }
}

/// Encodes `request` as a complete `ms.channel.emit` text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if serialisation fails.
pub fn encode_request(request: &ArtRequest, id: Uuid) -> Result<String, ProtocolError> {
    let data = serde_json::to_string(&request.to_data(id))?;
    let envelope = json!({
        "method": "ms.channel.emit",
        "params": {
            "event": "art_app_request",
            "to": "host",
            "data": data,
        },
    });
    Ok(serde_json::to_string(&envelope)?)
}

// ── Events ────────────────────────────────────────────────────────────────────

/// An event received on the art channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The device accepted the connection.  Carries a pairing token when the
    /// user approved a new client.
    Connected { token: Option<String> },
    /// The art application is ready for requests.
    Ready,
    /// The user (or device policy) refused the connection.
    Unauthorized,
    /// A response from the art application.
    Art(ArtResponse),
    /// Anything else; ignored by the client.
    Other { event: String },
}

/// The decoded inner document of a `d2d_service_message`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtResponse {
    pub event: String,
    /// Request id echoed by the device, if any.
    pub id: Option<String>,
    pub body: Map<String, Value>,
}

/// Where the device wants the image bytes sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub ip: IpAddr,
    pub port: u16,
    pub key: String,
    pub secured: bool,
}

/// Parses one text frame from the channel.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame is not JSON or a
/// `d2d_service_message` carries an undecodable `data` document.
pub fn parse_event(text: &str) -> Result<ChannelEvent, ProtocolError> {
    let frame: Value = serde_json::from_str(text)?;
    let event = frame
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("event"))?;

    match event {
        EVENT_CONNECT => {
            let token = frame
                .get("data")
                .and_then(|d| d.get("token"))
                .and_then(scalar_to_string);
            Ok(ChannelEvent::Connected { token })
        }
        EVENT_READY => Ok(ChannelEvent::Ready),
        EVENT_UNAUTHORIZED => Ok(ChannelEvent::Unauthorized),
        EVENT_D2D => {
            let inner = match frame.get("data") {
                Some(Value::String(s)) => serde_json::from_str::<Value>(s)?,
                Some(other) => other.clone(),
                None => return Err(ProtocolError::MissingField("data")),
            };
            let Value::Object(body) = inner else {
                return Err(ProtocolError::Malformed {
                    field: "data",
                    reason: "expected a JSON object".to_string(),
                });
            };
            let event = body
                .get("event")
                .and_then(Value::as_str)
                .ok_or(ProtocolError::MissingField("event"))?
                .to_string();
            let id = ["request_id", "id"]
                .iter()
                .find_map(|key| body.get(*key).and_then(scalar_to_string));
            Ok(ChannelEvent::Art(ArtResponse { event, id, body }))
        }
        other => Ok(ChannelEvent::Other {
            event: other.to_string(),
        }),
    }
}

/// Renders a JSON string or number as a string.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a field that the device may send either as a nested document or
/// as a JSON string containing that document.
fn nested(body: &Map<String, Value>, field: &'static str) -> Result<Value, ProtocolError> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(serde_json::from_str(s)?),
        Some(other) => Ok(other.clone()),
        None => Err(ProtocolError::MissingField(field)),
    }
}

impl ArtResponse {
    /// `true` if this response answers the request with `id`.
    pub fn answers(&self, id: Uuid) -> bool {
        self.id.as_deref() == Some(id.to_string().as_str())
    }

    /// The device's error code if this is an `error` response.
    pub fn error_code(&self) -> Option<String> {
        if self.event != "error" {
            return None;
        }
        Some(
            self.body
                .get("error_code")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "unknown".to_string()),
        )
    }

    /// Parses the `content_list` of a `get_content_list` response.
    ///
    /// Entries without a `content_id` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the list is missing or not an array.
    pub fn content_list(&self) -> Result<Vec<ArtworkItem>, ProtocolError> {
        let Value::Array(entries) = nested(&self.body, "content_list")? else {
            return Err(ProtocolError::Malformed {
                field: "content_list",
                reason: "expected an array".to_string(),
            });
        };
        Ok(entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("content_id").and_then(scalar_to_string)?;
                Some(ArtworkItem {
                    id: ContentId::new(id),
                    category: entry
                        .get("category_id")
                        .and_then(scalar_to_string)
                        .unwrap_or_default(),
                    created: entry
                        .get("image_date")
                        .and_then(Value::as_str)
                        .and_then(parse_device_timestamp),
                    digest: entry.get("digest").and_then(scalar_to_string),
                })
            })
            .collect())
    }

    /// The `content_id` carried by `image_added` and similar responses.
    pub fn content_id(&self) -> Option<ContentId> {
        self.body
            .get("content_id")
            .and_then(scalar_to_string)
            .map(ContentId::new)
    }

    /// Parses the `conn_info` of a `ready_to_use` response.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if a field is missing or malformed.
    pub fn upload_target(&self) -> Result<UploadTarget, ProtocolError> {
        let info = nested(&self.body, "conn_info")?;
        let field = |name: &'static str| info.get(name).ok_or(ProtocolError::MissingField(name));

        let ip = scalar_to_string(field("ip")?)
            .and_then(|s| s.parse::<IpAddr>().ok())
            .ok_or_else(|| ProtocolError::Malformed {
                field: "ip",
                reason: "not an IP address".to_string(),
            })?;
        let port = scalar_to_string(field("port")?)
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| ProtocolError::Malformed {
                field: "port",
                reason: "not a port number".to_string(),
            })?;
        let key = scalar_to_string(field("key")?).ok_or_else(|| ProtocolError::Malformed {
            field: "key",
            reason: "expected a string".to_string(),
        })?;
        let secured = match info.get("secured") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        Ok(UploadTarget {
            ip,
            port,
            key,
            secured,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
