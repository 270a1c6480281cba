//! Side socket that carries the image bytes of an upload.
//!
//! The art channel only negotiates the upload.  The display then opens a
//! one-shot TCP listener (TLS when `secured` is set) and expects the
//! length-prefixed header followed by the raw file.  The connection is
//! closed by the sender once everything is written.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use weatherart_core::domain::artwork::ImageFileType;
use weatherart_core::protocol::{encode_upload_header, UploadTarget};

use crate::application::device_session::LinkError;

/// Errors raised while sending image bytes.
#[derive(Debug, Error)]
pub enum UploadSocketError {
    #[error("upload socket I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("upload socket TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}

impl From<UploadSocketError> for LinkError {
    fn from(e: UploadSocketError) -> Self {
        LinkError::transport(e)
    }
}

/// Builds a TLS connector that accepts the display's self-signed
/// certificate.
pub(crate) fn device_tls_connector() -> Result<native_tls::TlsConnector, native_tls::Error> {
    native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
}

/// Connects to `target` and writes header plus `bytes`.
///
/// # Errors
///
/// Returns [`UploadSocketError`] if connecting, the TLS handshake, or any
/// write fails.
pub async fn send_image(
    target: &UploadTarget,
    bytes: &[u8],
    file_type: ImageFileType,
) -> Result<(), UploadSocketError> {
    let header = encode_upload_header(bytes.len(), file_type, &target.key);
    let stream = TcpStream::connect((target.ip, target.port)).await?;
    debug!(ip = %target.ip, port = target.port, secured = target.secured, "upload socket connected");

    if target.secured {
        let connector = tokio_native_tls::TlsConnector::from(device_tls_connector()?);
        let mut tls = connector.connect(&target.ip.to_string(), stream).await?;
        write_payload(&mut tls, &header, bytes).await?;
    } else {
        let mut stream = stream;
        write_payload(&mut stream, &header, bytes).await?;
    }
    debug!(bytes = bytes.len(), "image bytes sent");
    Ok(())
}

async fn write_payload<W>(writer: &mut W, header: &[u8], bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(header).await?;
    writer.write_all(bytes).await?;
    writer.flush().await?;
    writer.shutdown().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_plain_upload_writes_header_then_bytes() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });
        let target = UploadTarget {
            ip: addr.ip(),
            port: addr.port(),
            key: "s3cret".to_string(),
            secured: false,
        };

        // Act
        send_image(&target, b"IMAGEDATA", ImageFileType::Png)
            .await
            .unwrap();
        let received = server.await.unwrap();

        // Assert
        let len = u32::from_be_bytes(received[..4].try_into().unwrap()) as usize;
        let header: Value = serde_json::from_slice(&received[4..4 + len]).unwrap();
        assert_eq!(header["secKey"], "s3cret");
        assert_eq!(header["fileLength"], 9);
        assert_eq!(&received[4 + len..], b"IMAGEDATA");
    }

    #[tokio::test]
    async fn test_refused_connection_is_io_error() {
        let port = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let target = UploadTarget {
            ip: "127.0.0.1".parse().unwrap(),
            port,
            key: String::new(),
            secured: false,
        };

        let result = send_image(&target, b"x", ImageFileType::Jpeg).await;

        assert!(matches!(result, Err(UploadSocketError::Io(_))));
    }
}
