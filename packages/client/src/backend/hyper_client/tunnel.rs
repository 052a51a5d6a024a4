//! HTTP CONNECT tunnel establishment
//!
//! Opens a tunnel to `host:port` through an already connected proxy socket,
//! with optional `Proxy-Authorization`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::BoxError;

/// Upper bound on the proxy's CONNECT response head.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Send `CONNECT` and wait for a 2xx answer. The returned stream is
/// positioned right after the proxy's response head.
pub(super) async fn establish(
    mut stream: TcpStream,
    host: &str,
    port: u16,
    authorization: Option<&str>,
) -> Result<TcpStream, BoxError> {
    let authority = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };

    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if let Some(auth) = authorization {
        request.push_str("Proxy-Authorization: ");
        request.push_str(auth);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");

    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let head = read_response_head(&mut stream).await?;
    let status_line = head.lines().next().unwrap_or_default().trim().to_string();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| format!("malformed CONNECT response: {status_line}"))?;

    match status {
        200..=299 => {
            tracing::trace!("CONNECT tunnel to {authority} established");
            Ok(stream)
        }
        407 => Err(format!("proxy authentication required for {authority}: {status_line}").into()),
        _ => Err(format!("CONNECT to {authority} failed: {status_line}").into()),
    }
}

// Byte-wise so nothing after the head is consumed before the TLS handshake.
async fn read_response_head(stream: &mut TcpStream) -> Result<String, BoxError> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await? == 0 {
            return Err("proxy closed the connection during CONNECT".into());
        }
        head.push(byte[0]);
        if head.len() > MAX_RESPONSE_HEAD {
            return Err("CONNECT response head too large".into());
        }
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}
