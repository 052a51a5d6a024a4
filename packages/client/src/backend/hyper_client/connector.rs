//! Socket factory for the hyper client.
//!
//! [`ProxyConnector`] turns a target URI into a ready transport: plain TCP,
//! TCP through a CONNECT tunnel, and TLS on top for `https` targets. The
//! whole setup runs under the connect deadline.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use super::tunnel;
use crate::error::{BoxError, TimedOut};

/// Proxy every connection of this connector goes through.
#[derive(Debug, Clone)]
pub(crate) struct ProxyHop {
    pub host: String,
    pub port: u16,
    /// Ready `Proxy-Authorization` value
    pub authorization: Option<String>,
}

#[derive(Clone)]
pub(crate) struct ProxyConnector {
    tls: TlsConnector,
    connect_timeout: Duration,
    proxy: Option<Arc<ProxyHop>>,
}

impl std::fmt::Debug for ProxyConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConnector")
            .field("connect_timeout", &self.connect_timeout)
            .field("proxy", &self.proxy.as_ref().map(|p| format!("{}:{}", p.host, p.port)))
            .finish()
    }
}

impl ProxyConnector {
    pub fn new(
        tls: Arc<rustls::ClientConfig>,
        connect_timeout: Duration,
        proxy: Option<ProxyHop>,
    ) -> Self {
        Self {
            tls: TlsConnector::from(tls),
            connect_timeout,
            proxy: proxy.map(Arc::new),
        }
    }

    async fn connect(self, dst: Uri) -> Result<Conn, BoxError> {
        let secure = dst.scheme_str() == Some("https");
        let host = dst
            .host()
            .ok_or_else(|| format!("missing host in {dst}"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = dst.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let (tcp, proxied) = match &self.proxy {
            None => (open_tcp(&host, port).await?, false),
            Some(hop) => {
                let tcp = open_tcp(&hop.host, hop.port).await?;
                if secure {
                    (tunnel::establish(tcp, &host, port, hop.authorization.as_deref()).await?, false)
                } else {
                    // Plain targets are forwarded in absolute form
                    (tcp, true)
                }
            }
        };

        let stream = if secure {
            let server_name = ServerName::try_from(host.as_str())?.to_owned();
            let tls = self.tls.connect(server_name, tcp).await?;
            TransportStream::Tls(Box::new(tls))
        } else {
            TransportStream::Plain(tcp)
        };

        Ok(Conn {
            io: TokioIo::new(stream),
            proxied,
        })
    }
}

async fn open_tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

impl tower_service::Service<Uri> for ProxyConnector {
    type Response = Conn;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Conn, BoxError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let connector = self.clone();
        let deadline = self.connect_timeout;
        Box::pin(async move {
            match tokio::time::timeout(deadline, connector.connect(dst)).await {
                Ok(result) => result,
                Err(_) => Err(Box::new(TimedOut) as BoxError),
            }
        })
    }
}

/// Plain or TLS socket.
pub(crate) enum TransportStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            TransportStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            TransportStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            TransportStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Plain(s) => Pin::new(s).poll_flush(cx),
            TransportStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            TransportStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Connection handed to hyper.
pub(crate) struct Conn {
    io: TokioIo<TransportStream>,
    proxied: bool,
}

impl Connection for Conn {
    fn connected(&self) -> Connected {
        Connected::new().proxy(self.proxied)
    }
}

impl hyper::rt::Read for Conn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl hyper::rt::Write for Conn {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}
