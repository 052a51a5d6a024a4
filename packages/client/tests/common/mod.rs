//! Local servers shared by the integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::Redirect;
use axum::routing::{any, get};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use rcgen::CertifiedKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use outbound_client::{AppSettings, HttpClientService};

/// Self-signed certificate and key for a test TLS server.
pub struct TlsIdentity {
    pub cert: CertificateDer<'static>,
    pub pem: String,
    key: PrivateKeyDer<'static>,
}

pub fn self_signed(names: &[&str]) -> TlsIdentity {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(names.iter().map(|n| n.to_string()).collect::<Vec<_>>())
            .expect("generate self-signed certificate");
    TlsIdentity {
        cert: cert.der().clone(),
        pem: cert.pem(),
        key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
    }
}

/// Routes every contract test talks to.
pub fn app() -> Router {
    Router::new()
        .route("/hello", get(|| async { "hello" }))
        .route("/echo", any(echo))
        .route(
            "/json",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"ok":true}"#) }),
        )
        .route(
            "/bytes",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], vec![0u8, 1, 2, 3, 255]) }),
        )
        .route("/large", get(|| async { "x".repeat(64 * 1024) }))
        .route("/redirect", get(|| async { Redirect::temporary("/hello") }))
        .route("/agent", get(user_agent))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        )
        .route("/teapot", get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }))
        // Not valid UTF-8, and no Content-Type
        .route("/raw", get(|| async { Body::from(vec![0xffu8, 0xfe, 0x41]) }))
        .route("/big", get(|| async { "y".repeat(4096) }))
        .route(
            "/latin1",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/plain; charset=ISO-8859-1")],
                    Body::from(vec![0x63u8, 0x61, 0x66, 0xe9]),
                )
            }),
        )
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> String {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    format!("{method} {content_type} {}", String::from_utf8_lossy(&body))
}

async fn user_agent(headers: HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    listener.set_nonblocking(true).expect("non-blocking listener");
    let addr = listener.local_addr().expect("listener address");
    (listener, addr)
}

fn run_in_background<F>(server: impl FnOnce() -> F + Send + 'static)
where
    F: std::future::Future<Output = ()>,
{
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("test server runtime");
        runtime.block_on(server());
    });
}

/// Serve `app` over plain HTTP on an ephemeral port.
pub fn spawn_http(app: Router) -> SocketAddr {
    let (listener, addr) = bind();
    run_in_background(move || async move {
        let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
        axum::serve(listener, app).await.expect("serve http");
    });
    addr
}

/// Serve `app` over TLS with `identity` on an ephemeral port.
pub fn spawn_https(app: Router, identity: &TlsIdentity) -> SocketAddr {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![identity.cert.clone()], identity.key.clone_key())
        .expect("server certificate");
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    let (listener, addr) = bind();
    let tls = RustlsConfig::from_config(Arc::new(config));
    run_in_background(move || async move {
        axum_server::from_tcp_rustls(listener, tls)
            .serve(app.into_make_service())
            .await
            .expect("serve https");
    });
    addr
}

/// Forward proxy that answers plain requests itself, reporting what it saw.
pub fn spawn_recording_proxy() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, headers: HeaderMap| async move {
        let auth = headers
            .get(header::PROXY_AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        format!("proxied {uri} auth={auth}")
    });
    spawn_http(app)
}

/// CONNECT proxy that records each request head and relays bytes.
pub struct ConnectProxy {
    pub addr: SocketAddr,
    heads: Arc<Mutex<Vec<String>>>,
}

impl ConnectProxy {
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().expect("heads lock").clone()
    }
}

pub fn spawn_connect_proxy() -> ConnectProxy {
    let (listener, addr) = bind();
    let heads = Arc::new(Mutex::new(Vec::new()));
    let recorded = heads.clone();

    run_in_background(move || async move {
        let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
        loop {
            let Ok((mut inbound, _)) = listener.accept().await else {
                continue;
            };
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    match inbound.read(&mut byte).await {
                        Ok(1) => head.push(byte[0]),
                        _ => return,
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                recorded.lock().expect("heads lock").push(head);

                let Ok(mut outbound) = tokio::net::TcpStream::connect(target.as_str()).await else {
                    let _ = inbound.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
                    return;
                };
                if inbound
                    .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                    .await
                    .is_err()
                {
                    return;
                }
                let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
            });
        }
    });

    ConnectProxy { addr, heads }
}

/// One step of a scripted HTTP/1.1 exchange.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Send(&'static [u8]),
    Pause(Duration),
}

/// Server that answers every connection by replaying `script` byte for
/// byte, after reading the request head. Lets tests control reason phrases
/// and pauses in the middle of a body.
pub fn spawn_scripted(script: Vec<Step>) -> SocketAddr {
    let (listener, addr) = bind();
    run_in_background(move || async move {
        let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                continue;
            };
            let script = script.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    match stream.read(&mut byte).await {
                        Ok(1) => head.push(byte[0]),
                        _ => return,
                    }
                }
                for step in script {
                    match step {
                        Step::Send(bytes) => {
                            if stream.write_all(bytes).await.is_err() {
                                return;
                            }
                            let _ = stream.flush().await;
                        }
                        Step::Pause(duration) => tokio::time::sleep(duration).await,
                    }
                }
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("address")
}

/// Settings tuned for fast local tests.
pub fn settings(implementation: &str) -> AppSettings {
    AppSettings::default()
        .with_implementation(implementation)
        .with_connect_timeout(Duration::from_secs(2))
        .with_socket_timeout(Duration::from_secs(5))
        .with_request_timeout(Duration::from_secs(10))
}

pub fn service(settings: AppSettings) -> HttpClientService {
    HttpClientService::open(settings).expect("open service")
}

/// Backend names every contract test runs against.
pub const BACKENDS: [&str; 2] = ["hyper", "reqwest"];
