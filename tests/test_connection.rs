use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use portal::http::connection::Connection;
use portal::portal::files::DocumentRoot;
use portal::portal::persist::CredentialFile;
use portal::portal::Router;
use portal::server::ShutdownSignal;

#[derive(Default)]
struct CountingShutdown(AtomicUsize);

impl ShutdownSignal for CountingShutdown {
    fn schedule(&self, _delay: Duration) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    router: Arc<Router>,
    shutdown: Arc<CountingShutdown>,
    credentials: PathBuf,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let docroot = dir.path().join("htdocs");
    std::fs::create_dir(&docroot).unwrap();
    std::fs::write(docroot.join("splash.html"), "<h1>portal</h1>").unwrap();
    std::fs::write(docroot.join("app.js"), "console.log(1);").unwrap();

    let credentials = dir.path().join("wifi-config.txt");
    let shutdown = Arc::new(CountingShutdown::default());
    let router = Router::new(
        DocumentRoot::new(&docroot, "splash.html"),
        "http://192.168.4.1:2050/splash.html",
        CredentialFile::new(&credentials),
        shutdown.clone(),
        Duration::from_secs(5),
    );

    Fixture {
        router: Arc::new(router),
        shutdown,
        credentials,
        _dir: dir,
    }
}

/// Sends `input`, half-closes, and collects everything the server wrote
/// until it hung up.
async fn exchange(router: Arc<Router>, input: &[u8]) -> String {
    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, router);
        conn.run().await
    });

    client.write_all(input).await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap().unwrap();
    String::from_utf8(out).unwrap()
}

fn responses(raw: &str) -> usize {
    raw.matches("HTTP/1.1 ").count()
}

#[tokio::test]
async fn test_keep_alive_serves_several_requests() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"GET / HTTP/1.1\r\nHost: a\r\n\r\nGET /app.js HTTP/1.1\r\nHost: a\r\n\r\n",
    )
    .await;

    assert_eq!(responses(&out), 2);
    assert!(out.contains("<h1>portal</h1>"));
    assert!(out.contains("Content-Type: application/javascript"));
    assert!(out.ends_with("console.log(1);"));
}

#[tokio::test]
async fn test_http10_closes_after_one_response() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"GET / HTTP/1.0\r\n\r\nGET / HTTP/1.0\r\n\r\n",
    )
    .await;

    assert_eq!(responses(&out), 1);
    assert!(out.contains("Connection: close"));
}

#[tokio::test]
async fn test_probe_redirect_on_the_wire() {
    let f = fixture();
    let out = exchange(f.router.clone(), b"GET /generate_204 HTTP/1.1\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 307 Temporary Redirect\r\n"));
    assert!(out.contains("Location: http://192.168.4.1:2050/splash.html\r\n"));
}

#[tokio::test]
async fn test_malformed_request_gets_400_and_close() {
    let f = fixture();
    let out = exchange(f.router.clone(), b"NOT A VALID REQUEST\r\n\r\nGET / HTTP/1.1\r\n\r\n").await;

    assert_eq!(responses(&out), 1);
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("Connection: close"));
    assert!(out.contains("<h1>400 - Bad Request</h1>"));
}

#[tokio::test]
async fn test_form_post_with_content_length() {
    let f = fixture();
    let body = "ssid=MyNet&password=secret123";
    let request = format!(
        "POST /save HTTP/1.1\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let out = exchange(f.router.clone(), request.as_bytes()).await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("WiFi configuration saved successfully!"));
    assert_eq!(
        std::fs::read_to_string(&f.credentials).unwrap(),
        "MyNet\nsecret123\n"
    );
    assert_eq!(f.shutdown.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chunked_form_post_then_next_request() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"POST /save HTTP/1.1\r\n\
          Content-Type: application/x-www-form-urlencoded\r\n\
          Transfer-Encoding: chunked\r\n\r\n\
          9\r\nssid=MyNe\r\n\
          E\r\nt&password=abc\r\n\
          0\r\n\r\n\
          GET / HTTP/1.1\r\n\r\n",
    )
    .await;

    assert_eq!(responses(&out), 2);
    assert_eq!(std::fs::read_to_string(&f.credentials).unwrap(), "MyNet\nabc\n");
    assert!(out.ends_with("<h1>portal</h1>"));
}

#[tokio::test]
async fn test_bad_chunk_framing_gets_400() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"POST /save HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nssid=x\r\n0\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(!f.credentials.exists());
}

#[tokio::test]
async fn test_disconnect_mid_body_saves_nothing() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"POST /save HTTP/1.1\r\nContent-Length: 100\r\n\r\nssid=MyNet&password=sec",
    )
    .await;

    assert!(out.is_empty());
    assert!(!f.credentials.exists());
    assert_eq!(f.shutdown.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_method_with_body_closes() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"PUT /save HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
    )
    .await;

    assert_eq!(responses(&out), 1);
    assert!(out.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(out.contains("Connection: close"));
}

#[tokio::test]
async fn test_head_response_has_no_body() {
    let f = fixture();
    let out = exchange(
        f.router.clone(),
        b"HEAD / HTTP/1.1\r\nHost: x\r\n\r\nGET /generate_204 HTTP/1.1\r\n\r\n",
    )
    .await;

    assert_eq!(responses(&out), 2);
    let (first, rest) = out.split_once("\r\n\r\n").unwrap();
    assert!(first.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(first.contains("Content-Length: 107"));
    // the next response starts right after the blank line
    assert!(rest.starts_with("HTTP/1.1 307 Temporary Redirect\r\n"));
}
