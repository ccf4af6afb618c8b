//! HTTP surface against a simulated lock

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use safe_cli::commands::serve::auth::Credentials;
use safe_cli::commands::serve::{AppState, SharedController, router};
use safe_link::{ByteStream, DeviceLink, FakeDevice, LinkConfig};
use safe_model::{ImageRecord, Password, password_comment};
use safe_server::LockController;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn simulated_lock() -> FakeDevice {
    let mut stored: Option<String> = None;
    FakeDevice::with_responder(move |cmd| {
        let inner = cmd.trim_matches(':');
        let (verb, arg) = inner.split_once(':').unwrap_or((inner, ""));
        let reply = match verb {
            "ping" => format!("PINGACK:{arg}:"),
            "status" => "Status: unlocked".to_string(),
            "lock" => {
                stored = Some(arg.to_string());
                "OK locked".to_string()
            }
            "test" if stored.as_deref() == Some(arg) => "OK password correct".to_string(),
            "open" => {
                return vec![
                    "OK opening".to_string(),
                    "Opening 1".to_string(),
                    "OK completed".to_string(),
                ];
            }
            _ => "ERROR bad password".to_string(),
        };
        vec![reply]
    })
}

fn template_image() -> ImageRecord {
    ImageRecord {
        comment: b"template".to_vec(),
        start_of_frame: vec![8, 0, 1, 0, 1, 1, 1, 0x11, 0],
        start_of_scan: vec![1, 1, 0, 0, 63, 0],
        quantization_tables: vec![vec![0; 65]],
        huffman_tables: vec![vec![0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7]],
        scan_data: vec![0xf8, 0x00, 0x3f],
    }
}

struct TestServer {
    addr: SocketAddr,
    device: FakeDevice,
    _html: TempDir,
}

async fn start(auth: Option<Credentials>) -> TestServer {
    let html = TempDir::new().unwrap();
    std::fs::write(html.path().join("index.html"), "<h1>safe</h1>").unwrap();
    std::fs::create_dir(html.path().join("css")).unwrap();
    std::fs::write(html.path().join("css").join("index.html"), "css index").unwrap();

    let device = simulated_lock();
    let link = DeviceLink::new(
        Box::new(device.clone()) as Box<dyn ByteStream>,
        LinkConfig::default().with_settle(Duration::ZERO),
    );
    let controller: SharedController = Arc::new(LockController::new(link, template_image()));
    let state = AppState {
        controller,
        auth,
        html_dir: html.path().to_path_buf(),
        open_grace: Duration::from_secs(5),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router(state)).await });

    TestServer {
        addr,
        device,
        _html: html,
    }
}

/// Send a raw request and return the status line, headers and body
async fn send(addr: SocketAddr, head: &str, body: &[u8]) -> (String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response head");
    let head = String::from_utf8_lossy(&response[..split]).to_lowercase();
    (head, response[split + 4..].to_vec())
}

async fn get(addr: SocketAddr, path: &str, extra_headers: &str) -> (String, String) {
    let head =
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n{extra_headers}\r\n");
    let (head, body) = send(addr, &head, b"").await;
    (head, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status() {
    let server = start(None).await;

    let (head, body) = get(server.addr, "/safe/?status=1", "").await;

    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(head.contains("connection: close"), "{head}");
    assert!(body.contains("Status: unlocked<br>"), "{body}");
    assert_eq!(server.device.commands(), vec![":status::"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_form_path_without_slash_redirects() {
    let server = start(None).await;

    let (head, _) = get(server.addr, "/safe?status=1", "").await;

    assert!(head.starts_with("http/1.1 301"), "{head}");
    assert!(head.contains("location: /safe/?status=1"), "{head}");
    assert!(server.device.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_paths_below_form_take_actions() {
    let server = start(None).await;

    let (head, body) = get(server.addr, "/safe/index.php?status=1", "").await;

    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(body.contains("Status: unlocked<br>"), "{body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_request() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?launch=1", "").await;

    assert!(body.contains("Unknown request<br>"), "{body}");
    assert!(server.device.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lock_reports_both_steps() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?lock=1&lock1=Abc123&lock2=Abc123", "").await;

    assert!(body.contains("Setting password: OK locked<br>"), "{body}");
    assert!(body.contains("Testing password: OK password correct<br>"), "{body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_password_is_reported() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?pwtest=1&unlock=a%3Ab", "").await;

    assert!(
        body.contains("ERROR Password contains invalid characters. Letters and numbers only"),
        "{body}"
    );
    assert!(server.device.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_streams_progress() {
    let server = start(None).await;

    let (head, body) = get(server.addr, "/safe/?open=1&duration=2", "").await;

    assert!(head.contains("text/html"), "{head}");
    assert!(body.contains("<!--    "), "{body}");
    let opening = body.find("OK opening<br>").expect("first reply");
    let progress = body.find("Opening 1<br>").expect("progress");
    let completed = body.find("OK completed<br>").expect("sentinel");
    assert!(opening < progress && progress < completed);
    assert_eq!(server.device.commands(), vec![":open:2:"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_rejects_bad_duration() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?open=1&duration=5%3Alock", "").await;

    assert!(body.contains("ERROR Invalid duration"), "{body}");
    assert!(server.device.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_duration_markup_is_not_reflected() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?open=1&duration=%3Cb%3E", "").await;

    assert!(body.contains("ERROR Invalid duration. Whole seconds only<br>"), "{body}");
    assert!(!body.contains("<b>"), "{body}");
    assert!(server.device.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_random_downloads_password_image() {
    let server = start(None).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /safe/?random=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response).to_lowercase();

    assert!(text.contains("content-type: binary/octet-stream"), "{text}");
    assert!(
        text.contains("content-disposition: attachment; filename=\"safe-"),
        "{text}"
    );
    assert!(text.contains("lockpsw:"), "{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_upload_tests_password() {
    let server = start(None).await;
    get(server.addr, "/safe/?lock=1&lock1=Abc123&lock2=Abc123", "").await;

    let psw = Password::parse("Abc123").unwrap();
    let image = template_image().with_comment(password_comment(&psw)).to_bytes();
    let mut body = Vec::new();
    body.extend_from_slice(
        b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"image_test\"\r\n\r\nTest\r\n",
    );
    body.extend_from_slice(
        b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"fileToUpload\"; filename=\"key.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
    );
    body.extend_from_slice(&image);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
    let head = format!(
        "POST /safe/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: multipart/form-data; boundary=XBOUNDARY\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );

    let (head, reply) = send(server.addr, &head, &body).await;
    let reply = String::from_utf8_lossy(&reply);

    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(reply.contains("OK password correct<br>"), "{reply}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_action_without_file() {
    let server = start(None).await;

    let (_, body) = get(server.addr, "/safe/?image_unlock_all=1", "").await;

    assert!(body.contains("No file selected<br>"), "{body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_static_files() {
    let server = start(None).await;

    let (head, body) = get(server.addr, "/", "").await;
    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(head.contains("text/html"), "{head}");
    assert_eq!(body, "<h1>safe</h1>");

    let (_, body) = get(server.addr, "/css/", "").await;
    assert_eq!(body, "css index");

    let (head, _) = get(server.addr, "/missing.png", "").await;
    assert!(head.starts_with("http/1.1 404"), "{head}");

    let (head, _) = get(server.addr, "/css/../../etc/passwd", "").await;
    assert!(head.starts_with("http/1.1 404"), "{head}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_basic_auth() {
    let server = start(Some(Credentials::new("admin", "s3cret"))).await;

    let (head, body) = get(server.addr, "/safe/?status=1", "").await;
    assert!(head.starts_with("http/1.1 401"), "{head}");
    assert!(
        head.contains("www-authenticate: basic realm=\"restricted safe\""),
        "{head}"
    );
    assert!(body.contains("Unauthorized."));
    assert!(server.device.commands().is_empty());

    let (head, _) = get(server.addr, "/", "").await;
    assert!(head.starts_with("http/1.1 401"), "{head}");

    let authorization = format!("Authorization: Basic {}\r\n", STANDARD.encode("admin:s3cret"));
    let (head, body) = get(server.addr, "/safe/?status=1", &authorization).await;
    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(body.contains("Status: unlocked<br>"), "{body}");
}
