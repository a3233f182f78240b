//! End-to-end tests driving a full server over real sockets

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UnixDatagram;

use framecast::capture::property::Mirror;
use framecast::capture::{CameraProperty, CaptureControl, CaptureError, ChunkSender};
use framecast::client::client_path;
use framecast::config::{parse_lines, ConfigStore, OriginContext};
use framecast::{
    CaptureSettings, Chunk, Error, FrameClient, FrameServer, ServerConfig, SyntheticCapture,
};

/// Pushes a fixed list of chunks on the first start
#[derive(Default)]
struct ScriptedCapture {
    script: Vec<Chunk>,
    applied: Arc<Mutex<Vec<CameraProperty>>>,
}

impl ScriptedCapture {
    fn new(script: Vec<Chunk>) -> Self {
        Self {
            script,
            applied: Arc::default(),
        }
    }
}

impl CaptureControl for ScriptedCapture {
    fn start(&mut self, _settings: &CaptureSettings, sender: ChunkSender) -> Result<(), CaptureError> {
        for chunk in self.script.drain(..) {
            assert!(sender.push(chunk));
        }
        Ok(())
    }

    fn stop(&mut self) {}

    fn set_property(&mut self, property: CameraProperty) -> Result<(), CaptureError> {
        self.applied.lock().unwrap().push(property);
        Ok(())
    }
}

fn store(lines: &str) -> ConfigStore {
    let mut store = ConfigStore::new();
    parse_lines(&mut store, lines, OriginContext::CommandLine).unwrap();
    store.fill_defaults();
    store
}

fn chunk(len: usize, fill: u8, end: bool) -> Chunk {
    let data = Bytes::from(vec![fill; len]);
    if end {
        Chunk::frame_end(data)
    } else {
        Chunk::partial(data)
    }
}

fn comment_of(frame: &[u8]) -> String {
    // SOI, then COM marker and big-endian length
    let len = u16::from_be_bytes([frame[4], frame[5]]) as usize;
    String::from_utf8_lossy(&frame[6..4 + len]).into_owned()
}

#[tokio::test]
async fn test_overflow_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.bin");
    let script = vec![
        chunk(400, b'a', false),
        chunk(400, b'b', false),
        chunk(224, b'c', true),
        chunk(600, b'x', false),
        chunk(600, b'y', true),
        chunk(10, b'd', true),
    ];

    let config = ServerConfig::with_socket(dir.path().join("sock")).assembly_capacity(1024);
    let lines = format!("count=2\noutput={}\n", output.display());
    let server = FrameServer::bind(config, store(&lines), ScriptedCapture::new(script))
        .await
        .unwrap();

    let stats = server.run().await.unwrap();

    assert_eq!(stats.frames_emitted, 2);
    assert_eq!(stats.frames_dropped, 1);
    assert_eq!(stats.overflow_episodes, 1);

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), 1034);
    assert!(written[..1024].starts_with(&[b'a'; 400]));
    assert!(written[1024..].iter().all(|&b| b == b'd'));
    assert!(!written.contains(&b'x'));
}

#[tokio::test]
async fn test_liveness_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sock");
    let config = ServerConfig::with_socket(&path).liveness_timeout(Duration::from_millis(50));

    let server = FrameServer::bind(config, store(""), ScriptedCapture::default())
        .await
        .unwrap();
    let err = server.run().await.unwrap_err();

    assert!(matches!(err, Error::LivenessTimeout));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_control_lines_until_eof() {
    let dir = tempfile::tempdir().unwrap();
    let capture = ScriptedCapture::default();
    let applied = Arc::clone(&capture.applied);

    let mock = tokio_test::io::Builder::new()
        .read(b"quality=40\nquality=150\n")
        .read(b"# comment\nbogus=1\nhflip\n")
        .build();

    let config = ServerConfig::with_socket(dir.path().join("sock"));
    let server = FrameServer::bind(config, store(""), capture)
        .await
        .unwrap()
        .with_control(mock);
    server.run().await.unwrap();

    let applied = applied.lock().unwrap();
    // Startup batch first, then the live requests
    assert!(applied.contains(&CameraProperty::Quality(15)));
    assert_eq!(
        applied.iter().filter(|p| matches!(p, CameraProperty::Quality(_))).last(),
        Some(&CameraProperty::Quality(40))
    );
    assert!(!applied.contains(&CameraProperty::Quality(150)));
}

#[tokio::test]
async fn test_length_prefixed_control_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.bin");
    let capture = ScriptedCapture::new(vec![Chunk::frame_end(Bytes::from_static(b"abc"))]);
    let applied = Arc::clone(&capture.applied);

    let mock = tokio_test::io::Builder::new()
        .read(b"\x00\x00\x00\x0b")
        .read(b"quality=40\n")
        .build();

    let config = ServerConfig::with_socket(dir.path().join("sock"));
    let lines = format!("framing=header\noutput={}\n", output.display());
    let server = FrameServer::bind(config, store(&lines), capture)
        .await
        .unwrap()
        .with_control(mock);
    let stats = server.run().await.unwrap();

    assert_eq!(stats.frames_emitted, 1);
    assert_eq!(std::fs::read(&output).unwrap(), b"\x00\x00\x00\x03abc");
    assert_eq!(
        applied.lock().unwrap().last(),
        Some(&CameraProperty::Quality(40))
    );
}

#[tokio::test]
async fn test_undecodable_control_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let capture = ScriptedCapture::default();
    let applied = Arc::clone(&capture.applied);

    let mock = tokio_test::io::Builder::new()
        .read(b"quality=40\n\xff\xfe\nhflip\n")
        .build();

    let config = ServerConfig::with_socket(dir.path().join("sock"));
    let server = FrameServer::bind(config, store(""), capture)
        .await
        .unwrap()
        .with_control(mock);
    server.run().await.unwrap();

    let applied = applied.lock().unwrap();
    assert!(applied.contains(&CameraProperty::Quality(40)));
    assert_eq!(applied.last(), Some(&CameraProperty::Mirror(Mirror::Horizontal)));
}

#[tokio::test]
async fn test_live_switch_to_http_serves_after_request() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("response");

    let mock = tokio_test::io::Builder::new()
        .read(b"framing=http\n")
        .wait(Duration::from_millis(20))
        .read(b"GET /video HTTP/1.1\r\nHost: camera\r\n\r\n")
        .wait(Duration::from_secs(10))
        .build();

    let config = ServerConfig::with_socket(dir.path().join("sock"));
    let lines = format!("count=5\noutput={}\n", output.display());
    let server = FrameServer::bind(config, store(&lines), SyntheticCapture::new())
        .await
        .unwrap()
        .with_control(mock);
    let stats = tokio::time::timeout(Duration::from_secs(5), server.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.frames_emitted, 5);
    let written = std::fs::read(&output).unwrap();
    let text = String::from_utf8_lossy(&written);
    let (_, streamed) = text.split_once("HTTP/1.1 200 OK\r\n").unwrap();
    assert!(streamed.contains("Content-Type: image/jpeg\r\n"));
}

#[tokio::test]
async fn test_http_index_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("response");

    let mock = tokio_test::io::Builder::new()
        .read(b"GET / HTTP/1.1\r\nHost: camera\r\n\r\n")
        .build();

    let config = ServerConfig::with_socket(dir.path().join("sock"));
    let lines = format!("framing=http\noutput={}\n", output.display());
    let server = FrameServer::bind(config, store(&lines), SyntheticCapture::new())
        .await
        .unwrap()
        .with_control(mock);
    let stats = server.run().await.unwrap();

    assert_eq!(stats.frames_emitted, 0);
    let response = String::from_utf8(std::fs::read(&output).unwrap()).unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("<img src=\"/video\"/>"));
}

#[tokio::test]
async fn test_subscriber_reconfigures_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sock");
    let config = ServerConfig::with_socket(&path);
    let server = FrameServer::bind(config, store(""), SyntheticCapture::new())
        .await
        .unwrap();

    let subscriber = UnixDatagram::bind(dir.path().join("subscriber")).unwrap();
    let drive = async {
        subscriber.send_to(b"quality=40\n", &path).await.unwrap();

        let mut buf = vec![0u8; 128 * 1024];
        let mut seen = Vec::new();
        for _ in 0..10 {
            let (len, from) = subscriber.recv_from(&mut buf).await.unwrap();
            assert_eq!(from.as_pathname(), Some(path.as_path()));
            let frame = &buf[..len];
            assert_eq!(&frame[..2], &[0xFF, 0xD8]);
            assert_eq!(&frame[len - 2..], &[0xFF, 0xD9]);
            seen.push(comment_of(frame));
            if seen.last().is_some_and(|c| c.contains(" q40 ")) {
                break;
            }
        }

        subscriber.send_to(b"quit", &path).await.unwrap();
        seen
    };

    let (stats, seen) = tokio::join!(server.run(), drive);
    let stats = stats.unwrap();

    assert!(seen.last().unwrap().contains(" q40 "));
    assert!(stats.frames_delivered >= seen.len() as u64);
    assert_eq!(stats.datagrams_received, 2);
}

#[tokio::test]
async fn test_client_mode_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sock");
    let output = dir.path().join("client.mjpeg");

    let server = FrameServer::bind(
        ServerConfig::with_socket(&path),
        store(""),
        SyntheticCapture::new(),
    )
    .await
    .unwrap();

    let lines = format!(
        "socket={}\noutput={}\nframing=mime\ncount=3\nsend=annotation=hello\n",
        path.display(),
        output.display()
    );
    let client = FrameClient::connect(&store(&lines)).await.unwrap();

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let client_run = async {
        let stats = client.run().await;
        let _ = done_tx.send(());
        stats
    };
    let server_run = server.run_until(async {
        let _ = done_rx.await;
    });

    let (server_stats, client_stats) = tokio::join!(server_run, client_run);
    let client_stats = client_stats.unwrap();
    server_stats.unwrap();

    assert_eq!(client_stats.frames_received, 3);
    assert_eq!(client_stats.foreign_datagrams, 0);

    let written = std::fs::read(&output).unwrap();
    let text = String::from_utf8_lossy(&written);
    assert!(text.starts_with("MIME-Version: 1.0\r\n"));
    assert_eq!(text.matches("Content-Type: image/jpeg\r\n").count(), 3);
    assert!(!client_path(&path, std::process::id()).exists());
}
