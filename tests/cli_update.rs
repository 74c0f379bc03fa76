use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use predicates::prelude::*;

const TOKEN: &str = "123456:test-token";
const CHAT_ID: &str = "-100777";

struct StubServer {
    base_url: String,
    posts: Arc<Mutex<Vec<String>>>,
    requested: Arc<Mutex<Vec<String>>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl StubServer {
    fn link(&self, id: u32) -> String {
        format!("{}/music.yandex/album/{id}/track/{id}", self.base_url)
    }

    fn set_posts(&self, posts: &[&str]) {
        *self.posts.lock().unwrap() = posts.iter().map(|post| (*post).to_owned()).collect();
        self.requested.lock().unwrap().clear();
    }

    fn page_requests(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|path| path.starts_with("/music.yandex/"))
            .cloned()
            .collect()
    }

    fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.join();
    }
}

fn track_page(id: u32) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta property="og:title" content="Песня {id}">
    <meta property="og:description" content="Исполнитель {id} · 2024">
    <meta property="og:image" content="https://avatars.yandex.net/get-music-content/{id}/400x400">
  </head>
  <body></body>
</html>
"#
    )
}

/// Serves `getUpdates` (one channel post per entry of `posts`, with `{base}`
/// expanded to the server URL) and track pages under `/music.yandex/`.
/// Track 404 has no `og:title`.
fn spawn_stub(posts: &[&str]) -> StubServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let posts = Arc::new(Mutex::new(
        posts.iter().map(|post| (*post).to_owned()).collect::<Vec<_>>(),
    ));
    let requested = Arc::new(Mutex::new(Vec::new()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let base_for_thread = base_url.clone();
    let posts_for_thread = Arc::clone(&posts);
    let requested_for_thread = Arc::clone(&requested);
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let path = request
                .url()
                .split('?')
                .next()
                .unwrap_or_default()
                .to_owned();
            requested_for_thread.lock().unwrap().push(path.clone());

            let (status, body) = if path == format!("/bot{TOKEN}/getUpdates") {
                let updates: Vec<serde_json::Value> = posts_for_thread
                    .lock()
                    .unwrap()
                    .iter()
                    .enumerate()
                    .map(|(idx, post)| {
                        serde_json::json!({
                            "update_id": idx + 1,
                            "channel_post": {
                                "message_id": idx + 100,
                                "chat": {"id": CHAT_ID.parse::<i64>().unwrap(), "type": "channel"},
                                "text": post.replace("{base}", &base_for_thread),
                            }
                        })
                    })
                    .collect();
                (200, serde_json::json!({"ok": true, "result": updates}).to_string())
            } else if path == "/music.yandex/album/404/track/404" {
                (
                    200,
                    r#"<html><head><meta property="og:description" content="d"><meta property="og:image" content="i"></head></html>"#
                        .to_owned(),
                )
            } else if let Some(id) = path
                .strip_prefix("/music.yandex/album/")
                .and_then(|rest| rest.split('/').next())
                .and_then(|id| id.parse::<u32>().ok())
            {
                (200, track_page(id))
            } else {
                (404, "not found".to_owned())
            };

            let header = tiny_http::Header::from_bytes(
                &b"Content-Type"[..],
                &b"text/html; charset=utf-8"[..],
            )
            .expect("build header");
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });

    StubServer {
        base_url,
        posts,
        requested,
        shutdown_tx,
        handle,
    }
}

fn update_cmd(workdir: &Path, api_base: &str) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jenmusic");
    cmd.current_dir(workdir)
        .env("TELEGRAM_TOKEN", TOKEN)
        .env("TELEGRAM_CHAT_ID", CHAT_ID)
        .env("TELEGRAM_API_BASE", api_base)
        .args(["update", "--timeout-secs", "5"]);
    cmd
}

fn read_log(workdir: &Path) -> Vec<String> {
    let raw = fs::read_to_string(workdir.join("docs/log.json")).expect("read log");
    serde_json::from_str(&raw).expect("parse log")
}

#[test]
fn update_adds_fetched_tracks_and_skips_broken_ones() -> anyhow::Result<()> {
    let stub = spawn_stub(&[
        "Слушаем: {base}/music.yandex/album/1/track/1",
        "{base}/music.yandex/album/404/track/404 and https://example.com/not-music",
    ]);
    let temp = tempfile::TempDir::new()?;

    update_cmd(temp.path(), &stub.base_url)
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping link"));

    assert_eq!(read_log(temp.path()), vec![stub.link(1)]);

    let html = fs::read_to_string(temp.path().join("docs/index.html"))?;
    assert_eq!(html.matches(&stub.link(1)).count(), 1);
    assert!(html.contains("<strong>Песня 1</strong>"));
    assert!(html.contains("<p>Исполнитель 1 · 2024</p>"));
    assert!(html.contains("https://avatars.yandex.net/get-music-content/1/400x400"));
    assert!(!html.contains("album/404"));
    assert!(!html.contains("example.com"));
    assert!(temp.path().join("docs/tracks.json").exists());

    stub.stop();
    Ok(())
}

#[test]
fn second_run_fetches_only_new_links() -> anyhow::Result<()> {
    let stub = spawn_stub(&["{base}/music.yandex/album/1/track/1"]);
    let temp = tempfile::TempDir::new()?;

    update_cmd(temp.path(), &stub.base_url).assert().success();

    let html_before = fs::read_to_string(temp.path().join("docs/index.html"))?;
    let block_start = html_before
        .find(r#"<div class="track-block">"#)
        .expect("first block");
    let block_end = html_before.find("</body>").expect("closing body");
    let first_block = html_before[block_start..block_end].to_owned();

    stub.set_posts(&[
        "{base}/music.yandex/album/1/track/1",
        "again {base}/music.yandex/album/2/track/2",
    ]);
    update_cmd(temp.path(), &stub.base_url).assert().success();

    assert_eq!(
        stub.page_requests(),
        vec!["/music.yandex/album/2/track/2".to_owned()]
    );
    assert_eq!(read_log(temp.path()), vec![stub.link(1), stub.link(2)]);

    let html = fs::read_to_string(temp.path().join("docs/index.html"))?;
    assert!(html.contains(&first_block));
    assert_eq!(html.matches(&stub.link(1)).count(), 1);
    assert!(html.find(&stub.link(1)) < html.find(&stub.link(2)));

    stub.stop();
    Ok(())
}

#[test]
fn empty_channel_still_produces_a_page() -> anyhow::Result<()> {
    let stub = spawn_stub(&["nothing to see here"]);
    let temp = tempfile::TempDir::new()?;

    update_cmd(temp.path(), &stub.base_url).assert().success();

    let html = fs::read_to_string(temp.path().join("docs/index.html"))?;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>JenMusic</title>"));
    assert!(!html.contains(r#"<div class="track-block">"#));
    assert!(read_log(temp.path()).is_empty());

    stub.stop();
    Ok(())
}

#[test]
fn missing_token_fails_before_touching_files() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jenmusic");
    cmd.current_dir(temp.path())
        .env_remove("TELEGRAM_TOKEN")
        .env("TELEGRAM_CHAT_ID", CHAT_ID)
        .args(["update"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TELEGRAM_TOKEN is not set"));

    assert!(!temp.path().join("docs").exists());
    Ok(())
}

#[test]
fn telegram_error_is_fatal() -> anyhow::Result<()> {
    let stub = spawn_stub(&[]);
    let temp = tempfile::TempDir::new()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jenmusic");
    cmd.current_dir(temp.path())
        .env("TELEGRAM_TOKEN", "000:revoked")
        .env("TELEGRAM_CHAT_ID", CHAT_ID)
        .env("TELEGRAM_API_BASE", &stub.base_url)
        .args(["update"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch channel messages"))
        .stderr(predicate::str::contains("000:revoked").not());

    assert!(!temp.path().join("docs/index.html").exists());
    stub.stop();
    Ok(())
}

#[test]
fn render_without_state_writes_empty_page() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jenmusic");
    cmd.current_dir(temp.path())
        .args(["render", "--title", "Мой плейлист"])
        .assert()
        .success();

    let html = fs::read_to_string(temp.path().join("docs/index.html"))?;
    assert!(html.contains("<title>Мой плейлист</title>"));
    Ok(())
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jenmusic");
    cmd.current_dir(temp.path())
        .env("RUST_LOG", "debug")
        .args(["render"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
