//! End-to-end tests against a live daemon socket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::sync::broadcast;

use hotkeys::config::BindingsFile;
use hotkeys::events::HotkeyEvent;
use hotkeys::hotkey::{ElementContext, HotKeys, Key, KeyEvent, Modifiers};
use hotkeys::ipc::{read_message, write_message, Notification, Request, Response, Server};

const BINDINGS: &str = r#"{
    "bindings": [
        {"chord": "Ctrl+S", "action": "save", "description": "Save document"},
        {"chord": "H", "action": "go_home"}
    ],
    "double_taps": [{"modifier": "ctrl", "action": "palette"}]
}"#;

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hotkeys-{}-{name}.sock", std::process::id()))
}

/// Start a daemon serving the test bindings
async fn start(name: &str) -> (Arc<Server>, PathBuf) {
    let hotkeys = HotKeys::new();
    let (events, _) = broadcast::channel::<HotkeyEvent>(16);
    // Dropping the scope leaves its bindings registered
    BindingsFile::parse(BINDINGS)
        .unwrap()
        .apply(&hotkeys, &events)
        .unwrap();

    let path = socket_path(name);
    let server = Arc::new(Server::new(&path, hotkeys, events).unwrap());
    let runner = Arc::clone(&server);
    tokio::spawn(async move { runner.run().await });
    (server, path)
}

async fn request(stream: &mut UnixStream, request: &Request) -> Response {
    write_message(stream, request).await.unwrap();
    read_message(stream).await.unwrap().unwrap()
}

fn dispatch(key: Key, modifiers: Modifiers, at_ms: u64) -> Request {
    Request::Dispatch {
        event: KeyEvent::new(key, modifiers, Duration::from_millis(at_ms)),
        focused: None,
    }
}

#[tokio::test]
async fn ping_and_status() {
    let (server, path) = start("status").await;
    let mut stream = UnixStream::connect(&path).await.unwrap();

    assert_eq!(request(&mut stream, &Request::Ping).await, Response::Pong);

    match request(&mut stream, &Request::GetStatus).await {
        Response::Status(status) => {
            assert_eq!(status.active_bindings, 3);
            assert_eq!(status.double_tap_window_ms, 500);
        }
        other => panic!("unexpected response {other:?}"),
    }

    server.shutdown().await;
    assert!(!path.exists());
}

#[tokio::test]
async fn dispatch_reports_matches() {
    let (server, path) = start("dispatch").await;
    let mut stream = UnixStream::connect(&path).await.unwrap();

    let hit = request(&mut stream, &dispatch(Key::S, Modifiers::CTRL, 0)).await;
    assert_eq!(
        hit,
        Response::Dispatched {
            matched: true,
            should_prevent_default: true
        }
    );

    // Extra modifier does not match
    let ctrl_shift = Modifiers::CTRL | Modifiers::SHIFT;
    let miss = request(&mut stream, &dispatch(Key::S, ctrl_shift, 10)).await;
    assert_eq!(
        miss,
        Response::Dispatched {
            matched: false,
            should_prevent_default: false
        }
    );

    // Plain bindings stay quiet while typing
    let typing = Request::Dispatch {
        event: KeyEvent::new(Key::H, Modifiers::empty(), Duration::from_millis(20))
            .in_context(ElementContext::TextInput),
        focused: None,
    };
    assert!(matches!(
        request(&mut stream, &typing).await,
        Response::Dispatched { matched: false, .. }
    ));

    // The daemon classifies a reported focused element itself
    let search_box = serde_json::json!({
        "type": "dispatch",
        "event": {"key": "H", "timestamp_ms": 30},
        "focused": {"tag_name": "INPUT", "input_type": "search"}
    });
    write_message(&mut stream, &search_box).await.unwrap();
    let response: Response = read_message(&mut stream).await.unwrap().unwrap();
    assert!(matches!(response, Response::Dispatched { matched: false, .. }));

    server.shutdown().await;
}

#[tokio::test]
async fn list_bindings_in_registration_order() {
    let (server, path) = start("list").await;
    let mut stream = UnixStream::connect(&path).await.unwrap();

    match request(&mut stream, &Request::ListBindings).await {
        Response::Bindings { bindings } => {
            let triggers: Vec<String> = bindings.iter().map(|b| b.trigger.to_string()).collect();
            assert_eq!(triggers, vec!["Ctrl+S", "H", "Ctrl (double tap)"]);
            assert_eq!(bindings[0].description.as_deref(), Some("Save document"));
        }
        other => panic!("unexpected response {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn malformed_request_gets_error_and_connection_survives() {
    let (server, path) = start("malformed").await;
    let mut stream = UnixStream::connect(&path).await.unwrap();

    write_message(&mut stream, &serde_json::json!({"type": "launch_rockets"}))
        .await
        .unwrap();
    let response: Response = read_message(&mut stream).await.unwrap().unwrap();
    assert!(matches!(response, Response::Error { ref code, .. } if code == "bad_request"));

    assert_eq!(request(&mut stream, &Request::Ping).await, Response::Pong);

    server.shutdown().await;
}

#[tokio::test]
async fn subscriber_is_notified_of_fired_actions() {
    let (server, path) = start("subscribe").await;

    let mut subscriber = UnixStream::connect(&path).await.unwrap();
    assert_eq!(request(&mut subscriber, &Request::Subscribe).await, Response::Subscribed);

    let mut bridge = UnixStream::connect(&path).await.unwrap();
    request(&mut bridge, &dispatch(Key::Ctrl, Modifiers::CTRL, 1_000)).await;
    request(&mut bridge, &dispatch(Key::Ctrl, Modifiers::CTRL, 1_200)).await;

    let notification: Notification = tokio::time::timeout(
        Duration::from_secs(5),
        read_message(&mut subscriber),
    )
    .await
    .expect("notification timed out")
    .unwrap()
    .unwrap();

    match notification {
        Notification::Hotkey {
            event: HotkeyEvent::ActionTriggered { action, trigger },
        } => {
            assert_eq!(action, "palette");
            assert_eq!(trigger.to_string(), "Ctrl (double tap)");
        }
        other => panic!("unexpected notification {other:?}"),
    }

    server.shutdown().await;
}
