use parley::api::{ApiError, StreamEvent};
use parley::app::{App, AppFlow, Status};
use parley::commands::parse;
use parley::config::ProfileStore;
use parley::message::{Message, Role};
use parley::ui::{Overlay, ToastLevel};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn app() -> (TempDir, App) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = ProfileStore::new(dir.path());
    let app = App::new(store).expect("Failed to create app");
    (dir, app)
}

fn run(app: &mut App, line: &str) -> AppFlow {
    app.apply_command(parse(line).expect("Failed to parse command"))
}

#[test]
fn test_new_app_seeds_system_message() {
    let (_dir, app) = app();
    assert_eq!(
        app.conversation.system(),
        Some("You are a helpful assistant.")
    );
    assert_eq!(app.status, Status::Ready);
}

#[test]
fn test_exit_command_exits() {
    let (_dir, mut app) = app();
    assert_eq!(run(&mut app, "/exit"), AppFlow::Exit);
}

#[test]
fn test_clear_leaves_no_visible_messages() {
    let (_dir, mut app) = app();
    app.conversation.append(Message::user("hi".to_string()));
    app.conversation
        .append(Message::assistant("hello".to_string()));

    run(&mut app, "/clear");

    assert_eq!(app.conversation.visible_len(), 0);
    // The system prompt is re-seeded so the next turn keeps its instructions.
    assert_eq!(
        app.conversation.system(),
        Some("You are a helpful assistant.")
    );
}

#[test]
fn test_create_use_and_configure_profile_scenario() {
    let (_dir, mut app) = app();

    run(&mut app, "/profile create work");
    run(&mut app, "/profile use work");
    run(&mut app, "/config model=gpt-4");

    assert_eq!(app.active_profile, "work");
    assert_eq!(app.settings.model, "gpt-4");

    // Persisted in the work profile, and the default profile is untouched.
    assert_eq!(app.store.load("work").unwrap().settings.model, "gpt-4");
    assert_eq!(
        app.store.load("default").unwrap().settings.model,
        "gpt-4o-mini"
    );
    assert_eq!(app.store.active().unwrap(), "work");
}

#[test]
fn test_use_missing_profile_reports_error() {
    let (_dir, mut app) = app();
    run(&mut app, "/profile use ghost");

    assert_eq!(app.active_profile, "default");
    assert!(app
        .toasts
        .messages()
        .any(|(_, level)| level == ToastLevel::Error));
}

#[test]
fn test_delete_active_profile_falls_back_to_default() {
    let (_dir, mut app) = app();
    run(&mut app, "/profile create work");
    run(&mut app, "/profile use work");
    run(&mut app, "/profile delete work");

    assert_eq!(app.active_profile, "default");
    assert_eq!(app.store.active().unwrap(), "default");
}

#[test]
fn test_system_command_updates_conversation_and_profile() {
    let (_dir, mut app) = app();
    run(&mut app, "/system You are a pirate.");

    assert_eq!(app.conversation.system(), Some("You are a pirate."));
    assert_eq!(
        app.store.load("default").unwrap().settings.system_prompt,
        "You are a pirate."
    );
}

#[test]
fn test_config_set_system_prompt_replaces_system_message() {
    let (_dir, mut app) = app();
    run(&mut app, "/config system_prompt=Be terse.");

    assert_eq!(app.conversation.system(), Some("Be terse."));
    let system_count = app
        .conversation
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .count();
    assert_eq!(system_count, 1);
}

#[test]
fn test_help_opens_overlay() {
    let (_dir, mut app) = app();
    run(&mut app, "/help");
    assert!(app.overlay.is_some());
}

#[test]
fn test_config_overlay_title_names_active_profile() {
    let (_dir, mut app) = app();
    run(&mut app, "/config");
    match &app.overlay {
        Some(Overlay::Table { title, .. }) => {
            assert_eq!(title, "Configuration: default profile");
        }
        other => panic!("expected config table overlay, got {:?}", other),
    }
}

/// Simulate an in-flight response without a network: wire a channel into
/// the app the way `send_message` does.
fn start_fake_stream(app: &mut App) -> mpsc::Sender<StreamEvent> {
    let (tx, rx) = mpsc::channel(32);
    app.conversation.append(Message::user("hi".to_string()));
    app.conversation.append(Message::pending_assistant());
    app.stream_rx = Some(rx);
    app.status = Status::Waiting;
    tx
}

#[test]
fn test_stream_tokens_accumulate_in_order() {
    let (_dir, mut app) = app();
    let tx = start_fake_stream(&mut app);

    tx.try_send(StreamEvent::Token("Hel".to_string())).unwrap();
    tx.try_send(StreamEvent::Token("lo!".to_string())).unwrap();
    app.process_stream();

    assert_eq!(app.status, Status::Streaming);
    assert_eq!(app.conversation.messages.last().unwrap().content, "Hello!");

    tx.try_send(StreamEvent::Done).unwrap();
    app.process_stream();

    assert_eq!(app.status, Status::Ready);
    assert!(!app.is_streaming());
    let last = app.conversation.messages.last().unwrap();
    assert!(last.complete);
    // The finished response is part of the next transcript.
    assert_eq!(app.conversation.transcript().count(), 3); // system + user + assistant
}

#[test]
fn test_stream_error_keeps_fragments_but_not_in_transcript() {
    let (_dir, mut app) = app();
    let tx = start_fake_stream(&mut app);

    tx.try_send(StreamEvent::Token("partial ".to_string()))
        .unwrap();
    tx.try_send(StreamEvent::Token("answer".to_string()))
        .unwrap();
    tx.try_send(StreamEvent::Failed(ApiError::Network(
        "request timed out".to_string(),
    )))
    .unwrap();
    app.process_stream();

    // Rendered fragments stay visible...
    let last = app.conversation.messages.last().unwrap();
    assert_eq!(last.content, "partial answer");
    assert!(!last.complete);
    // ...but the partial message never becomes part of the transcript.
    assert_eq!(
        app.conversation.transcript().count(),
        2 // system + user, nothing else
    );
    assert!(matches!(app.status, Status::Error(_)));
    assert!(app
        .toasts
        .messages()
        .any(|(msg, level)| level == ToastLevel::Error && msg.contains("timed out")));
}

#[test]
fn test_stream_error_with_no_fragments_drops_placeholder() {
    let (_dir, mut app) = app();
    let tx = start_fake_stream(&mut app);

    tx.try_send(StreamEvent::Failed(ApiError::Auth(
        "no API key".to_string(),
    )))
    .unwrap();
    app.process_stream();

    assert_eq!(app.conversation.messages.last().unwrap().role, Role::User);
    assert!(matches!(app.status, Status::Error(_)));
}

#[test]
fn test_cancel_discards_partial_message() {
    let (_dir, mut app) = app();
    let tx = start_fake_stream(&mut app);

    tx.try_send(StreamEvent::Token("doomed".to_string())).unwrap();
    app.process_stream();
    app.cancel_stream();

    assert!(!app.is_streaming());
    assert_eq!(app.status, Status::Ready);
    // The partial assistant message is gone entirely.
    assert_eq!(app.conversation.messages.last().unwrap().role, Role::User);
}

#[test]
fn test_submit_while_streaming_is_refused() {
    let (_dir, mut app) = app();
    let tx = start_fake_stream(&mut app);
    tx.try_send(StreamEvent::Token("partial".to_string())).unwrap();
    app.process_stream();

    app.input = "second message".to_string();
    assert_eq!(app.submit_input(), AppFlow::Continue);

    // The in-flight turn is untouched: no second request, no second
    // placeholder, and the typed input survives for later.
    assert!(app.is_streaming());
    assert_eq!(app.input, "second message");
    let incomplete = app
        .conversation
        .messages
        .iter()
        .filter(|m| !m.complete)
        .count();
    assert_eq!(incomplete, 1);
    assert_eq!(app.conversation.messages.last().unwrap().content, "partial");

    // The turn still finishes normally afterwards.
    tx.try_send(StreamEvent::Done).unwrap();
    app.process_stream();
    assert_eq!(app.status, Status::Ready);
}

#[test]
fn test_reset_config_restores_defaults() {
    let (_dir, mut app) = app();
    run(&mut app, "/config model=gpt-4");
    run(&mut app, "/config system_prompt=Be terse.");

    run(&mut app, "/reset config");

    assert_eq!(app.settings.model, "gpt-4o-mini");
    assert_eq!(
        app.store.load("default").unwrap().settings,
        parley::config::ProfileSettings::default()
    );
    assert_eq!(
        app.conversation.system(),
        Some("You are a helpful assistant.")
    );
}

#[test]
fn test_unknown_command_surfaces_help_error() {
    let (_dir, mut app) = app();
    app.input = "/frobnicate".to_string();
    assert_eq!(app.submit_input(), AppFlow::Continue);
    assert!(app
        .toasts
        .messages()
        .any(|(msg, level)| level == ToastLevel::Error && msg.contains("Unknown command")));
}
