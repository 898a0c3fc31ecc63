use std::sync::Arc;

use ferry_core::session::{PermissionMode, Role};
use ferry_core::types::SessionId;
use ferry_core::{Effect, Session};
use ferry_runtime::{
    ChannelEffectHandler, DiscardEffects, Error, EventRouter, InMemorySessionStore, RuntimeConfig,
    SessionStore,
};
use serde_json::json;

fn line(value: serde_json::Value) -> String {
    value.to_string()
}

fn router_with(store: Arc<InMemorySessionStore>, config: RuntimeConfig) -> EventRouter {
    EventRouter::new(store, Arc::new(DiscardEffects), config)
}

#[tokio::test]
async fn sessions_are_folded_independently() {
    let store = Arc::new(InMemorySessionStore::new());
    let router = router_with(store, RuntimeConfig::default());

    for (session, delta) in [("a", "alpha "), ("b", "beta "), ("a", "again"), ("b", "too")] {
        router
            .route_json(&line(json!({"type": "text_delta", "sessionId": session, "delta": delta})))
            .await
            .unwrap();
    }

    let a = router.open_session(&SessionId::from("a")).await.unwrap();
    let b = router.open_session(&SessionId::from("b")).await.unwrap();
    let a_state = a
        .process(ferry_core::AgentEvent::from_json(&line(json!({"type": "text_complete", "sessionId": "a"}))).unwrap())
        .await
        .unwrap();
    let b_state = b
        .process(ferry_core::AgentEvent::from_json(&line(json!({"type": "text_complete", "sessionId": "b"}))).unwrap())
        .await
        .unwrap();

    assert_eq!(a_state.session.messages.last().unwrap().text(), "alpha again");
    assert_eq!(b_state.session.messages.last().unwrap().text(), "beta too");
    assert_eq!(
        router.active_sessions().await,
        vec![SessionId::from("a"), SessionId::from("b")]
    );
}

#[tokio::test]
async fn new_sessions_use_the_configured_permission_mode() {
    let store = Arc::new(InMemorySessionStore::new());
    let config = RuntimeConfig {
        default_permission_mode: PermissionMode::Safe,
        ..RuntimeConfig::default()
    };
    let router = router_with(store, config);

    let handle = router.open_session(&SessionId::from("fresh")).await.unwrap();
    assert_eq!(handle.state().session.permission_mode, PermissionMode::Safe);
}

#[tokio::test]
async fn stored_sessions_are_resumed() {
    let store = Arc::new(InMemorySessionStore::new());
    let mut stored = Session::new(SessionId::from("old"));
    stored.title = Some("Earlier work".to_string());
    store.save(&stored).await.unwrap();

    let router = router_with(store.clone(), RuntimeConfig::default());
    let state = router
        .open_session(&SessionId::from("old"))
        .await
        .unwrap()
        .state();
    assert_eq!(state.session.title.as_deref(), Some("Earlier work"));
    assert!(state.streaming.is_idle());
}

#[tokio::test]
async fn close_session_persists_and_forgets() {
    let store = Arc::new(InMemorySessionStore::new());
    let config = RuntimeConfig {
        persist_on_turn_end: false,
        ..RuntimeConfig::default()
    };
    let router = router_with(store.clone(), config);
    let id = SessionId::from("s1");

    router
        .route_json(&line(json!({
            "type": "user_message",
            "sessionId": "s1",
            "message": {"id": "u1", "content": "hello"},
            "status": "accepted"
        })))
        .await
        .unwrap();
    router.close_session(&id).await.unwrap();

    let saved = store.load(&id).await.unwrap().unwrap();
    assert_eq!(saved.messages.last().unwrap().role, Role::User);
    assert!(router.session(&id).await.is_none());
    assert!(matches!(
        router.state(&id).await,
        Err(Error::SessionNotFound { .. })
    ));
    assert!(matches!(
        router.close_session(&id).await,
        Err(Error::SessionNotFound { .. })
    ));
}

#[tokio::test]
async fn events_routed_during_close_are_not_lost() {
    let store = Arc::new(InMemorySessionStore::new());
    let config = RuntimeConfig {
        persist_on_turn_end: false,
        ..RuntimeConfig::default()
    };
    let router = router_with(store.clone(), config);
    let id = SessionId::from("s1");
    let user = |message_id: &str| {
        ferry_core::AgentEvent::from_value(json!({
            "type": "user_message",
            "sessionId": "s1",
            "message": {"id": message_id, "content": message_id},
            "status": "queued"
        }))
        .unwrap()
    };

    router.route(user("u1")).await.unwrap();
    let (closed, routed) = tokio::join!(router.close_session(&id), router.route(user("u2")));
    closed.unwrap();
    routed.unwrap();
    router.shutdown().await;

    let saved = store.load(&id).await.unwrap().unwrap();
    let ids: Vec<_> = saved.messages.iter().map(|m| m.id.as_str().to_string()).collect();
    assert_eq!(ids, ["u1", "u2"]);
}

#[tokio::test]
async fn shutdown_persists_every_session() {
    let store = Arc::new(InMemorySessionStore::new());
    let router = router_with(store.clone(), RuntimeConfig::default());

    for session in ["a", "b", "c"] {
        router
            .route_json(&line(json!({"type": "title_generated", "sessionId": session, "title": session})))
            .await
            .unwrap();
    }
    router.shutdown().await;

    assert!(router.active_sessions().await.is_empty());
    assert_eq!(store.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_lines_are_rejected_before_routing() {
    let router = router_with(Arc::new(InMemorySessionStore::new()), RuntimeConfig::default());

    let result = router.route_json(r#"{"type":"tool_start","sessionId":"s1"}"#).await;
    assert!(matches!(result, Err(Error::Core(_))));
    let result = router.route_json(r#"{"delta":"orphan"}"#).await;
    assert!(matches!(result, Err(Error::Core(ferry_core::Error::MissingField("type")))));
    assert!(router.active_sessions().await.is_empty());
}

#[tokio::test]
async fn effects_are_delivered_per_session() {
    let (effects, mut effect_rx) = ChannelEffectHandler::new();
    let router = EventRouter::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(effects),
        RuntimeConfig::default(),
    );

    router
        .route_json(&line(json!({
            "type": "source_activated",
            "sessionId": "s9",
            "sourceSlug": "linear",
            "originalMessage": "list my issues"
        })))
        .await
        .unwrap();

    match effect_rx.recv().await {
        Some(Effect::AutoRetry {
            session_id,
            original_message,
            source_slug,
        }) => {
            assert_eq!(session_id, SessionId::from("s9"));
            assert_eq!(original_message, "list my issues");
            assert_eq!(source_slug, "linear");
        }
        other => panic!("unexpected effect: {other:?}"),
    }
}
