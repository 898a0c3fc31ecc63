use ferry_core::session::{ContentBlock, Role, ToolStatus};
use ferry_core::types::{SessionId, ToolUseId};
use ferry_core::{AgentEvent, Effect, SessionState, process_event};
use std::sync::Arc;

const RESEARCH_TURN: &str = include_str!("fixtures/research_turn.jsonl");

fn decode_lines(lines: &str) -> Vec<AgentEvent> {
    lines
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| AgentEvent::from_json(line).unwrap())
        .collect()
}

#[test]
fn replays_a_recorded_turn() {
    let events = decode_lines(RESEARCH_TURN);
    assert_eq!(events.len(), 15);

    let mut state = SessionState::new(SessionId::from("sess-7")).into_shared();
    let mut effects = Vec::new();
    for event in events {
        let outcome = process_event(&state, event);
        state = outcome.state;
        effects.extend(outcome.effects);
    }

    let messages: Vec<_> = state.session.messages.iter().collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].timestamp, 1_700_000_000);

    let answer = messages[1];
    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(
        answer.text(),
        "Let me check the changelog.0.4.0 made startup faster."
    );
    assert!(!answer.streaming);
    assert!(matches!(
        answer.tool_use(&ToolUseId::from("toolu_2")),
        Some(ContentBlock::ToolUse {
            status: ToolStatus::Completed,
            parent_tool_use_id: Some(_),
            ..
        })
    ));
    assert!(answer.has_tool_result(&ToolUseId::from("toolu_1")));

    assert_eq!(state.session.title.as_deref(), Some("Release changes"));
    assert_eq!(state.session.usage.total_tokens(), 1280);
    assert!(!state.session.is_processing);
    assert!(state.session.status.is_none());
    assert!(state.streaming.is_idle());

    assert_eq!(effects.len(), 1);
    assert!(matches!(&effects[0], Effect::ArtifactCreated { artifact, .. } if artifact.title.as_deref() == Some("Release notes")));
}

#[test]
fn decoding_failures_surface_at_the_boundary() {
    assert!(AgentEvent::from_json("{not json").is_err());
    assert!(AgentEvent::from_json(r#"{"type":"text_delta"}"#).is_err());
    assert!(AgentEvent::from_json(r#"{"type":"tool_start","sessionId":"s","toolName":"bash"}"#).is_err());
}

#[test]
fn states_are_persistent_snapshots() {
    let events = decode_lines(RESEARCH_TURN);
    let initial = SessionState::new(SessionId::from("sess-7")).into_shared();

    let mut history = vec![Arc::clone(&initial)];
    for event in events {
        let next = process_event(history.last().unwrap(), event).state;
        history.push(next);
    }

    // Every intermediate snapshot is still readable and unchanged.
    assert!(history[0].session.messages.is_empty());
    assert_eq!(history[1].session.messages.len(), 1);
    assert_eq!(
        history[3].session.messages.last().unwrap().text(),
        "Let me check "
    );
    assert!(history[3].session.messages.last().unwrap().streaming);
}
