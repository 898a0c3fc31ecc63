//! Browser automation boundary.
//!
//! The real driver lives outside this crate. [`BrowserSession`] wraps one
//! injected [`BrowserDriver`], arbitrates who holds control of it, and reports
//! every observable change back into the event stream as `browser_*` events.

use async_trait::async_trait;
use ferry_core::AgentEvent;
use ferry_core::event::ControlState;
use ferry_core::types::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    #[error("Cannot {action} while browser control is {from}")]
    InvalidTransition {
        from: ControlState,
        action: ControlAction,
    },
    #[error("The user is controlling the browser")]
    UserInControl,
    #[error("Browser event channel closed")]
    EventsClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ControlAction {
    Activate,
    TakeOverByUser,
    HandBackToAgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickTarget {
    Selector { selector: String },
    Point { x: f64, y: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeOptions {
    /// Pause between keystrokes.
    pub delay_ms: Option<u64>,
    pub clear_first: bool,
    /// Press Enter after typing.
    pub submit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_value(value: Value) -> Self {
        Self {
            success: true,
            error: None,
            value: Some(value),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            value: None,
        }
    }
}

/// Commands a browser driver accepts. Failures are reported in the
/// [`CommandResult`], not as `Err`.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, url: Option<&str>) -> CommandResult;

    /// On success `value` may carry `{"title": ...}`.
    async fn navigate(&self, url: &str) -> CommandResult;

    async fn click(&self, target: &ClickTarget) -> CommandResult;

    async fn type_text(&self, text: &str, options: &TypeOptions) -> CommandResult;

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> CommandResult;

    /// On success `value` is the PNG image as a base64 string.
    async fn screenshot(&self) -> CommandResult;

    async fn evaluate(&self, script: &str) -> CommandResult;

    async fn close(&self) -> CommandResult;
}

/// `idle → agent ⇄ user`, with `reset` back to idle from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlMachine {
    state: ControlState,
}

impl ControlMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    fn transition(
        &mut self,
        action: ControlAction,
        from: ControlState,
        to: ControlState,
    ) -> Result<ControlState, BrowserError> {
        if self.state != from {
            return Err(BrowserError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        self.state = to;
        Ok(to)
    }

    pub fn activate(&mut self) -> Result<ControlState, BrowserError> {
        self.transition(ControlAction::Activate, ControlState::Idle, ControlState::Agent)
    }

    pub fn take_over_by_user(&mut self) -> Result<ControlState, BrowserError> {
        self.transition(
            ControlAction::TakeOverByUser,
            ControlState::Agent,
            ControlState::User,
        )
    }

    pub fn hand_back_to_agent(&mut self) -> Result<ControlState, BrowserError> {
        self.transition(
            ControlAction::HandBackToAgent,
            ControlState::User,
            ControlState::Agent,
        )
    }

    pub fn reset(&mut self) -> ControlState {
        self.state = ControlState::Idle;
        self.state
    }
}

pub struct BrowserSession<D> {
    session_id: SessionId,
    driver: D,
    control: ControlMachine,
    events: mpsc::Sender<AgentEvent>,
}

impl<D: BrowserDriver> BrowserSession<D> {
    pub fn new(session_id: SessionId, driver: D, events: mpsc::Sender<AgentEvent>) -> Self {
        Self {
            session_id,
            driver,
            control: ControlMachine::new(),
            events,
        }
    }

    pub fn control_state(&self) -> ControlState {
        self.control.state()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    async fn emit(&self, event: AgentEvent) -> Result<(), BrowserError> {
        self.events
            .send(event)
            .await
            .map_err(|_| BrowserError::EventsClosed)
    }

    async fn emit_control(&self) -> Result<(), BrowserError> {
        self.emit(AgentEvent::BrowserControlChanged {
            session_id: self.session_id.clone(),
            control_state: self.control.state(),
        })
        .await
    }

    /// Reports a failed command as `browser_error`; passes the result through.
    async fn report(&self, command: &str, result: CommandResult) -> Result<CommandResult, BrowserError> {
        if !result.success {
            let error = result
                .error
                .clone()
                .unwrap_or_else(|| format!("{command} failed"));
            tracing::warn!(session_id = %self.session_id, command, %error, "Browser command failed");
            self.emit(AgentEvent::BrowserError {
                session_id: self.session_id.clone(),
                error,
            })
            .await?;
        }
        Ok(result)
    }

    fn ensure_agent_control(&self) -> Result<(), BrowserError> {
        match self.control.state() {
            ControlState::User => Err(BrowserError::UserInControl),
            ControlState::Agent | ControlState::Idle => Ok(()),
        }
    }

    /// Starts the browser and gives control to the agent.
    pub async fn launch(&mut self, url: Option<&str>) -> Result<CommandResult, BrowserError> {
        let result = self.driver.launch(url).await;
        if !result.success {
            return self.report("launch", result).await;
        }
        if self.control.state() == ControlState::Idle {
            self.control.activate()?;
            self.emit_control().await?;
        }
        if let Some(url) = url {
            self.emit(AgentEvent::BrowserNavigated {
                session_id: self.session_id.clone(),
                url: url.to_string(),
                title: title_of(&result),
            })
            .await?;
        }
        Ok(result)
    }

    pub async fn navigate(&mut self, url: &str) -> Result<CommandResult, BrowserError> {
        self.ensure_agent_control()?;
        let result = self.driver.navigate(url).await;
        if result.success {
            self.emit(AgentEvent::BrowserNavigated {
                session_id: self.session_id.clone(),
                url: url.to_string(),
                title: title_of(&result),
            })
            .await?;
        }
        self.report("navigate", result).await
    }

    pub async fn click(&mut self, target: &ClickTarget) -> Result<CommandResult, BrowserError> {
        self.ensure_agent_control()?;
        let result = self.driver.click(target).await;
        self.report("click", result).await
    }

    pub async fn type_text(
        &mut self,
        text: &str,
        options: &TypeOptions,
    ) -> Result<CommandResult, BrowserError> {
        self.ensure_agent_control()?;
        let result = self.driver.type_text(text, options).await;
        self.report("type_text", result).await
    }

    pub async fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: u32,
    ) -> Result<CommandResult, BrowserError> {
        self.ensure_agent_control()?;
        let result = self.driver.scroll(direction, amount).await;
        self.report("scroll", result).await
    }

    pub async fn evaluate(&mut self, script: &str) -> Result<CommandResult, BrowserError> {
        self.ensure_agent_control()?;
        let result = self.driver.evaluate(script).await;
        self.report("evaluate", result).await
    }

    /// Screenshots are observation only, so they are allowed under user control.
    pub async fn screenshot(&mut self) -> Result<CommandResult, BrowserError> {
        let result = self.driver.screenshot().await;
        if result.success {
            match result.value.as_ref().and_then(Value::as_str) {
                Some(image) => {
                    self.emit(AgentEvent::BrowserScreenshot {
                        session_id: self.session_id.clone(),
                        image_base64: image.to_string(),
                        control_state: self.control.state(),
                    })
                    .await?;
                }
                None => {
                    return self
                        .report("screenshot", CommandResult::failed("Screenshot returned no image"))
                        .await;
                }
            }
        }
        self.report("screenshot", result).await
    }

    pub async fn take_over_by_user(&mut self) -> Result<ControlState, BrowserError> {
        let state = self.control.take_over_by_user()?;
        self.emit_control().await?;
        Ok(state)
    }

    pub async fn hand_back_to_agent(&mut self) -> Result<ControlState, BrowserError> {
        let state = self.control.hand_back_to_agent()?;
        self.emit_control().await?;
        Ok(state)
    }

    pub async fn close(&mut self) -> Result<CommandResult, BrowserError> {
        let result = self.driver.close().await;
        self.control.reset();
        self.emit(AgentEvent::BrowserClosed {
            session_id: self.session_id.clone(),
        })
        .await?;
        self.report("close", result).await
    }
}

fn title_of(result: &CommandResult) -> Option<String> {
    result
        .value
        .as_ref()
        .and_then(|value| value.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
