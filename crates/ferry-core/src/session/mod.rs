pub mod log;
pub mod message;
pub mod state;
pub mod usage;

pub use log::MessageLog;
pub use message::{
    Annotation, Attachment, Badge, ContentBlock, ErrorKind, InfoLevel, InteractivePrompt,
    Message, PromptKind, PromptStatus, Role, ToolLink, ToolStatus,
};
pub use state::{
    BackgroundShell, BackgroundTask, OpenAssistant, OpenTool, PermissionMode, Session,
    SessionState, Sharing, StatusLine, Streaming, TextBuffer,
};
pub use usage::Usage;
