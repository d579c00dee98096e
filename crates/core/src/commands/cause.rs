use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Console,
    /// Used for probes that must not depend on who is running a command.
    System,
    Player(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    WildCard,
    Named(String),
}

/// A granted permission such as `sponge.command.help` or `worldedit.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PermissionNode {
    path: Vec<PathSegment>,
}

impl PermissionNode {
    fn parse(permission: &str) -> Self {
        let path = permission
            .split('.')
            .map(|segment| match segment {
                "*" => PathSegment::WildCard,
                name => PathSegment::Named(name.to_string()),
            })
            .collect();
        Self { path }
    }

    fn matches(&self, permission: &str) -> bool {
        let mut segments = permission.split('.');
        for path_segment in &self.path {
            match (path_segment, segments.next()) {
                (PathSegment::WildCard, _) => return true,
                (PathSegment::Named(name), Some(segment)) if name == segment => {}
                _ => return false,
            }
        }
        segments.next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseMessage {
    pub text: String,
    pub is_error: bool,
}

/// Whoever runs a command, together with what they are allowed to do and
/// where replies go.
///
/// Clones share the same outbox so a forked context can still reply to the
/// original sender.
#[derive(Debug, Clone)]
pub struct CommandCause {
    subject: Subject,
    permissions: Arc<Vec<PermissionNode>>,
    outbox: Arc<Mutex<Vec<CauseMessage>>>,
}

impl CommandCause {
    fn new(subject: Subject) -> Self {
        Self {
            subject,
            permissions: Arc::new(Vec::new()),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn console() -> Self {
        Self::new(Subject::Console)
    }

    pub fn system() -> Self {
        Self::new(Subject::System)
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self::new(Subject::Player(name.into()))
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        Arc::make_mut(&mut self.permissions).push(PermissionNode::parse(permission));
        self
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn name(&self) -> &str {
        match &self.subject {
            Subject::Console => "Server",
            Subject::System => "System",
            Subject::Player(name) => name,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        match &self.subject {
            Subject::Console | Subject::System => true,
            Subject::Player(_) => self.permissions.iter().any(|node| node.matches(permission)),
        }
    }

    fn push(&self, text: &str, is_error: bool) {
        debug!(target: "sponge::cause", "{} <- {}", self.name(), text);
        // A poisoned outbox only means another reply panicked halfway through.
        let mut outbox = self.outbox.lock().unwrap_or_else(|e| e.into_inner());
        outbox.push(CauseMessage {
            text: text.to_string(),
            is_error,
        });
    }

    pub fn send_message(&self, message: &str) {
        self.push(message, false);
    }

    pub fn send_error(&self, message: &str) {
        self.push(message, true);
    }

    pub fn take_messages(&self) -> Vec<CauseMessage> {
        let mut outbox = self.outbox.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *outbox)
    }
}
