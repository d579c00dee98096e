use thiserror::Error;

/// Malformed input at a specific position of the command line.
///
/// Always carries the full input and the absolute cursor so callers can
/// point at the offending span.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ArgumentParseError {
    message: String,
    input: String,
    cursor: usize,
}

/// How much of the input is shown before the cursor in [`ArgumentParseError::context`].
const CONTEXT_AMOUNT: usize = 10;

impl ArgumentParseError {
    pub fn new(message: impl Into<String>, input: impl Into<String>, cursor: usize) -> Self {
        Self {
            message: message.into(),
            input: input.into(),
            cursor,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Renders the input up to the cursor followed by a marker, eg.
    /// `...e diamond <--[HERE]`.
    pub fn context(&self) -> String {
        let cursor = self.cursor.min(self.input.len());
        let mut start = cursor.saturating_sub(CONTEXT_AMOUNT);
        while !self.input.is_char_boundary(start) {
            start -= 1;
        }
        let prefix = if start > 0 { "..." } else { "" };
        format!("{}{}<--[HERE]", prefix, &self.input[start..cursor])
    }

    /// Combines several failures into one whose message lists every reason,
    /// one per line.
    pub fn combined(errors: &[ArgumentParseError], input: &str, cursor: usize) -> Self {
        let message = errors
            .iter()
            .map(ArgumentParseError::message)
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(message, input, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The provided reader state was taken from a different input")]
pub struct ReaderStateMismatch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("No entry was found for {key}")]
    Missing { key: String },
    #[error("More than one entry was found for {key} ({count} entries)")]
    Ambiguous { key: String, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Invalid alias '{alias}': aliases must not be empty or contain whitespace")]
    InvalidAlias { alias: String },
    #[error("The command alias {alias} has already been registered for this plugin")]
    AlreadyRegistered { alias: String },
    #[error("No aliases could be registered for the supplied command")]
    NoAliasesAvailable,
    #[error("Only literal nodes can be registered as commands")]
    NotACommandLiteral,
    #[error("A command needs an executor or at least one child command")]
    EmptyCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterBuildError {
    #[error("The parameter key may not be empty")]
    MissingKey,
    #[error("Parameter '{key}' must have at least one parser")]
    NoParsers { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },
    #[error("Unknown command. Type /help for a list of commands.")]
    UnknownCommand { command: String },
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Internal error: Argument '{name}' has wrong type, expected {expected} (command registration bug)")]
    WrongArgumentType { name: String, expected: String },
    #[error("Internal error (bug): {message}")]
    Message { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Syntax(#[from] ArgumentParseError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CommandError {
    pub fn runtime(message: impl Into<String>) -> Self {
        CommandError::Runtime(RuntimeError::Message(message.into()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CommandError::Internal(InternalError::Message {
            message: message.into(),
        })
    }

    /// Whether the error should be shown to whoever ran the command rather
    /// than treated as a bug.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, CommandError::Syntax(_) | CommandError::Runtime(_))
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

pub(crate) trait UnwrapRuntimeError<T> {
    fn unwrap_runtime(self) -> Result<T, InternalError>;
}

impl<T> UnwrapRuntimeError<T> for CommandResult<T> {
    fn unwrap_runtime(self) -> Result<T, InternalError> {
        self.map_err(|err| match err {
            CommandError::Internal(err) => err,
            err => InternalError::Message {
                message: format!("Runtime Error: {}", err),
            },
        })
    }
}
