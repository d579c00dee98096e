use crate::commands::cause::CommandCause;
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::error::{CommandResult, ContextError, InternalError, RuntimeError};
use crate::commands::tree::{Command, NodeId, RedirectModifier};
use crate::commands::value::{Key, Value, ValueType};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A span of the command line, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringRange {
    pub start: usize,
    pub end: usize,
}

impl StringRange {
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn between(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn encompassing(a: StringRange, b: StringRange) -> Self {
        Self {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    pub fn get<'s>(&self, input: &'s str) -> &'s str {
        &input[self.start..self.end]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommandNode {
    pub node: NodeId,
    pub range: StringRange,
}

/// Where suggestions for a cursor position come from: the children of
/// `parent`, replacing input from `start` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionContext {
    pub parent: NodeId,
    pub start: usize,
}

type Arguments = IndexMap<Key, Vec<Value>>;

fn one<'v>(arguments: &'v Arguments, key: &Key) -> Result<Option<&'v Value>, ContextError> {
    match arguments.get(key).map(Vec::as_slice) {
        None | Some([]) => Ok(None),
        Some([value]) => Ok(Some(value)),
        Some(values) => Err(ContextError::Ambiguous {
            key: key.to_string(),
            count: values.len(),
        }),
    }
}

fn require_one<'v>(arguments: &'v Arguments, key: &Key) -> Result<&'v Value, ContextError> {
    one(arguments, key)?.ok_or_else(|| ContextError::Missing {
        key: key.to_string(),
    })
}

fn all<'v>(arguments: &'v Arguments, key: &Key) -> &'v [Value] {
    arguments.get(key).map(Vec::as_slice).unwrap_or_default()
}

/// The parts of a builder that a failed parse attempt must leave untouched.
#[derive(Clone)]
pub struct ContextState {
    arguments: Arguments,
    nodes: Vec<ParsedCommandNode>,
    range: StringRange,
    modifier: Option<RedirectModifier>,
    forks: bool,
}

impl fmt::Debug for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextState")
            .field("arguments", &self.arguments)
            .field("nodes", &self.nodes)
            .field("range", &self.range)
            .field("modifier", &self.modifier.is_some())
            .field("forks", &self.forks)
            .finish()
    }
}

/// Modifiers compare by identity.
impl PartialEq for ContextState {
    fn eq(&self, other: &Self) -> bool {
        let same_modifier = match (&self.modifier, &other.modifier) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.arguments == other.arguments
            && self.nodes == other.nodes
            && self.range == other.range
            && same_modifier
            && self.forks == other.forks
    }
}

/// Accumulates everything parsed for one command invocation.
#[derive(Clone)]
pub struct CommandContextBuilder<'a> {
    dispatcher: &'a CommandDispatcher,
    cause: CommandCause,
    root: NodeId,
    arguments: Arguments,
    nodes: Vec<ParsedCommandNode>,
    range: StringRange,
    command: Option<Command>,
    child: Option<Box<CommandContextBuilder<'a>>>,
    modifier: Option<RedirectModifier>,
    forks: bool,
}

impl<'a> CommandContextBuilder<'a> {
    pub fn new(
        dispatcher: &'a CommandDispatcher,
        cause: CommandCause,
        root: NodeId,
        start: usize,
    ) -> Self {
        Self {
            dispatcher,
            cause,
            root,
            arguments: IndexMap::new(),
            nodes: Vec::new(),
            range: StringRange::at(start),
            command: None,
            child: None,
            modifier: None,
            forks: false,
        }
    }

    pub fn dispatcher(&self) -> &'a CommandDispatcher {
        self.dispatcher
    }

    pub fn cause(&self) -> &CommandCause {
        &self.cause
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn nodes(&self) -> &[ParsedCommandNode] {
        &self.nodes
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn child(&self) -> Option<&CommandContextBuilder<'a>> {
        self.child.as_deref()
    }

    pub fn redirect_modifier(&self) -> Option<&RedirectModifier> {
        self.modifier.as_ref()
    }

    pub fn is_forked(&self) -> bool {
        self.forks
    }

    pub fn with_source(mut self, cause: CommandCause) -> Self {
        self.cause = cause;
        self
    }

    pub fn with_command(&mut self, command: Option<Command>) {
        self.command = command;
    }

    pub fn with_child(&mut self, child: CommandContextBuilder<'a>) {
        self.child = Some(Box::new(child));
    }

    /// Records a consumed node. The node's redirect modifier and fork flag
    /// become the builder's.
    pub fn with_node(&mut self, node: NodeId, range: StringRange) {
        self.nodes.push(ParsedCommandNode { node, range });
        self.range = StringRange::encompassing(self.range, range);
        let node = self.dispatcher.tree().node(node);
        self.modifier = node.redirect_modifier().cloned();
        self.forks = node.is_fork();
    }

    pub fn put_entry(&mut self, key: Key, value: Value) {
        self.arguments.entry(key).or_default().push(value);
    }

    pub fn has_any(&self, key: &Key) -> bool {
        !all(&self.arguments, key).is_empty()
    }

    pub fn one(&self, key: &Key) -> Result<Option<&Value>, ContextError> {
        one(&self.arguments, key)
    }

    pub fn require_one(&self, key: &Key) -> Result<&Value, ContextError> {
        require_one(&self.arguments, key)
    }

    pub fn all(&self, key: &Key) -> &[Value] {
        all(&self.arguments, key)
    }

    pub fn state(&self) -> ContextState {
        ContextState {
            arguments: self.arguments.clone(),
            nodes: self.nodes.clone(),
            range: self.range,
            modifier: self.modifier.clone(),
            forks: self.forks,
        }
    }

    pub fn set_state(&mut self, state: ContextState) {
        self.arguments = state.arguments;
        self.nodes = state.nodes;
        self.range = state.range;
        self.modifier = state.modifier;
        self.forks = state.forks;
    }

    /// An independent copy; later changes to either side are not shared.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn last_child(&self) -> &CommandContextBuilder<'a> {
        let mut result = self;
        while let Some(child) = result.child() {
            result = child;
        }
        result
    }

    pub fn find_suggestion_context(&self, cursor: usize) -> CommandResult<SuggestionContext> {
        if self.range.start > cursor {
            return Err(InternalError::Message {
                message: "Can't find node before cursor".to_string(),
            }
            .into());
        }
        if self.range.end < cursor {
            if let Some(child) = self.child() {
                return child.find_suggestion_context(cursor);
            }
            return Ok(match self.nodes.last() {
                Some(last) => SuggestionContext {
                    parent: last.node,
                    start: last.range.end + 1,
                },
                None => SuggestionContext {
                    parent: self.root,
                    start: self.range.start,
                },
            });
        }
        let mut prev = self.root;
        for node in &self.nodes {
            if node.range.start <= cursor && cursor <= node.range.end {
                return Ok(SuggestionContext {
                    parent: prev,
                    start: node.range.start,
                });
            }
            prev = node.node;
        }
        Ok(SuggestionContext {
            parent: prev,
            start: self.range.start,
        })
    }

    pub fn build(&self, input: impl Into<Arc<str>>) -> CommandContext<'a> {
        let input = input.into();
        CommandContext {
            dispatcher: self.dispatcher,
            cause: self.cause.clone(),
            input: Arc::clone(&input),
            root: self.root,
            arguments: self.arguments.clone(),
            nodes: self.nodes.clone(),
            range: self.range,
            command: self.command.clone(),
            child: self.child.as_ref().map(|child| Box::new(child.build(input))),
            modifier: self.modifier.clone(),
            forks: self.forks,
        }
    }
}

/// The immutable result of parsing a command line, handed to executors.
#[derive(Clone)]
pub struct CommandContext<'a> {
    dispatcher: &'a CommandDispatcher,
    cause: CommandCause,
    input: Arc<str>,
    root: NodeId,
    arguments: Arguments,
    nodes: Vec<ParsedCommandNode>,
    range: StringRange,
    command: Option<Command>,
    child: Option<Box<CommandContext<'a>>>,
    modifier: Option<RedirectModifier>,
    forks: bool,
}

impl<'a> CommandContext<'a> {
    pub fn dispatcher(&self) -> &'a CommandDispatcher {
        self.dispatcher
    }

    pub fn cause(&self) -> &CommandCause {
        &self.cause
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn nodes(&self) -> &[ParsedCommandNode] {
        &self.nodes
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn child(&self) -> Option<&CommandContext<'a>> {
        self.child.as_deref()
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn redirect_modifier(&self) -> Option<&RedirectModifier> {
        self.modifier.as_ref()
    }

    pub fn is_forked(&self) -> bool {
        self.forks
    }

    /// The same context running as someone else.
    pub fn copy_for(&self, cause: CommandCause) -> Self {
        Self {
            cause,
            ..self.clone()
        }
    }

    pub fn has_any(&self, key: &Key) -> bool {
        !all(&self.arguments, key).is_empty()
    }

    pub fn one(&self, key: &Key) -> Result<Option<&Value>, ContextError> {
        one(&self.arguments, key)
    }

    pub fn require_one(&self, key: &Key) -> Result<&Value, ContextError> {
        require_one(&self.arguments, key)
    }

    pub fn all(&self, key: &Key) -> &[Value] {
        all(&self.arguments, key)
    }

    fn get(&self, name: &str, value_type: ValueType) -> CommandResult<&Value> {
        Ok(self.require_one(&Key::new(name, value_type))?)
    }

    pub fn get_string(&self, name: &str) -> CommandResult<String> {
        Ok(self.get(name, ValueType::String)?.as_string()?.clone())
    }

    pub fn get_integer(&self, name: &str) -> CommandResult<i32> {
        self.get(name, ValueType::Integer)?.as_integer()
    }

    pub fn get_long(&self, name: &str) -> CommandResult<i64> {
        self.get(name, ValueType::Long)?.as_long()
    }

    pub fn get_float(&self, name: &str) -> CommandResult<f32> {
        self.get(name, ValueType::Float)?.as_float()
    }

    pub fn get_double(&self, name: &str) -> CommandResult<f64> {
        self.get(name, ValueType::Double)?.as_double()
    }

    pub fn get_boolean(&self, name: &str) -> CommandResult<bool> {
        self.get(name, ValueType::Boolean)?.as_boolean()
    }

    pub fn get_player(&self, name: &str) -> CommandResult<String> {
        Ok(self.get(name, ValueType::Player)?.as_player()?.clone())
    }

    pub fn get_choice(&self, name: &str) -> CommandResult<String> {
        Ok(self.get(name, ValueType::Choice)?.as_choice()?.clone())
    }

    pub fn get_greedy(&self, name: &str) -> CommandResult<String> {
        Ok(self.get(name, ValueType::GreedyString)?.as_greedy()?.clone())
    }

    pub fn reply(&self, message: &str) {
        self.cause.send_message(message);
    }

    pub fn error(&self, message: &str) {
        self.cause.send_error(message);
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.cause.has_permission(permission)
    }

    pub fn require_permission(&self, permission: &str) -> CommandResult<()> {
        if !self.has_permission(permission) {
            return Err(RuntimeError::PermissionDenied {
                permission: permission.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::node::CommandBuilder;

    fn key() -> Key {
        Key::new("target", ValueType::Player)
    }

    #[test]
    fn zero_one_many() {
        let dispatcher = CommandDispatcher::new();
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), dispatcher.root(), 0);

        assert_eq!(builder.one(&key()), Ok(None));
        assert!(matches!(
            builder.require_one(&key()),
            Err(ContextError::Missing { .. })
        ));

        builder.put_entry(key(), Value::Player("Steve".to_string()));
        assert_eq!(
            builder.require_one(&key()),
            Ok(&Value::Player("Steve".to_string()))
        );

        builder.put_entry(key(), Value::Player("Alex".to_string()));
        assert!(matches!(
            builder.one(&key()),
            Err(ContextError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(
            builder.require_one(&key()),
            Err(ContextError::Ambiguous { count: 2, .. })
        ));
        assert_eq!(builder.all(&key()).len(), 2);
        assert!(builder.has_any(&key()));
    }

    #[test]
    fn state_round_trips() {
        let dispatcher = CommandDispatcher::new();
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), dispatcher.root(), 0);
        builder.put_entry(key(), Value::Player("Steve".to_string()));
        let state = builder.state();

        builder.put_entry(key(), Value::Player("Alex".to_string()));
        builder.with_node(dispatcher.root(), StringRange::between(0, 4));
        assert_ne!(builder.state(), state);

        builder.set_state(state.clone());
        assert_eq!(builder.state(), state);
        assert_eq!(builder.range(), StringRange::at(0));
    }

    #[test]
    fn restoring_state_drops_redirect_of_rolled_back_node() {
        let mut dispatcher = CommandDispatcher::new();
        let root = dispatcher.root();
        let twice = dispatcher.register(
            CommandBuilder::literal("twice")
                .fork(root, |ctx| Ok(vec![ctx.cause().clone(), ctx.cause().clone()])),
        );
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), root, 0);
        let state = builder.state();

        builder.with_node(twice, StringRange::between(0, 5));
        assert!(builder.redirect_modifier().is_some());
        assert!(builder.is_forked());
        assert_ne!(builder.state(), state);

        builder.set_state(state.clone());
        assert!(builder.redirect_modifier().is_none());
        assert!(!builder.is_forked());
        assert_eq!(builder.state(), state);
    }

    #[test]
    fn copies_are_independent() {
        let dispatcher = CommandDispatcher::new();
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), dispatcher.root(), 0);
        let copy = builder.copy();
        builder.put_entry(key(), Value::Player("Steve".to_string()));
        assert!(!copy.has_any(&key()));
    }

    #[test]
    fn typed_getters_use_value_type() {
        let dispatcher = CommandDispatcher::new();
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), dispatcher.root(), 0);
        builder.put_entry(Key::new("amount", ValueType::Integer), Value::Integer(5));
        let context = builder.build("give 5");
        assert_eq!(context.get_integer("amount").unwrap(), 5);
        assert!(context.get_long("amount").is_err());
    }
}
