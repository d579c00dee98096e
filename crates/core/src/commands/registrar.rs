//! Registrars turn the different ways of describing a command into nodes of
//! the shared dispatcher and answer for the commands they registered.

use crate::commands::argument::ArgumentType;
use crate::commands::cause::CommandCause;
use crate::commands::context::CommandContext;
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::error::{CommandResult, RegistrationError, RuntimeError};
use crate::commands::node::CommandBuilder;
use crate::commands::parameter::Parameter;
use crate::commands::registry::CommandMapping;
use crate::commands::tree::{Command, NodeId, Requirement};
use crate::commands::usage;
use crate::commands::value::{Key, ValueType};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the argument holding everything after a raw command's alias.
pub const RAW_ARGUMENTS: &str = "parameters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrarKey {
    Brigadier,
    Managed,
    Raw,
}

impl fmt::Display for RegistrarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrarKey::Brigadier => "sponge:brigadier",
            RegistrarKey::Managed => "sponge:managed",
            RegistrarKey::Raw => "sponge:raw",
        };
        f.write_str(name)
    }
}

/// Rebuilds the line the dispatcher sees from a resolved alias and the
/// untouched argument tail.
fn command_line(command: &str, arguments: &str) -> String {
    if arguments.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, arguments)
    }
}

/// Adds every alias of `mapping` other than the primary one as a redirect to
/// `primary`.
fn register_aliases(dispatcher: &mut CommandDispatcher, mapping: &CommandMapping, primary: NodeId) {
    for alias in mapping.all_aliases() {
        if alias != mapping.primary_alias() {
            dispatcher.register_redirect(alias, primary);
        }
    }
}

fn remove_aliases(dispatcher: &mut CommandDispatcher, mapping: &CommandMapping) {
    for alias in mapping.all_aliases() {
        dispatcher.unregister(alias);
    }
}

pub trait CommandRegistrar: Send + Sync {
    fn key(&self) -> RegistrarKey;

    /// Runs `command` (always the primary alias) with the argument tail.
    fn process(
        &self,
        dispatcher: &CommandDispatcher,
        cause: &CommandCause,
        command: &str,
        arguments: &str,
    ) -> CommandResult<i32> {
        let line = command_line(command, arguments);
        dispatcher.execute_input(&line, cause.clone())
    }

    /// Completions for the last token of `arguments`.
    fn suggestions(
        &self,
        dispatcher: &CommandDispatcher,
        cause: &CommandCause,
        command: &str,
        arguments: &str,
    ) -> CommandResult<Vec<String>> {
        let line = format!("{} {}", command, arguments);
        let parse = dispatcher.parse(&line, cause.clone());
        let suggestions = dispatcher.completion_suggestions(&parse, line.len())?;
        Ok(suggestions.list.into_iter().map(|s| s.text).collect())
    }

    fn help(&self, dispatcher: &CommandDispatcher, cause: &CommandCause, command: &str) -> Option<String> {
        let node = dispatcher.find_node(&[command])?;
        if !dispatcher.tree().node(node).can_use(cause) {
            return None;
        }
        Some(usage::generate_usage(dispatcher.tree(), node, cause))
    }

    /// Removes whatever was registered for `mapping`.
    fn unregister(&mut self, dispatcher: &mut CommandDispatcher, mapping: &CommandMapping) {
        remove_aliases(dispatcher, mapping);
    }
}

/// Registers builder trees as they are, the way vanilla commands are written.
#[derive(Debug, Default)]
pub struct BrigadierRegistrar;

impl BrigadierRegistrar {
    pub(crate) fn register(
        &self,
        dispatcher: &mut CommandDispatcher,
        mapping: &CommandMapping,
        command: CommandBuilder,
        require_permission: bool,
    ) -> Result<NodeId, RegistrationError> {
        if !command.is_literal() {
            return Err(RegistrationError::NotACommandLiteral);
        }
        let mut command = if command.name() == mapping.primary_alias() {
            command
        } else {
            command.with_literal(mapping.primary_alias())
        };
        if require_permission {
            let alias = mapping
                .primary_alias()
                .rsplit(':')
                .next()
                .unwrap_or(mapping.primary_alias());
            command = command.require_permission(format!("{}.command.{}", mapping.plugin(), alias));
        }
        let primary = dispatcher.register(command);
        register_aliases(dispatcher, mapping, primary);
        Ok(primary)
    }
}

impl CommandRegistrar for BrigadierRegistrar {
    fn key(&self) -> RegistrarKey {
        RegistrarKey::Brigadier
    }
}

/// A command described by its parameters and child commands.
#[derive(Clone, Default)]
pub struct ParameterizedCommand {
    parameters: Vec<Arc<Parameter>>,
    subcommands: Vec<(Vec<String>, ParameterizedCommand)>,
    executor: Option<Command>,
    requirements: Vec<Requirement>,
    short_description: Option<String>,
}

impl fmt::Debug for ParameterizedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterizedCommand")
            .field("parameters", &self.parameters)
            .field("subcommands", &self.subcommands)
            .field("executable", &self.executor.is_some())
            .field("short_description", &self.short_description)
            .finish()
    }
}

impl ParameterizedCommand {
    pub fn builder() -> ParameterizedCommandBuilder {
        ParameterizedCommandBuilder::default()
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    pub fn subcommands(&self) -> &[(Vec<String>, ParameterizedCommand)] {
        &self.subcommands
    }

    pub fn short_description(&self) -> Option<&str> {
        self.short_description.as_deref()
    }

    pub fn is_executable(&self) -> bool {
        self.executor.is_some()
    }

    pub fn can_execute(&self, cause: &CommandCause) -> bool {
        self.requirements.iter().all(|requirement| requirement(cause))
    }

    /// The literal `name` with this command's parameters and children below it.
    pub fn to_builder(&self, name: &str) -> CommandBuilder {
        let mut node = CommandBuilder::literal(name);
        for requirement in &self.requirements {
            let requirement = Arc::clone(requirement);
            node = node.requires(move |cause| requirement(cause));
        }
        if let Some(executor) = &self.executor {
            if self.parameters.iter().all(|parameter| parameter.is_optional()) {
                node = node.with_command(Arc::clone(executor));
            }
            for child in parameter_chain(&self.parameters, executor) {
                node = node.then(child);
            }
        }
        for (aliases, subcommand) in &self.subcommands {
            for alias in aliases {
                node = node.then(subcommand.to_builder(alias));
            }
        }
        node
    }
}

/// The nodes that may start `parameters`. An optional parameter can be left
/// out, so whatever may follow it is offered as a sibling as well.
fn parameter_chain(parameters: &[Arc<Parameter>], executor: &Command) -> Vec<CommandBuilder> {
    let Some((first, rest)) = parameters.split_first() else {
        return Vec::new();
    };
    let mut node = CommandBuilder::parameter(Arc::clone(first));
    if rest.iter().all(|parameter| parameter.is_optional()) {
        node = node.with_command(Arc::clone(executor));
    }
    for child in parameter_chain(rest, executor) {
        node = node.then(child);
    }
    let mut chain = vec![node];
    if first.is_optional() {
        chain.extend(parameter_chain(rest, executor));
    }
    chain
}

#[derive(Default)]
pub struct ParameterizedCommandBuilder {
    command: ParameterizedCommand,
}

impl ParameterizedCommandBuilder {
    pub fn add_parameter(mut self, parameter: impl Into<Arc<Parameter>>) -> Self {
        self.command.parameters.push(parameter.into());
        self
    }

    pub fn add_parameters<P: Into<Arc<Parameter>>>(
        mut self,
        parameters: impl IntoIterator<Item = P>,
    ) -> Self {
        self.command
            .parameters
            .extend(parameters.into_iter().map(Into::into));
        self
    }

    pub fn add_child<S: Into<String>>(
        mut self,
        child: ParameterizedCommand,
        aliases: impl IntoIterator<Item = S>,
    ) -> Self {
        let aliases = aliases.into_iter().map(Into::into).collect();
        self.command.subcommands.push((aliases, child));
        self
    }

    pub fn executor(
        mut self,
        executor: impl Fn(&CommandContext<'_>) -> CommandResult<i32> + Send + Sync + 'static,
    ) -> Self {
        self.command.executor = Some(Arc::new(executor));
        self
    }

    pub fn permission(self, permission: impl Into<String>) -> Self {
        let permission = permission.into();
        self.requirement(move |cause| cause.has_permission(&permission))
    }

    pub fn requirement(mut self, requirement: impl Fn(&CommandCause) -> bool + Send + Sync + 'static) -> Self {
        self.command.requirements.push(Arc::new(requirement));
        self
    }

    pub fn short_description(mut self, description: impl Into<String>) -> Self {
        self.command.short_description = Some(description.into());
        self
    }

    pub fn build(self) -> Result<ParameterizedCommand, RegistrationError> {
        if self.command.executor.is_none() && self.command.subcommands.is_empty() {
            return Err(RegistrationError::EmptyCommand);
        }
        Ok(self.command)
    }
}

#[derive(Debug, Default)]
pub struct ManagedRegistrar {
    descriptions: FxHashMap<String, String>,
}

impl ManagedRegistrar {
    pub(crate) fn register(
        &mut self,
        dispatcher: &mut CommandDispatcher,
        mapping: &CommandMapping,
        command: &ParameterizedCommand,
    ) -> NodeId {
        let primary = dispatcher.register(command.to_builder(mapping.primary_alias()));
        register_aliases(dispatcher, mapping, primary);
        if let Some(description) = command.short_description() {
            self.descriptions
                .insert(mapping.primary_alias().to_string(), description.to_string());
        }
        primary
    }
}

impl CommandRegistrar for ManagedRegistrar {
    fn key(&self) -> RegistrarKey {
        RegistrarKey::Managed
    }

    fn help(&self, dispatcher: &CommandDispatcher, cause: &CommandCause, command: &str) -> Option<String> {
        let node = dispatcher.find_node(&[command])?;
        if !dispatcher.tree().node(node).can_use(cause) {
            return None;
        }
        let usage = usage::generate_usage(dispatcher.tree(), node, cause);
        Some(match self.descriptions.get(command) {
            Some(description) => format!("{}\n{}", description, usage),
            None => usage,
        })
    }

    fn unregister(&mut self, dispatcher: &mut CommandDispatcher, mapping: &CommandMapping) {
        self.descriptions.remove(mapping.primary_alias());
        remove_aliases(dispatcher, mapping);
    }
}

/// A command that handles its whole argument string itself.
pub trait RawCommand: Send + Sync {
    fn process(&self, cause: &CommandCause, arguments: &str) -> CommandResult<i32>;

    /// Completions for the last word of `arguments`.
    fn suggestions(&self, _cause: &CommandCause, _arguments: &str) -> Vec<String> {
        Vec::new()
    }

    fn can_execute(&self, _cause: &CommandCause) -> bool {
        true
    }

    fn short_description(&self, _cause: &CommandCause) -> Option<String> {
        None
    }

    fn usage(&self, _cause: &CommandCause) -> String {
        String::new()
    }
}

fn raw_arguments_key() -> Key {
    Key::new(RAW_ARGUMENTS, ValueType::GreedyString)
}

#[derive(Default)]
pub struct RawRegistrar {
    commands: IndexMap<String, Arc<dyn RawCommand>>,
}

impl RawRegistrar {
    /// Exposes `command` to the tree as the primary literal followed by a
    /// single argument taking the rest of the line.
    pub(crate) fn register(
        &mut self,
        dispatcher: &mut CommandDispatcher,
        mapping: &CommandMapping,
        command: Arc<dyn RawCommand>,
    ) -> NodeId {
        let executor: Command = {
            let command = Arc::clone(&command);
            Arc::new(move |context: &CommandContext<'_>| {
                let arguments = match context.one(&raw_arguments_key())? {
                    Some(value) => value.as_greedy()?.clone(),
                    None => String::new(),
                };
                command.process(context.cause(), &arguments)
            })
        };
        let completer = Arc::clone(&command);
        let arguments = Parameter::of(RAW_ARGUMENTS, ArgumentType::Remaining).suggestions(
            move |context: &CommandContext<'_>, input: &str| {
                // Completions replace the last word only; the dispatcher
                // matches them against the whole argument string.
                let prefix = match input.rfind(' ') {
                    Some(space) => &input[..=space],
                    None => "",
                };
                completer
                    .suggestions(context.cause(), input)
                    .into_iter()
                    .map(|suggestion| format!("{}{}", prefix, suggestion))
                    .collect()
            },
        );
        let can_execute = Arc::clone(&command);
        let node = CommandBuilder::literal(mapping.primary_alias())
            .requires(move |cause| can_execute.can_execute(cause))
            .with_command(Arc::clone(&executor))
            .then(CommandBuilder::parameter(arguments).with_command(executor));

        let primary = dispatcher.register(node);
        register_aliases(dispatcher, mapping, primary);
        self.commands
            .insert(mapping.primary_alias().to_string(), command);
        primary
    }

    pub fn command(&self, primary_alias: &str) -> Option<&Arc<dyn RawCommand>> {
        self.commands.get(primary_alias)
    }
}

impl CommandRegistrar for RawRegistrar {
    fn key(&self) -> RegistrarKey {
        RegistrarKey::Raw
    }

    fn process(
        &self,
        _dispatcher: &CommandDispatcher,
        cause: &CommandCause,
        command: &str,
        arguments: &str,
    ) -> CommandResult<i32> {
        let raw = self
            .commands
            .get(command)
            .ok_or_else(|| RuntimeError::UnknownCommand {
                command: command.to_string(),
            })?;
        if !raw.can_execute(cause) {
            return Err(RuntimeError::PermissionDenied {
                permission: command.to_string(),
            }
            .into());
        }
        debug!("running raw command {} with '{}'", command, arguments);
        raw.process(cause, arguments)
    }

    fn suggestions(
        &self,
        _dispatcher: &CommandDispatcher,
        cause: &CommandCause,
        command: &str,
        arguments: &str,
    ) -> CommandResult<Vec<String>> {
        Ok(match self.commands.get(command) {
            Some(raw) if raw.can_execute(cause) => raw.suggestions(cause, arguments),
            _ => Vec::new(),
        })
    }

    fn help(&self, _dispatcher: &CommandDispatcher, cause: &CommandCause, command: &str) -> Option<String> {
        let raw = self.commands.get(command)?;
        if !raw.can_execute(cause) {
            return None;
        }
        let usage = command_line(&format!("/{}", command), &raw.usage(cause));
        Some(match raw.short_description(cause) {
            Some(description) => format!("{}\n{}", description, usage),
            None => usage,
        })
    }

    fn unregister(&mut self, dispatcher: &mut CommandDispatcher, mapping: &CommandMapping) {
        self.commands.shift_remove(mapping.primary_alias());
        remove_aliases(dispatcher, mapping);
    }
}
