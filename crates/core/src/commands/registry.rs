//! The alias table and the service hosts send command lines to.

use crate::commands::autocomplete;
use crate::commands::cause::CommandCause;
use crate::commands::description::CommandTreeNode;
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::error::{
    CommandError, CommandResult, InternalError, RegistrationError, RuntimeError,
    UnwrapRuntimeError,
};
use crate::commands::node::CommandBuilder;
use crate::commands::reader::ARGUMENT_SEPARATOR;
use crate::commands::registrar::{
    BrigadierRegistrar, CommandRegistrar, ManagedRegistrar, ParameterizedCommand, RawCommand,
    RawRegistrar, RegistrarKey,
};
use crate::commands::usage;
use crate::config::CommandConfig;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use sponge_network::packets::clientbound::CCommands;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Owners whose commands can never be unregistered.
const PROTECTED_OWNERS: [&str; 2] = ["minecraft", "sponge"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    pub fn minecraft() -> Self {
        Self::new("minecraft")
    }

    pub fn sponge() -> Self {
        Self::new("sponge")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_protected(&self) -> bool {
        PROTECTED_OWNERS.contains(&self.0.as_str())
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registered command and every alias it answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMapping {
    primary_alias: String,
    all_aliases: IndexSet<String>,
    plugin: PluginId,
    registrar: RegistrarKey,
}

impl CommandMapping {
    pub(crate) fn new(
        primary_alias: impl Into<String>,
        all_aliases: IndexSet<String>,
        plugin: PluginId,
        registrar: RegistrarKey,
    ) -> Self {
        Self {
            primary_alias: primary_alias.into(),
            all_aliases,
            plugin,
            registrar,
        }
    }

    pub fn primary_alias(&self) -> &str {
        &self.primary_alias
    }

    pub fn all_aliases(&self) -> &IndexSet<String> {
        &self.all_aliases
    }

    pub fn plugin(&self) -> &PluginId {
        &self.plugin
    }

    pub fn registrar(&self) -> RegistrarKey {
        self.registrar
    }
}

/// Commands that can be registered without building a tree by hand.
pub enum RegisteredCommand {
    Parameterized(ParameterizedCommand),
    Raw(Arc<dyn RawCommand>),
}

impl From<ParameterizedCommand> for RegisteredCommand {
    fn from(command: ParameterizedCommand) -> Self {
        RegisteredCommand::Parameterized(command)
    }
}

impl From<Arc<dyn RawCommand>> for RegisteredCommand {
    fn from(command: Arc<dyn RawCommand>) -> Self {
        RegisteredCommand::Raw(command)
    }
}

/// For hosts that run commands from more than one thread.
pub type SharedCommandManager = Arc<RwLock<CommandManager>>;

pub struct CommandManager {
    config: CommandConfig,
    dispatcher: CommandDispatcher,
    commands: IndexMap<String, Arc<CommandMapping>>,
    plugin_commands: IndexMap<PluginId, Vec<Arc<CommandMapping>>>,
    brigadier: BrigadierRegistrar,
    managed: ManagedRegistrar,
    raw: RawRegistrar,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(CommandConfig::default())
    }
}

impl CommandManager {
    pub fn new(config: CommandConfig) -> Self {
        Self {
            config,
            dispatcher: CommandDispatcher::new(),
            commands: IndexMap::new(),
            plugin_commands: IndexMap::new(),
            brigadier: BrigadierRegistrar,
            managed: ManagedRegistrar::default(),
            raw: RawRegistrar::default(),
        }
    }

    pub fn into_shared(self) -> SharedCommandManager {
        Arc::new(RwLock::new(self))
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    fn registrar(&self, key: RegistrarKey) -> &dyn CommandRegistrar {
        match key {
            RegistrarKey::Brigadier => &self.brigadier,
            RegistrarKey::Managed => &self.managed,
            RegistrarKey::Raw => &self.raw,
        }
    }

    /// Claims `primary` and `secondary` for `plugin`.
    ///
    /// Aliases already taken by another command, or reserved for another
    /// plugin in the configuration, are dropped. `plugin:primary` is always
    /// requested as well so the command stays reachable when its bare alias
    /// is lost.
    pub fn register_alias(
        &mut self,
        registrar: RegistrarKey,
        plugin: &PluginId,
        primary: &str,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        let primary_lowercase = primary.to_lowercase();
        let namespaced = format!("{}:{}", plugin, primary_lowercase);
        let requested = std::iter::once(primary)
            .chain(secondary.iter().copied())
            .chain(std::iter::once(namespaced.as_str()));
        for alias in requested {
            if alias.is_empty() || alias.chars().any(char::is_whitespace) {
                return Err(RegistrationError::InvalidAlias {
                    alias: alias.to_string(),
                });
            }
        }

        if self.commands.contains_key(&namespaced) {
            return Err(RegistrationError::AlreadyRegistered { alias: namespaced });
        }

        let mut aliases = IndexSet::new();
        aliases.insert(primary_lowercase.clone());
        aliases.insert(namespaced.clone());
        aliases.extend(secondary.iter().map(|alias| alias.to_lowercase()));

        aliases.retain(|alias| match self.commands.get(alias) {
            Some(existing) => {
                warn!(
                    "Alias {} requested by {} is already used by {}",
                    alias,
                    plugin,
                    existing.plugin()
                );
                false
            }
            None => true,
        });
        aliases.retain(|alias| match self.config.reserved_owner(alias) {
            Some(owner) if !owner.eq_ignore_ascii_case(plugin.as_str()) => {
                warn!(
                    "Alias {} requested by {} is reserved for {} in the configuration",
                    alias, plugin, owner
                );
                false
            }
            _ => true,
        });

        let primary_alias = if aliases.contains(&primary_lowercase) {
            primary_lowercase
        } else if aliases.contains(&namespaced) {
            namespaced
        } else {
            match aliases.first() {
                Some(alias) => alias.clone(),
                None => return Err(RegistrationError::NoAliasesAvailable),
            }
        };

        let mapping = Arc::new(CommandMapping::new(
            primary_alias,
            aliases,
            plugin.clone(),
            registrar,
        ));
        for alias in mapping.all_aliases() {
            self.commands.insert(alias.clone(), Arc::clone(&mapping));
        }
        self.plugin_commands
            .entry(plugin.clone())
            .or_default()
            .push(Arc::clone(&mapping));
        info!(
            "Registered /{} for {} ({})",
            mapping.primary_alias(),
            plugin,
            mapping.all_aliases().iter().join(", ")
        );
        Ok(mapping)
    }

    /// Registers a builder tree. The literal's name is the requested primary
    /// alias; the tree is renamed if that alias was lost.
    pub fn register_brigadier(
        &mut self,
        plugin: &PluginId,
        command: CommandBuilder,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        self.register_brigadier_internal(plugin, command, secondary, false)
    }

    /// Like [`CommandManager::register_brigadier`], but running the command
    /// needs the `<plugin>.command.<alias>` permission.
    pub fn register_brigadier_with_permission(
        &mut self,
        plugin: &PluginId,
        command: CommandBuilder,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        self.register_brigadier_internal(plugin, command, secondary, true)
    }

    fn register_brigadier_internal(
        &mut self,
        plugin: &PluginId,
        command: CommandBuilder,
        secondary: &[&str],
        require_permission: bool,
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        if !command.is_literal() {
            return Err(RegistrationError::NotACommandLiteral);
        }
        let primary = command.name().to_string();
        let mapping = self.register_alias(RegistrarKey::Brigadier, plugin, &primary, secondary)?;
        self.brigadier
            .register(&mut self.dispatcher, &mapping, command, require_permission)?;
        Ok(mapping)
    }

    pub fn register_managed(
        &mut self,
        plugin: &PluginId,
        command: &ParameterizedCommand,
        primary: &str,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        let mapping = self.register_alias(RegistrarKey::Managed, plugin, primary, secondary)?;
        self.managed.register(&mut self.dispatcher, &mapping, command);
        Ok(mapping)
    }

    pub fn register_raw(
        &mut self,
        plugin: &PluginId,
        command: Arc<dyn RawCommand>,
        primary: &str,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        let mapping = self.register_alias(RegistrarKey::Raw, plugin, primary, secondary)?;
        self.raw.register(&mut self.dispatcher, &mapping, command);
        Ok(mapping)
    }

    /// Sends parameterized commands to the managed registrar and everything
    /// else to the raw one.
    pub fn register(
        &mut self,
        plugin: &PluginId,
        command: impl Into<RegisteredCommand>,
        primary: &str,
        secondary: &[&str],
    ) -> Result<Arc<CommandMapping>, RegistrationError> {
        match command.into() {
            RegisteredCommand::Parameterized(command) => {
                self.register_managed(plugin, &command, primary, secondary)
            }
            RegisteredCommand::Raw(command) => self.register_raw(plugin, command, primary, secondary),
        }
    }

    /// Runs `line`. Only the first space separates the command from its
    /// arguments; the rest is passed on untouched.
    pub fn process(&self, cause: &CommandCause, line: &str) -> CommandResult<i32> {
        let (head, arguments) = line
            .split_once(ARGUMENT_SEPARATOR)
            .unwrap_or((line, ""));
        let mapping = self
            .commands
            .get(&head.to_lowercase())
            .ok_or_else(|| RuntimeError::UnknownCommand {
                command: head.to_string(),
            })?;
        debug!(
            "{} runs /{} through {}",
            cause.name(),
            mapping.primary_alias(),
            mapping.registrar()
        );
        self.registrar(mapping.registrar())
            .process(&self.dispatcher, cause, mapping.primary_alias(), arguments)
    }

    /// Runs `line` on behalf of a host. Mistakes of whoever typed the command
    /// are reported to the cause instead of being returned.
    pub fn execute(&self, cause: &CommandCause, line: &str) -> Result<i32, InternalError> {
        match self.process(cause, line) {
            Ok(result) => Ok(result),
            Err(err) if err.is_user_facing() => {
                self.report(cause, line, &err);
                Ok(0)
            }
            result => result.unwrap_runtime(),
        }
    }

    fn report(&self, cause: &CommandCause, line: &str, err: &CommandError) {
        debug!("/{} failed for {}: {}", line, cause.name(), err);
        let CommandError::Syntax(err) = err else {
            cause.send_error(&err.to_string());
            return;
        };
        cause.send_error(err.message());
        cause.send_error(&err.context());
        if !self.config.show_usage_on_error {
            return;
        }
        let head = line.split(ARGUMENT_SEPARATOR).next().unwrap_or_default();
        if let Some(usage) = self.usage(cause, head) {
            cause.send_error(&format!("Usage: {}", usage));
        }
    }

    fn usage(&self, cause: &CommandCause, alias: &str) -> Option<String> {
        let mapping = self.commands.get(&alias.to_lowercase())?;
        let node = self.dispatcher.find_node(&[mapping.primary_alias()])?;
        if !self.dispatcher.tree().node(node).can_use(cause) {
            return None;
        }
        Some(usage::generate_usage(self.dispatcher.tree(), node, cause))
    }

    fn can_use(&self, cause: &CommandCause, alias: &str) -> bool {
        self.dispatcher
            .find_node(&[alias])
            .is_some_and(|node| self.dispatcher.tree().node(node).can_use(cause))
    }

    /// Completions for `line`. Without a space these are the aliases
    /// starting with it; namespaced aliases only show up once a namespace
    /// is typed.
    pub fn suggest(&self, cause: &CommandCause, line: &str) -> CommandResult<Vec<String>> {
        let mut suggestions = match line.split_once(ARGUMENT_SEPARATOR) {
            Some((head, arguments)) => match self.commands.get(&head.to_lowercase()) {
                Some(mapping) => self.registrar(mapping.registrar()).suggestions(
                    &self.dispatcher,
                    cause,
                    mapping.primary_alias(),
                    arguments,
                )?,
                None => Vec::new(),
            },
            None => {
                let head = line.to_lowercase();
                let namespaced = head.contains(':');
                self.commands
                    .keys()
                    .filter(|alias| alias.starts_with(&head))
                    .filter(|alias| namespaced || !alias.contains(':'))
                    .filter(|alias| self.can_use(cause, alias))
                    .cloned()
                    .sorted()
                    .collect()
            }
        };
        suggestions.truncate(self.config.suggestion_limit());
        Ok(suggestions)
    }

    pub fn help(&self, cause: &CommandCause, alias: &str) -> Option<String> {
        let mapping = self.commands.get(&alias.to_lowercase())?;
        self.registrar(mapping.registrar())
            .help(&self.dispatcher, cause, mapping.primary_alias())
    }

    /// Removes every alias of `mapping` and its tree nodes. Commands of the
    /// server itself are never removed.
    pub fn unregister(&mut self, mapping: &CommandMapping) -> bool {
        if mapping.plugin().is_protected() {
            warn!(
                "Refusing to unregister /{} owned by {}",
                mapping.primary_alias(),
                mapping.plugin()
            );
            return false;
        }
        let registered = match self.commands.get(mapping.primary_alias()) {
            Some(registered) if **registered == *mapping => Arc::clone(registered),
            _ => return false,
        };

        for alias in registered.all_aliases() {
            self.commands.shift_remove(alias);
        }
        if let Some(mappings) = self.plugin_commands.get_mut(registered.plugin()) {
            mappings.retain(|other| !Arc::ptr_eq(other, &registered));
            if mappings.is_empty() {
                self.plugin_commands.shift_remove(registered.plugin());
            }
        }

        let dispatcher = &mut self.dispatcher;
        match registered.registrar() {
            RegistrarKey::Brigadier => self.brigadier.unregister(dispatcher, &registered),
            RegistrarKey::Managed => self.managed.unregister(dispatcher, &registered),
            RegistrarKey::Raw => self.raw.unregister(dispatcher, &registered),
        }
        info!(
            "Unregistered /{} of {}",
            registered.primary_alias(),
            registered.plugin()
        );
        true
    }

    /// Unregisters every command of `plugin`, returning what was removed.
    pub fn unregister_all(&mut self, plugin: &PluginId) -> Vec<Arc<CommandMapping>> {
        if plugin.is_protected() {
            warn!("Refusing to unregister the commands of {}", plugin);
            return Vec::new();
        }
        let mappings = self.mappings(plugin).to_vec();
        mappings
            .into_iter()
            .filter(|mapping| self.unregister(mapping))
            .collect()
    }

    pub fn is_registered(&self, alias: &str) -> bool {
        self.commands.contains_key(&alias.to_lowercase())
    }

    pub fn mapping(&self, alias: &str) -> Option<&Arc<CommandMapping>> {
        self.commands.get(&alias.to_lowercase())
    }

    pub fn mappings(&self, plugin: &PluginId) -> &[Arc<CommandMapping>] {
        self.plugin_commands
            .get(plugin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &PluginId> + '_ {
        self.plugin_commands.keys()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.keys().map(String::as_str)
    }

    /// The part of the tree `cause` can use, as sent to clients.
    pub fn command_tree(&self, cause: &CommandCause) -> CommandTreeNode {
        CommandTreeNode::from_dispatcher(&self.dispatcher, cause)
    }

    pub fn declare_commands_packet(&self, cause: &CommandCause) -> CCommands {
        autocomplete::generate_declare_commands_packet(&self.command_tree(cause))
    }
}
