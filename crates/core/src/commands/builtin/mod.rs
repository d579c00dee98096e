use crate::commands::{
    argument::ArgumentType,
    context::CommandContext,
    error::{CommandError, CommandResult},
    node::CommandBuilder,
    registry::{CommandManager, PluginId},
    tree::NodeId,
    usage,
};
use indexmap::IndexMap;
use itertools::Itertools;
use tracing::warn;

/// Registers the commands every server has.
pub fn register_commands(manager: &mut CommandManager) {
    if let Err(err) = manager.register_brigadier(&PluginId::sponge(), help_command(), &[]) {
        warn!("Could not register /help: {}", err);
    }
}

fn help_command() -> CommandBuilder {
    CommandBuilder::literal("help")
        .executes(list_commands)
        .then(CommandBuilder::argument("command", ArgumentType::greedy_string()).executes(command_help))
}

fn list_commands(ctx: &CommandContext<'_>) -> CommandResult<i32> {
    let tree = ctx.dispatcher().tree();
    let mut commands = Vec::new();
    let mut aliases: IndexMap<NodeId, Vec<&str>> = IndexMap::new();

    for child in tree.node(tree.root()).children() {
        let node = tree.node(child);
        if !node.can_use(ctx.cause()) {
            continue;
        }
        match node.redirect() {
            Some(_) if node.name().contains(':') => {}
            Some(target) => aliases.entry(target).or_default().push(node.name()),
            None => commands.push(child),
        }
    }

    let lines = commands
        .iter()
        .map(|id| {
            let name = tree.node(*id).name();
            match aliases.get(id) {
                Some(aliases) => format!("/{} (Aliases: {})", name, aliases.join(", ")),
                None => format!("/{}", name),
            }
        })
        .sorted()
        .collect_vec();

    ctx.reply("Run /help <command> for more information.");
    ctx.reply("Available commands:");
    for line in &lines {
        ctx.reply(&format!(" {}", line));
    }
    Ok(lines.len() as i32)
}

fn command_help(ctx: &CommandContext<'_>) -> CommandResult<i32> {
    let command = ctx.get_greedy("command")?;
    let name = command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_lowercase();

    let dispatcher = ctx.dispatcher();
    let tree = dispatcher.tree();
    let node = dispatcher
        .find_node(&[name.as_str()])
        .filter(|node| tree.node(*node).can_use(ctx.cause()))
        .ok_or_else(|| CommandError::runtime(format!("Command not found: {}", command)))?;
    let node = match tree.node(node).redirect() {
        Some(target) if target != tree.root() => target,
        _ => node,
    };

    ctx.reply(&format!(
        "Usage: {}",
        usage::generate_usage(tree, node, ctx.cause())
    ));
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cause::CommandCause;

    fn manager() -> CommandManager {
        let mut manager = CommandManager::default();
        register_commands(&mut manager);
        manager
            .register_brigadier(
                &PluginId::new("test"),
                CommandBuilder::literal("give").then(
                    CommandBuilder::argument("target", ArgumentType::player()).then(
                        CommandBuilder::argument("amount", ArgumentType::integer()).executes(|_| Ok(1)),
                    ),
                ),
                &["g"],
            )
            .unwrap();
        manager
    }

    #[test]
    fn lists_commands_with_aliases() {
        let manager = manager();
        let cause = CommandCause::console();
        assert_eq!(manager.execute(&cause, "help").unwrap(), 2);
        let texts: Vec<String> = cause.take_messages().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts,
            vec![
                "Run /help <command> for more information.",
                "Available commands:",
                " /give (Aliases: g)",
                " /help",
            ]
        );
    }

    #[test]
    fn shows_usage_through_aliases() {
        let manager = manager();
        let cause = CommandCause::console();
        manager.execute(&cause, "help g").unwrap();
        assert_eq!(cause.take_messages()[0].text, "Usage: /give <target> <amount>");

        manager.execute(&cause, "help nothing").unwrap();
        let messages = cause.take_messages();
        assert!(messages[0].is_error);
        assert_eq!(messages[0].text, "Command not found: nothing");
    }

    #[test]
    fn help_cannot_be_unregistered() {
        let mut manager = manager();
        let mapping = manager.mapping("help").cloned().unwrap();
        assert!(!manager.unregister(&mapping));
        assert!(manager.help(&CommandCause::console(), "help").is_some());
    }
}
