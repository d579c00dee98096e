//! A few commands to try the console with.

use sponge_core::commands::registrar::RawCommand;
use sponge_core::commands::value::{Key, ValueType};
use sponge_core::commands::{
    ArgumentType, CommandBuilder, CommandCause, CommandContext, CommandManager, CommandResult,
    Parameter, ParameterizedCommand, PluginId,
};
use std::sync::Arc;
use tracing::warn;

const PLAYERS: [&str; 3] = ["Alex", "Notch", "Steve"];

struct Say;

impl RawCommand for Say {
    fn process(&self, cause: &CommandCause, arguments: &str) -> CommandResult<i32> {
        cause.send_message(&format!("[{}] {}", cause.name(), arguments));
        Ok(1)
    }

    fn suggestions(&self, _cause: &CommandCause, arguments: &str) -> Vec<String> {
        let word = arguments.rsplit(' ').next().unwrap_or_default().to_lowercase();
        PLAYERS
            .iter()
            .filter(|player| player.to_lowercase().starts_with(&word))
            .map(|player| player.to_string())
            .collect()
    }

    fn short_description(&self, _cause: &CommandCause) -> Option<String> {
        Some("Broadcasts a message".to_string())
    }

    fn usage(&self, _cause: &CommandCause) -> String {
        "<message>".to_string()
    }
}

fn give() -> CommandBuilder {
    fn exec_give(ctx: &CommandContext<'_>, amount: i32) -> CommandResult<i32> {
        let target = ctx.get_player("target")?;
        let item = ctx.get_string("item")?;
        ctx.reply(&format!("Gave {} [{}] to {}", amount, item, target));
        Ok(amount)
    }

    CommandBuilder::literal("give").then(
        CommandBuilder::argument("target", ArgumentType::player()).then(
            CommandBuilder::argument("item", ArgumentType::word())
                .executes(|ctx| exec_give(ctx, 1))
                .then(
                    CommandBuilder::argument("amount", ArgumentType::integer_range(1, 64))
                        .executes(|ctx| {
                            let amount = ctx.get_integer("amount")?;
                            exec_give(ctx, amount)
                        }),
                ),
        ),
    )
}

fn gamemode() -> Option<ParameterizedCommand> {
    let built = ParameterizedCommand::builder()
        .add_parameter(Parameter::choices(
            "mode",
            ["survival", "creative", "adventure", "spectator"],
        ))
        .add_parameter(Parameter::player("target").optional())
        .permission("demo.gamemode")
        .short_description("Changes the game mode of a player")
        .executor(|ctx| {
            let mode = ctx.get_choice("mode")?;
            let target = match ctx.one(&Key::new("target", ValueType::Player))? {
                Some(target) => target.as_player()?.clone(),
                None => ctx.cause().name().to_string(),
            };
            ctx.reply(&format!("Set {}'s game mode to {}", target, mode));
            Ok(1)
        })
        .build();
    match built {
        Ok(command) => Some(command),
        Err(err) => {
            warn!("Could not build /gamemode: {}", err);
            None
        }
    }
}

/// `twice <command>` runs the command a second time for the same cause.
fn twice(manager: &CommandManager) -> CommandBuilder {
    let root = manager.dispatcher().root();
    CommandBuilder::literal("twice").fork(root, |ctx| Ok(vec![ctx.cause().clone(), ctx.cause().clone()]))
}

pub fn register_commands(manager: &mut CommandManager) {
    let demo = PluginId::new("demo");
    let mut results = vec![
        manager.register_brigadier(&demo, give(), &["g"]),
        manager.register_raw(&demo, Arc::new(Say), "say", &["broadcast"]),
    ];
    let twice = twice(manager);
    results.push(manager.register_brigadier(&demo, twice, &[]));
    if let Some(gamemode) = gamemode() {
        results.push(manager.register_managed(&demo, &gamemode, "gamemode", &["gm"]));
    }
    for result in results {
        if let Err(err) = result {
            warn!("Could not register a demo command: {}", err);
        }
    }
}
