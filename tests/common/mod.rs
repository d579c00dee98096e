use sponge_core::commands::{
    ArgumentType, CommandBuilder, CommandCause, CommandManager, Parameter, ParameterizedCommand,
    PluginId,
};

pub fn plugin() -> PluginId {
    PluginId::new("test")
}

/// `give <target> <item> [<amount>]`, the amount defaulting to 1.
pub fn give() -> CommandBuilder {
    CommandBuilder::literal("give").then(
        CommandBuilder::argument("target", ArgumentType::player()).then(
            CommandBuilder::argument("item", ArgumentType::word())
                .executes(|ctx| {
                    ctx.reply(&format!("{} {}", ctx.get_player("target")?, ctx.get_string("item")?));
                    Ok(1)
                })
                .then(
                    CommandBuilder::argument("amount", ArgumentType::integer_range(1, 64))
                        .executes(|ctx| ctx.get_integer("amount")),
                ),
        ),
    )
}

pub fn gamemode() -> ParameterizedCommand {
    ParameterizedCommand::builder()
        .add_parameter(Parameter::choices("mode", ["survival", "creative"]))
        .executor(|_| Ok(1))
        .build()
        .unwrap()
}

pub fn manager() -> CommandManager {
    let mut manager = CommandManager::default();
    manager.register_brigadier(&plugin(), give(), &["g"]).unwrap();
    manager
        .register_managed(&plugin(), &gamemode(), "gamemode", &["gm"])
        .unwrap();
    manager
}

/// Drains the messages sent to `cause`.
pub fn messages(cause: &CommandCause) -> Vec<String> {
    cause.take_messages().into_iter().map(|m| m.text).collect()
}
