use crate::commands::cause::CommandCause;
use crate::commands::tree::{CommandTree, NodeId};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

fn redirect_text(tree: &CommandTree, target: NodeId) -> String {
    if target == tree.root() {
        "...".to_string()
    } else {
        format!("-> {}", tree.node(target).usage_text())
    }
}

/// Every executable path below `node`, relative to it.
pub fn all_usage(
    tree: &CommandTree,
    node: NodeId,
    cause: &CommandCause,
    restricted: bool,
) -> Vec<String> {
    let mut result = Vec::new();
    collect_usage(tree, node, cause, &mut result, String::new(), restricted);
    result
}

fn collect_usage(
    tree: &CommandTree,
    id: NodeId,
    cause: &CommandCause,
    result: &mut Vec<String>,
    prefix: String,
    restricted: bool,
) {
    let node = tree.node(id);
    if restricted && !node.can_use(cause) {
        return;
    }
    if node.is_executable() && !prefix.is_empty() {
        result.push(prefix.clone());
    }
    if let Some(redirect) = node.redirect() {
        let redirect = redirect_text(tree, redirect);
        if prefix.is_empty() {
            result.push(format!("{} {}", node.usage_text(), redirect));
        } else {
            result.push(format!("{} {}", prefix, redirect));
        }
        return;
    }
    for child in node.children() {
        let child_usage = tree.node(child).usage_text();
        let prefix = if prefix.is_empty() {
            child_usage
        } else {
            format!("{} {}", prefix, child_usage)
        };
        collect_usage(tree, child, cause, result, prefix, restricted);
    }
}

/// One condensed usage line per child of `node` the cause may use, eg.
/// `give <target> <item> [<amount>]` or `gamemode (survival|creative)`.
pub fn smart_usage(tree: &CommandTree, node: NodeId, cause: &CommandCause) -> IndexMap<NodeId, String> {
    let optional = tree.node(node).is_executable();
    tree.node(node)
        .children()
        .filter_map(|child| {
            smart_usage_of(tree, child, cause, optional, false).map(|usage| (child, usage))
        })
        .collect()
}

fn smart_usage_of(
    tree: &CommandTree,
    id: NodeId,
    cause: &CommandCause,
    optional: bool,
    deep: bool,
) -> Option<String> {
    let node = tree.node(id);
    if !node.can_use(cause) {
        return None;
    }

    let this = if optional {
        format!("[{}]", node.usage_text())
    } else {
        node.usage_text()
    };
    if deep {
        return Some(this);
    }
    if let Some(redirect) = node.redirect() {
        return Some(format!("{} {}", this, redirect_text(tree, redirect)));
    }

    let child_optional = node.is_executable();
    let (open, close) = if child_optional { ("[", "]") } else { ("(", ")") };
    let children = node
        .children()
        .filter(|child| tree.node(*child).can_use(cause))
        .collect_vec();

    match children.as_slice() {
        [] => Some(this),
        [only] => match smart_usage_of(tree, *only, cause, child_optional, child_optional) {
            Some(usage) => Some(format!("{} {}", this, usage)),
            None => Some(this),
        },
        _ => {
            let alternatives: IndexSet<String> = children
                .iter()
                .filter_map(|child| smart_usage_of(tree, *child, cause, false, true))
                .collect();
            match alternatives.len() {
                0 => Some(this),
                1 => {
                    let usage = &alternatives[0];
                    if child_optional {
                        Some(format!("{} {}{}{}", this, open, usage, close))
                    } else {
                        Some(format!("{} {}", this, usage))
                    }
                }
                _ => Some(format!(
                    "{} {}{}{}",
                    this,
                    open,
                    alternatives.iter().join("|"),
                    close
                )),
            }
        }
    }
}

/// The usage of a single command, eg. `/give <target> <item> <amount>`.
pub fn generate_usage(tree: &CommandTree, command: NodeId, cause: &CommandCause) -> String {
    let root = tree.root();
    match smart_usage(tree, root, cause).get(&command) {
        Some(usage) => format!("/{}", usage),
        None => format!("/{}", tree.node(command).usage_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::argument::ArgumentType;
    use crate::commands::dispatcher::CommandDispatcher;
    use crate::commands::node::CommandBuilder;

    fn dispatcher() -> CommandDispatcher {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(
            CommandBuilder::literal("give").then(
                CommandBuilder::argument("target", ArgumentType::player()).then(
                    CommandBuilder::argument("item", ArgumentType::word())
                        .executes(|_| Ok(1))
                        .then(
                            CommandBuilder::argument("amount", ArgumentType::integer())
                                .executes(|_| Ok(1)),
                        ),
                ),
            ),
        );
        dispatcher.register(
            CommandBuilder::literal("gamemode")
                .then(CommandBuilder::literal("survival").executes(|_| Ok(1)))
                .then(CommandBuilder::literal("creative").executes(|_| Ok(1))),
        );
        let give = dispatcher.find_node(&["give"]).unwrap();
        dispatcher.register_redirect("g", give);
        dispatcher
    }

    #[test]
    fn smart_usage_condenses_branches() {
        let dispatcher = dispatcher();
        let cause = CommandCause::console();
        let usage = smart_usage(dispatcher.tree(), dispatcher.root(), &cause);
        let lines: Vec<&str> = usage.values().map(String::as_str).collect();
        assert_eq!(
            lines,
            vec![
                "give <target> <item> [<amount>]",
                "gamemode (survival|creative)",
                "g -> give",
            ]
        );
    }

    #[test]
    fn all_usage_lists_every_path() {
        let dispatcher = dispatcher();
        let cause = CommandCause::console();
        let give = dispatcher.find_node(&["give"]).unwrap();
        assert_eq!(
            all_usage(dispatcher.tree(), give, &cause, true),
            vec!["<target> <item>", "<target> <item> <amount>"]
        );
    }

    #[test]
    fn single_command_usage() {
        let dispatcher = dispatcher();
        let cause = CommandCause::console();
        let gamemode = dispatcher.find_node(&["gamemode"]).unwrap();
        assert_eq!(
            generate_usage(dispatcher.tree(), gamemode, &cause),
            "/gamemode (survival|creative)"
        );
    }
}
