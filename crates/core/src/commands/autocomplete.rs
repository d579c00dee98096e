use crate::commands::argument::StringKind;
use crate::commands::description::{ClientCompletionType, CommandTreeNode, NodeType, ASK_SERVER};
use rustc_hash::FxHashMap;
use sponge_network::packets::clientbound::{CCommands, CCommandsNode};
use tracing::warn;

type WireId = i32;

bitflags! {
    #[derive(Copy, Clone)]
    struct CommandFlags: u8 {
        const ROOT = 0x0;
        const LITERAL = 0x1;
        const ARGUMENT = 0x2;
        const EXECUTABLE = 0x4;
        const REDIRECT = 0x8;
        const HAS_SUGGESTIONS_TYPE = 0x10;
    }
}

/// Flattens a tree description into the node list of the commands packet.
///
/// Nodes are written children first, so the root ends up last. Redirects
/// are resolved by path once every node has an id.
pub fn generate_declare_commands_packet(tree: &CommandTreeNode) -> CCommands {
    let mut nodes = Vec::new();
    let mut ids = FxHashMap::default();
    let mut redirects = Vec::new();
    let mut path = Vec::new();

    let root_index = build_node_tree(&mut nodes, tree, &mut path, &mut ids, &mut redirects);

    for (id, target) in redirects {
        match ids.get(&target) {
            Some(target_id) => {
                let node: &mut CCommandsNode = &mut nodes[id as usize];
                node.redirect_node = Some(*target_id);
                node.flags |= CommandFlags::REDIRECT.bits() as i8;
            }
            None => warn!("Redirect target /{} is not part of the tree", target.join(" ")),
        }
    }

    CCommands { nodes, root_index }
}

fn build_node_tree(
    nodes: &mut Vec<CCommandsNode>,
    node: &CommandTreeNode,
    path: &mut Vec<String>,
    ids: &mut FxHashMap<Vec<String>, WireId>,
    redirects: &mut Vec<(WireId, Vec<String>)>,
) -> WireId {
    let mut children = Vec::with_capacity(node.children.len());
    for (name, child) in &node.children {
        path.push(name.clone());
        children.push(build_node_tree(nodes, child, path, ids, redirects));
        path.pop();
    }

    let mut flags = match node.node_type {
        NodeType::Root => CommandFlags::ROOT,
        NodeType::Literal => CommandFlags::LITERAL,
        NodeType::Argument => CommandFlags::ARGUMENT,
    };
    if node.executable {
        flags |= CommandFlags::EXECUTABLE;
    }

    let (name, parser, suggestions_type) = match node.node_type {
        NodeType::Root => (None, None, None),
        NodeType::Literal => (path.last().cloned(), None, None),
        NodeType::Argument => {
            // Parsers the client does not know are sent as a word the server
            // completes.
            let completion = node.completion_type();
            if completion.is_none() {
                warn!(
                    "Argument /{} has no parser the client understands, sending it as a word",
                    path.join(" ")
                );
            }
            let ask_server = node.custom_suggestions || completion.is_none();
            let parser = completion
                .unwrap_or(ClientCompletionType::String(StringKind::Word))
                .to_wire();
            let suggestions_type = if ask_server {
                flags |= CommandFlags::HAS_SUGGESTIONS_TYPE;
                Some(ASK_SERVER.to_string())
            } else {
                None
            };
            (path.last().cloned(), Some(parser), suggestions_type)
        }
    };

    let id = build_node(
        nodes,
        CCommandsNode {
            flags: flags.bits() as i8,
            children,
            redirect_node: None,
            name,
            parser,
            suggestions_type,
        },
    );
    ids.insert(path.clone(), id);
    if let Some(target) = &node.redirect {
        redirects.push((id, target.clone()));
    }
    id
}

fn build_node(nodes: &mut Vec<CCommandsNode>, node: CCommandsNode) -> WireId {
    let node_id = nodes.len() as WireId;
    nodes.push(node);
    node_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::argument::ArgumentType;
    use crate::commands::cause::CommandCause;
    use crate::commands::dispatcher::CommandDispatcher;
    use crate::commands::node::CommandBuilder;
    use sponge_network::packets::clientbound::{CDeclareCommandsNodeParser, ClientBoundPacket};
    use sponge_network::packets::PacketEncoderExt;

    #[test]
    fn redirect_and_argument_layout() {
        let mut dispatcher = CommandDispatcher::new();
        let give = dispatcher.register(CommandBuilder::literal("give").then(
            CommandBuilder::argument("n", ArgumentType::integer_range(1, 64)).executes(|_| Ok(1)),
        ));
        dispatcher.register_redirect("g", give);

        let description = CommandTreeNode::from_dispatcher(&dispatcher, &CommandCause::console());
        let packet = generate_declare_commands_packet(&description);

        // n, give, g, root
        assert_eq!(packet.nodes.len(), 4);
        assert_eq!(packet.root_index, 3);
        assert_eq!(packet.nodes[3].children, vec![1, 2]);
        assert_eq!(packet.nodes[0].flags, 0x02 | 0x04);
        assert_eq!(
            packet.nodes[0].parser,
            Some(CDeclareCommandsNodeParser::Integer {
                min: Some(1),
                max: Some(64)
            })
        );
        assert_eq!(packet.nodes[1].flags, 0x01);
        assert_eq!(packet.nodes[2].flags, 0x01 | 0x08);
        assert_eq!(packet.nodes[2].redirect_node, Some(1));

        let mut expected = vec![4u8];
        // n
        expected.extend_from_slice(&[0x06, 0]);
        expected.write_string(32767, "n");
        expected.write_string(32767, "brigadier:integer");
        expected.extend_from_slice(&[0x03, 0, 0, 0, 1, 0, 0, 0, 64]);
        // give
        expected.extend_from_slice(&[0x01, 1, 0]);
        expected.write_string(32767, "give");
        // g
        expected.extend_from_slice(&[0x09, 0, 1]);
        expected.write_string(32767, "g");
        // root
        expected.extend_from_slice(&[0x00, 2, 1, 2]);
        expected.push(3);
        assert_eq!(packet.encode().buffer(), expected.as_slice());
    }

    #[test]
    fn custom_suggestions_ask_the_server() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(CommandBuilder::literal("gamemode").then(
            CommandBuilder::argument("mode", ArgumentType::choices(["survival", "creative"]))
                .executes(|_| Ok(1)),
        ));
        let description = CommandTreeNode::from_dispatcher(&dispatcher, &CommandCause::console());
        let packet = generate_declare_commands_packet(&description);

        let mode = &packet.nodes[0];
        assert_eq!(mode.flags, 0x02 | 0x04 | 0x10);
        assert_eq!(mode.suggestions_type.as_deref(), Some(ASK_SERVER));
        assert_eq!(mode.parser, Some(CDeclareCommandsNodeParser::String(0)));
    }
}
