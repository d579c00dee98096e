//! Arena backed command tree.
//!
//! Nodes are addressed by [`NodeId`] so redirects can point anywhere in the
//! tree, including back at the root. Detached nodes stay in the arena and ids
//! are never reused, which keeps redirects and parse results taken before an
//! unregistration pointing at valid (if unreachable) nodes.

use crate::commands::argument_node;
use crate::commands::cause::CommandCause;
use crate::commands::context::{CommandContext, CommandContextBuilder, StringRange};
use crate::commands::error::{ArgumentParseError, CommandResult};
use crate::commands::parameter::Parameter;
use crate::commands::reader::{ArgumentReader, StringReader, ARGUMENT_SEPARATOR};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub type Command = Arc<dyn Fn(&CommandContext<'_>) -> CommandResult<i32> + Send + Sync>;
/// Fans a context out to the causes the redirected part of the command runs as.
pub type RedirectModifier =
    Arc<dyn Fn(&CommandContext<'_>) -> CommandResult<Vec<CommandCause>> + Send + Sync>;
pub type Requirement = Arc<dyn Fn(&CommandCause) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone)]
pub enum NodeKind {
    Root,
    Literal(String),
    Argument(Arc<Parameter>),
}

#[derive(Clone)]
pub struct CommandNode {
    kind: NodeKind,
    children: IndexMap<String, NodeId>,
    command: Option<Command>,
    requirements: Vec<Requirement>,
    redirect: Option<NodeId>,
    modifier: Option<RedirectModifier>,
    forks: bool,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name())
            .field("children", &self.children)
            .field("executable", &self.command.is_some())
            .field("redirect", &self.redirect)
            .field("forks", &self.forks)
            .finish()
    }
}

impl CommandNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: IndexMap::new(),
            command: None,
            requirements: Vec::new(),
            redirect: None,
            modifier: None,
            forks: false,
        }
    }

    pub(crate) fn set_command(&mut self, command: Option<Command>) {
        self.command = command;
    }

    pub(crate) fn set_requirements(&mut self, requirements: Vec<Requirement>) {
        self.requirements = requirements;
    }

    pub(crate) fn set_redirect(
        &mut self,
        redirect: Option<NodeId>,
        modifier: Option<RedirectModifier>,
        forks: bool,
    ) {
        self.redirect = redirect;
        self.modifier = modifier;
        self.forks = forks;
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Root => "",
            NodeKind::Literal(name) => name,
            NodeKind::Argument(parameter) => parameter.key().name(),
        }
    }

    pub fn parameter(&self) -> Option<&Arc<Parameter>> {
        match &self.kind {
            NodeKind::Argument(parameter) => Some(parameter),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn is_executable(&self) -> bool {
        self.command.is_some()
    }

    pub fn redirect(&self) -> Option<NodeId> {
        self.redirect
    }

    pub fn redirect_modifier(&self) -> Option<&RedirectModifier> {
        self.modifier.as_ref()
    }

    pub fn is_fork(&self) -> bool {
        self.forks
    }

    pub(crate) fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn can_use(&self, cause: &CommandCause) -> bool {
        let parameter_allows = match &self.kind {
            NodeKind::Argument(parameter) => parameter.can_use(cause),
            _ => true,
        };
        parameter_allows && self.requirements.iter().all(|requirement| requirement(cause))
    }

    /// The text shown for this node in usage strings.
    pub fn usage_text(&self) -> String {
        match &self.kind {
            NodeKind::Root => String::new(),
            NodeKind::Literal(name) => name.clone(),
            NodeKind::Argument(parameter) => argument_node::usage_text(parameter),
        }
    }

    /// Consumes this node's part of the input, recording it in the builder.
    pub(crate) fn parse(
        &self,
        id: NodeId,
        reader: &mut ArgumentReader,
        builder: &mut CommandContextBuilder<'_>,
    ) -> Result<(), ArgumentParseError> {
        match &self.kind {
            NodeKind::Root => Ok(()),
            NodeKind::Literal(literal) => {
                let start = reader.cursor();
                let end = start + literal.len();
                let matches = reader.remaining().starts_with(literal.as_str())
                    && (end == reader.total_length()
                        || reader.input()[end..].starts_with(ARGUMENT_SEPARATOR));
                if !matches {
                    return Err(reader.create_error(format!("Expected literal {}", literal)));
                }
                reader.set_cursor(end);
                builder.with_node(id, StringRange::between(start, end));
                Ok(())
            }
            NodeKind::Argument(parameter) => {
                argument_node::parse_argument(id, parameter, reader, builder)
            }
        }
    }
}

/// Owns every node; [`NodeId::ROOT`] is always the root.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode::new(NodeKind::Root)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Panics on an id that was not produced by this tree.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn add(&mut self, node: CommandNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Attaches `child` below `parent`. A child with the same name merges
    /// into the existing one: the new executor replaces the old one if set and
    /// grandchildren are merged recursively. Returns the id that ends up in
    /// the tree.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let name = self.node(child).name().to_string();
        match self.node(parent).child(&name) {
            Some(existing) if existing != child => {
                if let Some(command) = self.node(child).command.clone() {
                    self.node_mut(existing).command = Some(command);
                }
                let grandchildren: Vec<NodeId> = self.node(child).children().collect();
                for grandchild in grandchildren {
                    self.add_child(existing, grandchild);
                }
                existing
            }
            _ => {
                self.node_mut(parent).children.insert(name, child);
                child
            }
        }
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node_mut(parent).children.shift_remove(name)
    }

    /// Walks literal and argument names from the root.
    pub fn find_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut current = self.root();
        for segment in path {
            current = self.node(current).child(segment.as_ref())?;
        }
        Some(current)
    }

    /// The names leading from the root to `target`, if it is reachable.
    pub fn path(&self, target: NodeId) -> Option<Vec<String>> {
        let mut path = Vec::new();
        if self.find_path(self.root(), target, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_path(&self, current: NodeId, target: NodeId, path: &mut Vec<String>) -> bool {
        if current == target {
            return true;
        }
        for child in self.node(current).children() {
            path.push(self.node(child).name().to_string());
            if self.find_path(child, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(tree: &mut CommandTree, name: &str) -> NodeId {
        tree.add(CommandNode::new(NodeKind::Literal(name.to_string())))
    }

    #[test]
    fn same_name_children_merge() {
        let mut tree = CommandTree::new();
        let first = literal(&mut tree, "plot");
        let claim = literal(&mut tree, "claim");
        tree.add_child(first, claim);
        let root = tree.root();
        tree.add_child(root, first);

        let second = literal(&mut tree, "plot");
        let visit = literal(&mut tree, "visit");
        tree.add_child(second, visit);
        let merged = tree.add_child(root, second);

        assert_eq!(merged, first);
        assert_eq!(tree.node(root).children().count(), 1);
        assert_eq!(tree.find_node(&["plot", "visit"]), Some(visit));
        assert_eq!(tree.find_node(&["plot", "claim"]), Some(claim));
    }

    #[test]
    fn paths_and_removal() {
        let mut tree = CommandTree::new();
        let root = tree.root();
        let a = literal(&mut tree, "a");
        let b = literal(&mut tree, "b");
        tree.add_child(a, b);
        tree.add_child(root, a);

        assert_eq!(tree.path(b), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(tree.path(root), Some(vec![]));

        assert_eq!(tree.remove_child(root, "a"), Some(a));
        assert_eq!(tree.path(b), None);
        // The detached node is still addressable.
        assert_eq!(tree.node(b).name(), "b");
    }
}
