use crate::commands::argument::ArgumentType;
use crate::commands::cause::CommandCause;
use crate::commands::context::CommandContext;
use crate::commands::error::CommandResult;
use crate::commands::parameter::Parameter;
use crate::commands::tree::{
    Command, CommandNode, CommandTree, NodeId, NodeKind, RedirectModifier, Requirement,
};
use std::sync::Arc;

/// Describes a command subtree before it is inserted into a [`CommandTree`].
#[derive(Clone)]
pub struct CommandBuilder {
    kind: NodeKind,
    children: Vec<CommandBuilder>,
    command: Option<Command>,
    requirements: Vec<Requirement>,
    redirect: Option<NodeId>,
    modifier: Option<RedirectModifier>,
    forks: bool,
}

impl CommandBuilder {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            command: None,
            requirements: Vec::new(),
            redirect: None,
            modifier: None,
            forks: false,
        }
    }

    pub fn literal(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Literal(name.into()))
    }

    pub fn argument(name: impl Into<String>, arg_type: impl Into<ArgumentType>) -> Self {
        Self::parameter(Parameter::of(name, arg_type.into()))
    }

    pub fn parameter(parameter: impl Into<Arc<Parameter>>) -> Self {
        Self::new(NodeKind::Argument(parameter.into()))
    }

    pub fn then(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn executes(
        mut self,
        command: impl Fn(&CommandContext<'_>) -> CommandResult<i32> + Send + Sync + 'static,
    ) -> Self {
        self.command = Some(Arc::new(command));
        self
    }

    pub(crate) fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub fn requires(mut self, requirement: impl Fn(&CommandCause) -> bool + Send + Sync + 'static) -> Self {
        self.requirements.push(Arc::new(requirement));
        self
    }

    pub fn require_permission(self, permission: impl Into<String>) -> Self {
        let permission = permission.into();
        self.requires(move |cause| cause.has_permission(&permission))
    }

    pub fn redirect(self, target: NodeId) -> Self {
        self.forward(target, None, false)
    }

    pub fn redirect_with(
        self,
        target: NodeId,
        modifier: impl Fn(&CommandContext<'_>) -> CommandResult<Vec<CommandCause>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.forward(target, Some(Arc::new(modifier)), false)
    }

    /// Like [`CommandBuilder::redirect_with`], but a failure for one cause
    /// does not stop the others.
    pub fn fork(
        self,
        target: NodeId,
        modifier: impl Fn(&CommandContext<'_>) -> CommandResult<Vec<CommandCause>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.forward(target, Some(Arc::new(modifier)), true)
    }

    pub(crate) fn forward(
        mut self,
        target: NodeId,
        modifier: Option<RedirectModifier>,
        forks: bool,
    ) -> Self {
        assert!(
            self.children.is_empty(),
            "Cannot forward a node with children"
        );
        self.redirect = Some(target);
        self.modifier = modifier;
        self.forks = forks;
        self
    }

    /// A copy of this literal under another name.
    pub fn with_literal(&self, name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Literal(name.into()),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Root => "",
            NodeKind::Literal(name) => name,
            NodeKind::Argument(parameter) => parameter.key().name(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    pub fn is_executable(&self) -> bool {
        self.command.is_some()
    }

    /// Inserts this subtree into `tree` without attaching it to a parent.
    pub(crate) fn build(self, tree: &mut CommandTree) -> NodeId {
        let mut node = CommandNode::new(self.kind);
        node.set_command(self.command);
        node.set_requirements(self.requirements);
        node.set_redirect(self.redirect, self.modifier, self.forks);
        let id = tree.add(node);
        for child in self.children {
            let child_id = child.build(tree);
            tree.add_child(id, child_id);
        }
        id
    }
}

impl From<Parameter> for CommandBuilder {
    fn from(parameter: Parameter) -> Self {
        CommandBuilder::parameter(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_nodes() {
        let mut tree = CommandTree::new();
        let id = CommandBuilder::literal("give")
            .then(
                CommandBuilder::argument("target", ArgumentType::player())
                    .then(CommandBuilder::argument("amount", ArgumentType::integer()).executes(|_| Ok(1))),
            )
            .build(&mut tree);
        let root = tree.root();
        tree.add_child(root, id);

        let amount = tree.find_node(&["give", "target", "amount"]).unwrap();
        assert!(tree.node(amount).is_executable());
        assert_eq!(tree.node(amount).usage_text(), "<amount>");
    }

    #[test]
    fn renamed_literal_keeps_children() {
        let original = CommandBuilder::literal("teleport")
            .then(CommandBuilder::literal("here").executes(|_| Ok(1)));
        let renamed = original.with_literal("tp");
        assert_eq!(renamed.name(), "tp");
        assert_eq!(renamed.children.len(), 1);
        assert_eq!(original.name(), "teleport");
    }

    #[test]
    fn permission_requirement() {
        let mut tree = CommandTree::new();
        let id = CommandBuilder::literal("stop")
            .require_permission("server.stop")
            .build(&mut tree);
        assert!(!tree.node(id).can_use(&CommandCause::player("Steve")));
        assert!(tree
            .node(id)
            .can_use(&CommandCause::player("Op").with_permission("server.*")));
    }
}
