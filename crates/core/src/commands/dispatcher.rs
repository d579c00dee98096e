use crate::commands::cause::CommandCause;
use crate::commands::context::{CommandContextBuilder, StringRange};
use crate::commands::error::{ArgumentParseError, CommandResult};
use crate::commands::node::CommandBuilder;
use crate::commands::reader::{ArgumentReader, StringReader, ARGUMENT_SEPARATOR};
use crate::commands::tree::{CommandTree, NodeId, NodeKind};
use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;

/// The outcome of walking the tree over one command line.
#[derive(Clone)]
pub struct ParseResults<'a> {
    pub context: CommandContextBuilder<'a>,
    pub reader: ArgumentReader,
    /// Failures of nodes that were tried and rejected, by node.
    pub errors: IndexMap<NodeId, ArgumentParseError>,
}

impl ParseResults<'_> {
    /// The error [`CommandDispatcher::execute`] would fail with before running
    /// anything, if any.
    pub fn error(&self) -> Option<ArgumentParseError> {
        if !self.reader.can_read_any() {
            return None;
        }
        if self.errors.len() == 1 {
            return self.errors.values().next().cloned();
        }
        let message = if self.context.range().is_empty() {
            "Unknown command"
        } else {
            "Incorrect argument for command"
        };
        Some(self.reader.create_error(message))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub range: StringRange,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestions {
    pub range: StringRange,
    pub list: Vec<Suggestion>,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.list.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Parses and runs command lines against a [`CommandTree`].
#[derive(Debug, Clone, Default)]
pub struct CommandDispatcher {
    tree: CommandTree,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            tree: CommandTree::new(),
        }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Inserts a command below the root, merging with an existing command of
    /// the same name.
    pub fn register(&mut self, command: CommandBuilder) -> NodeId {
        let id = command.build(&mut self.tree);
        let root = self.tree.root();
        self.tree.add_child(root, id)
    }

    /// Adds `alias` as a literal that continues parsing at `target`.
    pub fn register_redirect(&mut self, alias: &str, target: NodeId) -> NodeId {
        let target_node = self.tree.node(target);
        let mut alias_node = match target_node.redirect() {
            // An alias of a forwarding node forwards the same way.
            Some(inner) => CommandBuilder::literal(alias).forward(
                inner,
                target_node.redirect_modifier().cloned(),
                target_node.is_fork(),
            ),
            None => CommandBuilder::literal(alias).redirect(target),
        };
        // A redirect to an executable node without arguments would otherwise
        // never run anything. The target's command is looked up on every run
        // so later changes to the target show through the alias.
        if target_node.is_executable() {
            alias_node = alias_node.executes(move |context| {
                match context.dispatcher().tree().node(target).command() {
                    Some(command) => command(context),
                    None => Err(ArgumentParseError::new("Unknown command", context.input(), 0).into()),
                }
            });
        }
        for requirement in target_node.requirements().to_vec() {
            alias_node = alias_node.requires(move |cause| requirement(cause));
        }
        self.register(alias_node)
    }

    /// Detaches the command named `name` from the root.
    pub fn unregister(&mut self, name: &str) -> Option<NodeId> {
        let root = self.tree.root();
        self.tree.remove_child(root, name)
    }

    pub fn find_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        self.tree.find_node(path)
    }

    pub fn path(&self, node: NodeId) -> Option<Vec<String>> {
        self.tree.path(node)
    }

    pub fn parse(&self, input: &str, cause: CommandCause) -> ParseResults<'_> {
        let context = CommandContextBuilder::new(self, cause, self.root(), 0);
        self.parse_nodes(self.root(), &ArgumentReader::new(input), &context)
    }

    /// The children of `node` that may match at the reader's position: the
    /// literal named by the next word if there is one, otherwise every
    /// argument child.
    fn relevant_nodes(&self, node: NodeId, reader: &ArgumentReader) -> Vec<NodeId> {
        let node = self.tree.node(node);
        let remaining = reader.remaining();
        let word = remaining
            .split(ARGUMENT_SEPARATOR)
            .next()
            .unwrap_or_default();
        if let Some(literal) = node.child(word) {
            if self.tree.node(literal).is_literal() {
                return vec![literal];
            }
        }
        node.children()
            .filter(|child| matches!(self.tree.node(*child).kind(), NodeKind::Argument(_)))
            .collect()
    }

    fn parse_nodes<'a>(
        &'a self,
        node: NodeId,
        original_reader: &ArgumentReader,
        context_so_far: &CommandContextBuilder<'a>,
    ) -> ParseResults<'a> {
        let cause = context_so_far.cause();
        let mut errors = IndexMap::new();
        let mut potentials: Vec<ParseResults<'a>> = Vec::new();
        let cursor = original_reader.cursor();

        for child in self.relevant_nodes(node, original_reader) {
            let child_node = self.tree.node(child);
            if !child_node.can_use(cause) {
                continue;
            }
            let mut context = context_so_far.copy();
            let mut reader = original_reader.clone();
            let parsed = child_node
                .parse(child, &mut reader, &mut context)
                .and_then(|()| {
                    if reader.can_read_any() && reader.peek()? != ARGUMENT_SEPARATOR {
                        return Err(reader.create_error(
                            "Expected whitespace to end one argument, but found trailing data",
                        ));
                    }
                    Ok(())
                });
            if let Err(err) = parsed {
                debug!("node {:?} rejected input at {}: {}", child, err.cursor(), err);
                errors.insert(child, err);
                reader.set_cursor(cursor);
                continue;
            }

            context.with_command(child_node.command().cloned());
            let redirect = child_node.redirect();
            if reader.can_read(if redirect.is_none() { 2 } else { 1 }) {
                reader.skip();
                if let Some(redirect) = redirect {
                    let child_context =
                        CommandContextBuilder::new(self, cause.clone(), redirect, reader.cursor());
                    let parse = self.parse_nodes(redirect, &reader, &child_context);
                    context.with_child(parse.context);
                    return ParseResults {
                        context,
                        reader: parse.reader,
                        errors: parse.errors,
                    };
                }
                potentials.push(self.parse_nodes(child, &reader, &context));
            } else {
                potentials.push(ParseResults {
                    context,
                    reader,
                    errors: IndexMap::new(),
                });
            }
        }

        if !potentials.is_empty() {
            // Fully consumed input first, then results without errors, then
            // results that found something to run.
            potentials.sort_by_key(|p| {
                (
                    p.reader.can_read_any(),
                    !p.errors.is_empty(),
                    p.context.last_child().command().is_none(),
                )
            });
            return potentials.remove(0);
        }

        ParseResults {
            context: context_so_far.copy(),
            reader: original_reader.clone(),
            errors,
        }
    }

    /// Runs a parsed command line. Redirect modifiers fan the remaining
    /// command out to every cause they return; for forked redirects the
    /// failures of single causes are dropped and the number of successful
    /// runs is returned instead of the summed results.
    pub fn execute(&self, parse: &ParseResults<'_>) -> CommandResult<i32> {
        if let Some(err) = parse.error() {
            return Err(err.into());
        }

        let original = parse.context.build(parse.reader.input());
        let mut contexts = vec![original];
        let mut result = 0;
        let mut successful_forks = 0;
        let mut forked = false;
        let mut found_command = false;

        while !contexts.is_empty() {
            let mut next = Vec::new();
            for context in &contexts {
                if let Some(child) = context.child() {
                    forked |= context.is_forked();
                    if !child.has_nodes() {
                        continue;
                    }
                    found_command = true;
                    match context.redirect_modifier() {
                        None => next.push(child.copy_for(context.cause().clone())),
                        Some(modifier) => match modifier(context) {
                            Ok(causes) => {
                                next.extend(causes.into_iter().map(|cause| child.copy_for(cause)))
                            }
                            Err(err) if forked => debug!("forked redirect failed: {}", err),
                            Err(err) => return Err(err),
                        },
                    }
                } else if let Some(command) = context.command() {
                    found_command = true;
                    match command(context) {
                        Ok(value) => {
                            result += value;
                            successful_forks += 1;
                        }
                        Err(err) if forked => debug!("forked command failed: {}", err),
                        Err(err) => return Err(err),
                    }
                }
            }
            contexts = next;
        }

        if !found_command {
            return Err(parse.reader.create_error("Unknown command").into());
        }
        Ok(if forked { successful_forks } else { result })
    }

    pub fn execute_input(&self, input: &str, cause: CommandCause) -> CommandResult<i32> {
        let parse = self.parse(input, cause);
        self.execute(&parse)
    }

    /// Completions for the text before `cursor`.
    pub fn completion_suggestions(
        &self,
        parse: &ParseResults<'_>,
        cursor: usize,
    ) -> CommandResult<Suggestions> {
        let input = parse.reader.input();
        let mut cursor = cursor.min(input.len());
        while !input.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let suggestion_context = parse.context.find_suggestion_context(cursor)?;
        let start = suggestion_context.start.min(cursor);
        let truncated = &input[..cursor];
        let partial = truncated[start..].to_lowercase();
        let context = parse.context.build(truncated);
        let range = StringRange::between(start, cursor);

        let mut texts = Vec::new();
        for child in self.tree.node(suggestion_context.parent).children() {
            let node = self.tree.node(child);
            if !node.can_use(parse.context.cause()) {
                continue;
            }
            match node.kind() {
                NodeKind::Root => {}
                NodeKind::Literal(name) => texts.push(name.clone()),
                NodeKind::Argument(parameter) => {
                    texts.extend(parameter.complete(&context, &truncated[start..]))
                }
            }
        }

        let list = texts
            .into_iter()
            .filter(|text| text.to_lowercase().starts_with(&partial))
            .unique()
            .sorted_by_key(|text| text.to_lowercase())
            .map(|text| Suggestion { range, text })
            .collect();
        Ok(Suggestions { range, list })
    }

    /// Usage of every executable path below `node`, one entry per path.
    pub fn all_usage(&self, node: NodeId, cause: &CommandCause, restricted: bool) -> Vec<String> {
        crate::commands::usage::all_usage(&self.tree, node, cause, restricted)
    }

    /// Condensed usage for each child of `node` the cause may use.
    pub fn smart_usage(&self, node: NodeId, cause: &CommandCause) -> IndexMap<NodeId, String> {
        crate::commands::usage::smart_usage(&self.tree, node, cause)
    }
}
