//! Named, typed units of a command's argument grammar.
//!
//! A [`Parameter`] is backed by one or more [`ValueParser`]s which are tried
//! in order. Every attempt runs against a snapshot of the reader and the
//! context builder, so a failed attempt leaves no trace.

use crate::commands::argument::ArgumentType;
use crate::commands::cause::CommandCause;
use crate::commands::context::{CommandContext, CommandContextBuilder};
use crate::commands::description::ClientCompletionType;
use crate::commands::error::{ArgumentParseError, ParameterBuildError};
use crate::commands::reader::{ArgumentReader, StringReader};
use crate::commands::tree::Requirement;
use crate::commands::value::{Key, Value, ValueType};
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub trait ValueParser: Send + Sync {
    /// Parses a value for `key`. `Ok(None)` means the parser ran fine but
    /// does not apply here.
    fn parse_value(
        &self,
        key: &Key,
        reader: &mut ArgumentReader,
        context: &mut CommandContextBuilder<'_>,
    ) -> Result<Option<Value>, ArgumentParseError>;

    fn complete(&self, _context: &CommandContext<'_>, _input: &str) -> Vec<String> {
        Vec::new()
    }

    /// How the client should parse this value locally, if it can.
    fn client_completion(&self) -> Option<ClientCompletionType> {
        None
    }
}

pub trait ValueCompleter: Send + Sync {
    fn complete(&self, context: &CommandContext<'_>, input: &str) -> Vec<String>;
}

impl<F> ValueCompleter for F
where
    F: Fn(&CommandContext<'_>, &str) -> Vec<String> + Send + Sync,
{
    fn complete(&self, context: &CommandContext<'_>, input: &str) -> Vec<String> {
        self(context, input)
    }
}

pub trait ValueUsage: Send + Sync {
    fn usage(&self, key: &str, cause: &CommandCause) -> String;
}

impl<F> ValueUsage for F
where
    F: Fn(&str, &CommandCause) -> String + Send + Sync,
{
    fn usage(&self, key: &str, cause: &CommandCause) -> String {
        self(key, cause)
    }
}

/// Always yields the same value without consuming input.
struct DefaultValueParser(Value);

impl ValueParser for DefaultValueParser {
    fn parse_value(
        &self,
        _key: &Key,
        _reader: &mut ArgumentReader,
        _context: &mut CommandContextBuilder<'_>,
    ) -> Result<Option<Value>, ArgumentParseError> {
        Ok(Some(self.0.clone()))
    }
}

pub struct Parameter {
    key: Key,
    parsers: Vec<Arc<dyn ValueParser>>,
    completer: Option<Arc<dyn ValueCompleter>>,
    usage: Option<Arc<dyn ValueUsage>>,
    requirements: Vec<Requirement>,
    optional: bool,
    consume_all: bool,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("key", &self.key)
            .field("parsers", &self.parsers.len())
            .field("optional", &self.optional)
            .field("consume_all", &self.consume_all)
            .finish()
    }
}

impl Parameter {
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    /// A required parameter backed by a single built-in parser.
    pub fn of(name: impl Into<String>, argument_type: ArgumentType) -> Parameter {
        Parameter {
            key: Key::new(name, argument_type.value_type()),
            parsers: vec![Arc::new(argument_type)],
            completer: None,
            usage: None,
            requirements: Vec::new(),
            optional: false,
            consume_all: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::string())
    }

    pub fn word(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::word())
    }

    pub fn remaining_joined_strings(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::greedy_string())
    }

    pub fn integer(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::integer())
    }

    pub fn integer_range(name: impl Into<String>, min: i32, max: i32) -> Parameter {
        Parameter::of(name, ArgumentType::integer_range(min, max))
    }

    pub fn long(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::long())
    }

    pub fn double(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::double())
    }

    pub fn float(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::float())
    }

    pub fn bool(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::boolean())
    }

    pub fn player(name: impl Into<String>) -> Parameter {
        Parameter::of(name, ArgumentType::player())
    }

    pub fn choices<S: Into<String>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Parameter {
        Parameter::of(name, ArgumentType::choices(choices))
    }

    /// Makes this parameter optional.
    pub fn optional(mut self) -> Parameter {
        self.optional = true;
        self
    }

    /// Replaces the completions of the parsers with `completer`.
    pub fn suggestions(mut self, completer: impl ValueCompleter + 'static) -> Parameter {
        self.completer = Some(Arc::new(completer));
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn parsers(&self) -> &[Arc<dyn ValueParser>] {
        &self.parsers
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_consume_all(&self) -> bool {
        self.consume_all
    }

    pub fn can_use(&self, cause: &CommandCause) -> bool {
        self.requirements.iter().all(|requirement| requirement(cause))
    }

    pub fn has_custom_completer(&self) -> bool {
        self.completer.is_some()
    }

    /// The client side parser of the first parser that has one.
    pub fn client_completion(&self) -> Option<ClientCompletionType> {
        self.parsers.iter().find_map(|parser| parser.client_completion())
    }

    pub fn complete(&self, context: &CommandContext<'_>, input: &str) -> Vec<String> {
        match &self.completer {
            Some(completer) => completer.complete(context, input),
            None => self
                .parsers
                .iter()
                .flat_map(|parser| parser.complete(context, input))
                .unique()
                .collect(),
        }
    }

    pub fn usage(&self, cause: &CommandCause) -> String {
        match &self.usage {
            Some(usage) => usage.usage(self.key.name(), cause),
            None if self.optional => format!("[{}]", self.key.name()),
            None => self.key.name().to_string(),
        }
    }

    /// Parses this parameter into `context`.
    ///
    /// On failure the reader and the context are restored to how they were
    /// before the call. Optional parameters then report success, as though
    /// they were not present.
    pub fn parse(
        &self,
        reader: &mut ArgumentReader,
        context: &mut CommandContextBuilder<'_>,
    ) -> Result<(), ArgumentParseError> {
        let reader_state = reader.immutable();
        let context_state = context.state();
        match self.parse_internal(reader, context) {
            Ok(()) => Ok(()),
            Err(err) => {
                // parse_once already rolled back the failed pass; earlier
                // passes of a consume-all parameter are undone here.
                reader.restore(&reader_state);
                context.set_state(context_state);
                if self.optional {
                    debug!("optional parameter {} skipped: {}", self.key, err);
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    fn parse_internal(
        &self,
        reader: &mut ArgumentReader,
        context: &mut CommandContextBuilder<'_>,
    ) -> Result<(), ArgumentParseError> {
        let mut first = true;
        loop {
            reader.skip_whitespace();
            if !first && !reader.can_read_any() {
                return Ok(());
            }
            let start = reader.cursor();
            self.parse_once(reader, context)?;
            first = false;
            if !self.consume_all || !reader.can_read_any() || reader.cursor() == start {
                return Ok(());
            }
        }
    }

    fn parse_once(
        &self,
        reader: &mut ArgumentReader,
        context: &mut CommandContextBuilder<'_>,
    ) -> Result<(), ArgumentParseError> {
        let mut errors = Vec::new();
        for parser in &self.parsers {
            let reader_state = reader.immutable();
            let context_state = context.state();
            match parser.parse_value(&self.key, reader, context) {
                Ok(value) => {
                    if let Some(value) = value {
                        context.put_entry(self.key.clone(), value);
                    }
                    return Ok(());
                }
                Err(err) => {
                    reader.restore(&reader_state);
                    context.set_state(context_state);
                    errors.push(err);
                }
            }
        }
        if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ArgumentParseError::combined(
                &errors,
                reader.input(),
                reader.cursor(),
            ))
        }
    }
}

#[derive(Default)]
pub struct ParameterBuilder {
    key: Option<Key>,
    parsers: Vec<Arc<dyn ValueParser>>,
    completer: Option<Arc<dyn ValueCompleter>>,
    usage: Option<Arc<dyn ValueUsage>>,
    requirements: Vec<Requirement>,
    optional: bool,
    consume_all: bool,
    default: Option<Value>,
}

impl ParameterBuilder {
    pub fn key(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.key = Some(Key::new(name, value_type));
        self
    }

    pub fn parser(mut self, parser: impl ValueParser + 'static) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    pub fn suggestions(mut self, completer: impl ValueCompleter + 'static) -> Self {
        self.completer = Some(Arc::new(completer));
        self
    }

    pub fn usage(mut self, usage: impl ValueUsage + 'static) -> Self {
        self.usage = Some(Arc::new(usage));
        self
    }

    pub fn requires_permission(self, permission: impl Into<String>) -> Self {
        let permission = permission.into();
        self.requirements(move |cause: &CommandCause| cause.has_permission(&permission))
    }

    pub fn requirements(
        mut self,
        requirement: impl Fn(&CommandCause) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.requirements.push(Arc::new(requirement));
        self
    }

    pub fn consume_all_remaining(mut self) -> Self {
        self.consume_all = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Falls back to `value` when none of the parsers succeed.
    pub fn or_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn build(self) -> Result<Parameter, ParameterBuildError> {
        let key = match self.key {
            Some(key) if !key.name().is_empty() => key,
            _ => return Err(ParameterBuildError::MissingKey),
        };
        if self.parsers.is_empty() {
            return Err(ParameterBuildError::NoParsers {
                key: key.name().to_string(),
            });
        }
        let mut parsers = self.parsers;
        if let Some(default) = self.default {
            parsers.push(Arc::new(DefaultValueParser(default)));
        }
        Ok(Parameter {
            key,
            parsers,
            completer: self.completer,
            usage: self.usage,
            requirements: self.requirements,
            optional: self.optional,
            consume_all: self.consume_all,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::dispatcher::CommandDispatcher;

    /// Consumes its input and then fails, to check that rollback undoes both.
    struct Greedy;

    impl ValueParser for Greedy {
        fn parse_value(
            &self,
            key: &Key,
            reader: &mut ArgumentReader,
            context: &mut CommandContextBuilder<'_>,
        ) -> Result<Option<Value>, ArgumentParseError> {
            reader.parse_remaining();
            context.put_entry(key.clone(), Value::String("junk".to_string()));
            Err(reader.create_error("greedy always fails"))
        }
    }

    struct Declines;

    impl ValueParser for Declines {
        fn parse_value(
            &self,
            _key: &Key,
            _reader: &mut ArgumentReader,
            _context: &mut CommandContextBuilder<'_>,
        ) -> Result<Option<Value>, ArgumentParseError> {
            Ok(None)
        }
    }

    fn builder(dispatcher: &CommandDispatcher) -> CommandContextBuilder<'_> {
        CommandContextBuilder::new(dispatcher, CommandCause::console(), dispatcher.root(), 0)
    }

    #[test]
    fn failed_pass_rolls_back_everything() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("x", ValueType::String)
            .parser(Greedy)
            .parser(ArgumentType::integer())
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("abc def");
        let before = context.state();
        let err = parameter.parse(&mut reader, &mut context).unwrap_err();

        assert_eq!(reader.cursor(), 0);
        assert_eq!(context.state(), before);
        assert_eq!(err.message().lines().count(), 2);
        assert!(err.message().starts_with("greedy always fails\n"));
    }

    #[test]
    fn single_failure_is_rethrown_verbatim() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::integer("amount");
        let mut reader = ArgumentReader::new("five");
        let err = parameter.parse(&mut reader, &mut context).unwrap_err();
        assert_eq!(err.message(), "Could not parse an integer: Expected integer");
    }

    #[test]
    fn later_parser_wins_after_failure() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("x", ValueType::Integer)
            .parser(Greedy)
            .parser(ArgumentType::integer())
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("42");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert_eq!(context.all(parameter.key()), &[Value::Integer(42)]);
    }

    #[test]
    fn optional_failure_is_swallowed() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::integer("amount").optional();
        let mut reader = ArgumentReader::new("  five");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert_eq!(reader.cursor(), 0);
        assert!(!context.has_any(parameter.key()));
    }

    #[test]
    fn consume_all_collects_every_value() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(ArgumentType::integer())
            .consume_all_remaining()
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("1 2 3 ");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert_eq!(
            context.all(parameter.key()),
            &[Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
        assert!(!reader.can_read_any());
    }

    #[test]
    fn consume_all_stops_without_progress() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(Declines)
            .consume_all_remaining()
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("never consumed");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert_eq!(reader.cursor(), 0);

        let mut reader = ArgumentReader::new("");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert!(!context.has_any(parameter.key()));
    }

    #[test]
    fn consume_all_failure_undoes_earlier_passes() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(ArgumentType::integer())
            .consume_all_remaining()
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("1 2 x");
        assert!(parameter.parse(&mut reader, &mut context).is_err());
        assert_eq!(reader.cursor(), 0);
        assert!(!context.has_any(parameter.key()));
    }

    #[test]
    fn builder_fails_fast() {
        assert_eq!(
            Parameter::builder().parser(ArgumentType::integer()).build().unwrap_err(),
            ParameterBuildError::MissingKey
        );
        assert_eq!(
            Parameter::builder().key("x", ValueType::Integer).build().unwrap_err(),
            ParameterBuildError::NoParsers {
                key: "x".to_string()
            }
        );
    }

    #[test]
    fn default_is_used_when_parsers_fail() {
        let dispatcher = CommandDispatcher::new();
        let mut context = builder(&dispatcher);
        let parameter = Parameter::builder()
            .key("amount", ValueType::Integer)
            .parser(ArgumentType::integer())
            .or_default(Value::Integer(1))
            .build()
            .unwrap();

        let mut reader = ArgumentReader::new("lots");
        parameter.parse(&mut reader, &mut context).unwrap();
        assert_eq!(context.all(parameter.key()), &[Value::Integer(1)]);
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn usage_text() {
        let cause = CommandCause::console();
        assert_eq!(Parameter::integer("amount").usage(&cause), "amount");
        assert_eq!(Parameter::integer("amount").optional().usage(&cause), "[amount]");
        let custom = Parameter::builder()
            .key("flags", ValueType::String)
            .parser(ArgumentType::word())
            .usage(|key: &str, _: &CommandCause| format!("-{key}"))
            .build()
            .unwrap();
        assert_eq!(custom.usage(&cause), "-flags");
    }
}
