//! Glue between a [`Parameter`] and the argument node wrapping it.

use crate::commands::cause::CommandCause;
use crate::commands::context::{CommandContextBuilder, StringRange};
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::error::ArgumentParseError;
use crate::commands::parameter::Parameter;
use crate::commands::reader::{ArgumentReader, StringReader, ARGUMENT_SEPARATOR};
use crate::commands::tree::NodeId;
use tracing::debug;

/// Whether any of the parameter's parsers accepts `text` as a whole
/// argument. Runs against a throwaway reader and context.
pub fn is_valid_input(parameter: &Parameter, text: &str) -> bool {
    let dispatcher = CommandDispatcher::new();
    parameter.parsers().iter().any(|parser| {
        let mut reader = ArgumentReader::new(text);
        let mut context = CommandContextBuilder::new(
            &dispatcher,
            CommandCause::system(),
            dispatcher.root(),
            0,
        );
        match parser.parse_value(parameter.key(), &mut reader, &mut context) {
            Ok(_) => !reader.can_read_any() || reader.peek() == Ok(ARGUMENT_SEPARATOR),
            Err(_) => false,
        }
    })
}

/// Parses the argument held by `node`. The first parser yielding a value
/// wins; parsers that fail or decline are rolled back.
pub fn parse_argument(
    node: NodeId,
    parameter: &Parameter,
    reader: &mut ArgumentReader,
    builder: &mut CommandContextBuilder<'_>,
) -> Result<(), ArgumentParseError> {
    let start = reader.cursor();

    if parameter.is_consume_all() {
        let before = builder.all(parameter.key()).len();
        parameter.parse(reader, builder)?;
        if builder.all(parameter.key()).len() > before {
            builder.with_node(node, StringRange::between(start, reader.cursor()));
            return Ok(());
        }
        return no_value(parameter, reader, start, Vec::new());
    }

    let mut errors = Vec::new();
    for parser in parameter.parsers() {
        let reader_state = reader.immutable();
        let context_state = builder.state();
        match parser.parse_value(parameter.key(), reader, builder) {
            Ok(Some(value)) => {
                builder.put_entry(parameter.key().clone(), value);
                builder.with_node(node, StringRange::between(start, reader.cursor()));
                return Ok(());
            }
            Ok(None) => {
                reader.restore(&reader_state);
                builder.set_state(context_state);
            }
            Err(err) => {
                reader.restore(&reader_state);
                builder.set_state(context_state);
                errors.push(err);
            }
        }
    }
    no_value(parameter, reader, start, errors)
}

fn no_value(
    parameter: &Parameter,
    reader: &mut ArgumentReader,
    start: usize,
    mut errors: Vec<ArgumentParseError>,
) -> Result<(), ArgumentParseError> {
    reader.set_cursor(start);
    if parameter.is_optional() {
        debug!("no value for optional parameter {}", parameter.key());
        return Ok(());
    }
    let message = match errors.len() {
        0 => format!("No value was parsed for {}", parameter.key().name()),
        1 => errors.remove(0).message().to_string(),
        _ => return Err(ArgumentParseError::combined(&errors, reader.input(), start)),
    };
    Err(ArgumentParseError::new(message, reader.input(), start))
}

/// `<key>` for required parameters, `[key]` for optional ones.
pub fn usage_text(parameter: &Parameter) -> String {
    if parameter.is_optional() {
        format!("[{}]", parameter.key().name())
    } else {
        format!("<{}>", parameter.key().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::argument::ArgumentType;
    use crate::commands::parameter::ValueParser;
    use crate::commands::value::{Key, Value, ValueType};

    struct Declines;

    impl ValueParser for Declines {
        fn parse_value(
            &self,
            _key: &Key,
            reader: &mut ArgumentReader,
            _context: &mut CommandContextBuilder<'_>,
        ) -> Result<Option<Value>, ArgumentParseError> {
            reader.skip();
            Ok(None)
        }
    }

    fn run(
        parameter: &Parameter,
        input: &str,
        cursor: usize,
    ) -> (Result<(), ArgumentParseError>, usize, Vec<Value>) {
        let dispatcher = CommandDispatcher::new();
        let mut builder =
            CommandContextBuilder::new(&dispatcher, CommandCause::console(), dispatcher.root(), 0);
        let mut reader = ArgumentReader::new(input);
        reader.set_cursor(cursor);
        let result = parse_argument(dispatcher.root(), parameter, &mut reader, &mut builder);
        (
            result,
            reader.cursor(),
            builder.all(parameter.key()).to_vec(),
        )
    }

    #[test]
    fn first_present_value_wins() {
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(Declines)
            .parser(ArgumentType::integer())
            .parser(ArgumentType::integer_range(100, 200))
            .build()
            .unwrap();
        let (result, cursor, values) = run(&parameter, "7", 0);
        assert!(result.is_ok());
        assert_eq!(cursor, 1);
        assert_eq!(values, vec![Value::Integer(7)]);
    }

    #[test]
    fn required_failure_points_at_span_start() {
        let parameter = Parameter::integer("amount");
        let (result, cursor, _) = run(&parameter, "give Steve diamond five", 19);
        let err = result.unwrap_err();
        assert_eq!(err.cursor(), 19);
        assert_eq!(cursor, 19);
        assert!(err.message().contains("integer"));
    }

    #[test]
    fn all_declined_is_a_syntax_error() {
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(Declines)
            .build()
            .unwrap();
        let (result, cursor, _) = run(&parameter, "abc", 0);
        assert_eq!(result.unwrap_err().message(), "No value was parsed for n");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn optional_exhaustion_is_silent() {
        let parameter = Parameter::integer("n").optional();
        let (result, cursor, values) = run(&parameter, "abc", 0);
        assert!(result.is_ok());
        assert_eq!(cursor, 0);
        assert!(values.is_empty());
    }

    #[test]
    fn several_failures_are_combined() {
        let parameter = Parameter::builder()
            .key("n", ValueType::Integer)
            .parser(ArgumentType::integer())
            .parser(ArgumentType::boolean())
            .build()
            .unwrap();
        let (result, _, _) = run(&parameter, "x", 0);
        let err = result.unwrap_err();
        assert_eq!(err.message().lines().count(), 2);
        assert_eq!(err.cursor(), 0);
    }

    #[test]
    fn validity_probe() {
        let parameter = Parameter::integer("n");
        assert!(is_valid_input(&parameter, "12"));
        assert!(is_valid_input(&parameter, "12 more"));
        assert!(!is_valid_input(&parameter, "12x"));
        assert!(!is_valid_input(&parameter, "twelve"));
    }

    #[test]
    fn usage_brackets() {
        assert_eq!(usage_text(&Parameter::integer("n")), "<n>");
        assert_eq!(usage_text(&Parameter::integer("n").optional()), "[n]");
    }
}
