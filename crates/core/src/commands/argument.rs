use crate::commands::context::{CommandContext, CommandContextBuilder};
use crate::commands::description::ClientCompletionType;
use crate::commands::error::ArgumentParseError;
use crate::commands::parameter::ValueParser;
use crate::commands::reader::{ArgumentReader, StringReader};
use crate::commands::value::{Key, Value, ValueType};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// A single run of non-whitespace characters.
    Word,
    /// A word, or a `"quoted phrase"`.
    Quotable,
    /// Everything left on the line.
    Greedy,
}

impl StringKind {
    pub fn id(self) -> i32 {
        match self {
            StringKind::Word => 0,
            StringKind::Quotable => 1,
            StringKind::Greedy => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(StringKind::Word),
            1 => Some(StringKind::Quotable),
            2 => Some(StringKind::Greedy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StringKind::Word => "word",
            StringKind::Quotable => "phrase",
            StringKind::Greedy => "greedy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "word" => Some(StringKind::Word),
            "phrase" => Some(StringKind::Quotable),
            "greedy" => Some(StringKind::Greedy),
            _ => None,
        }
    }
}

/// The built-in value parsers.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentType {
    Bool,
    Integer { min: Option<i32>, max: Option<i32> },
    Long { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f32>, max: Option<f32> },
    Double { min: Option<f64>, max: Option<f64> },
    String(StringKind),
    Player,
    Choices(Vec<String>),
    /// The rest of the line exactly as typed.
    Remaining,
}

fn check_bounds<T: PartialOrd + Display + Copy>(
    reader: &mut ArgumentReader,
    start: usize,
    type_name: &str,
    value: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<T, ArgumentParseError> {
    let error = match (min, max) {
        (Some(min), _) if value < min => {
            format!("{type_name} must not be less than {min}, found {value}")
        }
        (_, Some(max)) if value > max => {
            format!("{type_name} must not be more than {max}, found {value}")
        }
        _ => return Ok(value),
    };
    reader.set_cursor(start);
    Err(ArgumentParseError::new(error, reader.input(), start))
}

fn is_valid_player_name(name: &str) -> bool {
    (1..=16).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ArgumentType {
    pub fn string() -> Self {
        ArgumentType::String(StringKind::Quotable)
    }

    pub fn word() -> Self {
        ArgumentType::String(StringKind::Word)
    }

    pub fn greedy_string() -> Self {
        ArgumentType::String(StringKind::Greedy)
    }

    pub fn integer() -> Self {
        ArgumentType::Integer {
            min: None,
            max: None,
        }
    }

    pub fn integer_range(min: i32, max: i32) -> Self {
        ArgumentType::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn long() -> Self {
        ArgumentType::Long {
            min: None,
            max: None,
        }
    }

    pub fn float() -> Self {
        ArgumentType::Float {
            min: None,
            max: None,
        }
    }

    pub fn double() -> Self {
        ArgumentType::Double {
            min: None,
            max: None,
        }
    }

    pub fn boolean() -> Self {
        ArgumentType::Bool
    }

    pub fn player() -> Self {
        ArgumentType::Player
    }

    pub fn choices<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Self {
        ArgumentType::Choices(choices.into_iter().map(Into::into).collect())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            ArgumentType::Bool => ValueType::Boolean,
            ArgumentType::Integer { .. } => ValueType::Integer,
            ArgumentType::Long { .. } => ValueType::Long,
            ArgumentType::Float { .. } => ValueType::Float,
            ArgumentType::Double { .. } => ValueType::Double,
            ArgumentType::String(StringKind::Greedy) | ArgumentType::Remaining => {
                ValueType::GreedyString
            }
            ArgumentType::String(_) => ValueType::String,
            ArgumentType::Player => ValueType::Player,
            ArgumentType::Choices(_) => ValueType::Choice,
        }
    }

    fn parse(&self, reader: &mut ArgumentReader) -> Result<Value, ArgumentParseError> {
        let start = reader.cursor();
        Ok(match self {
            ArgumentType::Bool => Value::Boolean(reader.parse_boolean()?),
            ArgumentType::Integer { min, max } => {
                let value = reader.parse_int()?;
                Value::Integer(check_bounds(reader, start, "Integer", value, *min, *max)?)
            }
            ArgumentType::Long { min, max } => {
                let value = reader.parse_long()?;
                Value::Long(check_bounds(reader, start, "Long", value, *min, *max)?)
            }
            ArgumentType::Float { min, max } => {
                let value = reader.parse_float()?;
                Value::Float(check_bounds(reader, start, "Float", value, *min, *max)?)
            }
            ArgumentType::Double { min, max } => {
                let value = reader.parse_double()?;
                Value::Double(check_bounds(reader, start, "Double", value, *min, *max)?)
            }
            ArgumentType::String(StringKind::Word) => {
                let word = reader.parse_unquoted_string();
                if word.is_empty() {
                    return Err(reader.create_error("Could not parse a string: Expected a word"));
                }
                Value::String(word)
            }
            ArgumentType::String(StringKind::Quotable) => {
                if !reader.can_read_any() {
                    return Err(reader.create_error("Could not parse a string: Expected a string"));
                }
                Value::String(reader.parse_string()?)
            }
            ArgumentType::String(StringKind::Greedy) => {
                let remaining = reader.parse_remaining();
                let joined = remaining.split_whitespace().collect::<Vec<_>>();
                if joined.is_empty() {
                    return Err(ArgumentParseError::new(
                        "Could not parse a string: Expected text",
                        reader.input(),
                        start,
                    ));
                }
                Value::GreedyString(joined.join(" "))
            }
            ArgumentType::Remaining => Value::GreedyString(reader.parse_remaining()),
            ArgumentType::Player => {
                let name = reader.parse_unquoted_string();
                if !is_valid_player_name(&name) {
                    reader.set_cursor(start);
                    return Err(ArgumentParseError::new(
                        format!("Could not parse a player: Invalid player name '{name}'"),
                        reader.input(),
                        start,
                    ));
                }
                Value::Player(name)
            }
            ArgumentType::Choices(choices) => {
                let choice = reader.parse_unquoted_string();
                match choices.iter().find(|c| c.eq_ignore_ascii_case(&choice)) {
                    Some(c) => Value::Choice(c.clone()),
                    None => {
                        reader.set_cursor(start);
                        return Err(ArgumentParseError::new(
                            format!(
                                "Could not parse a choice: '{choice}' is not one of {}",
                                choices.join(", ")
                            ),
                            reader.input(),
                            start,
                        ));
                    }
                }
            }
        })
    }
}

impl ValueParser for ArgumentType {
    fn parse_value(
        &self,
        _key: &Key,
        reader: &mut ArgumentReader,
        _context: &mut CommandContextBuilder<'_>,
    ) -> Result<Option<Value>, ArgumentParseError> {
        self.parse(reader).map(Some)
    }

    fn complete(&self, _context: &CommandContext<'_>, _input: &str) -> Vec<String> {
        match self {
            ArgumentType::Bool => vec!["true".to_string(), "false".to_string()],
            ArgumentType::Choices(choices) => choices.clone(),
            _ => Vec::new(),
        }
    }

    fn client_completion(&self) -> Option<ClientCompletionType> {
        Some(match self {
            ArgumentType::Bool => ClientCompletionType::Bool,
            ArgumentType::Integer { min, max } => ClientCompletionType::Integer {
                min: *min,
                max: *max,
            },
            ArgumentType::Long { min, max } => ClientCompletionType::Long {
                min: *min,
                max: *max,
            },
            ArgumentType::Float { min, max } => ClientCompletionType::Float {
                min: *min,
                max: *max,
            },
            ArgumentType::Double { min, max } => ClientCompletionType::Double {
                min: *min,
                max: *max,
            },
            ArgumentType::String(kind) => ClientCompletionType::String(*kind),
            ArgumentType::Remaining => ClientCompletionType::String(StringKind::Greedy),
            ArgumentType::Player => ClientCompletionType::GameProfile,
            // The client knows nothing about the choices, the server has to suggest them.
            ArgumentType::Choices(_) => return None,
        })
    }
}
