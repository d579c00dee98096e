use crate::commands::error::{CommandResult, InternalError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Player,
    Choice,
    GreedyString,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "String",
            ValueType::Integer => "Integer",
            ValueType::Long => "Long",
            ValueType::Float => "Float",
            ValueType::Double => "Double",
            ValueType::Boolean => "Boolean",
            ValueType::Player => "Player",
            ValueType::Choice => "Choice",
            ValueType::GreedyString => "Greedy",
        };
        f.write_str(name)
    }
}

/// Identifies a parsed value in a command context. Two keys are the same key
/// only if both the name and the value type match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    name: String,
    value_type: ValueType,
}

impl Key {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.value_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Player(String),
    Choice(String),
    GreedyString(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Player(_) => ValueType::Player,
            Value::Choice(_) => ValueType::Choice,
            Value::GreedyString(_) => ValueType::GreedyString,
        }
    }

    fn type_error(&self, expected: ValueType) -> InternalError {
        InternalError::WrongArgumentType {
            name: format!("{:?}", self),
            expected: expected.to_string(),
        }
    }

    pub fn as_string(&self) -> CommandResult<&String> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.type_error(ValueType::String).into()),
        }
    }

    pub fn as_integer(&self) -> CommandResult<i32> {
        match self {
            Value::Integer(i) => Ok(*i),
            _ => Err(self.type_error(ValueType::Integer).into()),
        }
    }

    pub fn as_long(&self) -> CommandResult<i64> {
        match self {
            Value::Long(l) => Ok(*l),
            _ => Err(self.type_error(ValueType::Long).into()),
        }
    }

    pub fn as_float(&self) -> CommandResult<f32> {
        match self {
            Value::Float(f) => Ok(*f),
            _ => Err(self.type_error(ValueType::Float).into()),
        }
    }

    pub fn as_double(&self) -> CommandResult<f64> {
        match self {
            Value::Double(d) => Ok(*d),
            _ => Err(self.type_error(ValueType::Double).into()),
        }
    }

    pub fn as_boolean(&self) -> CommandResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.type_error(ValueType::Boolean).into()),
        }
    }

    pub fn as_player(&self) -> CommandResult<&String> {
        match self {
            Value::Player(p) => Ok(p),
            _ => Err(self.type_error(ValueType::Player).into()),
        }
    }

    pub fn as_choice(&self) -> CommandResult<&String> {
        match self {
            Value::Choice(c) => Ok(c),
            _ => Err(self.type_error(ValueType::Choice).into()),
        }
    }

    pub fn as_greedy(&self) -> CommandResult<&String> {
        match self {
            Value::GreedyString(s) => Ok(s),
            _ => Err(self.type_error(ValueType::GreedyString).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::error::CommandError;

    #[test]
    fn keys_differ_by_type() {
        let a = Key::new("amount", ValueType::Integer);
        let b = Key::new("amount", ValueType::Long);
        assert_ne!(a, b);
        assert_eq!(a, Key::new("amount", ValueType::Integer));
    }

    #[test]
    fn wrong_accessor_is_internal_error() {
        let value = Value::Integer(5);
        assert_eq!(value.as_integer().unwrap(), 5);
        assert!(matches!(
            value.as_string(),
            Err(CommandError::Internal(InternalError::WrongArgumentType { .. }))
        ));
    }
}
