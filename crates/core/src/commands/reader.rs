//! Cursor based readers over a command line.
//!
//! [`ArgumentReader`] is advanced by parsers while a command is parsed.
//! [`ImmutableArgumentReader`] is a frozen snapshot of a reader which is
//! taken before every parser attempt so a failed attempt can be rolled back
//! with [`ArgumentReader::set_state`].
//!
//! Cursors and lengths are byte offsets into the UTF-8 input; the cursor
//! only ever stops on char boundaries.

use crate::commands::error::{ArgumentParseError, ReaderStateMismatch};
use std::sync::Arc;

pub const SYNTAX_QUOTE: char = '"';
pub const SYNTAX_ESCAPE: char = '\\';
pub const ARGUMENT_SEPARATOR: char = ' ';

fn is_allowed_number(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

/// Read only operations shared by both reader variants.
pub trait StringReader {
    fn input(&self) -> &str;

    fn cursor(&self) -> usize;

    fn total_length(&self) -> usize {
        self.input().len()
    }

    fn remaining_length(&self) -> usize {
        self.total_length() - self.cursor()
    }

    /// The part of the input that has already been consumed.
    fn read(&self) -> &str {
        &self.input()[..self.cursor()]
    }

    fn remaining(&self) -> &str {
        &self.input()[self.cursor()..]
    }

    fn can_read(&self, length: usize) -> bool {
        self.cursor() + length <= self.total_length()
    }

    fn can_read_any(&self) -> bool {
        self.can_read(1)
    }

    fn peek(&self) -> Result<char, ArgumentParseError> {
        self.peek_at(0)
    }

    /// The character starting `offset` bytes after the cursor. Fails past the
    /// end of input and inside a multi-byte character.
    fn peek_at(&self, offset: usize) -> Result<char, ArgumentParseError> {
        let index = self.cursor() + offset;
        self.input()
            .get(index..)
            .and_then(|rest| rest.chars().next())
            .ok_or_else(|| {
                self.create_error(format!(
                    "Index {} is out of bounds for input of length {}",
                    index,
                    self.total_length()
                ))
            })
    }

    fn create_error(&self, message: impl Into<String>) -> ArgumentParseError {
        ArgumentParseError::new(message, self.input(), self.cursor())
    }
}

/// Frozen reader state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableArgumentReader {
    input: Arc<str>,
    cursor: usize,
}

impl ImmutableArgumentReader {
    pub fn mutable(&self) -> ArgumentReader {
        ArgumentReader {
            input: Arc::clone(&self.input),
            cursor: self.cursor,
        }
    }
}

impl StringReader for ImmutableArgumentReader {
    fn input(&self) -> &str {
        &self.input
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentReader {
    input: Arc<str>,
    cursor: usize,
}

impl StringReader for ArgumentReader {
    fn input(&self) -> &str {
        &self.input
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

impl ArgumentReader {
    pub fn new(input: impl Into<Arc<str>>) -> Self {
        Self {
            input: input.into(),
            cursor: 0,
        }
    }

    /// Moves the cursor, clamped to the input and backed off to the closest
    /// char boundary.
    pub fn set_cursor(&mut self, cursor: usize) {
        let mut cursor = cursor.min(self.input.len());
        while !self.input.is_char_boundary(cursor) {
            cursor -= 1;
        }
        self.cursor = cursor;
    }

    pub fn immutable(&self) -> ImmutableArgumentReader {
        ImmutableArgumentReader {
            input: Arc::clone(&self.input),
            cursor: self.cursor,
        }
    }

    /// Restores the cursor from a snapshot. The snapshot must have been taken
    /// against an equal input.
    pub fn set_state(&mut self, state: &ImmutableArgumentReader) -> Result<(), ReaderStateMismatch> {
        if *state.input != *self.input {
            return Err(ReaderStateMismatch);
        }
        self.cursor = state.cursor;
        Ok(())
    }

    /// Restores a snapshot taken from this very reader.
    pub(crate) fn restore(&mut self, state: &ImmutableArgumentReader) {
        debug_assert!(*state.input == *self.input);
        self.cursor = state.cursor;
    }

    pub fn skip(&mut self) {
        if let Some(c) = self.remaining().chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.remaining().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.cursor += c.len_utf8();
        }
    }

    pub fn parse_char(&mut self) -> Result<char, ArgumentParseError> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Ok(c)
    }

    /// Consumes the run of characters a number may be made of.
    fn read_number_token(&mut self) -> &str {
        let start = self.cursor;
        while let Some(c) = self.remaining().chars().next() {
            if !is_allowed_number(c) {
                break;
            }
            self.cursor += c.len_utf8();
        }
        &self.input[start..self.cursor]
    }

    fn parse_number<T: std::str::FromStr>(
        &mut self,
        type_name: &str,
        article: &str,
    ) -> Result<T, ArgumentParseError> {
        let start = self.cursor;
        let token = self.read_number_token().to_string();
        let failure = |reason: String| {
            ArgumentParseError::new(
                format!("Could not parse {article} {type_name}: {reason}"),
                &*self.input,
                start,
            )
        };
        if token.is_empty() {
            return Err(failure(format!("Expected {type_name}")));
        }
        match token.parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                self.cursor = start;
                Err(failure(format!("Invalid {type_name} '{token}'")))
            }
        }
    }

    pub fn parse_int(&mut self) -> Result<i32, ArgumentParseError> {
        self.parse_number("integer", "an")
    }

    pub fn parse_long(&mut self) -> Result<i64, ArgumentParseError> {
        self.parse_number("long", "a")
    }

    pub fn parse_double(&mut self) -> Result<f64, ArgumentParseError> {
        self.parse_number("double", "a")
    }

    pub fn parse_float(&mut self) -> Result<f32, ArgumentParseError> {
        self.parse_number("float", "a")
    }

    pub fn parse_boolean(&mut self) -> Result<bool, ArgumentParseError> {
        let start = self.cursor;
        let token = self.parse_unquoted_string();
        match token.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            "" => Err(ArgumentParseError::new(
                "Could not parse a boolean: Expected bool",
                &*self.input,
                start,
            )),
            _ => {
                self.cursor = start;
                Err(ArgumentParseError::new(
                    format!(
                        "Could not parse a boolean: Invalid bool, expected true or false but found '{token}'"
                    ),
                    &*self.input,
                    start,
                ))
            }
        }
    }

    /// Reads up to the next whitespace character.
    pub fn parse_unquoted_string(&mut self) -> String {
        let start = self.cursor;
        while let Some(c) = self.remaining().chars().next() {
            if c.is_whitespace() {
                break;
            }
            self.cursor += c.len_utf8();
        }
        self.input[start..self.cursor].to_string()
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ArgumentParseError> {
        let start = self.cursor;
        if !self.can_read_any() {
            return Ok(String::new());
        }
        if self.peek()? != SYNTAX_QUOTE {
            return Err(self.create_error("Could not parse string: Expected quote to start a string"));
        }
        self.skip();

        let mut result = String::new();
        let mut escaped = false;
        while let Some(c) = self.remaining().chars().next() {
            self.cursor += c.len_utf8();
            if escaped {
                if c == SYNTAX_QUOTE || c == SYNTAX_ESCAPE {
                    result.push(c);
                    escaped = false;
                } else {
                    self.cursor -= c.len_utf8();
                    return Err(self.create_error(format!(
                        "Could not parse string: Invalid escape sequence '{c}' in quoted string"
                    )));
                }
            } else if c == SYNTAX_ESCAPE {
                escaped = true;
            } else if c == SYNTAX_QUOTE {
                return Ok(result);
            } else {
                result.push(c);
            }
        }

        Err(ArgumentParseError::new(
            "Could not parse string: Unclosed quoted string",
            &*self.input,
            start,
        ))
    }

    /// Reads a quoted string if the next character is a quote, otherwise an
    /// unquoted one.
    pub fn parse_string(&mut self) -> Result<String, ArgumentParseError> {
        if self.can_read_any() && self.peek()? == SYNTAX_QUOTE {
            self.parse_quoted_string()
        } else {
            Ok(self.parse_unquoted_string())
        }
    }

    /// Consumes everything left in the input.
    pub fn parse_remaining(&mut self) -> String {
        let rest = self.remaining().to_string();
        self.cursor = self.input.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_has_no_side_effect() {
        let reader = ArgumentReader::new("ab");
        assert!(reader.can_read(2));
        assert!(!reader.can_read(3));
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn peek_past_end_fails() {
        let mut reader = ArgumentReader::new("ab");
        assert_eq!(reader.peek_at(1).unwrap(), 'b');
        reader.set_cursor(2);
        assert!(reader.peek().is_err());
    }

    #[test]
    fn peek_offsets_are_bytes() {
        let reader = ArgumentReader::new("é b");
        assert_eq!(reader.peek_at(0).unwrap(), 'é');
        assert_eq!(reader.peek_at(2).unwrap(), ' ');
        assert_eq!(reader.peek_at(3).unwrap(), 'b');
        // Inside the two byte 'é'.
        assert!(reader.peek_at(1).is_err());
        let err = reader.peek_at(4).unwrap_err();
        assert_eq!(err.message(), "Index 4 is out of bounds for input of length 4");
    }

    #[test]
    fn int_failure_reports_token_start() {
        let mut reader = ArgumentReader::new("amount five");
        reader.set_cursor(7);
        let err = reader.parse_int().unwrap_err();
        assert_eq!(err.cursor(), 7);
        assert!(err.message().contains("integer"));
        assert_eq!(reader.cursor(), 7);
    }

    #[test]
    fn invalid_number_restores_to_token_start() {
        let mut reader = ArgumentReader::new("1-2 rest");
        let err = reader.parse_int().unwrap_err();
        assert_eq!(err.cursor(), 0);
        assert_eq!(err.message(), "Could not parse an integer: Invalid integer '1-2'");
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn numbers_stop_at_separator() {
        let mut reader = ArgumentReader::new("12 3.5 -4");
        assert_eq!(reader.parse_int().unwrap(), 12);
        reader.skip_whitespace();
        assert_eq!(reader.parse_double().unwrap(), 3.5);
        reader.skip_whitespace();
        assert_eq!(reader.parse_long().unwrap(), -4);
        assert!(!reader.can_read_any());
    }

    #[test]
    fn booleans() {
        let mut reader = ArgumentReader::new("true maybe");
        assert!(reader.parse_boolean().unwrap());
        reader.skip_whitespace();
        let err = reader.parse_boolean().unwrap_err();
        assert_eq!(err.cursor(), 5);
        assert_eq!(reader.cursor(), 5);
    }

    #[test]
    fn quoted_and_unquoted_strings() {
        let mut reader = ArgumentReader::new(r#""hello \"world\"" plain"#);
        assert_eq!(reader.parse_string().unwrap(), r#"hello "world""#);
        reader.skip_whitespace();
        assert_eq!(reader.parse_string().unwrap(), "plain");
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        let mut reader = ArgumentReader::new("\"open");
        let err = reader.parse_string().unwrap_err();
        assert_eq!(err.cursor(), 0);
        assert!(err.message().contains("Unclosed"));
    }

    #[test]
    fn invalid_escape_is_an_error() {
        let mut reader = ArgumentReader::new(r#""a\b""#);
        assert!(reader.parse_quoted_string().is_err());
    }

    #[test]
    fn set_state_requires_equal_input() {
        let mut reader = ArgumentReader::new("one two");
        let snapshot = reader.immutable();
        reader.parse_unquoted_string();
        assert_eq!(reader.cursor(), 3);

        reader.set_state(&snapshot).unwrap();
        assert_eq!(reader.cursor(), 0);

        // Equal by value is enough, the allocation does not matter.
        let copy = ArgumentReader::new(String::from("one two")).immutable();
        assert!(reader.set_state(&copy).is_ok());

        let other = ArgumentReader::new("three").immutable();
        assert_eq!(reader.set_state(&other), Err(ReaderStateMismatch));
    }

    #[test]
    fn immutable_snapshot_accessors() {
        let mut reader = ArgumentReader::new("say hi");
        reader.parse_unquoted_string();
        let snapshot = reader.immutable();
        assert_eq!(snapshot.read(), "say");
        assert_eq!(snapshot.remaining(), " hi");
        assert_eq!(snapshot.remaining_length(), 3);
        assert_eq!(snapshot.mutable().cursor(), 3);
    }
}
