//! Error types.
//!
//! Two families live here:
//!
//! - **Build and usage errors** ([`BuildError`], [`TreeError`]) are returned as
//!   `Err` from the builder API and the parse entry point.
//! - **Input errors** ([`TokenizeError`], [`ParseError`], [`CustomError`]) are
//!   never returned as `Err`. They are collected on the command that produced
//!   them and classified by [`ErrorLevel`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::ValueCount;

/// Severity of a collected input error. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl ErrorLevel {
    fn severity(self) -> u8 {
        match self {
            ErrorLevel::Error => 3,
            ErrorLevel::Warning => 2,
            ErrorLevel::Info => 1,
            ErrorLevel::Debug => 0,
        }
    }

    /// Returns `true` if this level is at least as severe as `minimum`.
    ///
    /// ```
    /// use argweave::ErrorLevel;
    ///
    /// assert!(ErrorLevel::Error.is_in_minimum(ErrorLevel::Warning));
    /// assert!(!ErrorLevel::Info.is_in_minimum(ErrorLevel::Warning));
    /// ```
    pub fn is_in_minimum(self, minimum: ErrorLevel) -> bool {
        self.severity() >= minimum.severity()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorLevel::Error => "error",
            ErrorLevel::Warning => "warning",
            ErrorLevel::Info => "info",
            ErrorLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything carrying an [`ErrorLevel`].
pub trait Leveled {
    fn level(&self) -> ErrorLevel;
}

/// Returns `true` if any of `errors` reaches `minimum`.
pub(crate) fn any_in_minimum<E: Leveled>(errors: &[E], minimum: ErrorLevel) -> bool {
    errors.iter().any(|e| e.level().is_in_minimum(minimum))
}

// ============================================================================
// Tokenize errors
// ============================================================================

/// Kinds of tokenizer errors. None of them stops tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeErrorKind {
    /// A tuple was opened while another one was still open.
    #[error("tuple already open")]
    TupleAlreadyOpen,

    /// A tuple close without a matching open.
    #[error("unexpected tuple close")]
    UnexpectedTupleClose,

    /// Input ended with a tuple still open.
    #[error("tuple not closed")]
    TupleNotClosed,
}

/// An error recorded while tokenizing a command's slice of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    pub kind: TokenizeErrorKind,
    /// Index into the command's token list the error refers to.
    pub token_index: usize,
    pub level: ErrorLevel,
}

impl TokenizeError {
    pub(crate) fn new(kind: TokenizeErrorKind, token_index: usize) -> Self {
        Self {
            kind,
            token_index,
            level: ErrorLevel::Error,
        }
    }
}

impl Leveled for TokenizeError {
    fn level(&self) -> ErrorLevel {
        self.level
    }
}

// ============================================================================
// Parse errors
// ============================================================================

/// Kinds of parser errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No argument, positional slot or command matched the token.
    UnmatchedToken,
    /// An occurrence received a number of values outside the type's range.
    IncorrectValueCount { expected: ValueCount },
    /// A character of a bundled name list matched no argument.
    UnmatchedInArgNameList { name: char },
    /// The argument was used more or fewer times than its type allows.
    IncorrectUsageCount { expected: ValueCount },
    /// A required argument was never used.
    RequiredArgumentNotUsed,
    /// More than one argument of an exclusive group was used.
    MultipleArgsInExclusiveGroup { group: String },
}

/// An error recorded by a command's parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Index into the command's token list the error refers to.
    pub token_index: usize,
    /// Index of the offending argument within its command, when known.
    pub argument: Option<usize>,
    /// Number of values actually found (or usages, for usage errors).
    pub value_count: usize,
    pub level: ErrorLevel,
    pub in_tuple: bool,
    pub in_arg_name_list: bool,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, token_index: usize) -> Self {
        Self {
            kind,
            token_index,
            argument: None,
            value_count: 0,
            level: ErrorLevel::Error,
            in_tuple: false,
            in_arg_name_list: false,
        }
    }

    pub(crate) fn argument(mut self, index: usize) -> Self {
        self.argument = Some(index);
        self
    }

    pub(crate) fn value_count(mut self, count: usize) -> Self {
        self.value_count = count;
        self
    }

    /// Human-readable message. `argument` is the display name of
    /// [`ParseError::argument`], resolved by the caller.
    pub fn message(&self, argument: Option<&str>, token: Option<&str>) -> String {
        let arg = argument.unwrap_or("?");
        match &self.kind {
            ParseErrorKind::UnmatchedToken => match token {
                Some(text) => format!("unmatched token '{text}'"),
                None => "unmatched token".to_string(),
            },
            ParseErrorKind::IncorrectValueCount { expected } => format!(
                "incorrect number of values for argument '{arg}': expected {expected}, got {}",
                self.value_count
            ),
            ParseErrorKind::UnmatchedInArgNameList { name } => {
                format!("argument '{name}' does not exist in name list")
            }
            ParseErrorKind::IncorrectUsageCount { expected } => format!(
                "argument '{arg}' was used {} times, expected {expected}",
                self.value_count
            ),
            ParseErrorKind::RequiredArgumentNotUsed => {
                format!("required argument '{arg}' was not used")
            }
            ParseErrorKind::MultipleArgsInExclusiveGroup { group } => {
                format!("multiple arguments of exclusive group '{group}' used")
            }
        }
    }
}

impl Leveled for ParseError {
    fn level(&self) -> ErrorLevel {
        self.level
    }
}

// ============================================================================
// Custom errors
// ============================================================================

/// An error raised outside the engine's state machine: by an argument type
/// during conversion, or by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomError {
    pub message: String,
    pub level: ErrorLevel,
    pub token_index: Option<usize>,
}

impl CustomError {
    pub fn new(message: impl Into<String>, level: ErrorLevel) -> Self {
        Self {
            message: message.into(),
            level,
            token_index: None,
        }
    }

    pub(crate) fn at(mut self, token_index: usize) -> Self {
        self.token_index = Some(token_index);
        self
    }
}

impl Leveled for CustomError {
    fn level(&self) -> ErrorLevel {
        self.level
    }
}

/// Returned by [`ArgumentType::parse`](crate::ArgumentType::parse) when the
/// values cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
    pub level: ErrorLevel,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ErrorLevel::Error,
        }
    }

    pub fn with_level(mut self, level: ErrorLevel) -> Self {
        self.level = level;
        self
    }
}

impl From<ConversionError> for CustomError {
    fn from(err: ConversionError) -> Self {
        CustomError::new(err.message, err.level)
    }
}

// ============================================================================
// Build and usage errors
// ============================================================================

/// Errors from assembling a command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A command, argument or group name is not usable.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Two sibling commands share a name.
    #[error("command '{name}' already exists in command '{parent}'")]
    DuplicateCommand { name: String, parent: String },

    /// Two arguments of one command share a name.
    #[error("argument '{name}' already exists in command '{command}'")]
    DuplicateArgument { name: String, command: String },

    /// Two groups of one command share a name.
    #[error("group '{name}' already exists in command '{command}'")]
    DuplicateGroup { name: String, command: String },

    /// A group refers to an argument the command does not have.
    #[error("argument '{name}' not found in command '{command}'")]
    UnknownArgument { name: String, command: String },

    /// The argument already belongs to another group.
    #[error("argument '{name}' already belongs to group '{group}'")]
    AlreadyGrouped { name: String, group: String },

    /// The command already has a parent.
    #[error("command '{command}' is already a sub-command of '{parent}'")]
    AlreadyAttached { command: String, parent: String },

    /// Attaching would make the command its own ancestor.
    #[error("cannot attach command '{command}' below itself")]
    CycleDetected { command: String },

    /// The root command cannot become a sub-command.
    #[error("cannot attach the root command as a sub-command")]
    RootAttach,

    /// Error codes must be positive.
    #[error("error code must be greater than 0, got {0}")]
    InvalidErrorCode(i32),

    /// An argument type was configured with unusable parameters.
    #[error("invalid argument type: {0}")]
    InvalidArgumentType(String),
}

/// Errors from using a tree out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// `parse` was called again without `reset`.
    #[error("the command tree was already parsed; call reset() before parsing again")]
    AlreadyParsed,

    /// Results were requested before `parse`.
    #[error("the command tree has not been parsed yet")]
    NotParsed,
}

/// Result type for building command trees.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;
