//! Per-command configuration and inheritance.
//!
//! Each command owns a [`CommandConfig`]. Values that were never set
//! explicitly are copied from the parent when the command is attached, and
//! again whenever [`CommandTree::propagate_config`](crate::CommandTree::propagate_config)
//! is called. The copy is a snapshot: later changes to the parent do not
//! reach the child until the next propagation.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, ErrorLevel, Result};

/// A configuration value that remembers whether it was set explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting<T> {
    value: T,
    explicit: bool,
}

impl<T: Clone> Setting<T> {
    /// A default value, replaceable by inheritance.
    pub fn new(value: T) -> Self {
        Self {
            value,
            explicit: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Sets the value and pins it against inheritance.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.explicit = true;
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Copies `other`'s value unless this one was set explicitly.
    pub fn inherit(&mut self, other: &Setting<T>) {
        if !self.explicit {
            self.value = other.value.clone();
        }
    }
}

/// Characters delimiting a tuple of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TupleChars {
    #[default]
    SquareBrackets,
    Parentheses,
    Braces,
    AngleBrackets,
}

impl TupleChars {
    pub fn open(self) -> char {
        match self {
            TupleChars::SquareBrackets => '[',
            TupleChars::Parentheses => '(',
            TupleChars::Braces => '{',
            TupleChars::AngleBrackets => '<',
        }
    }

    pub fn close(self) -> char {
        match self {
            TupleChars::SquareBrackets => ']',
            TupleChars::Parentheses => ')',
            TupleChars::Braces => '}',
            TupleChars::AngleBrackets => '>',
        }
    }
}

/// When a command's success callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallbackPolicy {
    /// Only if nothing in the whole tree failed.
    #[default]
    NoErrorInAllCommands,
    /// Only if neither the command nor its reached sub-commands failed.
    NoErrorInCommandAndSubCommands,
    /// Only if the command itself did not fail.
    NoErrorInCommand,
    /// Always, regardless of argument errors.
    NoErrorInArgument,
}

/// Configuration of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub(crate) tuple_chars: Setting<TupleChars>,
    pub(crate) min_display_level: Setting<ErrorLevel>,
    pub(crate) min_exit_level: Setting<ErrorLevel>,
    pub(crate) error_code: Setting<i32>,
    pub(crate) callback_policy: Setting<CallbackPolicy>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            tuple_chars: Setting::new(TupleChars::default()),
            min_display_level: Setting::new(ErrorLevel::Info),
            min_exit_level: Setting::new(ErrorLevel::Error),
            error_code: Setting::new(1),
            callback_policy: Setting::new(CallbackPolicy::default()),
        }
    }
}

impl CommandConfig {
    pub fn tuple_chars(&self) -> TupleChars {
        *self.tuple_chars.get()
    }

    pub fn min_display_level(&self) -> ErrorLevel {
        *self.min_display_level.get()
    }

    pub fn min_exit_level(&self) -> ErrorLevel {
        *self.min_exit_level.get()
    }

    pub fn error_code(&self) -> i32 {
        *self.error_code.get()
    }

    pub fn callback_policy(&self) -> CallbackPolicy {
        *self.callback_policy.get()
    }

    pub fn set_tuple_chars(&mut self, chars: TupleChars) -> &mut Self {
        self.tuple_chars.set(chars);
        self
    }

    pub fn set_min_display_level(&mut self, level: ErrorLevel) -> &mut Self {
        self.min_display_level.set(level);
        self
    }

    pub fn set_min_exit_level(&mut self, level: ErrorLevel) -> &mut Self {
        self.min_exit_level.set(level);
        self
    }

    /// Sets the code this command contributes to the exit status when it
    /// fails. Codes of failing commands are OR-ed together up the tree.
    pub fn set_error_code(&mut self, code: i32) -> Result<&mut Self> {
        if code <= 0 {
            return Err(BuildError::InvalidErrorCode(code));
        }
        self.error_code.set(code);
        Ok(self)
    }

    pub fn set_callback_policy(&mut self, policy: CallbackPolicy) -> &mut Self {
        self.callback_policy.set(policy);
        self
    }

    /// Copies every value not set explicitly on `self` from `parent`.
    pub fn inherit(&mut self, parent: &CommandConfig) {
        self.tuple_chars.inherit(&parent.tuple_chars);
        self.min_display_level.inherit(&parent.min_display_level);
        self.min_exit_level.inherit(&parent.min_exit_level);
        self.error_code.inherit(&parent.error_code);
        self.callback_policy.inherit(&parent.callback_policy);
    }

    /// Applies every value present in `overrides` as an explicit setting.
    pub fn apply(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(chars) = overrides.tuple_chars {
            self.set_tuple_chars(chars);
        }
        if let Some(level) = overrides.min_display_level {
            self.set_min_display_level(level);
        }
        if let Some(level) = overrides.min_exit_level {
            self.set_min_exit_level(level);
        }
        if let Some(code) = overrides.error_code {
            self.set_error_code(code)?;
        }
        if let Some(policy) = overrides.callback_policy {
            self.set_callback_policy(policy);
        }
        Ok(())
    }
}

/// Optional configuration values, deserializable from any serde format.
///
/// ```
/// use argweave::{ConfigOverrides, ErrorLevel};
///
/// let overrides: ConfigOverrides =
///     serde_json::from_str(r#"{ "min-exit-level": "warning", "error-code": 4 }"#).unwrap();
/// assert_eq!(overrides.min_exit_level, Some(ErrorLevel::Warning));
/// assert_eq!(overrides.error_code, Some(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub tuple_chars: Option<TupleChars>,
    pub min_display_level: Option<ErrorLevel>,
    pub min_exit_level: Option<ErrorLevel>,
    pub error_code: Option<i32>,
    pub callback_policy: Option<CallbackPolicy>,
}
