//! Command definitions.
//!
//! A [`Command`] is built standalone and handed to a
//! [`CommandTree`](crate::CommandTree), which returns the [`CommandId`] used
//! to refer to it afterwards.

use std::fmt;
use std::rc::Rc;

use crate::config::{CallbackPolicy, CommandConfig, ConfigOverrides, TupleChars};
use crate::error::{ErrorLevel, Result};
use crate::result::ParsedArguments;

/// Handle of a command inside a [`CommandTree`](crate::CommandTree).
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    /// The root command of every tree.
    pub const ROOT: CommandId = CommandId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Callback receiving a command's parsed arguments.
pub type CommandCallback = Rc<dyn Fn(&ParsedArguments)>;

/// A command definition.
///
/// ```
/// use argweave::{Command, ErrorLevel};
///
/// let cmd = Command::new("build")
///     .alias("b")
///     .description("Compile the project")
///     .error_code(2)
///     .min_exit_level(ErrorLevel::Warning);
/// assert_eq!(cmd.name(), "build");
/// assert_eq!(cmd.config().error_code(), 2);
/// ```
pub struct Command {
    names: Vec<String>,
    description: Option<String>,
    pub(crate) config: CommandConfig,
    on_success: Option<CommandCallback>,
    on_error: Option<CommandCallback>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            description: None,
            config: CommandConfig::default(),
            on_success: None,
            on_error: None,
        }
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tuple_chars(mut self, chars: TupleChars) -> Self {
        self.config.set_tuple_chars(chars);
        self
    }

    pub fn min_display_level(mut self, level: ErrorLevel) -> Self {
        self.config.set_min_display_level(level);
        self
    }

    pub fn min_exit_level(mut self, level: ErrorLevel) -> Self {
        self.config.set_min_exit_level(level);
        self
    }

    /// Code contributed to the exit status when this command fails.
    /// Must be positive; checked when the command is added to a tree.
    pub fn error_code(mut self, code: i32) -> Self {
        self.config.error_code.set(code);
        self
    }

    pub fn callback_policy(mut self, policy: CallbackPolicy) -> Self {
        self.config.set_callback_policy(policy);
        self
    }

    /// Applies every value present in `overrides`.
    pub fn overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        self.config.apply(overrides)?;
        Ok(self)
    }

    /// Runs after a successful parse, as allowed by the callback policy.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParsedArguments) + 'static,
    {
        self.on_success = Some(Rc::new(f));
        self
    }

    /// Runs instead of the success callback when the policy denies it.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParsedArguments) + 'static,
    {
        self.on_error = Some(Rc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub(crate) fn success_callback(&self) -> Option<&CommandCallback> {
        self.on_success.as_ref()
    }

    pub(crate) fn error_callback(&self) -> Option<&CommandCallback> {
        self.on_error.as_ref()
    }

    pub(crate) fn shares_name_with(&self, other: &Command) -> Option<&str> {
        self.names
            .iter()
            .find(|n| other.has_name(n))
            .map(String::as_str)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("config", &self.config)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_explicit_config() {
        let cmd = Command::new("run").tuple_chars(TupleChars::Braces);
        assert!(cmd.config.tuple_chars.is_explicit());
        assert!(!cmd.config.error_code.is_explicit());
    }

    #[test]
    fn shared_names() {
        let a = Command::new("build").alias("b");
        let b = Command::new("bench").alias("b");
        let c = Command::new("check");
        assert_eq!(a.shares_name_with(&b), Some("b"));
        assert_eq!(a.shares_name_with(&c), None);
    }

    #[test]
    fn overrides_apply() {
        let overrides = ConfigOverrides {
            error_code: Some(3),
            ..Default::default()
        };
        let cmd = Command::new("x").overrides(&overrides).unwrap();
        assert_eq!(cmd.config().error_code(), 3);

        let bad = ConfigOverrides {
            error_code: Some(-1),
            ..Default::default()
        };
        assert!(Command::new("x").overrides(&bad).is_err());
    }
}
