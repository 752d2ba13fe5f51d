//! Parse results.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::{FromValue, Value};

/// Values of one reached command, plus its reached sub-command.
///
/// Values are keyed by the argument's first name. Unused arguments appear
/// only when they have a default or an initial value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedArguments {
    command: String,
    values: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    forward: Vec<String>,
    has_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_command: Option<Box<ParsedArguments>>,
}

impl ParsedArguments {
    pub(crate) fn new(
        command: String,
        values: BTreeMap<String, Value>,
        forward: Vec<String>,
        has_errors: bool,
        sub_command: Option<ParsedArguments>,
    ) -> Self {
        Self {
            command,
            values,
            forward,
            has_errors,
            sub_command: sub_command.map(Box::new),
        }
    }

    /// Name of the command these values belong to.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Typed value of an argument.
    ///
    /// Returns `None` when the argument has no value or the value does not
    /// convert to `T`.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.values.get(name).and_then(T::from_value)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Words that followed the forward marker `--`.
    pub fn forward(&self) -> &[String] {
        &self.forward
    }

    /// Whether this command or one of its reached sub-commands has errors
    /// at its minimum exit level.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn sub_command(&self) -> Option<&ParsedArguments> {
        self.sub_command.as_deref()
    }

    /// Follows reached sub-commands by name.
    ///
    /// ```
    /// # use argweave::{Command, CommandTree};
    /// let mut tree = CommandTree::new(Command::new("app")).unwrap();
    /// let remote = tree.add_command(tree.root(), Command::new("remote")).unwrap();
    /// tree.add_command(remote, Command::new("add")).unwrap();
    ///
    /// let outcome = tree.parse(["remote", "add"]).unwrap();
    /// assert!(outcome.parsed.find(&["remote", "add"]).is_some());
    /// assert!(outcome.parsed.find(&["add"]).is_none());
    /// ```
    pub fn find(&self, path: &[&str]) -> Option<&ParsedArguments> {
        let mut current = self;
        for name in path {
            current = current.sub_command().filter(|s| s.command == *name)?;
        }
        Some(current)
    }

    /// The deepest reached command.
    pub fn leaf(&self) -> &ParsedArguments {
        let mut current = self;
        while let Some(sub) = current.sub_command() {
            current = sub;
        }
        current
    }
}

/// What [`CommandTree::parse`](crate::CommandTree::parse) returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    /// Values of the root command and its reached sub-commands.
    pub parsed: ParsedArguments,
    /// Rolled-up error code, `0` on success.
    pub exit_code: i32,
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
