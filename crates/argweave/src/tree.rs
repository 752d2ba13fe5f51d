//! The command tree: registration, parsing and result rollup.
//!
//! Commands live in an arena owned by [`CommandTree`] and are referred to by
//! [`CommandId`]. Parsing runs in two phases over the reached path of
//! commands:
//!
//! 1. **Tokenize**: the root classifies its words. When it meets a
//!    sub-command name, the remaining words go to that sub-command, and so
//!    on. Commands that are never named stay untouched.
//! 2. **Parse**: only after every reached command is tokenized, each one
//!    parses its tokens, then all of them are finished (usage, required and
//!    group checks; final values cached).
//!
//! A tree parses one input. [`CommandTree::reset`] clears every piece of
//! parse state so the same tree can parse again.
//!
//! # Exit codes
//!
//! A command *fails* when any of its errors, or of its reached sub-command's,
//! reaches its minimum exit level. The error code of a command is the OR of
//! its reached sub-command's code (when that sub-command's exit level is at
//! least as strict) and, if it failed, its own code:
//!
//! ```
//! use argweave::{types, Argument, Command, CommandTree};
//!
//! let mut tree = CommandTree::new(Command::new("app")).unwrap();
//! let mid = tree.add_command(tree.root(), Command::new("mid").error_code(2)).unwrap();
//! let leaf = tree.add_command(mid, Command::new("leaf").error_code(4)).unwrap();
//! tree.add_argument(leaf, Argument::new("n", types::Int)).unwrap();
//!
//! let outcome = tree.parse(["mid", "leaf", "--n", "oops"]).unwrap();
//! assert_eq!(outcome.exit_code, 1 | 2 | 4);
//! ```

use std::collections::BTreeMap;

use crate::argument::{sort_by_priority, validate_name, Argument, ArgumentGroup};
use crate::command::{Command, CommandId};
use crate::config::{CallbackPolicy, CommandConfig};
use crate::error::{
    any_in_minimum, BuildError, CustomError, ErrorLevel, ParseError, Result, TokenizeError,
    TreeError,
};
use crate::parser::{self, Parser, ParserState};
use crate::result::{ParseOutcome, ParsedArguments};
use crate::token::{Token, TokenKind};
use crate::tokenizer::{Tokenizer, TokenizerState};
use crate::value::Value;

#[derive(Debug)]
struct Node {
    command: Command,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
    arguments: Vec<Argument>,
    groups: Vec<ArgumentGroup>,
    tokenizer: TokenizerState,
    parser: ParserState,
    custom_errors: Vec<CustomError>,
    /// The word that selected this command, when reached as a sub-command.
    invoked_as: Option<String>,
}

impl Node {
    fn new(command: Command) -> Self {
        Self {
            command,
            parent: None,
            children: Vec::new(),
            arguments: Vec::new(),
            groups: Vec::new(),
            tokenizer: TokenizerState::default(),
            parser: ParserState::default(),
            custom_errors: Vec::new(),
            invoked_as: None,
        }
    }

    fn has_own_errors(&self, minimum: ErrorLevel) -> bool {
        any_in_minimum(&self.tokenizer.errors, minimum)
            || any_in_minimum(&self.parser.errors, minimum)
            || any_in_minimum(&self.custom_errors, minimum)
            || self.arguments.iter().any(|a| a.has_errors(minimum))
    }

    /// Conversion errors of the argument, or parse errors attributed to it.
    fn argument_failed(&self, index: usize, minimum: ErrorLevel) -> bool {
        self.arguments[index].has_errors(minimum)
            || self
                .parser
                .errors
                .iter()
                .any(|e| e.argument == Some(index) && e.level.is_in_minimum(minimum))
    }

    fn reset(&mut self) {
        self.tokenizer = TokenizerState::default();
        self.parser = ParserState::default();
        self.custom_errors.clear();
        self.invoked_as = None;
        for argument in &mut self.arguments {
            argument.reset();
        }
    }
}

/// A tree of commands and their arguments.
///
/// Handles are arena indices: a [`CommandId`] from another tree names an
/// unrelated command here, and methods taking one panic when it is out of
/// range.
///
/// ```
/// use argweave::{types, Argument, Command, CommandTree};
///
/// let mut tree = CommandTree::new(Command::new("app")).unwrap();
/// let root = tree.root();
/// tree.add_argument(root, Argument::new("verbose", types::Counter).alias("v")).unwrap();
/// tree.add_argument(root, Argument::new("file", types::Text).positional()).unwrap();
///
/// let outcome = tree.parse(["notes.txt", "-vv"]).unwrap();
/// assert_eq!(outcome.exit_code, 0);
/// assert_eq!(outcome.parsed.get::<i64>("verbose"), Some(2));
/// assert_eq!(outcome.parsed.get::<String>("file").as_deref(), Some("notes.txt"));
/// ```
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<Node>,
    parsed: bool,
}

impl CommandTree {
    /// Creates a tree whose root is `root`.
    pub fn new(root: Command) -> Result<Self> {
        check_command(&root)?;
        Ok(Self {
            nodes: vec![Node::new(root)],
            parsed: false,
        })
    }

    pub fn root(&self) -> CommandId {
        CommandId::ROOT
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Adds an argument to a command.
    ///
    /// Fails if the argument has an invalid name or prefix, or shares a
    /// name with an argument already on the command.
    ///
    /// # Panics
    ///
    /// Panics if `command` does not belong to this tree.
    pub fn add_argument(&mut self, command: CommandId, argument: Argument) -> Result<()> {
        argument.validate()?;
        let node = self.node_mut(command);
        if let Some(name) = argument
            .names()
            .iter()
            .find(|n| node.arguments.iter().any(|a| a.has_name(n)))
        {
            return Err(BuildError::DuplicateArgument {
                name: name.clone(),
                command: node.command.name().to_string(),
            });
        }
        tracing::trace!(command = %node.command.name(), argument = %argument.name(), "argument added");
        node.arguments.push(argument);
        Ok(())
    }

    /// Creates a command and attaches it below `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn add_command(&mut self, parent: CommandId, command: Command) -> Result<CommandId> {
        self.check_sibling_names(parent, &command)?;
        let id = self.create_command(command)?;
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Creates a detached command. Attach it with [`attach`](Self::attach).
    pub fn create_command(&mut self, command: Command) -> Result<CommandId> {
        check_command(&command)?;
        self.nodes.push(Node::new(command));
        Ok(CommandId(self.nodes.len() - 1))
    }

    /// Makes `child` a sub-command of `parent`.
    ///
    /// A command can have one parent only, and cannot be attached below
    /// itself or one of its descendants. The child inherits every
    /// configuration value it did not set explicitly.
    ///
    /// # Panics
    ///
    /// Panics if `parent` or `child` does not belong to this tree.
    pub fn attach(&mut self, parent: CommandId, child: CommandId) -> Result<()> {
        if child == CommandId::ROOT {
            return Err(BuildError::RootAttach);
        }
        if let Some(existing) = self.node(child).parent {
            return Err(BuildError::AlreadyAttached {
                command: self.node(child).command.name().to_string(),
                parent: self.node(existing).command.name().to_string(),
            });
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(BuildError::CycleDetected {
                    command: self.node(child).command.name().to_string(),
                });
            }
            ancestor = self.node(id).parent;
        }

        let child_command = &self.node(child).command;
        self.check_sibling_names(parent, child_command)?;

        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        self.propagate_from(child);
        tracing::trace!(
            parent = %self.node(parent).command.name(),
            child = %self.node(child).command.name(),
            "command attached"
        );
        Ok(())
    }

    /// Adds an argument group to a command. Members are resolved by name.
    ///
    /// # Panics
    ///
    /// Panics if `command` does not belong to this tree.
    pub fn add_group(&mut self, command: CommandId, mut group: ArgumentGroup) -> Result<()> {
        validate_name(group.name())?;
        let group_index = self.node(command).groups.len();
        let node = self.node_mut(command);
        let command_name = node.command.name().to_string();

        if node.groups.iter().any(|g| g.name() == group.name()) {
            return Err(BuildError::DuplicateGroup {
                name: group.name().to_string(),
                command: command_name,
            });
        }

        let mut resolved = Vec::new();
        for member in group.member_names() {
            let Some(index) = node.arguments.iter().position(|a| a.has_name(member)) else {
                return Err(BuildError::UnknownArgument {
                    name: member.clone(),
                    command: command_name,
                });
            };
            if let Some(other) = node.arguments[index].group {
                return Err(BuildError::AlreadyGrouped {
                    name: member.clone(),
                    group: node.groups[other].name().to_string(),
                });
            }
            if !resolved.contains(&index) {
                resolved.push(index);
            }
        }

        for &index in &resolved {
            node.arguments[index].group = Some(group_index);
        }
        group.resolved = resolved;
        node.groups.push(group);
        Ok(())
    }

    pub fn config(&self, command: CommandId) -> &CommandConfig {
        &self.node(command).command.config
    }

    /// Changes a command's configuration.
    ///
    /// Sub-commands keep their inherited snapshot until
    /// [`propagate_config`](Self::propagate_config) is called.
    ///
    /// # Panics
    ///
    /// Panics if `command` does not belong to this tree.
    pub fn config_mut(&mut self, command: CommandId) -> &mut CommandConfig {
        &mut self.node_mut(command).command.config
    }

    /// Re-applies configuration inheritance to every attached command.
    pub fn propagate_config(&mut self) {
        let tops: Vec<CommandId> = self
            .ids()
            .filter(|&id| self.node(id).parent.is_none())
            .collect();
        for id in tops {
            for child in self.node(id).children.clone() {
                self.propagate_from(child);
            }
        }
    }

    fn propagate_from(&mut self, command: CommandId) {
        let mut stack = vec![command];
        while let Some(id) = stack.pop() {
            if let Some(parent) = self.node(id).parent {
                let inherited = self.node(parent).command.config.clone();
                self.node_mut(id).command.config.inherit(&inherited);
            }
            stack.extend(self.node(id).children.iter().copied());
        }
    }

    fn check_sibling_names(&self, parent: CommandId, command: &Command) -> Result<()> {
        let parent_node = self.node(parent);
        for &sibling in &parent_node.children {
            if let Some(name) = self.node(sibling).command.shares_name_with(command) {
                return Err(BuildError::DuplicateCommand {
                    name: name.to_string(),
                    parent: parent_node.command.name().to_string(),
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Parses `words` (without the program name).
    ///
    /// Input errors never make this fail; they are collected on the commands
    /// and summarised in [`ParseOutcome::exit_code`]. It only fails when the
    /// tree was already parsed without a [`reset`](Self::reset).
    pub fn parse<I, S>(&mut self, words: I) -> std::result::Result<ParseOutcome, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.parsed {
            return Err(TreeError::AlreadyParsed);
        }
        let words: Vec<String> = words.into_iter().map(Into::into).collect();

        let path = self.tokenize(&words);
        for &id in &path {
            let node = &mut self.nodes[id.0];
            Parser::new(&node.tokenizer.tokens, &mut node.arguments, &mut node.parser)
                .parse_tokens();
        }

        let unique_used = path.iter().any(|&id| {
            self.node(id)
                .arguments
                .iter()
                .any(|a| a.is_unique() && a.usage_count() > 0)
        });
        for &id in &path {
            let node = &mut self.nodes[id.0];
            parser::finish(&node.arguments, &node.groups, &mut node.parser, unique_used);
        }
        self.parsed = true;

        let exit_code = self.error_code();
        tracing::debug!(
            commands = path.len(),
            exit_code,
            "parse finished"
        );

        Ok(ParseOutcome {
            parsed: self.parsed_arguments_of(CommandId::ROOT),
            exit_code,
        })
    }

    /// Tokenizes the reached path and returns it, root first.
    fn tokenize(&mut self, words: &[String]) -> Vec<CommandId> {
        let mut path = vec![CommandId::ROOT];
        let mut current = CommandId::ROOT;
        let mut start = 0;

        loop {
            let sub_commands: Vec<(CommandId, Vec<String>)> = self
                .node(current)
                .children
                .iter()
                .map(|&c| (c, self.node(c).command.names().to_vec()))
                .collect();

            let node = &mut self.nodes[current.0];
            let handoff = Tokenizer::new(
                &node.arguments,
                &sub_commands,
                node.command.config.tuple_chars(),
                &mut node.tokenizer,
            )
            .tokenize(&words[start..]);

            let Some(handoff) = handoff else {
                break;
            };
            let matched = start + handoff.next_word - 1;
            start += handoff.next_word;
            current = handoff.command;
            self.node_mut(current).invoked_as = Some(words[matched].clone());
            tracing::debug!(command = %self.node(current).command.name(), "entering sub-command");
            path.push(current);
        }

        path
    }

    /// Values of `command`, or `None` if it was not reached.
    pub fn parsed_arguments(&self, command: CommandId) -> Option<ParsedArguments> {
        self.is_reached(command)
            .then(|| self.parsed_arguments_of(command))
    }

    fn parsed_arguments_of(&self, command: CommandId) -> ParsedArguments {
        let node = self.node(command);
        let mut values = BTreeMap::new();
        if let Some(parsed) = &node.parser.parsed {
            for (argument, value) in node.arguments.iter().zip(parsed) {
                if let Some(value) = value {
                    values.insert(argument.name().to_string(), value.clone());
                }
            }
        }

        let sub = self
            .reached_sub_command(command)
            .map(|sub| self.parsed_arguments_of(sub));

        ParsedArguments::new(
            node.command.name().to_string(),
            values,
            node.parser.forward.clone(),
            self.has_exit_errors(command),
            sub,
        )
    }

    /// Clears every piece of parse state.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        self.parsed = false;
    }

    // ========================================================================
    // Errors and exit codes
    // ========================================================================

    /// Records an application error on a command.
    ///
    /// # Panics
    ///
    /// Panics if `command` does not belong to this tree.
    pub fn add_error(&mut self, command: CommandId, message: impl Into<String>, level: ErrorLevel) {
        self.node_mut(command)
            .custom_errors
            .push(CustomError::new(message, level));
    }

    /// Errors at the command's minimum exit level, here or in its reached
    /// sub-commands.
    pub fn has_exit_errors(&self, command: CommandId) -> bool {
        self.has_errors_with(command, CommandConfig::min_exit_level)
    }

    /// Errors at the command's minimum display level, here or in its reached
    /// sub-commands.
    pub fn has_display_errors(&self, command: CommandId) -> bool {
        self.has_errors_with(command, CommandConfig::min_display_level)
    }

    fn has_errors_with(&self, command: CommandId, level: fn(&CommandConfig) -> ErrorLevel) -> bool {
        let node = self.node(command);
        node.has_own_errors(level(&node.command.config))
            || self
                .reached_sub_command(command)
                .is_some_and(|sub| self.has_errors_with(sub, level))
    }

    /// Rolled-up error code of the whole tree, `0` when nothing failed.
    pub fn error_code(&self) -> i32 {
        self.command_error_code(CommandId::ROOT)
    }

    /// Rolled-up error code of `command` and its reached sub-commands.
    pub fn command_error_code(&self, command: CommandId) -> i32 {
        let config = self.config(command);
        let sub_code = self
            .reached_sub_command(command)
            .filter(|&sub| {
                self.config(sub)
                    .min_exit_level()
                    .is_in_minimum(config.min_exit_level())
            })
            .map_or(0, |sub| self.command_error_code(sub));

        if self.has_exit_errors(command) {
            sub_code | config.error_code()
        } else {
            sub_code
        }
    }

    pub fn tokenize_errors(&self, command: CommandId) -> &[TokenizeError] {
        &self.node(command).tokenizer.errors
    }

    pub fn parse_errors(&self, command: CommandId) -> &[ParseError] {
        &self.node(command).parser.errors
    }

    /// Application errors added with [`add_error`](Self::add_error).
    pub fn custom_errors(&self, command: CommandId) -> &[CustomError] {
        &self.node(command).custom_errors
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Runs the callbacks of every reached command, deepest first.
    ///
    /// For each command, its own success or error callback runs first, as
    /// decided by its [`CallbackPolicy`], then the callbacks of its
    /// arguments in priority order: `on_error` for arguments with conversion
    /// errors or parse errors (missing values, usage, required, groups),
    /// `on_value` for used arguments when the command's callback was
    /// allowed.
    pub fn invoke_callbacks(&self) -> std::result::Result<(), TreeError> {
        if !self.parsed {
            return Err(TreeError::NotParsed);
        }

        for &id in self.reached_path().iter().rev() {
            let node = self.node(id);
            let allowed = self.success_allowed(id);
            tracing::debug!(command = %node.command.name(), allowed, "invoking callbacks");

            let callback = if allowed {
                node.command.success_callback()
            } else {
                node.command.error_callback()
            };
            if let Some(callback) = callback {
                callback(&self.parsed_arguments_of(id));
            }

            let minimum = node.command.config.min_exit_level();
            let values = node.parser.parsed.as_deref().unwrap_or_default();
            for index in sort_by_priority(&node.arguments) {
                let argument = &node.arguments[index];
                if node.argument_failed(index, minimum) {
                    if let Some(on_error) = argument.error_callback() {
                        on_error(argument);
                    }
                } else if allowed && argument.usage_count() > 0 {
                    if let (Some(on_value), Some(Some(value))) =
                        (argument.value_callback(), values.get(index))
                    {
                        on_value(value);
                    }
                }
            }
        }
        Ok(())
    }

    fn success_allowed(&self, command: CommandId) -> bool {
        let node = self.node(command);
        match node.command.config.callback_policy() {
            CallbackPolicy::NoErrorInAllCommands => !self.has_exit_errors(CommandId::ROOT),
            CallbackPolicy::NoErrorInCommandAndSubCommands => !self.has_exit_errors(command),
            CallbackPolicy::NoErrorInCommand => {
                !node.has_own_errors(node.command.config.min_exit_level())
            }
            CallbackPolicy::NoErrorInArgument => true,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn command(&self, command: CommandId) -> &Command {
        &self.node(command).command
    }

    pub fn parent(&self, command: CommandId) -> Option<CommandId> {
        self.node(command).parent
    }

    pub fn sub_commands(&self, command: CommandId) -> &[CommandId] {
        &self.node(command).children
    }

    pub fn arguments(&self, command: CommandId) -> &[Argument] {
        &self.node(command).arguments
    }

    /// Looks an argument up by any of its names.
    pub fn argument(&self, command: CommandId, name: &str) -> Option<&Argument> {
        self.node(command).arguments.iter().find(|a| a.has_name(name))
    }

    pub fn groups(&self, command: CommandId) -> &[ArgumentGroup] {
        &self.node(command).groups
    }

    /// Arguments ordered by descending priority, declaration order among
    /// equals.
    pub fn arguments_by_priority(&self, command: CommandId) -> Vec<&Argument> {
        let arguments = &self.node(command).arguments;
        sort_by_priority(arguments)
            .into_iter()
            .map(|i| &arguments[i])
            .collect()
    }

    /// Positional arguments in binding order.
    pub fn positional_arguments(&self, command: CommandId) -> Vec<&Argument> {
        self.node(command)
            .arguments
            .iter()
            .filter(|a| a.is_positional())
            .collect()
    }

    /// Whether the input reached `command` (the root always is, once parsed).
    pub fn is_reached(&self, command: CommandId) -> bool {
        self.node(command).tokenizer.finished
    }

    /// Reached commands, root first.
    pub fn reached_path(&self) -> Vec<CommandId> {
        let mut path = Vec::new();
        let mut current = Some(CommandId::ROOT);
        while let Some(id) = current.filter(|&id| self.is_reached(id)) {
            path.push(id);
            current = self.node(id).tokenizer.sub_command;
        }
        path
    }

    fn reached_sub_command(&self, command: CommandId) -> Option<CommandId> {
        self.node(command)
            .tokenizer
            .sub_command
            .filter(|&sub| self.is_reached(sub))
    }

    /// Names from the root down to `command`.
    pub fn command_path(&self, command: CommandId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(command);
        while let Some(id) = current {
            path.push(self.node(id).command.name());
            current = self.node(id).parent;
        }
        path.reverse();
        path
    }

    /// Tokens of one command, without the token naming its sub-command.
    pub fn tokens(&self, command: CommandId) -> &[Token] {
        &self.node(command).tokenizer.tokens
    }

    /// Tokens of every reached command in input order, with a
    /// [`TokenKind::Command`] token for each sub-command name.
    pub fn full_token_list(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for id in self.reached_path() {
            let node = self.node(id);
            if let Some(word) = &node.invoked_as {
                tokens.push(Token::new(TokenKind::Command, word.as_str()));
            }
            tokens.extend(node.tokenizer.tokens.iter().cloned());
        }
        tokens
    }

    /// Index in [`full_token_list`](Self::full_token_list) of the first token
    /// of `command`, if it was reached.
    pub fn token_offset(&self, command: CommandId) -> Option<usize> {
        let mut offset = 0;
        for id in self.reached_path() {
            let node = self.node(id);
            if node.invoked_as.is_some() {
                offset += 1;
            }
            if id == command {
                return Some(offset);
            }
            offset += node.tokenizer.tokens.len();
        }
        None
    }

    /// Position in [`full_token_list`](Self::full_token_list) where the
    /// forward marker was typed: the index of the first forwarded token, or
    /// the list length when nothing followed the marker.
    pub fn forward_marker_index(&self) -> Option<usize> {
        self.reached_path().into_iter().find_map(|id| {
            let local = self.node(id).tokenizer.forward_marker?;
            Some(self.token_offset(id)? + local)
        })
    }

    /// Final value of an argument of a reached command.
    pub fn value(&self, command: CommandId, name: &str) -> Option<&Value> {
        let node = self.node(command);
        let index = node.arguments.iter().position(|a| a.has_name(name))?;
        node.parser.parsed.as_ref()?.get(index)?.as_ref()
    }

    // ========================================================================
    // Arena
    // ========================================================================

    fn ids(&self) -> impl Iterator<Item = CommandId> {
        (0..self.nodes.len()).map(CommandId)
    }

    fn node(&self, id: CommandId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: CommandId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

fn check_command(command: &Command) -> Result<()> {
    for name in command.names() {
        validate_name(name)?;
    }
    let code = command.config.error_code();
    if code <= 0 {
        return Err(BuildError::InvalidErrorCode(code));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn app() -> (CommandTree, CommandId) {
        let mut tree = CommandTree::new(Command::new("app")).unwrap();
        let root = tree.root();
        tree.add_argument(root, Argument::new("verbose", types::Flag).alias("v"))
            .unwrap();
        let run = tree
            .add_command(root, Command::new("run").alias("r"))
            .unwrap();
        tree.add_argument(run, Argument::new("jobs", types::Int).alias("j"))
            .unwrap();
        (tree, run)
    }

    // ==================== Registration ====================

    mod registration {
        use super::*;

        #[test]
        #[should_panic]
        fn foreign_handle_out_of_range_panics() {
            let (_, run) = app();
            let mut other = CommandTree::new(Command::new("other")).unwrap();
            let _ = other.add_argument(run, Argument::new("x", types::Flag));
        }

        #[test]
        fn duplicate_sibling_names_rejected() {
            let (mut tree, _) = app();
            let err = tree
                .add_command(tree.root(), Command::new("remove").alias("r"))
                .unwrap_err();
            assert_eq!(
                err,
                BuildError::DuplicateCommand {
                    name: "r".into(),
                    parent: "app".into(),
                }
            );
        }

        #[test]
        fn same_name_in_different_parents_is_fine() {
            let (mut tree, run) = app();
            assert!(tree.add_command(run, Command::new("run")).is_ok());
        }

        #[test]
        fn duplicate_argument_rejected() {
            let (mut tree, _) = app();
            let err = tree
                .add_argument(tree.root(), Argument::new("quiet", types::Flag).alias("v"))
                .unwrap_err();
            assert!(matches!(err, BuildError::DuplicateArgument { .. }));
        }

        #[test]
        fn invalid_names_rejected() {
            assert!(CommandTree::new(Command::new("")).is_err());
            let (mut tree, _) = app();
            assert!(tree
                .add_argument(tree.root(), Argument::new("--x", types::Flag))
                .is_err());
            assert!(tree.create_command(Command::new("a b")).is_err());
        }

        #[test]
        fn invalid_error_code_rejected() {
            let (mut tree, _) = app();
            let err = tree
                .add_command(tree.root(), Command::new("x").error_code(0))
                .unwrap_err();
            assert_eq!(err, BuildError::InvalidErrorCode(0));
        }

        #[test]
        fn attach_rules() {
            let (mut tree, run) = app();
            let root = tree.root();
            assert_eq!(tree.attach(run, root).unwrap_err(), BuildError::RootAttach);
            assert!(matches!(
                tree.attach(root, run).unwrap_err(),
                BuildError::AlreadyAttached { .. }
            ));

            let a = tree.create_command(Command::new("a")).unwrap();
            let b = tree.create_command(Command::new("b")).unwrap();
            tree.attach(a, b).unwrap();
            assert!(matches!(
                tree.attach(b, a).unwrap_err(),
                BuildError::CycleDetected { .. }
            ));
            assert!(matches!(
                tree.attach(a, a).unwrap_err(),
                BuildError::CycleDetected { .. }
            ));
            tree.attach(run, a).unwrap();
            assert_eq!(tree.command_path(b), vec!["app", "run", "a", "b"]);
        }

        #[test]
        fn groups_resolve_members() {
            let (mut tree, _) = app();
            let root = tree.root();
            tree.add_argument(root, Argument::new("quiet", types::Flag))
                .unwrap();
            tree.add_group(
                root,
                ArgumentGroup::new("output").exclusive().argument("v").argument("quiet"),
            )
            .unwrap();
            assert_eq!(tree.groups(root)[0].members(), &[0, 1]);

            let err = tree
                .add_group(root, ArgumentGroup::new("again").argument("quiet"))
                .unwrap_err();
            assert!(matches!(err, BuildError::AlreadyGrouped { .. }));

            let err = tree
                .add_group(root, ArgumentGroup::new("missing").argument("nope"))
                .unwrap_err();
            assert!(matches!(err, BuildError::UnknownArgument { .. }));

            let err = tree
                .add_group(root, ArgumentGroup::new("output"))
                .unwrap_err();
            assert!(matches!(err, BuildError::DuplicateGroup { .. }));
        }
    }

    // ==================== Configuration ====================

    mod configuration {
        use super::*;
        use crate::config::TupleChars;

        #[test]
        fn attach_snapshots_parent_config() {
            let mut tree = CommandTree::new(Command::new("app").tuple_chars(TupleChars::Braces))
                .unwrap();
            let sub = tree.add_command(tree.root(), Command::new("sub")).unwrap();
            assert_eq!(tree.config(sub).tuple_chars(), TupleChars::Braces);

            tree.config_mut(CommandId::ROOT)
                .set_tuple_chars(TupleChars::Parentheses);
            assert_eq!(tree.config(sub).tuple_chars(), TupleChars::Braces);

            tree.propagate_config();
            assert_eq!(tree.config(sub).tuple_chars(), TupleChars::Parentheses);
        }

        #[test]
        fn explicit_child_values_survive_propagation() {
            let mut tree = CommandTree::new(Command::new("app")).unwrap();
            let sub = tree
                .add_command(tree.root(), Command::new("sub").error_code(4))
                .unwrap();
            tree.config_mut(CommandId::ROOT).set_error_code(9).unwrap();
            tree.propagate_config();
            assert_eq!(tree.config(sub).error_code(), 4);
        }

        #[test]
        fn grandchildren_inherit_on_attach() {
            let mut tree = CommandTree::new(
                Command::new("app").min_exit_level(ErrorLevel::Warning),
            )
            .unwrap();
            let a = tree.create_command(Command::new("a")).unwrap();
            let b = tree.create_command(Command::new("b")).unwrap();
            tree.attach(a, b).unwrap();
            tree.attach(tree.root(), a).unwrap();
            assert_eq!(tree.config(b).min_exit_level(), ErrorLevel::Warning);
        }
    }

    // ==================== Parsing ====================

    mod parsing {
        use super::*;

        #[test]
        fn sub_command_receives_rest() {
            let (mut tree, run) = app();
            let outcome = tree.parse(["-v", "r", "--jobs", "4"]).unwrap();
            assert!(outcome.is_success());
            assert_eq!(outcome.parsed.get::<bool>("verbose"), Some(true));
            let sub = outcome.parsed.sub_command().unwrap();
            assert_eq!(sub.command(), "run");
            assert_eq!(sub.get::<i64>("jobs"), Some(4));
            assert_eq!(tree.reached_path(), vec![CommandId::ROOT, run]);
        }

        #[test]
        fn parent_arguments_are_not_visible_in_sub_command() {
            let (mut tree, run) = app();
            let outcome = tree.parse(["run", "-v"]).unwrap();
            assert_eq!(outcome.exit_code, 1);
            assert_eq!(tree.parse_errors(run).len(), 1);
            assert!(tree.has_exit_errors(CommandId::ROOT));
        }

        #[test]
        fn unreached_commands_are_untouched() {
            let (mut tree, run) = app();
            tree.parse(["-v"]).unwrap();
            assert!(!tree.is_reached(run));
            assert!(tree.parsed_arguments(run).is_none());
            assert_eq!(tree.value(run, "jobs"), None);
        }

        #[test]
        fn parsing_twice_requires_reset() {
            let (mut tree, _) = app();
            tree.parse(["-v"]).unwrap();
            assert_eq!(
                tree.parse(["-v"]).unwrap_err(),
                TreeError::AlreadyParsed
            );
            tree.reset();
            let outcome = tree.parse(Vec::<String>::new()).unwrap();
            assert_eq!(outcome.parsed.get::<bool>("verbose"), Some(false));
        }

        #[test]
        fn full_token_list_includes_commands() {
            let (mut tree, run) = app();
            tree.parse(["-v", "r", "-j", "2"]).unwrap();
            let tokens = tree.full_token_list();
            let kinds: Vec<TokenKind> = tokens.iter().map(Token::kind).collect();
            assert_eq!(
                kinds,
                vec![
                    TokenKind::ArgumentName,
                    TokenKind::Command,
                    TokenKind::ArgumentName,
                    TokenKind::ArgumentValue,
                ]
            );
            assert_eq!(tokens[1].text(), "r");
            assert_eq!(tree.tokens(CommandId::ROOT).len(), 1);
            assert_eq!(tree.token_offset(run), Some(2));
        }

        #[test]
        fn forward_marker_index_is_global() {
            let (mut tree, _) = app();
            tree.parse(["-v", "r", "--", "x"]).unwrap();
            assert_eq!(tree.forward_marker_index(), Some(2));

            tree.reset();
            tree.parse(["-v"]).unwrap();
            assert_eq!(tree.forward_marker_index(), None);
        }

        #[test]
        fn unique_argument_lifts_required() {
            let mut tree = CommandTree::new(Command::new("app")).unwrap();
            let root = tree.root();
            tree.add_argument(root, Argument::new("help", types::Flag).unique())
                .unwrap();
            let sub = tree.add_command(root, Command::new("add")).unwrap();
            tree.add_argument(sub, Argument::new("name", types::Text).required())
                .unwrap();

            assert_eq!(tree.parse(["add"]).unwrap().exit_code, 1);
            tree.reset();
            assert_eq!(tree.parse(["--help", "add"]).unwrap().exit_code, 0);
        }
    }

    // ==================== Error codes ====================

    mod error_codes {
        use super::*;

        fn chain() -> (CommandTree, CommandId, CommandId) {
            let mut tree = CommandTree::new(Command::new("app")).unwrap();
            let mid = tree
                .add_command(tree.root(), Command::new("mid").error_code(2))
                .unwrap();
            let leaf = tree
                .add_command(mid, Command::new("leaf").error_code(4))
                .unwrap();
            (tree, mid, leaf)
        }

        #[test]
        fn codes_or_up_the_tree() {
            let (mut tree, mid, leaf) = chain();
            let outcome = tree.parse(["mid", "leaf", "oops"]).unwrap();
            assert_eq!(outcome.exit_code, 7);
            assert_eq!(tree.command_error_code(mid), 6);
            assert_eq!(tree.command_error_code(leaf), 4);
        }

        #[test]
        fn error_in_parent_only() {
            let (mut tree, _, _) = chain();
            let outcome = tree.parse(["oops", "mid", "leaf"]).unwrap();
            assert_eq!(outcome.exit_code, 1);
        }

        #[test]
        fn success_is_zero() {
            let (mut tree, _, _) = chain();
            assert_eq!(tree.parse(["mid", "leaf"]).unwrap().exit_code, 0);
            assert!(!tree.has_display_errors(CommandId::ROOT));
        }

        #[test]
        fn lenient_sub_command_does_not_contribute() {
            let mut tree = CommandTree::new(Command::new("app").min_exit_level(ErrorLevel::Error))
                .unwrap();
            let sub = tree
                .add_command(
                    tree.root(),
                    Command::new("sub")
                        .error_code(8)
                        .min_exit_level(ErrorLevel::Info),
                )
                .unwrap();
            tree.parse(["sub"]).unwrap();
            tree.add_error(sub, "heads up", ErrorLevel::Info);

            assert!(tree.has_exit_errors(sub));
            assert_eq!(tree.command_error_code(sub), 8);
            // The root fails through its sub-command, but the sub-command's
            // code is dropped: its exit level is laxer than the root's.
            assert_eq!(tree.error_code(), 1);
        }

        #[test]
        fn warnings_respect_exit_level() {
            let (mut tree, _, _) = chain();
            tree.parse(["mid"]).unwrap();
            tree.add_error(CommandId::ROOT, "careful", ErrorLevel::Warning);
            assert!(!tree.has_exit_errors(CommandId::ROOT));
            assert!(tree.has_display_errors(CommandId::ROOT));
            assert_eq!(tree.error_code(), 0);

            tree.config_mut(CommandId::ROOT)
                .set_min_exit_level(ErrorLevel::Warning);
            assert_eq!(tree.error_code(), 1);
        }
    }

    // ==================== Callbacks ====================

    mod callbacks {
        use super::*;

        type Log = Rc<RefCell<Vec<String>>>;

        fn logged(log: &Log, entry: &'static str) -> impl Fn(&ParsedArguments) + 'static {
            let log = log.clone();
            move |_| log.borrow_mut().push(entry.to_string())
        }

        fn tree_with_log(policy: CallbackPolicy) -> (CommandTree, Log) {
            let log: Log = Rc::default();
            let mut tree = CommandTree::new(
                Command::new("app")
                    .callback_policy(policy)
                    .on_success(logged(&log, "app ok"))
                    .on_error(logged(&log, "app err")),
            )
            .unwrap();
            let root = tree.root();

            let value_log = log.clone();
            let error_log = log.clone();
            tree.add_argument(
                root,
                Argument::new("low", types::Int)
                    .on_value(move |v| value_log.borrow_mut().push(format!("low={v:?}"))),
            )
            .unwrap();
            tree.add_argument(
                root,
                Argument::new("high", types::Int)
                    .priority(10)
                    .on_error(move |a| error_log.borrow_mut().push(format!("{} err", a.name()))),
            )
            .unwrap();

            let sub = tree
                .add_command(
                    root,
                    Command::new("sub")
                        .callback_policy(policy)
                        .on_success(logged(&log, "sub ok"))
                        .on_error(logged(&log, "sub err")),
                )
                .unwrap();
            tree.add_argument(sub, Argument::new("n", types::Int)).unwrap();
            (tree, log)
        }

        #[test]
        fn requires_parse() {
            let (tree, _) = tree_with_log(CallbackPolicy::default());
            assert_eq!(tree.invoke_callbacks().unwrap_err(), TreeError::NotParsed);
        }

        #[test]
        fn success_runs_bottom_up() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::default());
            tree.parse(["--low", "1", "sub"]).unwrap();
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["sub ok", "app ok", "low=Int(1)"]);
        }

        #[test]
        fn error_anywhere_blocks_all_by_default() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::NoErrorInAllCommands);
            tree.parse(["--low", "1", "--high", "x", "sub"]).unwrap();
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["sub err", "app err", "high err"]);
        }

        #[test]
        fn command_policy_ignores_other_commands() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::NoErrorInCommand);
            tree.parse(["--low", "1", "sub", "--n", "x"]).unwrap();
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["sub err", "app ok", "low=Int(1)"]);
        }

        #[test]
        fn command_and_sub_commands_policy() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::NoErrorInCommandAndSubCommands);
            tree.parse(["sub", "--n", "x"]).unwrap();
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["sub err", "app err"]);
        }

        #[test]
        fn argument_policy_always_succeeds() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::NoErrorInArgument);
            tree.parse(["--low", "1", "--high", "x"]).unwrap();
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["app ok", "high err", "low=Int(1)"]);
        }

        #[test]
        fn parse_errors_reach_argument_error_callback() {
            let (mut tree, log) = tree_with_log(CallbackPolicy::NoErrorInArgument);
            let outcome = tree.parse(["--high"]).unwrap();
            assert_eq!(outcome.exit_code, 1);
            tree.invoke_callbacks().unwrap();
            assert_eq!(*log.borrow(), vec!["app ok", "high err"]);
        }

        #[test]
        fn required_argument_error_reaches_callback() {
            let fired = Rc::new(RefCell::new(false));
            let flag = fired.clone();
            let mut tree = CommandTree::new(Command::new("app")).unwrap();
            tree.add_argument(
                CommandId::ROOT,
                Argument::new("jobs", types::Int)
                    .required()
                    .on_error(move |_| *flag.borrow_mut() = true),
            )
            .unwrap();
            tree.parse(Vec::<String>::new()).unwrap();
            tree.invoke_callbacks().unwrap();
            assert!(*fired.borrow());
        }
    }
}
