//! Parser: assigns one command's tokens to its arguments.
//!
//! The parser walks the token list once with a single forward index. Every
//! iteration moves the index forward by at least one token, so each token is
//! visited exactly once.
//!
//! Values are handed to the argument types as they are found. Checks that
//! need the whole input (usage counts, required arguments, exclusive groups)
//! run later in [`finish`], once every command of the tree has been parsed.

use crate::argument::{Argument, ArgumentGroup};
use crate::error::{ParseError, ParseErrorKind};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Parser output for one command.
#[derive(Debug, Default)]
pub(crate) struct ParserState {
    pub(crate) errors: Vec<ParseError>,
    /// Texts of the command's forward values, in input order.
    pub(crate) forward: Vec<String>,
    pub(crate) finished: bool,
    /// Final value per argument, filled once by [`finish`].
    pub(crate) parsed: Option<Vec<Option<Value>>>,
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    arguments: &'a mut [Argument],
    state: &'a mut ParserState,
    current_index: usize,
    in_tuple: bool,
    in_arg_name_list: bool,
    /// Cleared by the first argument specifier.
    filling_positionals: bool,
    positionals: Vec<usize>,
    next_positional: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        tokens: &'a [Token],
        arguments: &'a mut [Argument],
        state: &'a mut ParserState,
    ) -> Self {
        let positionals = arguments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_positional() && !a.value_count().is_zero())
            .map(|(i, _)| i)
            .collect();

        Self {
            tokens,
            arguments,
            state,
            current_index: 0,
            in_tuple: false,
            in_arg_name_list: false,
            filling_positionals: true,
            positionals,
            next_positional: 0,
        }
    }

    /// Consumes every token.
    ///
    /// # Panics
    ///
    /// Panics if this command was already parsed without a reset.
    pub(crate) fn parse_tokens(mut self) {
        assert!(
            !self.state.finished,
            "command was already parsed; reset the tree first"
        );

        let tokens = self.tokens;
        while self.current_index < tokens.len() {
            let start = self.current_index;
            let token = &tokens[start];

            match token.kind() {
                TokenKind::ArgumentName => {
                    self.filling_positionals = false;
                    self.current_index += 1;
                    match self.arguments.iter().position(|a| a.matches_word(token.text())) {
                        Some(arg) => self.execute_arg_parse(arg, start),
                        None => self.error(ParseErrorKind::UnmatchedToken, start),
                    }
                }
                TokenKind::ArgumentNameList => {
                    self.filling_positionals = false;
                    self.parse_arg_name_list();
                }
                TokenKind::ArgumentValue | TokenKind::TupleStart
                    if self.filling_positionals
                        && self.next_positional < self.positionals.len() =>
                {
                    let arg = self.positionals[self.next_positional];
                    self.next_positional += 1;
                    tracing::debug!(
                        argument = %self.arguments[arg].name(),
                        token_index = start,
                        "binding positional"
                    );
                    self.execute_arg_parse(arg, start);
                }
                TokenKind::ForwardValue => {
                    self.state.forward.push(token.text().to_string());
                    self.current_index += 1;
                }
                // A stray close was already reported by the tokenizer.
                TokenKind::TupleEnd => self.current_index += 1,
                _ => {
                    self.error(ParseErrorKind::UnmatchedToken, start);
                    self.current_index += 1;
                }
            }

            if self.current_index == start {
                self.error(ParseErrorKind::UnmatchedToken, start);
                self.current_index += 1;
            }
        }

        self.state.finished = true;
    }

    /// Collects the values of one occurrence of `arg`, starting at
    /// `current_index`. `anchor` is the token errors point at.
    fn execute_arg_parse(&mut self, arg: usize, anchor: usize) {
        let count = self.arguments[arg].value_count();

        if count.is_zero() {
            self.arguments[arg].parse_values(anchor, &[]);
            return;
        }

        let first = self.current_index;
        let starts_tuple = self
            .tokens
            .get(first)
            .is_some_and(|t| t.kind() == TokenKind::TupleStart);

        let values: Vec<String> = if starts_tuple {
            self.in_tuple = true;
            let mut index = first + 1;
            let mut values = Vec::new();
            while let Some(token) = self.tokens.get(index) {
                index += 1;
                if token.kind() == TokenKind::TupleEnd {
                    break;
                }
                values.push(token.text().to_string());
            }
            self.current_index = index;
            values
        } else {
            let mut index = first;
            let mut values = Vec::new();
            while let Some(token) = self.tokens.get(index) {
                if token.kind() != TokenKind::ArgumentValue || count.is_full(values.len()) {
                    break;
                }
                values.push(token.text().to_string());
                index += 1;
            }
            self.current_index = index;
            values
        };

        if count.contains(values.len()) {
            let value_index = if starts_tuple { first + 1 } else { first };
            self.arguments[arg].parse_values(value_index, &values);
        } else {
            let error = self
                .make_error(ParseErrorKind::IncorrectValueCount { expected: count }, anchor)
                .argument(arg)
                .value_count(values.len());
            self.push_error(error);
        }

        self.in_tuple = false;
    }

    /// Resolves a bundle such as `-xvf` or `-nVALUE`.
    fn parse_arg_name_list(&mut self) {
        let tokens = self.tokens;
        let index = self.current_index;
        let text = tokens[index].text();
        self.current_index += 1;

        let mut chars = text.chars();
        let Some(prefix) = chars.next() else {
            return;
        };
        let rest = chars.as_str();

        self.in_arg_name_list = true;
        for (offset, c) in rest.char_indices() {
            let Some(arg) = self
                .arguments
                .iter()
                .position(|a| a.matches_short(prefix, c))
            else {
                self.error(ParseErrorKind::UnmatchedInArgNameList { name: c }, index);
                break;
            };

            let count = self.arguments[arg].value_count();
            if count.is_zero() {
                self.arguments[arg].parse_values(index, &[]);
                continue;
            }

            let remainder = &rest[offset + c.len_utf8()..];
            if remainder.is_empty() {
                self.execute_arg_parse(arg, index);
            } else if count.min() > 1 {
                let error = self
                    .make_error(ParseErrorKind::IncorrectValueCount { expected: count }, index)
                    .argument(arg)
                    .value_count(1);
                self.push_error(error);
            } else {
                self.arguments[arg].parse_values(index, &[remainder.to_string()]);
            }
            break;
        }
        self.in_arg_name_list = false;
    }

    fn make_error(&self, kind: ParseErrorKind, token_index: usize) -> ParseError {
        let mut error = ParseError::new(kind, token_index);
        error.in_tuple = self.in_tuple;
        error.in_arg_name_list = self.in_arg_name_list;
        error
    }

    fn error(&mut self, kind: ParseErrorKind, token_index: usize) {
        let error = self.make_error(kind, token_index);
        self.push_error(error);
    }

    fn push_error(&mut self, error: ParseError) {
        tracing::debug!(kind = ?error.kind, token_index = error.token_index, "parse error");
        self.state.errors.push(error);
    }
}

/// Runs the whole-input checks and caches every argument's final value.
///
/// Does nothing when the values are already cached. `unique_used` tells
/// whether any unique argument of the tree was given, which lifts the
/// required checks.
pub(crate) fn finish(
    arguments: &[Argument],
    groups: &[ArgumentGroup],
    state: &mut ParserState,
    unique_used: bool,
) {
    if state.parsed.is_some() {
        return;
    }

    for (i, arg) in arguments.iter().enumerate() {
        let already_failed = state.errors.iter().any(|e| e.argument == Some(i));
        if already_failed {
            continue;
        }

        let used = arg.usage_count();
        let allowed = arg.argument_type().usage_count();
        let anchor = arg.state.last_token_index.unwrap_or(0);

        if used > 0 && !allowed.contains(used) {
            state.errors.push(
                ParseError::new(ParseErrorKind::IncorrectUsageCount { expected: allowed }, anchor)
                    .argument(i)
                    .value_count(used),
            );
        } else if used == 0 && arg.is_required() && !unique_used {
            state.errors.push(
                ParseError::new(ParseErrorKind::RequiredArgumentNotUsed, anchor).argument(i),
            );
        }
    }

    for group in groups.iter().filter(|g| g.is_exclusive()) {
        let used: Vec<usize> = group
            .members()
            .iter()
            .copied()
            .filter(|&i| arguments[i].usage_count() > 0)
            .collect();
        if let [_, second, ..] = used.as_slice() {
            let anchor = arguments[*second].state.last_token_index.unwrap_or(0);
            state.errors.push(
                ParseError::new(
                    ParseErrorKind::MultipleArgsInExclusiveGroup {
                        group: group.name().to_string(),
                    },
                    anchor,
                )
                .argument(*second)
                .value_count(used.len()),
            );
        }
    }

    state.parsed = Some(arguments.iter().map(Argument::final_value).collect());
}
