//! Tokenizer: classifies one command's slice of raw input.
//!
//! Classification order for each word:
//!
//! 1. after the forward marker `--` → [`TokenKind::ForwardValue`]
//! 2. inside an open tuple → [`TokenKind::ArgumentValue`] (until the close)
//! 3. an argument name (`--name`, `-name`) → [`TokenKind::ArgumentName`]
//! 4. prefix + a single-character argument name → [`TokenKind::ArgumentNameList`]
//! 5. a sub-command name → [`TokenKind::Command`], and the rest of the words
//!    belong to that sub-command
//! 6. tuple delimiters → [`TokenKind::TupleStart`] / [`TokenKind::TupleEnd`]
//! 7. anything else → [`TokenKind::ArgumentValue`]
//!
//! Every word is classified. Tuple misuse is recorded as a
//! [`TokenizeError`] and tokenization carries on.

use crate::argument::Argument;
use crate::command::CommandId;
use crate::config::TupleChars;
use crate::error::{TokenizeError, TokenizeErrorKind};
use crate::token::{Token, TokenKind};

/// The forward marker: everything after it is passed through untouched.
pub const FORWARD_MARKER: &str = "--";

/// Tokenizer output for one command.
#[derive(Debug, Default)]
pub(crate) struct TokenizerState {
    pub(crate) tokens: Vec<Token>,
    pub(crate) errors: Vec<TokenizeError>,
    /// The sub-command whose name ended this command's slice.
    pub(crate) sub_command: Option<CommandId>,
    /// Index of the first token after the forward marker, if one was seen.
    pub(crate) forward_marker: Option<usize>,
    pub(crate) finished: bool,
}

/// Where tokenizing should continue after a command's slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handoff {
    pub(crate) command: CommandId,
    /// Index of the first word that belongs to `command`.
    pub(crate) next_word: usize,
}

pub(crate) struct Tokenizer<'a> {
    arguments: &'a [Argument],
    sub_commands: &'a [(CommandId, Vec<String>)],
    tuple_chars: TupleChars,
    state: &'a mut TokenizerState,
    tuple_open: bool,
    forwarding: bool,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(
        arguments: &'a [Argument],
        sub_commands: &'a [(CommandId, Vec<String>)],
        tuple_chars: TupleChars,
        state: &'a mut TokenizerState,
    ) -> Self {
        Self {
            arguments,
            sub_commands,
            tuple_chars,
            state,
            tuple_open: false,
            forwarding: false,
        }
    }

    /// Classifies `words` until they run out or a sub-command name is met.
    ///
    /// # Panics
    ///
    /// Panics if this command was already tokenized without a reset.
    pub(crate) fn tokenize(mut self, words: &[String]) -> Option<Handoff> {
        assert!(
            !self.state.finished,
            "command was already tokenized; reset the tree first"
        );

        let mut handoff = None;
        for (i, word) in words.iter().enumerate() {
            if let Some(command) = self.classify(word) {
                tracing::debug!(word = %word, next_word = i + 1, "sub-command matched");
                self.state.sub_command = Some(command);
                handoff = Some(Handoff {
                    command,
                    next_word: i + 1,
                });
                break;
            }
        }

        if self.tuple_open {
            let index = self.state.tokens.len().saturating_sub(1);
            self.error(TokenizeErrorKind::TupleNotClosed, index);
        }

        self.state.finished = true;
        handoff
    }

    /// Classifies one word. Returns the sub-command it names, if any.
    fn classify(&mut self, word: &str) -> Option<CommandId> {
        if self.forwarding {
            self.push(TokenKind::ForwardValue, word);
            return None;
        }

        if self.tuple_open {
            self.classify_in_tuple(word);
            return None;
        }

        if word == FORWARD_MARKER {
            self.forwarding = true;
            self.state.forward_marker = Some(self.state.tokens.len());
            return None;
        }

        if self.arguments.iter().any(|a| a.matches_word(word)) {
            self.push(TokenKind::ArgumentName, word);
            return None;
        }

        if self.is_name_list(word) {
            self.push(TokenKind::ArgumentNameList, word);
            return None;
        }

        if let Some(command) = self.find_sub_command(word) {
            return Some(command);
        }

        self.classify_tuple_or_value(word);
        None
    }

    fn classify_in_tuple(&mut self, word: &str) {
        let open = self.tuple_chars.open();
        let close = self.tuple_chars.close();

        if word.len() == 1 && word.starts_with(close) {
            self.push(TokenKind::TupleEnd, word);
            self.tuple_open = false;
        } else if word.starts_with(open) {
            let index = self.state.tokens.len();
            self.error(TokenizeErrorKind::TupleAlreadyOpen, index);
            self.push(TokenKind::ArgumentValue, word);
        } else if let Some(inner) = word.strip_suffix(close) {
            self.push(TokenKind::ArgumentValue, inner);
            self.push(TokenKind::TupleEnd, &word[inner.len()..]);
            self.tuple_open = false;
        } else {
            self.push(TokenKind::ArgumentValue, word);
        }
    }

    fn classify_tuple_or_value(&mut self, word: &str) {
        let open = self.tuple_chars.open();
        let close = self.tuple_chars.close();

        if word.len() == 1 && word.starts_with(close) {
            let index = self.state.tokens.len();
            self.error(TokenizeErrorKind::UnexpectedTupleClose, index);
            self.push(TokenKind::TupleEnd, word);
            return;
        }

        let Some(inner) = word.strip_prefix(open) else {
            self.push(TokenKind::ArgumentValue, word);
            return;
        };

        self.push(TokenKind::TupleStart, &word[..open.len_utf8()]);
        self.tuple_open = true;
        if !inner.is_empty() {
            self.classify_in_tuple(inner);
        }
    }

    /// A name list needs a prefix followed by at least one resolvable
    /// single-character name. Later characters are resolved by the parser,
    /// which may take them as an inline value.
    fn is_name_list(&self, word: &str) -> bool {
        let mut chars = word.chars();
        let (Some(prefix), Some(first)) = (chars.next(), chars.next()) else {
            return false;
        };
        self.arguments
            .iter()
            .any(|a| a.matches_short(prefix, first))
    }

    fn find_sub_command(&self, word: &str) -> Option<CommandId> {
        self.sub_commands
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == word))
            .map(|(id, _)| *id)
    }

    fn push(&mut self, kind: TokenKind, text: &str) {
        tracing::trace!(%kind, text, "token");
        self.state.tokens.push(Token::new(kind, text));
    }

    fn error(&mut self, kind: TokenizeErrorKind, token_index: usize) {
        tracing::debug!(%kind, token_index, "tokenize error");
        self.state.errors.push(TokenizeError::new(kind, token_index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn arguments() -> Vec<Argument> {
        vec![
            Argument::new("flag", types::Flag).alias("f"),
            Argument::new("x", types::Flag),
            Argument::new("y", types::TextList::default()),
            Argument::new("plus", types::Flag).alias("p").prefix('+'),
        ]
    }

    fn words(input: &str) -> Vec<String> {
        input.split_whitespace().map(String::from).collect()
    }

    fn tokenize(input: &str) -> (TokenizerState, Option<Handoff>) {
        tokenize_with(input, &[], TupleChars::SquareBrackets)
    }

    fn tokenize_with(
        input: &str,
        subs: &[(CommandId, Vec<String>)],
        chars: TupleChars,
    ) -> (TokenizerState, Option<Handoff>) {
        let args = arguments();
        let mut state = TokenizerState::default();
        let handoff = Tokenizer::new(&args, subs, chars, &mut state).tokenize(&words(input));
        (state, handoff)
    }

    fn kinds(state: &TokenizerState) -> Vec<TokenKind> {
        state.tokens.iter().map(Token::kind).collect()
    }

    fn texts(state: &TokenizerState) -> Vec<&str> {
        state.tokens.iter().map(Token::text).collect()
    }

    // ==================== Classification ====================

    mod classification {
        use super::*;

        #[test]
        fn empty_input_finishes() {
            let (state, handoff) = tokenize("");
            assert!(state.tokens.is_empty());
            assert!(state.finished);
            assert_eq!(handoff, None);
        }

        #[test]
        fn long_and_short_names() {
            let (state, _) = tokenize("--flag -f -flag");
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentName; 3]);
        }

        #[test]
        fn name_list_needs_resolvable_first_char() {
            let (state, _) = tokenize("-xy -yVALUE -qx");
            assert_eq!(
                kinds(&state),
                vec![
                    TokenKind::ArgumentNameList,
                    TokenKind::ArgumentNameList,
                    TokenKind::ArgumentValue,
                ]
            );
        }

        #[test]
        fn name_list_respects_prefix() {
            let (state, _) = tokenize("+p -p +x");
            assert_eq!(
                kinds(&state),
                vec![
                    TokenKind::ArgumentName,
                    TokenKind::ArgumentValue,
                    TokenKind::ArgumentValue,
                ]
            );
        }

        #[test]
        fn plain_values() {
            let (state, _) = tokenize("hello -5 world");
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentValue; 3]);
            assert_eq!(texts(&state), vec!["hello", "-5", "world"]);
        }
    }

    // ==================== Forward values ====================

    mod forward {
        use super::*;

        #[test]
        fn marker_forwards_everything_after_it() {
            let (state, _) = tokenize("--flag -- --flag -x [a");
            assert_eq!(
                kinds(&state),
                vec![
                    TokenKind::ArgumentName,
                    TokenKind::ForwardValue,
                    TokenKind::ForwardValue,
                    TokenKind::ForwardValue,
                ]
            );
            assert!(state.errors.is_empty());
            assert_eq!(state.forward_marker, Some(1));
        }

        #[test]
        fn marker_position_without_marker() {
            let (state, _) = tokenize("--flag a");
            assert_eq!(state.forward_marker, None);
        }

        #[test]
        fn forwarded_command_names_stay_values() {
            let subs = vec![(CommandId(1), vec!["run".to_string()])];
            let (state, handoff) =
                tokenize_with("-- run", &subs, TupleChars::SquareBrackets);
            assert_eq!(handoff, None);
            assert_eq!(kinds(&state), vec![TokenKind::ForwardValue]);
        }
    }

    // ==================== Tuples ====================

    mod tuples {
        use super::*;

        #[test]
        fn separate_delimiters() {
            let (state, _) = tokenize("[ a b ]");
            assert_eq!(
                kinds(&state),
                vec![
                    TokenKind::TupleStart,
                    TokenKind::ArgumentValue,
                    TokenKind::ArgumentValue,
                    TokenKind::TupleEnd,
                ]
            );
        }

        #[test]
        fn attached_delimiters_are_split() {
            let (state, _) = tokenize("[a b c]");
            assert_eq!(texts(&state), vec!["[", "a", "b", "c", "]"]);
            assert_eq!(kinds(&state)[0], TokenKind::TupleStart);
            assert_eq!(kinds(&state)[4], TokenKind::TupleEnd);
        }

        #[test]
        fn single_word_tuple() {
            let (state, _) = tokenize("[a]");
            assert_eq!(texts(&state), vec!["[", "a", "]"]);
        }

        #[test]
        fn names_inside_tuple_are_values() {
            let (state, _) = tokenize("[--flag -x]");
            assert_eq!(
                kinds(&state),
                vec![
                    TokenKind::TupleStart,
                    TokenKind::ArgumentValue,
                    TokenKind::ArgumentValue,
                    TokenKind::TupleEnd,
                ]
            );
        }

        #[test]
        fn custom_tuple_chars() {
            let (state, _) = tokenize_with("(a b)", &[], TupleChars::Parentheses);
            assert_eq!(texts(&state), vec!["(", "a", "b", ")"]);
            let (state, _) = tokenize_with("[a]", &[], TupleChars::Parentheses);
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentValue]);
        }

        #[test]
        fn unclosed_tuple_is_reported() {
            let (state, _) = tokenize("[a b");
            assert_eq!(state.errors.len(), 1);
            assert_eq!(state.errors[0].kind, TokenizeErrorKind::TupleNotClosed);
            assert_eq!(state.errors[0].token_index, 2);
        }

        #[test]
        fn nested_open_is_reported() {
            let (state, _) = tokenize("[a [b ]");
            assert_eq!(state.errors[0].kind, TokenizeErrorKind::TupleAlreadyOpen);
            assert_eq!(state.errors[0].token_index, 2);
            assert_eq!(texts(&state), vec!["[", "a", "[b", "]"]);
        }

        #[test]
        fn stray_close_is_reported() {
            let (state, _) = tokenize("a ]");
            assert_eq!(state.errors[0].kind, TokenizeErrorKind::UnexpectedTupleClose);
            assert_eq!(state.errors[0].token_index, 1);
            assert_eq!(kinds(&state)[1], TokenKind::TupleEnd);
        }

        #[test]
        fn trailing_bracket_outside_tuple_is_literal() {
            let (state, _) = tokenize("a]");
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentValue]);
            assert!(state.errors.is_empty());
        }
    }

    // ==================== Sub-commands ====================

    mod sub_commands {
        use super::*;

        #[test]
        fn command_name_hands_off_rest() {
            let subs = vec![(CommandId(3), vec!["build".to_string(), "b".to_string()])];
            let (state, handoff) =
                tokenize_with("--flag b --release", &subs, TupleChars::SquareBrackets);
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentName]);
            assert_eq!(
                handoff,
                Some(Handoff {
                    command: CommandId(3),
                    next_word: 2,
                })
            );
            assert_eq!(state.sub_command, Some(CommandId(3)));
        }

        #[test]
        fn argument_names_win_over_commands() {
            let subs = vec![(CommandId(1), vec!["--flag".to_string()])];
            let (state, handoff) =
                tokenize_with("--flag", &subs, TupleChars::SquareBrackets);
            assert_eq!(handoff, None);
            assert_eq!(kinds(&state), vec![TokenKind::ArgumentName]);
        }

        #[test]
        fn command_names_inside_tuples_are_values() {
            let subs = vec![(CommandId(1), vec!["run".to_string()])];
            let (state, handoff) =
                tokenize_with("[run]", &subs, TupleChars::SquareBrackets);
            assert_eq!(handoff, None);
            assert_eq!(texts(&state), vec!["[", "run", "]"]);
        }
    }

    #[test]
    #[should_panic(expected = "already tokenized")]
    fn tokenizing_twice_panics() {
        let args = arguments();
        let mut state = TokenizerState::default();
        Tokenizer::new(&args, &[], TupleChars::default(), &mut state).tokenize(&[]);
        Tokenizer::new(&args, &[], TupleChars::default(), &mut state).tokenize(&[]);
    }
}
