//! Human-readable error reports.
//!
//! [`CommandTree::diagnostics`] flattens every displayable error of the
//! reached commands into [`Diagnostic`]s. [`ErrorFormatter`] renders them,
//! echoing the input and underlining the token each error points at:
//!
//! ```text
//! error: unmatched token 'zzz'
//!   app --flag zzz
//!              ^^^
//! ```

use console::Style;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::command::CommandId;
use crate::error::{ErrorLevel, ParseErrorKind};
use crate::token::Token;
use crate::tokenizer::FORWARD_MARKER;
use crate::tree::CommandTree;

/// One displayable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    /// Command names from the root to the command that recorded the error.
    pub command_path: Vec<String>,
    pub message: String,
    /// Index into [`CommandTree::full_token_list`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_index: Option<usize>,
}

impl CommandTree {
    /// Errors of every reached command that meet its minimum display level,
    /// root first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for id in self.reached_path() {
            collect(self, id, &mut out);
        }
        out
    }
}

fn collect(tree: &CommandTree, id: CommandId, out: &mut Vec<Diagnostic>) {
    let minimum = tree.config(id).min_display_level();
    let offset = tree.token_offset(id).unwrap_or(0);
    let tokens = tree.tokens(id);
    let path: Vec<String> = tree
        .command_path(id)
        .into_iter()
        .map(String::from)
        .collect();
    let at = |index: usize| (index < tokens.len()).then_some(offset + index);

    let mut push = |level: ErrorLevel, message: String, token_index: Option<usize>| {
        if level.is_in_minimum(minimum) {
            out.push(Diagnostic {
                level,
                command_path: path.clone(),
                message,
                token_index,
            });
        }
    };

    for error in tree.tokenize_errors(id) {
        let message = match tokens.get(error.token_index) {
            Some(token) => format!("{} at '{}'", error.kind, token.text()),
            None => error.kind.to_string(),
        };
        push(error.level, message, at(error.token_index));
    }

    let arguments = tree.arguments(id);
    for error in tree.parse_errors(id) {
        let argument = error.argument.map(|i| arguments[i].name());
        let token = tokens.get(error.token_index).map(Token::text);
        let index = match error.kind {
            ParseErrorKind::RequiredArgumentNotUsed => None,
            _ => at(error.token_index),
        };
        push(error.level, error.message(argument, token), index);
    }

    for argument in arguments {
        for error in argument.errors() {
            push(
                error.level,
                format!("argument '{}': {}", argument.name(), error.message),
                error.token_index.and_then(at),
            );
        }
    }

    for error in tree.custom_errors(id) {
        push(
            error.level,
            error.message.clone(),
            error.token_index.and_then(at),
        );
    }
}

/// Renders diagnostics as text.
#[derive(Debug, Clone, Default)]
pub struct ErrorFormatter {
    styled: Option<bool>,
}

impl ErrorFormatter {
    /// Styles output when the terminal supports it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces styling on or off.
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = Some(styled);
        self
    }

    fn style(&self, style: Style) -> Style {
        match self.styled {
            Some(forced) => style.force_styling(forced),
            None => style,
        }
    }

    fn level_style(&self, level: ErrorLevel) -> Style {
        let style = match level {
            ErrorLevel::Error => Style::new().red().bold(),
            ErrorLevel::Warning => Style::new().yellow().bold(),
            ErrorLevel::Info => Style::new().blue(),
            ErrorLevel::Debug => Style::new().dim(),
        };
        self.style(style)
    }

    /// Renders every diagnostic of `tree`, one block each.
    pub fn render(&self, tree: &CommandTree) -> String {
        let tokens = tree.full_token_list();
        let marker = tree.forward_marker_index();
        let program = tree.command(tree.root()).name();
        tree.diagnostics()
            .iter()
            .map(|d| self.render_line(d, program, &tokens, marker))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders one diagnostic. The input line is shown only when the
    /// diagnostic points at a token.
    pub fn render_one(&self, diagnostic: &Diagnostic, program: &str, tokens: &[Token]) -> String {
        self.render_line(diagnostic, program, tokens, None)
    }

    /// Like [`render_one`](Self::render_one), echoing the forward marker
    /// before the token at `marker`.
    fn render_line(
        &self,
        diagnostic: &Diagnostic,
        program: &str,
        tokens: &[Token],
        marker: Option<usize>,
    ) -> String {
        let level = self.level_style(diagnostic.level);
        let mut out = format!(
            "{}: {}\n",
            level.apply_to(diagnostic.level.as_str()),
            diagnostic.message
        );

        if let Some(index) = diagnostic.token_index.filter(|&i| i < tokens.len()) {
            let mut line = String::from(program);
            let mut column = 0;
            let mut width = 0;
            for (i, token) in tokens.iter().enumerate() {
                if marker == Some(i) {
                    line.push(' ');
                    line.push_str(FORWARD_MARKER);
                }
                line.push(' ');
                if i == index {
                    column = line.width();
                    width = token.text().width().max(1);
                }
                line.push_str(token.text());
            }
            if marker == Some(tokens.len()) {
                line.push(' ');
                line.push_str(FORWARD_MARKER);
            }

            let marker = self.style(Style::new().dim()).apply_to(&line);
            let underline = format!("{}{}", " ".repeat(column), "^".repeat(width));
            out.push_str(&format!("  {marker}\n  {}\n", level.apply_to(underline)));
        }
        out
    }
}
