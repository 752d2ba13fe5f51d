//! The token model: a classified unit of raw input.

use std::fmt;

/// What a token was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The name of a sub-command. Tokenizing of the current command stops here.
    Command,
    /// An explicit argument name such as `--verbose` or `-v`.
    ArgumentName,
    /// A bundle of single-character names such as `-xvf`. The first
    /// character is the prefix and is dropped before lookup.
    ArgumentNameList,
    /// A plain value.
    ArgumentValue,
    /// Opening tuple delimiter.
    TupleStart,
    /// Closing tuple delimiter.
    TupleEnd,
    /// Raw input following the forward marker (`--`). Never interpreted.
    ForwardValue,
}

impl TokenKind {
    /// Returns `true` for tokens that introduce an argument.
    pub fn is_argument_specifier(self) -> bool {
        matches!(self, TokenKind::ArgumentName | TokenKind::ArgumentNameList)
    }

    /// Returns `true` for tuple delimiters.
    pub fn is_tuple(self) -> bool {
        matches!(self, TokenKind::TupleStart | TokenKind::TupleEnd)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Command => "command",
            TokenKind::ArgumentName => "argument name",
            TokenKind::ArgumentNameList => "argument name list",
            TokenKind::ArgumentValue => "value",
            TokenKind::TupleStart => "tuple start",
            TokenKind::TupleEnd => "tuple end",
            TokenKind::ForwardValue => "forward value",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified piece of input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
