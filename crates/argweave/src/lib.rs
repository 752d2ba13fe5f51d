//! Argweave - command-line argument tokenizer and parser.
//!
//! Argweave turns raw command-line words into typed values for a tree of
//! commands. It does not stop at the first mistake: every problem is
//! recorded with a severity on the command that saw it, and the tree decides
//! afterwards whether the input failed and which exit code results.
//!
//! # Quick Start
//!
//! ```rust
//! use argweave::{types, Argument, Command, CommandTree, ValueCount};
//!
//! let mut tree = CommandTree::new(Command::new("cmd")).unwrap();
//! let root = tree.root();
//! tree.add_argument(root, Argument::new("flag", types::Flag)).unwrap();
//! tree.add_argument(root, Argument::new("x", types::Flag)).unwrap();
//! tree.add_argument(root, Argument::new("y", types::TextList::new(ValueCount::between(1, 2)))).unwrap();
//! tree.add_argument(root, Argument::new("input", types::Text).positional()).unwrap();
//!
//! let outcome = tree.parse(["pos1", "--flag", "-xy", "value1", "value2"]).unwrap();
//! assert!(outcome.is_success());
//! assert_eq!(outcome.parsed.get::<bool>("flag"), Some(true));
//! assert_eq!(outcome.parsed.get::<Vec<String>>("y"), Some(vec!["value1".into(), "value2".into()]));
//! assert_eq!(outcome.parsed.get::<String>("input").as_deref(), Some("pos1"));
//! ```
//!
//! # Input Syntax
//!
//! | Input | Meaning |
//! |-------|---------|
//! | `--name`, `-name` | argument by name (prefix configurable per argument) |
//! | `-abc` | bundled single-character arguments |
//! | `-nVALUE` | single-character argument with an inline value |
//! | `[a b c]` | tuple: every word up to the close is a value |
//! | `sub ...` | the rest of the input belongs to sub-command `sub` |
//! | `-- ...` | forward values, passed through untouched |
//! | anything else | value of the preceding argument, or a positional |
//!
//! # Errors
//!
//! Building a tree returns [`BuildError`] on misuse (duplicate or invalid
//! names, re-attached commands). Problems in the *input* are never returned
//! as `Err`; they are collected as [`TokenizeError`], [`ParseError`] or
//! [`CustomError`] and classified by [`ErrorLevel`]. See [`CommandTree`] for
//! how they roll up into an exit code, and [`ErrorFormatter`] to show them.

mod argument;
mod command;
mod config;
mod error;
mod parser;
mod range;
mod report;
mod result;
mod token;
mod tokenizer;
mod tree;
mod value;

pub mod types;

// Re-export public API
pub use argument::{
    Argument, ArgumentErrorCallback, ArgumentGroup, ArgumentType, ParseContext, ValueCallback,
};
pub use command::{Command, CommandCallback, CommandId};
pub use config::{CallbackPolicy, CommandConfig, ConfigOverrides, Setting, TupleChars};
pub use error::{
    BuildError, ConversionError, CustomError, ErrorLevel, Leveled, ParseError, ParseErrorKind,
    Result, TokenizeError, TokenizeErrorKind, TreeError,
};
pub use range::ValueCount;
pub use report::{Diagnostic, ErrorFormatter};
pub use result::{ParseOutcome, ParsedArguments};
pub use token::{Token, TokenKind};
pub use tokenizer::FORWARD_MARKER;
pub use tree::CommandTree;
pub use value::{FromValue, Value};
