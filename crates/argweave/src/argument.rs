//! Arguments and the argument-type contract.
//!
//! An [`Argument`] is a definition (names, prefix, flags, type) plus the
//! runtime state one parse pass accumulates on it. The state is cleared by
//! [`CommandTree::reset`](crate::CommandTree::reset).

use std::fmt;
use std::rc::Rc;

use crate::error::{any_in_minimum, BuildError, ConversionError, CustomError, ErrorLevel, Result};
use crate::range::ValueCount;
use crate::value::Value;

/// Converts raw text into a [`Value`].
///
/// Implementations declare how many values one occurrence takes
/// ([`value_count`](Self::value_count)) and how many occurrences are
/// allowed ([`usage_count`](Self::usage_count)). [`parse`](Self::parse) is
/// called once per occurrence.
///
/// # Example
///
/// ```
/// use argweave::{ArgumentType, ConversionError, ParseContext, Value, ValueCount};
///
/// struct Port;
///
/// impl ArgumentType for Port {
///     fn name(&self) -> &str {
///         "port"
///     }
///
///     fn value_count(&self) -> ValueCount {
///         ValueCount::ONE
///     }
///
///     fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
///         match values[0].parse::<u16>() {
///             Ok(port) => Ok(Value::Int(port.into())),
///             Err(_) => Err(ConversionError::new(format!("invalid port: '{}'", values[0]))),
///         }
///     }
/// }
/// ```
pub trait ArgumentType {
    /// Short name shown in messages and synopses.
    fn name(&self) -> &str;

    /// How many values one occurrence takes.
    fn value_count(&self) -> ValueCount;

    /// How many times the argument may be used. Defaults to exactly once.
    fn usage_count(&self) -> ValueCount {
        ValueCount::ONE
    }

    /// Value reported when the argument is never used.
    fn initial_value(&self) -> Option<Value> {
        None
    }

    /// Converts the values of one occurrence.
    ///
    /// `values` holds exactly as many items as the parser collected, always
    /// within [`value_count`](Self::value_count). Non-fatal problems can be
    /// reported through `cx` while still returning a value.
    fn parse(&self, values: &[String], cx: &mut ParseContext<'_>)
        -> Result<Value, ConversionError>;

    /// Types this one delegates to, for composite types.
    fn sub_types(&self) -> Vec<&dyn ArgumentType> {
        Vec::new()
    }
}

/// State handed to [`ArgumentType::parse`].
pub struct ParseContext<'a> {
    previous: Option<&'a Value>,
    reports: &'a mut Vec<CustomError>,
    token_index: usize,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(
        previous: Option<&'a Value>,
        reports: &'a mut Vec<CustomError>,
        token_index: usize,
    ) -> Self {
        Self {
            previous,
            reports,
            token_index,
        }
    }

    /// Value produced by the previous occurrence of the argument, if any.
    pub fn previous(&self) -> Option<&Value> {
        self.previous
    }

    /// Index of the first value token of this occurrence.
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Records a non-fatal problem without failing the conversion.
    pub fn report(&mut self, message: impl Into<String>, level: ErrorLevel) {
        self.reports
            .push(CustomError::new(message, level).at(self.token_index));
    }

    /// Records the error of a nested type and carries on.
    pub fn report_error(&mut self, error: ConversionError) {
        self.reports.push(CustomError::from(error).at(self.token_index));
    }
}

/// Callback receiving an argument's final value.
pub type ValueCallback = Rc<dyn Fn(&Value)>;

/// Callback receiving an argument that has errors.
pub type ArgumentErrorCallback = Rc<dyn Fn(&Argument)>;

#[derive(Debug, Default)]
pub(crate) struct ArgState {
    pub(crate) usage_count: usize,
    pub(crate) value: Option<Value>,
    pub(crate) errors: Vec<CustomError>,
    pub(crate) last_token_index: Option<usize>,
}

/// An argument definition and its parse state.
///
/// Names are given without prefix. With the default `-` prefix an argument
/// named `verbose` matches `--verbose` and `-verbose`; single-character
/// names can also be bundled (`-vx`).
///
/// ```
/// use argweave::{types, Argument};
///
/// let arg = Argument::new("output", types::Text)
///     .alias("o")
///     .required()
///     .description("Where to write");
/// assert_eq!(arg.name(), "output");
/// assert!(arg.has_name("o"));
/// ```
pub struct Argument {
    names: Vec<String>,
    prefix: char,
    positional: bool,
    required: bool,
    unique: bool,
    priority: i32,
    description: Option<String>,
    ty: Box<dyn ArgumentType>,
    default: Option<Value>,
    pub(crate) group: Option<usize>,
    on_value: Option<ValueCallback>,
    on_error: Option<ArgumentErrorCallback>,
    pub(crate) state: ArgState,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: impl ArgumentType + 'static) -> Self {
        Self {
            names: vec![name.into()],
            prefix: '-',
            positional: false,
            required: false,
            unique: false,
            priority: 0,
            description: None,
            ty: Box::new(ty),
            default: None,
            group: None,
            on_value: None,
            on_error: None,
            state: ArgState::default(),
        }
    }

    /// Adds another name.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Binds the argument by position when values appear before any name.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// When a unique argument receives a value, required arguments of the
    /// whole tree stop being required (e.g. `--help`).
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Higher priorities run their callbacks first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Value used when the argument is never given.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn on_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        self.on_value = Some(Rc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Argument) + 'static,
    {
        self.on_error = Some(Rc::new(f));
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The first name.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn prefix_char(&self) -> char {
        self.prefix
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn get_priority(&self) -> i32 {
        self.priority
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn argument_type(&self) -> &dyn ArgumentType {
        self.ty.as_ref()
    }

    pub fn value_count(&self) -> ValueCount {
        self.ty.value_count()
    }

    /// Type name for synopses, with nested types of composite types:
    /// `key-values<integer>`.
    pub fn type_signature(&self) -> String {
        type_signature(self.ty.as_ref())
    }

    /// Times the argument was used in the current parse.
    pub fn usage_count(&self) -> usize {
        self.state.usage_count
    }

    /// Conversion errors of the current parse.
    pub fn errors(&self) -> &[CustomError] {
        &self.state.errors
    }

    pub fn has_errors(&self, minimum: ErrorLevel) -> bool {
        any_in_minimum(&self.state.errors, minimum)
    }

    /// `--name` or `-name` (prefix doubled or single) matches.
    pub(crate) fn matches_word(&self, word: &str) -> bool {
        let Some(rest) = word.strip_prefix(self.prefix) else {
            return false;
        };
        let rest = rest.strip_prefix(self.prefix).unwrap_or(rest);
        self.has_name(rest)
    }

    /// Single-character name usable in name lists.
    pub(crate) fn matches_short(&self, prefix: char, c: char) -> bool {
        self.prefix == prefix && self.names.iter().any(|n| n.chars().eq(std::iter::once(c)))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for name in &self.names {
            validate_name(name)?;
        }
        if self.prefix.is_alphanumeric() || self.prefix.is_whitespace() {
            return Err(BuildError::InvalidName {
                name: self.prefix.to_string(),
                reason: "prefix must be a symbol",
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Parse state
    // ------------------------------------------------------------------

    /// Runs one occurrence through the type.
    pub(crate) fn parse_values(&mut self, token_index: usize, values: &[String]) {
        self.state.usage_count += 1;
        self.state.last_token_index = Some(token_index);

        let ArgState { value, errors, .. } = &mut self.state;
        let mut cx = ParseContext::new(value.as_ref(), errors, token_index);
        match self.ty.parse(values, &mut cx) {
            Ok(parsed) => {
                tracing::trace!(argument = %self.names[0], ?parsed, "converted values");
                *value = Some(parsed);
            }
            Err(err) => {
                tracing::debug!(argument = %self.names[0], error = %err, "conversion failed");
                errors.push(CustomError::from(err).at(token_index));
            }
        }
    }

    /// The value the argument ends the parse with.
    pub(crate) fn final_value(&self) -> Option<Value> {
        if self.state.usage_count > 0 {
            if let Some(value) = &self.state.value {
                return Some(value.clone());
            }
        }
        self.default.clone().or_else(|| self.ty.initial_value())
    }

    pub(crate) fn value_callback(&self) -> Option<&ValueCallback> {
        self.on_value.as_ref()
    }

    pub(crate) fn error_callback(&self) -> Option<&ArgumentErrorCallback> {
        self.on_error.as_ref()
    }

    pub(crate) fn reset(&mut self) {
        self.state = ArgState::default();
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("names", &self.names)
            .field("prefix", &self.prefix)
            .field("type", &self.ty.name())
            .field("positional", &self.positional)
            .field("required", &self.required)
            .field("priority", &self.priority)
            .field("usage_count", &self.state.usage_count)
            .finish()
    }
}

/// Orders argument indices by descending priority, keeping declaration
/// order among equals.
pub(crate) fn sort_by_priority(arguments: &[Argument]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..arguments.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(arguments[i].priority));
    order
}

/// Checks a command, argument or group name.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(BuildError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name cannot be empty");
    }
    if name.starts_with(['-', '+', '/']) {
        return invalid("name cannot start with a prefix character");
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return invalid("only letters, digits, '-' and '_' are allowed");
    }
    Ok(())
}

/// A named set of arguments of one command.
///
/// In an exclusive group at most one member may be used.
#[derive(Debug, Clone)]
pub struct ArgumentGroup {
    name: String,
    exclusive: bool,
    members: Vec<String>,
    pub(crate) resolved: Vec<usize>,
}

impl ArgumentGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exclusive: false,
            members: Vec::new(),
            resolved: Vec::new(),
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Adds an argument, by any of its names.
    pub fn argument(mut self, name: impl Into<String>) -> Self {
        self.members.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub(crate) fn member_names(&self) -> &[String] {
        &self.members
    }

    /// Indices of the member arguments within the command.
    pub fn members(&self) -> &[usize] {
        &self.resolved
    }
}

fn type_signature(ty: &dyn ArgumentType) -> String {
    let nested = ty.sub_types();
    if nested.is_empty() {
        return ty.name().to_string();
    }
    let inner: Vec<String> = nested.into_iter().map(type_signature).collect();
    format!("{}<{}>", ty.name(), inner.join(", "))
}
