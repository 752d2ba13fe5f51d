//! Built-in argument types.
//!
//! | Type | Values | Usages | Result |
//! |------|--------|--------|--------|
//! | [`Flag`] | 0 | 1 | `Bool` (`false` when unused) |
//! | [`Counter`] | 0 | 1+ | `Int` (usages, `0` when unused) |
//! | [`Text`] | 1 | 1 | `Text` |
//! | [`Int`] | 1 | 1 | `Int` |
//! | [`Float`] | 1 | 1 | `Float` |
//! | [`TextList`] | configurable | 1 | `List` of `Text` |
//! | [`OptList`] | 1 | 1 | `Text`, one of a fixed set |
//! | [`KeyValues`] | 1+ | 1 | `Map` of values parsed by a nested type |

use std::collections::BTreeMap;

use crate::argument::{ArgumentType, ParseContext};
use crate::error::{BuildError, ConversionError, ErrorLevel, Result};
use crate::range::ValueCount;
use crate::value::Value;

/// A boolean switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flag;

impl ArgumentType for Flag {
    fn name(&self) -> &str {
        "flag"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::NONE
    }

    fn initial_value(&self) -> Option<Value> {
        Some(Value::Bool(false))
    }

    fn parse(&self, _values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        Ok(Value::Bool(true))
    }
}

/// Counts how many times it is used (`-vvv`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Counter;

impl ArgumentType for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::NONE
    }

    fn usage_count(&self) -> ValueCount {
        ValueCount::AT_LEAST_ONE
    }

    fn initial_value(&self) -> Option<Value> {
        Some(Value::Int(0))
    }

    fn parse(&self, _values: &[String], cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        let previous = cx.previous().and_then(Value::as_int).unwrap_or(0);
        Ok(Value::Int(previous + 1))
    }
}

/// A single string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl ArgumentType for Text {
    fn name(&self) -> &str {
        "string"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::ONE
    }

    fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        Ok(Value::Text(values[0].clone()))
    }
}

/// A signed 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int;

impl ArgumentType for Int {
    fn name(&self) -> &str {
        "integer"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::ONE
    }

    fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        values[0]
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConversionError::new(format!("invalid integer value: '{}'", values[0])))
    }
}

/// A 64-bit float.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl ArgumentType for Float {
    fn name(&self) -> &str {
        "float"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::ONE
    }

    fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        values[0]
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConversionError::new(format!("invalid float value: '{}'", values[0])))
    }
}

/// Several strings, within a configurable range.
#[derive(Debug, Clone, Copy)]
pub struct TextList {
    range: ValueCount,
}

impl TextList {
    pub fn new(range: ValueCount) -> Self {
        Self { range }
    }
}

impl Default for TextList {
    fn default() -> Self {
        Self::new(ValueCount::AT_LEAST_ONE)
    }
}

impl ArgumentType for TextList {
    fn name(&self) -> &str {
        "strings"
    }

    fn value_count(&self) -> ValueCount {
        self.range
    }

    fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        Ok(Value::List(values.iter().cloned().map(Value::Text).collect()))
    }
}

/// One value out of a fixed set.
#[derive(Debug, Clone)]
pub struct OptList {
    options: Vec<String>,
    initial: Option<String>,
}

impl OptList {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            initial: None,
        }
    }

    /// Sets the value reported when unused. Must be one of the options.
    pub fn initial(mut self, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !self.options.contains(&value) {
            return Err(BuildError::InvalidArgumentType(format!(
                "initial value '{value}' is not one of the options"
            )));
        }
        self.initial = Some(value);
        Ok(self)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl ArgumentType for OptList {
    fn name(&self) -> &str {
        "option"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::ONE
    }

    fn initial_value(&self) -> Option<Value> {
        self.initial.clone().map(Value::Text)
    }

    fn parse(&self, values: &[String], _cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        let value = &values[0];
        if self.options.contains(value) {
            Ok(Value::Text(value.clone()))
        } else {
            Err(ConversionError::new(format!(
                "invalid value '{value}', expected one of: {}",
                self.options.join(", ")
            )))
        }
    }
}

/// `key=value` pairs whose values are parsed by a nested type.
///
/// Malformed pairs, empty keys and duplicate keys are reported and skipped;
/// the remaining pairs still produce a map.
pub struct KeyValues {
    value_type: Box<dyn ArgumentType>,
}

impl KeyValues {
    /// The nested type must take exactly one value per item.
    pub fn new(value_type: impl ArgumentType + 'static) -> Result<Self> {
        if value_type.value_count() != ValueCount::ONE {
            return Err(BuildError::InvalidArgumentType(format!(
                "key-value type needs a single-value type, '{}' takes {}",
                value_type.name(),
                value_type.value_count()
            )));
        }
        Ok(Self {
            value_type: Box::new(value_type),
        })
    }
}

impl ArgumentType for KeyValues {
    fn name(&self) -> &str {
        "key-values"
    }

    fn value_count(&self) -> ValueCount {
        ValueCount::AT_LEAST_ONE
    }

    fn parse(&self, values: &[String], cx: &mut ParseContext<'_>) -> Result<Value, ConversionError> {
        let mut map = BTreeMap::new();

        for item in values {
            let Some((key, raw)) = item.split_once('=') else {
                cx.report(format!("invalid key-value pair: '{item}'"), ErrorLevel::Error);
                continue;
            };
            if key.is_empty() {
                cx.report("key cannot be empty", ErrorLevel::Error);
                continue;
            }
            if map.contains_key(key) {
                cx.report(format!("duplicate key: '{key}'"), ErrorLevel::Error);
                continue;
            }

            match self.value_type.parse(&[raw.to_string()], cx) {
                Ok(value) => {
                    map.insert(key.to_string(), value);
                }
                Err(err) => cx.report_error(err),
            }
        }

        if map.is_empty() {
            return Err(ConversionError::new("no valid key-value pairs"));
        }
        Ok(Value::Map(map))
    }

    fn sub_types(&self) -> Vec<&dyn ArgumentType> {
        vec![self.value_type.as_ref()]
    }
}
