//! Value-to-text rendering for report cells.

use std::fmt::Write;

use crate::config::FormatSettings;
use crate::entity::Value;

/// Separator between entities collapsed into one cell.
pub const ENTITY_SEPARATOR: &str = ", ";

/// Separator between the `title: value` pairs of one collapsed entity.
pub const FIELD_SEPARATOR: &str = " - ";

/// Renders raw values as display strings.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    settings: FormatSettings,
}

impl Formatter {
    pub fn new(settings: FormatSettings) -> Self {
        Self { settings }
    }

    /// Render a value. `Ref`s render as nothing here: the resolver replaces
    /// them with the linked entity's text before formatting.
    pub fn value(&self, value: &Value) -> String {
        match value {
            Value::Null | Value::Ref(_) => String::new(),
            Value::Bool(true) => self.settings.true_label.clone(),
            Value::Bool(false) => self.settings.false_label.clone(),
            Value::Int(i) => i.to_string(),
            Value::Decimal(d) => self.number(*d),
            Value::Text(s) => s.clone(),
            Value::Date(d) => render(d.format(&self.settings.date)),
            Value::DateTime(dt) => render(dt.format(&self.settings.datetime)),
            Value::List(items) => items
                .iter()
                .map(|v| self.value(v))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(ENTITY_SEPARATOR),
        }
    }

    /// Render a number with at most `decimals` decimals, trailing zeros trimmed.
    pub fn number(&self, n: f64) -> String {
        if !n.is_finite() {
            return String::new();
        }
        let text = format!("{:.*}", self.settings.decimals, n);
        let text = if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            text
        };
        if text == "-0" {
            "0".to_string()
        } else {
            text
        }
    }
}

/// An unrenderable format string gives an empty cell.
fn render(formatted: impl std::fmt::Display) -> String {
    let mut text = String::new();
    match write!(text, "{}", formatted) {
        Ok(()) => text,
        Err(_) => String::new(),
    }
}

/// Join `title: value` pairs the way collapsed sub-report cells show them.
pub fn collapse_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(title, value)| format!("{}: {}", title, value))
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}
