use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::rule::Rule;

/// Field name to failure messages, in rule order.
///
/// Serializes as a plain JSON object, ready to send back to the client:
///
/// ```json
/// {"age": ["This field must be at least 18"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one failure.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (field, messages) in &self.0 {
            write!(f, "; {field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// English message for a failed rule.
pub(crate) fn message(rule: &Rule) -> String {
    match rule {
        Rule::Required => "This field is required".to_string(),
        Rule::Min(p) => format!("This field must be at least {}", p.trunc()),
        Rule::Max(p) => format!("This field must be at most {}", p.trunc()),
        Rule::Len(n) => format!("This field must be exactly {n} characters"),
        Rule::Gt(p) => format!("This field must be greater than {p}"),
        Rule::Gte(p) => format!("This field must be greater than or equal to {p}"),
        Rule::Lt(p) => format!("This field must be less than {p}"),
        Rule::Lte(p) => format!("This field must be less than or equal to {p}"),
        Rule::Email => "This field must be a valid email address".to_string(),
        Rule::Regex(_) => "This field format is invalid".to_string(),
    }
}
