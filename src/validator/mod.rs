//! # Validator Module
//!
//! Rule-based validation of request payloads without reflection.
//!
//! A type opts in by implementing [`Validate`] and listing its fields together
//! with a rule string. Rule strings are parsed once and cached.
//!
//! ```rust
//! use sol::validator::{validate, Field, Validate};
//!
//! struct SignUp {
//!     name: String,
//!     age: u32,
//!     email: String,
//! }
//!
//! impl Validate for SignUp {
//!     fn fields(&self) -> Vec<Field<'_>> {
//!         vec![
//!             Field::new("name", &self.name, "required,min=2"),
//!             Field::new("age", self.age, "required,gte=18"),
//!             Field::new("email", &self.email, "required,email"),
//!         ]
//!     }
//! }
//!
//! let user = SignUp { name: "Al".into(), age: 16, email: "al@example".into() };
//! let errors = validate(&user).unwrap_err();
//! assert_eq!(errors.get("age").unwrap(), ["This field must be greater than or equal to 18"]);
//! assert_eq!(errors.get("email").unwrap(), ["This field must be a valid email address"]);
//! assert!(errors.get("name").is_none());
//! ```
//!
//! ## Rules
//!
//! | Rule          | Applies to                | Fails when                                   |
//! |---------------|---------------------------|----------------------------------------------|
//! | `required`    | everything                | value missing, empty string or empty list    |
//! | `min=N`       | numbers, strings, lists   | value (or char / item count) below `N`       |
//! | `max=N`       | numbers, strings, lists   | value (or char / item count) above `N`       |
//! | `len=N`       | strings, lists            | char / item count differs from `N`           |
//! | `gt`, `gte`, `lt`, `lte` | numbers, numeric strings | comparison does not hold          |
//! | `email`       | non-empty strings         | not an email address                         |
//! | `regex=P`     | non-empty strings         | no match for `P`                             |
//!
//! A failed `required` skips the field's remaining rules. Rules that do not
//! apply to a value's type are skipped, as are all rules other than
//! `required` on a missing value.

mod error;
mod rule;

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

pub use error::ValidationErrors;
pub use rule::{parse_rules, Rule};

use error::message;
use rule::cached_rules;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(EMAIL_PATTERN).ok());

static REGEX_CACHE: Lazy<DashMap<String, Arc<Regex>>> = Lazy::new(DashMap::new);

fn cached_regex(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    if let Some(re) = REGEX_CACHE.get(pattern) {
        return Ok(Arc::clone(&re));
    }
    let re = Arc::new(Regex::new(pattern)?);
    REGEX_CACHE.insert(pattern.to_string(), Arc::clone(&re));
    Ok(re)
}

/// Whether `s` looks like an email address.
#[must_use]
pub fn is_valid_email(s: &str) -> bool {
    !s.is_empty() && EMAIL_REGEX.as_ref().is_some_and(|re| re.is_match(s))
}

/// Borrowed view of a field value as seen by the rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    /// A collection, by item count
    List(usize),
    /// An absent optional value
    Missing,
}

impl FieldValue<'_> {
    fn is_empty(&self) -> bool {
        matches!(
            self,
            FieldValue::Missing | FieldValue::Str("") | FieldValue::List(0)
        )
    }

    /// Numeric view; strings count when they parse as a number.
    fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Int(i) => Some(i as f64),
            FieldValue::Uint(u) => Some(u as f64),
            FieldValue::Float(f) => Some(f),
            FieldValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Size used by `min`/`max` on strings and lists.
    fn size(&self) -> Option<usize> {
        match *self {
            FieldValue::Str(s) => Some(s.chars().count()),
            FieldValue::List(n) => Some(n),
            _ => None,
        }
    }

    /// Value compared by `min`/`max`: magnitude for numbers, size otherwise.
    fn measure(&self) -> Option<f64> {
        match self {
            FieldValue::Int(_) | FieldValue::Uint(_) | FieldValue::Float(_) => self.as_f64(),
            _ => self.size().map(|n| n as f64),
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(v: &'a str) -> Self {
        FieldValue::Str(v)
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(v: &'a String) -> Self {
        FieldValue::Str(v)
    }
}

macro_rules! field_value_from {
    ($variant:ident($target:ty): $($t:ty),+) => {
        $(impl From<$t> for FieldValue<'_> {
            fn from(v: $t) -> Self {
                FieldValue::$variant(<$target>::from(v))
            }
        })+
    };
}

field_value_from!(Int(i64): i8, i16, i32, i64);
field_value_from!(Uint(u64): u8, u16, u32, u64);
field_value_from!(Float(f64): f32, f64);

impl From<usize> for FieldValue<'_> {
    fn from(v: usize) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl<'a, T> From<&'a [T]> for FieldValue<'a> {
    fn from(v: &'a [T]) -> Self {
        FieldValue::List(v.len())
    }
}

impl<'a, T> From<&'a Vec<T>> for FieldValue<'a> {
    fn from(v: &'a Vec<T>) -> Self {
        FieldValue::List(v.len())
    }
}

impl<'a, T: Into<FieldValue<'a>>> From<Option<T>> for FieldValue<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Missing, Into::into)
    }
}

/// One field to check: its reported name, value and rule string.
#[derive(Debug, Clone)]
pub struct Field<'a> {
    pub name: &'a str,
    pub value: FieldValue<'a>,
    pub rules: &'a str,
}

impl<'a> Field<'a> {
    pub fn new(name: &'a str, value: impl Into<FieldValue<'a>>, rules: &'a str) -> Self {
        Self {
            name,
            value: value.into(),
            rules,
        }
    }
}

/// Types that describe their own validation schema.
pub trait Validate {
    fn fields(&self) -> Vec<Field<'_>>;

    /// # Errors
    ///
    /// Returns every failed rule, grouped by field.
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate(self)
    }
}

/// Check every field of `value` against its rules.
///
/// # Errors
///
/// Returns every failed rule, grouped by field.
pub fn validate<T: Validate + ?Sized>(value: &T) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for field in value.fields() {
        for rule in cached_rules(field.rules).iter() {
            if *rule == Rule::Required {
                if field.value.is_empty() {
                    errors.add(field.name, message(rule));
                    break;
                }
                continue;
            }
            if let Some(msg) = check(rule, &field.value) {
                errors.add(field.name, msg);
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Apply one non-`required` rule; `Some(message)` on failure.
fn check(rule: &Rule, value: &FieldValue<'_>) -> Option<String> {
    if *value == FieldValue::Missing {
        return None;
    }
    let failed = match rule {
        Rule::Required => false,
        Rule::Min(p) => value.measure().is_some_and(|v| v < *p),
        Rule::Max(p) => value.measure().is_some_and(|v| v > *p),
        Rule::Len(n) => value.size().is_some_and(|size| size != *n),
        Rule::Gt(p) => value.as_f64().is_some_and(|v| v <= *p),
        Rule::Gte(p) => value.as_f64().is_some_and(|v| v < *p),
        Rule::Lt(p) => value.as_f64().is_some_and(|v| v >= *p),
        Rule::Lte(p) => value.as_f64().is_some_and(|v| v > *p),
        Rule::Email => matches!(value, FieldValue::Str(s) if !s.is_empty() && !is_valid_email(s)),
        Rule::Regex(pattern) => match value {
            FieldValue::Str(s) if !s.is_empty() => match cached_regex(pattern) {
                Ok(re) => !re.is_match(s),
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "Invalid regex in validation rule");
                    return Some(format!("invalid regex pattern: {pattern}"));
                }
            },
            _ => false,
        },
    };
    failed.then(|| message(rule))
}
