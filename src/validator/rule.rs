use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::warn;

/// One validation constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Value must be present and non-empty
    Required,
    /// Numeric lower bound, or minimum length for strings and lists
    Min(f64),
    /// Numeric upper bound, or maximum length for strings and lists
    Max(f64),
    /// Exact length in characters (strings) or items (lists)
    Len(usize),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    Email,
    /// Value must match the pattern
    Regex(String),
}

impl Rule {
    /// Rule name as written in a rule string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Len(_) => "len",
            Rule::Gt(_) => "gt",
            Rule::Gte(_) => "gte",
            Rule::Lt(_) => "lt",
            Rule::Lte(_) => "lte",
            Rule::Email => "email",
            Rule::Regex(_) => "regex",
        }
    }

    fn parse(part: &str) -> Result<Option<Rule>, String> {
        let (name, param) = match part.split_once('=') {
            Some((name, param)) => (name.trim(), Some(param.trim())),
            None => (part, None),
        };
        let number = || {
            param
                .and_then(|p| p.parse::<f64>().ok())
                .filter(|p| p.is_finite())
                .ok_or_else(|| format!("rule '{name}' needs a numeric parameter"))
        };
        let rule = match name {
            "required" => Rule::Required,
            "email" => Rule::Email,
            "min" => Rule::Min(number()?),
            "max" => Rule::Max(number()?),
            "gt" => Rule::Gt(number()?),
            "gte" => Rule::Gte(number()?),
            "lt" => Rule::Lt(number()?),
            "lte" => Rule::Lte(number()?),
            "len" => Rule::Len(
                param
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| "rule 'len' needs a non-negative integer".to_string())?,
            ),
            "regex" => match param {
                Some(p) if !p.is_empty() => Rule::Regex(p.to_string()),
                _ => return Err("rule 'regex' needs a pattern".to_string()),
            },
            _ => return Ok(None),
        };
        Ok(Some(rule))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required | Rule::Email => f.write_str(self.name()),
            Rule::Min(p) | Rule::Max(p) | Rule::Gt(p) | Rule::Gte(p) | Rule::Lt(p) | Rule::Lte(p) => {
                write!(f, "{}={p}", self.name())
            }
            Rule::Len(n) => write!(f, "len={n}"),
            Rule::Regex(p) => write!(f, "regex={p}"),
        }
    }
}

/// Parse a comma-separated rule string such as `"required,min=18"`.
///
/// Unknown rule names are ignored. Rules with a missing or malformed
/// parameter are dropped with a warning. An empty string or `-` yields no
/// rules. Since parameters are split on `,`, a regex cannot contain a comma.
#[must_use]
pub fn parse_rules(tag: &str) -> Vec<Rule> {
    let tag = tag.trim();
    if tag.is_empty() || tag == "-" {
        return Vec::new();
    }
    tag.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match Rule::parse(part) {
            Ok(rule) => rule,
            Err(reason) => {
                warn!(rule = %part, %reason, "Ignoring malformed validation rule");
                None
            }
        })
        .collect()
}

static PARSED: Lazy<DashMap<String, Arc<[Rule]>>> = Lazy::new(DashMap::new);

/// [`parse_rules`] memoized per rule string.
pub(crate) fn cached_rules(tag: &str) -> Arc<[Rule]> {
    if let Some(rules) = PARSED.get(tag) {
        return Arc::clone(&rules);
    }
    let rules: Arc<[Rule]> = Arc::from(parse_rules(tag));
    PARSED.insert(tag.to_string(), Arc::clone(&rules));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules() {
        assert_eq!(
            parse_rules("required, min=18 ,max=100,email"),
            vec![Rule::Required, Rule::Min(18.0), Rule::Max(100.0), Rule::Email]
        );
        assert_eq!(parse_rules("len=5"), vec![Rule::Len(5)]);
        assert_eq!(
            parse_rules("regex=^[a-z]+$"),
            vec![Rule::Regex("^[a-z]+$".to_string())]
        );
    }

    #[test]
    fn test_unknown_and_malformed_rules_are_dropped() {
        assert!(parse_rules("").is_empty());
        assert!(parse_rules("-").is_empty());
        assert_eq!(parse_rules("uuid,required"), vec![Rule::Required]);
        assert_eq!(parse_rules("min=abc,len=-1,regex=,gt=3"), vec![Rule::Gt(3.0)]);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tag in ["required", "min=18", "gte=1.5", "len=3", "regex=^a$"] {
            let rules = parse_rules(tag);
            assert_eq!(rules[0].to_string(), tag);
        }
    }

    #[test]
    fn test_cached_rules_reuse() {
        let a = cached_rules("required,min=1");
        let b = cached_rules("required,min=1");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
