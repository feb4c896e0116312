// dataguard-core/src/domain/validators/format.rs

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::model::{DEFAULT_DATE_FORMAT, Value};

pub const MISSING: &str = "missing";
pub const TYPE_MISMATCH: &str = "type-mismatch";

/// Declarative single-field format rule, as written in the policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FormatRule {
    Regex {
        pattern: String,
    },
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        exclusive_min: bool,
        #[serde(default)]
        exclusive_max: bool,
    },
    FixedDigits {
        length: usize,
    },
    Date {
        #[serde(default = "default_date_format")]
        format: String,
        #[serde(default)]
        not_before: Option<NaiveDate>,
        #[serde(default)]
        not_in_future: bool,
    },
    Code {
        max_length: usize,
    },
    Length {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    OneOf {
        values: Vec<String>,
    },
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Runtime version of a `FormatRule`. Regexes are compiled once at registry load.
#[derive(Debug, Clone)]
pub enum FormatValidator {
    Regex(Regex),
    Range {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
    FixedDigits(usize),
    Date {
        format: String,
        not_before: Option<NaiveDate>,
        not_in_future: bool,
    },
    Code(usize),
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    OneOf(BTreeSet<String>),
}

impl FormatValidator {
    pub fn compile(rule: &FormatRule) -> Result<Self, regex::Error> {
        Ok(match rule {
            FormatRule::Regex { pattern } => Self::Regex(Regex::new(pattern)?),
            FormatRule::Range {
                min,
                max,
                exclusive_min,
                exclusive_max,
            } => Self::Range {
                min: *min,
                max: *max,
                exclusive_min: *exclusive_min,
                exclusive_max: *exclusive_max,
            },
            FormatRule::FixedDigits { length } => Self::FixedDigits(*length),
            FormatRule::Date {
                format,
                not_before,
                not_in_future,
            } => Self::Date {
                format: format.clone(),
                not_before: *not_before,
                not_in_future: *not_in_future,
            },
            FormatRule::Code { max_length } => Self::Code(*max_length),
            FormatRule::Length { min, max } => Self::Length {
                min: *min,
                max: *max,
            },
            FormatRule::OneOf { values } => Self::OneOf(values.iter().cloned().collect()),
        })
    }

    pub fn date_format(&self) -> Option<&str> {
        match self {
            Self::Date { format, .. } => Some(format),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.reason.as_deref() == Some(MISSING)
    }
}

/// Presence check used by Completeness.
pub fn check_present(value: Option<&Value>) -> ValidationOutcome {
    match value {
        Some(v) if !v.is_missing() => ValidationOutcome::ok(),
        _ => ValidationOutcome::invalid(MISSING),
    }
}

/// Total: every input, including absent or mistyped values, maps to an outcome.
pub fn validate(
    value: Option<&Value>,
    validator: &FormatValidator,
    as_of: NaiveDate,
) -> ValidationOutcome {
    let value = match value {
        Some(v) if !v.is_missing() => v,
        _ => return ValidationOutcome::invalid(MISSING),
    };

    match validator {
        FormatValidator::Regex(re) => match value.as_text() {
            Some(s) if re.is_match(s) => ValidationOutcome::ok(),
            Some(_) => ValidationOutcome::invalid(format!("does not match /{}/", re.as_str())),
            None => ValidationOutcome::invalid(TYPE_MISMATCH),
        },

        FormatValidator::Range {
            min,
            max,
            exclusive_min,
            exclusive_max,
        } => {
            let Some(x) = value.as_f64() else {
                return ValidationOutcome::invalid(TYPE_MISMATCH);
            };
            if let Some(lo) = min {
                let below = if *exclusive_min { x <= *lo } else { x < *lo };
                if below {
                    let op = if *exclusive_min { ">" } else { ">=" };
                    return ValidationOutcome::invalid(format!("{} is not {} {}", x, op, lo));
                }
            }
            if let Some(hi) = max {
                let above = if *exclusive_max { x >= *hi } else { x > *hi };
                if above {
                    let op = if *exclusive_max { "<" } else { "<=" };
                    return ValidationOutcome::invalid(format!("{} is not {} {}", x, op, hi));
                }
            }
            ValidationOutcome::ok()
        }

        FormatValidator::FixedDigits(length) => match digits_of(value) {
            Some(d) if d.len() == *length && d.chars().all(|c| c.is_ascii_digit()) => {
                ValidationOutcome::ok()
            }
            Some(d) => ValidationOutcome::invalid(format!(
                "expected {} digits, got {:?}",
                length, d
            )),
            None => ValidationOutcome::invalid(TYPE_MISMATCH),
        },

        FormatValidator::Date {
            format,
            not_before,
            not_in_future,
        } => {
            let date = match value {
                Value::Date(d) => *d,
                Value::Text(s) => match NaiveDate::parse_from_str(s.trim(), format) {
                    Ok(d) => d,
                    Err(_) => return ValidationOutcome::invalid(TYPE_MISMATCH),
                },
                _ => return ValidationOutcome::invalid(TYPE_MISMATCH),
            };
            if let Some(floor) = not_before
                && date < *floor
            {
                return ValidationOutcome::invalid(format!("{} is before {}", date, floor));
            }
            if *not_in_future && date > as_of {
                return ValidationOutcome::invalid(format!("{} is in the future", date));
            }
            ValidationOutcome::ok()
        }

        FormatValidator::Code(max_length) => match digits_of(value) {
            Some(code)
                if code.len() <= *max_length && code.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ValidationOutcome::ok()
            }
            Some(code) => ValidationOutcome::invalid(format!(
                "{:?} is not an alphanumeric code of at most {} chars",
                code, max_length
            )),
            None => ValidationOutcome::invalid(TYPE_MISMATCH),
        },

        FormatValidator::Length { min, max } => {
            let Some(s) = value.as_text() else {
                return ValidationOutcome::invalid(TYPE_MISMATCH);
            };
            let len = s.chars().count();
            let too_short = min.is_some_and(|m| len < m);
            let too_long = max.is_some_and(|m| len > m);
            if too_short || too_long {
                ValidationOutcome::invalid(format!("length {} outside bounds", len))
            } else {
                ValidationOutcome::ok()
            }
        }

        FormatValidator::OneOf(values) => match value.key_repr() {
            Some(k) if values.contains(&k) => ValidationOutcome::ok(),
            Some(k) => ValidationOutcome::invalid(format!("{:?} is not an allowed value", k)),
            None => ValidationOutcome::invalid(TYPE_MISMATCH),
        },
    }
}

// Codes and phone numbers may arrive as JSON numbers.
fn digits_of(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.trim().to_string()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EMAIL: &str = r"^[\w.-]+@[\w.-]+\.\w+$";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn compile(rule: FormatRule) -> FormatValidator {
        FormatValidator::compile(&rule).unwrap()
    }

    #[test]
    fn test_missing_and_type_mismatch_are_outcomes() {
        let v = compile(FormatRule::Regex {
            pattern: EMAIL.into(),
        });
        assert!(validate(None, &v, today()).is_missing());
        assert!(validate(Some(&Value::Null), &v, today()).is_missing());
        let out = validate(Some(&Value::Integer(3)), &v, today());
        assert_eq!(out.reason.as_deref(), Some(TYPE_MISMATCH));
    }

    #[test]
    fn test_email_regex() {
        let v = compile(FormatRule::Regex {
            pattern: EMAIL.into(),
        });
        assert!(validate(Some(&"ana@shop.com".into()), &v, today()).valid);
        assert!(!validate(Some(&"ana-at-shop".into()), &v, today()).valid);
    }

    #[test]
    fn test_numeric_range_exclusive_min() {
        let v = compile(FormatRule::Range {
            min: Some(0.0),
            max: Some(50_000.0),
            exclusive_min: true,
            exclusive_max: false,
        });
        assert!(!validate(Some(&Value::Float(0.0)), &v, today()).valid);
        assert!(validate(Some(&Value::Float(0.01)), &v, today()).valid);
        assert!(validate(Some(&Value::Integer(50_000)), &v, today()).valid);
        assert!(!validate(Some(&Value::Float(50_000.5)), &v, today()).valid);
        assert_eq!(
            validate(Some(&"12".into()), &v, today()).reason.as_deref(),
            Some(TYPE_MISMATCH)
        );
    }

    #[test]
    fn test_fixed_digits_phone() {
        let v = compile(FormatRule::FixedDigits { length: 11 });
        assert!(validate(Some(&"11987654321".into()), &v, today()).valid);
        assert!(validate(Some(&Value::Integer(11987654321)), &v, today()).valid);
        assert!(!validate(Some(&"987654321".into()), &v, today()).valid);
        assert!(!validate(Some(&"1198765432x".into()), &v, today()).valid);
    }

    #[test]
    fn test_date_not_in_future() {
        let v = compile(FormatRule::Date {
            format: DEFAULT_DATE_FORMAT.into(),
            not_before: NaiveDate::from_ymd_opt(2000, 1, 1),
            not_in_future: true,
        });
        assert!(validate(Some(&"2024-06-01".into()), &v, today()).valid);
        assert!(!validate(Some(&"2024-06-02".into()), &v, today()).valid);
        assert!(!validate(Some(&"1999-12-31".into()), &v, today()).valid);
        assert_eq!(
            validate(Some(&"01/06/2024".into()), &v, today()).reason.as_deref(),
            Some(TYPE_MISMATCH)
        );
    }

    #[test]
    fn test_sku_code() {
        let v = compile(FormatRule::Code { max_length: 10 });
        assert!(validate(Some(&"ABC123".into()), &v, today()).valid);
        assert!(!validate(Some(&"ABC-123".into()), &v, today()).valid);
        assert!(!validate(Some(&"ABCDEFGHIJK".into()), &v, today()).valid);
    }

    #[test]
    fn test_length_and_one_of() {
        let len = compile(FormatRule::Length {
            min: Some(2),
            max: Some(2),
        });
        assert!(validate(Some(&"SP".into()), &len, today()).valid);
        assert!(!validate(Some(&"SPX".into()), &len, today()).valid);

        let set = compile(FormatRule::OneOf {
            values: vec!["Pendente".into(), "Concluída".into()],
        });
        assert!(validate(Some(&"Concluída".into()), &set, today()).valid);
        assert!(!validate(Some(&"Perdida".into()), &set, today()).valid);
    }

    #[test]
    fn test_invalid_regex_fails_to_compile() {
        let res = FormatValidator::compile(&FormatRule::Regex {
            pattern: "[unclosed".into(),
        });
        assert!(res.is_err());
    }
}
