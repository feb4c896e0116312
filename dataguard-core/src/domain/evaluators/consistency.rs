// dataguard-core/src/domain/evaluators/consistency.rs

use super::{EvaluationError, EvaluationInput, Evaluator, ViolationStream};
use crate::domain::model::{Record, Value};
use crate::domain::quality::{ConsistencyCheck, Dimension, RuleKind, Violation};

/// Record-local derived-value checks. Checks whose inputs are absent are skipped.
pub struct ConsistencyEvaluator;

impl Evaluator for ConsistencyEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Consistency
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError> {
        let rules = input.rules(Dimension::Consistency);

        let stream = input.records().flat_map(move |record| {
            rules
                .iter()
                .filter_map(|rule| {
                    let RuleKind::Derived {
                        name,
                        check,
                        tolerance,
                    } = &rule.kind
                    else {
                        return None;
                    };
                    let cause = check_record(record, check, *tolerance)?;
                    Some(Violation::new(
                        rule,
                        vec![record.id().clone()],
                        check.fields(),
                        format!("{}: {}", name, cause),
                    ))
                })
                .collect::<Vec<_>>()
        });

        Ok(Box::new(stream))
    }
}

/// `Some(cause)` when the record breaks the check.
fn check_record(record: &Record, check: &ConsistencyCheck, tolerance: f64) -> Option<String> {
    match check {
        ConsistencyCheck::InCatalog { field, catalog } => {
            let value = present(record, field)?;
            match value.key_repr() {
                Some(key) if catalog.contains(&key) => None,
                _ => Some(format!("{} = {} is not in the reference catalog", field, value)),
            }
        }

        ConsistencyCheck::SumEquals { target, items } => {
            let expected = present(record, target)?;
            let items_value = present(record, items)?;
            let Some(expected) = expected.as_f64() else {
                return Some(format!("{} is not numeric", target));
            };
            let computed = match items_value {
                Value::List(values) => values
                    .iter()
                    .map(Value::as_f64)
                    .sum::<Option<f64>>(),
                other => other.as_f64(),
            };
            let Some(computed) = computed else {
                return Some(format!("{} holds non-numeric items", items));
            };
            compare(target, expected, &format!("sum({})", items), computed, tolerance)
        }

        ConsistencyCheck::ProductEquals { target, factors } => {
            let expected = present(record, target)?;
            let mut operands = Vec::with_capacity(factors.len());
            for factor in factors {
                operands.push((factor, present(record, factor)?));
            }
            let Some(expected) = expected.as_f64() else {
                return Some(format!("{} is not numeric", target));
            };
            let mut computed = 1.0;
            for (factor, value) in operands {
                let Some(x) = value.as_f64() else {
                    return Some(format!("{} is not numeric", factor));
                };
                computed *= x;
            }
            compare(target, expected, &factors.join(" * "), computed, tolerance)
        }

        ConsistencyCheck::LengthEquals { field, length } => {
            let value = present(record, field)?;
            let Some(text) = value.key_repr() else {
                return Some(format!("{} is not a scalar", field));
            };
            let actual = text.chars().count();
            if actual == *length {
                None
            } else {
                Some(format!(
                    "{} has length {}, expected {}",
                    field, actual, length
                ))
            }
        }
    }
}

fn present<'r>(record: &'r Record, field: &str) -> Option<&'r Value> {
    record.get(field).filter(|v| !v.is_missing())
}

fn compare(target: &str, expected: f64, label: &str, computed: f64, tolerance: f64) -> Option<String> {
    if (expected - computed).abs() <= tolerance {
        None
    } else {
        Some(format!(
            "{} = {} but {} = {}",
            target, expected, label, computed
        ))
    }
}
