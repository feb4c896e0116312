// dataguard-core/src/domain/evaluators/integrity.rs

use std::collections::HashSet;

use super::{EvaluationError, EvaluationInput, Evaluator, ViolationStream};
use crate::domain::model::Value;
use crate::domain::quality::{Dimension, RuleKind, Violation};

/// Foreign keys checked against the fixed snapshot of the referenced domain.
/// Absent foreign-key values are a Completeness concern and are skipped.
pub struct IntegrityEvaluator;

impl Evaluator for IntegrityEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Integrity
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError> {
        let mut lookups = Vec::new();
        for rule in input.rules(Dimension::Integrity) {
            let RuleKind::Reference { field, target } = &rule.kind else {
                continue;
            };
            let referenced = input.snapshots.get(&target.domain).ok_or_else(|| {
                EvaluationError::MissingReference {
                    domain: input.policy.name.to_string(),
                    referenced: target.domain.to_string(),
                }
            })?;
            let keys: HashSet<String> = referenced
                .records()
                .iter()
                .filter_map(|r| r.get(&target.field).and_then(Value::key_repr))
                .collect();
            lookups.push((rule, field, target, keys));
        }

        let stream = input.records().flat_map(move |record| {
            lookups
                .iter()
                .filter_map(|(rule, field, target, keys)| {
                    let key = record.get(field.as_str()).and_then(Value::key_repr)?;
                    if keys.contains(&key) {
                        return None;
                    }
                    Some(Violation::new(
                        rule,
                        vec![record.id().clone()],
                        vec![field.to_string()],
                        format!(
                            "orphan record: {} = {} not found in {}.{}",
                            field, key, target.domain, target.field
                        ),
                    ))
                })
                .collect::<Vec<_>>()
        });

        Ok(Box::new(stream))
    }
}
