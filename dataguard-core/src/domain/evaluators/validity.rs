// dataguard-core/src/domain/evaluators/validity.rs

use super::{EvaluationError, EvaluationInput, Evaluator, ViolationStream};
use crate::domain::quality::{Dimension, RuleKind, Violation};
use crate::domain::validators::validate;

/// Format checks on fields outside the primary key. Absent values belong to Completeness and are skipped.
pub struct ValidityEvaluator;

impl Evaluator for ValidityEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Validity
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError> {
        let rules = input.rules(Dimension::Validity);
        let as_of = input.as_of;

        let stream = input.records().flat_map(move |record| {
            rules
                .iter()
                .filter_map(|rule| {
                    let RuleKind::Format { field, validator } = &rule.kind else {
                        return None;
                    };
                    let outcome = validate(record.get(field), validator, as_of);
                    if outcome.valid || outcome.is_missing() {
                        return None;
                    }
                    let reason = outcome.reason.unwrap_or_default();
                    Some(Violation::new(
                        rule,
                        vec![record.id().clone()],
                        vec![field.clone()],
                        format!("{}: {}", field, reason),
                    ))
                })
                .collect::<Vec<_>>()
        });

        Ok(Box::new(stream))
    }
}
