// dataguard-core/src/domain/evaluators/completeness.rs

use super::{EvaluationError, EvaluationInput, Evaluator, ViolationStream};
use crate::domain::quality::{Dimension, RuleKind, Violation};
use crate::domain::validators::check_present;

/// Missing critical fields. A record missing two critical fields yields two violations.
pub struct CompletenessEvaluator;

impl Evaluator for CompletenessEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Completeness
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError> {
        let rules = input.rules(Dimension::Completeness);

        let stream = input.records().flat_map(move |record| {
            rules
                .iter()
                .filter_map(|rule| {
                    let RuleKind::Required { field } = &rule.kind else {
                        return None;
                    };
                    if check_present(record.get(field)).valid {
                        return None;
                    }
                    Some(Violation::new(
                        rule,
                        vec![record.id().clone()],
                        vec![field.clone()],
                        format!("critical field '{}' is missing", field),
                    ))
                })
                .collect::<Vec<_>>()
        });

        Ok(Box::new(stream))
    }
}
