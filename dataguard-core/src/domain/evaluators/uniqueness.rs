// dataguard-core/src/domain/evaluators/uniqueness.rs

use std::collections::BTreeMap;

use super::{EvaluationError, EvaluationInput, Evaluator, ViolationStream};
use crate::domain::model::RecordId;
use crate::domain::quality::{Dimension, RuleKind, Violation};

/// Duplicate keys. The first occurrence is kept; every later member of a group is one violation.
/// Records with an incomplete key cannot collide and are left to Completeness.
pub struct UniquenessEvaluator;

impl Evaluator for UniquenessEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Uniqueness
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError> {
        let rules = input.rules(Dimension::Uniqueness);

        // Grouping needs the whole snapshot; emission stays lazy.
        let mut groups = Vec::with_capacity(rules.len());
        for rule in rules {
            let RuleKind::UniqueKey { fields } = &rule.kind else {
                continue;
            };
            let mut by_key: BTreeMap<String, Vec<RecordId>> = BTreeMap::new();
            for record in input.records() {
                if let Some(key) = record.key(fields) {
                    by_key.entry(key).or_default().push(record.id().clone());
                }
            }
            by_key.retain(|_, members| members.len() > 1);
            groups.push((rule, fields, by_key));
        }

        let stream = groups.into_iter().flat_map(|(rule, fields, by_key)| {
            by_key.into_iter().flat_map(move |(key, members)| {
                let label = fields.join("+");
                let size = members.len();
                (1..size)
                    .map(|dup| {
                        let mut involved = Vec::with_capacity(size);
                        involved.push(members[dup].clone());
                        involved.extend(
                            members
                                .iter()
                                .enumerate()
                                .filter(|(i, _)| *i != dup)
                                .map(|(_, id)| id.clone()),
                        );
                        Violation::new(
                            rule,
                            involved,
                            fields.clone(),
                            format!("duplicate {} = {} ({} records share it)", label, key, size),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        });

        Ok(Box::new(stream))
    }
}
