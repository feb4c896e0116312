// dataguard-core/src/application/router.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::warn;

use super::report::{DispatchedAction, Report};
use crate::domain::error::RoutingError;
use crate::domain::model::DomainName;
use crate::domain::policy::{CorrectiveAction, EvaluationContext, PolicyRegistry};
use crate::domain::quality::{Dimension, Violation};

/// Which violations get an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingScope {
    /// Only violations of dimensions over their threshold.
    #[default]
    FailingOnly,
    All,
}

impl FromStr for RoutingScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "failing_only" | "failing" => Ok(Self::FailingOnly),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown routing scope: {}", s)),
        }
    }
}

/// Maps violations to corrective actions. Emits descriptors only; never touches data.
pub struct RemediationRouter<'r> {
    registry: &'r PolicyRegistry,
    context: EvaluationContext,
}

impl<'r> RemediationRouter<'r> {
    pub fn new(registry: &'r PolicyRegistry, context: EvaluationContext) -> Self {
        Self { registry, context }
    }

    /// Configured action for one violation, or the kind of error that made it unresolvable.
    pub fn route(&self, violation: &Violation) -> Result<CorrectiveAction, RoutingError> {
        self.registry.resolve_action(
            &violation.domain,
            violation.dimension,
            violation.primary_field(),
            self.context,
        )
    }

    /// Routes the report's violations in scope. Unknown actions fall back to manual review
    /// and leave a diagnostic note.
    pub fn dispatch(&self, report: &Report, scope: RoutingScope) -> (Vec<DispatchedAction>, Vec<String>) {
        let failing: BTreeSet<(&DomainName, Dimension)> = report
            .domains
            .iter()
            .flat_map(|(name, d)| d.failing_dimensions().map(move |dim| (name, dim)))
            .collect();

        let mut actions = Vec::new();
        let mut diagnostics = BTreeSet::new();

        for violation in &report.violations {
            if scope == RoutingScope::FailingOnly
                && !failing.contains(&(&violation.domain, violation.dimension))
            {
                continue;
            }

            let (action, note) = match self.route(violation) {
                Ok(action) => (action, None),
                Err(e) => {
                    warn!(rule = %violation.rule, error = %e, "Falling back to manual review");
                    diagnostics.insert(e.to_string());
                    (CorrectiveAction::FlagForManualReview, Some(e.to_string()))
                }
            };

            actions.push(DispatchedAction {
                domain: violation.domain.clone(),
                dimension: violation.dimension,
                rule: violation.rule.clone(),
                action,
                records: violation.records.clone(),
                cause: violation.cause.clone(),
                note,
            });
        }

        (actions, diagnostics.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::aggregator::{DimensionFindings, DomainOutcome, ViolationAggregator};
    use crate::domain::model::RecordId;
    use crate::domain::policy::PolicyConfig;
    use crate::domain::quality::{Rule, RuleKind};
    use anyhow::Result;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    const POLICY: &str = r#"
domains:
  customers:
    primary_key: [id_cliente]
    thresholds: { completeness: 0.5, validity: 0.0 }
    fields:
      - { name: id_cliente, type: numeric }
      - { name: email, critical: true }
      - name: telefone
        format: { rule: fixed_digits, length: 11 }
    actions:
      at_rest:
        validity: shred_the_data
"#;

    fn registry() -> Result<PolicyRegistry> {
        let config: PolicyConfig = serde_yaml::from_str(POLICY)?;
        Ok(PolicyRegistry::from_config(&config)?)
    }

    fn violation(kind: RuleKind, field: &str) -> Violation {
        let rule = Rule::new(DomainName::new("customers"), kind);
        Violation::new(
            &rule,
            vec![RecordId {
                position: 0,
                key: Some("1".into()),
            }],
            vec![field.into()],
            "test".into(),
        )
    }

    fn report(reg: &PolicyRegistry) -> Result<Report> {
        let missing = violation(RuleKind::Required { field: "email".into() }, "email");
        let bad_phone = violation(
            RuleKind::Format {
                field: "telefone".into(),
                validator: crate::domain::validators::FormatValidator::FixedDigits(11),
            },
            "telefone",
        );
        let findings = BTreeMap::from([
            (
                Dimension::Completeness,
                DimensionFindings::Evaluated {
                    violations: vec![missing],
                    evaluated: 10,
                },
            ),
            (
                Dimension::Validity,
                DimensionFindings::Evaluated {
                    violations: vec![bad_phone],
                    evaluated: 10,
                },
            ),
        ]);
        Ok(ViolationAggregator::new(reg).assemble(
            EvaluationContext::AtRest,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![DomainOutcome::Evaluated {
                domain: DomainName::new("customers"),
                total_records: 10,
                findings,
            }],
        )?)
    }

    #[test]
    fn test_defaults_per_context() -> Result<()> {
        let reg = registry()?;
        let v = violation(RuleKind::Required { field: "email".into() }, "email");
        let at_rest = RemediationRouter::new(&reg, EvaluationContext::AtRest);
        let ingestion = RemediationRouter::new(&reg, EvaluationContext::Ingestion);
        assert_eq!(at_rest.route(&v)?, CorrectiveAction::SendToRemediationQueue);
        assert_eq!(ingestion.route(&v)?, CorrectiveAction::RejectAndNotifySource);
        Ok(())
    }

    #[test]
    fn test_unknown_action_falls_back_with_note() -> Result<()> {
        let reg = registry()?;
        let report = report(&reg)?;
        let router = RemediationRouter::new(&reg, EvaluationContext::AtRest);

        // Completeness 0.1 <= 0.5 passes, so only the validity finding is routed.
        let (actions, diagnostics) = router.dispatch(&report, RoutingScope::FailingOnly);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, CorrectiveAction::FlagForManualReview);
        assert!(actions[0].note.is_some());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("shred_the_data"));

        let (all, _) = router.dispatch(&report, RoutingScope::All);
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("all".parse::<RoutingScope>(), Ok(RoutingScope::All));
        assert_eq!("failing-only".parse::<RoutingScope>(), Ok(RoutingScope::FailingOnly));
        assert!("some".parse::<RoutingScope>().is_err());
    }
}
