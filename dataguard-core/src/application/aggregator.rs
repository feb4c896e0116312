// dataguard-core/src/application/aggregator.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use super::report::{DimensionScore, DomainReport, Report};
use crate::domain::error::ConfigError;
use crate::domain::model::DomainName;
use crate::domain::policy::{EvaluationContext, PolicyRegistry};
use crate::domain::quality::{Dimension, Ratio, Violation};

/// What one evaluator produced for one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionFindings {
    Evaluated {
        violations: Vec<Violation>,
        evaluated: u64,
    },
    Unavailable {
        reason: String,
    },
}

/// Per-domain input of the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainOutcome {
    Evaluated {
        domain: DomainName,
        total_records: usize,
        findings: BTreeMap<Dimension, DimensionFindings>,
    },
    Aborted {
        domain: DomainName,
        reason: String,
    },
}

impl DomainOutcome {
    pub fn domain(&self) -> &DomainName {
        match self {
            Self::Evaluated { domain, .. } | Self::Aborted { domain, .. } => domain,
        }
    }
}

/// Scores findings against thresholds. Keeps every violation, even past a failing threshold.
pub struct ViolationAggregator<'r> {
    registry: &'r PolicyRegistry,
}

impl<'r> ViolationAggregator<'r> {
    pub fn new(registry: &'r PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Scores one domain. Returns its report and the violations it keeps.
    pub fn aggregate(
        &self,
        domain: &DomainName,
        violations_by_dimension: BTreeMap<Dimension, DimensionFindings>,
        total_records: usize,
    ) -> Result<(DomainReport, Vec<Violation>), ConfigError> {
        let mut scores = BTreeMap::new();
        let mut kept = Vec::new();

        for (dimension, findings) in violations_by_dimension {
            let threshold = self.registry.resolve_threshold(domain, dimension)?;
            let score = match findings {
                DimensionFindings::Evaluated {
                    violations,
                    evaluated,
                } => {
                    let ratio = Ratio::new(violations.len() as u64, evaluated);
                    kept.extend(violations);
                    DimensionScore::new(ratio, threshold)
                }
                DimensionFindings::Unavailable { reason } => DimensionScore::unavailable(reason, threshold),
            };
            debug!(
                domain = %domain,
                dimension = %dimension,
                ratio = score.ratio,
                passed = score.passed,
                "Scored dimension"
            );
            scores.insert(dimension, score);
        }

        Ok((DomainReport::evaluated(total_records, scores), kept))
    }

    /// Merges domain outcomes into one report. Input order does not matter: domains are
    /// keyed and violations sorted, so equal inputs give byte-identical reports.
    pub fn assemble(
        &self,
        context: EvaluationContext,
        as_of: NaiveDate,
        outcomes: impl IntoIterator<Item = DomainOutcome>,
    ) -> Result<Report, ConfigError> {
        let mut domains = BTreeMap::new();
        let mut violations = Vec::new();

        for outcome in outcomes {
            match outcome {
                DomainOutcome::Evaluated {
                    domain,
                    total_records,
                    findings,
                } => {
                    let (report, kept) = self.aggregate(&domain, findings, total_records)?;
                    violations.extend(kept);
                    domains.insert(domain, report);
                }
                DomainOutcome::Aborted { domain, reason } => {
                    domains.insert(domain, DomainReport::aborted(reason));
                }
            }
        }

        violations.sort();

        Ok(Report {
            context,
            as_of,
            policy_version: self.registry.version(),
            passed: domains.values().all(|d| d.passed),
            domains,
            violations,
            actions: Vec::new(),
            diagnostics: Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::RecordId;
    use crate::domain::policy::PolicyConfig;
    use crate::domain::quality::{Rule, RuleKind};
    use anyhow::Result;

    const POLICY: &str = r#"
domains:
  customers:
    primary_key: [id_cliente]
    fields:
      - { name: id_cliente, type: numeric }
      - { name: email, critical: true }
"#;

    fn registry() -> Result<PolicyRegistry> {
        let config: PolicyConfig = serde_yaml::from_str(POLICY)?;
        Ok(PolicyRegistry::from_config(&config)?)
    }

    fn missing_email(position: usize) -> Violation {
        let rule = Rule::new(
            DomainName::new("customers"),
            RuleKind::Required {
                field: "email".into(),
            },
        );
        Violation::new(
            &rule,
            vec![RecordId {
                position,
                key: None,
            }],
            vec!["email".into()],
            "critical field 'email' is missing".into(),
        )
    }

    fn completeness(count: usize, evaluated: u64) -> BTreeMap<Dimension, DimensionFindings> {
        BTreeMap::from([(
            Dimension::Completeness,
            DimensionFindings::Evaluated {
                violations: (0..count).map(missing_email).collect(),
                evaluated,
            },
        )])
    }

    #[test]
    fn test_ratio_equal_to_threshold_passes() -> Result<()> {
        let reg = registry()?;
        let agg = ViolationAggregator::new(&reg);
        let name = DomainName::new("customers");

        let (at_limit, _) = agg.aggregate(&name, completeness(2, 100), 100)?;
        assert!(at_limit.passed);

        let (over, kept) = agg.aggregate(&name, completeness(3, 100), 100)?;
        assert!(!over.passed);
        // Failing dimensions keep every finding.
        assert_eq!(kept.len(), 3);
        let score = &over.dimensions[&Dimension::Completeness];
        assert_eq!(score.ratio, 0.03);
        assert!((score.score() - 0.97).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_unregistered_domain_is_a_config_error() -> Result<()> {
        let reg = registry()?;
        let agg = ViolationAggregator::new(&reg);
        let err = agg.aggregate(&DomainName::new("ghosts"), completeness(0, 0), 0);
        assert_eq!(err.err(), Some(ConfigError::UnregisteredDomain("ghosts".into())));
        Ok(())
    }

    #[test]
    fn test_assembly_ignores_input_order() -> Result<()> {
        let reg = registry()?;
        let agg = ViolationAggregator::new(&reg);
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let mut shuffled = completeness(3, 100);
        if let Some(DimensionFindings::Evaluated { violations, .. }) =
            shuffled.get_mut(&Dimension::Completeness)
        {
            violations.reverse();
        }

        let outcome = |findings| DomainOutcome::Evaluated {
            domain: DomainName::new("customers"),
            total_records: 100,
            findings,
        };
        let a = agg.assemble(EvaluationContext::AtRest, as_of, vec![outcome(completeness(3, 100))])?;
        let b = agg.assemble(EvaluationContext::AtRest, as_of, vec![outcome(shuffled)])?;
        assert_eq!(a.to_json()?, b.to_json()?);
        Ok(())
    }

    #[test]
    fn test_aborted_domain_fails_report() -> Result<()> {
        let reg = registry()?;
        let agg = ViolationAggregator::new(&reg);
        let report = agg.assemble(
            EvaluationContext::AtRest,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![DomainOutcome::Aborted {
                domain: DomainName::new("customers"),
                reason: "unreadable".into(),
            }],
        )?;
        assert!(!report.passed);
        assert!(report.domains[&DomainName::new("customers")].is_aborted());
        Ok(())
    }
}
