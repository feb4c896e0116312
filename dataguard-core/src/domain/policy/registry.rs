// dataguard-core/src/domain/policy/registry.rs

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use validator::Validate;

use super::action::{CorrectiveAction, EvaluationContext};
use super::config::{
    ActionOverrides, ConsistencyKindConfig, CURRENT_POLICY_VERSION, DomainPolicyConfig,
    FieldConfig, PolicyConfig, PolicyDefaults,
};
use crate::domain::error::{ConfigError, RoutingError};
use crate::domain::model::{
    DEFAULT_DATE_FORMAT, DomainName, FieldDefinition, FieldType, ForeignKey, Schema,
};
use crate::domain::quality::{ConsistencyCheck, Dimension, Rule, RuleKind, Threshold};
use crate::domain::validators::{FormatRule, FormatValidator};

/// Compiled, read-only policy for one domain.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    pub name: DomainName,
    pub description: Option<String>,
    pub schema: Schema,
    rules: Vec<Rule>,
    thresholds: BTreeMap<Dimension, Threshold>,
    actions: ActionOverrides,
}

impl DomainPolicy {
    pub fn threshold(&self, dimension: Dimension) -> Threshold {
        self.thresholds
            .get(&dimension)
            .copied()
            .unwrap_or(Threshold::ZERO)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_for(&self, dimension: Dimension) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.dimension() == dimension)
    }

    /// Domains whose snapshots this domain's Integrity rules read.
    pub fn referenced_domains(&self) -> BTreeSet<DomainName> {
        self.schema
            .fields
            .iter()
            .filter_map(|f| f.references.as_ref().map(|r| r.domain.clone()))
            .collect()
    }

    /// Field override first, then domain override. `None` means "use the default".
    fn configured_action(
        &self,
        dimension: Dimension,
        field: Option<&str>,
        context: EvaluationContext,
    ) -> Option<&str> {
        field
            .and_then(|f| self.actions.fields.get(f))
            .and_then(|o| pick(&o.ingestion, &o.at_rest, dimension, context))
            .or_else(|| {
                pick(
                    &self.actions.ingestion,
                    &self.actions.at_rest,
                    dimension,
                    context,
                )
            })
    }
}

fn pick<'a>(
    ingestion: &'a BTreeMap<Dimension, String>,
    at_rest: &'a BTreeMap<Dimension, String>,
    dimension: Dimension,
    context: EvaluationContext,
) -> Option<&'a str> {
    match context {
        EvaluationContext::Ingestion => ingestion.get(&dimension),
        EvaluationContext::AtRest => at_rest.get(&dimension),
    }
    .map(String::as_str)
}

/// Versioned set of domain policies, loaded once before a run and never mutated during it.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    version: u32,
    domains: BTreeMap<DomainName, DomainPolicy>,
}

impl PolicyRegistry {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        if config.version != CURRENT_POLICY_VERSION {
            return Err(ConfigError::UnsupportedVersion(config.version));
        }
        config
            .defaults
            .validate()
            .map_err(|e| ConfigError::InvalidPolicy {
                domain: "defaults".to_string(),
                reason: e.to_string(),
            })?;

        let mut domains = BTreeMap::new();
        for (raw_name, domain_config) in &config.domains {
            let name = DomainName::new(raw_name);
            if domains.contains_key(&name) {
                return Err(ConfigError::InvalidPolicy {
                    domain: name.to_string(),
                    reason: format!("'{}' collides with another domain once lowercased", raw_name),
                });
            }
            let policy = compile_domain(name, domain_config, &config.defaults)?;
            debug!(domain = %policy.name, rules = policy.rules.len(), "Compiled domain policy");
            domains.insert(policy.name.clone(), policy);
        }

        resolve_references(&mut domains)?;

        Ok(Self {
            version: config.version,
            domains,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn domain(&self, name: &DomainName) -> Result<&DomainPolicy, ConfigError> {
        self.domains
            .get(name)
            .ok_or_else(|| ConfigError::UnregisteredDomain(name.to_string()))
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainPolicy> {
        self.domains.values()
    }

    pub fn domain_names(&self) -> BTreeSet<DomainName> {
        self.domains.keys().cloned().collect()
    }

    pub fn resolve_threshold(
        &self,
        domain: &DomainName,
        dimension: Dimension,
    ) -> Result<Threshold, ConfigError> {
        Ok(self.domain(domain)?.threshold(dimension))
    }

    /// Corrective action for a finding, honouring field and domain overrides.
    pub fn resolve_action(
        &self,
        domain: &DomainName,
        dimension: Dimension,
        field: Option<&str>,
        context: EvaluationContext,
    ) -> Result<CorrectiveAction, RoutingError> {
        let configured = self
            .domains
            .get(domain)
            .and_then(|p| p.configured_action(dimension, field, context));

        match configured {
            None => Ok(CorrectiveAction::default_for(dimension, context)),
            Some(name) => name.parse().map_err(|_| RoutingError::UnknownAction {
                domain: domain.to_string(),
                dimension: dimension.to_string(),
                action: name.to_string(),
            }),
        }
    }
}

// --- COMPILATION ---

fn compile_domain(
    name: DomainName,
    config: &DomainPolicyConfig,
    defaults: &PolicyDefaults,
) -> Result<DomainPolicy, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPolicy {
        domain: name.to_string(),
        reason,
    };

    // Thresholds first, so an out-of-range ratio gets its own error kind.
    let mut thresholds = BTreeMap::new();
    for dimension in Dimension::ALL {
        let value = config
            .thresholds
            .get(dimension)
            .or_else(|| defaults.thresholds.get(dimension))
            .unwrap_or(0.0);
        let threshold = Threshold::new(value).ok_or_else(|| ConfigError::ThresholdOutOfRange {
            domain: name.to_string(),
            dimension: dimension.to_string(),
            value,
        })?;
        thresholds.insert(dimension, threshold);
    }

    config.validate().map_err(|e| invalid(e.to_string()))?;

    let mut fields = Vec::with_capacity(config.fields.len());
    let mut seen = BTreeSet::new();
    for field in &config.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(invalid(format!("field '{}' declared twice", field.name)));
        }
        fields.push(compile_field(&name, field)?);
    }

    let schema = Schema {
        fields,
        primary_key: config.primary_key.clone(),
        unique_keys: config.unique_keys.clone(),
    };

    for key_field in schema.primary_key.iter().chain(schema.unique_keys.iter().flatten()) {
        if schema.field(key_field).is_none() {
            return Err(invalid(format!("key field '{}' is not declared", key_field)));
        }
    }

    let tolerance = config.tolerance.unwrap_or(defaults.tolerance);
    let rules = build_rules(&name, &schema, config, tolerance)?;

    Ok(DomainPolicy {
        name,
        description: config.description.clone(),
        schema,
        rules,
        thresholds,
        actions: config.actions.clone(),
    })
}

fn compile_field(domain: &DomainName, config: &FieldConfig) -> Result<FieldDefinition, ConfigError> {
    let rule = match (&config.format, config.field_type) {
        (Some(rule), _) => Some(rule.clone()),
        (None, FieldType::Enum) if !config.values.is_empty() => Some(FormatRule::OneOf {
            values: config.values.clone(),
        }),
        _ => None,
    };

    let format = rule
        .as_ref()
        .map(FormatValidator::compile)
        .transpose()
        .map_err(|e| ConfigError::InvalidPattern {
            domain: domain.to_string(),
            field: config.name.clone(),
            reason: e.to_string(),
        })?;

    let references = match (&config.references, config.field_type) {
        (Some(r), _) => Some(ForeignKey {
            domain: DomainName::new(&r.domain),
            field: r.field.clone(),
        }),
        (None, FieldType::ForeignKey) => {
            return Err(ConfigError::InvalidPolicy {
                domain: domain.to_string(),
                reason: format!("foreign key '{}' has no `references`", config.name),
            });
        }
        (None, _) => None,
    };

    let date_format = format
        .as_ref()
        .and_then(FormatValidator::date_format)
        .unwrap_or(DEFAULT_DATE_FORMAT)
        .to_string();

    Ok(FieldDefinition {
        name: config.name.clone(),
        field_type: config.field_type,
        // Foreign keys are typed once their target is known.
        value_type: match config.field_type {
            FieldType::ForeignKey => FieldType::String,
            other => other,
        },
        format,
        critical: config.critical,
        references,
        date_format,
    })
}

fn build_rules(
    domain: &DomainName,
    schema: &Schema,
    config: &DomainPolicyConfig,
    tolerance: f64,
) -> Result<Vec<Rule>, ConfigError> {
    let mut rules = Vec::new();

    // Completeness: one rule per critical field.
    for field in schema.fields.iter().filter(|f| f.critical) {
        rules.push(Rule::new(
            domain.clone(),
            RuleKind::Required {
                field: field.name.clone(),
            },
        ));
    }

    // Uniqueness: primary key, then declared unique keys.
    let mut keys: Vec<&Vec<String>> = Vec::new();
    if !schema.primary_key.is_empty() {
        keys.push(&schema.primary_key);
    }
    for key in &schema.unique_keys {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    for key in keys {
        rules.push(Rule::new(
            domain.clone(),
            RuleKind::UniqueKey {
                fields: key.clone(),
            },
        ));
    }

    // Validity: fields outside the primary key carrying a format validator.
    for field in &schema.fields {
        let Some(validator) = &field.format else {
            continue;
        };
        if schema.is_primary_key_field(&field.name) {
            warn!(
                domain = %domain,
                field = %field.name,
                "Format rule on a primary key field is never evaluated"
            );
        } else {
            rules.push(Rule::new(
                domain.clone(),
                RuleKind::Format {
                    field: field.name.clone(),
                    validator: validator.clone(),
                },
            ));
        }
    }

    // Consistency: record-local derived-value checks.
    let mut check_names = BTreeSet::new();
    for check in &config.consistency {
        if !check_names.insert(check.name.as_str()) {
            return Err(ConfigError::InvalidPolicy {
                domain: domain.to_string(),
                reason: format!("consistency check '{}' declared twice", check.name),
            });
        }
        rules.push(Rule::new(
            domain.clone(),
            RuleKind::Derived {
                name: check.name.clone(),
                check: compile_check(&check.check),
                tolerance,
            },
        ));
    }

    // Integrity: one rule per foreign key.
    for field in &schema.fields {
        if let Some(target) = &field.references {
            rules.push(Rule::new(
                domain.clone(),
                RuleKind::Reference {
                    field: field.name.clone(),
                    target: target.clone(),
                },
            ));
        }
    }

    Ok(rules)
}

fn compile_check(config: &ConsistencyKindConfig) -> ConsistencyCheck {
    match config {
        ConsistencyKindConfig::InCatalog { field, catalog } => ConsistencyCheck::InCatalog {
            field: field.clone(),
            catalog: catalog.iter().cloned().collect(),
        },
        ConsistencyKindConfig::SumEquals { target, items } => ConsistencyCheck::SumEquals {
            target: target.clone(),
            items: items.clone(),
        },
        ConsistencyKindConfig::ProductEquals { target, factors } => {
            ConsistencyCheck::ProductEquals {
                target: target.clone(),
                factors: factors.clone(),
            }
        }
        ConsistencyKindConfig::LengthEquals { field, length } => ConsistencyCheck::LengthEquals {
            field: field.clone(),
            length: *length,
        },
    }
}

/// Checks every foreign key target, then types foreign-key values like the key they point at.
fn resolve_references(domains: &mut BTreeMap<DomainName, DomainPolicy>) -> Result<(), ConfigError> {
    let mut resolved = Vec::new();
    for policy in domains.values() {
        for (index, field) in policy.schema.fields.iter().enumerate() {
            let Some(fk) = &field.references else {
                continue;
            };
            let target = domains
                .get(&fk.domain)
                .ok_or_else(|| ConfigError::DanglingReference {
                    domain: policy.name.to_string(),
                    field: field.name.clone(),
                    target: fk.domain.to_string(),
                })?;
            if target.schema.field(&fk.field).is_none() {
                return Err(ConfigError::InvalidPolicy {
                    domain: policy.name.to_string(),
                    reason: format!(
                        "field '{}' references '{}.{}', which is not declared",
                        field.name, fk.domain, fk.field
                    ),
                });
            }
            if field.field_type == FieldType::ForeignKey {
                resolved.push((policy.name.clone(), index, target_key_type(domains, fk)));
            }
        }
    }

    for (domain, index, value_type) in resolved {
        if let Some(field) = domains
            .get_mut(&domain)
            .and_then(|p| p.schema.fields.get_mut(index))
        {
            field.value_type = value_type;
        }
    }
    Ok(())
}

/// Follows chains of foreign keys down to a typed key. Chains that loop stay text.
fn target_key_type(domains: &BTreeMap<DomainName, DomainPolicy>, fk: &ForeignKey) -> FieldType {
    let hops: usize = domains.values().map(|p| p.schema.fields.len()).sum();
    let mut current = fk;
    for _ in 0..hops {
        let Some(target) = domains
            .get(&current.domain)
            .and_then(|p| p.schema.field(&current.field))
        else {
            break;
        };
        match (target.field_type, &target.references) {
            (FieldType::ForeignKey, Some(next)) => current = next,
            (FieldType::ForeignKey, None) => break,
            (typed, _) => return typed,
        }
    }
    FieldType::String
}
