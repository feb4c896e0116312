// dataguard/src/commands/check.rs
//
// USE CASE: Validate the policy without touching any data.

use std::path::Path;

use dataguard_core::domain::DomainError;
use dataguard_core::domain::graph::ReferenceGraph;
use dataguard_core::domain::quality::Dimension;
use dataguard_core::infrastructure::config::load_policy_config;
use dataguard_core::{DataGuardError, PolicyRegistry};

pub fn execute(policy: &Path, print: bool) -> anyhow::Result<()> {
    println!("📋 Checking policy at {:?}...", policy);

    let config = match load_policy_config(policy) {
        Ok(config) => config,
        Err(e) => fail(e.into()),
    };
    let registry = match PolicyRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            // Configuration errors carry a code and help text worth showing in full.
            eprintln!("{:?}", miette::Report::new(e.clone()));
            fail(DomainError::from(e).into())
        }
    };

    println!("   Version {}", registry.version());
    for domain in registry.domains() {
        let counts: Vec<String> = Dimension::ALL
            .iter()
            .map(|d| format!("{}={}", d, domain.rules_for(*d).count()))
            .collect();
        println!(
            "   ➜ {} ({} fields) rules: {}",
            domain.name,
            domain.schema.fields.len(),
            counts.join(" ")
        );
    }

    let graph = ReferenceGraph::from_registry(&registry);
    let order = graph.load_layers(&registry.domain_names());
    let rendered: Vec<String> = order
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();
    println!("🔗 Snapshot load order: [{}]", rendered.join("] -> ["));

    let cyclic = graph.cyclic_members();
    if !cyclic.is_empty() {
        let names: Vec<String> = cyclic.iter().map(|d| d.to_string()).collect();
        println!("⚠️  Mutually referencing domains: {}", names.join(", "));
    }

    if print {
        println!("\n{}", config.to_yaml()?);
    }

    println!("✅ Policy is valid ({} domains)", registry.domain_names().len());
    Ok(())
}

fn fail(e: DataGuardError) -> ! {
    eprintln!("❌ Invalid policy: {}", e);
    std::process::exit(e.exit_code());
}
