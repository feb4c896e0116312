// dataguard/src/commands/evaluate.rs
//
// USE CASE: Evaluate domain snapshots against the policy and gate on the verdict.

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::collections::BTreeSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use dataguard_core::application::DomainStatus;
use dataguard_core::infrastructure::adapters::DirectoryProvider;
use dataguard_core::infrastructure::config::load_registry;
use dataguard_core::infrastructure::fs::write_report;
use dataguard_core::{DataGuardError, DomainName, EvaluationOrchestrator, Report, RunOptions};

use crate::cli::EvaluateArgs;

pub async fn execute(args: EvaluateArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    println!("📋 Loading policy from {:?}...", args.policy);
    let registry = match load_registry(&args.policy) {
        Ok(registry) => registry,
        Err(e) => fail(e),
    };

    let provider = DirectoryProvider::new(&args.data_dir)
        .with_context(|| format!("Failed to scan data directory {:?}", args.data_dir))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling evaluation");
            interrupt.cancel();
        }
    });

    let mut options = RunOptions::default()
        .with_context(args.context)
        .with_scope(args.scope)
        .with_workers(args.workers)
        .with_cancellation(cancel);
    if let Some(as_of) = args.as_of {
        options = options.with_as_of(as_of);
    }
    if let Some(limit) = args.max_records {
        options = options.with_record_limit(limit);
    }

    let domains: BTreeSet<DomainName> = args.domains.iter().map(DomainName::new).collect();

    println!(
        "🛡️  Evaluating {} in '{}' context...",
        if domains.is_empty() {
            "all domains".to_string()
        } else {
            format!("{} domain(s)", domains.len())
        },
        options.context
    );

    let orchestrator = EvaluationOrchestrator::new(registry);
    let report = match orchestrator.run(&domains, &provider, &options).await {
        Ok(report) => report,
        Err(e) => fail(DataGuardError::from(e)),
    };

    println!("{}", summary_table(&report));

    for note in &report.diagnostics {
        eprintln!("⚠️  {}", note);
    }

    if !report.actions.is_empty() {
        println!("🔧 Remediation plan:");
        for (action, dispatched) in report.remediation_plan() {
            println!("   ➜ {}: {} descriptor(s)", action, dispatched.len());
        }
    }

    if let Some(path) = &args.output {
        write_report(path, &report)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        println!("📝 Report written to {:?}", path);
    }

    let duration = start.elapsed();
    if report.passed {
        println!("\n✨ All domains within thresholds in {:.2?}", duration);
        Ok(())
    } else {
        let failing: Vec<String> = report
            .domains
            .iter()
            .filter(|(_, d)| !d.passed)
            .map(|(name, _)| name.to_string())
            .collect();
        eprintln!(
            "\n❌ QUALITY GATE FAILED after {:.2?}: {}",
            duration,
            failing.join(", ")
        );
        std::process::exit(1);
    }
}

fn fail(e: DataGuardError) -> ! {
    eprintln!("\n💥 EVALUATION ABORTED: {}", e);
    std::process::exit(e.exit_code());
}

/// One row per (domain, dimension); aborted domains get a single row with the reason.
pub fn summary_table(report: &Report) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Domain",
            "Dimension",
            "Violations",
            "Evaluated",
            "Ratio",
            "Threshold",
            "Score",
            "Status",
        ]);

    for (name, domain) in &report.domains {
        if let DomainStatus::Aborted { reason } = &domain.status {
            table.add_row(vec![
                Cell::new(name),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new(format!("ABORTED: {}", reason)).fg(Color::Red),
            ]);
            continue;
        }

        for (dimension, score) in &domain.dimensions {
            let status = match (&score.unavailable, score.passed) {
                (Some(reason), _) => Cell::new(format!("UNAVAILABLE: {}", reason)).fg(Color::Red),
                (None, true) => Cell::new("PASS").fg(Color::Green),
                (None, false) => Cell::new("FAIL").fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(dimension),
                Cell::new(score.violations),
                Cell::new(score.evaluated),
                Cell::new(format!("{:.4}", score.ratio)),
                Cell::new(format!("{:.4}", score.threshold.as_f64())),
                Cell::new(format!("{:.1}%", score.score() * 100.0)),
                status,
            ]);
        }
    }

    table
}
