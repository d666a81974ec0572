use anyhow::{Context, Result};
use clap::Parser;
use class_sealer::archive::{Layout, detect_layout, load_inputs, write_exploded, write_jars};
use class_sealer::classfile::ClassFile;
use class_sealer::cli::{Cli, Commands, ReportFormat};
use class_sealer::config::{SealConfig, seal_options};
use class_sealer::pass::{Change, SealPass};
use class_sealer::stats::Stats;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.clone() {
        Commands::Seal {
            inputs,
            out,
            units,
            no_final,
            no_seal,
            format,
        } => {
            let options = seal_options(&units, no_final, no_seal, &cli.log);
            let config = SealConfig::from_options(&options).context("Invalid seal options")?;
            let report = seal(config, &inputs, &out)?;
            write_report(&report, format)?;
        }
        Commands::Inspect { class_file } => {
            let bytes = std::fs::read(&class_file)
                .with_context(|| format!("Failed to read {}", class_file.display()))?;
            let class = ClassFile::parse(&bytes)
                .with_context(|| format!("Failed to parse class file: {}", class_file.display()))?;
            println!("{}", serde_json::to_string_pretty(&class)?);
        }
    }

    Ok(())
}

/// Diagnostics filter by their own level, so the subscriber lets everything through.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .init();
}

#[derive(Debug, Serialize)]
struct SealReport {
    inputs: Vec<String>,
    out: String,
    entries: usize,
    outputs: Vec<String>,
    duration_ms: u64,
    stats: Stats,
    changes: Vec<Change>,
}

fn seal(config: SealConfig, inputs: &[PathBuf], out: &Path) -> Result<SealReport> {
    let start = Instant::now();
    let layout = detect_layout(inputs)?;
    let entries = load_inputs(inputs)?;
    let output = SealPass::new(config).run(entries)?;

    let outputs = match layout {
        Layout::Jars => write_jars(out, &output.entries)?
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        Layout::Exploded => {
            write_exploded(out, &output.entries)?;
            vec![out.to_string_lossy().to_string()]
        }
    };

    Ok(SealReport {
        inputs: inputs
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        out: out.to_string_lossy().to_string(),
        entries: output.entries.len(),
        outputs,
        duration_ms: start.elapsed().as_millis() as u64,
        stats: output.stats,
        changes: output.changes,
    })
}

fn render_report(report: &SealReport, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Text => {
            let mut out = report.stats.summary();
            out.push_str(&format!("entries: {}\n", report.entries));
            out.push_str(&format!("duration_ms: {}\n", report.duration_ms));
            for change in &report.changes {
                out.push_str(&format!("- {}: {}\n", change.path, change.decision));
            }
            out
        }
    })
}

fn write_report(report: &SealReport, format: ReportFormat) -> Result<()> {
    let content = render_report(report, format).context("Failed to render report")?;
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
