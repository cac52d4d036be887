use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mag_science_decoder::{check, ModeConfig};

#[derive(Parser, Debug)]
#[command(
    about = "Check a decoded IMAP MAG science CSV for sequence gaps, timing drift, and malformed vectors."
)]
struct Opt {
    /// Decoded science CSV to check. Its filename must match the
    /// `MAGScience-<mode>-(<primary>,<secondary>)-<secs>s-<timestamp>.csv`
    /// naming convention so the mode and cadence can be recovered.
    input: PathBuf,

    /// Where to write the human-readable report. Defaults to stdout.
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Overwrite an existing report file
    #[arg(short, long)]
    force: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let opt = Opt::parse();

    stderrlog::new()
        .module(module_path!())
        .module("mag_science_decoder")
        .quiet(false)
        .verbosity(opt.verbose as usize)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    if let Some(report) = &opt.report {
        if report.exists() && !opt.force {
            anyhow::bail!(
                "{:?} already exists; pass --force to overwrite",
                report
            );
        }
    }

    let filename = opt
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .context("input path has no filename")?;
    let config = ModeConfig::from_filename(filename)
        .with_context(|| format!("{:?} doesn't match the science CSV naming convention", filename))?;

    let file = File::open(&opt.input).with_context(|| format!("failed to open {:?}", opt.input))?;
    let report = check(file, &config)?;

    let mut lines: Vec<String> = report.findings.iter().map(|f| f.to_string()).collect();
    lines.push(report.summary_line());

    match &opt.report {
        Some(path) => std::fs::write(path, lines.join("\n") + "\n")
            .with_context(|| format!("failed to write {:?}", path))?,
        None => {
            for line in &lines {
                println!("{line}");
            }
        }
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}
