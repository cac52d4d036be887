use anyhow::{Context, Result};
use clap::Parser;
use mag_science_decoder::{decode_stream, Mode, ModeConfig};
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    about = "Decode a raw CCSDS capture of IMAP MAG science packets into per-mode CSV files."
)]
struct Opt {
    /// Raw CCSDS telemetry capture to decode
    input: PathBuf,

    /// Directory to write the decoded science CSV file(s) into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Science mode this capture was recorded in
    #[arg(short, long, value_enum)]
    mode: CliMode,

    /// Primary sensor sample rate, in vectors per second
    #[arg(long)]
    primary_rate: u32,

    /// Secondary sensor sample rate, in vectors per second
    #[arg(long)]
    secondary_rate: u32,

    /// Seconds of data covered by each packet
    #[arg(long, default_value_t = 1)]
    seconds_per_packet: u32,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliMode {
    NormalE8,
    NormalE2,
    Burst128,
    Burst64,
    IAlirt,
}

impl From<CliMode> for Mode {
    fn from(m: CliMode) -> Mode {
        match m {
            CliMode::NormalE8 => Mode::NormalE8,
            CliMode::NormalE2 => Mode::NormalE2,
            CliMode::Burst128 => Mode::Burst128,
            CliMode::Burst64 => Mode::Burst64,
            CliMode::IAlirt => Mode::IAlirt,
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    stderrlog::new()
        .module(module_path!())
        .module("mag_science_decoder")
        .quiet(false)
        .verbosity(opt.verbose as usize)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    create_dir_all(&opt.output_dir)
        .with_context(|| format!("failed to create {:?}", opt.output_dir))?;

    let file = File::open(&opt.input).with_context(|| format!("failed to open {:?}", opt.input))?;
    let config = ModeConfig::from_mode(
        opt.mode.into(),
        opt.primary_rate,
        opt.secondary_rate,
        opt.seconds_per_packet,
    );

    let summary = decode_stream(file, &opt.output_dir, config)
        .with_context(|| format!("failed to decode {:?}", opt.input))?;

    log::info!(
        "decoded {} packet(s) ({} skipped) into {} row(s) across {} file(s)",
        summary.packets_processed,
        summary.packets_skipped,
        summary.rows_written,
        summary.files_written.len(),
    );
    for path in &summary.files_written {
        println!("{}", path.display());
    }

    Ok(())
}
