//! Science mode identification and resolution (C7).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// The distinct acquisition modes a science CSV file or packet stream can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    NormalE8,
    NormalE2,
    Burst128,
    Burst64,
    IAlirt,
}

impl Mode {
    /// The name used in generated CSV filenames and in `ModeConfig::from_tag`.
    pub fn tag(&self) -> &'static str {
        match self {
            Mode::NormalE8 => "NormalE8",
            Mode::NormalE2 => "NormalE2",
            Mode::Burst128 => "BurstE128",
            Mode::Burst64 => "BurstE64",
            Mode::IAlirt => "IAlirt",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "NormalE8" => Some(Mode::NormalE8),
            "NormalE2" => Some(Mode::NormalE2),
            "BurstE128" => Some(Mode::Burst128),
            "BurstE64" => Some(Mode::Burst64),
            "IAlirt" => Some(Mode::IAlirt),
            _ => None,
        }
    }

    /// Default per-packet timing tolerance, in seconds, used by the gap
    /// checker when none is given explicitly. I-ALiRT's tighter real-time
    /// delivery budget gets a much looser tolerance than science telemetry.
    pub fn default_time_tolerance(&self) -> f64 {
        match self {
            Mode::IAlirt => 0.05,
            _ => 0.00059,
        }
    }

    /// Expected increment between consecutive packets' sequence counters.
    /// I-ALiRT's real-time path steps by 4; every other mode steps by 1.
    pub fn sequence_counter_step(&self) -> u16 {
        match self {
            Mode::IAlirt => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"MAG\w+-(\w+)-\(([0-9]+),([0-9]+)\)-([0-9]+)s-\w+-\w+").unwrap()
    })
}

/// Vectors-per-second rate encoded by a packet's 3-bit `PRI_VECSEC` /
/// `SEC_VECSEC` field.
pub fn vectors_per_second(rate_code: u8) -> f64 {
    const TABLE: [f64; 8] = [0.125, 0.5, 1.0, 2.0, 4.0, 8.0, 64.0, 128.0];
    TABLE[(rate_code & 0x7) as usize]
}

/// Resolved configuration for a single science stream: the mode, its
/// primary/secondary sample rates, the reporting cadence, and the row
/// count expected per packet.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeConfig {
    pub mode: Mode,
    pub primary_rate: u32,
    pub secondary_rate: u32,
    pub seconds_per_packet: u32,
    pub sequence_counter_step: u16,
}

impl ModeConfig {
    pub fn from_mode(mode: Mode, primary_rate: u32, secondary_rate: u32, seconds_per_packet: u32) -> Self {
        ModeConfig {
            mode,
            primary_rate,
            secondary_rate,
            seconds_per_packet,
            sequence_counter_step: mode.sequence_counter_step(),
        }
    }

    /// Parse a `ModeConfig` out of a generated science CSV filename, e.g.
    /// `MAGScience-NormalE8-(8,8)-1s-2024-01-01T00:00:00.csv`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let caps = filename_regex().captures(filename)?;
        let mode = Mode::from_tag(&caps[1])?;
        let primary_rate = caps[2].parse().ok()?;
        let secondary_rate = caps[3].parse().ok()?;
        let seconds_per_packet = caps[4].parse().ok()?;
        Some(ModeConfig::from_mode(mode, primary_rate, secondary_rate, seconds_per_packet))
    }

    /// Rows contributed per packet: the faster of the two sensors times the
    /// packet's reporting cadence.
    pub fn rows_per_packet(&self) -> u32 {
        self.primary_rate.max(self.secondary_rate) * self.seconds_per_packet
    }

    pub fn default_time_tolerance(&self) -> f64 {
        self.mode.default_time_tolerance()
    }
}
