use std::path::PathBuf;

use arg::{parse_args, Args};

use granular_distortion::{DistortionAlgorithm, EngineParameters};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

// -------------------------------------------------------------------------------------------------

/// Program arguments for the granular distortion demo applications.
#[derive(Args, Debug, Default)]
#[allow(unused)]
pub struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Write rendered audio into the given wav file. By default \"granular-distortion.wav\".
    pub output_path: Option<PathBuf>,
    #[arg(long = "seconds")]
    /// Length of the rendered test signal in seconds. By default 4 seconds.
    pub seconds: Option<f32>,
    #[arg(long = "seed")]
    /// Seed for the grain random generators. Random by default.
    pub seed: Option<u64>,
    #[arg(short = "d", long = "duration")]
    /// Grain duration in milliseconds (1 - 1000).
    pub grain_duration: Option<f32>,
    #[arg(short = "n", long = "density")]
    /// Number of overlapping grains (0.1 - 64).
    pub density: Option<f32>,
    #[arg(short = "a", long = "algorithm")]
    /// Distortion algorithm: \"SoftClip\", \"HardClip\", \"Diode\", \"Fuzz\" or \"Foldback\".
    pub algorithm: Option<DistortionAlgorithm>,
    #[arg(long = "drive")]
    /// Base drive amount (0 - 2).
    pub drive: Option<f32>,
    #[arg(long = "drive-variation")]
    /// Random per-grain drive variation (0 - 1).
    pub drive_variation: Option<f32>,
    #[arg(long = "algorithm-variation")]
    /// Pick a random distortion algorithm for each grain.
    pub algorithm_variation: bool,
    #[arg(short = "j", long = "jitter")]
    /// Maximum random grain position offset in milliseconds (0 - 1000).
    pub position_jitter: Option<f32>,
    #[arg(short = "m", long = "mix")]
    /// Dry/wet mix (0 - 1).
    pub mix: Option<f32>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    pub log_level: Option<log::Level>,
}

impl Arguments {
    /// Engine parameters with all passed values applied to the defaults.
    #[allow(unused)]
    pub fn engine_parameters(&self) -> EngineParameters {
        let defaults = EngineParameters::default();
        EngineParameters {
            grain_duration_ms: self.grain_duration.unwrap_or(defaults.grain_duration_ms),
            density: self.density.unwrap_or(defaults.density),
            algorithm: self.algorithm.unwrap_or(defaults.algorithm),
            drive: self.drive.unwrap_or(defaults.drive),
            drive_variation: self.drive_variation.unwrap_or(defaults.drive_variation),
            algorithm_variation: self.algorithm_variation,
            position_jitter_ms: self.position_jitter.unwrap_or(defaults.position_jitter_ms),
            mix: self.mix.unwrap_or(defaults.mix),
        }
    }
}

/// Parse demo arguments and apply the log-level arg to the logger
#[allow(unused)]
pub fn parse() -> Arguments {
    // Parse args
    let args = parse_args::<Arguments>();

    create_logger(args.log_level);
    args
}

// -------------------------------------------------------------------------------------------------

/// Create default logger from arguments. Invoked from `parse`.
#[allow(unused)]
pub fn create_logger(log_level: Option<log::Level>) {
    simple_logger::SimpleLogger::new()
        .with_level(log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");
}
