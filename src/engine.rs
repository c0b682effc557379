//! The granular distortion engine: fragments a mono input stream into short, enveloped and
//! individually distorted grains and mixes them back with the dry signal.

use std::sync::LazyLock;

use four_cc::FourCC;
use strum::EnumCount;

use crate::{
    parameter::{
        BooleanParameter, BooleanParameterValue, EnumParameter, EnumParameterValue,
        FloatParameter, FloatParameterValue, ParameterValueUpdate, SmoothedParameterValue,
    },
    utils::smoothing::{ExponentialSmoothedValue, LinearSmoothedValue},
    ClonableParameter, Error,
};

// -------------------------------------------------------------------------------------------------

mod history;
mod pool;
mod scheduler;
mod shaper;
mod window;

pub use pool::{GrainHandle, GrainSlot, GrainSlotPool};
pub use shaper::{DistortionAlgorithm, GrainShaper, MAX_DRIVE};

use history::HistoryBuffer;
use scheduler::TriggerScheduler;
use window::GRAIN_WINDOW;

/// Number of grain slots in each engine.
const GRAIN_POOL_SIZE: usize = 32;

// -------------------------------------------------------------------------------------------------

/// Plain value snapshot of all engine parameters.
///
/// Values are not validated here: they get clamped when applied to an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParameters {
    /// Length of a single grain in milliseconds.
    pub grain_duration_ms: f32,
    /// Target number of simultaneously sounding grains.
    pub density: f32,
    /// Distortion algorithm of all grains, unless algorithm variation is enabled.
    pub algorithm: DistortionAlgorithm,
    /// Base drive amount of all grains.
    pub drive: f32,
    /// Random per-grain drive deviation in range `0..=1`.
    pub drive_variation: f32,
    /// When enabled, each grain picks a random distortion algorithm.
    pub algorithm_variation: bool,
    /// Maximum random read offset into the input history in milliseconds.
    pub position_jitter_ms: f32,
    /// Dry/wet mix in range `0..=1`.
    pub mix: f32,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            grain_duration_ms: DistortionEngine::DURATION.default_value(),
            density: DistortionEngine::DENSITY.default_value(),
            algorithm: DistortionAlgorithm::default(),
            drive: DistortionEngine::DRIVE.default_value(),
            drive_variation: DistortionEngine::DRIVE_VARIATION.default_value(),
            algorithm_variation: DistortionEngine::ALGORITHM_VARIATION.default_value(),
            position_jitter_ms: DistortionEngine::JITTER.default_value(),
            mix: DistortionEngine::MIX.default_value(),
        }
    }
}

/// Descriptors of all engine parameters, including their string display options.
///
/// Used to build an engine's parameter values, and to apply host updates to plain
/// [`EngineParameters`] snapshots without an engine.
#[derive(Debug, Clone)]
pub(crate) struct EngineParameterDescriptors {
    grain_duration: FloatParameter,
    density: FloatParameter,
    algorithm: EnumParameter,
    drive: FloatParameter,
    drive_variation: FloatParameter,
    algorithm_variation: BooleanParameter,
    position_jitter: FloatParameter,
    mix: FloatParameter,
}

impl EngineParameterDescriptors {
    pub fn new() -> Self {
        let to_string_percent = |v: f32| format!("{:.2}", v * 100.0);
        let from_string_percent = |v: &str| v.parse::<f32>().map(|f| f / 100.0).ok();
        Self {
            grain_duration: DistortionEngine::DURATION,
            density: DistortionEngine::DENSITY,
            algorithm: EnumParameter::new(
                DistortionEngine::ALGORITHM_ID,
                "Algorithm",
                DistortionAlgorithm::default(),
            ),
            drive: DistortionEngine::DRIVE,
            drive_variation: DistortionEngine::DRIVE_VARIATION
                .with_unit("%")
                .with_display(to_string_percent, from_string_percent),
            algorithm_variation: DistortionEngine::ALGORITHM_VARIATION,
            position_jitter: DistortionEngine::JITTER,
            mix: DistortionEngine::MIX
                .with_unit("%")
                .with_display(to_string_percent, from_string_percent),
        }
    }

    /// All descriptors, in host registration order.
    pub fn list(&self) -> Vec<&dyn ClonableParameter> {
        vec![
            &self.grain_duration,
            &self.density,
            &self.algorithm,
            &self.drive,
            &self.drive_variation,
            &self.algorithm_variation,
            &self.position_jitter,
            &self.mix,
        ]
    }

    /// Copy of the given snapshot with all values clamped into their parameter ranges.
    pub fn clamp(&self, parameters: &EngineParameters) -> EngineParameters {
        EngineParameters {
            grain_duration_ms: self.grain_duration.clamp_value(parameters.grain_duration_ms),
            density: self.density.clamp_value(parameters.density),
            algorithm: parameters.algorithm,
            drive: self.drive.clamp_value(parameters.drive),
            drive_variation: self.drive_variation.clamp_value(parameters.drive_variation),
            algorithm_variation: parameters.algorithm_variation,
            position_jitter_ms: self.position_jitter.clamp_value(parameters.position_jitter_ms),
            mix: self.mix.clamp_value(parameters.mix),
        }
    }

    /// Apply a raw or normalized value update to the given parameter snapshot.
    pub fn apply_update(
        &self,
        parameters: &mut EngineParameters,
        id: FourCC,
        update: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        fn assign<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        match id {
            DistortionEngine::DURATION_ID => assign(
                &mut parameters.grain_duration_ms,
                self.grain_duration.value_from_update(update),
            ),
            DistortionEngine::DENSITY_ID => assign(
                &mut parameters.density,
                self.density.value_from_update(update),
            ),
            DistortionEngine::ALGORITHM_ID => assign(
                &mut parameters.algorithm,
                self.algorithm.value_from_update(update),
            ),
            DistortionEngine::DRIVE_ID => {
                assign(&mut parameters.drive, self.drive.value_from_update(update))
            }
            DistortionEngine::DRIVE_VARIATION_ID => assign(
                &mut parameters.drive_variation,
                self.drive_variation.value_from_update(update),
            ),
            DistortionEngine::ALGORITHM_VARIATION_ID => assign(
                &mut parameters.algorithm_variation,
                self.algorithm_variation.value_from_update(update),
            ),
            DistortionEngine::JITTER_ID => assign(
                &mut parameters.position_jitter_ms,
                self.position_jitter.value_from_update(update),
            ),
            DistortionEngine::MIX_ID => {
                assign(&mut parameters.mix, self.mix.value_from_update(update))
            }
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown granular distortion parameter: '{id}'"
                )))
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Mono, real-time granular distortion engine.
///
/// Input samples are written into a rolling history buffer. A trigger scheduler spawns new grains
/// at a rate which keeps about `density` grains sounding at once. Each grain reads a delayed
/// section of the history, shapes it with its own randomly assigned distortion algorithm and drive,
/// and gets faded in and out with a raised cosine window. The sum of all grains is mixed with the
/// dry input.
///
/// Call [`Self::prepare`] once before processing: it allocates the history buffer. All other
/// functions, including [`Self::process`] and [`Self::reset`], never allocate, lock or block.
///
/// Use one engine per channel for multichannel audio.
#[derive(Debug)]
pub struct DistortionEngine {
    sample_rate: u32,
    grain_duration: FloatParameterValue,
    density: FloatParameterValue,
    algorithm: EnumParameterValue<DistortionAlgorithm>,
    drive: SmoothedParameterValue<LinearSmoothedValue>,
    drive_variation: FloatParameterValue,
    algorithm_variation: BooleanParameterValue,
    position_jitter: FloatParameterValue,
    mix: SmoothedParameterValue<ExponentialSmoothedValue>,
    history: HistoryBuffer,
    pool: GrainSlotPool<GRAIN_POOL_SIZE>,
    scheduler: TriggerScheduler,
    /// Samples processed since the last reset. Used as grain start time.
    sample_index: u64,
    /// Non finite input samples received since the engine got prepared.
    invalid_input_count: u64,
}

impl DistortionEngine {
    /// Maximum number of simultaneously playing grains.
    pub const MAX_GRAINS: usize = GRAIN_POOL_SIZE;

    /// Supported sample rate range. Sample rates passed to `prepare` are clamped to this range.
    pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;

    pub const DURATION_ID: FourCC = FourCC(*b"dur ");
    pub const DENSITY_ID: FourCC = FourCC(*b"dens");
    pub const ALGORITHM_ID: FourCC = FourCC(*b"algo");
    pub const DRIVE_ID: FourCC = FourCC(*b"driv");
    pub const DRIVE_VARIATION_ID: FourCC = FourCC(*b"dvar");
    pub const ALGORITHM_VARIATION_ID: FourCC = FourCC(*b"avar");
    pub const JITTER_ID: FourCC = FourCC(*b"jitr");
    pub const MIX_ID: FourCC = FourCC(*b"mix ");

    pub const DURATION: FloatParameter =
        FloatParameter::new(Self::DURATION_ID, "Duration", 1.0..=1000.0, 50.0).with_unit("ms");
    pub const DENSITY: FloatParameter =
        FloatParameter::new(Self::DENSITY_ID, "Density", 0.1..=64.0, 4.0);
    pub const DRIVE: FloatParameter =
        FloatParameter::new(Self::DRIVE_ID, "Drive", 0.0..=MAX_DRIVE, 0.5).with_unit("x");
    pub const DRIVE_VARIATION: FloatParameter =
        FloatParameter::new(Self::DRIVE_VARIATION_ID, "Drive Variation", 0.0..=1.0, 0.0);
    pub const ALGORITHM_VARIATION: BooleanParameter =
        BooleanParameter::new(Self::ALGORITHM_VARIATION_ID, "Algorithm Variation", false);
    pub const JITTER: FloatParameter =
        FloatParameter::new(Self::JITTER_ID, "Position Jitter", 0.0..=1000.0, 0.0).with_unit("ms");
    pub const MIX: FloatParameter = FloatParameter::new(Self::MIX_ID, "Mix", 0.0..=1.0, 1.0);

    /// Create a new engine with default parameters and a randomly seeded random generator.
    ///
    /// The engine must be prepared before it can produce grains: unprepared engines pass the
    /// input through unchanged.
    pub fn new() -> Self {
        Self::with_scheduler(TriggerScheduler::new())
    }

    /// Create a new engine with default parameters and a deterministically seeded random generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_scheduler(TriggerScheduler::with_seed(seed))
    }

    fn with_scheduler(scheduler: TriggerScheduler) -> Self {
        let descriptors = EngineParameterDescriptors::new();

        let sample_rate = 44100;
        let grain_duration = FloatParameterValue::from_description(descriptors.grain_duration);
        let density = FloatParameterValue::from_description(descriptors.density);
        let algorithm = EnumParameterValue::from_description(descriptors.algorithm);
        let drive = SmoothedParameterValue::from_description(descriptors.drive)
            .with_smoother(LinearSmoothedValue::with_step(0.0, 0.01, sample_rate));
        let drive_variation = FloatParameterValue::from_description(descriptors.drive_variation);
        let algorithm_variation =
            BooleanParameterValue::from_description(descriptors.algorithm_variation);
        let position_jitter = FloatParameterValue::from_description(descriptors.position_jitter);
        let mix = SmoothedParameterValue::from_description(descriptors.mix)
            .with_smoother(ExponentialSmoothedValue::with_inertia(1.0, 0.1, sample_rate));

        let history = HistoryBuffer::default();
        let pool = GrainSlotPool::new();
        let sample_index = 0;
        let invalid_input_count = 0;

        Self {
            sample_rate,
            grain_duration,
            density,
            algorithm,
            drive,
            drive_variation,
            algorithm_variation,
            position_jitter,
            mix,
            history,
            pool,
            scheduler,
            sample_index,
            invalid_input_count,
        }
    }

    /// Descriptors of all engine parameters, e.g. to register them as automatable parameters in
    /// a host.
    pub fn parameter_descriptors(&self) -> Vec<&dyn ClonableParameter> {
        vec![
            self.grain_duration.description(),
            self.density.description(),
            self.algorithm.description(),
            self.drive.description(),
            self.drive_variation.description(),
            self.algorithm_variation.description(),
            self.position_jitter.description(),
            self.mix.description(),
        ]
    }

    /// Sample rate the engine got prepared with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Has the engine been prepared?
    pub fn is_prepared(&self) -> bool {
        self.history.capacity() > 0
    }

    /// One-time setup for processing at the given sample rate. Allocates the history buffer on the
    /// first call, then resets the engine and its invalid input counter.
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.sample_rate = sample_rate.clamp(
            *Self::SAMPLE_RATE_RANGE.start(),
            *Self::SAMPLE_RATE_RANGE.end(),
        );
        if self.sample_rate != sample_rate {
            log::warn!(
                "Unsupported sample rate {sample_rate}, processing at {} instead",
                self.sample_rate
            );
        }
        if !self.is_prepared() {
            self.history = HistoryBuffer::new(Self::max_history_len());
        }
        LazyLock::force(&GRAIN_WINDOW);
        self.drive.set_sample_rate(self.sample_rate);
        self.mix.set_sample_rate(self.sample_rate);
        self.invalid_input_count = 0;
        self.reset();
        log::debug!(
            "Prepared granular distortion at {} Hz, max block size {max_block_size}, history capacity {}",
            self.sample_rate,
            self.history.capacity()
        );
    }

    /// Immediately stop all grains, forget the input history and restart the trigger scheduler.
    /// Smoothed parameters jump to their targets.
    pub fn reset(&mut self) {
        self.clear_state();
        self.drive.snap_to_target();
        self.mix.snap_to_target();
    }

    /// Deterministically reseed the engine's random generator.
    pub fn seed(&mut self, seed: u64) {
        self.scheduler.seed(seed);
    }

    /// Number of currently playing grains.
    pub fn active_grain_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Number of non finite input samples which got dropped since the engine got prepared.
    ///
    /// `process` never logs, so hosts should poll this outside of the audio thread to report
    /// invalid input.
    pub fn invalid_input_count(&self) -> u64 {
        self.invalid_input_count
    }

    // ---------------------------------------------------------------------------------------------

    /// Current grain duration in milliseconds.
    pub fn grain_duration(&self) -> f32 {
        self.grain_duration.value()
    }
    /// Set grain duration in milliseconds, clamped to `1..=1000`.
    pub fn set_grain_duration(&mut self, duration_ms: f32) {
        self.grain_duration.set_value_clamped(duration_ms);
    }

    /// Current grain density.
    pub fn density(&self) -> f32 {
        self.density.value()
    }
    /// Set number of simultaneously sounding grains, clamped to `0.1..=64`.
    pub fn set_density(&mut self, density: f32) {
        self.density.set_value_clamped(density);
    }

    /// Current base distortion algorithm.
    pub fn algorithm(&self) -> DistortionAlgorithm {
        *self.algorithm.value()
    }
    /// Set distortion algorithm, which is used when algorithm variation is disabled.
    pub fn set_algorithm(&mut self, algorithm: DistortionAlgorithm) {
        self.algorithm.set_value(algorithm);
    }

    /// Target base drive amount.
    pub fn drive(&self) -> f32 {
        self.drive.target_value()
    }
    /// Set base drive amount, clamped to `0..=2`. Changes are smoothed.
    pub fn set_drive(&mut self, drive: f32) {
        self.drive.set_target_value_clamped(drive);
    }

    /// Current drive variation amount.
    pub fn drive_variation(&self) -> f32 {
        self.drive_variation.value()
    }
    /// Set random per-grain drive deviation, clamped to `0..=1`.
    pub fn set_drive_variation(&mut self, variation: f32) {
        self.drive_variation.set_value_clamped(variation);
    }

    /// Is algorithm variation enabled?
    pub fn algorithm_variation(&self) -> bool {
        self.algorithm_variation.value()
    }
    /// Enable or disable random per-grain algorithm selection.
    pub fn set_algorithm_variation(&mut self, enabled: bool) {
        self.algorithm_variation.set_value(enabled);
    }

    /// Current position jitter in milliseconds.
    pub fn position_jitter(&self) -> f32 {
        self.position_jitter.value()
    }
    /// Set maximum random grain read offset in milliseconds, clamped to `0..=1000`.
    pub fn set_position_jitter(&mut self, jitter_ms: f32) {
        self.position_jitter.set_value_clamped(jitter_ms);
    }

    /// Target dry/wet mix.
    pub fn mix(&self) -> f32 {
        self.mix.target_value()
    }
    /// Set dry/wet mix, clamped to `0..=1`. Changes are smoothed.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target_value_clamped(mix);
    }

    /// Snapshot of all current parameter values.
    pub fn parameters(&self) -> EngineParameters {
        EngineParameters {
            grain_duration_ms: self.grain_duration(),
            density: self.density(),
            algorithm: self.algorithm(),
            drive: self.drive(),
            drive_variation: self.drive_variation(),
            algorithm_variation: self.algorithm_variation(),
            position_jitter_ms: self.position_jitter(),
            mix: self.mix(),
        }
    }

    /// Apply all values of the given parameter snapshot, clamping each into its valid range.
    pub fn set_parameters(&mut self, parameters: &EngineParameters) {
        self.set_grain_duration(parameters.grain_duration_ms);
        self.set_density(parameters.density);
        self.set_algorithm(parameters.algorithm);
        self.set_drive(parameters.drive);
        self.set_drive_variation(parameters.drive_variation);
        self.set_algorithm_variation(parameters.algorithm_variation);
        self.set_position_jitter(parameters.position_jitter_ms);
        self.set_mix(parameters.mix);
    }

    /// Apply a raw or normalized parameter value update for the parameter with the given id.
    pub fn apply_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        match id {
            Self::DURATION_ID => self.grain_duration.apply_update(value),
            Self::DENSITY_ID => self.density.apply_update(value),
            Self::ALGORITHM_ID => self.algorithm.apply_update(value),
            Self::DRIVE_ID => self.drive.apply_update(value),
            Self::DRIVE_VARIATION_ID => self.drive_variation.apply_update(value),
            Self::ALGORITHM_VARIATION_ID => self.algorithm_variation.apply_update(value),
            Self::JITTER_ID => self.position_jitter.apply_update(value),
            Self::MIX_ID => self.mix.apply_update(value),
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown granular distortion parameter: '{id}'"
                )))
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------

    /// Process a block of samples in-place. Equal to calling [`Self::process`] for each sample.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Process a single sample.
    ///
    /// Non finite input samples clear all grains, the input history and the trigger scheduler,
    /// and produce silence. They are counted in [`Self::invalid_input_count`]. Processing resumes
    /// normally with the next valid sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if !self.is_prepared() {
            return input;
        }
        if !input.is_finite() {
            self.invalid_input_count += 1;
            self.clear_state();
            return 0.0;
        }

        let drive = self.drive.next_value();
        let mix = self.mix.next_value();

        self.history.write(input);
        if self.scheduler.evaluate(self.trigger_interval()) {
            self.trigger_grain(drive);
        }

        let newest_position = self.history.write_count() - 1;
        let history = &self.history;
        let window = &*GRAIN_WINDOW;
        let mut wet = 0.0;
        self.pool.advance_active(|slot| {
            let offset = newest_position.saturating_sub(slot.read_position()) as usize;
            let sample = slot.shaper().shape(history.read(offset));
            wet += sample * window.lookup(slot.phase());
        });
        wet *= self.wet_gain();
        self.sample_index += 1;

        (1.0 - mix) * input + mix * wet
    }

    // ---------------------------------------------------------------------------------------------

    /// History length needed for the longest grain plus the largest jitter at the maximum sample
    /// rate.
    fn max_history_len() -> usize {
        let max_ms = Self::DURATION.range().end() + Self::JITTER.range().end();
        (max_ms as f64 * *Self::SAMPLE_RATE_RANGE.end() as f64 / 1000.0).ceil() as usize
    }

    #[inline]
    fn ms_to_samples(&self, ms: f32) -> f64 {
        ms as f64 * self.sample_rate as f64 / 1000.0
    }

    /// Samples between two grain triggers, so that `density` grains overlap on average.
    #[inline]
    fn trigger_interval(&self) -> f64 {
        self.ms_to_samples(self.grain_duration.value()) / self.density.value() as f64
    }

    /// Wet sum normalization. A Hann window's mean is 0.5, so `density` grains sum up to
    /// `0.5 * density` on average.
    #[inline]
    fn wet_gain(&self) -> f32 {
        1.0 / (0.5 * self.density.value()).max(1.0)
    }

    fn trigger_grain(&mut self, base_drive: f32) {
        let handle = self.pool.acquire(self.sample_index);

        let jitter_samples = self.ms_to_samples(self.position_jitter.value());
        let jitter_offset = if jitter_samples > 0.0 {
            let offset = (self.scheduler.random_unit() * jitter_samples).round() as u64;
            offset.min(self.history.max_read_offset() as u64)
        } else {
            0
        };
        let start_position = (self.history.write_count() - 1) - jitter_offset;

        let drive_variation = self.drive_variation.value();
        let drive = if drive_variation > 0.0 {
            base_drive + drive_variation * self.scheduler.random_bipolar()
        } else {
            base_drive
        };
        let algorithm = if self.algorithm_variation.value() {
            let index = self.scheduler.random_index(DistortionAlgorithm::COUNT);
            DistortionAlgorithm::from_index(index)
        } else {
            *self.algorithm.value()
        };
        let mut shaper = GrainShaper::new();
        shaper.configure(algorithm, drive);

        let length = self.ms_to_samples(self.grain_duration.value()).max(2.0);
        self.pool.slot_mut(handle).configure(start_position, length, shaper);
    }

    fn clear_state(&mut self) {
        self.pool.release_all();
        self.history.reset();
        self.scheduler.reset();
        self.sample_index = 0;
    }
}

impl Default for DistortionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    /// Serializes tests which check the global allocation violation counter.
    #[cfg(all(debug_assertions, feature = "assert-allocs"))]
    static ALLOCATION_CHECK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// Run `f` and fail when it attempted to allocate.
    #[cfg(all(debug_assertions, feature = "assert-allocs"))]
    fn assert_allocation_free<F: FnOnce()>(context: &str, f: F) {
        let _guard = ALLOCATION_CHECK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        assert_no_alloc::reset_violation_count();
        assert_no_alloc::assert_no_alloc(f);
        assert_eq!(assert_no_alloc::violation_count(), 0, "{context} allocated");
    }

    fn prepared_engine(seed: u64) -> DistortionEngine {
        let mut engine = DistortionEngine::with_seed(seed);
        engine.prepare(SAMPLE_RATE, 512);
        engine
    }

    fn sine(frequency: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin() * 0.5
            })
            .collect()
    }

    fn average_active_grains(engine: &mut DistortionEngine, input: &[f32], skip: usize) -> f32 {
        let mut sum = 0;
        for (index, sample) in input.iter().enumerate() {
            engine.process(*sample);
            assert!(engine.active_grain_count() <= DistortionEngine::MAX_GRAINS);
            if index >= skip {
                sum += engine.active_grain_count();
            }
        }
        sum as f32 / (input.len() - skip) as f32
    }

    #[test]
    fn parameter_defaults_and_clamping() {
        let mut engine = DistortionEngine::new();
        assert_eq!(engine.parameters(), EngineParameters::default());
        assert_eq!(engine.parameter_descriptors().len(), 8);

        engine.set_grain_duration(0.0);
        engine.set_density(1000.0);
        engine.set_drive(-1.0);
        engine.set_drive_variation(f32::NAN);
        engine.set_position_jitter(f32::INFINITY);
        engine.set_mix(2.0);
        let parameters = engine.parameters();
        assert_eq!(parameters.grain_duration_ms, 1.0);
        assert_eq!(parameters.density, 64.0);
        assert_eq!(parameters.drive, 0.0);
        assert_eq!(parameters.drive_variation, 0.0);
        assert_eq!(parameters.position_jitter_ms, 1000.0);
        assert_eq!(parameters.mix, 1.0);

        // setters are idempotent
        engine.set_density(3.0);
        engine.set_density(3.0);
        assert_eq!(engine.density(), 3.0);
    }

    #[test]
    fn parameter_updates() {
        let mut engine = DistortionEngine::new();
        let parameters = EngineParameters {
            grain_duration_ms: 20.0,
            density: 8.0,
            algorithm: DistortionAlgorithm::Fuzz,
            drive: 1.5,
            drive_variation: 0.5,
            algorithm_variation: true,
            position_jitter_ms: 100.0,
            mix: 0.25,
        };
        engine.set_parameters(&parameters);
        assert_eq!(engine.parameters(), parameters);

        let (id, update) = DistortionEngine::DENSITY.value_update(2.0);
        assert!(engine.apply_parameter_update(id, &update).is_ok());
        assert_eq!(engine.density(), 2.0);
        assert!(engine
            .apply_parameter_update(
                DistortionEngine::ALGORITHM_ID,
                &ParameterValueUpdate::Raw(Box::new(DistortionAlgorithm::Foldback))
            )
            .is_ok());
        assert_eq!(engine.algorithm(), DistortionAlgorithm::Foldback);
        assert!(engine
            .apply_parameter_update(
                DistortionEngine::ALGORITHM_ID,
                &ParameterValueUpdate::Normalized(0.25)
            )
            .is_ok());
        assert_eq!(engine.algorithm(), DistortionAlgorithm::HardClip);
        assert!(engine
            .apply_parameter_update(
                DistortionEngine::ALGORITHM_VARIATION_ID,
                &ParameterValueUpdate::Normalized(0.0)
            )
            .is_ok());
        assert!(!engine.algorithm_variation());
        assert!(engine
            .apply_parameter_update(
                DistortionEngine::MIX_ID,
                &ParameterValueUpdate::Normalized(0.5)
            )
            .is_ok());
        assert_eq!(engine.mix(), 0.5);

        assert!(matches!(
            engine.apply_parameter_update(
                FourCC(*b"????"),
                &ParameterValueUpdate::Normalized(0.5)
            ),
            Err(Error::ParameterError(_))
        ));
    }

    #[test]
    fn prepare_clamps_sample_rate() {
        let mut engine = DistortionEngine::with_seed(0);
        assert!(!engine.is_prepared());
        // unprepared engines pass through input
        assert_eq!(engine.process(0.5), 0.5);

        engine.prepare(1_000_000, 256);
        assert!(engine.is_prepared());
        assert_eq!(engine.sample_rate(), 192_000);
        engine.prepare(1000, 256);
        assert_eq!(engine.sample_rate(), 8_000);
        assert!(engine.history.capacity() >= DistortionEngine::max_history_len());
        assert!(engine.history.capacity().is_power_of_two());
    }

    #[test]
    fn block_processing_equals_sample_processing() {
        let mut input = sine(220.0, 8192);
        input[1000] = f32::NAN;
        input[1001] = f32::INFINITY;
        input[5000] = f32::NEG_INFINITY;

        let parameters = EngineParameters {
            drive_variation: 0.8,
            algorithm_variation: true,
            position_jitter_ms: 30.0,
            mix: 0.7,
            ..EngineParameters::default()
        };
        let mut block_engine = prepared_engine(42);
        block_engine.set_parameters(&parameters);
        let mut sample_engine = prepared_engine(42);
        sample_engine.set_parameters(&parameters);

        let mut block_output = input.clone();
        for chunk in block_output.chunks_mut(333) {
            block_engine.process_block(chunk);
        }
        let sample_output = input
            .iter()
            .map(|sample| sample_engine.process(*sample))
            .collect::<Vec<_>>();

        assert_eq!(
            block_output.iter().map(|s| s.to_bits()).collect::<Vec<_>>(),
            sample_output.iter().map(|s| s.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn zero_mix_bypasses() {
        let input = sine(440.0, 4096);
        let mut engine = DistortionEngine::with_seed(1);
        engine.set_mix(0.0);
        engine.set_drive(2.0);
        engine.set_density(64.0);
        engine.prepare(SAMPLE_RATE, 512);
        for sample in &input {
            assert_eq!(engine.process(*sample), *sample);
        }

        // mix changes are smoothed, but jump to the target on reset
        let mut engine = prepared_engine(1);
        engine.process_block(&mut sine(440.0, 100));
        engine.set_mix(0.0);
        engine.reset();
        for sample in &input {
            assert_eq!(engine.process(*sample), *sample);
        }
    }

    #[test]
    fn grain_count_is_bounded() {
        let mut engine = prepared_engine(2);
        engine.set_grain_duration(1000.0);
        engine.set_density(64.0);
        let input = sine(100.0, SAMPLE_RATE as usize);
        let average = average_active_grains(&mut engine, &input, SAMPLE_RATE as usize / 2);
        assert_eq!(engine.active_grain_count(), DistortionEngine::MAX_GRAINS);
        assert!(average > DistortionEngine::MAX_GRAINS as f32 - 0.5);

        // very short grains on low sample rates
        engine.prepare(8000, 64);
        engine.set_grain_duration(1.0);
        average_active_grains(&mut engine, &input[..4000], 0);
    }

    #[test]
    fn grains_only_read_written_history() {
        let mut engine = prepared_engine(3);
        engine.set_algorithm(DistortionAlgorithm::HardClip);
        engine.set_drive(0.0);
        engine.set_density(16.0);
        engine.set_grain_duration(20.0);
        engine.set_position_jitter(1000.0);
        engine.set_mix(1.0);
        engine.reset();

        // stale, negative history
        for _ in 0..SAMPLE_RATE {
            engine.process(-1.0);
        }
        engine.reset();

        // positive ramp
        for i in 0..SAMPLE_RATE {
            let input = (i + 1) as f32 / SAMPLE_RATE as f32;
            let output = engine.process(input);
            assert!(output >= 0.0, "Read stale history at sample {i}: {output}");
        }
    }

    #[test]
    fn invalid_input_is_contained() {
        let mut engine = prepared_engine(4);
        engine.set_mix(0.5);
        engine.reset();
        let input = sine(1000.0, 4410);
        for sample in &input[..2000] {
            engine.process(*sample);
        }
        assert!(engine.active_grain_count() > 0);
        assert_eq!(engine.invalid_input_count(), 0);

        for invalid in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(engine.process(invalid), 0.0);
            assert_eq!(engine.active_grain_count(), 0);
            assert_eq!(engine.history.write_count(), 0);

            // resumes with the next valid sample
            let output = engine.process(input[2000]);
            assert!(output.is_finite());
            assert!(output != 0.0);
            assert_eq!(engine.active_grain_count(), 1);
        }

        for sample in &input[2001..] {
            assert!(engine.process(*sample).is_finite());
        }
        assert_eq!(engine.invalid_input_count(), 3);

        // counted across resets, cleared by prepare
        engine.reset();
        assert_eq!(engine.invalid_input_count(), 3);
        engine.prepare(SAMPLE_RATE, 512);
        assert_eq!(engine.invalid_input_count(), 0);
    }

    #[test]
    fn seeded_engines_are_deterministic() {
        let parameters = EngineParameters {
            drive_variation: 1.0,
            algorithm_variation: true,
            position_jitter_ms: 200.0,
            ..EngineParameters::default()
        };
        let input = sine(330.0, 22050);
        let render = |seed: u64| {
            let mut engine = DistortionEngine::new();
            engine.set_parameters(&parameters);
            engine.seed(seed);
            engine.prepare(SAMPLE_RATE, 512);
            let mut output = input.clone();
            engine.process_block(&mut output);
            output.iter().map(|s| s.to_bits()).collect::<Vec<_>>()
        };
        assert_eq!(render(1234), render(1234));
        assert_ne!(render(1234), render(4321));
    }

    #[test]
    fn density_increases_grain_count() {
        let input = sine(500.0, SAMPLE_RATE as usize);
        let mut last_average = 0.0;
        for density in [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 64.0] {
            let mut engine = prepared_engine(5);
            engine.set_density(density);
            let average = average_active_grains(&mut engine, &input, SAMPLE_RATE as usize / 4);
            assert!(
                average >= last_average,
                "Density {density} produced fewer grains: {average} < {last_average}"
            );
            last_average = average;
        }
    }

    #[test]
    fn steady_state_grain_count() {
        let mut engine = prepared_engine(6);
        engine.set_parameters(&EngineParameters {
            grain_duration_ms: 50.0,
            density: 4.0,
            algorithm: DistortionAlgorithm::SoftClip,
            drive: 0.5,
            drive_variation: 0.0,
            algorithm_variation: false,
            position_jitter_ms: 0.0,
            mix: 1.0,
        });
        engine.reset();

        let input = sine(1000.0, SAMPLE_RATE as usize);
        let mut active_sum = 0;
        let mut peak = 0.0f32;
        for (index, sample) in input.iter().enumerate() {
            let output = engine.process(*sample);
            assert!(output.is_finite());
            peak = peak.max(output.abs());
            if index >= SAMPLE_RATE as usize / 4 {
                active_sum += engine.active_grain_count();
            }
        }
        let average = active_sum as f32 / (SAMPLE_RATE as usize * 3 / 4) as f32;
        assert!((3.0..=5.0).contains(&average), "{average}");
        assert!(peak > 0.1, "{peak}");
    }

    #[test]
    #[cfg(all(debug_assertions, feature = "assert-allocs"))]
    fn processing_does_not_allocate() {
        let mut engine = prepared_engine(7);
        engine.set_algorithm_variation(true);
        engine.set_drive_variation(1.0);
        engine.set_position_jitter(500.0);
        let mut buffer = sine(200.0, 4096);
        buffer[100] = f32::NAN;
        assert_allocation_free("Processing", || {
            engine.process_block(&mut buffer);
            engine.set_density(32.0);
            engine.set_drive(1.5);
            engine.process_block(&mut buffer);
            engine.reset();
            engine.seed(1);
            engine.process_block(&mut buffer);
        });
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    #[cfg(all(debug_assertions, feature = "assert-allocs"))]
    fn invalid_input_does_not_allocate_with_logger() {
        // an installed logger must not be reached from the audio path
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Warn)
            .init();

        let mut engine = prepared_engine(8);
        let mut buffer = sine(300.0, 1000);
        buffer[500] = f32::NAN;
        assert_allocation_free("Processing invalid input", || {
            engine.process_block(&mut buffer);
        });
        assert_eq!(buffer[500], 0.0);
        assert_eq!(engine.invalid_input_count(), 1);
    }
}
