use four_cc::FourCC;

use crate::{
    effect::Effect,
    engine::{DistortionEngine, EngineParameterDescriptors, EngineParameters},
    parameter::ParameterValueUpdate,
    utils::buffer::InterleavedBufferMut,
    ClonableParameter, Error,
};

// -------------------------------------------------------------------------------------------------

/// Multi-channel granular distortion effect.
///
/// Runs one independent [`DistortionEngine`] per channel. When seeded, channel engines get seeded
/// with `seed + channel_index`, so channels are decorrelated but reproducible.
#[derive(Debug)]
pub struct GranularDistortionEffect {
    descriptors: EngineParameterDescriptors,
    /// Current parameter values, which get copied into new channel engines.
    parameters: EngineParameters,
    engines: Vec<DistortionEngine>,
    seed: Option<u64>,
    sample_rate: u32,
}

impl GranularDistortionEffect {
    pub const EFFECT_NAME: &str = "GranularDistortionEffect";

    /// Creates a new `GranularDistortionEffect` with default parameter values.
    pub fn new() -> Self {
        let descriptors = EngineParameterDescriptors::new();
        let parameters = EngineParameters::default();
        let engines = Vec::new();
        let seed = None;
        let sample_rate = 44100;
        Self {
            descriptors,
            parameters,
            engines,
            seed,
            sample_rate,
        }
    }

    /// Creates a new `GranularDistortionEffect` with the given parameters, clamped into their
    /// valid ranges.
    pub fn with_parameters(parameters: EngineParameters) -> Self {
        let mut effect = Self::default();
        effect.parameters = effect.descriptors.clamp(&parameters);
        effect
    }

    /// Deterministically seed the channel engines' random generators. Must be set before the
    /// effect gets initialized.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Current parameter values.
    pub fn engine_parameters(&self) -> EngineParameters {
        self.parameters
    }

    /// Total number of playing grains in all channels.
    pub fn active_grain_count(&self) -> usize {
        self.engines
            .iter()
            .map(DistortionEngine::active_grain_count)
            .sum()
    }

    /// Total number of dropped non finite input samples in all channels since initialization.
    /// Don't call this from the audio thread when logging the result.
    pub fn invalid_input_count(&self) -> u64 {
        self.engines
            .iter()
            .map(DistortionEngine::invalid_input_count)
            .sum()
    }

    fn create_engine(&self, channel_index: usize) -> DistortionEngine {
        let mut engine = match self.seed {
            Some(seed) => DistortionEngine::with_seed(seed.wrapping_add(channel_index as u64)),
            None => DistortionEngine::new(),
        };
        engine.set_parameters(&self.parameters);
        engine
    }
}

impl Default for GranularDistortionEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GranularDistortionEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn parameters(&self) -> Vec<&dyn ClonableParameter> {
        self.descriptors.list()
    }

    fn initialize(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
        max_frames: usize,
    ) -> Result<(), Error> {
        if channel_count == 0 {
            return Err(Error::ChannelCountError(channel_count));
        }
        self.sample_rate = sample_rate;
        self.engines = (0..channel_count)
            .map(|channel_index| {
                let mut engine = self.create_engine(channel_index);
                engine.prepare(sample_rate, max_frames);
                engine
            })
            .collect();
        Ok(())
    }

    fn process_started(&mut self) {
        for engine in &mut self.engines {
            engine.reset();
        }
    }

    fn process(&mut self, output: &mut [f32]) {
        if self.engines.is_empty() {
            return;
        }
        for frame in output.frames_mut(self.engines.len()) {
            for (sample, engine) in frame.iter_mut().zip(self.engines.iter_mut()) {
                *sample = engine.process(*sample);
            }
        }
    }

    fn process_tail(&self) -> Option<usize> {
        // grains keep reading delayed history after the input went silent
        let max_delay_ms =
            DistortionEngine::DURATION.range().end() + DistortionEngine::JITTER.range().end();
        Some((max_delay_ms as f64 * self.sample_rate as f64 / 1000.0).ceil() as usize)
    }

    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        self.descriptors
            .apply_update(&mut self.parameters, id, value)
            .map_err(|_| {
                Error::ParameterError(format!(
                    "Unknown parameter: '{id}' for effect '{}'",
                    self.name()
                ))
            })?;
        for engine in &mut self.engines {
            engine.apply_parameter_update(id, value)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
