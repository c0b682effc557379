//! Per-grain waveshaping.

use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr};

// -------------------------------------------------------------------------------------------------

/// Nonlinear transfer function applied to a grain.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumIter,
    EnumString,
    EnumCount,
    FromRepr,
)]
#[repr(u8)]
pub enum DistortionAlgorithm {
    /// Soft clipping distortion using a cubic polynomial.
    ///
    /// Creates a warm, smooth saturation by gently rounding off signal peaks, similar to
    /// overdriving analog tape or a vacuum tube.
    #[default]
    SoftClip,
    /// Classic hard clipping distortion.
    ///
    /// Produces a buzzy, aggressive distortion by abruptly chopping off any part of the
    /// signal that exceeds a sharp threshold, like a transistor-based fuzz pedal.
    HardClip,
    /// Exponential shockley diode model followed by an atan soft-clipper.
    ///
    /// Simulates the asymmetric clipping of a semiconductor diode, yielding a bright and
    /// harmonically rich distortion.
    Diode,
    /// Symmetrical saturation followed by half-wave rectification.
    ///
    /// Generates a gritty, vintage fuzz tone by amplifying the signal and then removing
    /// the entire negative half of the waveform.
    Fuzz,
    /// Wavefolding: signal parts exceeding the threshold are mirrored back into range.
    ///
    /// Creates complex, metallic harmonics, more extreme than clipping at high drives.
    Foldback,
}

impl DistortionAlgorithm {
    /// Map an index in range `0..COUNT` to an algorithm. Out of range indices wrap around.
    pub fn from_index(index: usize) -> Self {
        Self::from_repr((index % Self::COUNT) as u8).unwrap_or_default()
    }

    fn transfer_function(self) -> fn(f32, f32) -> f32 {
        match self {
            Self::SoftClip => soft_clip,
            Self::HardClip => hard_clip,
            Self::Diode => diode,
            Self::Fuzz => fuzz,
            Self::Foldback => foldback,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Largest supported drive amount.
pub const MAX_DRIVE: f32 = 2.0;

#[inline(always)]
fn boost(drive: f32, boost_factor: f32) -> f32 {
    1.0 + drive.powi(4) * (boost_factor - 1.0)
}

#[inline(always)]
fn gain_compensation(drive: f32) -> f32 {
    1.0 - (drive.min(1.0) / 2.0).powi(2) * 2.0
}

#[inline]
fn soft_clip(sample: f32, drive: f32) -> f32 {
    let amplified_sample = sample * boost(drive, 15.0);
    let gain_compensation = gain_compensation(drive);
    if amplified_sample >= 1.0 {
        gain_compensation
    } else if amplified_sample > -1.0 {
        (3.0 / 2.0) * (amplified_sample - amplified_sample.powi(3) / 3.0) * gain_compensation
    } else {
        -gain_compensation
    }
}

#[inline]
fn hard_clip(sample: f32, drive: f32) -> f32 {
    let gain = boost(drive, 50.0);
    let threshold = 1.0 / gain;
    sample.clamp(-threshold, threshold) * gain * gain_compensation(drive)
}

#[inline]
fn diode(sample: f32, drive: f32) -> f32 {
    let gain = boost(drive, 20.0);
    let diode_clipping = ((0.1 * sample) / (0.0253 * 1.68)).exp() - 1.0;
    2.0 / std::f32::consts::PI * (diode_clipping * gain).atan() * gain_compensation(drive)
}

#[inline]
fn fuzz(sample: f32, drive: f32) -> f32 {
    let amplified_sample = sample * boost(drive, 30.0);
    let saturated = amplified_sample.signum() * (1.0 - (-amplified_sample.abs()).exp());
    1.5 * (saturated + saturated.abs()) * gain_compensation(drive)
}

#[inline]
fn foldback(sample: f32, drive: f32) -> f32 {
    const THRESHOLD: f32 = 1.0;
    const MAX_FOLDS: u32 = 32;
    let mut x = sample * boost(drive, 8.0);
    for _ in 0..MAX_FOLDS {
        if x > THRESHOLD {
            x = 2.0 * THRESHOLD - x;
        } else if x < -THRESHOLD {
            x = -2.0 * THRESHOLD - x;
        } else {
            break;
        }
    }
    // signals which didn't settle within MAX_FOLDS are clipped
    x.clamp(-THRESHOLD, THRESHOLD) * gain_compensation(drive)
}

// -------------------------------------------------------------------------------------------------

/// Stateless waveshaper which is bound to a single grain slot.
///
/// Output is a pure function of the input sample, the assigned algorithm and the assigned drive,
/// so it can be reassigned at any time without any teardown.
#[derive(Debug, Clone, Copy)]
pub struct GrainShaper {
    algorithm: DistortionAlgorithm,
    drive: f32,
    function: fn(f32, f32) -> f32,
}

impl Default for GrainShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainShaper {
    /// Create a new shaper with the default algorithm and no drive.
    pub const fn new() -> Self {
        Self {
            algorithm: DistortionAlgorithm::SoftClip,
            drive: 0.0,
            function: soft_clip,
        }
    }

    /// The assigned transfer function.
    pub fn algorithm(&self) -> DistortionAlgorithm {
        self.algorithm
    }

    /// The assigned drive amount.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Assign a new algorithm and drive amount. Drive is clamped to `0..=MAX_DRIVE`.
    pub fn configure(&mut self, algorithm: DistortionAlgorithm, drive: f32) {
        self.algorithm = algorithm;
        self.drive = if drive.is_nan() {
            0.0
        } else {
            drive.clamp(0.0, MAX_DRIVE)
        };
        self.function = algorithm.transfer_function();
    }

    /// Apply the assigned transfer function to a single sample.
    #[inline(always)]
    pub fn shape(&self, sample: f32) -> f32 {
        (self.function)(sample, self.drive)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn shaper(algorithm: DistortionAlgorithm, drive: f32) -> GrainShaper {
        let mut shaper = GrainShaper::new();
        shaper.configure(algorithm, drive);
        shaper
    }

    #[test]
    fn algorithm_indices() {
        assert_eq!(DistortionAlgorithm::COUNT, 5);
        for (index, algorithm) in DistortionAlgorithm::iter().enumerate() {
            assert_eq!(DistortionAlgorithm::from_index(index), algorithm);
        }
        assert_eq!(
            DistortionAlgorithm::from_index(DistortionAlgorithm::COUNT),
            DistortionAlgorithm::SoftClip
        );
        assert_eq!(
            "Foldback".parse::<DistortionAlgorithm>(),
            Ok(DistortionAlgorithm::Foldback)
        );
    }

    #[test]
    fn outputs_are_bounded() {
        for algorithm in DistortionAlgorithm::iter() {
            for drive in [0.0, 0.5, 1.0, 2.0] {
                let shaper = shaper(algorithm, drive);
                for input in [-1.0e6, -1.0, -0.5, -0.01, 0.0, 0.01, 0.5, 1.0, 1.0e6] {
                    let output = shaper.shape(input);
                    assert!(
                        output.is_finite() && output.abs() <= 3.0,
                        "{algorithm} with drive {drive} produced {output} for {input}"
                    );
                }
            }
        }
    }

    #[test]
    fn symmetric_algorithms() {
        for algorithm in [
            DistortionAlgorithm::SoftClip,
            DistortionAlgorithm::HardClip,
            DistortionAlgorithm::Foldback,
        ] {
            let shaper = shaper(algorithm, 0.7);
            for input in [0.05, 0.3, 0.9] {
                assert!((shaper.shape(input) + shaper.shape(-input)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn fuzz_rectifies() {
        let shaper = shaper(DistortionAlgorithm::Fuzz, 1.0);
        assert_eq!(shaper.shape(-0.5), 0.0);
        assert!(shaper.shape(0.5) > 0.0);
    }

    #[test]
    fn drive_increases_saturation() {
        let clean = shaper(DistortionAlgorithm::HardClip, 0.0);
        let driven = shaper(DistortionAlgorithm::HardClip, 1.0);
        // unity gain without drive
        assert!((clean.shape(0.25) - 0.25).abs() < 1e-6);
        assert!(driven.shape(0.25) > clean.shape(0.25));
    }

    #[test]
    fn configure_clamps_drive() {
        let mut shaper = GrainShaper::new();
        shaper.configure(DistortionAlgorithm::Diode, 10.0);
        assert_eq!(shaper.drive(), MAX_DRIVE);
        assert_eq!(shaper.algorithm(), DistortionAlgorithm::Diode);
        shaper.configure(DistortionAlgorithm::Fuzz, f32::NAN);
        assert_eq!(shaper.drive(), 0.0);
    }
}
