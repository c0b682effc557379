//! Renders a synthetic test signal through the granular distortion effect into a wave file.

use std::path::PathBuf;

use granular_distortion::{Effect, GranularDistortionEffect};

// -------------------------------------------------------------------------------------------------

// Common demo code
#[path = "./common/arguments.rs"]
mod arguments;

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 44100;
const CHANNEL_COUNT: usize = 2;
const BLOCK_FRAMES: usize = 512;

const DEFAULT_SECONDS: f32 = 4.0;
const DEFAULT_OUTPUT_PATH: &str = "granular-distortion.wav";

// -------------------------------------------------------------------------------------------------

/// A plucked bass and a sine melody, alternating every quarter second.
fn test_signal(frame: usize) -> [f32; CHANNEL_COUNT] {
    const BASS_NOTES: [f32; 4] = [55.0, 65.41, 73.42, 49.0];
    const MELODY_NOTES: [f32; 4] = [440.0, 523.25, 659.25, 587.33];

    let time = frame as f32 / SAMPLE_RATE as f32;
    let beat = (time * 4.0) as usize;
    let beat_time = time * 4.0 - beat as f32;
    let envelope = (-beat_time * 6.0).exp();

    let bass_phase = (time * BASS_NOTES[(beat / 4) % BASS_NOTES.len()]).fract();
    let bass = (2.0 * bass_phase - 1.0) * envelope * 0.4;
    let melody =
        (2.0 * std::f32::consts::PI * time * MELODY_NOTES[beat % MELODY_NOTES.len()]).sin()
            * envelope
            * 0.3;
    [bass + melody, bass + 0.5 * melody]
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse optional arguments
    let args = arguments::parse();

    // Create and initialize the effect
    let mut effect = GranularDistortionEffect::with_parameters(args.engine_parameters());
    if let Some(seed) = args.seed {
        effect = effect.with_seed(seed);
    }
    effect.initialize(SAMPLE_RATE, CHANNEL_COUNT, BLOCK_FRAMES)?;
    effect.process_started();
    log::info!("Rendering with {:?}", effect.engine_parameters());

    // Render test signal plus effect tail in blocks
    let total_frames = (args.seconds.unwrap_or(DEFAULT_SECONDS).max(0.0) * SAMPLE_RATE as f32)
        as usize
        + effect.process_tail().unwrap_or(0);
    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
    let spec = hound::WavSpec {
        channels: CHANNEL_COUNT as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output_path, spec)?;

    let mut buffer = vec![0.0; BLOCK_FRAMES * CHANNEL_COUNT];
    let mut max_active_grains = 0;
    let mut frame = 0;
    while frame < total_frames {
        let block_frames = BLOCK_FRAMES.min(total_frames - frame);
        let block = &mut buffer[..block_frames * CHANNEL_COUNT];
        for (index, samples) in block.chunks_exact_mut(CHANNEL_COUNT).enumerate() {
            let signal_frame = frame + index;
            if signal_frame < total_frames - effect.process_tail().unwrap_or(0) {
                samples.copy_from_slice(&test_signal(signal_frame));
            } else {
                samples.fill(0.0);
            }
        }
        effect.process(block);
        max_active_grains = max_active_grains.max(effect.active_grain_count());
        for sample in block.iter() {
            writer.write_sample(*sample)?;
        }
        frame += block_frames;
    }
    writer.finalize()?;

    let invalid_samples = effect.invalid_input_count();
    if invalid_samples > 0 {
        log::warn!("Dropped {invalid_samples} invalid input samples while rendering");
    }

    log::info!(
        "Wrote {total_frames} frames to '{}' (max. {max_active_grains} active grains)",
        output_path.display()
    );
    Ok(())
}
