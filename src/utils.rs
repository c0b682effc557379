//! Common DSP helpers, used by the engine and effects.

pub mod buffer;
pub mod smoothing;
