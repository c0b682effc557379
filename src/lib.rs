#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod effect;
mod engine;
mod error;

// public, flat re-exports
pub use error::Error;

pub use effect::{granular::GranularDistortionEffect, Effect};

pub use engine::{
    DistortionAlgorithm, DistortionEngine, EngineParameters, GrainHandle, GrainShaper, GrainSlot,
    GrainSlotPool, MAX_DRIVE,
};

pub use parameter::{ClonableParameter, Parameter, ParameterType, ParameterValueUpdate};

// public mods
pub mod parameter;
pub mod utils;

// -------------------------------------------------------------------------------------------------

#[cfg(all(test, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;
