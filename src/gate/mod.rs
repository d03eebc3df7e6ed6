//! Noise floor gating: cheap spectral check before expensive inference.

mod noise_floor;
mod spectrum;

pub use noise_floor::{GateResult, NoiseFloorGate, NoiseFloorState};
pub use spectrum::peak_power;
