#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod controller;
mod error;
mod shifter;
mod window;

// public, flat re-exports
pub use controller::PitchController;
pub use error::Error;
pub use shifter::{BlockProcessor, PitchShifter};
pub use window::{GrainWindow, WindowKind};
