use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Runtime control surface of a [`PitchShifter`](crate::PitchShifter).
///
/// A clonable handle holding the pitch and overlap ratios as raw `f64` bit patterns in shared
/// atomics. Controllers are meant to be written from a single non-real-time thread (a UI slider,
/// a ramp driver) and read once per block by the audio thread: plain atomic load/store of a
/// single scalar is torn-free, takes no locks, and a ratio that is stale by one block is an
/// acceptable, expected race for audio ramps.
///
/// All setters validate their argument and reject bad values with [`Error::ParameterError`]
/// before storing anything, so the audio thread only ever observes valid ratios.
#[derive(Debug, Clone)]
pub struct PitchController {
    pitch_ratio: Arc<AtomicU64>,
    overlap_ratio: Arc<AtomicU64>,
}

impl PitchController {
    /// Default pitch ratio: no shift.
    pub const DEFAULT_PITCH_RATIO: f64 = 1.0;
    /// Default overlap ratio: grains are placed back-to-back.
    pub const DEFAULT_OVERLAP_RATIO: f64 = 0.0;

    /// Creates a new controller with default ratios.
    pub fn new() -> Self {
        Self {
            pitch_ratio: Arc::new(AtomicU64::new(Self::DEFAULT_PITCH_RATIO.to_bits())),
            overlap_ratio: Arc::new(AtomicU64::new(Self::DEFAULT_OVERLAP_RATIO.to_bits())),
        }
    }

    /// Current pitch ratio. `1.0` means no shift, `> 1.0` raises pitch.
    pub fn pitch_ratio(&self) -> f64 {
        f64::from_bits(self.pitch_ratio.load(Ordering::Relaxed))
    }

    /// Sets a new pitch ratio, which gets picked up by the audio thread at the next block.
    ///
    /// The ratio must be a positive, finite number. Extreme ratios degrade quality, not
    /// correctness, so no upper bound is enforced here.
    pub fn set_pitch_ratio(&self, ratio: f64) -> Result<(), Error> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::ParameterError(format!(
                "Pitch ratio must be a positive, finite number, but is: {ratio}"
            )));
        }
        self.pitch_ratio.store(ratio.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Current overlap ratio in `[0, 1)`.
    pub fn overlap_ratio(&self) -> f64 {
        f64::from_bits(self.overlap_ratio.load(Ordering::Relaxed))
    }

    /// Sets a new overlap ratio, which gets picked up by the audio thread at the next block.
    ///
    /// The ratio must be in `[0, 1)`: an overlap of `1.0` or more would result in a zero or
    /// negative grain stride.
    pub fn set_overlap_ratio(&self, overlap: f64) -> Result<(), Error> {
        if !overlap.is_finite() || !(0.0..1.0).contains(&overlap) {
            return Err(Error::ParameterError(format!(
                "Overlap ratio must be in range [0, 1), but is: {overlap}"
            )));
        }
        self.overlap_ratio.store(overlap.to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

impl Default for PitchController {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let controller = PitchController::new();
        assert_eq!(controller.pitch_ratio(), 1.0);
        assert_eq!(controller.overlap_ratio(), 0.0);
    }

    #[test]
    fn writes_are_visible_to_clones() {
        let controller = PitchController::new();
        let audio_thread_handle = controller.clone();

        controller.set_pitch_ratio(2.5).unwrap();
        controller.set_overlap_ratio(0.5).unwrap();
        assert_eq!(audio_thread_handle.pitch_ratio(), 2.5);
        assert_eq!(audio_thread_handle.overlap_ratio(), 0.5);
    }

    #[test]
    fn invalid_writes_are_rejected() {
        let controller = PitchController::new();
        controller.set_pitch_ratio(1.5).unwrap();

        assert!(controller.set_pitch_ratio(0.0).is_err());
        assert!(controller.set_pitch_ratio(-1.0).is_err());
        assert!(controller.set_pitch_ratio(f64::NAN).is_err());
        assert!(controller.set_pitch_ratio(f64::INFINITY).is_err());
        // previous value is retained
        assert_eq!(controller.pitch_ratio(), 1.5);

        assert!(controller.set_overlap_ratio(1.0).is_err());
        assert!(controller.set_overlap_ratio(-0.1).is_err());
        assert!(controller.set_overlap_ratio(f64::NAN).is_err());
        assert_eq!(controller.overlap_ratio(), 0.0);

        // boundary values of the valid range
        assert!(controller.set_overlap_ratio(0.0).is_ok());
        assert!(controller.set_overlap_ratio(0.999).is_ok());
    }
}
