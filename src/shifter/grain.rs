//! Grain synthesis: fractional-rate resampling of a single input block.

use assume::assume;

use crate::window::GrainWindow;

// -------------------------------------------------------------------------------------------------

/// Resamples one input block into one pitch-shifted, window-weighted grain of the same length.
///
/// A fractional read cursor walks over the input at `ratio`× speed with linear interpolation:
/// reading the block faster or slower than it gets written back out compresses or expands its
/// apparent frequency content, which is what shifts the pitch. The read index wraps around the
/// block with a bit mask, so the grain cyclically re-reads the *same* input block instead of
/// advancing into future ones - a known periodicity artifact, traded for O(1) state.
///
/// Owns the precomputed window weights and a grain scratch buffer, both allocated once at
/// initialization time.
#[derive(Debug, Clone, Default)]
pub(super) struct GrainSynthesizer {
    /// Per-sample window weights, one grain long. Empty until initialized.
    window: Box<[f32]>,
    /// Scratch buffer for the synthesized grain.
    grain: Box<[f32]>,
}

impl GrainSynthesizer {
    /// Creates a new, uninitialized synthesizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of the window weights and allocates the grain scratch buffer.
    /// Not real-time safe.
    pub fn initialize(&mut self, window: GrainWindow) {
        debug_assert!(
            window.len().is_power_of_two(),
            "Grain window size must be a pow2 value"
        );
        self.grain = vec![0.0; window.len()].into_boxed_slice();
        self.window = window.into_weights();
    }

    pub fn is_initialized(&self) -> bool {
        !self.grain.is_empty()
    }

    /// Synthesizes a single grain from the given input block at the given pitch ratio.
    ///
    /// The ratio must be positive and already validated by the caller. With a ratio of `1.0`
    /// this reduces to an identity pass through the window.
    pub fn synthesize(&mut self, input: &[f32], ratio: f64) -> &[f32] {
        let grain_size = self.grain.len();
        debug_assert_eq!(input.len(), grain_size, "Unexpected input block length");
        debug_assert!(ratio > 0.0, "Ratio must be validated by the caller");

        // grain_size is a pow2 value, so masking implements the index wrap-around
        let mask = grain_size - 1;

        let mut cursor = 0.0f64;
        for i in 0..grain_size {
            let index_a = (cursor as usize) & mask;
            let index_b = ((cursor + ratio) as usize) & mask;
            assume!(unsafe: index_a < input.len(), "Masked with pow2 len");
            assume!(unsafe: index_b < input.len(), "Masked with pow2 len");
            let a = input[index_a];
            let b = input[index_b];
            let fraction = cursor.fract() as f32;
            self.grain[i] = (a + (b - a) * fraction) * self.window[i];
            cursor += ratio;
        }
        &self.grain
    }
}

// -------------------------------------------------------------------------------------------------
