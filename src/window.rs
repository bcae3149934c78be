//! Grain window shapes and precomputed weight tables.

// -------------------------------------------------------------------------------------------------

/// Window shape selection for grain envelopes.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
)]
#[repr(u8)]
pub enum WindowKind {
    /// Constant weight of 1.0. Keeps grain loudness unchanged, but produces audible
    /// discontinuities at grain boundaries.
    #[default]
    Rectangular,
    /// Linear rise to peak at the grain center, linear fall.
    Triangle,
    /// Cosine-squared window. Standard choice for overlap-add resynthesis.
    Hann,
    /// Classic DSP window with steep spectral rolloff (a0=0.42, a1=0.5, a2=0.08).
    Blackman,
}

// -------------------------------------------------------------------------------------------------

/// A precomputed per-sample weight table applied to synthesized grains before accumulation.
///
/// Weights depend only on the grain size, so the table is computed once at initialization time
/// and never in the audio callback. Besides the built-in [`WindowKind`] shapes, arbitrary
/// windows can be built with [`GrainWindow::from_fn`].
#[derive(Debug, Clone)]
pub struct GrainWindow {
    weights: Box<[f32]>,
}

impl GrainWindow {
    /// Precompute a weight table for the given shape and grain size.
    pub fn new(kind: WindowKind, size: usize) -> Self {
        debug_assert!(size > 0, "Grain window must not be empty");
        let phase_of = |i: usize| i as f32 / size as f32; // [0.0, 1.0)
        let weights = match kind {
            WindowKind::Rectangular => vec![1.0; size],
            WindowKind::Triangle => (0..size)
                .map(|i| {
                    let phase = phase_of(i);
                    if phase < 0.5 {
                        2.0 * phase
                    } else {
                        2.0 * (1.0 - phase)
                    }
                })
                .collect(),
            WindowKind::Hann => (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * phase_of(i)).cos()))
                .collect(),
            WindowKind::Blackman => (0..size)
                .map(|i| {
                    let pi_phase = std::f32::consts::PI * phase_of(i);
                    0.42 - 0.5 * (2.0 * pi_phase).cos() + 0.08 * (4.0 * pi_phase).cos()
                })
                .collect(),
        };
        Self {
            weights: weights.into_boxed_slice(),
        }
    }

    /// Build a custom weight table by evaluating `func` at normalized phases `i / size`
    /// for `i` in `[0, size)`.
    pub fn from_fn(size: usize, func: impl Fn(f32) -> f32) -> Self {
        debug_assert!(size > 0, "Grain window must not be empty");
        let weights = (0..size)
            .map(|i| func(i as f32 / size as f32))
            .collect::<Vec<_>>();
        Self {
            weights: weights.into_boxed_slice(),
        }
    }

    /// Number of weights in the table.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Is the weight table empty?
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The raw per-sample weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Consumes the window, returning the raw weight table.
    pub(crate) fn into_weights(self) -> Box<[f32]> {
        self.weights
    }
}

// -------------------------------------------------------------------------------------------------
