//! Grain insertion scheduling for the overlap-add accumulator.

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Computes the stride at which successive grain copies are placed into the accumulator.
///
/// An overlap of `0.0` places grains back-to-back (stride = grain size), larger overlaps
/// shrink the stride down to a minimum of one sample. Overlaps at or above `1.0` would yield
/// a zero or negative stride and are rejected.
pub(super) fn stride_for(overlap: f64, grain_size: usize) -> Result<usize, Error> {
    if !overlap.is_finite() || !(0.0..1.0).contains(&overlap) {
        return Err(Error::ParameterError(format!(
            "Overlap ratio must be in range [0, 1), but is: {overlap}"
        )));
    }
    let stride = (grain_size as f64 * (1.0 - overlap)).round() as usize;
    Ok(stride.max(1))
}

// -------------------------------------------------------------------------------------------------

/// Lazy sequence of the offsets `0, stride, 2 * stride, …` below the grain size.
///
/// The accumulator places a windowed copy of the *same* grain at each offset, building the
/// overlap-add sum for the current block.
#[derive(Debug, Clone)]
pub(super) struct InsertionOffsets {
    next: usize,
    stride: usize,
    limit: usize,
}

impl Iterator for InsertionOffsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.limit {
            return None;
        }
        let offset = self.next;
        self.next += self.stride;
        Some(offset)
    }
}

/// Creates the insertion offset sequence for the given stride.
pub(super) fn insertion_offsets(stride: usize, grain_size: usize) -> InsertionOffsets {
    debug_assert!(stride > 0, "Stride must be positive");
    InsertionOffsets {
        next: 0,
        stride,
        limit: grain_size,
    }
}

// -------------------------------------------------------------------------------------------------
