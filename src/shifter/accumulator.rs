//! Overlap-add ring accumulator for resynthesized grains.

use assume::assume;

// -------------------------------------------------------------------------------------------------

/// Holds resynthesized audio that has not been emitted yet.
///
/// The ring spans two grain lengths and is logically divided into an emit half (the first grain
/// length, the fully-summed output for the block about to be emitted) and a build half (the
/// second grain length, summed up by overlapping grain placements). Grains are placed into the
/// build half; overlapped placements wrap around the ring into the emit half, which is what
/// folds a grain's tail into the block currently being emitted. A freshly placed grain thus
/// surfaces one block later, giving the pipeline its one block of latency.
///
/// [`RingAccumulator::advance`] must run exactly once per block, *before* grains are
/// accumulated, else stale energy from the previous block leaks forward.
#[derive(Debug, Clone, Default)]
pub(super) struct RingAccumulator {
    /// Sample storage, `2 * grain_size` long. Empty until initialized.
    buffer: Vec<f32>,
    grain_size: usize,
}

impl RingAccumulator {
    /// Creates a new, uninitialized accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the accumulation buffer. Not real-time safe.
    pub fn initialize(&mut self, grain_size: usize) {
        debug_assert!(
            grain_size.is_power_of_two(),
            "Grain size must be a pow2 value"
        );
        self.buffer = vec![0.0; 2 * grain_size];
        self.grain_size = grain_size;
    }

    pub fn is_initialized(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Shifts the build half into the emit half and zero-fills the vacated build half.
    pub fn advance(&mut self) {
        let grain_size = self.grain_size;
        self.buffer.copy_within(grain_size.., 0);
        self.buffer[grain_size..].fill(0.0);
    }

    /// Adds the same grain into the ring at each of the given offsets.
    ///
    /// Offsets must lie in `[0, grain_size)` and address the build half; placements at offsets
    /// above zero wrap around the ring into the emit half. Placements are additive and never
    /// overwrite, so overlapping copies sum up correctly.
    pub fn accumulate(&mut self, grain: &[f32], offsets: impl Iterator<Item = usize>) {
        let grain_size = self.grain_size;
        debug_assert_eq!(grain.len(), grain_size, "Unexpected grain length");

        // the ring is 2 * grain_size long, which also is a pow2 value
        let mask = self.buffer.len() - 1;
        for offset in offsets {
            debug_assert!(offset < grain_size, "Offset out of bounds");
            let base = grain_size + offset;
            for (j, grain_sample) in grain.iter().enumerate() {
                let index = (base + j) & mask;
                assume!(unsafe: index < self.buffer.len(), "Masked with pow2 len");
                self.buffer[index] += *grain_sample;
            }
        }
    }

    /// Read-only view of the block that is ready to be emitted.
    ///
    /// Valid after [`Self::advance`] and [`Self::accumulate`] ran for the current block. The
    /// returned samples are final: nothing mutates them until the next `advance` shifts them out.
    pub fn emit(&self) -> &[f32] {
        &self.buffer[..self.grain_size]
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_surfaces_after_advance() {
        // a single grain placed at offset 0 into a freshly zeroed accumulator lands in the
        // build half and reappears unchanged after one advance
        let grain = [0.25, -0.5, 0.75, -1.0];
        let mut accumulator = RingAccumulator::new();
        accumulator.initialize(4);

        accumulator.accumulate(grain.as_slice(), [0].into_iter());
        assert_eq!(accumulator.emit(), &[0.0; 4]);

        accumulator.advance();
        assert_eq!(accumulator.emit(), grain.as_slice());

        accumulator.advance();
        assert_eq!(accumulator.emit(), &[0.0; 4]);
    }

    #[test]
    fn overlapped_placement_wraps_into_emit_half() {
        let grain = [1.0, 2.0, 3.0, 4.0];
        let mut accumulator = RingAccumulator::new();
        accumulator.initialize(4);

        accumulator.accumulate(grain.as_slice(), [0, 2].into_iter());
        // the offset 2 placement wrote its first half into the end of the build half and
        // wrapped its tail into the emit half
        assert_eq!(accumulator.emit(), &[3.0, 4.0, 0.0, 0.0]);

        accumulator.advance();
        assert_eq!(accumulator.emit(), &[1.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn accumulate_sums_instead_of_overwriting() {
        let mut accumulator = RingAccumulator::new();
        accumulator.initialize(4);
        accumulator.accumulate([1.0, 1.0, 1.0, 1.0].as_slice(), [0].into_iter());
        accumulator.accumulate([0.5, 0.5, 0.5, 0.5].as_slice(), [0].into_iter());
        accumulator.advance();
        assert_eq!(accumulator.emit(), &[1.5, 1.5, 1.5, 1.5]);
    }
}
