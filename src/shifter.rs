//! Granular pitch shifting block stage.

use crate::{
    controller::PitchController,
    window::{GrainWindow, WindowKind},
    Error,
};

// -------------------------------------------------------------------------------------------------

mod accumulator;
mod grain;
mod scheduler;

use accumulator::RingAccumulator;
use grain::GrainSynthesizer;
use scheduler::{insertion_offsets, stride_for};

// -------------------------------------------------------------------------------------------------

/// A mono, block based audio processing stage.
///
/// Stages transform audio in `f32` format, one fixed-size block per call, and can be moved into
/// the host engine's audio thread. A host pipeline inserts a stage via normal composition: feed
/// it one input block per callback and route the returned output block onwards - there is no
/// graph wiring to patch.
///
/// `initialize` is called once from a non-real-time thread before processing starts and is the
/// only place where allocations may happen. `process_block` is called repeatedly on the
/// real-time audio thread, so it must not block, allocate memory, or perform other
/// unbounded-latency work, and a block, once started, always completes synchronously.
pub trait BlockProcessor: Send + 'static {
    /// A unique, static name for the stage, used for logging.
    fn name(&self) -> &'static str;

    /// The fixed block length in samples which `process_block` consumes and produces per call.
    fn block_size(&self) -> usize;

    /// Allocates all buffers the stage needs for processing.
    ///
    /// This runs on a non-real-time thread before the stage is handed to the audio engine.
    /// Processing calls made before initialization completes are rejected.
    fn initialize(&mut self) -> Result<(), Error>;

    /// Processes one block of mono samples.
    ///
    /// Infallible by design: a real-time audio callback has no acceptable recovery path for a
    /// fault other than emitting silence, so implementations zero-fill the output and report
    /// the fault via [`log`] instead of propagating it.
    fn process_block(&mut self, input: &[f32], output: &mut [f32]);
}

// -------------------------------------------------------------------------------------------------

/// Window shape specification, resolved to a weight table at initialization time.
#[derive(Debug, Clone)]
enum WindowSpec {
    Kind(WindowKind),
    Custom(GrainWindow),
}

// -------------------------------------------------------------------------------------------------

/// Real-time granular pitch shifter.
///
/// Resynthesizes a stream of fixed-size mono blocks so that the perceived pitch is scaled by a
/// runtime-adjustable ratio while block cadence and playback duration stay unchanged. Per block:
/// the ring accumulator shifts forward, the input block is resampled into a window-weighted
/// grain at the current pitch ratio, the grain is overlap-added into the accumulator at strides
/// derived from the current overlap ratio, and the accumulator's front half becomes the output
/// block. Output trails input by exactly one block.
///
/// Pitch and overlap ratios are read once per block from the shifter's [`PitchController`],
/// whose clonable handle (see [`PitchShifter::controller`]) may be written from any other
/// thread. All buffers are preallocated in [`BlockProcessor::initialize`]; the processing path
/// itself never allocates or blocks.
pub struct PitchShifter {
    grain_size: usize,
    window: WindowSpec,
    controller: PitchController,
    synthesizer: GrainSynthesizer,
    accumulator: RingAccumulator,
}

impl PitchShifter {
    pub const STAGE_NAME: &str = "PitchShifter";

    /// Creates a new pitch shifter with the default rectangular window.
    ///
    /// The grain size defines the fixed block length and must be a positive power of two.
    pub fn new(grain_size: usize) -> Result<Self, Error> {
        Self::with_window(grain_size, WindowKind::default())
    }

    /// Creates a new pitch shifter with one of the built-in window shapes.
    pub fn with_window(grain_size: usize, window: WindowKind) -> Result<Self, Error> {
        Self::validate_grain_size(grain_size)?;
        Ok(Self {
            grain_size,
            window: WindowSpec::Kind(window),
            controller: PitchController::new(),
            synthesizer: GrainSynthesizer::new(),
            accumulator: RingAccumulator::new(),
        })
    }

    /// Creates a new pitch shifter with a custom window weight table.
    ///
    /// The window length must match the grain size.
    pub fn with_custom_window(grain_size: usize, window: GrainWindow) -> Result<Self, Error> {
        Self::validate_grain_size(grain_size)?;
        if window.len() != grain_size {
            return Err(Error::ParameterError(format!(
                "Window length must match the grain size ({}), but is: {}",
                grain_size,
                window.len()
            )));
        }
        Ok(Self {
            grain_size,
            window: WindowSpec::Custom(window),
            controller: PitchController::new(),
            synthesizer: GrainSynthesizer::new(),
            accumulator: RingAccumulator::new(),
        })
    }

    /// The shifter's grain size: block length, window length and buffer granularity in samples.
    pub fn grain_size(&self) -> usize {
        self.grain_size
    }

    /// Returns a clonable handle to the shifter's runtime controls.
    ///
    /// Hand this to e.g. a UI slider or a ramp driver on a control thread. Writes are picked
    /// up by the audio thread at the next block boundary.
    pub fn controller(&self) -> PitchController {
        self.controller.clone()
    }

    /// Processes one block, surfacing errors instead of falling back to silence.
    ///
    /// Validates everything - initialization state, buffer lengths and the ratios read from the
    /// controller - before touching the accumulator, so a rejected block leaves the processing
    /// state completely unchanged.
    pub fn try_process_block(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), Error> {
        if !self.synthesizer.is_initialized() || !self.accumulator.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if input.len() != self.grain_size {
            return Err(Error::BufferSizeError {
                expected: self.grain_size,
                actual: input.len(),
            });
        }
        if output.len() != self.grain_size {
            return Err(Error::BufferSizeError {
                expected: self.grain_size,
                actual: output.len(),
            });
        }

        // read both ratios once: they stay fixed for the whole block
        let ratio = self.controller.pitch_ratio();
        let overlap = self.controller.overlap_ratio();

        // controller setters validate writes, but re-check here to keep the accumulator
        // untouched should an invalid value ever slip through
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::ParameterError(format!(
                "Pitch ratio must be a positive, finite number, but is: {ratio}"
            )));
        }
        let stride = stride_for(overlap, self.grain_size)?;

        self.accumulator.advance();
        let grain = self.synthesizer.synthesize(input, ratio);
        self.accumulator
            .accumulate(grain, insertion_offsets(stride, self.grain_size));
        output.copy_from_slice(self.accumulator.emit());
        Ok(())
    }

    fn validate_grain_size(grain_size: usize) -> Result<(), Error> {
        if grain_size == 0 || !grain_size.is_power_of_two() {
            return Err(Error::ParameterError(format!(
                "Grain size must be a positive power of two, but is: {grain_size}"
            )));
        }
        Ok(())
    }

    /// Runs the given function with allocation checks in debug builds, when enabled.
    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);
        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

impl BlockProcessor for PitchShifter {
    fn name(&self) -> &'static str {
        Self::STAGE_NAME
    }

    fn block_size(&self) -> usize {
        self.grain_size
    }

    fn initialize(&mut self) -> Result<(), Error> {
        let window = match &self.window {
            WindowSpec::Kind(kind) => GrainWindow::new(*kind, self.grain_size),
            WindowSpec::Custom(window) => window.clone(),
        };
        self.synthesizer.initialize(window);
        self.accumulator.initialize(self.grain_size);
        log::debug!(
            "{}: initialized with grain size {}",
            self.name(),
            self.grain_size
        );
        Ok(())
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        let result = Self::assert_no_alloc(|| self.try_process_block(input, output));
        if let Err(err) = result {
            log::error!("{}: failed to process audio block: {err}", self.name());
            output.fill(0.0);
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    fn initialized_shifter(grain_size: usize) -> PitchShifter {
        let mut shifter = PitchShifter::new(grain_size).unwrap();
        shifter.initialize().unwrap();
        shifter
    }

    #[test]
    fn grain_size_validation() {
        assert!(PitchShifter::new(0).is_err());
        assert!(PitchShifter::new(3).is_err());
        assert!(PitchShifter::new(100).is_err());
        assert!(PitchShifter::new(1).is_ok());
        assert!(PitchShifter::new(4096).is_ok());

        // custom windows must match the grain size
        assert!(PitchShifter::with_custom_window(8, GrainWindow::from_fn(4, |_| 1.0)).is_err());
        assert!(PitchShifter::with_custom_window(8, GrainWindow::from_fn(8, |_| 1.0)).is_ok());
    }

    #[test]
    fn uninitialized_processing_is_rejected() {
        let mut shifter = PitchShifter::new(4).unwrap();
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut output = [f32::NAN; 4];

        let result = shifter.try_process_block(&input, &mut output);
        assert!(matches!(result, Err(Error::NotInitialized)));

        // the infallible entry point falls back to silence
        shifter.process_block(&input, &mut output);
        assert_eq!(output, [0.0; 4]);
    }

    #[test]
    fn end_to_end_unit_ratio() {
        // minimal regression test for the pipeline's one block of latency: the first call
        // emits zeros as the grain lands in the accumulator's build half, the second call
        // then emits the first block unchanged
        let mut shifter = initialized_shifter(4);
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut output = [f32::NAN; 4];

        shifter.process_block(&input, &mut output);
        assert_eq!(output, [0.0; 4]);

        shifter.process_block(&input, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn identity_pass_through() {
        // ratio 1.0 with no overlap and a rectangular window reproduces the input stream,
        // delayed by one block
        const GRAIN_SIZE: usize = 64;
        const BLOCK_COUNT: usize = 8;

        let mut rng = SmallRng::seed_from_u64(42);
        let blocks = (0..BLOCK_COUNT)
            .map(|_| {
                (0..GRAIN_SIZE)
                    .map(|_| rng.random::<f32>() * 2.0 - 1.0)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut shifter = initialized_shifter(GRAIN_SIZE);
        let mut output = vec![0.0; GRAIN_SIZE];

        shifter.process_block(&blocks[0], &mut output);
        assert_eq!(output, vec![0.0; GRAIN_SIZE]);
        for i in 1..BLOCK_COUNT {
            shifter.process_block(&blocks[i], &mut output);
            assert_eq!(output, blocks[i - 1]);
        }
    }

    #[test]
    fn rejected_blocks_leave_state_untouched() {
        let mut shifter = initialized_shifter(4);
        let controller = shifter.controller();
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut output = [0.0; 4];

        // fill the accumulator's build half
        shifter.process_block(&input, &mut output);

        // invalid ratios never reach the audio thread: the control surface rejects them
        assert!(controller.set_pitch_ratio(0.0).is_err());
        assert!(controller.set_pitch_ratio(-2.0).is_err());
        assert!(controller.set_overlap_ratio(1.0).is_err());

        // a block with mismatched buffer sizes is rejected before the accumulator advances
        let snapshot = shifter.accumulator.emit().to_vec();
        let result = shifter.try_process_block(&input[..2], &mut output);
        assert!(matches!(result, Err(Error::BufferSizeError { .. })));
        assert_eq!(shifter.accumulator.emit(), snapshot.as_slice());

        // the pipeline continues unharmed
        shifter.process_block(&input, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn overlap_strides_accumulate() {
        // with overlap 0.5 and a rectangular window, two copies of a constant grain are
        // placed one half grain apart, summing to twice the input in steady state
        const GRAIN_SIZE: usize = 8;

        let mut shifter = initialized_shifter(GRAIN_SIZE);
        shifter.controller().set_overlap_ratio(0.5).unwrap();

        let input = [1.0; GRAIN_SIZE];
        let mut output = [0.0; GRAIN_SIZE];
        shifter.process_block(&input, &mut output);
        for _ in 0..4 {
            shifter.process_block(&input, &mut output);
            assert_eq!(output, [2.0; GRAIN_SIZE]);
        }
    }

    #[test]
    fn ratio_and_content_fuzzing() {
        // random ratios in (0, 5] and random block contents must never push an internal read
        // index out of bounds or produce non-finite output
        const GRAIN_SIZE: usize = 4096;
        const BLOCK_COUNT: usize = 50;

        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        let mut shifter = initialized_shifter(GRAIN_SIZE);
        let controller = shifter.controller();

        let mut input = vec![0.0f32; GRAIN_SIZE];
        let mut output = vec![0.0f32; GRAIN_SIZE];
        for _ in 0..BLOCK_COUNT {
            let ratio = rng.random_range(f64::EPSILON..=5.0);
            controller.set_pitch_ratio(ratio).unwrap();
            controller
                .set_overlap_ratio(rng.random_range(0.0..1.0))
                .unwrap();
            for sample in input.iter_mut() {
                *sample = rng.random::<f32>() * 2.0 - 1.0;
            }
            shifter
                .try_process_block(&input, &mut output)
                .unwrap_or_else(|err| panic!("Unexpected processing error: {err}"));
            assert!(output.iter().all(|sample| sample.is_finite()));
        }
    }
}
