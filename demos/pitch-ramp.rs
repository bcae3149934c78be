//! An example that ramps the pitch ratio from a control thread while a tone is rendered
//! block by block through the shifter. The processed audio is written to a WAV file.

use std::{f32::consts::PI, sync::mpsc, thread, time::Duration};

use grainshift::{BlockProcessor, Error, PitchShifter, WindowKind};

// -------------------------------------------------------------------------------------------------

/// Grain size: block length of the processing stage.
const GRAIN_SIZE: usize = 4096;
/// Output sample rate in Hz.
const SAMPLE_RATE: u32 = 44100;
/// Frequency of the rendered test tone in Hz.
const TONE_FREQUENCY: f32 = 220.0;
/// Total length of the rendered file in seconds.
const DURATION_SECONDS: u32 = 6;

/// Pitch ratio increment per ramp step.
const RAMP_INCREMENT: f64 = 0.01;
/// Wall-clock interval between ramp steps.
const RAMP_INTERVAL: Duration = Duration::from_millis(10);
/// Ratio at which the ramp stops.
const RAMP_TARGET: f64 = 5.0;

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    simple_logger::SimpleLogger::new().init().unwrap();

    let mut shifter = PitchShifter::with_window(GRAIN_SIZE, WindowKind::Rectangular)?;
    shifter.initialize()?;

    // ramp the pitch ratio on a separate control thread, with a Kahan-style compensation
    // term so hundreds of small increments don't accumulate floating-point drift
    let controller = shifter.controller();
    let (stop_sender, stop_receiver) = mpsc::channel::<()>();
    let ramp_thread = thread::spawn(move || {
        let mut ratio = 1.0;
        let mut compensation = 0.0;
        while ratio < RAMP_TARGET {
            let y = RAMP_INCREMENT - compensation;
            let t = ratio + y;
            compensation = (t - ratio) - y;
            ratio = t;
            if controller.set_pitch_ratio(ratio).is_err() {
                break;
            }
            if stop_receiver.recv_timeout(RAMP_INTERVAL).is_ok() {
                break;
            }
        }
    });

    // render the tone block by block, paced to wall-clock time so the ramp is audible
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create("pitch-ramp.wav", spec)
        .unwrap_or_else(|err| panic!("Failed to create WAV file: {err}"));

    let block_duration = Duration::from_secs_f64(GRAIN_SIZE as f64 / SAMPLE_RATE as f64);
    let block_count = (DURATION_SECONDS as usize * SAMPLE_RATE as usize) / GRAIN_SIZE;

    let mut input = vec![0.0f32; GRAIN_SIZE];
    let mut output = vec![0.0f32; GRAIN_SIZE];
    let mut phase = 0.0f32;
    for _ in 0..block_count {
        for sample in input.iter_mut() {
            *sample = (phase * 2.0 * PI).sin() * 0.5;
            phase += TONE_FREQUENCY / SAMPLE_RATE as f32;
            if phase >= 1.0 {
                phase -= 1.0;
            }
        }
        shifter.process_block(&input, &mut output);
        for &sample in output.iter() {
            writer
                .write_sample(sample)
                .unwrap_or_else(|err| panic!("Failed to write WAV sample: {err}"));
        }
        thread::sleep(block_duration);
    }

    let _ = stop_sender.send(());
    ramp_thread.join().unwrap();
    writer
        .finalize()
        .unwrap_or_else(|err| panic!("Failed to finalize WAV file: {err}"));

    println!("Done. Wrote the ramped tone to 'pitch-ramp.wav'.");
    Ok(())
}
