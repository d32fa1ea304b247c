// Format conversion for CPAL audio streams
//
// Internally everything is mono f32. Output frames are written to every channel of
// the device's interleaved buffer; captured interleaved input is averaged down to
// mono. cpal's `Sample` conversions cover f32, i16 and u16 devices.

use cpal::{FromSample, Sample};

/// Write one mono f32 sample to every channel of an interleaved output frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(internal_sample);
    }
}

/// Average an interleaved input buffer down to mono f32, appending to `out`
pub fn downmix_interleaved_to_mono<T>(input: &[T], channels: usize, out: &mut Vec<f32>)
where
    T: Sample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    if channels == 1 {
        out.extend(input.iter().map(|s| s.to_sample::<f32>()));
        return;
    }

    let scale = 1.0 / channels as f32;
    out.extend(input.chunks_exact(channels).map(|frame| {
        frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() * scale
    }));
}
