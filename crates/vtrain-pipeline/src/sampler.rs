//! Evenly spaced frame selection.

use std::path::PathBuf;

/// A selected frame and its position in the original sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    /// Index into the full extracted sequence
    pub index: usize,
    /// Seconds from the start of the video
    pub timestamp: f64,
    pub path: PathBuf,
}

impl SampledFrame {
    /// File name of the frame, used as the record's `frame_file`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Pick `min(max_samples, total)` distinct indices evenly spaced over
/// `0..=total-1`, first and last included, rounded to the nearest index.
pub fn sample_indices(total: usize, max_samples: usize) -> Vec<usize> {
    if total == 0 || max_samples == 0 {
        return Vec::new();
    }
    if max_samples >= total {
        return (0..total).collect();
    }
    if max_samples == 1 {
        return vec![0];
    }

    // round(k * (total-1) / (max_samples-1)) in integer arithmetic, halves up.
    let span = total - 1;
    let steps = max_samples - 1;
    (0..max_samples)
        .map(|k| (2 * k * span + steps) / (2 * steps))
        .collect()
}

/// Timestamp of frame `index` when frames were extracted at `fps`.
pub fn frame_timestamp(index: usize, fps: f64) -> f64 {
    index as f64 / fps
}

/// Select frames from the full ordered list and stamp their timestamps.
pub fn sample_frames(frames: &[PathBuf], max_samples: usize, fps: f64) -> Vec<SampledFrame> {
    sample_indices(frames.len(), max_samples)
        .into_iter()
        .map(|index| SampledFrame {
            index,
            timestamp: frame_timestamp(index, fps),
            path: frames[index].clone(),
        })
        .collect()
}
