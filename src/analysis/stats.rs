// Stats module - whole-track statistics and small numeric helpers
//
// Boundary detection and climax detection both compare a span against the
// distribution of the whole track, so the pipeline makes a first pass over
// every frame to build `TrackStatistics` before any span is labelled.

use crate::analysis::frames::FeatureFrame;

/// Values below this are treated as zero when dividing
pub const EPSILON: f32 = 1e-9;

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

/// Population standard deviation (0.0 for fewer than two values)
pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values) as f64;
    let var: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt() as f32
}

/// Percentile of an ascending slice, linearly interpolated between ranks
///
/// `p` is in 0..=100. Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) as f64 / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = (rank - lower as f64) as f32;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Median of an unsorted slice (0.0 for an empty slice)
pub fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile(&sorted, 50.0)
}

/// Share of values strictly below `value`, as a percentage
pub fn percentile_rank(sorted: &[f32], value: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let below = sorted.partition_point(|&v| v < value);
    below as f32 * 100.0 / sorted.len() as f32
}

/// Least-squares slope of `ys` against `xs` (units of y per unit of x)
pub fn linear_slope(xs: &[f64], ys: &[f32]) -> f32 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().map(|&y| y as f64).sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        cov += dx * (ys[i] as f64 - mean_y);
        var += dx * dx;
    }
    if var <= f64::EPSILON {
        0.0
    } else {
        (cov / var) as f32
    }
}

/// Centered moving average; the window shrinks at the edges
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    let half = window / 2;
    let len = values.len();
    let mut smoothed = Vec::with_capacity(len);
    for i in 0..len {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(len);
        let sum: f64 = values[start..end].iter().map(|&v| v as f64).sum();
        smoothed.push((sum / (end - start) as f64) as f32);
    }
    smoothed
}

/// Track-wide energy distribution, computed once per analysis
#[derive(Debug, Clone)]
pub struct TrackStatistics {
    pub duration_secs: f64,
    pub hop_secs: f64,
    pub energy_mean: f32,
    pub energy_std: f32,
    sorted_energy: Vec<f32>,
}

impl TrackStatistics {
    pub fn compute(frames: &[FeatureFrame], duration_secs: f64, hop_secs: f64) -> Self {
        let energy: Vec<f32> = frames.iter().map(|f| f.energy).collect();
        let mut sorted_energy = energy.clone();
        sorted_energy.sort_by(|a, b| a.total_cmp(b));
        Self {
            duration_secs,
            hop_secs,
            energy_mean: mean(&energy),
            energy_std: std_dev(&energy),
            sorted_energy,
        }
    }

    /// Energy at percentile `p` of the track's frames
    pub fn energy_percentile(&self, p: f32) -> f32 {
        percentile(&self.sorted_energy, p)
    }

    /// Percentile rank of `energy` within the track's frames
    pub fn energy_rank(&self, energy: f32) -> f32 {
        percentile_rank(&self.sorted_energy, energy)
    }

    pub fn median_energy(&self) -> f32 {
        self.energy_percentile(50.0)
    }

    /// (p95 - p5) / p95, or 0.0 for a silent track
    pub fn dynamic_range(&self) -> f32 {
        let high = self.energy_percentile(95.0);
        if high <= EPSILON {
            return 0.0;
        }
        (high - self.energy_percentile(5.0)) / high
    }

    /// 5-95 percentile energy spread
    pub fn energy_spread(&self) -> f32 {
        self.energy_percentile(95.0) - self.energy_percentile(5.0)
    }
}
