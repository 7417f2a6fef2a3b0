//! Directional wave spectrum and its decomposition into swell components

use serde::{Deserialize, Serialize};

use crate::swell::{Swell, sort_by_energy};
use crate::units::Units;
use crate::wave_physics::{peakdetect, second_spectral_moment, zero_spectral_moment};

/// Peak prominence used when splitting a spectrum into components
pub const DEFAULT_PEAK_DELTA: f64 = 0.05;

/// Bandwidth assumed for a spectrum with a single bin
const SINGLE_BIN_BANDWIDTH: f64 = 0.01;

/// Parallel arrays of frequency (Hz), energy density (m²/Hz) and mean
/// direction (degrees, "from"), plus the wind-sea/swell separation frequency
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spectrum {
    #[serde(with = "crate::serialize::nan_vec")]
    pub frequency: Vec<f64>,
    #[serde(with = "crate::serialize::nan_vec")]
    pub energy: Vec<f64>,
    #[serde(with = "crate::serialize::nan_vec")]
    pub angle: Vec<f64>,
    #[serde(with = "crate::serialize::nan")]
    pub separation_frequency: f64,
}

impl Spectrum {
    #[must_use]
    pub fn new(
        frequency: Vec<f64>,
        energy: Vec<f64>,
        angle: Vec<f64>,
        separation_frequency: f64,
    ) -> Self {
        Self {
            frequency,
            energy,
            angle,
            separation_frequency,
        }
    }

    /// Number of usable bins
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequency.len().min(self.energy.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of bin `i`: distance to the previous bin, or to the next one for
    /// the first bin
    fn bandwidth(&self, i: usize) -> f64 {
        if i > 0 {
            (self.frequency[i] - self.frequency[i - 1]).abs()
        } else if self.len() > 1 {
            (self.frequency[1] - self.frequency[0]).abs()
        } else {
            SINGLE_BIN_BANDWIDTH
        }
    }

    fn zero_moment(&self, bins: std::ops::Range<usize>) -> f64 {
        bins.map(|i| zero_spectral_moment(self.energy[i], self.bandwidth(i)))
            .sum()
    }

    fn direction_at(&self, i: usize) -> f64 {
        self.angle.get(i).copied().unwrap_or(f64::NAN)
    }

    /// Per-bin wave periods (1/f)
    #[must_use]
    pub fn periods(&self) -> Vec<f64> {
        self.frequency.iter().map(|f| 1.0 / f).collect()
    }

    /// Mean period √(m₀/m₂); NaN for an empty or degenerate spectrum
    #[must_use]
    pub fn average_period(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }

        let (zero, second) = (0..self.len()).fold((0.0, 0.0), |(zero, second), i| {
            let bandwidth = self.bandwidth(i);
            (
                zero + zero_spectral_moment(self.energy[i], bandwidth),
                second + second_spectral_moment(self.energy[i], bandwidth, self.frequency[i]),
            )
        });

        if second == 0.0 {
            return f64::NAN;
        }
        (zero / second).sqrt()
    }

    /// Index of the dominant bin. On ties the lowest frequency bin wins.
    #[must_use]
    pub fn dominant_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &energy) in self.energy.iter().take(self.len()).enumerate() {
            if energy.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, max)| energy > max) {
                best = Some((i, energy));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Significant height over the whole spectrum with the period and
    /// direction of the dominant bin
    #[must_use]
    pub fn wave_summary(&self) -> Option<Swell> {
        let peak = self.dominant_index()?;
        let height = 4.0 * self.zero_moment(0..self.len()).sqrt();
        Some(Swell::new(
            Units::Metric,
            height,
            1.0 / self.frequency[peak],
            self.direction_at(peak),
        ))
    }

    /// Split the spectrum at its detected minima into swell components,
    /// ordered by peak energy with the most energetic first.
    ///
    /// Partition `i` spans bins `(prev_min, next_min]`; the first starts at
    /// bin 0 and the last runs to the final bin.
    #[must_use]
    pub fn swell_components(&self, delta: f64) -> Vec<Swell> {
        if self.is_empty() {
            return Vec::new();
        }

        let energy = &self.energy[..self.len()];
        let peaks = peakdetect(energy, delta);

        let mut components = Vec::with_capacity(peaks.maxima.len());
        let mut start = 0;

        for (i, &(peak, max_energy)) in peaks.maxima.iter().enumerate() {
            let end = peaks
                .minima
                .get(i)
                .map_or(self.len() - 1, |&(index, _)| index);

            let height = 4.0 * self.zero_moment(start..end + 1).sqrt();
            let mut component = Swell::new(
                Units::Metric,
                height,
                1.0 / self.frequency[peak],
                self.direction_at(peak),
            );
            component.max_energy = Some(max_energy);
            component.frequency_index = Some(peak);
            components.push(component);

            start = end + 1;
        }

        sort_by_energy(&mut components);
        components
    }
}
