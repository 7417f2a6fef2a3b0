//! Linear wave theory kernel: dispersion, shoaling, refraction, breaking,
//! spectral moments and peak detection.
//!
//! All inputs and outputs are metric. Gravity is fixed at 9.81 m/s².

use std::f64::consts::PI;

pub const GRAVITY: f64 = 9.81;

/// Returned by [`ldis`] when Newton-Raphson fails to converge
pub const LDIS_NO_CONVERGENCE: f64 = -1.0;

const LDIS_TOLERANCE: f64 = 1e-6;
const LDIS_MAX_ITERATIONS: usize = 50;

/// Wavelength (m) of a wave with the given period (s) in water of the given
/// depth (m), solving the dispersion relation ω²d/g = X·tanh(X).
///
/// Returns [`LDIS_NO_CONVERGENCE`] when the iteration does not settle.
#[must_use]
pub fn ldis(period: f64, depth: f64) -> f64 {
    let omega = 2.0 * PI / period;
    let d = omega.powi(2) * depth / GRAVITY;

    let mut x = if d >= 1.0 { d } else { d.sqrt() };
    let mut iteration = 0;
    let mut err = 1.0_f64;

    while err > LDIS_TOLERANCE && iteration < LDIS_MAX_ITERATIONS {
        let f = x - d / x.tanh();
        let df = 1.0 + d / x.sinh().powi(2);
        let next = x - f / df;
        err = ((next - x) / x).abs();
        x = next;
        iteration += 1;
    }

    if iteration >= LDIS_MAX_ITERATIONS || !x.is_finite() {
        return LDIS_NO_CONVERGENCE;
    }

    2.0 * PI * depth / x
}

/// Shoaling coefficient Ks = √(c₀ / 2cg) for a wave of the given local
/// wavelength at the given depth
#[must_use]
pub fn shoaling_coefficient(wavelength: f64, depth: f64) -> f64 {
    let k = 2.0 * PI / wavelength;
    let kd = k * depth;
    let deep_wavelength = wavelength / kd.tanh();
    let period = 2.0 * PI / (k * GRAVITY).sqrt();

    let deep_celerity = deep_wavelength / period;
    let celerity = deep_celerity * kd.tanh();
    let group_velocity = 0.5 * celerity * (1.0 + (2.0 * kd) / (2.0 * kd).sinh());

    (deep_celerity / (2.0 * group_velocity)).sqrt()
}

/// Refraction coefficient Kr on straight, parallel contours.
///
/// Returns `(kr, shallow_angle_degrees)`.
#[must_use]
pub fn refraction_coefficient(wavelength: f64, depth: f64, incident_angle: f64) -> (f64, f64) {
    let incident = incident_angle.to_radians();
    let k = 2.0 * PI / wavelength;
    let shallow = (incident.sin() * (k * depth).tanh()).asin();
    let kr = (incident.cos() / shallow.cos()).sqrt();
    (kr, shallow.to_degrees())
}

/// Breaking wave height and breaking depth on a plane beach
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakingCharacteristics {
    pub wave_height: f64,
    pub water_depth: f64,
}

/// Solve for the breaking wave height and depth of a deep-water swell.
///
/// `incident_angle` is in degrees relative to the shore normal. A failed
/// dispersion solve yields NaN for both values.
#[must_use]
pub fn breaking_characteristics(
    period: f64,
    incident_angle: f64,
    deep_wave_height: f64,
    beach_slope: f64,
    water_depth: f64,
) -> BreakingCharacteristics {
    let wavelength = ldis(period, water_depth);
    if wavelength == LDIS_NO_CONVERGENCE {
        return BreakingCharacteristics {
            wave_height: f64::NAN,
            water_depth: f64::NAN,
        };
    }

    let incident = incident_angle.to_radians();
    let period_sq = period.powi(2);
    let deep_wavelength = GRAVITY * period_sq / (2.0 * PI);
    let deep_celerity = GRAVITY * period / (2.0 * PI);
    let celerity = wavelength / period;

    let theta = (celerity * incident.sin() / deep_celerity).asin();
    let kr = (incident.cos() / theta.cos()).sqrt();
    let a = 43.8 * (1.0 - (-19.0 * beach_slope).exp());
    let b = 1.56 / (1.0 + (-19.5 * beach_slope).exp());

    let refracted_height = kr * deep_wave_height;
    let w = 0.56 * (refracted_height / deep_wavelength).powf(-0.2);
    let breaking_height = w * refracted_height;

    let k = b - a * (breaking_height / (GRAVITY * period_sq));

    BreakingCharacteristics {
        wave_height: breaking_height,
        water_depth: breaking_height / k,
    }
}

/// Zeroth moment contribution of one spectral bin
#[must_use]
pub fn zero_spectral_moment(energy: f64, bandwidth: f64) -> f64 {
    energy * bandwidth
}

/// Second moment contribution of one spectral bin
#[must_use]
pub fn second_spectral_moment(energy: f64, bandwidth: f64, frequency: f64) -> f64 {
    energy * bandwidth * frequency.powi(2)
}

/// Steepness coefficient 8πm₂ / (g√m₀)
#[must_use]
pub fn steepness_coeff_with_moments(zero_moment: f64, second_moment: f64) -> f64 {
    (8.0 * PI * second_moment) / (GRAVITY * zero_moment.sqrt())
}

/// Qualitative steepness of a sea state
#[must_use]
pub fn steepness(significant_wave_height: f64, dominant_period: f64) -> &'static str {
    let v = (-3.3 * dominant_period.ln()).exp();
    if significant_wave_height > v / 250.0 {
        "Very Steep"
    } else if significant_wave_height > v / 500.0 {
        "Steep"
    } else if significant_wave_height > v / 1000.0 {
        "Average"
    } else {
        "Swell"
    }
}

/// Meteorological speed and "from" direction of a (u, v) wind vector
#[must_use]
pub fn scalar_from_uv(u: f64, v: f64) -> (f64, f64) {
    let direction = (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0);
    let speed = u.hypot(v);
    (speed, direction)
}

/// Indexed local extrema of a signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Peaks {
    /// (index, value) of each detected minimum, in signal order
    pub minima: Vec<(usize, f64)>,
    /// (index, value) of each detected maximum, in signal order
    pub maxima: Vec<(usize, f64)>,
}

impl Peaks {
    #[must_use]
    pub fn min_indexes(&self) -> Vec<usize> {
        self.minima.iter().map(|(i, _)| *i).collect()
    }

    #[must_use]
    pub fn max_indexes(&self) -> Vec<usize> {
        self.maxima.iter().map(|(i, _)| *i).collect()
    }
}

/// Detect local maxima and minima that stand out from their surroundings by
/// more than `delta`.
///
/// A maximum is emitted once the signal falls `delta` below the running max;
/// a minimum once it rises `delta` above the running min. The scan starts by
/// looking for a maximum.
#[must_use]
pub fn peakdetect(values: &[f64], delta: f64) -> Peaks {
    let mut peaks = Peaks::default();

    let mut mn = f64::INFINITY;
    let mut mx = f64::NEG_INFINITY;
    let mut mn_pos = 0;
    let mut mx_pos = 0;
    let mut look_for_max = true;

    for (i, &this) in values.iter().enumerate() {
        if this > mx {
            mx = this;
            mx_pos = i;
        }
        if this < mn {
            mn = this;
            mn_pos = i;
        }

        if look_for_max {
            if this < mx - delta {
                peaks.maxima.push((mx_pos, mx));
                mn = this;
                mn_pos = i;
                look_for_max = false;
            }
        } else if this > mn + delta {
            peaks.minima.push((mn_pos, mn));
            mx = this;
            mx_pos = i;
            look_for_max = true;
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldis_deep_and_intermediate_water() {
        assert!((ldis(10.0, 30.0) - 137.2949).abs() < 1e-3);
        assert!((ldis(8.0, 10.0) - 70.898).abs() < 1e-2);
        assert!((ldis(12.0, 100.0) - 223.22).abs() < 1e-1);
    }

    #[test]
    fn test_breaking_characteristics_reference() {
        let result = breaking_characteristics(10.0, 35.0, 1.5, 0.02, 30.0);
        assert!((result.wave_height - 2.08259).abs() < 1e-4, "{result:?}");
        assert!((result.water_depth - 2.31192).abs() < 1e-4, "{result:?}");
    }

    #[test]
    fn test_shoaling_and_refraction_at_depth() {
        // deep water: Ks -> 1 and no bending
        let wavelength = ldis(6.0, 500.0);
        assert!((shoaling_coefficient(wavelength, 500.0) - 1.0).abs() < 1e-3);
        let (kr, angle) = refraction_coefficient(wavelength, 500.0, 30.0);
        assert!((kr - 1.0).abs() < 1e-6);
        assert!((angle - 30.0).abs() < 1e-6);

        let shallow = ldis(10.0, 5.0);
        let (kr, angle) = refraction_coefficient(shallow, 5.0, 30.0);
        assert!(angle < 30.0);
        assert!(kr < 1.0);
    }

    #[test]
    fn test_peakdetect_two_peaks() {
        let energy = [0.1, 0.2, 1.5, 0.3, 0.1, 0.9, 0.2];
        let peaks = peakdetect(&energy, 0.05);
        assert_eq!(peaks.max_indexes(), vec![2, 5]);
        assert_eq!(peaks.min_indexes(), vec![4]);
    }

    #[test]
    fn test_peakdetect_flat_signal() {
        let peaks = peakdetect(&[1.0; 8], 0.05);
        assert!(peaks.maxima.is_empty());
        assert!(peaks.minima.is_empty());
    }

    #[test]
    fn test_steepness_labels() {
        assert_eq!(steepness(0.5, 16.0), "Very Steep");
        assert_eq!(steepness(1e-6, 4.0), "Swell");
    }

    #[test]
    fn test_scalar_from_uv() {
        // wind blowing toward the east comes from the west
        let (speed, direction) = scalar_from_uv(5.0, 0.0);
        assert!((speed - 5.0).abs() < 1e-12);
        assert!((direction - 270.0).abs() < 1e-9);

        let (_, direction) = scalar_from_uv(0.0, -3.0);
        assert!(direction.abs() < 1e-9 || (direction - 360.0).abs() < 1e-9);
    }
}
