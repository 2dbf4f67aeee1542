//! Band-limited impulse kernel and the waveforms derived from it.
//!
//! The kernel is a discretized Dirichlet kernel, one period of an impulse
//! train containing exactly the harmonics that fit below Nyquist for a
//! zone. Square, pulse, triangle and saw tables are built by integrating
//! phase shifted copies of the kernel, which costs O(N) per zone no matter
//! how many harmonics the zone has.

use super::Float;
use super::Zone;

use log::trace;

use std::f64::consts::PI;

/// Denominator guard of the kernel ratio.
///
/// Only matters next to the removable singularity at phase zero, which is
/// set explicitly.
pub const KERNEL_EPSILON: Float = 1e-9;

/// Index permutations used to phase shift tables without recomputing them.
#[derive(Clone, Debug)]
pub struct PhaseMap {
    pub fill: Vec<usize>,       // Identity, kernel peak stays at N/2
    pub wrap: Vec<usize>,       // Shifted by half a period
    pub quadrature: Vec<usize>, // Shifted by a quarter period
}

impl PhaseMap {
    /// Build the permutations for tables of num_samples length.
    ///
    /// ```
    /// use bl_wavetables::PhaseMap;
    ///
    /// let map = PhaseMap::new(8);
    /// assert_eq!(map.wrap, vec![4, 5, 6, 7, 0, 1, 2, 3]);
    /// assert_eq!(map.quadrature, vec![2, 3, 4, 5, 6, 7, 0, 1]);
    /// ```
    pub fn new(num_samples: usize) -> PhaseMap {
        let rotate = |offset: usize| -> Vec<usize> {
            (0..num_samples).map(|n| (n + offset) % num_samples).collect()
        };
        PhaseMap {
            fill: rotate(0),
            wrap: rotate(num_samples / 2),
            quadrature: rotate(num_samples / 4),
        }
    }

    pub fn num_samples(&self) -> usize {
        self.fill.len()
    }

    /// Return the table read through the given permutation.
    pub fn permute(table: &[Float], index: &[usize]) -> Vec<Float> {
        index.iter().map(|&i| table[i]).collect()
    }
}

#[derive(Clone, Debug)]
pub struct Kernel {
    pub num_harmonics: usize,
    pub samples: Vec<Float>,
}

impl Kernel {
    /// Sample the Dirichlet kernel for the given odd harmonic count.
    ///
    /// The N phase points are spaced evenly over [-0.5, 0.5), so the peak
    /// lands on index N/2 and has the exact value 1.0.
    ///
    /// ```
    /// use bl_wavetables::Kernel;
    ///
    /// let kernel = Kernel::new(15, 1024);
    /// assert_eq!(kernel.samples.len(), 1024);
    /// assert_eq!(kernel.samples[512], 1.0);
    /// ```
    pub fn new(num_harmonics: usize, num_samples: usize) -> Kernel {
        let m = num_harmonics as Float;
        let n = num_samples as Float;
        let half = num_samples / 2;
        let mut samples: Vec<Float> = (0..num_samples)
            .map(|k| {
                let i = (k as Float - half as Float) / n;
                (PI * i * m).sin() / (m * (PI * i).sin() + KERNEL_EPSILON)
            })
            .collect();
        samples[half] = 1.0;
        Kernel { num_harmonics, samples }
    }

    pub fn mean(&self) -> Float {
        mean(&self.samples)
    }
}

/// The four band-limited waveforms of one zone.
///
/// Every table holds N + 1 values, the last one a copy of the first for
/// interpolation across the cycle boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneWaves {
    pub pulse: Vec<Float>,
    pub square: Vec<Float>,
    pub saw: Vec<Float>,
    pub triangle: Vec<Float>,
}

impl ZoneWaves {
    /// Derive all waveforms of a zone from its kernel.
    ///
    /// juniness adds a high-passed copy of the signal to square and saw,
    /// brightening them the way Juno oscillators sound. 0.0 disables it.
    ///
    /// ```
    /// use bl_wavetables::{GeneratorConfig, PhaseMap, Zone, ZoneWaves};
    ///
    /// let config = GeneratorConfig::default();
    /// let map = PhaseMap::new(config.wavetable_size);
    /// let waves = ZoneWaves::from_zone(&Zone::new(3, &config), &map, 0.0);
    /// assert_eq!(waves.square.len(), 1025);
    /// assert_eq!(waves.square[0], waves.square[1024]);
    /// ```
    pub fn from_zone(zone: &Zone, map: &PhaseMap, juniness: Float) -> ZoneWaves {
        let kernel = Kernel::new(zone.num_harmonics, map.num_samples());
        trace!("Zone {} kernel: {:?}", zone.index, kernel.samples);
        ZoneWaves::from_kernel(&kernel, map, juniness)
    }

    pub fn from_kernel(kernel: &Kernel, map: &PhaseMap, juniness: Float) -> ZoneWaves {
        let num_samples = map.num_samples();
        let n = num_samples as Float;
        let pulse = PhaseMap::permute(&kernel.samples, &map.fill);

        // Integrate two opposite impulse trains half a period apart
        let mut square = cumulative_sum(pulse.iter()
            .zip(&map.wrap)
            .map(|(p, &w)| p - pulse[w]));

        // Same with a quarter period for the asymmetric pulse
        let rectangle = cumulative_sum(pulse.iter()
            .zip(&map.quadrature)
            .map(|(p, &q)| p - pulse[q]));

        // Integrate the reversed square once more
        let square_mean = mean(&square);
        let triangle: Vec<Float> = cumulative_sum(square.iter()
            .rev()
            .map(|s| s - square_mean))
            .iter()
            .map(|t| -t / n)
            .collect();

        if juniness != 0.0 {
            for (s, t) in square.iter_mut().zip(&triangle) {
                *s -= juniness * t;
            }
        }
        let triangle = PhaseMap::permute(&triangle, &map.quadrature);

        // A single impulse train integrates to a saw
        let pulse_mean = kernel.mean();
        let mut saw: Vec<Float> = cumulative_sum(map.wrap.iter()
            .map(|&w| pulse[w] - pulse_mean))
            .iter()
            .map(|s| -s)
            .collect();
        if juniness != 0.0 {
            let saw_mean = mean(&saw);
            let high: Vec<Float> = cumulative_sum(saw.iter().map(|s| s - saw_mean));
            for (s, h) in saw.iter_mut().zip(&high) {
                *s -= juniness * h / n;
            }
        }

        ZoneWaves {
            pulse: close(rectangle),
            square: close(square),
            saw: close(saw),
            triangle: close(triangle),
        }
    }

    /// All four waveforms replaced by the same table.
    pub fn uniform(table: &[Float]) -> ZoneWaves {
        ZoneWaves {
            pulse: table.to_vec(),
            square: table.to_vec(),
            saw: table.to_vec(),
            triangle: table.to_vec(),
        }
    }
}

/// The inverted reference sine over N + 1 values.
///
/// ```
/// use bl_wavetables::create_sine;
///
/// let sine = create_sine(256);
/// assert_eq!(sine.len(), 257);
/// assert_eq!(sine[0], sine[256]);
/// ```
pub fn create_sine(num_samples: usize) -> Vec<Float> {
    let n = num_samples as Float;
    close((0..num_samples)
        .map(|i| -(i as Float / n * 2.0 * PI).sin())
        .collect())
}

/// Running sum of the values.
pub fn cumulative_sum<I: Iterator<Item = Float>>(values: I) -> Vec<Float> {
    let mut acc = 0.0;
    values.map(|v| { acc += v; acc }).collect()
}

pub fn mean(values: &[Float]) -> Float {
    values.iter().sum::<Float>() / values.len() as Float
}

// Append a copy of the first sample for branch free interpolation
fn close(mut table: Vec<Float>) -> Vec<Float> {
    if let Some(&first) = table.first() {
        table.push(first);
    }
    table
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn is_close_to(actual: Float, expected: Float, delta: Float, index: usize) -> bool {
    let diff = actual - expected;
    if diff > delta || diff < -delta {
        println!("{}: Expected {}, actual {}, delta {}", index, expected, actual, delta);
        false
    } else {
        true
    }
}

#[cfg(test)]
fn test_waves(num_harmonics: usize, num_samples: usize) -> ZoneWaves {
    let map = PhaseMap::new(num_samples);
    ZoneWaves::from_kernel(&Kernel::new(num_harmonics, num_samples), &map, 0.0)
}

#[test]
fn kernel_peak_is_exactly_one() {
    for m in &[1, 15, 1467, 1849] {
        let kernel = Kernel::new(*m, 1024);
        assert_eq!(kernel.samples[512], 1.0);
        for (i, s) in kernel.samples.iter().enumerate() {
            assert!(s.abs() <= 1.0 + 1e-6, "{}: {}", i, s);
        }
    }
}

#[test]
fn kernel_is_even_around_peak() {
    let kernel = Kernel::new(31, 256);
    for k in 1..128 {
        assert!(is_close_to(kernel.samples[128 + k], kernel.samples[128 - k], 1e-7, k));
    }
}

#[test]
fn single_harmonic_kernel_is_flat() {
    // m = 1 has no harmonics besides DC
    let kernel = Kernel::new(1, 64);
    for (i, s) in kernel.samples.iter().enumerate() {
        assert!(is_close_to(*s, 1.0, 1e-6, i));
    }
}

#[test]
fn cumulative_sum_accumulates() {
    let sum = cumulative_sum(vec![1.0, 2.0, -0.5, 0.5].into_iter());
    assert_eq!(sum, vec![1.0, 3.0, 2.5, 3.0]);
}

#[test]
fn sine_is_closed_and_inverted() {
    let sine = create_sine(1024);
    assert_eq!(sine.len(), 1025);
    assert_eq!(sine[0], sine[1024]);
    assert!(is_close_to(sine[256], -1.0, 1e-12, 256));
    assert!(is_close_to(sine[768], 1.0, 1e-12, 768));
}

#[test]
fn derived_waves_are_closed() {
    let waves = test_waves(15, 1024);
    for table in &[&waves.pulse, &waves.square, &waves.saw, &waves.triangle] {
        assert_eq!(table.len(), 1025);
        assert_eq!(table[0], table[1024]);
    }
}

#[test]
fn square_halves_mirror() {
    // The second half integrates the negated differences of the first
    let waves = test_waves(63, 1024);
    let offset = waves.square[511];
    for i in 0..512 {
        assert!(is_close_to(waves.square[i] + waves.square[i + 512], offset, 1e-9, i));
    }
}

#[test]
fn saw_integrates_back_to_zero() {
    let num_samples = 1024;
    let kernel = Kernel::new(63, num_samples);
    let waves = ZoneWaves::from_kernel(&kernel, &PhaseMap::new(num_samples), 0.0);
    // Starts right after the jump, ramps back to zero over the cycle
    assert!(is_close_to(waves.saw[0], kernel.mean() - 1.0, 1e-12, 0));
    assert!(is_close_to(waves.saw[num_samples - 1], 0.0, 1e-9, num_samples - 1));
}

#[test]
fn triangle_is_rotated_by_quarter_period() {
    let waves = test_waves(63, 1024);
    // The unrotated triangle ends at zero, a quarter period earlier once rotated
    assert!(is_close_to(waves.triangle[767], 0.0, 1e-9, 767));
    let peak = waves.triangle.iter().fold(0.0, |acc: Float, t| acc.max(t.abs()));
    assert!(peak > 1.0);
}

#[test]
fn juniness_only_changes_square_and_saw() {
    let map = PhaseMap::new(256);
    let kernel = Kernel::new(31, 256);
    let plain = ZoneWaves::from_kernel(&kernel, &map, 0.0);
    let bright = ZoneWaves::from_kernel(&kernel, &map, 0.5);
    assert_eq!(plain.pulse, bright.pulse);
    assert_eq!(plain.triangle, bright.triangle);
    assert_ne!(plain.square, bright.square);
    assert_ne!(plain.saw, bright.saw);
    assert_eq!(bright.square[0], bright.square[256]);
}
