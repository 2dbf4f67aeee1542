//! The band-limited tables of one waveform family.
//!
//! A family (pulse, square, saw or triangle) holds one table per frequency
//! zone. Every zone table is a vector of N + 1 values representing a single
//! wave cycle, the last value repeating the first so that the firmware can
//! interpolate across the end of the cycle without wrapping the index.
//!
//! The tables are kept as floats until they are quantized for output. The
//! frequency spectrum of a zone table can be calculated to check that no
//! harmonics above the zone limit made it into the table.

use super::Float;

use log::{debug, trace};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use std::fmt;

pub type Harmonic = Complex<Float>;

/// Waveform families in the order they are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveFamily {
    Pulse,
    Square,
    Saw,
    Triangle,
}

impl WaveFamily {
    pub const ALL: [WaveFamily; 4] = [
        WaveFamily::Pulse,
        WaveFamily::Square,
        WaveFamily::Saw,
        WaveFamily::Triangle,
    ];

    /// Prefix of the table names of this family.
    pub fn name(&self) -> &'static str {
        match self {
            WaveFamily::Pulse => "bandlimited_pulse",
            WaveFamily::Square => "bandlimited_square",
            WaveFamily::Saw => "bandlimited_saw",
            WaveFamily::Triangle => "bandlimited_triangle",
        }
    }

    /// Position of the family in the emitted collection.
    pub fn index(&self) -> usize {
        match self {
            WaveFamily::Pulse => 0,
            WaveFamily::Square => 1,
            WaveFamily::Saw => 2,
            WaveFamily::Triangle => 3,
        }
    }

    /// Name of the table for the given zone.
    ///
    /// ```
    /// use bl_wavetables::WaveFamily;
    ///
    /// assert_eq!(WaveFamily::Saw.table_name(3), "bandlimited_saw_3");
    /// ```
    pub fn table_name(&self, zone: usize) -> String {
        format!("{}_{}", self.name(), zone)
    }
}

impl fmt::Display for WaveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Wavetable {
    pub family: WaveFamily,
    pub num_zones: usize,   // Number of zone tables
    pub num_values: usize,  // Length of a single zone table, including duplicated first element (usually 1025)
    pub num_samples: usize, // Length of a single zone table - 1, actual number of unique values (usually 1024)
    pub table: Vec<Vec<Float>>, // One vector per zone
}

impl Wavetable {
    /// Creates a new Wavetable instance with all zone tables set to zero.
    #[cfg(test)]
    pub fn new(family: WaveFamily, num_zones: usize, num_samples: usize) -> Wavetable {
        let num_values = num_samples + 1;
        let table = vec!(vec!(0.0; num_values); num_zones);
        debug!("New Wavetable: {} for {} zones, {} samples",
              family, num_zones, num_samples);
        Wavetable {
            family,
            num_zones,
            num_values,
            num_samples,
            table
        }
    }

    /// Create a new Wavetable using the provided zone tables.
    ///
    /// Every zone table must hold num_samples + 1 values.
    pub fn new_from_vector(family: WaveFamily, num_samples: usize, table: Vec<Vec<Float>>) -> Wavetable {
        let num_values = num_samples + 1;
        let num_zones = table.len();
        debug_assert!(table.iter().all(|t| t.len() == num_values));
        debug!("New Wavetable: {} for {} zones, {} samples",
              family, num_zones, num_samples);
        Wavetable {
            family,
            num_zones,
            num_values,
            num_samples,
            table
        }
    }

    /// Return the table of the given zone.
    pub fn get_wave(&self, zone: usize) -> &Vec<Float> {
        &self.table[zone]
    }

    /// Calculate the frequency spectrum of a zone table.
    ///
    /// Runs an FFT over the unique samples of the table. Bin k holds
    /// harmonic k of the wave cycle.
    ///
    /// ```
    /// use bl_wavetables::{create_sine, Wavetable, WaveFamily};
    ///
    /// let wt = Wavetable::new_from_vector(WaveFamily::Pulse, 64, vec![create_sine(64)]);
    /// let spectrum = wt.get_freq_spectrum(0);
    /// assert!(spectrum[1].norm() > 31.9);
    /// ```
    pub fn get_freq_spectrum(&self, zone: usize) -> Vec<Harmonic> {
        let fft_len = self.num_samples;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);

        let mut buffer: Vec<Complex<Float>> = vec![Complex::zero(); fft_len];
        for (j, sample) in self.table[zone].iter().take(fft_len).enumerate() {
            buffer[j].re = *sample;
            buffer[j].im = 0.0;
        }
        fft.process(&mut buffer);
        buffer
    }

    /// Return the highest harmonic of a zone table above the threshold.
    ///
    /// The threshold is relative to the strongest harmonic, DC excluded.
    /// Only bins up to Nyquist are considered.
    pub fn highest_harmonic(&self, zone: usize, threshold: Float) -> usize {
        let spectrum = self.get_freq_spectrum(zone);
        let half = self.num_samples / 2;
        let peak = spectrum[1..=half].iter().fold(0.0, |acc: Float, h| acc.max(h.norm()));
        let highest = (1..=half).rev()
            .find(|&k| spectrum[k].norm() > peak * threshold)
            .unwrap_or(0);
        trace!("{} zone {}: highest harmonic {}", self.family, zone, highest);
        highest
    }

    /// Check that all zone tables repeat their first value at the end.
    pub fn is_closed(&self) -> bool {
        self.table.iter().all(|t| t.first() == t.last() && t.len() == self.num_values)
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::{create_sine, Kernel, PhaseMap, ZoneWaves};

#[cfg(test)]
fn test_family(family: WaveFamily, harmonics: &[usize], num_samples: usize) -> Wavetable {
    let map = PhaseMap::new(num_samples);
    let table = harmonics.iter()
        .map(|m| {
            let waves = ZoneWaves::from_kernel(&Kernel::new(*m, num_samples), &map, 0.0);
            match family {
                WaveFamily::Pulse => waves.pulse,
                WaveFamily::Square => waves.square,
                WaveFamily::Saw => waves.saw,
                WaveFamily::Triangle => waves.triangle,
            }
        })
        .collect();
    Wavetable::new_from_vector(family, num_samples, table)
}

#[test]
fn family_names_follow_emit_order() {
    for (i, family) in WaveFamily::ALL.iter().enumerate() {
        assert_eq!(family.index(), i);
    }
    assert_eq!(WaveFamily::Triangle.table_name(0), "bandlimited_triangle_0");
    assert_eq!(WaveFamily::Pulse.to_string(), "bandlimited_pulse");
}

#[test]
fn new_table_is_silent_and_closed() {
    let wt = Wavetable::new(WaveFamily::Saw, 3, 256);
    assert_eq!(wt.num_values, 257);
    assert!(wt.is_closed());
    for t in &wt.table {
        assert!(t.iter().all(|s| *s == 0.0));
    }
}

#[test]
fn sine_has_single_harmonic() {
    let wt = Wavetable::new_from_vector(WaveFamily::Pulse, 1024, vec![create_sine(1024)]);
    assert_eq!(wt.highest_harmonic(0, 1e-9), 1);
}

#[test]
fn derived_waves_are_bandlimited() {
    // Odd harmonic counts of a few high zones
    let harmonics = [15, 31, 63];
    for family in WaveFamily::ALL.iter() {
        let wt = test_family(*family, &harmonics, 1024);
        assert!(wt.is_closed());
        for (zone, m) in harmonics.iter().enumerate() {
            let highest = wt.highest_harmonic(zone, 1e-6);
            println!("{} zone {}: highest {}, limit {}", family, zone, highest, (m - 1) / 2);
            assert!(highest <= (m - 1) / 2);
            assert!(highest > 0);
        }
    }
}

#[test]
fn square_has_only_odd_harmonics() {
    let wt = test_family(WaveFamily::Square, &[31], 1024);
    let spectrum = wt.get_freq_spectrum(0);
    let fundamental = spectrum[1].norm();
    for k in (2..16).step_by(2) {
        assert!(spectrum[k].norm() < fundamental * 1e-6, "harmonic {}", k);
    }
    assert!(spectrum[3].norm() > fundamental * 0.2);
}
