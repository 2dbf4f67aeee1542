//! Splits the instrument range into frequency zones.
//!
//! Every zone covers `zone_step` semitones and gets its own set of
//! band-limited tables. One extra guard zone sits above the nominal range;
//! its tables are plain sines.

use super::Float;
use super::{GeneratorConfig, GeneratorError};

use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    pub index: usize,
    pub f0: Float,            // Fundamental frequency of the zone in Hz
    pub period: Float,        // Length of one cycle in samples at the output rate
    pub num_harmonics: usize, // Odd harmonic count of the Dirichlet kernel
}

impl Zone {
    /// Compute the zone with the given index.
    ///
    /// ```
    /// use bl_wavetables::{GeneratorConfig, Zone};
    ///
    /// let zone = Zone::new(0, &GeneratorConfig::default());
    /// assert_eq!(zone.num_harmonics, 1467);
    /// ```
    pub fn new(index: usize, config: &GeneratorConfig) -> Zone {
        let note = i64::from(config.min_note) + i64::from(config.zone_step) * index as i64;
        let two: Float = 2.0;
        let f0 = config.reference_freq
            * two.powf((note - i64::from(config.reference_note)) as Float / 12.0);
        let period = config.sample_rate as Float / f0;
        let num_harmonics = Zone::calc_num_harmonics(period);
        Zone { index, f0, period, num_harmonics }
    }

    /// Odd harmonic count for a cycle of the given length in samples.
    ///
    /// Rounds the period to the odd number at or just above its even floor,
    /// so the result is never more than one sample off the period.
    ///
    /// ```
    /// use bl_wavetables::Zone;
    ///
    /// assert_eq!(Zone::calc_num_harmonics(1848.4), 1849);
    /// assert_eq!(Zone::calc_num_harmonics(14.5), 15);
    /// assert_eq!(Zone::calc_num_harmonics(0.3), 1);
    /// ```
    pub fn calc_num_harmonics(period: Float) -> usize {
        2 * (period / 2.0).floor() as usize + 1
    }
}

#[derive(Clone, Debug)]
pub struct ZonePartition {
    zones: Vec<Zone>,
}

impl ZonePartition {
    /// Number of zones needed for a note range, including the guard zone.
    ///
    /// Returns None for an inverted range or a step that isn't positive.
    ///
    /// ```
    /// use bl_wavetables::ZonePartition;
    ///
    /// assert_eq!(ZonePartition::calc_num_zones(24, 107, 16), Some(7));
    /// assert_eq!(ZonePartition::calc_num_zones(60, 60, 12), Some(2));
    /// assert_eq!(ZonePartition::calc_num_zones(60, 48, 12), None);
    /// ```
    pub fn calc_num_zones(min_note: i32, max_note: i32, step: i32) -> Option<usize> {
        let range = i64::from(max_note) - i64::from(min_note);
        if range < 0 || step <= 0 {
            return None;
        }
        let num_zones = range / i64::from(step) + 2;
        Some(num_zones as usize)
    }

    pub fn new(config: &GeneratorConfig) -> Result<ZonePartition, GeneratorError> {
        config.validate()?;
        let num_zones = ZonePartition::calc_num_zones(config.min_note, config.max_note, config.zone_step)
            .ok_or_else(|| GeneratorError::invalid("zone_step", "no zones for the note range"))?;
        let zones: Vec<Zone> = (0..num_zones).map(|i| Zone::new(i, config)).collect();
        for z in &zones {
            debug!("Zone {}: f0 {:.3} Hz, period {:.3} samples, {} harmonics",
                   z.index, z.f0, z.period, z.num_harmonics);
        }
        Ok(ZonePartition { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    pub fn is_guard(&self, index: usize) -> bool {
        index + 1 == self.zones.len()
    }

    /// The zone above the nominal range.
    pub fn guard_zone(&self) -> &Zone {
        // Never empty: calc_num_zones returns at least 2
        &self.zones[self.zones.len() - 1]
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn is_close_to(actual: Float, expected: Float, delta: Float) -> bool {
    let diff = actual - expected;
    if diff > delta || diff < -delta {
        println!("Expected {}, actual {}, delta {}", expected, actual, delta);
        false
    } else {
        true
    }
}

#[test]
fn default_range_has_seven_zones() {
    let zones = ZonePartition::new(&GeneratorConfig::default()).unwrap();
    assert_eq!(zones.num_zones(), 7);
    assert!(zones.is_guard(6));
    assert!(!zones.is_guard(5));
    assert_eq!(zones.guard_zone().index, 6);
}

#[test]
fn lowest_zone_matches_reference_tuning() {
    let zones = ZonePartition::new(&GeneratorConfig::default()).unwrap();
    let zone = &zones.zones()[0];
    assert!(is_close_to(zone.f0, 32.7032, 0.0001));
    assert!(is_close_to(zone.period, 1467.75, 0.01));
    assert_eq!(zone.num_harmonics, 1467);
}

#[test]
fn zones_are_spaced_by_step() {
    let config = GeneratorConfig::default();
    let zones = ZonePartition::new(&config).unwrap();
    let two: Float = 2.0;
    let ratio = two.powf(config.zone_step as Float / 12.0);
    for pair in zones.zones().windows(2) {
        assert!(is_close_to(pair[1].f0 / pair[0].f0, ratio, 1e-9));
    }
}

#[test]
fn harmonic_count_is_odd_and_near_period() {
    let config = GeneratorConfig { sample_rate: 44100, zone_step: 5, ..Default::default() };
    let zones = ZonePartition::new(&config).unwrap();
    for z in zones.zones() {
        assert_eq!(z.num_harmonics % 2, 1);
        assert!(z.num_harmonics >= 1);
        assert!((z.num_harmonics as Float - z.period).abs() <= 1.0);
    }
}

#[test]
fn invalid_config_gives_no_zones() {
    let config = GeneratorConfig { zone_step: -16, ..Default::default() };
    assert!(ZonePartition::new(&config).is_err());
}

#[test]
fn zone_count_handles_extreme_notes() {
    assert_eq!(ZonePartition::calc_num_zones(i32::MIN, i32::MAX, 1), Some(4_294_967_297));
    assert_eq!(ZonePartition::calc_num_zones(0, 10, 0), None);
    assert_eq!(ZonePartition::calc_num_zones(i32::MAX, i32::MIN, 16), None);
}

#[test]
fn firmware_range_starts_at_note_18() {
    // Zones of the shipped firmware tables
    let config = GeneratorConfig { min_note: 18, max_note: 101, ..Default::default() };
    let zones = ZonePartition::new(&config).unwrap();
    assert_eq!(zones.num_zones(), 7);
    assert!(is_close_to(zones.zones()[0].f0, 23.1247, 0.0001));
    assert_eq!(zones.guard_zone().index, 6);
}
