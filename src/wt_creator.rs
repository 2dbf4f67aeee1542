//! Creates the band-limited oscillator tables.
//!
//! Runs the whole generation: zones are computed from the configuration,
//! every zone gets its pulse, square, saw and triangle tables derived from
//! a band-limited kernel, the lowest triangle zones and the guard zone are
//! replaced, and all tables are quantized and collected in firmware order.
//!
//! ```
//! use bl_wavetables::{GeneratorConfig, WtCreator};
//!
//! let config = GeneratorConfig { wavetable_size: 256, ..Default::default() };
//! let tables = WtCreator::generate(&config).unwrap();
//! assert_eq!(tables.len(), 1 + 4 * 7);
//! ```

use super::Float;
use super::{create_sine, PhaseMap, ZoneWaves};
use super::{GeneratorConfig, GeneratorError, ZonePartition};
use super::{TableCollection, TableRef, WaveFamily, Wavetable};
use super::scale;

use log::{info, debug};
use scoped_threadpool::Pool;

use std::sync::Arc;

/// Number of lowest triangle zones sharing the table of zone 0.
pub const COLLAPSED_TRIANGLE_ZONES: usize = 3;

/// All tables of a run before quantization.
#[derive(Debug, Clone)]
pub struct BandlimitedSet {
    pub zones: ZonePartition,
    pub sine: Vec<Float>,
    pub families: Vec<Wavetable>, // In emit order
}

impl BandlimitedSet {
    #[cfg(test)]
    fn family(&self, family: WaveFamily) -> &Wavetable {
        &self.families[family.index()]
    }
}

pub struct WtCreator {
}

impl WtCreator {

    /// Run the complete generation.
    ///
    /// Either returns every table or fails without partial output.
    pub fn generate(config: &GeneratorConfig) -> Result<TableCollection, GeneratorError> {
        info!("Generating band-limited tables: {} samples at {} Hz",
              config.wavetable_size, config.sample_rate);
        let set = WtCreator::create_bandlimited_waves(config)?;
        WtCreator::quantize(&set)
    }

    /// Synthesize the float tables of all zones.
    ///
    /// Zones are independent of each other and are spread over
    /// config.num_threads workers. The result doesn't depend on the number
    /// of threads.
    pub fn create_bandlimited_waves(config: &GeneratorConfig) -> Result<BandlimitedSet, GeneratorError> {
        let zones = ZonePartition::new(config)?;
        let num_samples = config.wavetable_size;
        let num_zones = zones.num_zones();
        let map = PhaseMap::new(num_samples);
        let sine = create_sine(num_samples);

        let mut waves: Vec<Option<ZoneWaves>> = vec![None; num_zones];
        let mut pool = Pool::new(config.num_threads);
        pool.scoped(|scope| {
            for (zone, slot) in zones.zones().iter().zip(waves.iter_mut()) {
                let is_guard = zones.is_guard(zone.index);
                let map = &map;
                let sine = &sine;
                let juniness = config.juniness;
                scope.execute(move || {
                    // Band-limiting degenerates above the range, use a plain sine
                    *slot = Some(if is_guard {
                        ZoneWaves::uniform(sine)
                    } else {
                        ZoneWaves::from_zone(zone, map, juniness)
                    });
                });
            }
        });
        debug!("Synthesized {} zones", num_zones);

        let mut tables: Vec<Vec<Vec<Float>>> = vec![Vec::with_capacity(num_zones); WaveFamily::ALL.len()];
        for zone_waves in waves.into_iter().flatten() {
            let ZoneWaves { pulse, square, saw, triangle } = zone_waves;
            tables[WaveFamily::Pulse.index()].push(pulse);
            tables[WaveFamily::Square.index()].push(square);
            tables[WaveFamily::Saw.index()].push(saw);
            tables[WaveFamily::Triangle.index()].push(triangle);
        }
        let families = WaveFamily::ALL.iter()
            .zip(tables)
            .map(|(family, t)| Wavetable::new_from_vector(*family, num_samples, t))
            .collect();
        Ok(BandlimitedSet { zones, sine, families })
    }

    /// Quantize all tables and collect them in firmware order.
    ///
    /// The guard zone of every family refers to the quantized sine, the
    /// lowest triangle zones to the triangle of zone 0.
    pub fn quantize(set: &BandlimitedSet) -> Result<TableCollection, GeneratorError> {
        let sine: TableRef = Arc::new(scale(&set.sine)?);
        let guard = set.zones.guard_zone().index;
        let mut families: Vec<(WaveFamily, Vec<TableRef>)> = Vec::with_capacity(set.families.len());
        for wt in &set.families {
            let mut zones: Vec<TableRef> = Vec::with_capacity(wt.num_zones);
            for (zone, table) in wt.table.iter().enumerate() {
                if zone == guard {
                    zones.push(Arc::clone(&sine));
                } else {
                    zones.push(Arc::new(scale(table)?));
                }
            }
            if wt.family == WaveFamily::Triangle {
                WtCreator::collapse_lowest_zones(&mut zones, COLLAPSED_TRIANGLE_ZONES);
            }
            families.push((wt.family, zones));
        }
        TableCollection::assemble(sine, &families)
    }

    /// Let the lowest zones share the table of zone 0.
    ///
    /// The last zone is the guard zone and keeps its own table, so at most
    /// num_zones - 1 zones are replaced.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use bl_wavetables::WtCreator;
    ///
    /// let mut zones: Vec<_> = (0..5).map(|z| Arc::new(vec![z as i16])).collect();
    /// WtCreator::collapse_lowest_zones(&mut zones, 3);
    /// assert!(Arc::ptr_eq(&zones[0], &zones[2]));
    /// assert_eq!(*zones[3], vec![3]);
    /// ```
    pub fn collapse_lowest_zones(zones: &mut [TableRef], count: usize) {
        let count = count.min(zones.len().saturating_sub(1));
        if count < 2 {
            return;
        }
        debug!("Zones 1 to {} use the table of zone 0", count - 1);
        let lowest = Arc::clone(&zones[0]);
        for zone in zones.iter_mut().take(count).skip(1) {
            *zone = Arc::clone(&lowest);
        }
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn small_config() -> GeneratorConfig {
    GeneratorConfig { wavetable_size: 256, ..Default::default() }
}

#[test]
fn default_run_has_all_tables() {
    let config = GeneratorConfig::default();
    let tables = WtCreator::generate(&config).unwrap();
    assert_eq!(tables.len(), 29);
    assert_eq!(tables.names()[0], "sine");
    assert_eq!(tables.names()[1], "bandlimited_pulse_0");
    assert_eq!(tables.names()[8], "bandlimited_square_0");
    assert_eq!(tables.names()[15], "bandlimited_saw_0");
    assert_eq!(tables.names()[28], "bandlimited_triangle_6");
    for t in tables.iter() {
        assert_eq!(t.samples.len(), 1025);
    }
}

#[test]
fn all_tables_are_closed_and_full_scale() {
    let tables = WtCreator::generate(&GeneratorConfig::default()).unwrap();
    for t in tables.iter() {
        assert_eq!(t.samples[0], t.samples[1024], "{}", t.name);
        let peak = t.samples.iter().map(|s| (*s as i32).abs()).max().unwrap();
        assert!(peak <= 32767, "{}", t.name);
        assert!(peak >= 32766, "{}", t.name);
    }
}

#[test]
fn float_tables_are_closed() {
    let set = WtCreator::create_bandlimited_waves(&GeneratorConfig::default()).unwrap();
    assert_eq!(set.sine[0], set.sine[1024]);
    for wt in &set.families {
        assert_eq!(wt.num_zones, 7);
        assert!(wt.is_closed(), "{}", wt.family);
    }
}

#[test]
fn lowest_triangles_share_zone_zero() {
    let config = GeneratorConfig::default();
    let set = WtCreator::create_bandlimited_waves(&config).unwrap();
    let tables = WtCreator::quantize(&set).unwrap();
    let zone_0 = tables.get_zone(WaveFamily::Triangle, 0).unwrap();
    for zone in 1..3 {
        let t = tables.get_zone(WaveFamily::Triangle, zone).unwrap();
        assert!(Arc::ptr_eq(zone_0, t));
    }
    let own = scale(set.family(WaveFamily::Triangle).get_wave(0)).unwrap();
    assert_eq!(**zone_0, own);
    let zone_3 = tables.get_zone(WaveFamily::Triangle, 3).unwrap();
    assert!(!Arc::ptr_eq(zone_0, zone_3));
    // Other families keep their own low zones
    let saw_0 = tables.get_zone(WaveFamily::Saw, 0).unwrap();
    let saw_1 = tables.get_zone(WaveFamily::Saw, 1).unwrap();
    assert!(!Arc::ptr_eq(saw_0, saw_1));
}

#[test]
fn guard_zone_is_sine() {
    let tables = WtCreator::generate(&GeneratorConfig::default()).unwrap();
    let sine = tables.get("sine").unwrap();
    for family in WaveFamily::ALL.iter() {
        let guard = tables.get_zone(*family, 6).unwrap();
        assert_eq!(guard, sine);
        assert!(Arc::ptr_eq(guard, sine));
    }
    assert_eq!(sine[256], -32767);
    assert_eq!(sine[768], 32767);
}

#[test]
fn generation_is_deterministic() {
    let config = small_config();
    let first = WtCreator::generate(&config).unwrap();
    let second = WtCreator::generate(&config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn thread_count_does_not_change_output() {
    let single = WtCreator::generate(&small_config()).unwrap();
    let config = GeneratorConfig { num_threads: 4, ..small_config() };
    let multi = WtCreator::generate(&config).unwrap();
    assert_eq!(single, multi);
}

#[test]
fn narrow_range_keeps_guard_zone() {
    // Two zones: zone 0 and the guard, nothing to collapse
    let config = GeneratorConfig { min_note: 60, max_note: 70, ..small_config() };
    let tables = WtCreator::generate(&config).unwrap();
    assert_eq!(tables.len(), 9);
    let sine = tables.get("sine").unwrap();
    let guard = tables.get_zone(WaveFamily::Triangle, 1).unwrap();
    assert!(Arc::ptr_eq(guard, sine));
    let zone_0 = tables.get_zone(WaveFamily::Triangle, 0).unwrap();
    assert!(!Arc::ptr_eq(zone_0, sine));
}

#[test]
fn collapse_never_touches_guard_zone() {
    let mut zones: Vec<TableRef> = (0..3).map(|z| Arc::new(vec![z as i16])).collect();
    WtCreator::collapse_lowest_zones(&mut zones, 3);
    assert!(Arc::ptr_eq(&zones[0], &zones[1]));
    assert_eq!(*zones[2], vec![2]);
}

#[test]
fn juniness_changes_square_only() {
    let plain = WtCreator::generate(&small_config()).unwrap();
    let config = GeneratorConfig { juniness: 0.3, ..small_config() };
    let bright = WtCreator::generate(&config).unwrap();
    assert_ne!(plain.get("bandlimited_square_2"), bright.get("bandlimited_square_2"));
    assert_eq!(plain.get("bandlimited_pulse_2"), bright.get("bandlimited_pulse_2"));
    assert_eq!(plain.get("bandlimited_triangle_4"), bright.get("bandlimited_triangle_4"));
}

#[test]
fn invalid_config_produces_nothing() {
    let config = GeneratorConfig { reference_freq: -440.0, ..Default::default() };
    match WtCreator::generate(&config) {
        Err(GeneratorError::InvalidParameter { name, .. }) => assert_eq!(name, "reference_freq"),
        other => panic!("Unexpected result {:?}", other),
    }
}

#[test]
fn high_zones_are_bandlimited() {
    let set = WtCreator::create_bandlimited_waves(&GeneratorConfig::default()).unwrap();
    for zone in set.zones.zones() {
        // Harmonics only get cut once they fit into the table
        if set.zones.is_guard(zone.index) || zone.num_harmonics >= 1024 {
            continue;
        }
        let limit = (zone.num_harmonics - 1) / 2;
        for wt in &set.families {
            assert!(wt.highest_harmonic(zone.index, 1e-6) <= limit, "{} zone {}", wt.family, zone.index);
        }
    }
}
