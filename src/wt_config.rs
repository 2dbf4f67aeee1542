//! Generation parameters.
//!
//! All values are fixed per generator run. The defaults describe a 48 kHz
//! voice with 1024 sample tables, covering MIDI notes 24 to 107 in zones
//! of 16 semitones.

use super::Float;
use super::GeneratorError;

use log::info;
use serde::{Serialize, Deserialize};

use std::fs;

/// Highest note number accepted for the instrument range.
pub const MAX_NOTE: i32 = 127;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_rate: u32,      // Output sample rate of the firmware in Hz
    pub wavetable_size: usize, // Unique samples per table, power of two
    pub min_note: i32,         // Lowest note of the instrument range
    pub max_note: i32,         // Highest note of the instrument range
    pub zone_step: i32,        // Semitones covered by one zone
    pub reference_note: i32,   // Note number of the tuning reference
    pub reference_freq: Float, // Frequency of the tuning reference in Hz
    pub juniness: Float,       // Amount of high-passed signal added to square and saw
    pub num_threads: u32,      // Worker threads for zone synthesis
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            sample_rate: 48000,
            wavetable_size: 1024,
            min_note: 24,
            max_note: 107,
            zone_step: 16,
            reference_note: 69,
            reference_freq: 440.0,
            juniness: 0.0,
            num_threads: 1,
        }
    }
}

impl GeneratorConfig {
    /// Read a configuration from a JSON file.
    ///
    /// Missing fields take their default value. The result is validated
    /// before it is returned.
    ///
    /// ``` no_run
    /// use bl_wavetables::GeneratorConfig;
    ///
    /// let config = GeneratorConfig::from_file("tables.json").unwrap();
    /// ```
    pub fn from_file(filename: &str) -> Result<GeneratorConfig, GeneratorError> {
        info!("Reading configuration [{}]", filename);
        let content = fs::read_to_string(filename)?;
        GeneratorConfig::from_json(&content)
    }

    /// Parse a configuration from a JSON string.
    ///
    /// ```
    /// use bl_wavetables::GeneratorConfig;
    ///
    /// let config = GeneratorConfig::from_json(r#"{ "wavetable_size": 256 }"#).unwrap();
    /// assert_eq!(config.wavetable_size, 256);
    /// assert_eq!(config.sample_rate, 48000);
    /// ```
    pub fn from_json(content: &str) -> Result<GeneratorConfig, GeneratorError> {
        let config: GeneratorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all parameters, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.sample_rate == 0 {
            return Err(GeneratorError::invalid("sample_rate", "must be positive"));
        }
        if self.wavetable_size < 4 || !self.wavetable_size.is_power_of_two() {
            return Err(GeneratorError::invalid("wavetable_size",
                format!("{} is not a power of two >= 4", self.wavetable_size)));
        }
        for (name, note) in &[("min_note", self.min_note),
                              ("max_note", self.max_note),
                              ("reference_note", self.reference_note)] {
            if !(0..=MAX_NOTE).contains(note) {
                return Err(GeneratorError::invalid(*name,
                    format!("{} is outside the note range 0 to {}", note, MAX_NOTE)));
            }
        }
        if self.zone_step <= 0 || self.zone_step > MAX_NOTE + 1 {
            return Err(GeneratorError::invalid("zone_step",
                format!("{} is not in 1 to {}", self.zone_step, MAX_NOTE + 1)));
        }
        if self.max_note < self.min_note {
            return Err(GeneratorError::invalid("max_note",
                format!("{} is below min_note {}", self.max_note, self.min_note)));
        }
        if !self.reference_freq.is_finite() || self.reference_freq <= 0.0 {
            return Err(GeneratorError::invalid("reference_freq", "must be a positive frequency"));
        }
        if !self.juniness.is_finite() {
            return Err(GeneratorError::invalid("juniness", "must be finite"));
        }
        if self.num_threads == 0 {
            return Err(GeneratorError::invalid("num_threads", "must be at least 1"));
        }
        Ok(())
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn default_config_is_valid() {
    assert!(GeneratorConfig::default().validate().is_ok());
}

#[test]
fn non_positive_step_is_rejected() {
    let config = GeneratorConfig { zone_step: 0, ..Default::default() };
    match config.validate() {
        Err(GeneratorError::InvalidParameter { name, .. }) => assert_eq!(name, "zone_step"),
        other => panic!("Unexpected result {:?}", other),
    }
}

#[test]
fn table_size_must_be_power_of_two() {
    let config = GeneratorConfig { wavetable_size: 1000, ..Default::default() };
    assert!(config.validate().is_err());
    let config = GeneratorConfig { wavetable_size: 2, ..Default::default() };
    assert!(config.validate().is_err());
    let config = GeneratorConfig { wavetable_size: 4, ..Default::default() };
    assert!(config.validate().is_ok());
}

#[test]
fn bad_frequencies_are_rejected() {
    let config = GeneratorConfig { reference_freq: 0.0, ..Default::default() };
    assert!(config.validate().is_err());
    let config = GeneratorConfig { reference_freq: Float::NAN, ..Default::default() };
    assert!(config.validate().is_err());
    let config = GeneratorConfig { sample_rate: 0, ..Default::default() };
    assert!(config.validate().is_err());
}

#[test]
fn inverted_note_range_is_rejected() {
    let config = GeneratorConfig { min_note: 60, max_note: 48, ..Default::default() };
    assert!(config.validate().is_err());
}

#[test]
fn invalid_json_config_is_rejected() {
    assert!(GeneratorConfig::from_json(r#"{ "zone_step": -4 }"#).is_err());
    match GeneratorConfig::from_json("{ not json") {
        Err(GeneratorError::Json(_)) => (),
        other => panic!("Unexpected result {:?}", other),
    }
}

#[test]
fn config_survives_json_round_trip() {
    let config = GeneratorConfig { juniness: 0.25, num_threads: 4, ..Default::default() };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(GeneratorConfig::from_json(&json).unwrap(), config);
}

#[test]
fn out_of_range_notes_are_rejected() {
    let extremes = [
        GeneratorConfig { min_note: 0, max_note: 2_000_000_000, zone_step: 1_000_000_000, ..Default::default() },
        GeneratorConfig { min_note: -2_000_000_000, max_note: 2_000_000_000, ..Default::default() },
        GeneratorConfig { reference_note: i32::MIN, ..Default::default() },
        GeneratorConfig { zone_step: i32::MAX, ..Default::default() },
    ];
    for config in extremes.iter() {
        match config.validate() {
            Err(GeneratorError::InvalidParameter { .. }) => (),
            other => panic!("Unexpected result {:?} for {:?}", other, config),
        }
        match crate::WtCreator::generate(config) {
            Err(GeneratorError::InvalidParameter { .. }) => (),
            other => panic!("Unexpected result {:?} for {:?}", other, config),
        }
    }
}

#[test]
fn full_note_range_is_accepted() {
    let config = GeneratorConfig { min_note: 0, max_note: MAX_NOTE, zone_step: MAX_NOTE + 1, ..Default::default() };
    assert!(config.validate().is_ok());
}
