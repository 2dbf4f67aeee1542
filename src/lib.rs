//! Band-limited oscillator wavetables for synthesizer firmware.
//!
//! Generates pulse, square, saw and triangle tables for a set of frequency
//! zones, plus a sine reference, quantized to signed 16 bit samples and
//! collected in the order the firmware indexes them.
//!
//! ```
//! use bl_wavetables::{GeneratorConfig, WtCreator};
//!
//! let config = GeneratorConfig::default();
//! let tables = WtCreator::generate(&config).unwrap();
//! assert_eq!(tables.get("sine").unwrap().len(), 1025);
//! ```

mod wavetable;
mod wt_config;
mod wt_creator;
mod wt_emitter;
mod wt_error;
mod wt_kernel;
mod wt_quantizer;
mod wt_zones;

pub use wavetable::{Harmonic, WaveFamily, Wavetable};
pub use wt_config::GeneratorConfig;
pub use wt_creator::{BandlimitedSet, WtCreator};
pub use wt_emitter::{NamedTable, ResourceEntry, TableCollection, TableRef};
pub use wt_error::GeneratorError;
pub use wt_kernel::{create_sine, Kernel, PhaseMap, ZoneWaves, KERNEL_EPSILON};
pub use wt_quantizer::{scale, FULL_SCALE};
pub use wt_zones::{Zone, ZonePartition};

pub type Float = f64;
