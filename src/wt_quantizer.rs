//! Converts real valued tables to signed 16 bit samples.
//!
//! Tables containing any non-positive value are scaled symmetrically by
//! their largest magnitude. Strictly positive tables are stretched from
//! their minimum to their maximum over [0, 32767].

use super::Float;
use super::GeneratorError;

use log::trace;
use num::ToPrimitive;

/// Largest sample value of the target format.
pub const FULL_SCALE: Float = 32767.0;

/// Quantize a table to 16 bit.
///
/// Rounds half away from zero. Fails for tables without any range, e.g.
/// all zeros, and for non-finite values.
///
/// ```
/// use bl_wavetables::scale;
///
/// assert_eq!(scale(&[-0.5, 0.0, 1.0]).unwrap(), vec![-16384, 0, 32767]);
/// assert_eq!(scale(&[0.25, 0.5, 1.0]).unwrap(), vec![0, 10922, 32767]);
/// assert!(scale(&[0.0, 0.0]).is_err());
/// ```
pub fn scale(table: &[Float]) -> Result<Vec<i16>, GeneratorError> {
    let (min, max) = get_extremes(table)?;
    let scaled: Vec<Float> = if min > 0.0 {
        let range = max - min;
        if range <= 0.0 {
            return Err(GeneratorError::DegenerateTable);
        }
        table.iter().map(|x| (x - min) / range * FULL_SCALE).collect()
    } else {
        let abs_max = max.max(-min);
        if abs_max <= 0.0 {
            return Err(GeneratorError::DegenerateTable);
        }
        table.iter().map(|x| x / abs_max * FULL_SCALE).collect()
    };
    trace!("Scaled table: min {}, max {}", min, max);
    scaled.iter()
        .map(|x| x.round().to_i16().ok_or(GeneratorError::SampleOutOfRange(*x)))
        .collect()
}

// Return min and max values of given table.
fn get_extremes(table: &[Float]) -> Result<(Float, Float), GeneratorError> {
    if table.is_empty() {
        return Err(GeneratorError::DegenerateTable);
    }
    let mut min = Float::INFINITY;
    let mut max = Float::NEG_INFINITY;
    for &current in table {
        if !current.is_finite() {
            return Err(GeneratorError::SampleOutOfRange(current));
        }
        if current > max {
            max = current;
        }
        if current < min {
            min = current;
        }
    }
    Ok((min, max))
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn symmetric_scaling_uses_largest_magnitude() {
    assert_eq!(scale(&[-0.5, 0.0, 1.0]).unwrap(), vec![-16384, 0, 32767]);
    assert_eq!(scale(&[-2.0, 1.0]).unwrap(), vec![-32767, 16384]);
}

#[test]
fn positive_table_is_stretched_to_range() {
    assert_eq!(scale(&[0.25, 0.5, 1.0]).unwrap(), vec![0, 10922, 32767]);
    assert_eq!(scale(&[3.0, 2.0]).unwrap(), vec![32767, 0]);
}

#[test]
fn negative_table_keeps_sign() {
    let result = scale(&[-1.0, -0.25, -0.5]).unwrap();
    assert_eq!(result, vec![-32767, -8192, -16384]);
}

#[test]
fn halves_round_away_from_zero() {
    // 0.5 * 32767 lands exactly on 16383.5
    assert_eq!(scale(&[-0.5, 0.5, 1.0]).unwrap(), vec![-16384, 16384, 32767]);
}

#[test]
fn degenerate_tables_are_rejected() {
    match scale(&[0.0; 16]) {
        Err(GeneratorError::DegenerateTable) => (),
        other => panic!("Unexpected result {:?}", other),
    }
    assert!(scale(&[0.5, 0.5]).is_err());
    assert!(scale(&[]).is_err());
}

#[test]
fn non_finite_values_are_rejected() {
    match scale(&[0.0, Float::NAN, 1.0]) {
        Err(GeneratorError::SampleOutOfRange(_)) => (),
        other => panic!("Unexpected result {:?}", other),
    }
    assert!(scale(&[Float::INFINITY, -1.0]).is_err());
}

#[test]
fn result_stays_within_full_scale() {
    let table: Vec<Float> = (0..100).map(|i| ((i as Float) * 0.37).sin() * 3.3).collect();
    let result = scale(&table).unwrap();
    let peak = result.iter().map(|s| (*s as i32).abs()).max().unwrap();
    assert!(peak <= 32767);
    assert!(peak >= 32766);
}
