//! Ordered collection of named, quantized tables.
//!
//! The firmware addresses tables by position: the sine first, then every
//! family in a contiguous block with its zones in ascending order. Names
//! follow the same scheme (`sine`, `bandlimited_saw_3`, ...) so that the
//! tables can be written out as named constants.

use super::{GeneratorError, WaveFamily};

use log::{debug, info};
use serde::Serialize;

use std::sync::Arc;

/// A quantized table. Slots may share one table.
pub type TableRef = Arc<Vec<i16>>;

pub const SINE_NAME: &str = "sine";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedTable {
    pub name: String,
    pub samples: TableRef,
}

/// Firmware resource constant of a table slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub constant: String, // e.g. WAV_BANDLIMITED_SAW_3
    pub index: usize,     // Position in the collection
    pub size: usize,      // Number of values in the table
    pub storage: usize,   // Index of the distinct table holding the data
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableCollection {
    tables: Vec<NamedTable>,
}

impl TableCollection {
    pub fn new() -> TableCollection {
        TableCollection { tables: Vec::new() }
    }

    /// Assemble the collection in firmware order.
    ///
    /// families holds one entry per family, each with its zone tables in
    /// ascending order. All families must have the same number of zones.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use bl_wavetables::{TableCollection, WaveFamily};
    ///
    /// let sine = Arc::new(vec![0, 1, 0]);
    /// let zones = vec![Arc::clone(&sine), Arc::clone(&sine)];
    /// let families: Vec<_> = WaveFamily::ALL.iter().map(|f| (*f, zones.clone())).collect();
    /// let tables = TableCollection::assemble(sine, &families).unwrap();
    /// assert_eq!(tables.len(), 9);
    /// assert_eq!(tables.names()[2], "bandlimited_pulse_1");
    /// ```
    pub fn assemble(sine: TableRef, families: &[(WaveFamily, Vec<TableRef>)]) -> Result<TableCollection, GeneratorError> {
        let mut families = families.to_vec();
        families.sort_by_key(|(family, _)| family.index());
        for (expected, (family, _)) in WaveFamily::ALL.iter().zip(&families) {
            if expected != family {
                return Err(GeneratorError::invalid("families", format!("missing {}", expected)));
            }
        }
        if families.len() != WaveFamily::ALL.len() {
            return Err(GeneratorError::invalid("families",
                format!("expected {} families, got {}", WaveFamily::ALL.len(), families.len())));
        }
        let num_zones = families[0].1.len();
        if families.iter().any(|(_, zones)| zones.len() != num_zones) {
            return Err(GeneratorError::invalid("families", "zone count differs between families"));
        }

        let mut collection = TableCollection::new();
        collection.push(SINE_NAME, sine);
        for (family, zones) in &families {
            for (zone, table) in zones.iter().enumerate() {
                collection.push(&family.table_name(zone), Arc::clone(table));
            }
        }
        info!("Assembled {} tables, {} zones per family", collection.len(), num_zones);
        Ok(collection)
    }

    pub fn push(&mut self, name: &str, samples: TableRef) {
        debug!("Adding table {} ({} values)", name, samples.len());
        self.tables.push(NamedTable { name: name.to_string(), samples });
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedTable> {
        self.tables.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up a table by name.
    pub fn get(&self, name: &str) -> Option<&TableRef> {
        self.tables.iter().find(|t| t.name == name).map(|t| &t.samples)
    }

    /// Look up the table of a family zone.
    pub fn get_zone(&self, family: WaveFamily, zone: usize) -> Option<&TableRef> {
        self.get(&family.table_name(zone))
    }

    /// Position of a table in the collection.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }

    /// Distinct tables, in order of first appearance.
    ///
    /// Slots sharing one table are only listed once.
    pub fn unique_tables(&self) -> Vec<&NamedTable> {
        let mut unique: Vec<&NamedTable> = Vec::new();
        for t in &self.tables {
            if !unique.iter().any(|u| Arc::ptr_eq(&u.samples, &t.samples)) {
                unique.push(t);
            }
        }
        unique
    }

    /// Firmware resource constants of all slots.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use bl_wavetables::TableCollection;
    ///
    /// let mut tables = TableCollection::new();
    /// let sine = Arc::new(vec![0, 1, 0]);
    /// tables.push("sine", Arc::clone(&sine));
    /// tables.push("bandlimited_saw_0", sine);
    /// let index = tables.resource_index();
    /// assert_eq!(index[1].constant, "WAV_BANDLIMITED_SAW_0");
    /// assert_eq!(index[1].storage, 0);
    /// ```
    pub fn resource_index(&self) -> Vec<ResourceEntry> {
        let unique = self.unique_tables();
        self.tables.iter()
            .enumerate()
            .map(|(index, t)| ResourceEntry {
                constant: format!("WAV_{}", t.name.to_uppercase()),
                index,
                size: t.samples.len(),
                storage: unique.iter()
                    .position(|u| Arc::ptr_eq(&u.samples, &t.samples))
                    .unwrap_or(index),
            })
            .collect()
    }

    /// Serialize the collection as JSON.
    pub fn to_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string(&self.tables)?)
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn test_families(num_zones: usize) -> Vec<(WaveFamily, Vec<TableRef>)> {
    WaveFamily::ALL.iter()
        .map(|f| {
            let zones = (0..num_zones)
                .map(|z| Arc::new(vec![f.index() as i16, z as i16, f.index() as i16]))
                .collect();
            (*f, zones)
        })
        .collect()
}

#[test]
fn tables_are_ordered_by_family_then_zone() {
    let sine = Arc::new(vec![0, -1, 0]);
    let tables = TableCollection::assemble(sine, &test_families(3)).unwrap();
    assert_eq!(tables.len(), 13);
    assert_eq!(tables.names()[0], "sine");
    for family in WaveFamily::ALL.iter() {
        for zone in 0..3 {
            let name = family.table_name(zone);
            assert_eq!(tables.index_of(&name), Some(1 + family.index() * 3 + zone));
            let table = tables.get_zone(*family, zone).unwrap();
            assert_eq!(table[0], family.index() as i16);
            assert_eq!(table[1], zone as i16);
        }
    }
}

#[test]
fn family_order_does_not_depend_on_input_order() {
    let sine = Arc::new(vec![0, -1, 0]);
    let mut families = test_families(2);
    families.reverse();
    let tables = TableCollection::assemble(Arc::clone(&sine), &families).unwrap();
    let expected = TableCollection::assemble(sine, &test_families(2)).unwrap();
    assert_eq!(tables, expected);
}

#[test]
fn incomplete_families_are_rejected() {
    let sine = Arc::new(vec![0, -1, 0]);
    let mut families = test_families(2);
    families.pop();
    assert!(TableCollection::assemble(Arc::clone(&sine), &families).is_err());

    let mut families = test_families(2);
    families[1].1.pop();
    assert!(TableCollection::assemble(sine, &families).is_err());
}

#[test]
fn shared_tables_are_stored_once() {
    let sine = Arc::new(vec![0, -1, 0]);
    let mut families = test_families(3);
    families[3].1[1] = Arc::clone(&families[3].1[0]);
    families[3].1[2] = Arc::clone(&sine);
    let tables = TableCollection::assemble(sine, &families).unwrap();
    assert_eq!(tables.unique_tables().len(), 11);
    let index = tables.resource_index();
    assert_eq!(index[0].constant, "WAV_SINE");
    assert_eq!(index[11].storage, index[10].storage);
    assert_eq!(index[12].storage, 0);
    assert_eq!(index[12].size, 3);
}

#[test]
fn json_keeps_names_and_order() {
    let mut tables = TableCollection::new();
    tables.push("sine", Arc::new(vec![0, 32767, 0]));
    tables.push("bandlimited_pulse_0", Arc::new(vec![-1, 2, -1]));
    let json = tables.to_json().unwrap();
    assert_eq!(json, r#"[{"name":"sine","samples":[0,32767,0]},{"name":"bandlimited_pulse_0","samples":[-1,2,-1]}]"#);
}
