//! Vernacular to scientific name lookup table

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use phyto_core::{PhytoError, Result};

/// Maps lower-cased vernacular names to their candidate scientific names
///
/// Built from a `vernacular\tscientific` file. Several lines may share a
/// vernacular name; candidates keep file order and their original case.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<String, Vec<String>>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lookup file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PhytoError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse lookup rows; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| PhytoError::Lookup(format!("line {}: {e}", idx + 1)))?;
            if line.trim().is_empty() {
                continue;
            }

            match line.split('\t').collect::<Vec<_>>().as_slice() {
                [vernacular, scientific] if !vernacular.is_empty() && !scientific.is_empty() => {
                    table.insert(vernacular, *scientific);
                }
                _ => {
                    return Err(PhytoError::Lookup(format!(
                        "line {}: expected 'vernacular<TAB>scientific', got '{line}'",
                        idx + 1
                    )))
                }
            }
        }

        Ok(table)
    }

    pub fn insert(&mut self, vernacular: &str, scientific: impl Into<String>) {
        self.entries
            .entry(vernacular.to_lowercase())
            .or_default()
            .push(scientific.into());
    }

    /// All candidates for a name, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    /// The candidate used for a fallback query
    pub fn first_candidate(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|candidates| candidates.first())
            .map(String::as_str)
    }

    /// Number of distinct vernacular names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_case_insensitive_keys() {
        let table = LookupTable::from_reader(Cursor::new(
            "Pantoffelblume\tCalceolaria integrifolia\n\
             pantoffelblume\tCalceolaria polyrhiza\n\
             \n\
             Gänseblümchen\tBellis perennis\n",
        ))
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("PANTOFFELBLUME").unwrap(),
            &["Calceolaria integrifolia".to_string(), "Calceolaria polyrhiza".to_string()]
        );
        assert_eq!(table.first_candidate("gänseblümchen"), Some("Bellis perennis"));
        assert_eq!(table.first_candidate("Purpurglöckchen"), None);
    }

    #[test]
    fn test_malformed_line_is_error() {
        let err = LookupTable::from_reader(Cursor::new("a\tb\nno tab here\n")).unwrap_err();
        match err {
            PhytoError::Lookup(message) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("de_lat_lookup.tsv");
        std::fs::write(&path, "Zwerg-Gänsekresse\tArabidopsis pumila\n").unwrap();

        let table = LookupTable::load(&path).unwrap();
        assert_eq!(table.first_candidate("zwerg-gänsekresse"), Some("Arabidopsis pumila"));
    }
}
