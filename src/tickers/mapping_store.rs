use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use crate::util::rc::RcRefCell;
use crate::util::rw::WriteHandle;
use crate::write_errln;

use super::Error;

/// The durable name -> symbol facts, owned by something outside the import
/// pipeline. The resolver read-throughs this at session start and
/// write-throughs every newly learned mapping.
pub trait MappingStore {
    fn load_all(&mut self) -> Result<HashMap<String, String>, Error>;
    fn save(&mut self, normalized_name: &str, symbol: &str) -> Result<(), Error>;
}

pub struct InMemoryMappingStore {
    pub mappings: RcRefCell<HashMap<String, String>>,
}

impl InMemoryMappingStore {
    pub fn new(mappings: RcRefCell<HashMap<String, String>>) -> Self {
        InMemoryMappingStore { mappings }
    }
}

impl MappingStore for InMemoryMappingStore {
    fn load_all(&mut self) -> Result<HashMap<String, String>, Error> {
        Ok(self.mappings.borrow().clone())
    }

    fn save(&mut self, normalized_name: &str, symbol: &str) -> Result<(), Error> {
        self.mappings
            .borrow_mut()
            .insert(normalized_name.to_string(), symbol.to_string());
        Ok(())
    }
}

/// CSV file of normalized_name,symbol rows. Saves append; on load, later
/// rows win, so a re-resolved name simply shadows its old mapping.
pub struct CsvMappingStore {
    pub path: PathBuf,
    err_stream: WriteHandle,
}

impl CsvMappingStore {
    pub fn new(path: PathBuf, err_stream: WriteHandle) -> CsvMappingStore {
        CsvMappingStore { path, err_stream }
    }

    fn get_mappings_from_csv(
        &mut self,
        r: &mut dyn std::io::Read,
    ) -> HashMap<String, String> {
        let mut csv_r =
            csv::ReaderBuilder::new().has_headers(false).from_reader(r);

        let mut mappings = HashMap::new();
        for record_res in csv_r.records() {
            let record = match record_res {
                Ok(r) => r,
                Err(e) => {
                    write_errln!(
                        self.err_stream,
                        "Error reading ticker mapping record: {}",
                        e
                    );
                    continue;
                }
            };
            let name = match record.get(0) {
                Some(n) if !n.trim().is_empty() => n.trim().to_string(),
                _ => {
                    write_errln!(
                        self.err_stream,
                        "Ticker mapping row has no name field"
                    );
                    continue;
                }
            };
            let symbol = match record.get(1) {
                Some(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => {
                    write_errln!(
                        self.err_stream,
                        "Ticker mapping for \"{}\" has no symbol",
                        name
                    );
                    continue;
                }
            };
            mappings.insert(name, symbol);
        }
        mappings
    }
}

impl MappingStore for CsvMappingStore {
    fn load_all(&mut self) -> Result<HashMap<String, String>, Error> {
        if !self.path.exists() {
            // First run. Nothing learned yet.
            return Ok(HashMap::new());
        }
        let mut file = File::open(&self.path).map_err(|e| e.to_string())?;
        Ok(self.get_mappings_from_csv(&mut file))
    }

    fn save(&mut self, normalized_name: &str, symbol: &str) -> Result<(), Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| e.to_string())?;
        let mut csv_w = csv::Writer::from_writer(file);
        csv_w
            .write_record(vec![normalized_name, symbol])
            .map_err(|e| e.to_string())?;
        csv_w.flush().map_err(|e| e.to_string())
    }
}
