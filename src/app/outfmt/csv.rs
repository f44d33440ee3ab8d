use std::io::Write;

use crate::util::rw::WriteHandle;

use super::model::{Error, NoteWriter, OutputType, RenderTable};

pub struct CsvWriter {
    w: WriteHandle,
}

impl CsvWriter {
    pub fn new_to_writer(w: WriteHandle) -> CsvWriter {
        CsvWriter { w: w }
    }
}

impl NoteWriter for CsvWriter {
    fn print_render_table(
        &mut self,
        _out_type: OutputType,
        _name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error> {
        let mut csv_w = csv::Writer::from_writer(self.w.clone());
        csv_w.write_record(&table_model.header).map_err(|e| e.to_string())?;
        for row in &table_model.rows {
            csv_w.write_record(row).map_err(|e| e.to_string())?;
        }
        if !table_model.footer.is_empty() {
            csv_w.write_record(&table_model.footer).map_err(|e| e.to_string())?;
        }
        csv_w.flush().map_err(|e| e.to_string())?;
        drop(csv_w);

        writeln!(self.w).map_err(|e| e.to_string())?;
        Ok(())
    }
}
