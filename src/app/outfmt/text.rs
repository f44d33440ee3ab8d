use std::io::Write;

use tabled::settings::Style;

use crate::util::rw::WriteHandle;

use super::model::{Error, NoteWriter, OutputType, RenderTable};

pub struct TextWriter {
    w: WriteHandle,
}

impl TextWriter {
    pub fn new(w: WriteHandle) -> TextWriter {
        TextWriter { w: w }
    }
}

impl NoteWriter for TextWriter {
    fn print_render_table(
        &mut self,
        _out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error> {
        let mut bldr = tabled::builder::Builder::default();
        bldr.push_record(table_model.header.clone());
        for row in &table_model.rows {
            bldr.push_record(row.clone());
        }
        if !table_model.footer.is_empty() {
            bldr.push_record(table_model.footer.clone());
        }

        let mut table = bldr.build();
        table.with(Style::psql());

        writeln!(self.w, "{}:", name).map_err(|e| e.to_string())?;
        writeln!(self.w, "{}", table).map_err(|e| e.to_string())?;
        for note in &table_model.notes {
            writeln!(self.w, "{}", note).map_err(|e| e.to_string())?;
        }
        writeln!(self.w).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::app::outfmt::model::{NoteWriter, OutputType, RenderTable};
    use crate::testlib::assert_re;
    use crate::util::rw::WriteHandle;

    use super::TextWriter;

    #[test]
    fn test_print_render_table() {
        let (w, buff) = WriteHandle::string_buff_write_handle();
        let mut writer = TextWriter::new(w);

        let table = RenderTable {
            header: vec!["symbol".to_string(), "qty".to_string()],
            rows: vec![vec!["PETR4".to_string(), "100".to_string()]],
            footer: vec![],
            notes: vec!["1 operation".to_string()],
        };
        writer.print_render_table(OutputType::Raw, "ops", &table).unwrap();

        let out = buff.borrow().as_str().to_string();
        assert_re("^ops:", &out);
        assert_re("symbol", &out);
        assert_re("PETR4", &out);
        assert_re("1 operation", &out);
    }
}
