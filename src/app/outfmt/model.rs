#[derive(Default)]
pub struct RenderTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
    pub notes: Vec<String>,
}

pub enum OutputType {
    Operations,
    Summary,
    Positions,
    Raw,
}

pub type Error = String;

pub trait NoteWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error>;
}
