use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use time::Date;

use crate::note::model::BrokerageNote;
use crate::util::basic::SError;
use crate::util::rc::RcRefCell;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CreateOutcome {
    Created,
    /// A note with the same (number, date, user) already exists.
    Conflict,
}

/// Where imported notes are durably recorded. This is the idempotency
/// boundary: the (note number, note date, user) triple must be unique,
/// and `create` is what ultimately enforces it.
pub trait NoteStore {
    fn exists(
        &mut self,
        note_number: u64,
        note_date: Date,
        user: &str,
    ) -> Result<bool, SError>;

    fn create(&mut self, note: &BrokerageNote) -> Result<CreateOutcome, SError>;
}

pub struct InMemoryNoteStore {
    pub notes: RcRefCell<Vec<BrokerageNote>>,
}

impl InMemoryNoteStore {
    pub fn new(notes: RcRefCell<Vec<BrokerageNote>>) -> InMemoryNoteStore {
        InMemoryNoteStore { notes }
    }
}

fn is_same_note(
    note: &BrokerageNote,
    note_number: u64,
    note_date: Date,
    user: &str,
) -> bool {
    note.note_number == note_number
        && note.note_date == note_date
        && note.user == user
}

impl NoteStore for InMemoryNoteStore {
    fn exists(
        &mut self,
        note_number: u64,
        note_date: Date,
        user: &str,
    ) -> Result<bool, SError> {
        Ok(self
            .notes
            .borrow()
            .iter()
            .any(|n| is_same_note(n, note_number, note_date, user)))
    }

    fn create(&mut self, note: &BrokerageNote) -> Result<CreateOutcome, SError> {
        if self.exists(note.note_number, note.note_date, &note.user)? {
            return Ok(CreateOutcome::Conflict);
        }
        self.notes.borrow_mut().push(note.clone());
        Ok(CreateOutcome::Created)
    }
}

/// One JSON-encoded note per line, appended on create. Good enough for a
/// per-user import history without pulling in a database.
pub struct JsonFileNoteStore {
    pub path: PathBuf,
}

impl JsonFileNoteStore {
    pub fn new(path: PathBuf) -> JsonFileNoteStore {
        JsonFileNoteStore { path }
    }

    fn load_notes(&self) -> Result<Vec<BrokerageNote>, SError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file =
            std::fs::File::open(&self.path).map_err(|e| e.to_string())?;
        let mut notes = Vec::new();
        for line_res in BufReader::new(file).lines() {
            let line = line_res.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let note: BrokerageNote = serde_json::from_str(&line)
                .map_err(|e| format!("Corrupt note record: {}", e))?;
            notes.push(note);
        }
        Ok(notes)
    }
}

impl NoteStore for JsonFileNoteStore {
    fn exists(
        &mut self,
        note_number: u64,
        note_date: Date,
        user: &str,
    ) -> Result<bool, SError> {
        Ok(self
            .load_notes()?
            .iter()
            .any(|n| is_same_note(n, note_number, note_date, user)))
    }

    fn create(&mut self, note: &BrokerageNote) -> Result<CreateOutcome, SError> {
        if self.exists(note.note_number, note.note_date, &note.user)? {
            return Ok(CreateOutcome::Conflict);
        }
        let json = serde_json::to_string(note).map_err(|e| e.to_string())?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| e.to_string())?;
        writeln!(file, "{}", json).map_err(|e| e.to_string())?;
        Ok(CreateOutcome::Created)
    }
}
