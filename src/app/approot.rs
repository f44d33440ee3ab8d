use std::path::{Path, PathBuf};

use crate::app::outfmt::csv::CsvWriter;
use crate::app::outfmt::model::{NoteWriter, OutputType, RenderTable};
use crate::app::outfmt::text::TextWriter;
use crate::note::header::{extract_note_date, extract_note_number, extract_summary};
use crate::note::import::{assemble_operations, ImportError};
use crate::note::model::{
    BrokerageNote, FinancialSummary, NoteStatus, TradeCandidate,
};
use crate::note::pattern::{count_trade_shaped_lines, extract_candidates};
use crate::note::store::{CreateOutcome, NoteStore};
use crate::peripheral::pages::split_marked_text;
use crate::portfolio::PositionBook;
use crate::tickers::{MappingStore, TickerDiscoverer, TickerPrompt, TickerResolver};
use crate::util::decimal::currency_precision_str;
use crate::util::rw::WriteHandle;
use crate::write_errln;

pub type Error = String;

pub struct Options {
    pub pretty: bool,
    pub extract_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { pretty: false, extract_only: false }
    }
}

#[derive(Debug)]
pub struct ImportedNote {
    pub note: BrokerageNote,
    pub summary: FinancialSummary,
}

/// Imports one note, given its per-page text. This is the transactional
/// core: a note either fully reconciles into a BrokerageNote here, or it
/// is rejected as a whole with the reason(s).
///
/// Ticker mappings learned along the way are durable either way, via the
/// resolver's write-through store.
pub fn import_note_pages(
    pages: &[String],
    source_file: &str,
    user: &str,
    resolver: &mut TickerResolver,
    note_store: &mut dyn NoteStore,
    err_stream: &mut WriteHandle,
) -> Result<ImportedNote, ImportError> {
    let full_text = pages.join("\n");

    let note_date =
        extract_note_date(&full_text).map_err(ImportError::DocumentUnreadable)?;
    let note_number = extract_note_number(&full_text)
        .map_err(ImportError::DocumentUnreadable)?;
    tracing::debug!(
        note_number = note_number,
        note_date = note_date.to_string().as_str(),
        "import_note_pages"
    );

    // Cheap early duplicate check, before any resolution work (or user
    // interaction) is spent. `create` below re-enforces this at the
    // boundary regardless.
    match note_store.exists(note_number, note_date, user) {
        Ok(true) => {
            return Err(ImportError::DuplicateNote { note_number, note_date });
        }
        Ok(false) => (),
        Err(e) => {
            tracing::warn!("duplicate pre-check failed: {}", e);
            write_errln!(
                err_stream,
                "Could not check the note store for duplicates: {}",
                e
            );
        }
    }

    let candidates = extract_candidates(&full_text);
    if candidates.is_empty() {
        return Err(ImportError::NoTradesFound);
    }
    let expected_count = count_trade_shaped_lines(&full_text);

    let operations = assemble_operations(
        &candidates,
        expected_count,
        note_number,
        note_date,
        user,
        resolver,
    )?;

    // The totals block lives on the last page. Advisory only.
    let summary =
        extract_summary(pages.last().map(|p| p.as_str()).unwrap_or(""));

    let note = BrokerageNote {
        note_number,
        note_date,
        user: user.to_string(),
        source_file: source_file.to_string(),
        operation_count: operations.len() as u32,
        operations,
        status: NoteStatus::Success,
        error: None,
    };

    match note_store.create(&note) {
        Ok(CreateOutcome::Created) => (),
        Ok(CreateOutcome::Conflict) => {
            return Err(ImportError::DuplicateNote { note_number, note_date });
        }
        Err(e) => {
            // The import itself stands; only the durable record failed.
            tracing::error!("failed to record note {}: {}", note_number, e);
            write_errln!(
                err_stream,
                "Failed to record note {} in the note store: {}",
                note_number,
                e
            );
        }
    }

    Ok(ImportedNote { note, summary })
}

fn load_note_pages(path: &Path) -> Result<Vec<String>, Error> {
    if path.extension().unwrap_or_default().to_string_lossy() == "txt" {
        // Pre-extracted text. Mostly for testing and debugging.
        tracing::trace!("Reading raw text from {:?}", path);
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read text file {:?}: {}", path, e))?;
        return Ok(split_marked_text(&text));
    }

    #[cfg(feature = "pdf_parse")]
    {
        crate::peripheral::pdf::get_all_pages_text_from_path(path)
    }
    #[cfg(not(feature = "pdf_parse"))]
    {
        Err(format!(
            "Cannot read {:?}: PDF support was not compiled in \
             (pdf_parse feature)",
            path
        ))
    }
}

fn operations_render_table(note: &BrokerageNote) -> RenderTable {
    let mut rt = RenderTable::default();
    rt.header.extend(
        vec![
            "note_number",
            "note_date",
            "sequence",
            "symbol",
            "side",
            "market",
            "quantity",
            "price",
            "gross_value",
            "flag",
        ]
        .into_iter()
        .map(String::from),
    );
    for op in &note.operations {
        rt.rows.push(vec![
            op.note_number.to_string(),
            op.note_date.to_string(),
            op.sequence.to_string(),
            op.symbol.clone(),
            op.side.to_string(),
            op.market.clone(),
            op.quantity.to_string(),
            currency_precision_str(&op.price),
            currency_precision_str(&op.gross_value),
            op.flag.to_string(),
        ]);
    }
    rt.notes.push(format!(
        "{} operations from {}",
        note.operation_count, note.source_file
    ));
    rt
}

fn summary_render_table(summary: &FinancialSummary) -> RenderTable {
    let mut rt = RenderTable::default();
    rt.header
        .extend(vec!["field", "value"].into_iter().map(String::from));
    let opt_rows = [
        ("settlement_fee", &summary.settlement_fee),
        ("exchange_fees", &summary.exchange_fees),
        ("brokerage_fee", &summary.brokerage_fee),
        ("total_costs", &summary.total_costs),
        ("irrf_tax", &summary.irrf_tax),
        ("net_amount", &summary.net_amount),
    ];
    for (name, value) in opt_rows {
        if let Some(v) = value {
            rt.rows.push(vec![name.to_string(), currency_precision_str(v)]);
        }
    }
    if let Some(flag) = &summary.net_flag {
        rt.rows.push(vec!["net_flag".to_string(), flag.to_string()]);
    }
    if let Some(date) = &summary.settlement_date {
        rt.rows
            .push(vec!["settlement_date".to_string(), date.to_string()]);
    }
    rt
}

fn positions_render_table(book: &PositionBook) -> RenderTable {
    let mut rt = RenderTable::default();
    rt.header.extend(
        vec![
            "symbol",
            "quantity",
            "average_price",
            "invested_value",
            "realized_pnl",
        ]
        .into_iter()
        .map(String::from),
    );
    for position in book.positions() {
        rt.rows.push(vec![
            position.symbol.clone(),
            position.quantity.to_string(),
            currency_precision_str(&position.average_price),
            currency_precision_str(&position.invested_value),
            currency_precision_str(&position.realized_pnl),
        ]);
    }
    rt
}

fn candidates_render_table(
    candidates: &[TradeCandidate],
    expected_count: usize,
) -> RenderTable {
    let mut rt = RenderTable::default();
    rt.header.extend(
        vec!["sequence", "side", "market", "raw_name", "quantity", "price",
             "gross_value", "flag"]
        .into_iter()
        .map(String::from),
    );
    for c in candidates {
        rt.rows.push(vec![
            c.sequence.to_string(),
            c.side.to_string(),
            c.market.clone(),
            c.raw_spec.clone(),
            c.quantity.to_string(),
            currency_precision_str(&c.price),
            currency_precision_str(&c.gross_value),
            c.flag.to_string(),
        ]);
    }
    rt.notes.push(format!(
        "{} candidates extracted, {} trade-shaped lines detected",
        candidates.len(),
        expected_count
    ));
    rt
}

/// The whole app: load each note document, import it, and fold the
/// accepted operations into a position report.
pub fn run_note_import_app(
    files: &[PathBuf],
    user: &str,
    options: &Options,
    mapping_store: Box<dyn MappingStore>,
    discoverer: Option<Box<dyn TickerDiscoverer>>,
    prompt: Box<dyn TickerPrompt>,
    note_store: &mut dyn NoteStore,
    out_w: WriteHandle,
    mut err_w: WriteHandle,
) -> Result<(), Error> {
    // Sort for deterministic processing order across runs.
    let mut files: Vec<PathBuf> = files.to_vec();
    files.sort();

    let mut resolver =
        TickerResolver::new(mapping_store, discoverer, prompt, err_w.clone());

    let mut printer: Box<dyn NoteWriter> = if options.pretty {
        Box::new(TextWriter::new(out_w))
    } else {
        Box::new(CsvWriter::new_to_writer(out_w))
    };

    let mut all_operations = Vec::new();
    let mut failures = 0usize;

    for fpath in &files {
        let pages = match load_note_pages(fpath) {
            Ok(pages) => pages,
            Err(e) => {
                write_errln!(err_w, "Error: {}", e);
                failures += 1;
                continue;
            }
        };

        if options.extract_only {
            let full_text = pages.join("\n");
            let candidates = extract_candidates(&full_text);
            let expected = count_trade_shaped_lines(&full_text);
            printer.print_render_table(
                OutputType::Raw,
                "candidates",
                &candidates_render_table(&candidates, expected),
            )?;
            continue;
        }

        let source_file = fpath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "<unnamed file>".to_string());

        match import_note_pages(
            &pages,
            &source_file,
            user,
            &mut resolver,
            note_store,
            &mut err_w,
        ) {
            Ok(imported) => {
                printer.print_render_table(
                    OutputType::Operations,
                    "operations",
                    &operations_render_table(&imported.note),
                )?;
                if !imported.summary.is_empty() {
                    printer.print_render_table(
                        OutputType::Summary,
                        "summary",
                        &summary_render_table(&imported.summary),
                    )?;
                }
                all_operations.extend(imported.note.operations.iter().cloned());
            }
            Err(e) => {
                write_errln!(err_w, "Error importing {}: {}", source_file, e);
                failures += 1;
            }
        }
    }

    if !options.extract_only && !all_operations.is_empty() {
        let mut book = PositionBook::new();
        book.apply_all(&all_operations)?;
        printer.print_render_table(
            OutputType::Positions,
            "positions",
            &positions_render_table(&book),
        )?;
    }

    if failures > 0 {
        Err(format!("{} of {} notes failed to import", failures, files.len()))
    } else {
        Ok(())
    }
}
