use std::path::PathBuf;

use clap::Parser;

use crate::app::approot::{run_note_import_app, Options};
use crate::note::store::JsonFileNoteStore;
use crate::tickers::{
    CsvMappingStore, NonInteractiveTickerPrompt, RemoteTickerDiscoverer,
    StdioTickerPrompt, TickerDiscoverer, TickerPrompt,
};
use crate::util::http::standalone::StandaloneAppRequester;
use crate::util::rw::WriteHandle;
use crate::util::sys::home_dir_file_path;
use crate::write_errln;

const ABOUT: &str = "Brokerage settlement note reconciliation tool";

const LONG_ABOUT: &str = "\
A cli tool which imports brokerage settlement notes (notas de corretagem,
as PDFs or pre-extracted .txt) and reconciles them into a weighted-average
cost position ledger.

Instrument names that cannot be resolved to a market symbol automatically
are looked up remotely, and failing that, asked about interactively.
Resolved mappings are remembered under ~/.b3notes/ so each name is only
ever asked about once.

An import is all-or-nothing: unless every detected trade row resolves,
nothing from that note is committed.";

#[derive(Parser, Debug)]
#[command(version = crate::app::B3NOTES_APP_VERSION,
          about = ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    /// Settlement note PDFs.
    ///
    /// These can also be plain .txt files, which will not be interpreted
    /// as actual PDFs, but as the text emitted by a tool like note-text.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Owner of the imported notes
    #[arg(short, long, default_value = "default")]
    pub user: String,

    /// Print pretty tables instead of CSV
    #[arg(short, long, default_value_t = false)]
    pub pretty: bool,

    /// Only extract and dump the trade candidates, without resolving
    /// tickers or committing anything
    #[arg(long, default_value_t = false)]
    pub extract_only: bool,

    /// Do not query the remote ticker discovery service
    #[arg(long, default_value_t = false)]
    pub no_remote: bool,

    /// Never prompt; unresolvable names become skips (and typically a
    /// rejected import)
    #[arg(long, default_value_t = false)]
    pub non_interactive: bool,

    /// Ticker mappings CSV (defaults to ~/.b3notes/tickers.csv)
    #[arg(long)]
    pub mappings_file: Option<PathBuf>,

    /// Imported note history (defaults to ~/.b3notes/notes.jsonl)
    #[arg(long)]
    pub notes_file: Option<PathBuf>,

    /// Turn on some very verbose debug printing
    ///
    /// Does not affect tracing. Set TRACE variable for this.
    #[arg(long)]
    pub debug: bool,
}

pub fn run() -> Result<(), ()> {
    let args = Args::parse();
    run_with_args(
        args,
        WriteHandle::stdout_write_handle(),
        WriteHandle::stderr_write_handle(),
    )
}

pub fn run_with_args(
    args: Args,
    out_w: WriteHandle,
    mut err_w: WriteHandle,
) -> Result<(), ()> {
    if args.debug {
        crate::tracing::enable_trace_env("b3notes=debug");
    }
    crate::tracing::setup_tracing();

    let mappings_path = match &args.mappings_file {
        Some(p) => p.clone(),
        None => home_dir_file_path(&PathBuf::from("tickers.csv"))
            .map_err(|e| write_errln!(err_w, "Error: {}", e))?,
    };
    let notes_path = match &args.notes_file {
        Some(p) => p.clone(),
        None => home_dir_file_path(&PathBuf::from("notes.jsonl"))
            .map_err(|e| write_errln!(err_w, "Error: {}", e))?,
    };

    let mapping_store =
        Box::new(CsvMappingStore::new(mappings_path, err_w.clone()));
    let mut note_store = JsonFileNoteStore::new(notes_path);

    let discoverer: Option<Box<dyn TickerDiscoverer>> = if args.no_remote {
        None
    } else {
        Some(Box::new(RemoteTickerDiscoverer::new(
            StandaloneAppRequester::new_boxed(),
        )))
    };

    let prompt: Box<dyn TickerPrompt> = if args.non_interactive {
        Box::new(NonInteractiveTickerPrompt {})
    } else {
        Box::new(StdioTickerPrompt::new(err_w.clone()))
    };

    let options = Options { pretty: args.pretty, extract_only: args.extract_only };

    run_note_import_app(
        &args.files,
        &args.user,
        &options,
        mapping_store,
        discoverer,
        prompt,
        &mut note_store,
        out_w,
        err_w.clone(),
    )
    .map_err(|e| write_errln!(err_w, "Error: {}", e))
}

pub fn command_main() {
    if run().is_err() {
        std::process::exit(1);
    }
}
