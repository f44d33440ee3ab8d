use std::path::PathBuf;

use clap::Parser;

use b3notes::peripheral::{pages, pdf};

/// This is a simple wrapper around the pdf parser library to help generate
/// test files for the note-parsing logic.
/// Contributors should manually sanitize sensitive information before
/// committing anything as a test file.
/// It is recommended to keep copies of the original PDFs somewhere, so the
/// text can be regenerated if the extraction library's behaviour changes in
/// a material way.
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// Input file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Show pretty page deliniators
    #[arg(short = 'n', long)]
    pub show_page_numbers: bool,

    /// Inserts page deliniators that can be parsed back out.
    /// Generally for generating test data.
    #[arg(short = 'm', long)]
    pub parsable_page_markers: bool,
}

/// page_num should be one-based
fn page_marker_line(page_num: u32) -> String {
    format!("---------- Page {page_num} ----------")
}

fn main() -> Result<(), ()> {
    let args = Args::parse();

    let page_texts = pdf::get_all_pages_text_from_path(&args.input)
        .map_err(|e| eprintln!("Error: {}", e))?;

    for (i, text) in page_texts.iter().enumerate() {
        let page_num: u32 = (i + 1) as u32;
        if args.parsable_page_markers {
            println!("{}", pages::parseable_page_marker(page_num));
        } else if args.show_page_numbers {
            println!("{}", page_marker_line(page_num));
        }
        println!("{}", text);
    }

    Ok(())
}
