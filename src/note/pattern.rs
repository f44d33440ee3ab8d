use lazy_static::lazy_static;
use rust_decimal::Decimal;

use crate::note::model::{TradeCandidate, TradeSide, ValueFlag};
use crate::util::decimal::parse_brl_decimal;

// Trade rows in the Sinacor note layout look like:
//
//   1-BOVESPA C VISTA PETROBRAS PN N2 100 28,50 2.850,00 D
//   1-BOVESPA V FRACIONARIO ITAUSA PN N1 8 8,90 71,20 C
//   1-BOVESPA C VISTA FII CSHG LOG CI 10 105,00 1.050,00 D
//
// The extractors that fed this tool historically disagreed on column
// spacing, on whether the name and its classification suffix land in one
// or two fields, and on whether the trailing debit/credit letter survives.
// Rather than maintaining parallel parser variants, the row patterns are
// kept in one ordered list, most specific first; the first match wins.

const ROW_START_PAT: &str = r"^\s*(?:\d-)?BOVESPA\s+(?P<side>[CV])\s+";
const QTY_PAT: &str = r"(?P<qty>\d[\d.]*)";
const PRICE_PAT: &str = r"(?P<price>(?:R\$\s*)?[\d.]+,\d+)";
const VALUE_PAT: &str = r"(?P<value>(?:R\$\s*)?[\d.]+,\d+)";

// Markets this tool understands. Accents depend on the text extractor,
// so both spellings are accepted.
const MARKET_PAT: &str = concat!(
    r"(?P<market>VISTA|FRACION[AÁ]RIO",
    r"|OP[CÇ][AÃ]O DE COMPRA|OP[CÇ][AÃ]O DE VENDA|TERMO)"
);

// Share-class and listing-segment codes that can trail an instrument name.
const CLASS_PAT: &str = concat!(
    r"(?P<class>(?:ON|PN[AB]?|UNT|CI|DRN?\d?)",
    r"(?:\s+(?:NM|N[12]|MA|MB|EJ|ED|EX|ER|EDJ|ATZ|INT))*)"
);

fn build_row_patterns() -> Vec<regex::Regex> {
    let pat = |p: String| regex::Regex::new(&p).unwrap();
    vec![
        // Primary: known market, name + classification captured as one
        // field, trailing debit/credit letter present.
        pat(format!(
            concat!(
                "{start}{market}",
                r"\s+(?P<spec>\D\S*(?:\s\S+)*?)",
                r"\s+{qty}\s+{price}\s+{value}\s+(?P<flag>[DC])\s*$"
            ),
            start = ROW_START_PAT,
            market = MARKET_PAT,
            qty = QTY_PAT,
            price = PRICE_PAT,
            value = VALUE_PAT,
        )),
        // Fallback: unrecognized market column, name and classification
        // captured separately (they get re-joined below).
        pat(format!(
            concat!(
                "{start}",
                r"(?P<market>\S+)\s+(?P<name>\D\S*(?:\s\S+)*?)\s+{class}",
                r"\s+{qty}\s+{price}\s+{value}\s+(?P<flag>[DC])\s*$"
            ),
            start = ROW_START_PAT,
            class = CLASS_PAT,
            qty = QTY_PAT,
            price = PRICE_PAT,
            value = VALUE_PAT,
        )),
        // Last resort: tolerate a missing debit/credit letter, extra
        // whitespace, and any market label. The flag is inferred from the
        // side when absent.
        pat(format!(
            concat!(
                "{start}",
                r"(?P<market>\S+(?:\s+DE\s+\S+)?)",
                r"\s+(?P<spec>\D\S*(?:\s+\S+)*?)",
                r"\s+{qty}\s+{price}\s+{value}(?:\s+(?P<flag>[DC]))?\s*$"
            ),
            start = ROW_START_PAT,
            qty = QTY_PAT,
            price = PRICE_PAT,
            value = VALUE_PAT,
        )),
    ]
}

lazy_static! {
    static ref ROW_PATTERNS: Vec<regex::Regex> = build_row_patterns();

    // Deliberately independent of (and looser than) the row patterns above:
    // this is the ground truth the import validator checks the extracted
    // row count against.
    static ref ROW_SHAPE_PATTERN: regex::Regex =
        regex::Regex::new(r"^\s*(?:\d-)?BOVESPA\s+[CV]\s+\S+").unwrap();
}

// The observation column occasionally bleeds into the name field as a
// lone marker token.
fn strip_obs_markers(spec: &str) -> &str {
    let mut s = spec.trim();
    while let Some(prefix) = s.strip_suffix('#').or_else(|| s.strip_suffix('*')) {
        s = prefix.trim_end();
    }
    s
}

fn candidate_from_captures(
    m: &regex::Captures,
    sequence: u32,
) -> Option<TradeCandidate> {
    let group = |name: &str| m.name(name).map(|g| g.as_str());

    let side = TradeSide::try_from(group("side")?).ok()?;

    let raw_spec = match group("spec") {
        Some(spec) => strip_obs_markers(spec).to_string(),
        // Name and classification were captured as two fields; re-join them
        // so all patterns feed the resolver the same shape.
        None => {
            format!("{} {}", strip_obs_markers(group("name")?), group("class")?)
        }
    };

    let dec_group = |name: &str| -> Option<Decimal> {
        match parse_brl_decimal(group(name)?) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::debug!("row discarded, bad {} field: {}", name, e);
                None
            }
        }
    };
    let quantity = dec_group("qty")?;
    let price = dec_group("price")?;
    let gross_value = dec_group("value")?;

    // A zeroed quantity, price or value signals a malformed row, not a
    // valid trade.
    if quantity.is_zero() || price.is_zero() || gross_value.is_zero() {
        tracing::debug!(sequence = sequence, "row discarded, zero-valued field");
        return None;
    }

    let flag = match group("flag") {
        Some(f) => ValueFlag::try_from(f).ok()?,
        None => match side {
            TradeSide::Buy => ValueFlag::Debit,
            TradeSide::Sell => ValueFlag::Credit,
        },
    };

    Some(TradeCandidate {
        side,
        market: group("market")?.to_string(),
        raw_spec,
        quantity,
        price,
        gross_value,
        flag,
        sequence,
    })
}

/// Tries each row pattern, most specific first, against a single line of
/// note text. Most lines in a document are not trade rows, so no match is
/// the common, non-error outcome.
pub fn match_trade_line(line: &str, sequence: u32) -> Option<TradeCandidate> {
    for pattern in ROW_PATTERNS.iter() {
        if let Some(m) = pattern.captures(line) {
            return candidate_from_captures(&m, sequence);
        }
    }
    None
}

/// Extracts every trade candidate from the document text, in line order.
/// Sequence numbers are assigned 1-based in order of appearance.
pub fn extract_candidates(text: &str) -> Vec<TradeCandidate> {
    let mut candidates = Vec::new();
    for line in text.lines() {
        let seq = (candidates.len() + 1) as u32;
        if let Some(candidate) = match_trade_line(line, seq) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Counts the lines that structurally look like trade rows, independently
/// of whether the full row patterns can extract them.
pub fn count_trade_shaped_lines(text: &str) -> usize {
    text.lines().filter(|l| ROW_SHAPE_PATTERN.is_match(l)).count()
}

// MARK: tests
