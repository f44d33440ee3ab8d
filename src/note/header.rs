use lazy_static::lazy_static;
use rust_decimal::Decimal;
use time::Date;

use crate::note::model::{FinancialSummary, ValueFlag};
use crate::util::basic::SError;
use crate::util::date::parse_br_date;
use crate::util::decimal::parse_brl_decimal;

struct Searcher {
    bldr: regex::RegexBuilder,
}

impl Searcher {
    pub fn new(pattern: &str) -> Self {
        let mut bldr = regex::RegexBuilder::new(pattern);
        bldr.case_insensitive(true);
        Searcher { bldr }
    }

    /// dot_matches_new_line ('s' is the defacto flag name for this)
    pub fn s(&mut self) -> &mut Self {
        self.bldr.dot_matches_new_line(true);
        self
    }

    pub fn get_opt_from(&self, text: &str, group: usize) -> Option<String> {
        let re = self.bldr.build().unwrap();
        match re.captures(text) {
            Some(m) => m.get(group).map(|c| c.as_str().to_string()),
            None => None,
        }
    }

    pub fn get_from(&self, text: &str, group: usize) -> Result<String, SError> {
        let re = self.bldr.build().unwrap();
        match re.captures(text) {
            Some(m) => m
                .get(group)
                .map(|c| c.as_str().to_string())
                .ok_or(format!("Could not get group {group} from {re}")),
            None => Err(format!("Could not find {re}")),
        }
    }

    pub fn get1_opt_from(&self, text: &str) -> Option<String> {
        self.get_opt_from(text, 1)
    }

    pub fn get1_from(&self, text: &str) -> Result<String, SError> {
        self.get_from(text, 1)
    }

    // Convenience alias
    pub fn str1(&self, text: &str) -> Result<String, SError> {
        self.get1_from(text)
    }
}

fn srch(pattern: &str) -> Searcher {
    Searcher::new(pattern)
}

const BR_DATE_TOKEN: &str = r"(\d{2}/\d{2}/\d{4})";

/// The session date of the trades ("Data pregão", sometimes
/// "Data do pregão" or fully spelled out "Data de pregão").
pub fn extract_note_date(text: &str) -> Result<Date, SError> {
    // Some layouts put the whole label row above the whole value row, so
    // the nearest date token can be a line (and several other values) away.
    let date_str = srch(&format!(
        r"Data\s+(?:d[eo]\s+)?preg[aã]o.*?{}",
        BR_DATE_TOKEN
    ))
    .s()
    .str1(text)?;
    parse_br_date(&date_str)
        .map_err(|e| format!("Invalid trade date \"{}\": {}", date_str, e))
}

// An 8-digit run that reads back as a valid day-first date is almost
// certainly a date the layout mangled, not a note number.
fn is_date_like(digits: &str) -> bool {
    if digits.len() != 8 {
        return false;
    }
    let formatted =
        format!("{}/{}/{}", &digits[0..2], &digits[2..4], &digits[4..8]);
    parse_br_date(&formatted).is_ok()
}

const NOTE_NUMBER_SCAN_LINES: usize = 20;

/// The note's own identifier ("Nr. nota" / "Número da nota"). Some layouts
/// detach the value from its label entirely, so as a fallback the first
/// lines are scanned for a standalone 8-9 digit run that is not a date.
pub fn extract_note_number(text: &str) -> Result<u64, SError> {
    if let Some(num_str) =
        srch(r"N(?:r\.?|[uú]mero)\s*(?:da\s+)?nota\s*:?\s*(\d+)").get1_opt_from(text)
    {
        return num_str
            .parse::<u64>()
            .map_err(|e| format!("Invalid note number \"{}\": {}", num_str, e));
    }

    lazy_static! {
        static ref STANDALONE_DIGITS: regex::Regex =
            regex::Regex::new(r"(?:^|\s)(\d{8,9})(?:\s|$)").unwrap();
    }
    for line in text.lines().take(NOTE_NUMBER_SCAN_LINES) {
        for m in STANDALONE_DIGITS.captures_iter(line) {
            let digits = m.get(1).unwrap().as_str();
            if !is_date_like(digits) {
                // Cannot fail: 9 digits always fit in u64.
                return Ok(digits.parse::<u64>().unwrap());
            }
        }
    }
    Err("Could not find a note number".to_string())
}

lazy_static! {
    // The last Brazilian-locale money token on a label's line, with its
    // optional trailing debit/credit letter.
    static ref TRAILING_VALUE: regex::Regex =
        regex::Regex::new(r"(R?\$?\s*[\d.]+,\d{2})\s*([DC])?(?:\s|$)").unwrap();
}

fn find_labeled_value(
    text: &str,
    label_variants: &[&str],
) -> Option<(Decimal, Option<ValueFlag>)> {
    for label in label_variants {
        let line_re = regex::RegexBuilder::new(&format!(
            r"^[^\n]*?{}(?P<rest>[^\n]*)$",
            label
        ))
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .unwrap();

        let rest = match line_re.captures(text) {
            Some(m) => m.name("rest").unwrap().as_str().to_string(),
            None => continue,
        };

        // Summary lines can carry intermediate numbers ("base R$ ..."),
        // so only the line's last money token is the value.
        if let Some(m) = TRAILING_VALUE.captures_iter(&rest).last() {
            let val = match parse_brl_decimal(m.get(1).unwrap().as_str()) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("unparseable value for \"{}\": {}", label, e);
                    continue;
                }
            };
            let flag = m
                .get(2)
                .and_then(|f| ValueFlag::try_from(f.as_str()).ok());
            return Some((val, flag));
        }
    }
    None
}

/// Extracts the aggregate financial summary from the closing section.
/// This should be given the text of the document's last page only, where
/// the totals block lives. Everything here is advisory, so an empty
/// summary is returned when nothing recognizable is found.
pub fn extract_summary(last_page_text: &str) -> FinancialSummary {
    let text = last_page_text;
    let val = |labels: &[&str]| find_labeled_value(text, labels).map(|(v, _)| v);

    let mut summary = FinancialSummary {
        settlement_fee: val(&[r"Taxa\s+de\s+liquida[cç][aã]o"]),
        exchange_fees: val(&["Emolumentos"]),
        brokerage_fee: val(&[r"Corretagem", r"Taxa\s+Operacional"]),
        total_costs: val(&[r"Total\s+(?:de\s+)?custos\s*/?\s*despesas"]),
        irrf_tax: val(&[r"I\.?R\.?R\.?F\.?"]),
        net_amount: None,
        net_flag: None,
        settlement_date: None,
    };

    const NET_LABEL: &str = r"L[ií]quido\s+para";
    if let Some((net, flag)) = find_labeled_value(text, &[NET_LABEL]) {
        summary.net_amount = Some(net);
        summary.net_flag = flag;
    }
    if let Some(date_str) =
        srch(&format!(r"{}\s*{}", NET_LABEL, BR_DATE_TOKEN)).get1_opt_from(text)
    {
        match parse_br_date(&date_str) {
            Ok(d) => summary.settlement_date = Some(d),
            Err(e) => {
                tracing::debug!("unparseable settlement date: {}", e);
            }
        }
    }

    summary
}

// MARK: tests

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::note::model::{FinancialSummary, ValueFlag};
    use crate::testlib::assert_big_struct_eq;
    use crate::util::date::parse_standard_date;

    use super::{extract_note_date, extract_note_number, extract_summary};

    const SAMPLE_HEADER: &str = "NOTA DE NEGOCIAÇÃO
Nr. nota Folha Data pregão
12345678 1 28/02/2023
CORRETORA EXEMPLO S.A.
AV. EXEMPLO, 1000 - SÃO PAULO - SP
";

    #[test]
    fn test_extract_note_date() {
        let d = extract_note_date(SAMPLE_HEADER).unwrap();
        assert_eq!(d, parse_standard_date("2023-02-28").unwrap());

        // Label and value on the same line
        let d = extract_note_date("Data pregão: 01/03/2023").unwrap();
        assert_eq!(d, parse_standard_date("2023-03-01").unwrap());

        // Spelled-out label variant
        let d = extract_note_date("Data do pregao 02/03/2023").unwrap();
        assert_eq!(d, parse_standard_date("2023-03-02").unwrap());

        let _ = extract_note_date("no dates here").unwrap_err();
    }

    #[test]
    fn test_extract_note_number_labeled() {
        assert_eq!(extract_note_number("Nr. nota 12345678").unwrap(), 12345678);
        assert_eq!(
            extract_note_number("Número da nota: 987654321").unwrap(),
            987654321
        );
    }

    #[test]
    fn test_extract_note_number_from_detached_header() {
        // "Nr. nota" is present but its value sits on the next row;
        // the standalone scan picks it up.
        assert_eq!(extract_note_number(SAMPLE_HEADER).unwrap(), 12345678);
    }

    #[test]
    fn test_extract_note_number_fallback_scan() {
        // The label got detached from the value by the text extractor.
        // The 8-digit date-like run must be skipped in favor of the
        // standalone note number.
        let text = "NOTA DE NEGOCIAÇÃO
28022023
Folha 1
44556677 some trailing text
";
        assert_eq!(extract_note_number(text).unwrap(), 44556677);

        let _ = extract_note_number("no numbers").unwrap_err();
    }

    const SAMPLE_SUMMARY: &str = "Resumo dos Negócios
Debêntures 0,00
Vendas à vista 3.405,00
Compras à vista 2.850,00
Valor das operações 6.255,00
Resumo Financeiro
Taxa de liquidação 1,71 D
Taxa de Registro 0,00 D
Emolumentos 0,31 D
Corretagem 10,00 D
I.R.R.F. s/ operações, base R$ 555,00 0,02 D
Total Custos / Despesas 12,02 D
Líquido para 02/03/2023 542,98 C
";

    #[test]
    fn test_extract_summary() {
        let summary = extract_summary(SAMPLE_SUMMARY);
        assert_big_struct_eq(
            summary,
            FinancialSummary {
                settlement_fee: Some(dec!(1.71)),
                exchange_fees: Some(dec!(0.31)),
                brokerage_fee: Some(dec!(10.00)),
                total_costs: Some(dec!(12.02)),
                irrf_tax: Some(dec!(0.02)),
                net_amount: Some(dec!(542.98)),
                net_flag: Some(ValueFlag::Credit),
                settlement_date: Some(parse_standard_date("2023-03-02").unwrap()),
            },
        );
    }

    #[test]
    fn test_extract_summary_accent_variants() {
        let summary = extract_summary(
            "Taxa de liquidacao 2,00 D\nLiquido para 05/04/2023 100,00 D\n",
        );
        assert_eq!(summary.settlement_fee, Some(dec!(2.00)));
        assert_eq!(summary.net_amount, Some(dec!(100.00)));
        assert_eq!(summary.net_flag, Some(ValueFlag::Debit));
        assert_eq!(
            summary.settlement_date,
            Some(parse_standard_date("2023-04-05").unwrap())
        );
    }

    #[test]
    fn test_extract_summary_empty() {
        let summary = extract_summary("nothing of note here");
        assert!(summary.is_empty());
        assert_big_struct_eq(summary, FinancialSummary::default());
    }
}
