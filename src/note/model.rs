use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::util::basic::SError;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    fn pretty_str(&self) -> &str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

impl Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_str())
    }
}

// Notes mark the side with a single letter: C (compra) or V (venda).
impl TryFrom<&str> for TradeSide {
    type Error = SError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "C" | "c" => Ok(TradeSide::Buy),
            "V" | "v" => Ok(TradeSide::Sell),
            v => Err(format!("Invalid trade side \"{}\"", v)),
        }
    }
}

/// Whether a monetary value debits or credits the account.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ValueFlag {
    Debit,
    Credit,
}

impl TryFrom<&str> for ValueFlag {
    type Error = SError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "D" | "d" => Ok(ValueFlag::Debit),
            "C" | "c" => Ok(ValueFlag::Credit),
            v => Err(format!("Invalid debit/credit flag \"{}\"", v)),
        }
    }
}

impl Display for ValueFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueFlag::Debit => write!(f, "D"),
            ValueFlag::Credit => write!(f, "C"),
        }
    }
}

/// A tentative trade row recovered from one line of note text, before
/// its instrument name has been resolved to a market symbol.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TradeCandidate {
    pub side: TradeSide,
    pub market: String,
    // The raw instrument-name field, possibly carrying a trailing
    // classification suffix (eg. "PETROBRAS PN N2").
    pub raw_spec: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub gross_value: Decimal,
    pub flag: ValueFlag,
    // Order in which the row appeared in the document.
    pub sequence: u32,
}

/// A finalized trade record. Quantity is sign-adjusted: negative for sells.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    pub symbol: String,
    pub side: TradeSide,
    pub market: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub gross_value: Decimal,
    pub flag: ValueFlag,
    pub note_number: u64,
    pub note_date: Date,
    pub sequence: u32,
    pub user: String,
}

impl Operation {
    pub fn from_candidate(
        candidate: &TradeCandidate,
        symbol: String,
        note_number: u64,
        note_date: Date,
        user: String,
    ) -> Operation {
        let quantity = match candidate.side {
            TradeSide::Buy => candidate.quantity.abs(),
            TradeSide::Sell => -candidate.quantity.abs(),
        };
        Operation {
            symbol,
            side: candidate.side,
            market: candidate.market.clone(),
            quantity,
            price: candidate.price,
            gross_value: candidate.gross_value,
            flag: candidate.flag,
            note_number,
            note_date,
            sequence: candidate.sequence,
            user,
        }
    }
}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        let date_cmp = self.note_date.cmp(&other.note_date);
        match date_cmp {
            std::cmp::Ordering::Less | std::cmp::Ordering::Greater => Some(date_cmp),
            std::cmp::Ordering::Equal => Some(self.sequence.cmp(&other.sequence)),
        }
    }
}

impl Ord for Operation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum NoteStatus {
    Success,
    Partial,
    Failed,
}

impl Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteStatus::Success => write!(f, "success"),
            NoteStatus::Partial => write!(f, "partial"),
            NoteStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The document-level envelope for one imported settlement note.
/// (note_number, note_date, user) must be unique in the note store.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct BrokerageNote {
    pub note_number: u64,
    pub note_date: Date,
    pub user: String,
    pub source_file: String,
    pub operations: Vec<Operation>,
    pub operation_count: u32,
    pub status: NoteStatus,
    pub error: Option<String>,
}

/// Aggregate monetary fields from the note's closing section.
/// Advisory/audit data only; never required for ledger correctness.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct FinancialSummary {
    pub settlement_fee: Option<Decimal>,
    pub exchange_fees: Option<Decimal>,
    pub brokerage_fee: Option<Decimal>,
    pub total_costs: Option<Decimal>,
    pub irrf_tax: Option<Decimal>,
    pub net_amount: Option<Decimal>,
    pub net_flag: Option<ValueFlag>,
    pub settlement_date: Option<Date>,
}

impl FinancialSummary {
    pub fn is_empty(&self) -> bool {
        *self == FinancialSummary::default()
    }
}
