use std::collections::HashMap;

use time::Date;

use crate::note::model::Operation;
use crate::util::basic::SError;

use super::Position;

/// Maintains the latest Position per symbol, folding in accepted
/// operations. Operations must arrive in non-decreasing (date, sequence)
/// order; the book refuses anything out of order rather than silently
/// producing a wrong cost basis.
pub struct PositionBook {
    positions: HashMap<String, Position>,
    last_applied: Option<(Date, u32)>,
}

impl PositionBook {
    pub fn new() -> PositionBook {
        PositionBook { positions: HashMap::new(), last_applied: None }
    }

    pub fn apply(&mut self, op: &Operation) -> Result<(), SError> {
        let key = (op.note_date, op.sequence);
        if let Some(last) = self.last_applied {
            if key < last {
                return Err(format!(
                    "Operation {} of {} arrived out of order \
                     (last applied was {} seq {})",
                    op.sequence, op.note_date, last.0, last.1
                ));
            }
        }

        // Positions are created lazily on the first operation for a
        // symbol, and never removed: a flat position still carries its
        // realized P&L history.
        let position = self
            .positions
            .entry(op.symbol.clone())
            .or_insert_with(|| Position::new(op.symbol.clone()));
        *position = position.applying(op)?;

        self.last_applied = Some(key);
        tracing::trace!(
            symbol = op.symbol.as_str(),
            quantity = position.quantity.to_string().as_str(),
            "PositionBook::apply"
        );
        Ok(())
    }

    /// Applies a batch, sorting it by (date, sequence) first. This is the
    /// entry point for a freshly accepted import.
    pub fn apply_all(&mut self, operations: &[Operation]) -> Result<(), SError> {
        let mut ordered: Vec<&Operation> = operations.iter().collect();
        ordered.sort();
        for op in ordered {
            self.apply(op)?;
        }
        Ok(())
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// All positions, sorted by symbol for stable presentation.
    pub fn positions(&self) -> Vec<&Position> {
        let mut all: Vec<&Position> = self.positions.values().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}

// MARK: tests

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::note::model::{Operation, TradeSide, ValueFlag};
    use crate::testlib::assert_re;
    use crate::util::date::parse_standard_date;

    use super::PositionBook;

    fn op(
        symbol: &str,
        side: TradeSide,
        qty: rust_decimal::Decimal,
        price: rust_decimal::Decimal,
        date: &str,
        seq: u32,
    ) -> Operation {
        let signed_qty = match side {
            TradeSide::Buy => qty,
            TradeSide::Sell => -qty,
        };
        Operation {
            symbol: symbol.to_string(),
            side,
            market: "VISTA".to_string(),
            quantity: signed_qty,
            price,
            gross_value: qty * price,
            flag: match side {
                TradeSide::Buy => ValueFlag::Debit,
                TradeSide::Sell => ValueFlag::Credit,
            },
            note_number: 12345678,
            note_date: parse_standard_date(date).unwrap(),
            sequence: seq,
            user: "someone".to_string(),
        }
    }

    #[test]
    fn test_apply_all_multiple_symbols() {
        let mut book = PositionBook::new();
        book.apply_all(&[
            op("PETR4", TradeSide::Buy, dec!(100), dec!(10.00), "2023-02-28", 1),
            op("VALE3", TradeSide::Buy, dec!(50), dec!(68.10), "2023-02-28", 2),
            op("PETR4", TradeSide::Sell, dec!(40), dec!(12.00), "2023-03-01", 1),
        ])
        .unwrap();

        let petr = book.position("PETR4").unwrap();
        assert_eq!(petr.quantity, dec!(60));
        assert_eq!(petr.realized_pnl, dec!(80.00));
        let vale = book.position("VALE3").unwrap();
        assert_eq!(vale.quantity, dec!(50));

        let symbols: Vec<&str> =
            book.positions().iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["PETR4", "VALE3"]);
    }

    #[test]
    fn test_apply_all_sorts_batch() {
        let mut book = PositionBook::new();
        // Deliberately out of order; apply_all sorts by (date, sequence).
        book.apply_all(&[
            op("PETR4", TradeSide::Sell, dec!(100), dec!(12.00), "2023-03-02", 1),
            op("PETR4", TradeSide::Buy, dec!(100), dec!(10.00), "2023-02-28", 1),
        ])
        .unwrap();
        let petr = book.position("PETR4").unwrap();
        assert_eq!(petr.quantity, dec!(0));
        assert_eq!(petr.realized_pnl, dec!(200.00));
    }

    #[test]
    fn test_out_of_order_apply_refused() {
        let mut book = PositionBook::new();
        book.apply(&op(
            "PETR4",
            TradeSide::Buy,
            dec!(100),
            dec!(10.00),
            "2023-03-01",
            2,
        ))
        .unwrap();
        let err = book
            .apply(&op(
                "PETR4",
                TradeSide::Buy,
                dec!(100),
                dec!(10.00),
                "2023-03-01",
                1,
            ))
            .unwrap_err();
        assert_re("out of order", &err);
    }

    #[test]
    fn test_flat_position_is_kept() {
        let mut book = PositionBook::new();
        book.apply_all(&[
            op("PETR4", TradeSide::Buy, dec!(10), dec!(10.00), "2023-02-28", 1),
            op("PETR4", TradeSide::Sell, dec!(10), dec!(11.00), "2023-02-28", 2),
        ])
        .unwrap();
        // Still present, with its realized history.
        let petr = book.position("PETR4").unwrap();
        assert_eq!(petr.quantity, dec!(0));
        assert_eq!(petr.realized_pnl, dec!(10.00));
    }
}
