use rust_decimal::Decimal;

use crate::note::model::{Operation, TradeSide};
use crate::util::basic::SError;

/// The running cost-basis state for one instrument, under weighted-average
/// accounting. Holds these invariants at all times:
///   quantity == 0  implies  average_price == 0 and invested_value == 0
///   invested_value >= 0 (floored, never negative)
/// realized_pnl is a running historical total and is never reset.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub invested_value: Decimal,
    pub realized_pnl: Decimal,
}

impl Position {
    pub fn new(symbol: String) -> Position {
        Position {
            symbol,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            invested_value: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    /// The pure transition function: returns the position as it stands
    /// after the operation, leaving self untouched.
    pub fn applying(&self, op: &Operation) -> Result<Position, SError> {
        if op.symbol != self.symbol {
            return Err(format!(
                "Operation for {} applied to position of {}",
                op.symbol, self.symbol
            ));
        }
        let mut next = self.clone();
        match op.side {
            TradeSide::Buy => {
                next.invested_value = self.invested_value + op.gross_value;
                next.quantity = self.quantity + op.quantity.abs();
                // A zero-quantity buy is rejected upstream, but the ledger
                // still refuses to divide by zero on principle.
                next.average_price = if next.quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    next.invested_value / next.quantity
                };
            }
            TradeSide::Sell => {
                let qty_sold = op.quantity.abs();
                next.realized_pnl = self.realized_pnl
                    + (op.price - self.average_price) * qty_sold;
                next.invested_value = Decimal::max(
                    Decimal::ZERO,
                    self.invested_value - self.average_price * qty_sold,
                );
                next.quantity = self.quantity - qty_sold;
                if next.quantity <= Decimal::ZERO {
                    // Flat (or oversold, which we treat as flat).
                    next.quantity = Decimal::ZERO;
                    next.average_price = Decimal::ZERO;
                    next.invested_value = Decimal::ZERO;
                }
            }
        }
        Ok(next)
    }
}

// MARK: tests
