use std::fmt::Display;

use itertools::Itertools;
use time::Date;

use crate::note::model::{Operation, TradeCandidate};
use crate::tickers::{PromptContext, TickerResolver};

/// A per-line problem, recorded rather than raised. These only ever
/// surface to the user inside a batch-level rejection.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SkippedLine {
    pub sequence: u32,
    pub description: String,
    pub reason: String,
}

impl Display for SkippedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {} ({}): {}", self.sequence, self.description, self.reason)
    }
}

/// The reasons an import is rejected as a whole. A document either fully
/// reconciles or nothing is committed.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ImportError {
    /// Text extraction or header recovery failed; nothing to work with.
    DocumentUnreadable(String),
    /// No line matched any trade row pattern.
    NoTradesFound,
    /// Fewer operations were produced than trade-shaped lines exist.
    CountMismatch {
        expected: usize,
        produced: usize,
        skips: Vec<SkippedLine>,
    },
    /// The (note number, note date, user) triple was already imported.
    DuplicateNote { note_number: u64, note_date: Date },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::DocumentUnreadable(e) => {
                write!(f, "Document unreadable: {}", e)
            }
            ImportError::NoTradesFound => {
                write!(f, "No valid trades found in the document")
            }
            ImportError::CountMismatch { expected, produced, skips } => {
                write!(
                    f,
                    "Expected {} trades but only {} could be imported.",
                    expected, produced
                )?;
                if !skips.is_empty() {
                    write!(
                        f,
                        " Skipped rows:\n  {}",
                        skips.iter().map(|s| s.to_string()).join("\n  ")
                    )?;
                }
                write!(
                    f,
                    "\nNothing was imported. Fix the mappings and retry the \
                     whole document."
                )
            }
            ImportError::DuplicateNote { note_number, note_date } => {
                write!(
                    f,
                    "Note {} of {} was already imported",
                    note_number, note_date
                )
            }
        }
    }
}

/// Resolves every candidate, strictly in line order, and applies the
/// all-or-nothing policy: either every trade-shaped line became an
/// Operation, or the batch is rejected and the rejection enumerates every
/// skipped row.
///
/// Ticker mappings learned during resolution are already persisted by the
/// resolver by the time a rejection is returned. That is deliberate:
/// mapping learning is durable progress, distinct from the transactional
/// commit of operations.
pub fn assemble_operations(
    candidates: &[TradeCandidate],
    expected_count: usize,
    note_number: u64,
    note_date: Date,
    user: &str,
    resolver: &mut TickerResolver,
) -> Result<Vec<Operation>, ImportError> {
    fn record_skip(
        skips: &mut Vec<SkippedLine>,
        c: &TradeCandidate,
        reason: String,
    ) {
        tracing::debug!(sequence = c.sequence, reason = reason.as_str(), "skip");
        skips.push(SkippedLine {
            sequence: c.sequence,
            description: c.raw_spec.clone(),
            reason,
        });
    }

    let mut operations = Vec::with_capacity(candidates.len());
    let mut skips: Vec<SkippedLine> = Vec::new();

    for candidate in candidates {
        // The matcher already rejects zeroed rows; re-derived candidates
        // (eg. from a caller-assembled batch) still get checked.
        if candidate.quantity.is_zero()
            || candidate.price.is_zero()
            || candidate.gross_value.is_zero()
        {
            record_skip(
                &mut skips,
                candidate,
                "invalid zero-valued trade field".to_string(),
            );
            continue;
        }

        let context = PromptContext {
            side: candidate.side,
            quantity: candidate.quantity,
            price: candidate.price,
            sequence: candidate.sequence,
        };
        // One at a time, in document order. Once a name resolves here,
        // every later occurrence in this document hits the cache instead
        // of re-prompting.
        match resolver.resolve(&candidate.raw_spec, &context) {
            Ok(Some(symbol)) => {
                operations.push(Operation::from_candidate(
                    candidate,
                    symbol,
                    note_number,
                    note_date,
                    user.to_string(),
                ));
            }
            Ok(None) => {
                record_skip(
                    &mut skips,
                    candidate,
                    "ticker resolution cancelled".to_string(),
                );
            }
            Err(e) => {
                record_skip(
                    &mut skips,
                    candidate,
                    format!("ticker resolution failed: {}", e),
                );
            }
        }
    }

    if operations.is_empty() {
        return Err(ImportError::NoTradesFound);
    }
    if operations.len() != expected_count {
        return Err(ImportError::CountMismatch {
            expected: expected_count,
            produced: operations.len(),
            skips,
        });
    }

    Ok(operations)
}

// MARK: tests
