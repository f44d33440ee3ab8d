use rust_decimal::Decimal;

use crate::note::model::TradeSide;
use crate::util::rw::WriteHandle;
use crate::write_errln;

use super::Error;

/// What the pipeline can tell the user about the row it is stuck on.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct PromptContext {
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub sequence: u32,
}

impl std::fmt::Display for PromptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "row {}: {} {} @ {}",
            self.sequence, self.side, self.quantity, self.price
        )
    }
}

/// Cancellation is an expected response, not an error.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum PromptResponse {
    Symbol(String),
    Cancelled,
}

/// The interactive disambiguation step. The pipeline blocks on this
/// indefinitely; there is deliberately no timeout.
pub trait TickerPrompt {
    fn prompt(
        &mut self,
        raw_name: &str,
        context: &PromptContext,
    ) -> Result<PromptResponse, Error>;
}

/// Asks on the terminal. An empty answer cancels.
pub struct StdioTickerPrompt {
    out: WriteHandle,
}

impl StdioTickerPrompt {
    pub fn new(out: WriteHandle) -> StdioTickerPrompt {
        StdioTickerPrompt { out }
    }
}

impl TickerPrompt for StdioTickerPrompt {
    fn prompt(
        &mut self,
        raw_name: &str,
        context: &PromptContext,
    ) -> Result<PromptResponse, Error> {
        write_errln!(
            self.out,
            "Could not resolve \"{}\" ({}).",
            raw_name,
            context
        );
        write_errln!(self.out, "Enter its symbol, or leave empty to skip:");

        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(|e| format!("Failed to read response: {}", e))?;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok(PromptResponse::Cancelled)
        } else {
            Ok(PromptResponse::Symbol(answer.to_uppercase()))
        }
    }
}

/// Never asks. For non-interactive runs, where an unresolvable name should
/// just become a recorded skip.
pub struct NonInteractiveTickerPrompt;

impl TickerPrompt for NonInteractiveTickerPrompt {
    fn prompt(
        &mut self,
        raw_name: &str,
        _context: &PromptContext,
    ) -> Result<PromptResponse, Error> {
        tracing::debug!(name = raw_name, "non-interactive prompt: cancelling");
        Ok(PromptResponse::Cancelled)
    }
}

// Ideally this would be marked as cfg(test), but integration tests also
// need access, so it cannot be test-only for it to be reachable there.
pub mod pub_testlib {
    use std::collections::VecDeque;

    use crate::util::rc::RcRefCell;

    use super::{Error, PromptContext, PromptResponse, TickerPrompt};

    /// Plays back a fixed script of responses, recording every name it was
    /// asked about.
    pub struct ScriptedTickerPrompt {
        pub responses: RcRefCell<VecDeque<PromptResponse>>,
        pub asked: RcRefCell<Vec<String>>,
    }

    impl TickerPrompt for ScriptedTickerPrompt {
        fn prompt(
            &mut self,
            raw_name: &str,
            _context: &PromptContext,
        ) -> Result<PromptResponse, Error> {
            self.asked.borrow_mut().push(raw_name.to_string());
            match self.responses.borrow_mut().pop_front() {
                Some(r) => Ok(r),
                None => Err(format!(
                    "ScriptedTickerPrompt ran out of responses (asked for {})",
                    raw_name
                )),
            }
        }
    }
}
