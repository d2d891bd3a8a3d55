//! Flow execution in the terminal.

pub mod wizard;

pub use wizard::{RunOptions, RunOutcome, RunReport, WizardRunner, NAVIGATION_KEY};

use std::future::Future;

use crate::error::Result;

/// Run a future to completion on a single-threaded runtime.
///
/// Commands are synchronous; this is where they enter async code.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_runs_future() {
        let value = block_on(async { 40 + 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn block_on_supports_timers() {
        let slept = block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            true
        })
        .unwrap();
        assert!(slept);
    }
}
