//! Chain execution.
//!
//! One run walks the filters outer to inner calling `before`, invokes the
//! handler unless a filter short-circuited, then walks back inner to outer
//! calling `after` on every filter that let the request through.
//!
//! Entered filter instances are owned by guards whose `Drop` closes them.
//! Whatever ends the run (a response, a handler error, a misbehaving filter,
//! a panic) every instance is closed exactly once, innermost first.

use std::future::Future;

use tracing::{debug, trace, warn};

use super::chain::Filters;
use super::protocol::{BoxError, Filter, FilterFactory, FilterId, Step};
use super::record;
use crate::error::{ChainError, Phase};

/// A filter instance the run has created.
struct Entered<R> {
    id: FilterId,
    filter: Box<dyn Filter<R>>,
    passed: bool,
    closed: bool,
}

impl<R> Entered<R> {
    fn new(factory: &FilterFactory<R>) -> Self {
        Self { id: factory.id(), filter: factory.make(), passed: false, closed: false }
    }

    fn resume(&mut self, response: &R) -> Result<Step<R>, ChainError> {
        if !self.passed {
            return Err(ChainError::ContractViolation { filter: self.id, phase: Phase::After });
        }
        self.filter.after(response).map_err(|source| ChainError::Filter {
            filter: self.id,
            phase: Phase::After,
            source,
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.filter.close();
            trace!(filter = self.id, "filter closed");
        }
    }
}

impl<R> Drop for Entered<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// State of one run: the filters that passed the request inward, innermost
/// last.
struct Execution<'a, R> {
    factories: &'a [FilterFactory<R>],
    entered: Vec<Entered<R>>,
}

impl<'a, R> Execution<'a, R> {
    fn new(factories: &'a [FilterFactory<R>]) -> Self {
        Self { factories, entered: Vec::with_capacity(factories.len()) }
    }

    /// Pre-phase. `Some(v)` means a filter short-circuited with `v`.
    fn enter(&mut self) -> Result<Option<R>, ChainError> {
        for factory in self.factories {
            let mut entered = Entered::new(factory);
            let id = entered.id;
            match entered.filter.before() {
                Ok(Step::Pass) => {
                    entered.passed = true;
                    record::mark_before(id);
                    self.entered.push(entered);
                }
                Ok(Step::Respond(response)) => {
                    debug!(filter = id, "filter short-circuited the chain");
                    return Ok(Some(response));
                }
                Ok(Step::Done) => {
                    warn!(filter = id, "filter finished without suspending");
                    return Err(ChainError::ContractViolation { filter: id, phase: Phase::Before });
                }
                Err(source) => {
                    return Err(ChainError::Filter { filter: id, phase: Phase::Before, source });
                }
            }
        }
        Ok(None)
    }

    /// Post-phase over every filter that passed, innermost first.
    fn leave(&mut self, mut response: R) -> Result<R, ChainError> {
        while let Some(mut entered) = self.entered.pop() {
            if let Step::Respond(replacement) = entered.resume(&response)? {
                debug!(filter = entered.id, "filter replaced the response");
                response = replacement;
            }
            entered.close();
            record::mark_after(entered.id);
        }
        Ok(response)
    }
}

impl<R> Drop for Execution<'_, R> {
    fn drop(&mut self) {
        // Early exit: close what is left, inner to outer.
        while let Some(entered) = self.entered.pop() {
            drop(entered);
        }
    }
}

impl<R> Filters<R> {
    /// Runs `handler` inside these filters.
    ///
    /// The run records its progress in the caller's request scope (see
    /// [`record::scope`]), or in a fresh one if there is none.
    pub fn run<F, E>(&self, handler: F) -> Result<R, ChainError>
    where
        F: FnOnce() -> Result<R, E>,
        E: Into<BoxError>,
    {
        record::ensure(|| -> Result<R, ChainError> {
            let mut run = Execution::new(self.as_slice());
            let response = match run.enter()? {
                Some(response) => response,
                None => handler().map_err(|e| ChainError::Handler(e.into()))?,
            };
            run.leave(response)
        })
    }

    /// Async counterpart of [`Filters::run`].
    ///
    /// `handler` is not polled at all when a filter short-circuits.
    pub async fn run_async<Fut, E>(&self, handler: Fut) -> Result<R, ChainError>
    where
        Fut: Future<Output = Result<R, E>>,
        E: Into<BoxError>,
    {
        record::ensure_async(async {
            let mut run = Execution::new(self.as_slice());
            let response = match run.enter()? {
                Some(response) => response,
                None => handler.await.map_err(|e| ChainError::Handler(e.into()))?,
            };
            run.leave(response)
        })
        .await
    }
}
