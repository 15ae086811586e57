//! Sequential execution of dependent asynchronous steps.
//!
//! Every step receives the value handed over by its predecessor together with
//! a [`Proceed`] trigger. The next step starts only once the trigger fires;
//! a step that drops its trigger without firing it halts the chain for good.
//! The last step's trigger leads nowhere, so firing it is optional.

use std::future::Future;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tracing::debug;

/// One-shot handle that lets the chain move on to the next step.
pub struct Proceed<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Proceed<T> {
    /// Hands `value` to the next step. May be called after the step's own
    /// future has finished, e.g. from a spawned task.
    pub fn proceed(self, value: T) {
        let _ = self.tx.send(value);
    }
}

pub type Step<'a, T> = Box<dyn FnOnce(T, Proceed<T>) -> BoxFuture<'a, Result<()>> + Send + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed,
    /// The step at this index finished without signalling.
    Halted { step: usize },
}

pub struct CallbackChain<'a, T> {
    steps: Vec<Step<'a, T>>,
}

impl<'a, T: Send + 'a> CallbackChain<'a, T> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn then<F, Fut>(mut self, step: F) -> Self
    where
        F: FnOnce(T, Proceed<T>) -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        self.steps.push(Box::new(move |value: T, proceed: Proceed<T>| {
            step(value, proceed).boxed()
        }));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the steps in order, starting from `initial`.
    ///
    /// An error returned by a step stops the chain and is returned as is.
    pub async fn run(self, initial: T) -> Result<ChainOutcome> {
        let last = self.steps.len().saturating_sub(1);
        let mut value = initial;
        for (index, step) in self.steps.into_iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            step(value, Proceed { tx }).await?;
            if index == last {
                break;
            }
            value = match rx.await {
                Ok(next) => next,
                Err(_) => {
                    debug!(step = index, "callback chain halted");
                    return Ok(ChainOutcome::Halted { step: index });
                }
            };
        }
        Ok(ChainOutcome::Completed)
    }
}

impl<'a, T: Send + 'a> Default for CallbackChain<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_callbacks_chain<'a, T: Send + 'a>(steps: Vec<Step<'a, T>>) -> CallbackChain<'a, T> {
    CallbackChain { steps }
}

#[cfg(test)]
#[path = "tests/callback_chain_tests.rs"]
mod tests;
