//! Cooperative checkpoints for the long-running steps (median cut, best-fit search).
//!
//! The expensive loops call [`Checkpoint::tick`] once per unit of work. Every
//! `interval` ticks the checkpoint checks the cancellation token, publishes a
//! [`Progress`] event and hands control back to the host through the yield hook.
//! Results never depend on whether a checkpoint fired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation was cancelled")]
pub struct Cancelled;

/// Shared flag used to abandon an in-flight operation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub status: String,
}

pub struct TaskContext {
    token: CancellationToken,
    progress: Option<Sender<Progress>>,
    yield_now: fn(),
}

impl Default for TaskContext {
    fn default() -> Self {
        Self {
            token: CancellationToken::new(),
            progress: None,
            yield_now: std::thread::yield_now,
        }
    }
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_progress(mut self, sender: Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Replaces the hook invoked at each checkpoint (defaults to `std::thread::yield_now`).
    pub fn with_yield(mut self, yield_now: fn()) -> Self {
        self.yield_now = yield_now;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            debug!("Cancellation requested");
            return Err(Cancelled);
        }
        Ok(())
    }

    pub fn report(&self, percent: u8, status: &str) {
        if let Some(sender) = &self.progress {
            let event = Progress {
                percent: percent.min(100),
                status: status.to_owned(),
            };
            if sender.send(event).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    pub fn checkpoint(&self, status: &'static str, interval: usize) -> Checkpoint<'_> {
        Checkpoint {
            ctx: self,
            status,
            interval: interval.max(1),
            ticks: 0,
        }
    }
}

pub struct Checkpoint<'a> {
    ctx: &'a TaskContext,
    status: &'static str,
    interval: usize,
    ticks: usize,
}

impl Checkpoint<'_> {
    pub fn tick(&mut self, done: usize, total: usize) -> Result<(), Cancelled> {
        self.ticks += 1;
        if self.ticks % self.interval != 0 {
            return Ok(());
        }
        self.ctx.check()?;
        let percent = (done.saturating_mul(100) / total.max(1)).min(100) as u8;
        self.ctx.report(percent, self.status);
        (self.ctx.yield_now)();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_checkpoint_reports_every_interval() {
        let (tx, rx) = mpsc::channel();
        let ctx = TaskContext::new().with_progress(tx);
        let mut checkpoint = ctx.checkpoint("working", 4);
        for i in 0..10 {
            checkpoint.tick(i + 1, 10).unwrap();
        }
        drop(ctx);
        let events: Vec<Progress> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].percent, 40);
        assert_eq!(events[1].percent, 80);
        assert_eq!(events[1].status, "working");
    }

    #[test]
    fn test_checkpoint_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = TaskContext::new().with_token(token.clone());
        let mut checkpoint = ctx.checkpoint("working", 1);
        assert!(checkpoint.tick(1, 2).is_ok());
        token.cancel();
        assert_eq!(checkpoint.tick(2, 2), Err(Cancelled));
    }

    #[test]
    fn test_report_without_receiver_is_silent() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let ctx = TaskContext::new().with_progress(tx);
        ctx.report(50, "orphaned");
    }
}
