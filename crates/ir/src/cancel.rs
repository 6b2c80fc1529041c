// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Cooperative cancellation
//!
//! Analysis entry points take a [`CancellationMonitor`] and poll it at every
//! descent step and before every metadata call. Nothing is interrupted forcibly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Marker error returned when a monitor reports cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation canceled")]
pub struct Canceled;

/// Source of the cancellation signal
pub trait CancellationMonitor: Send + Sync {
    fn is_canceled(&self) -> bool;
}

/// Monitor that never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationMonitor for NeverCancel {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Shared flag that any thread can raise
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl CancellationMonitor for CancellationFlag {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fail with [`Canceled`] when the monitor has been signalled
#[inline]
pub fn check(monitor: &dyn CancellationMonitor) -> Result<(), Canceled> {
    if monitor.is_canceled() {
        Err(Canceled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(check(&flag).is_ok());
        other.cancel();
        assert_eq!(check(&flag), Err(Canceled));
    }

    #[test]
    fn test_never_cancel() {
        assert!(check(&NeverCancel).is_ok());
    }
}
