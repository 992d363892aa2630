// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Readiness capability handed to plugins at construction.

use super::errors::{AdmissionError, AdmissionResult};
use std::fmt;
use std::sync::Arc;

/// Readiness reports whether the caches a plugin reads from are synchronised.
///
/// Each plugin instance holds its own handle; there is no process-wide flag.
#[derive(Clone)]
pub struct Readiness {
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Readiness {
    /// A readiness that is always satisfied.
    pub fn always() -> Self {
        Self::from_fn(|| true)
    }

    pub fn from_fn(check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    pub fn is_ready(&self) -> bool {
        (self.check)()
    }

    /// Fails with a NotReady error naming the plugin unless ready. The check
    /// does not block or retry.
    pub fn ensure_ready(&self, plugin: &str) -> AdmissionResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            tracing::warn!(plugin, "rejecting request, caches not synced");
            Err(AdmissionError::not_ready(plugin))
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readiness")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_always_ready() {
        let readiness = Readiness::always();
        assert!(readiness.is_ready());
        assert!(readiness.ensure_ready("X").is_ok());
    }

    #[test]
    fn test_from_fn_follows_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = flag.clone();
        let readiness = Readiness::from_fn(move || observed.load(Ordering::SeqCst));

        let err = readiness.ensure_ready("ShootDNS").unwrap_err();
        assert_eq!(err.to_string(), "ShootDNS not yet ready to handle request");

        flag.store(true, Ordering::SeqCst);
        assert!(readiness.ensure_ready("ShootDNS").is_ok());
    }
}
