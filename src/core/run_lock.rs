use crate::utils::error::{CalcError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Named mutual-exclusion tokens. Acquiring a name that is already held
/// fails immediately instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, scope: &str) -> Result<RunGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(scope.to_string()) {
            return Err(CalcError::RunInProgress);
        }
        tracing::debug!("Acquired run lock '{}'", scope);
        Ok(RunGuard {
            active: Arc::clone(&self.active),
            scope: scope.to_string(),
        })
    }

    pub fn is_held(&self, scope: &str) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.contains(scope)
    }
}

/// Releases its scope when dropped, whether the run succeeded or not.
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<Mutex<HashSet<String>>>,
    scope: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.scope);
        tracing::debug!("Released run lock '{}'", self.scope);
    }
}
