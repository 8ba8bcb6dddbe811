//! Deferred root materialization
//!
//! Until the owning server reports that it has started, configurations are
//! only queued. The start signal materializes them in insertion order; after
//! that every new configuration is materialized on arrival.

use assetgate_core::Result;
use assetgate_core::config::StaticFileConfig;
use parking_lot::Mutex;

enum State {
    Pending(Vec<StaticFileConfig>),
    Active,
}

/// Two-state lifecycle: `Pending` (queue) then `Active`
pub struct Lifecycle {
    state: Mutex<State>,
}

impl Lifecycle {
    /// Start out pending
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
        }
    }

    /// Whether the start signal has been received
    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), State::Active)
    }

    /// Number of queued configurations
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            State::Pending(queue) => queue.len(),
            State::Active => 0,
        }
    }

    /// Queue `config`, or hand it to `apply` right away once active.
    ///
    /// Returns `true` when applied immediately.
    pub fn submit(
        &self,
        config: StaticFileConfig,
        apply: impl FnOnce(StaticFileConfig) -> Result<()>,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Pending(queue) => {
                queue.push(config);
                Ok(false)
            }
            State::Active => {
                apply(config)?;
                Ok(true)
            }
        }
    }

    /// Switch to active, applying queued configurations in order.
    ///
    /// The lock is held throughout, so a concurrent `submit` lands after every
    /// queued configuration. A second call does nothing.
    pub fn start(&self, mut apply: impl FnMut(StaticFileConfig) -> Result<()>) -> Result<usize> {
        let mut state = self.state.lock();
        let queue = match std::mem::replace(&mut *state, State::Active) {
            State::Pending(queue) => queue,
            State::Active => return Ok(0),
        };

        let count = queue.len();
        for config in queue {
            apply(config)?;
        }
        Ok(count)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
