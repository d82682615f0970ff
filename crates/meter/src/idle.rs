use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct IdleDetector {
    timeout: Duration,
}

impl IdleDetector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// A meter that has never been written to is idle.
    pub fn is_idle(&self, last_write: Option<Duration>, now: Duration) -> bool {
        match last_write {
            Some(last_write) => now.saturating_sub(last_write) > self.timeout,
            None => true,
        }
    }
}
