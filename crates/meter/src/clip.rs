use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipState {
    #[default]
    Normal,
    Clipping {
        until: Duration,
    },
}

/// Holds the clip indicator for a fixed window after the first over-threshold
/// tick. Further clipping inside the window neither extends nor re-arms it.
#[derive(Debug, Clone)]
pub struct ClipLatch {
    hold: Duration,
    state: ClipState,
}

impl ClipLatch {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            state: ClipState::Normal,
        }
    }

    pub fn state(&self) -> ClipState {
        self.state
    }

    pub fn is_clipping(&self) -> bool {
        matches!(self.state, ClipState::Clipping { .. })
    }

    /// Expires a finished window, then latches if `over` is set. Returns
    /// whether the meter is clipping for this tick.
    pub fn update(&mut self, now: Duration, over: bool) -> bool {
        if let ClipState::Clipping { until } = self.state
            && now >= until
        {
            log::debug!("clip indicator released");
            self.state = ClipState::Normal;
        }

        if over && self.state == ClipState::Normal {
            log::debug!("clip indicator latched");
            self.state = ClipState::Clipping {
                until: now + self.hold,
            };
        }

        self.is_clipping()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn starts_normal() {
        let mut latch = ClipLatch::new(ms(1000));
        assert!(!latch.update(ms(0), false));
        assert_eq!(latch.state(), ClipState::Normal);
    }

    #[test]
    fn latches_for_hold_window() {
        let mut latch = ClipLatch::new(ms(1000));

        assert!(latch.update(ms(100), true));
        assert_eq!(latch.state(), ClipState::Clipping { until: ms(1100) });

        assert!(latch.update(ms(500), false));
        assert!(latch.update(ms(1099), false));
        assert!(!latch.update(ms(1100), false));
    }

    #[test]
    fn clipping_inside_window_does_not_extend_it() {
        let mut latch = ClipLatch::new(ms(1000));

        latch.update(ms(0), true);
        for t in (16..1000).step_by(16) {
            assert!(latch.update(ms(t), true));
        }
        assert_eq!(latch.state(), ClipState::Clipping { until: ms(1000) });
    }

    #[test]
    fn rearms_after_window() {
        let mut latch = ClipLatch::new(ms(1000));

        latch.update(ms(0), true);
        assert!(latch.update(ms(1000), true));
        assert_eq!(latch.state(), ClipState::Clipping { until: ms(2000) });
    }
}
