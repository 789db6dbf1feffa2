//! Debounce timers on a logical clock.

use std::time::Duration;

/// A resettable one-shot deadline. Re-arming replaces any pending deadline,
/// so only the last trigger of a burst ever fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Duration) {
        self.deadline = Some(now.saturating_add(self.delay));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::Duration;

    #[test]
    fn rearming_pushes_the_deadline_back() {
        let mut timer = Debouncer::new(Duration::from_millis(150));
        timer.arm(Duration::from_millis(0));
        timer.arm(Duration::from_millis(100));
        assert_eq!(timer.deadline(), Some(Duration::from_millis(250)));
        assert!(timer.is_pending());
    }

    #[test]
    fn cancel_disarms() {
        let mut timer = Debouncer::new(Duration::from_millis(10));
        timer.arm(Duration::ZERO);
        timer.cancel();
        assert_eq!(timer.deadline(), None);
        assert!(!timer.is_pending());
    }
}
