//! Debounces file change events by path so a burst of saves (auto-save,
//! formatter re-writes) collapses into one incremental-index cycle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    pending: HashMap<PathBuf, Instant>,
    duration: Duration,
}

impl Debouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();
        self.pending.retain(|path, last_change| {
            if now.duration_since(*last_change) >= self.duration {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn debounces_rapid_changes_into_one() {
        let mut debouncer = Debouncer::new(30);
        let path = PathBuf::from("/repo/src/main.py");
        debouncer.record(path.clone());
        assert!(debouncer.take_ready().is_empty());
        sleep(Duration::from_millis(15));
        debouncer.record(path.clone());
        sleep(Duration::from_millis(15));
        assert!(debouncer.take_ready().is_empty());
        sleep(Duration::from_millis(20));
        let ready = debouncer.take_ready();
        assert_eq!(ready, vec![path]);
    }
}
