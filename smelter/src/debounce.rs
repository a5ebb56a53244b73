//! Suppression of duplicate completion signals for a device.

use std::collections::HashMap;

use glam::IVec3;


/// Remember, per device, the last time a completion signal has been processed.
#[derive(Debug, Default)]
pub struct DebounceGuard {
    last: HashMap<IVec3, u64>,
}

impl DebounceGuard {

    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if a signal at the given time should be processed, that is if no
    /// signal has been processed for this device within the window. The time is only
    /// recorded when returning true.
    pub fn should_process(&mut self, pos: IVec3, now_ms: u64, window_ms: u64) -> bool {
        if let Some(&last) = self.last.get(&pos) {
            if now_ms.saturating_sub(last) < window_ms {
                return false;
            }
        }
        self.last.insert(pos, now_ms);
        true
    }

    pub fn clear(&mut self, pos: IVec3) {
        self.last.remove(&pos);
    }

    pub fn clear_all(&mut self) {
        self.last.clear();
    }

}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn window() {
        let mut guard = DebounceGuard::new();
        let pos = IVec3::new(0, 64, 0);
        let other = IVec3::new(1, 64, 0);
        assert!(guard.should_process(pos, 1000, 150));
        assert!(!guard.should_process(pos, 1001, 150));
        assert!(guard.should_process(other, 1001, 150));
        assert!(!guard.should_process(pos, 1149, 150));
        assert!(guard.should_process(pos, 1151, 150));
        // Last recorded time is now 1151.
        assert!(!guard.should_process(pos, 1200, 150));
        guard.clear(pos);
        assert!(guard.should_process(pos, 1200, 150));
    }

    #[test]
    fn clock_going_backward() {
        let mut guard = DebounceGuard::new();
        let pos = IVec3::ZERO;
        assert!(guard.should_process(pos, 500, 150));
        assert!(!guard.should_process(pos, 400, 150));
        guard.clear_all();
        assert!(guard.should_process(pos, 400, 150));
    }

}
