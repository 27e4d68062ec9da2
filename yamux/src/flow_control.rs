//! Per-stream receive-window accounting.

/// Tracks one stream's advertised receive window and decides when a
/// `windowUpdate` is owed to the peer.
#[derive(Debug, Clone)]
pub struct FlowController {
    /// Bytes still available in the window we've advertised to the peer.
    window: u32,
    /// The window size we last advertised (what `window` counts down from).
    advertised: u32,
    /// Bytes consumed by the application since the last window update.
    consumed_since_update: u32,
    enable_auto_tuning: bool,
    max_auto_tune_window: u32,
}

impl FlowController {
    pub fn new(initial_window: u32, enable_auto_tuning: bool, max_auto_tune_window: u32) -> Self {
        FlowController {
            window: initial_window,
            advertised: initial_window,
            consumed_since_update: 0,
            enable_auto_tuning,
            max_auto_tune_window,
        }
    }

    /// Consumes `n` bytes from the receive window. Returns `false` - a
    /// window-exceeded protocol violation - if `n` exceeds the bytes
    /// currently available.
    pub fn data_received(&mut self, n: u32) -> bool {
        if n > self.window {
            return false;
        }
        self.window -= n;
        true
    }

    /// The application has drained `n` bytes from the reassembly buffer.
    /// Returns the credit to grant via `windowUpdate`, if one is due now.
    pub fn data_consumed(&mut self, n: u32, reassembly_buffer_len: u32) -> Option<u32> {
        self.consumed_since_update = self.consumed_since_update.saturating_add(n);

        let half = self.advertised / 2;
        if self.consumed_since_update < half {
            return None;
        }

        if self.enable_auto_tuning && self.advertised < self.max_auto_tune_window {
            self.advertised = (self.advertised.saturating_mul(2)).min(self.max_auto_tune_window);
        }

        let delta = self.advertised.saturating_sub(reassembly_buffer_len).saturating_sub(self.window);
        self.consumed_since_update = 0;
        self.window = self.window.saturating_add(delta);

        if delta == 0 {
            None
        } else {
            Some(delta)
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeding_window_reports_violation() {
        let mut fc = FlowController::new(64, false, 0);
        assert!(fc.data_received(64));
        assert!(!fc.data_received(1));
    }

    #[test]
    fn update_issued_past_half_consumption() {
        let mut fc = FlowController::new(100, false, 0);
        fc.data_received(60);
        assert!(fc.data_consumed(10, 40).is_none());
        let delta = fc.data_consumed(40, 0);
        assert!(delta.is_some());
    }

    #[test]
    fn auto_tuning_caps_at_max() {
        let mut fc = FlowController::new(100, true, 150);
        fc.data_received(100);
        fc.data_consumed(100, 0);
        assert!(fc.advertised <= 150);
    }
}
