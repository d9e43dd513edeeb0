//! # Keystroke Burst Buffer
//!
//! Hardware barcode scanners present themselves as keyboards: a whole code is
//! "typed" in a few milliseconds and terminated with Enter. This buffer tells
//! such bursts apart from a person typing.
//!
//! ```text
//! key   key   key   key  Enter         key ........ key   Enter
//!  │<5ms>│<5ms>│<5ms>│<5ms>│             │  > 50 ms  │      │
//!  └──────── burst ────────┘ emit        └ discarded ┘      └ nothing (stale)
//! ```
//!
//! The buffer only holds state; the session layer feeds it timestamps.

use std::time::{Duration, Instant};

use crate::MAX_KEY_GAP_MS;

/// Rolling buffer for keyboard-wedge scanner input.
#[derive(Debug, Clone)]
pub struct KeystrokeBuffer {
    buffer: String,
    last_key_at: Option<Instant>,
    max_gap: Duration,
    min_len: usize,
}

impl Default for KeystrokeBuffer {
    fn default() -> Self {
        KeystrokeBuffer::new(Duration::from_millis(MAX_KEY_GAP_MS))
    }
}

impl KeystrokeBuffer {
    /// Creates an empty buffer with the given inter-key gap ceiling.
    pub fn new(max_gap: Duration) -> Self {
        KeystrokeBuffer {
            buffer: String::new(),
            last_key_at: None,
            max_gap,
            min_len: 1,
        }
    }

    /// Sets the shortest burst that still counts as a code.
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len.max(1);
        self
    }

    /// Records one printable keystroke.
    ///
    /// If the previous keystroke is older than the gap ceiling, everything
    /// buffered so far is discarded first and `c` starts a new burst.
    pub fn push_char(&mut self, c: char, at: Instant) {
        if self.is_stale(at) {
            self.buffer.clear();
        }
        self.buffer.push(c);
        self.last_key_at = Some(at);
    }

    /// Handles the Enter key.
    ///
    /// Returns the buffered burst when it arrived fast enough and is long
    /// enough; the buffer is cleared in every case.
    pub fn enter(&mut self, at: Instant) -> Option<String> {
        let stale = self.is_stale(at);
        let burst = std::mem::take(&mut self.buffer);
        self.last_key_at = None;

        if stale {
            return None;
        }

        let code = burst.trim();
        if code.chars().count() < self.min_len {
            return None;
        }
        Some(code.to_string())
    }

    /// Drops any partial burst (mode switch, focus loss).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_key_at = None;
    }

    /// Current buffered text.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn is_stale(&self, at: Instant) -> bool {
        match self.last_key_at {
            Some(last) => at.saturating_duration_since(last) > self.max_gap,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn type_burst(buf: &mut KeystrokeBuffer, text: &str, start: Instant, gap: Duration) -> Instant {
        let mut at = start;
        for c in text.chars() {
            buf.push_char(c, at);
            at += gap;
        }
        at
    }

    #[test]
    fn test_fast_burst_is_emitted() {
        let mut buf = KeystrokeBuffer::default();
        let t0 = Instant::now();
        let end = type_burst(&mut buf, "356938035643809", t0, ms(4));

        assert_eq!(buf.enter(end).as_deref(), Some("356938035643809"));
        assert_eq!(buf.pending(), "");
    }

    #[test]
    fn test_slow_typing_discards_buffer() {
        let mut buf = KeystrokeBuffer::default();
        let t0 = Instant::now();
        buf.push_char('A', t0);
        buf.push_char('B', t0 + ms(120));

        assert_eq!(buf.pending(), "B");
    }

    #[test]
    fn test_stale_enter_emits_nothing() {
        let mut buf = KeystrokeBuffer::default();
        let t0 = Instant::now();
        let end = type_burst(&mut buf, "A1", t0, ms(5));

        assert_eq!(buf.enter(end + ms(200)), None);
        assert_eq!(buf.pending(), "");
    }

    #[test]
    fn test_enter_on_empty_buffer() {
        let mut buf = KeystrokeBuffer::default();
        assert_eq!(buf.enter(Instant::now()), None);
    }

    #[test]
    fn test_gap_exactly_at_ceiling_is_kept() {
        let mut buf = KeystrokeBuffer::default();
        let t0 = Instant::now();
        buf.push_char('A', t0);
        buf.push_char('1', t0 + ms(MAX_KEY_GAP_MS));

        assert_eq!(buf.enter(t0 + ms(MAX_KEY_GAP_MS + 1)).as_deref(), Some("A1"));
    }

    #[test]
    fn test_min_len_filters_stray_keys() {
        let mut buf = KeystrokeBuffer::default().with_min_len(4);
        let t0 = Instant::now();
        let end = type_burst(&mut buf, "AB", t0, ms(3));

        assert_eq!(buf.enter(end), None);
    }
}
