//! Keyboard-wedge scanner listener.
//!
//! Wraps the core [`KeystrokeBuffer`] with the runtime clock. While detached
//! (another mode is live) every key is ignored.

use std::time::Duration;

use stockscan_core::keystroke::KeystrokeBuffer;
use stockscan_core::{ScanEvent, ScanSource};
use tokio::time::Instant;
use tracing::trace;

/// A key as delivered by the window's keyboard handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character.
    Char(char),
    /// The Enter key.
    Enter,
}

/// Turns fast keystroke bursts into scan events.
#[derive(Debug)]
pub struct KeystrokeListener {
    buffer: KeystrokeBuffer,
    attached: bool,
}

impl KeystrokeListener {
    pub fn new(max_gap: Duration, min_len: usize) -> Self {
        KeystrokeListener {
            buffer: KeystrokeBuffer::new(max_gap).with_min_len(min_len),
            attached: false,
        }
    }

    /// Starts listening.
    pub fn attach(&mut self) {
        self.buffer.reset();
        self.attached = true;
    }

    /// Stops listening and drops any partial burst.
    pub fn detach(&mut self) {
        self.buffer.reset();
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Feeds one key observed at `at`; returns a scan on a completed burst.
    pub fn handle_key(&mut self, key: KeyInput, at: Instant) -> Option<ScanEvent> {
        if !self.attached {
            return None;
        }

        let at = at.into_std();
        match key {
            KeyInput::Char(c) => {
                self.buffer.push_char(c, at);
                None
            }
            KeyInput::Enter => {
                let code = self.buffer.enter(at);
                if code.is_none() {
                    trace!("Enter without a scanner burst; ignored");
                }
                code.map(|code| ScanEvent::new(code, ScanSource::ExternalScanner))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_burst(
        listener: &mut KeystrokeListener,
        text: &str,
        start: Instant,
        gap_ms: u64,
    ) -> Instant {
        let mut at = start;
        for c in text.chars() {
            listener.handle_key(KeyInput::Char(c), at);
            at += Duration::from_millis(gap_ms);
        }
        at
    }

    #[test]
    fn test_fast_burst_emits_scan() {
        let mut listener = KeystrokeListener::new(Duration::from_millis(50), 1);
        listener.attach();

        let start = Instant::now();
        let end = type_burst(&mut listener, "356938035643809", start, 5);
        let event = listener.handle_key(KeyInput::Enter, end).unwrap();

        assert_eq!(event.code, "356938035643809");
        assert_eq!(event.source, ScanSource::ExternalScanner);
    }

    #[test]
    fn test_slow_typing_discarded() {
        let mut listener = KeystrokeListener::new(Duration::from_millis(50), 1);
        listener.attach();

        let start = Instant::now();
        let end = type_burst(&mut listener, "A1", start, 120);
        assert!(listener.handle_key(KeyInput::Enter, end).is_none());
    }

    #[test]
    fn test_detached_ignores_keys() {
        let mut listener = KeystrokeListener::new(Duration::from_millis(50), 1);
        let start = Instant::now();
        let end = type_burst(&mut listener, "A1", start, 1);
        assert!(listener.handle_key(KeyInput::Enter, end).is_none());

        listener.attach();
        type_burst(&mut listener, "A", end, 1);
        listener.detach();
        listener.attach();
        assert!(listener.handle_key(KeyInput::Enter, end).is_none());
    }
}
