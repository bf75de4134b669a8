//! Debounced canvas resizing.
//!
//! Container size changes arrive in bursts. The first request opens a delay
//! window; requests landing inside it only record the newest size. When the
//! window closes, exactly one resize runs with the latest observed size,
//! unless that equals the size already applied. The next request after that
//! opens a fresh window, so a steady stream of requests resizes once per
//! window.

#[cfg(test)]
#[path = "resize_test.rs"]
mod resize_test;

use crate::viewport::Size;

#[derive(Debug, Clone)]
pub struct ResizeController {
    delay_ms: f64,
    is_delay: bool,
    is_request: bool,
    window_end_ms: f64,
    latest: Option<Size>,
    applied: Option<Size>,
}

impl ResizeController {
    #[must_use]
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            is_delay: false,
            is_request: false,
            window_end_ms: 0.0,
            latest: None,
            applied: None,
        }
    }

    /// Record the size the canvas currently has, so an identical request is skipped.
    pub fn set_applied(&mut self, size: Size) {
        self.applied = Some(size);
    }

    #[must_use]
    pub fn applied(&self) -> Option<Size> {
        self.applied
    }

    /// Whether a delay window is open.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.is_delay
    }

    /// Note a container size observed at `now_ms`.
    pub fn request(&mut self, now_ms: f64, size: Size) {
        self.latest = Some(size);
        if self.is_delay {
            self.is_request = true;
            return;
        }
        self.is_delay = true;
        self.window_end_ms = now_ms + self.delay_ms;
    }

    /// Advance the debounce clock. Returns the size to apply when a window
    /// closes with a size different from the applied one.
    pub fn poll(&mut self, now_ms: f64) -> Option<Size> {
        if !self.is_delay || now_ms < self.window_end_ms {
            return None;
        }
        if self.is_request {
            log::debug!("resize requests coalesced into one window");
        }
        self.is_delay = false;
        self.is_request = false;
        let size = self.latest.take()?;
        if self.applied == Some(size) {
            log::debug!("resize skipped: canvas already {}x{}", size.width, size.height);
            return None;
        }
        self.applied = Some(size);
        Some(size)
    }
}
