//! Shared "current playable buffer" slot
//!
//! The equalization pipeline and the mixer both publish here; the playback
//! clock reads from here. This is the only coupling between them. The
//! pipeline commits through [`BufferSlot::install_if`], which evaluates its
//! staleness check under the slot lock so a superseding request racing the
//! commit cannot be overwritten by the request it superseded.

use std::sync::{Arc, Mutex};

use crate::types::SampleBuffer;

/// Holder for the buffer playback should use
#[derive(Debug, Default)]
pub struct BufferSlot {
    current: Mutex<Option<Arc<SampleBuffer>>>,
}

impl BufferSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the playable buffer
    pub fn install(&self, buffer: Arc<SampleBuffer>) {
        let mut slot = self.current.lock().unwrap();
        *slot = Some(buffer);
    }

    /// Replace the playable buffer only if `condition` still holds
    ///
    /// `condition` runs while the slot lock is held, making check-and-install
    /// a single step. Returns whether the buffer was installed.
    pub fn install_if(&self, buffer: Arc<SampleBuffer>, condition: impl FnOnce() -> bool) -> bool {
        let mut slot = self.current.lock().unwrap();
        if condition() {
            *slot = Some(buffer);
            true
        } else {
            false
        }
    }

    /// Drop the playable buffer (new-file load, explicit stop)
    pub fn clear(&self) {
        let mut slot = self.current.lock().unwrap();
        *slot = None;
    }

    /// Get the currently installed buffer, if any
    pub fn current(&self) -> Option<Arc<SampleBuffer>> {
        self.current.lock().unwrap().clone()
    }

    /// Duration of the installed buffer in seconds (0.0 when empty)
    pub fn duration_seconds(&self) -> f64 {
        self.current()
            .map(|b| b.duration_seconds())
            .unwrap_or(0.0)
    }
}
