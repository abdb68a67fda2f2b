//! Configure/ack sequencing for role surfaces
//!
//! Every role (toplevel, popup, layer surface) owns a [`ConfigureTracker`].
//! The server records each configure it sends; the client must acknowledge
//! them in order before committing a buffer.
//!
//! # State machine
//!
//! 1. **Created**: role assigned, nothing sent yet
//! 2. **WaitingForAck**: initial configure sent
//! 3. **Configured**: at least one configure acknowledged
//! 4. **Mapped**: a buffer was committed after an ack
//! 5. **Unmapped**: a null buffer was committed after mapping
//!
//! # Ack rules
//!
//! - acking when nothing was sent, or a serial newer than the last one
//!   sent, is an error
//! - acking a serial older than the last acknowledged one is an error
//! - re-acking the last acknowledged serial is accepted
//! - any other ack must name a configure that was actually sent, or one the
//!   tracker forgot because too many were pending

use crate::geometry::Size;
use log::{debug, warn};
use std::collections::VecDeque;
use thiserror::Error;

/// Maximum number of unacknowledged configures tracked per role
const MAX_PENDING_CONFIGURES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureState {
    Created,
    WaitingForAck,
    Configured,
    Mapped,
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfigure {
    pub serial: u32,
    pub size: Size,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigureError {
    #[error("ack_configure({serial}) but no configure was sent")]
    NothingSent { serial: u32 },
    #[error("ack_configure({serial}) is newer than the last configure ({last_sent})")]
    TooNew { serial: u32, last_sent: u32 },
    #[error("ack_configure({serial}) is older than the last acknowledged serial ({last_acked})")]
    Stale { serial: u32, last_acked: u32 },
    #[error("ack_configure({serial}) does not match any configure sent to this surface")]
    Unknown { serial: u32 },
    #[error("buffer committed before the first configure was acknowledged")]
    UnconfiguredBuffer,
}

#[derive(Debug, Clone)]
pub struct ConfigureTracker {
    state: ConfigureState,
    pending: VecDeque<PendingConfigure>,
    last_sent: Option<u32>,
    last_acked: Option<u32>,
    /// Newest serial dropped from `pending` to bound its length
    forgotten: Option<u32>,
    acked_size: Option<Size>,
    commit_count: u64,
}

impl Default for ConfigureTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigureTracker {
    pub fn new() -> Self {
        Self {
            state: ConfigureState::Created,
            pending: VecDeque::new(),
            last_sent: None,
            last_acked: None,
            forgotten: None,
            acked_size: None,
            commit_count: 0,
        }
    }

    pub fn state(&self) -> ConfigureState {
        self.state
    }

    pub fn last_sent(&self) -> Option<u32> {
        self.last_sent
    }

    pub fn last_acked(&self) -> Option<u32> {
        self.last_acked
    }

    /// Size carried by the most recently acknowledged configure
    pub fn acked_size(&self) -> Option<Size> {
        self.acked_size
    }

    pub fn initial_sent(&self) -> bool {
        self.last_sent.is_some()
    }

    pub fn is_mapped(&self) -> bool {
        self.state == ConfigureState::Mapped
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Records that a configure with `serial` was sent
    pub fn record_sent(&mut self, serial: u32, size: Size) {
        if self.pending.len() >= MAX_PENDING_CONFIGURES {
            warn!(
                "{} configures pending without ack, forgetting serial {:?}",
                self.pending.len(),
                self.pending.front().map(|c| c.serial)
            );
            self.forgotten = self.pending.pop_front().map(|c| c.serial);
        }
        self.pending.push_back(PendingConfigure { serial, size });
        self.last_sent = Some(serial);

        if self.state == ConfigureState::Created {
            self.transition(ConfigureState::WaitingForAck);
        }
        debug!("configure sent: serial={} size={:?}", serial, size);
    }

    /// Validates and records an ack from the client
    pub fn ack(&mut self, serial: u32) -> Result<(), ConfigureError> {
        let Some(last_sent) = self.last_sent else {
            return Err(ConfigureError::NothingSent { serial });
        };
        if serial > last_sent {
            return Err(ConfigureError::TooNew { serial, last_sent });
        }
        if let Some(last_acked) = self.last_acked {
            if serial < last_acked {
                return Err(ConfigureError::Stale { serial, last_acked });
            }
            if serial == last_acked {
                return Ok(());
            }
        }

        match self.pending.iter().position(|c| c.serial == serial) {
            Some(index) => {
                // Acking a configure implicitly acks every older one.
                let acked = self.pending.drain(..=index).last();
                self.acked_size = acked.map(|c| c.size);
            }
            // the size of a forgotten configure is no longer known
            None if self.forgotten.is_some_and(|f| serial <= f) => {
                self.pending.retain(|c| c.serial > serial);
                self.acked_size = None;
            }
            None => return Err(ConfigureError::Unknown { serial }),
        }
        self.last_acked = Some(serial);

        if self.state == ConfigureState::WaitingForAck {
            self.transition(ConfigureState::Configured);
        }
        debug!("configure acknowledged: serial={}", serial);
        Ok(())
    }

    /// Validates a commit and moves the mapped state along
    pub fn commit(&mut self, has_buffer: bool) -> Result<(), ConfigureError> {
        self.commit_count += 1;

        if has_buffer && self.last_acked.is_none() {
            return Err(ConfigureError::UnconfiguredBuffer);
        }

        match (has_buffer, self.state) {
            (true, ConfigureState::Configured | ConfigureState::Unmapped) => {
                self.transition(ConfigureState::Mapped)
            }
            (false, ConfigureState::Mapped) => self.transition(ConfigureState::Unmapped),
            _ => {}
        }
        Ok(())
    }

    fn transition(&mut self, state: ConfigureState) {
        if self.state != state {
            debug!("configure state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_sequence() {
        let mut tracker = ConfigureTracker::new();
        assert_eq!(tracker.state(), ConfigureState::Created);

        tracker.record_sent(3, Size::new(640, 480));
        assert_eq!(tracker.state(), ConfigureState::WaitingForAck);
        tracker.ack(3).unwrap();
        assert_eq!(tracker.state(), ConfigureState::Configured);
        assert_eq!(tracker.acked_size(), Some(Size::new(640, 480)));

        tracker.commit(true).unwrap();
        assert!(tracker.is_mapped());
        tracker.commit(false).unwrap();
        assert_eq!(tracker.state(), ConfigureState::Unmapped);
    }

    #[test]
    fn test_ack_without_configure() {
        let mut tracker = ConfigureTracker::new();
        assert_eq!(tracker.ack(1), Err(ConfigureError::NothingSent { serial: 1 }));
    }

    #[test]
    fn test_ack_newer_than_sent() {
        let mut tracker = ConfigureTracker::new();
        tracker.record_sent(5, Size::default());
        assert_eq!(
            tracker.ack(6),
            Err(ConfigureError::TooNew {
                serial: 6,
                last_sent: 5
            })
        );
    }

    #[test]
    fn test_out_of_order_ack_is_rejected() {
        let mut tracker = ConfigureTracker::new();
        tracker.record_sent(2, Size::default());
        tracker.record_sent(4, Size::default());
        tracker.ack(4).unwrap();
        assert_eq!(
            tracker.ack(2),
            Err(ConfigureError::Stale {
                serial: 2,
                last_acked: 4
            })
        );
        // the same serial again is fine
        tracker.ack(4).unwrap();
    }

    #[test]
    fn test_ack_of_foreign_serial() {
        let mut tracker = ConfigureTracker::new();
        tracker.record_sent(2, Size::default());
        tracker.record_sent(6, Size::default());
        assert_eq!(tracker.ack(4), Err(ConfigureError::Unknown { serial: 4 }));
    }

    #[test]
    fn test_ack_skips_older_pending() {
        let mut tracker = ConfigureTracker::new();
        tracker.record_sent(1, Size::new(1, 1));
        tracker.record_sent(2, Size::new(2, 2));
        tracker.record_sent(3, Size::new(3, 3));
        tracker.ack(2).unwrap();
        assert_eq!(tracker.pending_count(), 1);
        tracker.ack(3).unwrap();
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn test_buffer_before_ack() {
        let mut tracker = ConfigureTracker::new();
        tracker.record_sent(1, Size::default());
        assert_eq!(tracker.commit(true), Err(ConfigureError::UnconfiguredBuffer));
        assert!(tracker.commit(false).is_ok());
    }

    #[test]
    fn test_ack_of_forgotten_configure_is_accepted() {
        let mut tracker = ConfigureTracker::new();
        for serial in 1..=40 {
            tracker.record_sent(serial, Size::new(serial as i32, 1));
        }
        assert_eq!(tracker.pending_count(), MAX_PENDING_CONFIGURES);

        tracker.ack(1).unwrap();
        assert_eq!(tracker.last_acked(), Some(1));
        assert_eq!(tracker.acked_size(), None);
        assert_eq!(tracker.pending_count(), MAX_PENDING_CONFIGURES);

        tracker.ack(20).unwrap();
        assert_eq!(tracker.acked_size(), Some(Size::new(20, 1)));
        assert_eq!(tracker.pending_count(), 20);
        assert!(matches!(tracker.ack(5), Err(ConfigureError::Stale { .. })));
    }
}
