// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub expires_at: Instant,
}

/// Single-slot toast. A new message replaces the visible one and restarts
/// its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    slot: Option<Notification>,
    ttl: Duration,
    shown: u64,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }
}

impl NotificationChannel {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: None,
            ttl,
            shown: 0,
        }
    }

    pub fn show(&mut self, message: &str) -> bool {
        self.show_at(message, Instant::now())
    }

    /// Returns false when the message is blank and nothing changed.
    pub fn show_at(&mut self, message: &str, now: Instant) -> bool {
        if message.trim().is_empty() {
            return false;
        }
        self.slot = Some(Notification {
            message: message.to_owned(),
            expires_at: now + self.ttl,
        });
        self.shown = self.shown.saturating_add(1);
        true
    }

    pub fn visible_at(&self, now: Instant) -> Option<&str> {
        self.slot
            .as_ref()
            .filter(|notification| now < notification.expires_at)
            .map(|notification| notification.message.as_str())
    }

    /// The last message shown, expired or not.
    pub fn latest(&self) -> Option<&Notification> {
        self.slot.as_ref()
    }

    /// Total notifications shown so far.
    pub fn shown_count(&self) -> u64 {
        self.shown
    }
}
