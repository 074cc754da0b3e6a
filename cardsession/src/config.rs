// cardsession/src/config.rs

//! Plugin and session configuration

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{CONTACT_READER_NAME, CONTACTLESS_READER_NAME};
use crate::types::{NotificationMode, PollingMode, SamSlot};
use crate::utils::{
    DEFAULT_POLLING_INTERVAL_MS, DEFAULT_POWER_UP_TIMEOUT_MS, DEFAULT_READER_INIT_TIMEOUT_MS, ms,
};

/// Plugin lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PluginConfig {
    /// Bound on hardware power-up (ms)
    pub power_up_timeout_ms: u64,
    /// Bound on reader instance acquisition (ms)
    pub reader_init_timeout_ms: u64,
    /// Card presence polling period (ms)
    pub polling_interval_ms: u64,
    pub polling_mode: PollingMode,
    pub notification_mode: NotificationMode,
    pub contactless_reader_name: String,
    /// Prefix of the contact reader names; the slot number is appended.
    pub contact_reader_prefix: String,
    pub sam_slots: Vec<SamSlot>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            power_up_timeout_ms: DEFAULT_POWER_UP_TIMEOUT_MS,
            reader_init_timeout_ms: DEFAULT_READER_INIT_TIMEOUT_MS,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            polling_mode: PollingMode::Repeating,
            notification_mode: NotificationMode::MatchedOnly,
            contactless_reader_name: CONTACTLESS_READER_NAME.to_string(),
            contact_reader_prefix: CONTACT_READER_NAME.to_string(),
            sam_slots: vec![SamSlot::One, SamSlot::Two],
        }
    }
}

impl PluginConfig {
    pub fn power_up_timeout(mut self, timeout_ms: u64) -> Self {
        self.power_up_timeout_ms = timeout_ms;
        self
    }

    pub fn reader_init_timeout(mut self, timeout_ms: u64) -> Self {
        self.reader_init_timeout_ms = timeout_ms;
        self
    }

    pub fn polling_interval(mut self, interval_ms: u64) -> Self {
        self.polling_interval_ms = interval_ms;
        self
    }

    pub fn polling_mode(mut self, mode: PollingMode) -> Self {
        self.polling_mode = mode;
        self
    }

    pub fn notification_mode(mut self, mode: NotificationMode) -> Self {
        self.notification_mode = mode;
        self
    }

    pub fn sam_slots(mut self, slots: Vec<SamSlot>) -> Self {
        self.sam_slots = slots;
        self
    }

    pub fn polling_interval_duration(&self) -> Duration {
        ms(self.polling_interval_ms)
    }

    /// Name of the contact reader for `slot`, e.g. `Cone2ContactReader_1`.
    pub fn contact_reader_name(&self, slot: SamSlot) -> String {
        format!("{}_{}", self.contact_reader_prefix, slot)
    }
}

/// Card session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Ask for ratification at closing and send the ratification command
    /// once the SAM verified the session.
    pub ratification: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ratification: true }
    }
}

impl SessionConfig {
    pub fn ratification(mut self, enabled: bool) -> Self {
        self.ratification = enabled;
        self
    }
}
