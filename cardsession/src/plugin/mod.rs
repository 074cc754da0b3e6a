// cardsession/src/plugin/mod.rs

//! Plugin lifecycle.
//!
//! `Plugin<Uninitialized>` owns the hardware handle; `initialize` powers the
//! module up and acquires the reader transport, each step bounded by a
//! deadline. `Plugin<Initialized>` exposes the reader registry and powers
//! the hardware down exactly once, on `shutdown` or when dropped.

use std::marker::PhantomData;

use crate::config::{PluginConfig, SessionConfig};
use crate::reader::{ObservableReader, Reader, share};
use crate::sam::{SamGateway, SecurityModule};
use crate::session::CardSession;
use crate::types::SamSlot;
use crate::utils::{ms, with_deadline};
use crate::{Error, Result};

pub mod hardware;
pub mod registry;

pub use hardware::HardwarePlatform;
pub use registry::ReaderRegistry;

/// Type-state markers
pub struct Uninitialized;
pub struct Initialized;

pub struct Plugin<State = Uninitialized> {
    hardware: Option<Box<dyn HardwarePlatform>>,
    config: PluginConfig,
    registry: ReaderRegistry,
    firmware: Option<String>,
    powered: bool,
    _state: PhantomData<State>,
}

impl<S> std::fmt::Debug for Plugin<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("readers", &self.registry.names())
            .field("firmware", &self.firmware)
            .field("powered", &self.powered)
            .finish()
    }
}

impl<S> Plugin<S> {
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    fn power_down(&mut self) -> Result<()> {
        match self.hardware.as_mut() {
            Some(hw) => {
                self.powered = false;
                log::info!("powering reader hardware down");
                hw.power_down()
            }
            None => Ok(()),
        }
    }
}

impl Plugin<Uninitialized> {
    pub fn new(hardware: Box<dyn HardwarePlatform>, config: PluginConfig) -> Self {
        Self {
            hardware: Some(hardware),
            config,
            registry: ReaderRegistry::default(),
            firmware: None,
            powered: false,
            _state: PhantomData,
        }
    }

    /// Power up and acquire the reader. On any failure, including a missed
    /// deadline, the hardware is powered down and treated as not ready.
    pub async fn initialize(mut self) -> Result<Plugin<Initialized>> {
        match self.bring_up().await {
            Ok(()) => Ok(Plugin {
                hardware: self.hardware.take(),
                config: self.config.clone(),
                registry: std::mem::take(&mut self.registry),
                firmware: self.firmware.take(),
                powered: std::mem::replace(&mut self.powered, false),
                _state: PhantomData,
            }),
            Err(e) => {
                log::warn!("plugin initialization failed: {}", e);
                if let Err(down) = self.power_down() {
                    log::warn!("power down after failed init: {}", down);
                }
                Err(e)
            }
        }
    }

    async fn bring_up(&mut self) -> Result<()> {
        let power_up_limit = ms(self.config.power_up_timeout_ms);
        let reader_limit = ms(self.config.reader_init_timeout_ms);
        let hw = self
            .hardware
            .as_mut()
            .ok_or_else(|| Error::Configuration("hardware handle already released".into()))?;

        with_deadline("power up", power_up_limit, hw.power_up()).await?;
        self.powered = true;
        let transport = with_deadline("reader acquisition", reader_limit, hw.open_reader()).await?;
        self.firmware = match hw.firmware_version().await {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("firmware version unavailable: {}", e);
                None
            }
        };
        self.registry = ReaderRegistry::build(&self.config, share(transport));
        log::info!("plugin ready with readers {:?}", self.registry.names());
        Ok(())
    }
}

impl Plugin<Initialized> {
    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    pub fn reader(&self, name: &str) -> Result<&Reader> {
        self.registry.get(name)
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    /// Observable reader for `name`, polling at the configured interval and
    /// in the configured polling mode.
    pub fn observable_reader(&self, name: &str) -> Result<ObservableReader> {
        let reader = self.registry.get(name)?.clone();
        let mut observable = ObservableReader::new(reader, self.config.polling_interval_duration());
        observable.set_polling_mode(self.config.polling_mode);
        Ok(observable)
    }

    /// Gateway to the SAM sitting in `slot`.
    pub fn sam_gateway(&self, slot: SamSlot, module: Box<dyn SecurityModule>) -> Result<SamGateway> {
        let reader = self.registry.contact(slot)?;
        Ok(SamGateway::with_reader(module, reader.channel().clone()))
    }

    /// Card session on the contactless reader.
    pub fn card_session(&self, config: SessionConfig) -> Result<CardSession> {
        let reader = self.registry.contactless()?;
        Ok(CardSession::new(reader.channel().clone(), config))
    }

    /// Release the hardware now instead of on drop.
    pub fn shutdown(mut self) -> Result<()> {
        self.power_down()
    }
}

impl<S> Drop for Plugin<S> {
    fn drop(&mut self) {
        if self.powered {
            if let Err(e) = self.power_down() {
                log::warn!("power down on drop failed: {}", e);
            }
        }
    }
}
