// cardsession/src/plugin/hardware.rs

use async_trait::async_trait;

use crate::Result;
use crate::transport::Transport;

/// Vendor hardware behind the plugin: powers the reader module and hands
/// out the transport every reader of the plugin shares.
#[async_trait]
pub trait HardwarePlatform: Send {
    /// Resolves once the module reports it is powered.
    async fn power_up(&mut self) -> Result<()>;

    /// Resolves with the reader transport once the SDK provides it.
    async fn open_reader(&mut self) -> Result<Box<dyn Transport>>;

    async fn firmware_version(&mut self) -> Result<String>;

    /// Synchronous so it can run from `Drop`.
    fn power_down(&mut self) -> Result<()>;
}
