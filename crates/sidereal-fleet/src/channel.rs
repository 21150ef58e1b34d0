//! Remote channel to a worker node.
//!
//! Channels are owned by the transport layer. The lifecycle code only closes
//! them during teardown.

use async_trait::async_trait;

/// A live connection to a worker node.
#[async_trait]
pub trait RemoteChannel: Send + Sync + std::fmt::Debug {
    /// Close the channel.
    ///
    /// Closing an already closed channel must succeed.
    async fn close(&self) -> std::io::Result<()>;

    /// Returns true while the channel is usable.
    fn is_open(&self) -> bool;
}
