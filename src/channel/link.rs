use async_trait::async_trait;
use tracing::info;

use super::fake_backend::{FakeChannel, FakeTunerState};
use super::serial_backend::{SerialChannel, SerialConfig};
use crate::error::ChannelError;

/// Byte-duplex link to the tuner.
///
/// Implementations own the physical connection; read timeouts are their
/// responsibility.
#[async_trait]
pub trait TunerChannel: Send {
    /// Writes all bytes of one frame.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Reads one byte.
    async fn read_byte(&mut self) -> Result<u8, ChannelError>;

    /// Reads exactly `len` bytes.
    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ChannelError> {
        let mut block = Vec::with_capacity(len);
        for _ in 0..len {
            block.push(self.read_byte().await?);
        }
        Ok(block)
    }

    /// Drops any input buffered but not yet read.
    async fn discard_input(&mut self) -> Result<(), ChannelError>;
}

#[async_trait]
impl<C> TunerChannel for Box<C>
where
    C: TunerChannel + ?Sized,
{
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        (**self).write_all(bytes).await
    }

    async fn read_byte(&mut self) -> Result<u8, ChannelError> {
        (**self).read_byte().await
    }

    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ChannelError> {
        (**self).read_exact(len).await
    }

    async fn discard_input(&mut self) -> Result<(), ChannelError> {
        (**self).discard_input().await
    }
}

/// Runtime channel backend selection.
#[derive(Debug, Clone)]
pub enum ChannelBackend {
    /// A real serial port.
    Serial(SerialConfig),
    /// The in-memory simulated tuner.
    Fake(FakeTunerState),
}

/// Opens the channel for the selected backend.
///
/// # Errors
///
/// Returns an error if the serial port cannot be opened.
pub async fn open_channel(backend: ChannelBackend) -> Result<Box<dyn TunerChannel>, ChannelError> {
    let channel: Box<dyn TunerChannel> = match backend {
        ChannelBackend::Serial(config) => Box::new(SerialChannel::open(&config)?),
        ChannelBackend::Fake(state) => {
            info!("using simulated tuner backend");
            let (channel, _probe) = FakeChannel::new(state);
            Box::new(channel)
        }
    };

    Ok(channel)
}
