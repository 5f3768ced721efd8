use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::{debug, info, instrument, trace};

use super::TunerChannel;
use crate::error::ChannelError;
use crate::utils::format_frame;

/// Serial device the tuner is usually attached to.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Baud rate of the tuner's RS-232 port.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Time to wait for a byte before giving up.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial link settings; framing is fixed at 8N1 without flow control.
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct SerialConfig {
    #[builder(into, default = DEFAULT_PORT.to_string())]
    port: String,
    #[builder(default = DEFAULT_BAUD_RATE)]
    baud_rate: u32,
    #[builder(default = DEFAULT_READ_TIMEOUT)]
    read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SerialConfig {
    /// Serial device path.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Baud rate.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Per-read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Tuner channel over a serial port.
pub struct SerialChannel {
    stream: SerialStream,
    port: String,
    read_timeout: Duration,
}

impl SerialChannel {
    /// Opens the configured serial port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened.
    #[instrument(skip(config), level = "debug", fields(port = %config.port, baud_rate = config.baud_rate))]
    pub fn open(config: &SerialConfig) -> Result<Self, ChannelError> {
        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|source| ChannelError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud_rate = config.baud_rate, "serial port opened");

        Ok(Self {
            stream,
            port: config.port.clone(),
            read_timeout: config.read_timeout,
        })
    }

    async fn read_into(&mut self, buffer: &mut [u8]) -> Result<(), ChannelError> {
        match timeout(self.read_timeout, self.stream.read_exact(buffer)).await {
            Err(_elapsed) => Err(ChannelError::Timeout {
                timeout: self.read_timeout,
            }),
            Ok(Err(source)) if source.kind() == io::ErrorKind::UnexpectedEof => {
                Err(ChannelError::Closed)
            }
            Ok(Err(source)) => Err(ChannelError::Read { source }),
            Ok(Ok(_read)) => Ok(()),
        }
    }
}

#[async_trait]
impl TunerChannel for SerialChannel {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        trace!(port = %self.port, frame = %format_frame(bytes), "writing frame");
        self.stream
            .write_all(bytes)
            .await
            .map_err(|source| ChannelError::Write { source })?;
        self.stream
            .flush()
            .await
            .map_err(|source| ChannelError::Write { source })
    }

    async fn read_byte(&mut self) -> Result<u8, ChannelError> {
        let mut buffer = [0u8; 1];
        self.read_into(&mut buffer).await?;
        Ok(buffer[0])
    }

    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ChannelError> {
        let mut block = vec![0u8; len];
        self.read_into(&mut block).await?;
        Ok(block)
    }

    async fn discard_input(&mut self) -> Result<(), ChannelError> {
        debug!(port = %self.port, "discarding buffered input");
        self.stream
            .clear(ClearBuffer::Input)
            .map_err(|source| ChannelError::Discard { source })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_matches_tuner_port_settings() {
        let config = SerialConfig::default();
        assert_eq!("/dev/ttyUSB0", config.port());
        assert_eq!(9600, config.baud_rate());
        assert_eq!(Duration::from_secs(1), config.read_timeout());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = SerialConfig::builder()
            .port("/dev/ttyS1")
            .read_timeout(Duration::from_millis(250))
            .build();
        assert_eq!("/dev/ttyS1", config.port());
        assert_eq!(DEFAULT_BAUD_RATE, config.baud_rate());
        assert_eq!(Duration::from_millis(250), config.read_timeout());
    }
}
