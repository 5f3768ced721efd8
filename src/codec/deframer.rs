use std::mem;

use tracing::{instrument, trace};

use crate::channel::TunerChannel;
use crate::error::ChannelError;
use crate::protocol::DELIMITER;
use crate::utils::format_frame;

/// One response block extracted from the link.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub struct ResponseFrame(Vec<u8>);

impl ResponseFrame {
    /// Response bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Outcome of feeding one byte to the deframer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeframeStep {
    /// More bytes are needed.
    Pending,
    /// The echo ended; `payload_len` response bytes follow.
    DelimiterSeen { payload_len: usize },
    /// A full response is available.
    Complete(ResponseFrame),
}

#[derive(Debug)]
enum DeframerState {
    AwaitingDelimiter { echo: Vec<u8> },
    AwaitingPayload { expected: usize, payload: Vec<u8> },
}

/// Splits the tuner's reply into echo and payload.
///
/// The tuner first echoes a block terminated by the delimiter, then sends a
/// payload block of the same length as the echo. The echo length is the only
/// length information on the link.
#[derive(Debug)]
pub struct ResponseDeframer {
    state: DeframerState,
}

impl Default for ResponseDeframer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDeframer {
    /// Creates a deframer waiting for the echo delimiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DeframerState::AwaitingDelimiter { echo: Vec::new() },
        }
    }

    /// Number of payload bytes still expected, or `None` while the echo is
    /// being read.
    #[must_use]
    pub fn payload_remaining(&self) -> Option<usize> {
        match &self.state {
            DeframerState::AwaitingDelimiter { .. } => None,
            DeframerState::AwaitingPayload { expected, payload } => {
                Some(expected - payload.len())
            }
        }
    }

    /// Feeds one byte.
    ///
    /// ```
    /// use nad_tuner::{DeframeStep, ResponseDeframer};
    ///
    /// let mut deframer = ResponseDeframer::new();
    /// assert_eq!(DeframeStep::Pending, deframer.push(7));
    /// assert_eq!(DeframeStep::DelimiterSeen { payload_len: 1 }, deframer.push(2));
    /// let DeframeStep::Complete(frame) = deframer.push(2) else {
    ///     panic!("one payload byte completes the frame");
    /// };
    /// assert_eq!(&[2], frame.bytes());
    /// ```
    pub fn push(&mut self, byte: u8) -> DeframeStep {
        match &mut self.state {
            DeframerState::AwaitingDelimiter { echo } => {
                if byte != DELIMITER {
                    echo.push(byte);
                    return DeframeStep::Pending;
                }
                let expected = echo.len();
                if expected == 0 {
                    return DeframeStep::Complete(ResponseFrame(Vec::new()));
                }
                self.state = DeframerState::AwaitingPayload {
                    expected,
                    payload: Vec::with_capacity(expected),
                };
                DeframeStep::DelimiterSeen {
                    payload_len: expected,
                }
            }
            DeframerState::AwaitingPayload { expected, payload } => {
                payload.push(byte);
                if payload.len() < *expected {
                    return DeframeStep::Pending;
                }
                let frame = ResponseFrame(mem::take(payload));
                self.state = DeframerState::AwaitingDelimiter { echo: Vec::new() };
                DeframeStep::Complete(frame)
            }
        }
    }

    /// Feeds a block of bytes, returning the step after the last one.
    pub fn extend(&mut self, bytes: &[u8]) -> DeframeStep {
        let mut step = DeframeStep::Pending;
        for byte in bytes {
            step = self.push(*byte);
        }
        step
    }

    /// Reads one response from `channel`.
    ///
    /// Buffered input is discarded as soon as the echo delimiter arrives;
    /// the payload is then read as one fixed-length block.
    ///
    /// # Errors
    ///
    /// Returns the channel's error if any read or the discard fails.
    #[instrument(skip_all, level = "trace")]
    pub async fn read_frame<C>(channel: &mut C) -> Result<ResponseFrame, ChannelError>
    where
        C: TunerChannel + ?Sized,
    {
        let mut deframer = Self::new();
        loop {
            let (step, reading_echo) = match deframer.payload_remaining() {
                None => (deframer.push(channel.read_byte().await?), true),
                Some(remaining) => {
                    let block = channel.read_exact(remaining).await?;
                    (deframer.extend(&block), false)
                }
            };

            match step {
                DeframeStep::Pending => {}
                DeframeStep::DelimiterSeen { payload_len } => {
                    trace!(payload_len, "echo delimiter received");
                    channel.discard_input().await?;
                }
                DeframeStep::Complete(frame) => {
                    // An empty echo ends the frame on the delimiter itself.
                    if reading_echo {
                        trace!("echo delimiter received with empty echo");
                        channel.discard_input().await?;
                    }
                    trace!(response = %format_frame(frame.bytes()), "response received");
                    return Ok(frame);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Channel that replays scripted bursts; a discard drops the rest of the
    /// current burst.
    #[derive(Debug, Default)]
    struct ScriptedChannel {
        current: VecDeque<u8>,
        bursts: VecDeque<Vec<u8>>,
        discards: usize,
    }

    impl ScriptedChannel {
        fn new(bursts: &[&[u8]]) -> Self {
            Self {
                bursts: bursts.iter().map(|burst| burst.to_vec()).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl TunerChannel for ScriptedChannel {
        async fn write_all(&mut self, _bytes: &[u8]) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn read_byte(&mut self) -> Result<u8, ChannelError> {
            if self.current.is_empty()
                && let Some(burst) = self.bursts.pop_front()
            {
                self.current = burst.into();
            }
            self.current.pop_front().ok_or(ChannelError::Closed)
        }

        async fn discard_input(&mut self) -> Result<(), ChannelError> {
            self.discards += 1;
            self.current.clear();
            Ok(())
        }
    }

    #[test]
    fn push_walks_through_both_phases() {
        let mut deframer = ResponseDeframer::new();
        assert_eq!(DeframeStep::Pending, deframer.extend(&[1, 20, 21]));
        assert_eq!(None, deframer.payload_remaining());
        assert_eq!(
            DeframeStep::DelimiterSeen { payload_len: 3 },
            deframer.push(2)
        );
        assert_eq!(Some(3), deframer.payload_remaining());
        assert_eq!(DeframeStep::Pending, deframer.push(9));
        assert_eq!(
            DeframeStep::Complete(ResponseFrame(vec![9, 2, 8])),
            deframer.extend(&[2, 8])
        );
        assert_eq!(None, deframer.payload_remaining());
    }

    #[test]
    fn leading_delimiter_yields_empty_frame() {
        let mut deframer = ResponseDeframer::new();
        assert_eq!(DeframeStep::Complete(ResponseFrame(Vec::new())), deframer.push(2));
    }

    #[tokio::test]
    async fn leading_delimiter_still_discards_buffered_input() {
        let mut channel = ScriptedChannel::new(&[&[2, 9, 9]]);

        let frame = ResponseDeframer::read_frame(&mut channel)
            .await
            .expect("a bare delimiter should deframe");

        assert!(frame.bytes().is_empty());
        assert_eq!(1, channel.discards);
        assert!(channel.current.is_empty());
    }

    #[tokio::test]
    async fn read_frame_discards_echo_tail_and_reads_payload_block() {
        let mut channel =
            ScriptedChannel::new(&[&[1, 20, 21, 94, 65, 2, 9, 9], &[1, 20, 21, 94, 65]]);

        let frame = ResponseDeframer::read_frame(&mut channel)
            .await
            .expect("scripted response should deframe");

        assert_eq!(&[1, 20, 21, 94, 65], frame.bytes());
        assert_eq!(1, channel.discards);
    }

    #[tokio::test]
    async fn read_frame_surfaces_channel_errors() {
        let mut channel = ScriptedChannel::new(&[&[1, 20, 21, 2], &[1, 20]]);

        let result = ResponseDeframer::read_frame(&mut channel).await;

        assert_matches!(result, Err(ChannelError::Closed));
    }
}
