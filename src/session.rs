//! The encode-drain loop.
//!
//! An [`EncodeSession`] owns one opened encoder and one reusable [`Packet`].
//! Each [`EncodeSession::submit_and_drain`] call pushes a frame (or the end of
//! stream) and then pulls packets into the sink until the encoder asks for more
//! input or reports that it is fully flushed.

use crate::encoder::{Encoder, EncoderError, ReceiveStatus};
use crate::error::{DriverError, Result};
use crate::packet::Packet;
use crate::sink::{self, Sink};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting the next submission.
    Ready,
    /// Pulling queued output.
    Draining,
    /// End of stream submitted and every packet written.
    Flushed,
    /// End of stream submitted, but the encoder stopped with no more output
    /// ready instead of reporting itself flushed.
    EndOfStream,
    /// Encoder released, either explicitly or after a fatal error.
    Closed,
}

/// Result of one submit-and-drain step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Packets written during this step.
    pub packets: usize,
    /// Bytes written during this step.
    pub bytes: usize,
    /// Why draining stopped: `NeedsInput` or `Flushed`.
    pub status: ReceiveStatus,
}

/// One encode session over an opened encoder.
pub struct EncodeSession<E: Encoder> {
    encoder: E,
    config: E::Config,
    packet: Packet,
    state: SessionState,
    end_of_stream: bool,
    frames: u64,
    packets: u64,
    bytes: u64,
}

impl<E: Encoder> EncodeSession<E> {
    /// Open `encoder` with `config`.
    ///
    /// The encoder may fill in fields it decides itself; the resulting
    /// configuration is frozen for the lifetime of the session.
    pub fn open(mut encoder: E, mut config: E::Config) -> Result<Self> {
        encoder.open(&mut config).map_err(DriverError::OpenFailed)?;
        log::debug!("Opened encoder {}", encoder.name());
        Ok(Self {
            encoder,
            config,
            packet: Packet::new(),
            state: SessionState::Ready,
            end_of_stream: false,
            frames: 0,
            packets: 0,
            bytes: 0,
        })
    }

    pub fn config(&self) -> &E::Config {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames submitted so far, excluding the end-of-stream marker.
    pub fn frames_submitted(&self) -> u64 {
        self.frames
    }

    pub fn packets_written(&self) -> u64 {
        self.packets
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// True once end of stream has been submitted and drained.
    pub fn is_flushed(&self) -> bool {
        matches!(self.state, SessionState::Flushed | SessionState::EndOfStream)
    }

    /// Submit `frame`, or end of stream when `None`, then drain ready packets
    /// into `sink`.
    ///
    /// Returns once the encoder needs more input or has been fully flushed.
    /// After end of stream, running out of output without a flushed report
    /// still ends the stream. Any error closes the session.
    pub fn submit_and_drain<S: Sink + ?Sized>(
        &mut self,
        frame: Option<&E::Frame>,
        sink: &mut S,
    ) -> Result<DrainOutcome> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Flushed | SessionState::EndOfStream => {
                return Err(DriverError::AlreadyFlushed)
            }
            SessionState::Draining | SessionState::Closed => return Err(DriverError::NotOpen),
        }
        if self.end_of_stream {
            return Err(DriverError::AlreadyFlushed);
        }

        if let Err(e) = self.encoder.send_frame(frame) {
            return Err(self.fail(DriverError::EncodeSubmitFailed(e)));
        }
        match frame {
            Some(_) => self.frames += 1,
            None => {
                log::debug!("Flushing {} after {} frames", self.encoder.name(), self.frames);
                self.end_of_stream = true;
            }
        }

        self.state = SessionState::Draining;
        match self.drain(sink) {
            Ok(outcome) => {
                self.state = match outcome.status {
                    ReceiveStatus::Flushed => SessionState::Flushed,
                    _ if self.end_of_stream => {
                        log::debug!(
                            "{} has no output ready after end of stream",
                            self.encoder.name()
                        );
                        SessionState::EndOfStream
                    }
                    _ => SessionState::Ready,
                };
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn drain<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<DrainOutcome> {
        let mut outcome = DrainOutcome {
            packets: 0,
            bytes: 0,
            status: ReceiveStatus::NeedsInput,
        };
        loop {
            let status = self
                .encoder
                .receive_packet(&mut self.packet)
                .map_err(DriverError::EncodeReceiveFailed)?;
            match status {
                ReceiveStatus::Ready => {
                    let size = self.packet.size();
                    sink::write_all(sink, self.packet.data())?;
                    self.packet.reset();
                    outcome.packets += 1;
                    outcome.bytes += size;
                    self.packets += 1;
                    self.bytes += size as u64;
                }
                ReceiveStatus::Flushed if !self.end_of_stream => {
                    return Err(DriverError::EncodeReceiveFailed(EncoderError::Other(
                        "encoder reported flushed before end of stream".into(),
                    )));
                }
                status => {
                    outcome.status = status;
                    return Ok(outcome);
                }
            }
        }
    }

    fn fail(&mut self, err: DriverError) -> DriverError {
        log::debug!("Closing {} after error: {}", self.encoder.name(), err);
        self.packet.reset();
        self.close_encoder();
        err
    }

    fn close_encoder(&mut self) {
        if self.state != SessionState::Closed {
            self.encoder.close();
            self.state = SessionState::Closed;
        }
    }

    /// Close the encoder now instead of on drop.
    pub fn close(mut self) {
        self.close_encoder();
    }
}

impl<E: Encoder> Drop for EncodeSession<E> {
    fn drop(&mut self) {
        self.close_encoder();
    }
}
