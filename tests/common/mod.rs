//! Scripted audio encoder shared by the integration tests.

#![allow(dead_code)]

use encode_driver::config::AudioEncoderConfig;
use encode_driver::encoder::{
    AudioCapabilities, AudioEncoder, Encoder, EncoderError, ReceiveStatus,
};
use encode_driver::format::{ChannelLayout, SampleFormat};
use encode_driver::frame::AudioFrame;
use encode_driver::packet::Packet;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Bytes of frame data copied into each packet after the 8-byte index.
pub const PAYLOAD_BYTES: usize = 8;

/// Audio encoder whose buffering and failures are set up by the test.
///
/// Every `frames_per_packet` submitted frames become one packet holding the
/// packet index followed by the first bytes of the last frame. A partial batch
/// is emitted on flush.
pub struct ScriptedEncoder {
    caps: AudioCapabilities,
    frame_size: usize,
    frames_per_packet: usize,
    fail_receive_at: Option<usize>,
    report_flushed: bool,
    pending: usize,
    last_payload: Vec<u8>,
    queue: VecDeque<Vec<u8>>,
    emitted: u64,
    receives: usize,
    end_of_stream: bool,
    open: bool,
    closes: Rc<Cell<usize>>,
}

impl ScriptedEncoder {
    pub fn new(caps: AudioCapabilities) -> Self {
        Self {
            caps,
            frame_size: 64,
            frames_per_packet: 1,
            fail_receive_at: None,
            report_flushed: true,
            pending: 0,
            last_payload: Vec::new(),
            queue: VecDeque::new(),
            emitted: 0,
            receives: 0,
            end_of_stream: false,
            open: false,
            closes: Rc::new(Cell::new(0)),
        }
    }

    /// S16 only, with the given rate list and no layout restriction.
    pub fn s16(rates: Option<Vec<u32>>) -> Self {
        Self::new(AudioCapabilities {
            sample_formats: vec![SampleFormat::S16],
            sample_rates: rates,
            channel_layouts: None,
        })
    }

    pub fn with_layouts(mut self, layouts: Vec<ChannelLayout>) -> Self {
        self.caps.channel_layouts = Some(layouts);
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn batching(mut self, frames_per_packet: usize) -> Self {
        self.frames_per_packet = frames_per_packet;
        self
    }

    /// Fail the `n`th `receive_packet` call, counting from zero.
    pub fn failing_receive_at(mut self, n: usize) -> Self {
        self.fail_receive_at = Some(n);
        self
    }

    /// After end of stream, answer `NeedsInput` instead of `Flushed` once the
    /// queue is empty.
    pub fn without_flushed_report(mut self) -> Self {
        self.report_flushed = false;
        self
    }

    /// Counter incremented by every `close` that releases resources.
    pub fn close_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.closes)
    }

    fn emit(&mut self) {
        let mut packet = self.emitted.to_le_bytes().to_vec();
        packet.extend_from_slice(&self.last_payload);
        self.queue.push_back(packet);
        self.emitted += 1;
        self.pending = 0;
    }
}

impl Encoder for ScriptedEncoder {
    type Frame = AudioFrame;
    type Config = AudioEncoderConfig;

    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&mut self, config: &mut AudioEncoderConfig) -> Result<(), EncoderError> {
        if !self.caps.supports_format(config.sample_format) {
            return Err(EncoderError::InvalidParameters(format!(
                "sample format {}",
                config.sample_format
            )));
        }
        if config.frame_size == 0 {
            config.frame_size = self.frame_size;
        }
        self.open = true;
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<(), EncoderError> {
        if !self.open {
            return Err(EncoderError::NotOpen);
        }
        if self.end_of_stream {
            return Err(EncoderError::EndOfStream);
        }
        match frame {
            Some(frame) => {
                let n = PAYLOAD_BYTES.min(frame.data().len());
                self.last_payload = frame.data()[..n].to_vec();
                self.pending += 1;
                if self.pending == self.frames_per_packet {
                    self.emit();
                }
            }
            None => {
                self.end_of_stream = true;
                if self.pending > 0 {
                    self.emit();
                }
            }
        }
        Ok(())
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        let call = self.receives;
        self.receives += 1;
        if self.fail_receive_at == Some(call) {
            return Err(EncoderError::Other("scripted receive failure".into()));
        }
        match self.queue.pop_front() {
            Some(bytes) => {
                packet.buffer_mut().extend_from_slice(&bytes);
                packet.set_key(true);
                Ok(ReceiveStatus::Ready)
            }
            None if self.end_of_stream && self.report_flushed => Ok(ReceiveStatus::Flushed),
            None => Ok(ReceiveStatus::NeedsInput),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.queue.clear();
            self.closes.set(self.closes.get() + 1);
        }
    }
}

impl AudioEncoder for ScriptedEncoder {
    fn sample_formats(&self) -> &[SampleFormat] {
        &self.caps.sample_formats
    }

    fn sample_rates(&self) -> Option<&[u32]> {
        self.caps.sample_rates.as_deref()
    }

    fn channel_layouts(&self) -> Option<&[ChannelLayout]> {
        self.caps.channel_layouts.as_deref()
    }
}

/// Packet index stored at the start of a scripted packet.
pub fn packet_index(packet: &[u8]) -> u64 {
    let mut index = [0u8; 8];
    index.copy_from_slice(&packet[..8]);
    u64::from_le_bytes(index)
}
