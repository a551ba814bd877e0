//! Compressed packet buffer rented to the encoder by the drain loop.
//!
//! The session owns a single `Packet`. The encoder fills it, the loop writes
//! it to the sink and then calls [`Packet::reset`], which drops any reference
//! into frame memory while keeping the owned allocation for the next packet.

use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Packet {
    owned: Vec<u8>,
    shared: Option<Arc<Vec<u8>>>,
    pts: Option<i64>,
    dts: Option<i64>,
    key: bool,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        match &self.shared {
            Some(buf) => buf.as_slice(),
            None => &self.owned,
        }
    }

    pub fn size(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Owned payload buffer for encoders that produce fresh bytes.
    ///
    /// Drops a previously attached shared buffer.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        self.shared = None;
        &mut self.owned
    }

    /// Reference an existing buffer instead of copying it.
    pub fn set_shared(&mut self, buf: Arc<Vec<u8>>) {
        self.owned.clear();
        self.shared = Some(buf);
    }

    /// True when the payload references memory owned by someone else.
    pub fn is_shared(&self) -> bool {
        self.shared.is_some()
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    pub fn dts(&self) -> Option<i64> {
        self.dts
    }

    pub fn set_dts(&mut self, dts: Option<i64>) {
        self.dts = dts;
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn set_key(&mut self, key: bool) {
        self.key = key;
    }

    /// Release references and clear metadata, keeping the owned capacity.
    pub fn reset(&mut self) {
        self.owned.clear();
        self.shared = None;
        self.pts = None;
        self.dts = None;
        self.key = false;
    }
}
