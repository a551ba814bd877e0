//! Frame producers feed the drain loop one frame per iteration.

use crate::error::Result;

/// Fills a reused frame for a given index.
///
/// Implementations must obtain exclusive access to the frame memory before
/// writing, stamp the presentation timestamp with `index`, and produce
/// identical content for identical indices.
pub trait FrameProducer {
    type Frame;

    fn produce(&mut self, frame: &mut Self::Frame, index: u64) -> Result<()>;
}
