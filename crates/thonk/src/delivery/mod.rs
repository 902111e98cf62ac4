//! Getting an answer back into a size-limited channel.
//!
//! - [`chunker`]: pure segmentation into ordered, size-bounded parts.
//! - [`framing`]: announcement, loading indicator, completion banner and
//!   question/answer framing around the parts.
//! - [`pacing`]: raw paced delivery with a pause between sends.

pub mod chunker;
pub mod framing;
pub mod pacing;

pub use chunker::{PROCESS_LIMIT, ResponseChunk, SEND_LIMIT, process_large, segments};
pub use framing::frame_answer;
pub use pacing::{SendReport, send_large};
