//! Mock implementations of the pipeline's seams
//!
//! Let the relay pipeline and handlers run without yt-dlp or Telegram.

pub mod mock_extractor;
pub mod recording_transport;

#[allow(unused_imports)]
pub use mock_extractor::{FetchBehavior, MockExtractor};
#[allow(unused_imports)]
pub use recording_transport::{Call, RecordingTransport};
