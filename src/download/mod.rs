//! Download-and-relay: extractor, staging, thumbnails, captions and delivery

pub mod caption;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod send;
pub mod service;
pub mod source;
pub mod staging;
pub mod thumbnail;

pub use error::{CleanupWarning, RelayError, SourceStage};
pub use pipeline::{Delivery, MediaArtifact, PipelineSettings, RelayPipeline};
pub use progress::{RelayStatus, StatusMessage};
pub use request::{validate_source_url, RelayRequest};
pub use send::{ArchiveOutcome, DeliveryReport};
pub use service::{ActiveRequests, RelayService};
pub use source::{FormatPreference, MediaExtractor, MediaInfo};
pub use staging::StagingArea;
pub use thumbnail::ThumbnailFetcher;
