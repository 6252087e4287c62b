pub mod backend;
pub mod encoder;
pub mod file;

pub use backend::{AudioFrame, CaptureSource, SyntheticSource};
pub use encoder::{QualityConfig, SegmentEncoder, SegmentHandle, WavSegmentEncoder};
pub use file::AudioFile;
