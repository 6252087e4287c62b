pub mod audio;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod stitch;

pub use audio::{
    AudioFile, AudioFrame, CaptureSource, QualityConfig, SegmentEncoder, SegmentHandle,
    SyntheticSource, WavSegmentEncoder,
};
pub use catalogue::{Catalogue, JsonCatalogue, MemoryCatalogue, RecordingEntry};
pub use config::Config;
pub use error::{CloseError, ErrorCode, FocusError, PrepareError, SessionError, StitchError};
pub use playback::{
    FocusArbiter, FocusChange, FocusProvider, FocusState, LocalFocus, OutputRoute, Playback,
    PlaybackController, PlaybackEvent, Player, PlayerState,
};
pub use session::{
    Clock, Command, FinalizedRecording, ManualClock, MonotonicClock, Notification,
    RecordingMachine, Segment, SessionConfig, SessionHandle, SessionService, SessionState,
    SessionStats, StorageLayout, TimingAccumulator, TimingEvent, Transition,
};
pub use stitch::{stitch, StitchReport};
