pub mod boundary;
pub mod command;
pub mod events;
pub mod legend;
pub mod rejection;
pub mod types;

pub use boundary::{Capture, Storage, StorageError};
pub use command::Command;
pub use events::{EventSink, FanoutSink, NullSink, RegistryEvent};
pub use legend::{Legend, LEGENDS};
pub use rejection::Rejection;
pub use types::{
    AccountName, AttributedScore, Color, FinalizedResult, ParsePlayerError, Player,
    RawObservation, Score,
};
