pub mod capture;
pub mod console;
pub mod errors;
pub mod events;
pub mod queue;
pub mod scraper;
pub mod scraper_handle;
pub mod server;
pub mod storage;
pub mod tick_loop;
pub mod types;

pub use capture::{Screen, ScriptStep, ScriptedCapture};
pub use console::{parse_command, parse_line, ControlCommand};
pub use errors::{ConfigError, ParseCommandError, ScriptError};
pub use events::{BufferedSink, EventBuffer, LogSink};
pub use queue::MutationQueue;
pub use scraper::{Finalization, Scraper, TickReport};
pub use scraper_handle::{ControlGuard, ScraperHandle};
pub use server::ScoreServer;
pub use storage::{JsonFileStorage, MemoryStorage, StorageDocument};
pub use types::{EventCursor, MatchKind, RegistrySnapshot, ScraperConfig, ScraperState, ServerEvent};
