//! Rendering of Claude's `stream-json` output as a live transcript
//!
//! Bytes flow through the pipeline in one direction:
//!
//! ```text
//! chunks -> LineDecoder -> decode_line -> TranscriptRenderer -> OutputSink
//!                                              |                    |
//!                                  ToolCorrelationTable    StreamHealthMonitor
//! ```
//!
//! [`StreamParser`] owns one instance of each stage for a single upstream
//! stream. [`TranscriptSession`] adds the flush and health timers, and
//! [`StreamingCommandRunner`] / [`LogFollower`] connect it to a process.

pub mod correlation;
pub mod decoder;
pub mod events;
pub mod follow;
pub mod health;
pub mod parser;
pub mod renderer;
pub mod runner;
pub mod session;
pub mod sink;
pub mod types;


pub use correlation::{PendingTool, ToolCorrelationTable};
pub use decoder::{decode_line, DecodedLine, LineDecoder, MalformedLine};
pub use events::{ContentItem, ItemError, StreamEvent, ToolResultItem};
pub use follow::{FeedProgress, FollowEvent, FollowSource, LogFollower};
pub use health::{FeedSupervisor, HealthStatus, StreamHealthMonitor};
pub use parser::StreamParser;
pub use renderer::{Palette, RenderState, ToolSummaryRegistry, TranscriptRenderer};
pub use runner::StreamingCommandRunner;
pub use session::TranscriptSession;
pub use sink::{ConsoleWriter, FileWriter, LineWriter, OutputSink, SinkActivity, StderrWriter};
pub use types::{OutputDestination, ParserConfig, ParserStatistics, StreamSource, StreamingOutput};
