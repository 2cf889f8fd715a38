//! # ZipShip Domain Layer
//!
//! This crate contains the orchestration logic for ZipShip, an HTTP-triggered
//! deployment helper: upload a ZIP archive, extract it into a target directory,
//! optionally run a shell command there, and report every step as a line-based
//! event stream.
//!
//! - **Entities**: Validated requests and step results (UploadRequest, ExtractReport)
//! - **Ports**: Trait definitions for side effects (ArchiveExtractor, CommandRunner)
//! - **Stream**: The event model and the flush-per-line emitter
//! - **Services**: The save → extract → run pipeline
//!
//! ## Architecture
//!
//! This layer has NO dependencies on HTTP or archive formats. Extraction and
//! process spawning are expressed as traits (ports) implemented by adapter
//! crates; the HTTP response is reached only through the `Flushable` capability.
//!
//! ## Example
//!
//! ```rust
//! use zipship_domain::deploy::{DeployService, EndpointProfile, UploadRequest};
//! use zipship_domain::ports::{ArchiveExtractor, CommandRunner};
//! use zipship_domain::stream::EventLog;
//!
//! async fn example<E: ArchiveExtractor, R: CommandRunner>(service: DeployService<E, R>) {
//!     let profile = EndpointProfile::run_script(1024, "./tmp".into());
//!     let request = UploadRequest::<tokio::io::Empty>::script_only("./tmp".into(), "ls");
//!     let log = EventLog::new();
//!     let _ = service.execute(&profile, request, &log).await;
//!     print!("{}", log.render());
//! }
//! ```

pub mod deploy;
pub mod ports;
pub mod stream;

// Re-export commonly used types
pub use deploy::{DeployError, DeployService, EndpointProfile, RequestId, UploadRequest};
pub use ports::{ArchiveExtractor, CommandRunner};
pub use stream::{EventSink, Flushable, StreamEmitter, StreamEvent};
