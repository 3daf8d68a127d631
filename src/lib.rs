//! # duplicity-wrapper
//!
//! Typed async interface to the `duplicity` backup tool.
//!
//! Requests are plain option structs, turned into an argument vector and an
//! environment without side effects, run as a subprocess with an optional
//! timeout, and the console output is parsed into result records.
//!
//! ```no_run
//! use duplicity_wrapper::{Duplicity, FullOptions};
//!
//! # async fn demo() -> duplicity_wrapper::Result<()> {
//! let duplicity = Duplicity::new(None).await?;
//! let opts = FullOptions::new("file:///mnt/backup", "/home/me", "documents")
//!     .with_passphrase("correct horse");
//! let results = duplicity.full(&opts).await?;
//! println!("{} files, {} errors", results.statistics.source_files, results.statistics.errors);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `timespan` - Signed millisecond spans and the compact `2W1D` grammar
//! - `options` - Per-command request types
//! - `args` - Pure translation of requests into argument vectors
//! - `subprocess` - Process runner with timeouts, events and a mock
//! - `parser` - Parsers for duplicity's console output
//! - `duplicity` - The command facade
//! - `config` - TOML configuration with environment overrides
pub mod args;
pub mod cli;
pub mod config;
pub mod duplicity;
pub mod error;
pub mod logging;
pub mod options;
pub mod parser;
pub mod results;
pub mod subprocess;
pub mod timespan;

pub use args::{BuildContext, CommandKind, Invocation};
pub use duplicity::{Duplicity, DuplicityBuilder, EnvSource, Operation};
pub use error::{DuplicityError, ErrorCode, Result};
pub use options::{
    CommonOptions, Cutoff, ExtraArgs, FullOptions, IncrOptions, ListCurrentFilesOptions,
    RemoveAllButNFullOptions, RemoveOlderThanOptions, Verbosity, VerifyOptions,
};
pub use results::{
    BackupResults, BackupStatistics, ConsoleOutput, FileEntry, ListCurrentFilesResults,
    RemoveAllButNFullResults, RemoveOlderThanResults, VerifyResults,
};
pub use subprocess::{CommandEvent, EventSink};
pub use timespan::{TimeSpan, TimeSpanError};
