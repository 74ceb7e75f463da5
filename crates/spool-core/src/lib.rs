pub mod binary;
pub mod builder;
pub mod config;
pub mod error;
pub mod guard;
pub mod io;
pub mod manifest;
pub mod materialize;
pub mod repo;
pub mod resolve;

pub mod reporter;

pub use config::{Config, MarkerPolicy};
pub use error::{AssetError, BuildError, RepoError};
pub use repo::{RunOptions, RunSummary, build_repository};
pub use reporter::{NullReporter, Reporter};
