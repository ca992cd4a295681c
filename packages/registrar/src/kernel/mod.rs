//! Kernel module - collaborator traits, adapters and dependencies.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{DiscordAdapter, PostgresRecordStore, ServerDeps};
pub use test_dependencies::TestDependencies;
pub use traits::*;
