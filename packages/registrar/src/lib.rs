// Registrar - identity reconciliation for community registrations
//
// Classifies each submitted registration against the records that share an
// identifying field, then grants access, welcomes, persists or reports to
// moderators. Decisions are made by a pure machine; effects run the IO.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
