// HTTP routes
pub mod health;
pub mod registrations;

pub use health::*;
pub use registrations::*;
