pub mod registration;

pub use registration::RegistrationRecord;
