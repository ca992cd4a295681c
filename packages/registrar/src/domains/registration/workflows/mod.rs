pub mod register;

pub use register::{RegistrationWorkflow, WorkflowError, WorkflowReport};
