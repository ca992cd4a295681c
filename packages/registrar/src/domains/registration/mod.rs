//! Registration domain - identity reconciliation for new members
//!
//! Architecture (machine + effects):
//!   webhook → intake → RegistrationWorkflow → machine.decide() ⇄ effect.execute()
//!   → outcome → feedback → acknowledgments on the source message

pub mod classifier;
pub mod commands;
pub mod effects;
pub mod events;
pub mod feedback;
pub mod intake;
pub mod machines;
pub mod models;
pub mod outcome;
pub mod workflows;

// Re-export commonly used types
pub use classifier::{
    aggregate, classify, AggregateDecision, ConflictClassification, ConflictReport,
};
pub use feedback::{acknowledgment_for, Acknowledgment};
pub use intake::{parse_registration, InboundMessage, IntakeError};
pub use models::RegistrationRecord;
pub use outcome::{TerminalState, WorkflowOutcome};
pub use workflows::{RegistrationWorkflow, WorkflowError, WorkflowReport};
