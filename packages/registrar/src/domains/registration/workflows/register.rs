//! Registration workflow
//!
//! Drives one submission from intake to a terminal outcome:
//! 1. Fetch the guild member
//! 2. Classify against existing registrations
//! 3. Grant the verified role (or report, or stop as already verified)
//! 4. Welcome (best-effort)
//! 5. Persist (fresh registrations only)
//!
//! Steps run strictly in sequence. The machine decides, the effect executes.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RegistrationConfig;
use crate::domains::registration::commands::RegistrationCommand;
use crate::domains::registration::effects::RegistrationEffect;
use crate::domains::registration::events::RegistrationEvent;
use crate::domains::registration::machines::RegistrationMachine;
use crate::domains::registration::models::RegistrationRecord;
use crate::domains::registration::outcome::WorkflowOutcome;
use crate::kernel::ServerDeps;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("registration stalled in state `{state}` after `{last_event}`")]
    Stalled {
        state: &'static str,
        last_event: String,
    },
}

/// Terminal outcome plus the commands that were executed to reach it
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub outcome: WorkflowOutcome,
    pub executed: Vec<RegistrationCommand>,
}

impl WorkflowReport {
    /// Names of executed commands, in order
    pub fn executed_names(&self) -> Vec<&'static str> {
        self.executed.iter().map(RegistrationCommand::name).collect()
    }
}

#[derive(Clone)]
pub struct RegistrationWorkflow {
    deps: Arc<ServerDeps>,
    config: RegistrationConfig,
}

impl RegistrationWorkflow {
    pub fn new(deps: Arc<ServerDeps>, config: RegistrationConfig) -> Self {
        Self { deps, config }
    }

    pub async fn run(&self, record: RegistrationRecord) -> Result<WorkflowReport, WorkflowError> {
        info!(
            discord_id = %record.discord_id,
            student_code = %record.student_code,
            base = record.base,
            "Starting registration workflow"
        );

        let mut machine = RegistrationMachine::new(self.config.clone());
        let effect = RegistrationEffect::new(&self.deps);
        let mut executed = Vec::new();

        let mut event = RegistrationEvent::Submitted { record };
        while let Some(command) = machine.decide(&event) {
            debug!(
                state = machine.state().name(),
                command = command.name(),
                "Executing registration command"
            );
            executed.push(command.clone());
            event = effect.execute(command).await;
        }

        let Some(outcome) = machine.outcome().cloned() else {
            warn!(
                state = machine.state().name(),
                event = ?event,
                "Registration machine stopped without an outcome"
            );
            return Err(WorkflowError::Stalled {
                state: machine.state().name(),
                last_event: format!("{:?}", event),
            });
        };

        if outcome.requires_reconciliation() {
            warn!(
                outcome = outcome.kind(),
                "Registration ended verified-but-unpersisted; manual reconciliation required"
            );
        } else {
            info!(outcome = outcome.kind(), "Registration workflow finished");
        }

        Ok(WorkflowReport { outcome, executed })
    }
}
