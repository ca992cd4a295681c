use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::common::Signal;
use crate::domains::registration::effects::dispatch_acknowledgment;
use crate::domains::registration::feedback::{
    acknowledgment_for, acknowledgment_for_failure, acknowledgment_for_intake,
};
use crate::domains::registration::intake::{parse_registration, InboundMessage};
use crate::domains::registration::outcome::TerminalState;
use crate::server::app::AppState;

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TerminalState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_reconciliation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationResponse {
    fn ignored() -> Self {
        Self {
            status: "ignored",
            outcome: None,
            state: None,
            signal: None,
            requires_reconciliation: false,
            error: None,
        }
    }
}

/// Relayed webhook message from the registration channel
///
/// Messages that are not marked registrations are ignored. Everything else
/// ends with exactly one acknowledgment on the source message.
pub async fn registration_webhook_handler(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> (StatusCode, Json<RegistrationResponse>) {
    if !message.is_registration(&state.registration_marker) {
        return (StatusCode::ACCEPTED, Json(RegistrationResponse::ignored()));
    }

    let source = message.source();

    let record = match parse_registration(&message) {
        Ok(record) => record,
        Err(e) => {
            warn!(message_id = %source.message_id, error = %e, "Rejected malformed registration");
            let ack = acknowledgment_for_intake(&e);
            let signal = ack.signal;
            dispatch_acknowledgment(&state.deps, &source, ack).await;
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(RegistrationResponse {
                    status: "rejected",
                    outcome: None,
                    state: None,
                    signal: Some(signal),
                    requires_reconciliation: false,
                    error: Some(e.to_string()),
                }),
            );
        }
    };

    match state.workflow.run(record).await {
        Ok(report) => {
            let ack = acknowledgment_for(&report.outcome);
            let signal = ack.signal;
            info!(
                message_id = %source.message_id,
                outcome = report.outcome.kind(),
                steps = ?report.executed_names(),
                "Registration processed"
            );
            dispatch_acknowledgment(&state.deps, &source, ack).await;

            (
                StatusCode::OK,
                Json(RegistrationResponse {
                    status: "processed",
                    outcome: Some(report.outcome.kind()),
                    state: Some(report.outcome.terminal_state()),
                    signal: Some(signal),
                    requires_reconciliation: report.outcome.requires_reconciliation(),
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!(message_id = %source.message_id, error = %e, "Registration workflow failed");
            let ack = acknowledgment_for_failure(&e);
            let signal = ack.signal;
            dispatch_acknowledgment(&state.deps, &source, ack).await;

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegistrationResponse {
                    status: "failed",
                    outcome: None,
                    state: None,
                    signal: Some(signal),
                    requires_reconciliation: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
