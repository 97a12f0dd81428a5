//! Task envelope
//!
//! Every lifecycle task returns the same `{content, error, params}` shape so a
//! caller can tell success from a rejected request without knowing which task
//! ran: success has `error == null`, a rejection has `content == {}` and
//! `error` set to a short message.

use serde_json::{Map, Value};

use crate::errors::ProvisionerError;

pub use openapi_server::models::TaskEnvelope;

/// Fold an operation result into an envelope.
///
/// Only domain errors are absorbed; infrastructure faults are returned as
/// `Err` for the worker host to deal with.
pub fn wrap(result: Result<Map<String, Value>, ProvisionerError>) -> Result<TaskEnvelope, ProvisionerError> {
    match result {
        Ok(content) => Ok(TaskEnvelope {
            content,
            ..Default::default()
        }),
        Err(ProvisionerError::Domain(e)) => Ok(TaskEnvelope {
            error: Some(e.to_string()),
            ..Default::default()
        }),
        Err(e) => Err(e),
    }
}
