/// Request dispatch and outcome mapping
///
/// `dispatch` performs the one backend call a request maps to. The
/// `*_outcome` functions turn that call's result into the response the UI
/// gets. They never fail: every error collapses into the operation's fixed
/// failure payload, and is only distinguishable in the logs.

use crate::backend::Backend;
use crate::bridge::protocol::{LoginResult, Request, Response};
use crate::core::{Credential, Record, SessionChange, SessionUser};
use crate::error::{BridgeError, Result};
use tracing::{debug, info, warn};

/// Run one request against the backend
///
/// Returns the single response for the request. `showMessage` never
/// reaches the backend and has no response; the `Bridge` presents it.
pub async fn dispatch(request: Request, backend: &dyn Backend) -> Option<Response> {
    debug!("Dispatching {}", request.port());

    let response = match request {
        Request::Login(credential) => {
            let outcome = backend.authenticate(&credential).await;
            login_outcome(credential, outcome)
        }
        Request::AddRecord(fields) => add_outcome(backend.insert(&fields).await),
        Request::DeleteRecord { id } => delete_outcome(&id, backend.delete(&id).await),
        Request::GetRecord { id } => get_outcome(&id, backend.get(&id).await),
        Request::UpdateRecord(record) => {
            let outcome = backend.update(&record.id, &record.fields()).await;
            update_outcome(&record.id, outcome)
        }
        Request::ListRecords => list_outcome(backend.get_all().await),
        Request::ShowMessage { .. } => {
            debug!("showMessage has no backend call");
            return None;
        }
    };

    Some(response)
}

fn log_failure(port: &str, err: &BridgeError) {
    if err.is_not_found() {
        debug!("{} failed: {}", port, err);
    } else {
        warn!("{} failed: {}", port, err);
    }
}

/// Login echoes the credential on success, empty strings on failure
pub fn login_outcome(credential: Credential, outcome: Result<SessionUser>) -> Response {
    match outcome {
        Ok(user) => {
            info!("Login accepted for '{}'", user.identifier);
            Response::LoginResult(LoginResult::accepted(credential))
        }
        Err(e) => {
            log_failure("submitLoginInfo", &e);
            Response::LoginResult(LoginResult::rejected())
        }
    }
}

pub fn add_outcome(outcome: Result<Record>) -> Response {
    match outcome {
        Ok(record) => {
            debug!("Record {} added", record.id);
            Response::AddRecordResult(true)
        }
        Err(e) => {
            log_failure("addRecord", &e);
            Response::AddRecordResult(false)
        }
    }
}

pub fn delete_outcome(id: &str, outcome: Result<()>) -> Response {
    match outcome {
        Ok(()) => Response::DeleteRecordResult(true),
        Err(e) => {
            log_failure(&format!("deleteRecord({})", id), &e);
            Response::DeleteRecordResult(false)
        }
    }
}

/// Not-found and failure both answer with the empty record
pub fn get_outcome(id: &str, outcome: Result<Option<Record>>) -> Response {
    match outcome {
        Ok(Some(record)) => Response::GetRecordResult(record),
        Ok(None) => {
            debug!("getRecord({}): not found", id);
            Response::GetRecordResult(Record::empty())
        }
        Err(e) => {
            log_failure(&format!("getRecord({})", id), &e);
            Response::GetRecordResult(Record::empty())
        }
    }
}

pub fn update_outcome(id: &str, outcome: Result<()>) -> Response {
    match outcome {
        Ok(()) => Response::UpdateRecordResult(true),
        Err(e) => {
            log_failure(&format!("updateRecord({})", id), &e);
            Response::UpdateRecordResult(false)
        }
    }
}

/// A failed listing answers with an empty list
pub fn list_outcome(outcome: Result<Vec<Record>>) -> Response {
    match outcome {
        Ok(records) => Response::ListRecordsResult(records),
        Err(e) => {
            log_failure("listRecords", &e);
            Response::ListRecordsResult(Vec::new())
        }
    }
}

/// A session change with a user reads as a successful login
///
/// The secret is unknown here, so it is sent empty.
pub fn session_outcome(change: &SessionChange) -> Option<Response> {
    change.user.as_ref().map(|user| {
        Response::LoginResult(LoginResult {
            identifier: user.identifier.clone(),
            secret: String::new(),
            logged_in: true,
        })
    })
}
