/// Port messages exchanged with the UI
///
/// Every message is a `{"port": <name>, "data": <payload>}` envelope.
/// Inbound ports carry `Request`s, outbound ports carry `Response`s.

use crate::core::{Credential, Record, RecordFields};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message sent by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "port", content = "data")]
pub enum Request {
    #[serde(rename = "submitLoginInfo")]
    Login(Credential),

    #[serde(rename = "addRecord")]
    AddRecord(RecordFields),

    #[serde(rename = "deleteRecord")]
    DeleteRecord { id: String },

    #[serde(rename = "getRecord")]
    GetRecord { id: String },

    #[serde(rename = "updateRecord")]
    UpdateRecord(Record),

    #[serde(rename = "listRecords")]
    ListRecords,

    #[serde(rename = "showMessage")]
    ShowMessage { text: String },
}

impl Request {
    /// Inbound port name, for logging
    pub fn port(&self) -> &'static str {
        match self {
            Request::Login(_) => "submitLoginInfo",
            Request::AddRecord(_) => "addRecord",
            Request::DeleteRecord { .. } => "deleteRecord",
            Request::GetRecord { .. } => "getRecord",
            Request::UpdateRecord(_) => "updateRecord",
            Request::ListRecords => "listRecords",
            Request::ShowMessage { .. } => "showMessage",
        }
    }
}

/// Payload of the login result port
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    #[serde(rename = "userId")]
    pub identifier: String,

    #[serde(rename = "password")]
    pub secret: String,

    #[serde(rename = "isLoggedIn")]
    pub logged_in: bool,
}

impl LoginResult {
    /// Echo the submitted credential back as a successful login
    pub fn accepted(credential: Credential) -> Self {
        Self {
            identifier: credential.identifier,
            secret: credential.secret,
            logged_in: true,
        }
    }

    /// Fixed failure payload: empty strings, not logged in
    pub fn rejected() -> Self {
        Self {
            identifier: String::new(),
            secret: String::new(),
            logged_in: false,
        }
    }
}

impl fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResult")
            .field("identifier", &self.identifier)
            .field("secret", &if self.secret.is_empty() { "" } else { "***" })
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

/// Message sent to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "port", content = "data")]
pub enum Response {
    #[serde(rename = "getLoginResult")]
    LoginResult(LoginResult),

    #[serde(rename = "addRecordResult")]
    AddRecordResult(bool),

    #[serde(rename = "deleteRecordResult")]
    DeleteRecordResult(bool),

    #[serde(rename = "getRecordResult")]
    GetRecordResult(Record),

    #[serde(rename = "updateRecordResult")]
    UpdateRecordResult(bool),

    #[serde(rename = "listRecordsResult")]
    ListRecordsResult(Vec<Record>),
}

impl Response {
    /// Outbound port name, for logging
    pub fn port(&self) -> &'static str {
        match self {
            Response::LoginResult(_) => "getLoginResult",
            Response::AddRecordResult(_) => "addRecordResult",
            Response::DeleteRecordResult(_) => "deleteRecordResult",
            Response::GetRecordResult(_) => "getRecordResult",
            Response::UpdateRecordResult(_) => "updateRecordResult",
            Response::ListRecordsResult(_) => "listRecordsResult",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_login_request() {
        let request: Request = serde_json::from_value(json!({
            "port": "submitLoginInfo",
            "data": {"userId": "ann@example.com", "password": "pw"}
        }))
        .unwrap();

        assert_eq!(request, Request::Login(Credential::new("ann@example.com", "pw")));
        assert_eq!(request.port(), "submitLoginInfo");
    }

    #[test]
    fn test_decode_record_requests() {
        let add: Request = serde_json::from_value(json!({
            "port": "addRecord",
            "data": {"title": "A", "description": "B"}
        }))
        .unwrap();
        assert_eq!(add, Request::AddRecord(RecordFields::new("A", "B")));

        let update: Request = serde_json::from_value(json!({
            "port": "updateRecord",
            "data": {"id": "r1", "title": "A", "description": "B"}
        }))
        .unwrap();
        assert_eq!(update, Request::UpdateRecord(Record::new("r1", RecordFields::new("A", "B"))));

        let delete: Request =
            serde_json::from_value(json!({"port": "deleteRecord", "data": {"id": "r1"}})).unwrap();
        assert_eq!(delete, Request::DeleteRecord { id: "r1".to_string() });
    }

    #[test]
    fn test_decode_list_without_data() {
        let request: Request = serde_json::from_value(json!({"port": "listRecords"})).unwrap();
        assert_eq!(request, Request::ListRecords);
    }

    #[test]
    fn test_decode_unknown_port_fails() {
        let result = serde_json::from_value::<Request>(json!({"port": "dropTables", "data": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_login_results() {
        let ok = Response::LoginResult(LoginResult::accepted(Credential::new("ann", "pw")));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "port": "getLoginResult",
                "data": {"userId": "ann", "password": "pw", "isLoggedIn": true}
            })
        );

        let failed = Response::LoginResult(LoginResult::rejected());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "port": "getLoginResult",
                "data": {"userId": "", "password": "", "isLoggedIn": false}
            })
        );
    }

    #[test]
    fn test_encode_boolean_and_list_results() {
        assert_eq!(
            serde_json::to_value(Response::AddRecordResult(true)).unwrap(),
            json!({"port": "addRecordResult", "data": true})
        );
        assert_eq!(
            serde_json::to_value(Response::ListRecordsResult(vec![])).unwrap(),
            json!({"port": "listRecordsResult", "data": []})
        );
    }

    #[test]
    fn test_login_result_debug_masks_secret() {
        let debug = format!("{:?}", LoginResult::accepted(Credential::new("ann", "hunter2")));
        assert!(!debug.contains("hunter2"));
    }
}
