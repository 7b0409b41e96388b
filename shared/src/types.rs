use lambda_http::http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::store::StoreError;

// ========== USER ==========
/// User stored in DynamoDB, keyed by `email`.
///
/// Missing or `null` fields deserialize as empty strings, so a record decoded
/// from an absent item is all-empty rather than an error.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
}

pub type Users = Vec<User>;

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ========== ERRORS ==========
#[derive(Debug, Error)]
pub enum UserError {
    /// Client input was malformed or broke a business rule.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The storage primitive itself failed.
    #[error("internal db error")]
    InternalDb(#[source] StoreError),

    /// A local (de)serialization step failed.
    #[error("internal server error: {0}")]
    InternalServer(String),
}

impl UserError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UserError::InternalDb(_) | UserError::InternalServer(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for UserError {
    fn from(error: StoreError) -> Self {
        UserError::InternalDb(error)
    }
}

/// Body returned to the caller when an operation fails.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&UserError> for ErrorBody {
    fn from(error: &UserError) -> Self {
        ErrorBody {
            error: error.to_string(),
        }
    }
}
