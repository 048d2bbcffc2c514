use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CreditError, Result};
use crate::xml::Document;

const REQUEST_ERROR_PATH: &str = "DEAL_SETS/DEAL_SET/SERVICES/SERVICE/ERRORS/ERROR";
const SERVICE_STATUS_PATH: &str = "DEAL_SETS/DEAL_SET/DEALS/DEAL/SERVICES/SERVICE/STATUSES/STATUS";

/// Top-level status reported by the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    RequestError,
    ServiceError,
    New,
    Processing,
    Pending,
    Completed,
    Error,
}

impl StatusCode {
    pub const ALL: [StatusCode; 7] = [
        StatusCode::RequestError,
        StatusCode::ServiceError,
        StatusCode::New,
        StatusCode::Processing,
        StatusCode::Pending,
        StatusCode::Completed,
        StatusCode::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::RequestError => "REQUEST_ERROR",
            StatusCode::ServiceError => "SERVICE_ERROR",
            StatusCode::New => "NEW",
            StatusCode::Processing => "PROCESSING",
            StatusCode::Pending => "PENDING",
            StatusCode::Completed => "COMPLETED",
            StatusCode::Error => "ERROR",
        }
    }

    /// Whether polling stops at this status
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            StatusCode::New | StatusCode::Processing | StatusCode::Pending
        )
    }
}

impl FromStr for StatusCode {
    type Err = CreditError;

    fn from_str(code: &str) -> Result<Self> {
        let trimmed = code.trim();
        StatusCode::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CreditError::UnknownStatus {
                code: code.to_string(),
            })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status code plus whatever description accompanied it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub code: StatusCode,
    pub description: String,
}

impl Status {
    /// Read the status of a response rooted at `MESSAGE`.
    ///
    /// A request-level error container wins over any service status.
    pub fn extract(doc: &Document) -> Result<Self> {
        let root = doc.root();

        if let Some(error) = doc.find(root, REQUEST_ERROR_PATH) {
            let message = doc.find(error, "ERROR_MESSAGES/ERROR_MESSAGE");
            let part = |name: &str| message.and_then(|message| doc.find_text(message, name));
            let description = [
                part("ErrorMessageCategoryCode"),
                part("ErrorMessageText"),
            ]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(": ");

            return Ok(Self {
                code: StatusCode::RequestError,
                description,
            });
        }

        let status = doc
            .find(root, SERVICE_STATUS_PATH)
            .ok_or(CreditError::NoStatus)?;
        let code = doc
            .find_text(status, "StatusCode")
            .filter(|code| !code.is_empty())
            .ok_or(CreditError::NoStatus)?;

        Ok(Self {
            code: code.parse()?,
            description: doc.text_or_empty(status, "StatusDescription"),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}
