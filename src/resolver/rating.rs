use std::fmt;

use serde::Serialize;

use crate::error::{CreditError, Result};

/// Payment rating behind a single-character liability rating code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rating {
    AsAgreed,
    Late30Days,
    Late60Days,
    Late90Days,
    Late120Days,
    Late150Days,
    Late180Days,
    BankruptcyOrWageEarnerPlan,
    ForeclosureOrRepossession,
    CollectionOrChargeOff,
    Unknown,
    NoDataAvailable,
}

impl Rating {
    pub fn from_code(code: &str) -> Option<Self> {
        let rating = match code.trim() {
            "C" => Rating::AsAgreed,
            "1" => Rating::Late30Days,
            "2" => Rating::Late60Days,
            "3" => Rating::Late90Days,
            "4" => Rating::Late120Days,
            "5" => Rating::Late150Days,
            "6" => Rating::Late180Days,
            "7" => Rating::BankruptcyOrWageEarnerPlan,
            "8" => Rating::ForeclosureOrRepossession,
            "9" => Rating::CollectionOrChargeOff,
            "X" => Rating::Unknown,
            "-" => Rating::NoDataAvailable,
            _ => return None,
        };
        Some(rating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::AsAgreed => "AsAgreed",
            Rating::Late30Days => "Late30Days",
            Rating::Late60Days => "Late60Days",
            Rating::Late90Days => "Late90Days",
            Rating::Late120Days => "Late120Days",
            Rating::Late150Days => "Late150Days",
            Rating::Late180Days => "Late180Days",
            Rating::BankruptcyOrWageEarnerPlan => "BankruptcyOrWageEarnerPlan",
            Rating::ForeclosureOrRepossession => "ForeclosureOrRepossession",
            Rating::CollectionOrChargeOff => "CollectionOrChargeOff",
            Rating::Unknown => "Unknown",
            Rating::NoDataAvailable => "NoDataAvailable",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text for a rating code; unknown codes are an error unless `suppress_invalid` is set,
/// in which case they yield an empty string
pub fn rating_text(code: &str, suppress_invalid: bool) -> Result<String> {
    match Rating::from_code(code) {
        Some(rating) => Ok(rating.as_str().to_string()),
        None if suppress_invalid => Ok(String::new()),
        None => Err(CreditError::InvalidRatingCode {
            code: code.to_string(),
        }),
    }
}
