//! Flat records read out of a response document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::{CreditError, Result};
use crate::resolver::status::StatusCode;
use crate::xml::{Document, NodeId};

/// Outcome of one bureau's credit file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BureauResponse {
    pub bureau_name: String,
    pub result: String,
    pub error_description: String,
}

impl BureauResponse {
    pub(crate) fn read(doc: &Document, file: NodeId) -> Self {
        Self {
            bureau_name: doc.text_or_empty(file, "CREDIT_FILE_DETAIL/CreditRepositorySourceType"),
            result: doc.text_or_empty(file, "CREDIT_FILE_DETAIL/CreditFileResultStatusType"),
            error_description: doc.text_or_empty(
                file,
                "CREDIT_ERROR_MESSAGES/CREDIT_ERROR_MESSAGE/CreditErrorMessageText",
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScoreFactor {
    pub code: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreditScore {
    pub bureau_name: String,
    pub date: String,
    pub model_name: String,
    pub percentile: String,
    pub value: String,
    pub factors: Vec<ScoreFactor>,
    pub minimum_value: String,
    pub maximum_value: String,
}

impl CreditScore {
    /// Score fields other than bureau name and range, which need graph hops
    pub(crate) fn read(doc: &Document, score: NodeId) -> Self {
        let factors = doc
            .find_all(score, "CREDIT_SCORE_FACTORS/CREDIT_SCORE_FACTOR")
            .into_iter()
            .map(|factor| ScoreFactor {
                code: doc.text_or_empty(factor, "CreditScoreFactorCode"),
                text: doc.text_or_empty(factor, "CreditScoreFactorText"),
            })
            .collect();

        let detail = doc.find(score, "CREDIT_SCORE_DETAIL");
        let field = |name: &str| detail.map(|d| doc.text_or_empty(d, name)).unwrap_or_default();

        Self {
            date: field("CreditScoreDate"),
            model_name: detail.map(|d| model_name(doc, d)).unwrap_or_default(),
            percentile: field("CreditScoreRankPercentileValue"),
            value: field("CreditScoreValue"),
            factors,
            ..Self::default()
        }
    }
}

/// Model name under a score or score-model detail element.
///
/// `Other` is replaced by the free-text description.
pub(crate) fn model_name(doc: &Document, detail: NodeId) -> String {
    match doc.find_text(detail, "CreditScoreModelNameType") {
        Some("Other") => doc.text_or_empty(detail, "CreditScoreModelNameTypeOtherDescription"),
        Some(name) => name.to_string(),
        None => String::new(),
    }
}

macro_rules! liability_fields {
    ($($field:ident => $path:literal,)+) => {
        /// One tradeline; every field is empty when the document omits it
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
        #[serde(rename_all = "PascalCase")]
        pub struct Liability {
            $(pub $field: String,)+
        }

        impl Liability {
            /// Field name and source path relative to `CREDIT_LIABILITY`
            pub const FIELDS: &'static [(&'static str, &'static str)] =
                &[$((stringify!($field), $path),)+];

            pub(crate) fn read(doc: &Document, liability: NodeId) -> Self {
                Self {
                    $($field: doc.text_or_empty(liability, $path),)+
                }
            }
        }
    };
}

liability_fields! {
    account_identifier => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountIdentifier",
    account_opened_date => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountOpenedDate",
    account_ownership_type => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountOwnershipType",
    account_reported_date => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountReportedDate",
    account_status_type => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountStatusType",
    account_type => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountType",
    account_closed_date => "CREDIT_LIABILITY_DETAIL/CreditLiabilityAccountClosedDate",
    unpaid_balance_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityUnpaidBalanceAmount",
    charge_off_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityChargeOffAmount",
    credit_limit_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityCreditLimitAmount",
    high_balance_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityHighBalanceAmount",
    last_activity_date => "CREDIT_LIABILITY_DETAIL/CreditLiabilityLastActivityDate",
    loan_type => "CREDIT_LIABILITY_DETAIL/CreditLoanType",
    monthly_payment_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityMonthlyPaymentAmount",
    months_remaining_count => "CREDIT_LIABILITY_DETAIL/CreditLiabilityMonthsRemainingCount",
    months_reviewed_count => "CREDIT_LIABILITY_DETAIL/CreditLiabilityMonthsReviewedCount",
    past_due_amount => "CREDIT_LIABILITY_DETAIL/CreditLiabilityPastDueAmount",
    terms_months_count => "CREDIT_LIABILITY_DETAIL/CreditLiabilityTermsMonthsCount",
    terms_source_type => "CREDIT_LIABILITY_DETAIL/CreditLiabilityTermsSourceType",
    consumer_dispute_indicator => "CREDIT_LIABILITY_DETAIL/CreditLiabilityConsumerDisputeIndicator",
    derogatory_data_indicator => "CREDIT_LIABILITY_DETAIL/CreditLiabilityDerogatoryDataIndicator",
    creditor_name => "CREDIT_LIABILITY_CREDITOR/NAME/FullName",
    creditor_street => "CREDIT_LIABILITY_CREDITOR/ADDRESS/AddressLineText",
    creditor_city => "CREDIT_LIABILITY_CREDITOR/ADDRESS/CityName",
    creditor_state => "CREDIT_LIABILITY_CREDITOR/ADDRESS/StateCode",
    creditor_postal_code => "CREDIT_LIABILITY_CREDITOR/ADDRESS/PostalCode",
    creditor_phone => "CREDIT_LIABILITY_CREDITOR/CONTACT_POINTS/CONTACT_POINT/CONTACT_POINT_TELEPHONE/ContactPointTelephoneValue",
    current_rating_code => "CREDIT_LIABILITY_CURRENT_RATING/CreditLiabilityCurrentRatingCode",
    current_rating_type => "CREDIT_LIABILITY_CURRENT_RATING/CreditLiabilityCurrentRatingType",
    highest_adverse_rating_code => "CREDIT_LIABILITY_HIGHEST_ADVERSE_RATING/CreditLiabilityHighestAdverseRatingCode",
    highest_adverse_rating_date => "CREDIT_LIABILITY_HIGHEST_ADVERSE_RATING/CreditLiabilityHighestAdverseRatingDate",
    highest_adverse_rating_type => "CREDIT_LIABILITY_HIGHEST_ADVERSE_RATING/CreditLiabilityHighestAdverseRatingType",
    late_30_days_count => "CREDIT_LIABILITY_LATE_COUNT/CreditLiability30DaysLateCount",
    late_60_days_count => "CREDIT_LIABILITY_LATE_COUNT/CreditLiability60DaysLateCount",
    late_90_days_count => "CREDIT_LIABILITY_LATE_COUNT/CreditLiability90DaysLateCount",
    payment_pattern_data => "CREDIT_LIABILITY_PAYMENT_PATTERN/CreditLiabilityPaymentPatternDataText",
    payment_pattern_start_date => "CREDIT_LIABILITY_PAYMENT_PATTERN/CreditLiabilityPaymentPatternStartDate",
    repository_source_type => "CREDIT_REPOSITORIES/CREDIT_REPOSITORY/CreditRepositorySourceType",
}

/// Report document embedded in a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportDocument {
    pub mime_type: String,
    pub encoding: String,
    #[serde(skip)]
    pub content: String,
}

impl ReportDocument {
    /// Content held as child elements rather than text is rendered back to markup
    pub(crate) fn read(doc: &Document, object: NodeId) -> Result<Self> {
        let content = match doc.find(object, "EmbeddedContentXML") {
            Some(embedded) => doc.inner_markup(embedded)?,
            None => String::new(),
        };
        Ok(Self {
            mime_type: doc.text_or_empty(object, "MIMETypeIdentifier"),
            encoding: doc.text_or_empty(object, "ObjectEncodingType"),
            content,
        })
    }

    pub fn is_base64(&self) -> bool {
        self.encoding.eq_ignore_ascii_case("Base64")
    }

    /// Decoded content: base64 payloads are decoded, anything else is returned as-is
    pub fn content_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_base64() {
            return Ok(self.content.as_bytes().to_vec());
        }
        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact)
            .map_err(|e| CreditError::malformed(format!("embedded {} report: {}", self.mime_type, e)))
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "application/pdf" => "pdf",
            "text/html" => "html",
            "text/xml" | "application/xml" => "xml",
            _ => "bin",
        }
    }
}

/// Per-person slice of a [`ReportSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonSummary {
    pub person: String,
    pub bureaus: Vec<BureauResponse>,
    pub scores: Vec<CreditScore>,
    pub liability_count: usize,
}

/// Everything the CLI prints about a loaded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportSummary {
    pub status: StatusCode,
    pub status_description: String,
    pub vendor_order_id: Option<String>,
    pub people: Vec<PersonSummary>,
    pub documents: Vec<ReportDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liability_table_is_complete() {
        assert_eq!(Liability::FIELDS.len(), 38);
        assert_eq!(Liability::FIELDS[0].0, "account_identifier");
    }

    #[test]
    fn test_liability_defaults_to_empty() {
        let doc = Document::parse(
            r#"<CREDIT_LIABILITY>
  <CREDIT_LIABILITY_DETAIL><CreditLiabilityAccountIdentifier>99-1</CreditLiabilityAccountIdentifier></CREDIT_LIABILITY_DETAIL>
  <CREDIT_LIABILITY_CREDITOR><NAME><FullName>FIRST BANK</FullName></NAME></CREDIT_LIABILITY_CREDITOR>
</CREDIT_LIABILITY>"#,
        )
        .unwrap();

        let liability = Liability::read(&doc, doc.root());
        assert_eq!(liability.account_identifier, "99-1");
        assert_eq!(liability.creditor_name, "FIRST BANK");
        assert_eq!(liability.past_due_amount, "");
        assert_eq!(liability.repository_source_type, "");
    }

    #[test]
    fn test_liability_serializes_pascal_case() {
        let liability = Liability {
            late_30_days_count: "2".to_string(),
            ..Liability::default()
        };
        let json = serde_json::to_value(&liability).unwrap();
        assert_eq!(json["Late30DaysCount"], "2");
        assert_eq!(json["AccountIdentifier"], "");
    }

    #[test]
    fn test_model_name_other_fallback() {
        let doc = Document::parse(
            r#"<CREDIT_SCORE_DETAIL>
  <CreditScoreModelNameType>Other</CreditScoreModelNameType>
  <CreditScoreModelNameTypeOtherDescription>VantageScore4</CreditScoreModelNameTypeOtherDescription>
</CREDIT_SCORE_DETAIL>"#,
        )
        .unwrap();
        assert_eq!(model_name(&doc, doc.root()), "VantageScore4");
    }

    #[test]
    fn test_report_document_decoding() {
        let pdf = ReportDocument {
            mime_type: "application/pdf".to_string(),
            encoding: "Base64".to_string(),
            content: "JVBE\nRi0x".to_string(),
        };
        assert_eq!(pdf.content_bytes().unwrap(), b"%PDF-1");
        assert_eq!(pdf.extension(), "pdf");

        let html = ReportDocument {
            mime_type: "text/html".to_string(),
            encoding: String::new(),
            content: "<p>report</p>".to_string(),
        };
        assert_eq!(html.content_bytes().unwrap(), b"<p>report</p>");

        let broken = ReportDocument {
            encoding: "base64".to_string(),
            content: "!!!".to_string(),
            ..pdf
        };
        assert!(matches!(
            broken.content_bytes(),
            Err(CreditError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_report_document_with_element_content() {
        let doc = Document::parse(
            r#"<FOREIGN_OBJECT>
  <EmbeddedContentXML><html><body>Report</body></html></EmbeddedContentXML>
  <MIMETypeIdentifier>text/html</MIMETypeIdentifier>
</FOREIGN_OBJECT>"#,
        )
        .unwrap();

        let report = ReportDocument::read(&doc, doc.root()).unwrap();
        assert_eq!(report.mime_type, "text/html");
        assert_eq!(report.content, "<html><body>Report</body></html>");
        assert_eq!(report.content_bytes().unwrap(), b"<html><body>Report</body></html>");
    }
}
