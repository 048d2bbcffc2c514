//! In-memory model of a credit order request.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::{CreditError, Result};
use crate::fields::{
    Address, BirthDate, EmailAddress, PaymentCard, PersonName, PhoneNumber, ResponseFormat,
    ResponseFormats, Ssn,
};

/// Data version sent in `ABOUT_VERSION` when the caller does not set one
pub const DEFAULT_DATA_VERSION: &str = "201703";

/// One of the two person slots of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Person {
    #[serde(rename = "b")]
    Borrower,
    #[serde(rename = "c")]
    CoBorrower,
}

impl Person {
    pub const ALL: [Person; 2] = [Person::Borrower, Person::CoBorrower];

    /// Single-letter key: `b` or `c`
    pub fn key(self) -> &'static str {
        match self {
            Person::Borrower => "b",
            Person::CoBorrower => "c",
        }
    }

    /// `BorrowerClassificationType` identifying this slot's role
    pub fn classification(self) -> &'static str {
        match self {
            Person::Borrower => "Primary",
            Person::CoBorrower => "Secondary",
        }
    }

    /// Party label used in outbound documents
    pub fn party_label(self) -> &'static str {
        match self {
            Person::Borrower => "Party1",
            Person::CoBorrower => "Party2",
        }
    }

    pub fn sequence_number(self) -> &'static str {
        match self {
            Person::Borrower => "1",
            Person::CoBorrower => "2",
        }
    }
}

impl FromStr for Person {
    type Err = CreditError;

    fn from_str(key: &str) -> Result<Self> {
        match key {
            "b" => Ok(Person::Borrower),
            "c" => Ok(Person::CoBorrower),
            _ => Err(CreditError::InvalidPersonKey {
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Person::Borrower => write!(f, "borrower"),
            Person::CoBorrower => write!(f, "co-borrower"),
        }
    }
}

/// Which document shape the serializer builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum RequestKind {
    #[default]
    Submit,
    StatusQuery,
    Upgrade,
    Refresh,
    PermUnmerge,
}

impl RequestKind {
    pub const ALL: [RequestKind; 5] = [
        RequestKind::Submit,
        RequestKind::StatusQuery,
        RequestKind::Upgrade,
        RequestKind::Refresh,
        RequestKind::PermUnmerge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Submit => "Submit",
            RequestKind::StatusQuery => "StatusQuery",
            RequestKind::Upgrade => "Upgrade",
            RequestKind::Refresh => "Refresh",
            RequestKind::PermUnmerge => "PermUnmerge",
        }
    }
}

impl FromStr for RequestKind {
    type Err = CreditError;

    fn from_str(value: &str) -> Result<Self> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                CreditError::invalid("request_kind", format!("unknown request kind '{}'", value))
            })
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Products ordered from one bureau
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BureauOptions {
    pub credit: bool,
    pub score: bool,
    /// Always `None` for Equifax, which has no fraud add-on
    pub fraud: Option<bool>,
}

impl BureauOptions {
    /// Credit and score, no fraud add-on
    pub fn credit_and_score() -> Self {
        Self {
            credit: true,
            score: true,
            fraud: None,
        }
    }

    pub fn with_fraud(mut self, fraud: bool) -> Self {
        self.fraud = Some(fraud);
        self
    }
}

/// Everything known about one person slot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PersonData {
    pub name: Option<PersonName>,
    pub ssn: Option<Ssn>,
    pub current_address: Option<Address>,
    pub prior_address: Option<Address>,
    pub mailing_address: Option<Address>,
    pub date_of_birth: Option<BirthDate>,
    pub phone: Option<PhoneNumber>,
    pub email: Option<EmailAddress>,
}

impl PersonData {
    pub fn set_name(&mut self, first: &str, last: &str) -> Result<&mut Self> {
        self.name = Some(PersonName::new(first, last)?);
        Ok(self)
    }

    pub fn set_ssn(&mut self, ssn: &str) -> Result<&mut Self> {
        self.ssn = Some(Ssn::new(ssn)?);
        Ok(self)
    }

    pub fn set_current_address(&mut self, address: Address) -> &mut Self {
        self.current_address = Some(address);
        self
    }

    pub fn set_prior_address(&mut self, address: Address) -> &mut Self {
        self.prior_address = Some(address);
        self
    }

    pub fn set_mailing_address(&mut self, address: Address) -> &mut Self {
        self.mailing_address = Some(address);
        self
    }

    pub fn set_date_of_birth(&mut self, date: &str) -> Result<&mut Self> {
        self.date_of_birth = Some(BirthDate::parse(date)?);
        Ok(self)
    }

    pub fn set_phone(&mut self, phone: &str) -> Result<&mut Self> {
        self.phone = Some(PhoneNumber::new(phone)?);
        Ok(self)
    }

    pub fn set_email(&mut self, email: &str) -> Result<&mut Self> {
        self.email = Some(EmailAddress::new(email)?);
        Ok(self)
    }
}

/// Loan the order is attached to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoanInfo {
    pub identifier: String,
    pub loan_type: String,
}

/// Aggregate consumed once by the request serializer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub kind: RequestKind,
    pub borrower: PersonData,
    pub coborrower: PersonData,
    pub subject_property: Option<Address>,
    pub loan: Option<LoanInfo>,
    pub payment: Option<PaymentCard>,
    pub equifax: BureauOptions,
    pub experian: BureauOptions,
    pub transunion: BureauOptions,
    pub response_formats: ResponseFormats,
    #[serde(deserialize_with = "trimmed_order_id")]
    pub vendor_order_id: Option<String>,
    pub data_version: String,
}

fn trimmed_order_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<String>::deserialize(deserializer)?;
    Ok(id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()))
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            kind: RequestKind::Submit,
            borrower: PersonData::default(),
            coborrower: PersonData::default(),
            subject_property: None,
            loan: None,
            payment: None,
            equifax: BureauOptions::default(),
            experian: BureauOptions::default(),
            transunion: BureauOptions::default(),
            response_formats: ResponseFormats::default(),
            vendor_order_id: None,
            data_version: DEFAULT_DATA_VERSION.to_string(),
        }
    }
}

impl RequestContext {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Read a request context from a TOML or JSON file, chosen by extension
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CreditError::invalid("request", e.to_string())),
            _ => toml::from_str(&content).map_err(|e| CreditError::invalid("request", e.to_string())),
        }
    }

    pub fn person(&self, person: Person) -> &PersonData {
        match person {
            Person::Borrower => &self.borrower,
            Person::CoBorrower => &self.coborrower,
        }
    }

    pub fn person_mut(&mut self, person: Person) -> &mut PersonData {
        match person {
            Person::Borrower => &mut self.borrower,
            Person::CoBorrower => &mut self.coborrower,
        }
    }

    /// The co-borrower counts as present once a name is set
    pub fn has_coborrower(&self) -> bool {
        self.coborrower.name.is_some()
    }

    pub fn set_kind(&mut self, kind: RequestKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_subject_property(&mut self, address: Address) -> &mut Self {
        self.subject_property = Some(address);
        self
    }

    pub fn set_loan(&mut self, identifier: &str, loan_type: &str) -> &mut Self {
        self.loan = Some(LoanInfo {
            identifier: identifier.trim().to_string(),
            loan_type: loan_type.trim().to_string(),
        });
        self
    }

    pub fn set_payment(&mut self, card: PaymentCard) -> &mut Self {
        self.payment = Some(card);
        self
    }

    pub fn set_equifax(&mut self, credit: bool, score: bool) -> &mut Self {
        self.equifax = BureauOptions {
            credit,
            score,
            fraud: None,
        };
        self
    }

    pub fn set_experian(&mut self, credit: bool, score: bool, fraud: bool) -> &mut Self {
        self.experian = BureauOptions {
            credit,
            score,
            fraud: Some(fraud),
        };
        self
    }

    pub fn set_transunion(&mut self, credit: bool, score: bool, fraud: bool) -> &mut Self {
        self.transunion = BureauOptions {
            credit,
            score,
            fraud: Some(fraud),
        };
        self
    }

    pub fn add_response_format(&mut self, format: ResponseFormat) -> &mut Self {
        self.response_formats.insert(format);
        self
    }

    pub fn set_vendor_order_id(&mut self, id: &str) -> &mut Self {
        let id = id.trim();
        self.vendor_order_id = (!id.is_empty()).then(|| id.to_string());
        self
    }

    pub fn set_data_version(&mut self, version: &str) -> &mut Self {
        self.data_version = version.trim().to_string();
        self
    }

    /// Context for a status query on an order this context already submitted
    pub fn status_query(&self, vendor_order_id: &str) -> Self {
        let mut query = self.clone();
        query.kind = RequestKind::StatusQuery;
        query.set_vendor_order_id(vendor_order_id);
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_keys() {
        assert_eq!("b".parse::<Person>().unwrap(), Person::Borrower);
        assert_eq!("c".parse::<Person>().unwrap(), Person::CoBorrower);
        assert!(matches!(
            "x".parse::<Person>(),
            Err(CreditError::InvalidPersonKey { key }) if key == "x"
        ));
        assert!("B".parse::<Person>().is_err());
        assert_eq!(Person::CoBorrower.key(), "c");
    }

    #[test]
    fn test_request_kind_parsing() {
        assert_eq!(
            "statusquery".parse::<RequestKind>().unwrap(),
            RequestKind::StatusQuery
        );
        assert!("Cancel".parse::<RequestKind>().is_err());
        assert_eq!(RequestKind::PermUnmerge.to_string(), "PermUnmerge");
    }

    #[test]
    fn test_setters_validate() {
        let mut ctx = RequestContext::new(RequestKind::Submit);
        ctx.borrower.set_name("Ann", "Smith").unwrap();
        ctx.borrower.set_ssn("123-45-6789").unwrap();
        ctx.borrower.set_date_of_birth("07/04/1980").unwrap();
        assert!(ctx.borrower.set_phone("12").is_err());

        assert_eq!(ctx.borrower.ssn.as_ref().unwrap().as_str(), "123456789");
        assert_eq!(
            ctx.borrower.date_of_birth.unwrap().to_wire(),
            "1980-07-04"
        );
        assert!(!ctx.has_coborrower());
    }

    #[test]
    fn test_blank_vendor_order_id_clears() {
        let mut ctx = RequestContext::default();
        ctx.set_vendor_order_id("  ");
        assert_eq!(ctx.vendor_order_id, None);
        ctx.set_vendor_order_id(" 1234 ");
        assert_eq!(ctx.vendor_order_id.as_deref(), Some("1234"));
    }

    #[test]
    fn test_status_query_derivation() {
        let mut ctx = RequestContext::default();
        ctx.borrower.set_name("Ann", "Smith").unwrap();
        let query = ctx.status_query("998877");
        assert_eq!(query.kind, RequestKind::StatusQuery);
        assert_eq!(query.vendor_order_id.as_deref(), Some("998877"));
        assert_eq!(query.borrower, ctx.borrower);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let ctx: RequestContext = toml::from_str(
            r#"
kind = "Refresh"
vendor_order_id = "42"
response_formats = ["Pdf", "Xml"]

[borrower]
ssn = "123-45-6789"
date_of_birth = "1980-07-04"

[borrower.name]
first = "Ann"
last = "Smith"

[borrower.current_address]
street = "1 Main St"
city = "Denver"
state = "CO"
postal_code = "80202"

[experian]
credit = true
score = true
fraud = false
"#,
        )
        .unwrap();

        assert_eq!(ctx.kind, RequestKind::Refresh);
        assert_eq!(ctx.borrower.name.as_ref().unwrap().last(), "Smith");
        assert!(ctx.experian.credit);
        assert_eq!(ctx.experian.fraud, Some(false));
        assert!(!ctx.equifax.credit);
        assert!(ctx.response_formats.contains(ResponseFormat::Pdf));
        assert_eq!(ctx.data_version, DEFAULT_DATA_VERSION);
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        std::fs::write(
            &path,
            r#"{"kind": "StatusQuery", "vendor_order_id": "77",
                "borrower": {"name": {"first": "Ann", "last": "Smith"}, "ssn": "000000015"}}"#,
        )
        .unwrap();

        let ctx = RequestContext::from_file(&path).await.unwrap();
        assert_eq!(ctx.kind, RequestKind::StatusQuery);
        assert_eq!(ctx.vendor_order_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_deserialized_vendor_order_id_is_trimmed() {
        let ctx: RequestContext = toml::from_str("vendor_order_id = \" 42 \"\n").unwrap();
        assert_eq!(ctx.vendor_order_id.as_deref(), Some("42"));

        let ctx: RequestContext = toml::from_str("vendor_order_id = \"  \"\n").unwrap();
        assert_eq!(ctx.vendor_order_id, None);
    }

    #[tokio::test]
    async fn test_from_file_reports_bad_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.toml");
        std::fs::write(&path, "kind = \"Cancel\"\n").unwrap();

        assert!(matches!(
            RequestContext::from_file(&path).await,
            Err(CreditError::InvalidField { field, .. }) if field == "request"
        ));
    }

    #[test]
    fn test_deserialize_rejects_invalid_ssn() {
        let result: std::result::Result<RequestContext, _> = toml::from_str(
            r#"
[borrower]
ssn = "12"
"#,
        );
        assert!(result.is_err());
    }
}
