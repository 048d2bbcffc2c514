//! Validated field values.
//!
//! Every type here checks its input once on construction and can render itself
//! as the small XML fragment the request serializer embeds. The `prefix`
//! argument of each `to_xml` lets a caller place the fragment in another
//! namespace.

use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::error::{CreditError, Result};
use crate::xml::{XmlElement, qualify};

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static STATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email regex")
    })
}

fn state_regex() -> &'static Regex {
    STATE_REGEX
        .get_or_init(|| Regex::new(r"^[A-Z]{2}$").expect("Failed to compile state code regex"))
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CreditError::missing(field));
    }
    Ok(value.to_string())
}

/// Replace all but the last four characters with `*`
pub fn mask(value: &str) -> String {
    let count = value.chars().count();
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i + 4 < count { '*' } else { c })
        .collect()
}

/// Individual name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawName")]
pub struct PersonName {
    first: String,
    middle: Option<String>,
    last: String,
    suffix: Option<String>,
}

#[derive(Deserialize)]
struct RawName {
    first: String,
    #[serde(default)]
    middle: Option<String>,
    last: String,
    #[serde(default)]
    suffix: Option<String>,
}

impl TryFrom<RawName> for PersonName {
    type Error = CreditError;

    fn try_from(raw: RawName) -> Result<Self> {
        Ok(Self::new(&raw.first, &raw.last)?
            .with_middle(raw.middle.as_deref().unwrap_or_default())
            .with_suffix(raw.suffix.as_deref().unwrap_or_default()))
    }
}

impl PersonName {
    pub fn new(first: &str, last: &str) -> Result<Self> {
        Ok(Self {
            first: required("name.first", first)?,
            middle: None,
            last: required("name.last", last)?,
            suffix: None,
        })
    }

    pub fn with_middle(mut self, middle: &str) -> Self {
        let middle = middle.trim();
        self.middle = (!middle.is_empty()).then(|| middle.to_string());
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        let suffix = suffix.trim();
        self.suffix = (!suffix.is_empty()).then(|| suffix.to_string());
        self
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn middle(&self) -> Option<&str> {
        self.middle.as_deref()
    }

    pub fn last(&self) -> &str {
        &self.last
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn full_name(&self) -> String {
        [
            Some(self.first.as_str()),
            self.middle(),
            Some(self.last.as_str()),
            self.suffix(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn to_xml(&self, prefix: Option<&str>) -> XmlElement {
        XmlElement::new(qualify(prefix, "NAME"))
            .child(XmlElement::leaf(qualify(prefix, "FirstName"), &self.first))
            .child(XmlElement::leaf(qualify(prefix, "LastName"), &self.last))
            .opt_leaf(&qualify(prefix, "MiddleName"), self.middle())
            .opt_leaf(&qualify(prefix, "SuffixName"), self.suffix())
    }
}

/// US postal address
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAddress")]
pub struct Address {
    street: String,
    city: String,
    state: String,
    postal_code: String,
}

#[derive(Deserialize)]
struct RawAddress {
    street: String,
    city: String,
    state: String,
    postal_code: String,
}

impl TryFrom<RawAddress> for Address {
    type Error = CreditError;

    fn try_from(raw: RawAddress) -> Result<Self> {
        Self::new(&raw.street, &raw.city, &raw.state, &raw.postal_code)
    }
}

impl Address {
    pub fn new(street: &str, city: &str, state: &str, postal_code: &str) -> Result<Self> {
        let state = required("address.state", state)?.to_uppercase();
        if !state_regex().is_match(&state) {
            return Err(CreditError::invalid(
                "address.state",
                format!("'{}' is not a two-letter state code", state),
            ));
        }

        let postal_code = digits_only(postal_code);
        if postal_code.len() != 5 && postal_code.len() != 9 {
            return Err(CreditError::invalid(
                "address.postal_code",
                "expected 5 or 9 digits",
            ));
        }

        Ok(Self {
            street: required("address.street", street)?,
            city: required("address.city", city)?,
            state,
            postal_code,
        })
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn to_xml(&self, prefix: Option<&str>) -> XmlElement {
        XmlElement::new(qualify(prefix, "ADDRESS"))
            .child(XmlElement::leaf(
                qualify(prefix, "AddressLineText"),
                &self.street,
            ))
            .child(XmlElement::leaf(qualify(prefix, "CityName"), &self.city))
            .child(XmlElement::leaf(
                qualify(prefix, "PostalCode"),
                &self.postal_code,
            ))
            .child(XmlElement::leaf(qualify(prefix, "StateCode"), &self.state))
    }
}

/// Social security number, stored as nine digits
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Ssn(String);

impl TryFrom<String> for Ssn {
    type Error = CreditError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl Ssn {
    pub fn new(value: &str) -> Result<Self> {
        let digits = digits_only(value);
        if digits.len() != 9 {
            return Err(CreditError::invalid("ssn", "expected 9 digits"));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl fmt::Debug for Ssn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ssn({})", self.masked())
    }
}

/// Ten-digit phone number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PhoneNumber(String);

impl TryFrom<String> for PhoneNumber {
    type Error = CreditError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl PhoneNumber {
    pub fn new(value: &str) -> Result<Self> {
        let mut digits = digits_only(value);
        if digits.len() == 11 && digits.starts_with('1') {
            digits.remove(0);
        }
        if digits.len() != 10 {
            return Err(CreditError::invalid("phone", "expected a 10-digit number"));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_xml(&self, prefix: Option<&str>) -> XmlElement {
        XmlElement::new(qualify(prefix, "CONTACT_POINT")).child(
            XmlElement::new(qualify(prefix, "CONTACT_POINT_TELEPHONE")).child(XmlElement::leaf(
                qualify(prefix, "ContactPointTelephoneValue"),
                &self.0,
            )),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct EmailAddress(String);

impl TryFrom<String> for EmailAddress {
    type Error = CreditError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl EmailAddress {
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();
        if !email_regex().is_match(value) {
            return Err(CreditError::invalid(
                "email",
                format!("'{}' is not an email address", value),
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_xml(&self, prefix: Option<&str>) -> XmlElement {
        XmlElement::new(qualify(prefix, "CONTACT_POINT")).child(
            XmlElement::new(qualify(prefix, "CONTACT_POINT_EMAIL")).child(XmlElement::leaf(
                qualify(prefix, "ContactPointEmailValue"),
                &self.0,
            )),
        )
    }
}

/// Date of birth, normalized to `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct BirthDate(NaiveDate);

impl TryFrom<String> for BirthDate {
    type Error = CreditError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl BirthDate {
    const FORMATS: [&'static str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y%m%d"];

    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        Self::FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
            .map(Self)
            .ok_or_else(|| {
                CreditError::invalid("date_of_birth", format!("unrecognized date '{}'", value))
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn to_wire(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

/// Card used to pay for the order
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPaymentCard")]
pub struct PaymentCard {
    holder: PersonName,
    number: String,
    expiration_month: u32,
    expiration_year: i32,
    security_code: Option<String>,
    billing_address: Option<Address>,
}

#[derive(Deserialize)]
struct RawPaymentCard {
    holder: PersonName,
    number: String,
    expiration_month: u32,
    expiration_year: i32,
    #[serde(default)]
    security_code: Option<String>,
    #[serde(default)]
    billing_address: Option<Address>,
}

impl TryFrom<RawPaymentCard> for PaymentCard {
    type Error = CreditError;

    fn try_from(raw: RawPaymentCard) -> Result<Self> {
        let mut card = Self::new(
            raw.holder,
            &raw.number,
            raw.expiration_month,
            raw.expiration_year,
        )?;
        if let Some(code) = raw.security_code {
            card = card.with_security_code(&code)?;
        }
        if let Some(address) = raw.billing_address {
            card = card.with_billing_address(address);
        }
        Ok(card)
    }
}

impl PaymentCard {
    pub fn new(
        holder: PersonName,
        number: &str,
        expiration_month: u32,
        expiration_year: i32,
    ) -> Result<Self> {
        let number = digits_only(number);
        if !(12..=19).contains(&number.len()) || !luhn_valid(&number) {
            return Err(CreditError::invalid(
                "payment.number",
                "card number failed checksum",
            ));
        }
        if !(1..=12).contains(&expiration_month) {
            return Err(CreditError::invalid(
                "payment.expiration_month",
                "expected 1-12",
            ));
        }
        if !(2000..=2099).contains(&expiration_year) {
            return Err(CreditError::invalid(
                "payment.expiration_year",
                "expected a four-digit year",
            ));
        }

        Ok(Self {
            holder,
            number,
            expiration_month,
            expiration_year,
            security_code: None,
            billing_address: None,
        })
    }

    pub fn with_security_code(mut self, code: &str) -> Result<Self> {
        let digits = digits_only(code);
        if !(3..=4).contains(&digits.len()) {
            return Err(CreditError::invalid(
                "payment.security_code",
                "expected 3 or 4 digits",
            ));
        }
        self.security_code = Some(digits);
        Ok(self)
    }

    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    pub fn holder(&self) -> &PersonName {
        &self.holder
    }

    pub fn masked_number(&self) -> String {
        mask(&self.number)
    }

    /// Expiration as `YYYY-MM`
    pub fn expiration(&self) -> String {
        format!("{:04}-{:02}", self.expiration_year, self.expiration_month)
    }

    pub fn to_xml(&self, prefix: Option<&str>) -> XmlElement {
        XmlElement::new(qualify(prefix, "SERVICE_PAYMENT"))
            .opt_child(self.billing_address.as_ref().map(|a| a.to_xml(prefix)))
            .child(self.holder.to_xml(prefix))
            .child(
                XmlElement::new(qualify(prefix, "SERVICE_PAYMENT_DETAIL"))
                    .child(XmlElement::leaf(
                        qualify(prefix, "ServicePaymentAccountIdentifier"),
                        &self.number,
                    ))
                    .child(XmlElement::leaf(
                        qualify(prefix, "ServicePaymentCreditAccountExpirationDate"),
                        self.expiration(),
                    ))
                    .child(XmlElement::leaf(
                        qualify(prefix, "ServicePaymentMethodType"),
                        "CreditCard",
                    ))
                    .opt_leaf(
                        &qualify(prefix, "ServicePaymentSecondaryCreditAccountIdentifier"),
                        self.security_code.as_deref(),
                    ),
            )
    }
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("holder", &self.holder)
            .field("number", &self.masked_number())
            .field("expiration", &self.expiration())
            .finish_non_exhaustive()
    }
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Report format the vendor should attach to the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ResponseFormat {
    Xml,
    Html,
    Pdf,
}

impl ResponseFormat {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            ResponseFormat::Xml => "Xml",
            ResponseFormat::Html => "Html",
            ResponseFormat::Pdf => "Pdf",
        }
    }
}

/// Ordered, duplicate-free set of preferred response formats
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<ResponseFormat>")]
pub struct ResponseFormats(Vec<ResponseFormat>);

impl From<Vec<ResponseFormat>> for ResponseFormats {
    fn from(formats: Vec<ResponseFormat>) -> Self {
        let mut set = Self::default();
        for format in formats {
            set.insert(format);
        }
        set
    }
}

impl ResponseFormats {
    pub fn insert(&mut self, format: ResponseFormat) {
        if !self.0.contains(&format) {
            self.0.push(format);
        }
    }

    pub fn remove(&mut self, format: ResponseFormat) {
        self.0.retain(|f| *f != format);
    }

    pub fn contains(&self, format: ResponseFormat) -> bool {
        self.0.contains(&format)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ResponseFormat> + '_ {
        self.0.iter().copied()
    }

    /// `None` when no format is selected, so callers omit the container entirely
    pub fn to_xml(&self, prefix: Option<&str>) -> Option<XmlElement> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            XmlElement::new(qualify(prefix, "SERVICE_PREFERRED_RESPONSE_FORMATS")).children(
                self.0.iter().map(|format| {
                    XmlElement::new(qualify(prefix, "SERVICE_PREFERRED_RESPONSE_FORMAT")).child(
                        XmlElement::new(qualify(
                            prefix,
                            "SERVICE_PREFERRED_RESPONSE_FORMAT_DETAIL",
                        ))
                        .child(XmlElement::leaf(
                            qualify(prefix, "PreferredResponseFormatType"),
                            format.as_wire_str(),
                        )),
                    )
                }),
            ),
        )
    }
}
