//! Shared XML infrastructure for both halves of the codec.
//!
//! The request side builds [`XmlElement`] trees and renders them with quick-xml;
//! the response side parses a document once into an immutable [`Document`]
//! that answers path queries.

pub mod document;
pub mod element;

pub use document::{Document, NodeId};
pub use element::XmlElement;

/// Default MISMO residential namespace
pub const MISMO_NS: &str = "http://www.mismo.org/residential/2009/schemas";

/// XLink namespace carrying `label`, `arcrole`, `from` and `to`
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Vendor extension namespace
pub const VENDOR_NS: &str = "inetapi/MISMO3_4_MCL_Extension.xsd";

/// Prefix used for the xlink namespace in outbound documents
pub const XLINK_PREFIX: &str = "P2";

/// Prefix used for the vendor extension namespace in outbound documents
pub const VENDOR_PREFIX: &str = "P3";

/// Relationship arcroles linking labeled elements
pub mod arcrole {
    pub const PARTY_VERIFIED_BY_SERVICE: &str =
        "urn:fdc:mismo.org:2009:residential/PARTY_IsVerifiedBy_SERVICE";
    pub const PROPERTY_VERIFIED_BY_SERVICE: &str =
        "urn:fdc:mismo.org:2009:residential/PROPERTY_IsVerifiedBy_SERVICE";
    pub const CREDIT_FILE_ROLE: &str =
        "urn:fdc:Meridianlink.com:2017:mortgage/CREDIT_FILE_IsAssociatedWith_ROLE";
    pub const CREDIT_SCORE_ROLE: &str =
        "urn:fdc:Meridianlink.com:2017:mortgage/CREDIT_SCORE_IsAssociatedWith_ROLE";
    pub const CREDIT_FILE_SCORE: &str =
        "urn:fdc:Meridianlink.com:2017:mortgage/CREDIT_FILE_IsAssociatedWith_CREDIT_SCORE";
    pub const CREDIT_FILE_SCORE_MODEL: &str =
        "urn:fdc:Meridianlink.com:2017:mortgage/CREDIT_FILE_IsAssociatedWith_CREDIT_SCORE_MODEL";
    pub const CREDIT_LIABILITY_ROLE: &str =
        "urn:fdc:Meridianlink.com:2017:mortgage/CREDIT_LIABILITY_IsAssociatedWith_ROLE";
}

/// Qualify `name` with `prefix` when one is given
pub fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name),
        _ => name.to_string(),
    }
}

/// Qualified xlink attribute name, e.g. `P2:label`
pub fn xlink(name: &str) -> String {
    qualify(Some(XLINK_PREFIX), name)
}

/// Qualified vendor extension element name, e.g. `P3:REQUEST_EQUIFAX_SCORE`
pub fn vendor(name: &str) -> String {
    qualify(Some(VENDOR_PREFIX), name)
}
