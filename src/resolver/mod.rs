//! Response document resolver.
//!
//! A response describes its entities as labeled elements joined by
//! `RELATIONSHIP` edges rather than by nesting. [`ResponseResolver`] parses a
//! document once, indexes the edges, and answers per-person queries by
//! walking that index.

pub mod graph;
pub mod rating;
pub mod records;
pub mod status;

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::{CreditError, Result};
use crate::request::Person;
use crate::xml::{Document, NodeId, XLINK_NS, arcrole};

pub use graph::RelationshipIndex;
pub use rating::{Rating, rating_text};
pub use records::{
    BureauResponse, CreditScore, Liability, PersonSummary, ReportDocument, ReportSummary,
    ScoreFactor,
};
pub use status::{Status, StatusCode};

/// Repository source types kept when listing a person's credit files
pub const BUREAU_SOURCES: [&str; 3] = ["Equifax", "Experian", "TransUnion"];

const VENDOR_ORDER_ID_PATH: &str = "DEAL_SETS/DEAL_SET/DEALS/DEAL/SERVICES/SERVICE/SERVICE_PRODUCT_FULFILLMENT/SERVICE_PRODUCT_FULFILLMENT_DETAIL/VendorOrderIdentifier";

/// Read-only view over one parsed response document.
///
/// Person lookups are computed on first use and cached, so every accessor
/// takes `&self` and repeated calls return identical results.
#[derive(Debug)]
pub struct ResponseResolver {
    document: Document,
    index: RelationshipIndex,
    status: Status,
    vendor_order_id: Option<String>,
    roles: [OnceLock<Option<String>>; 2],
    credit_files: [OnceLock<Vec<String>>; 2],
}

impl ResponseResolver {
    /// Parse `xml` and extract its status and vendor order identifier
    pub fn load(xml: &str) -> Result<Self> {
        if xml.trim().is_empty() {
            return Err(CreditError::EmptyResponse);
        }

        let document = Document::parse(xml)?;
        let root = document.root();
        if document.name(root) != "MESSAGE" {
            return Err(CreditError::malformed(format!(
                "expected root element <MESSAGE>, found <{}>",
                document.name(root)
            )));
        }

        let status = Status::extract(&document)?;
        let vendor_order_id = document
            .find_text(root, VENDOR_ORDER_ID_PATH)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let index = RelationshipIndex::build(&document);

        debug!(
            status = %status.code,
            vendor_order_id = ?vendor_order_id,
            elements = document.len(),
            edges = index.edge_count(),
            "Loaded response document"
        );

        Ok(Self {
            document,
            index,
            status,
            vendor_order_id,
            roles: Default::default(),
            credit_files: Default::default(),
        })
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn vendor_order_id(&self) -> Option<&str> {
        self.vendor_order_id.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether a role with this person's classification exists
    pub fn is_present(&self, person: Person) -> bool {
        self.role_label(person).is_some()
    }

    /// Labels of the person's bureau-reported credit files, in document order
    pub fn credit_file_labels(&self, person: Person) -> Result<Vec<String>> {
        let role = self.require_role(person)?;
        let labels = self.credit_files[slot(person)].get_or_init(|| {
            self.index
                .in_document_order(self.index.sources(arcrole::CREDIT_FILE_ROLE, role))
                .into_iter()
                .filter(|&(_, file)| {
                    let source = self
                        .document
                        .find_text(file, "CREDIT_FILE_DETAIL/CreditRepositorySourceType");
                    source.is_some_and(|source| BUREAU_SOURCES.contains(&source))
                })
                .map(|(label, _)| label.to_string())
                .collect()
        });
        Ok(labels.clone())
    }

    pub fn bureau_responses(&self, person: Person) -> Result<Vec<BureauResponse>> {
        Ok(self
            .credit_file_labels(person)?
            .iter()
            .filter_map(|label| self.index.node(label))
            .map(|file| BureauResponse::read(&self.document, file))
            .collect())
    }

    pub fn credit_scores(&self, person: Person) -> Result<Vec<CreditScore>> {
        let role = self.require_role(person)?;
        let scores = self
            .index
            .in_document_order(self.index.sources(arcrole::CREDIT_SCORE_ROLE, role));

        Ok(scores
            .into_iter()
            .map(|(label, score)| self.resolve_score(label, score))
            .collect())
    }

    fn resolve_score(&self, label: &str, score: NodeId) -> CreditScore {
        let mut resolved = CreditScore::read(&self.document, score);

        let owner = self
            .index
            .in_document_order(self.index.sources(arcrole::CREDIT_FILE_SCORE, label))
            .into_iter()
            .next();
        let Some((file_label, file)) = owner else {
            return resolved;
        };

        resolved.bureau_name = self
            .document
            .text_or_empty(file, "CREDIT_FILE_DETAIL/CreditRepositorySourceType");

        let models = self
            .index
            .in_document_order(self.index.targets(arcrole::CREDIT_FILE_SCORE_MODEL, file_label));
        let matching = models.into_iter().find_map(|(_, model)| {
            let detail = self.document.find(model, "CREDIT_SCORE_MODEL_DETAIL")?;
            (records::model_name(&self.document, detail) == resolved.model_name).then_some(detail)
        });
        if let Some(detail) = matching {
            resolved.minimum_value = self.document.text_or_empty(detail, "CreditScoreMinimumValue");
            resolved.maximum_value = self.document.text_or_empty(detail, "CreditScoreMaximumValue");
        }

        resolved
    }

    /// Liabilities linked to `person`, or every liability when `person` is `None`
    pub fn liabilities(&self, person: Option<Person>) -> Result<Vec<Liability>> {
        let nodes: Vec<NodeId> = match person {
            Some(person) => {
                let role = self.require_role(person)?;
                self.index
                    .in_document_order(self.index.sources(arcrole::CREDIT_LIABILITY_ROLE, role))
                    .into_iter()
                    .map(|(_, liability)| liability)
                    .collect()
            }
            None => self.document.descendants_named("CREDIT_LIABILITY").collect(),
        };

        Ok(nodes
            .into_iter()
            .map(|liability| Liability::read(&self.document, liability))
            .collect())
    }

    /// Every embedded report document, in document order
    pub fn report_documents(&self) -> Result<Vec<ReportDocument>> {
        self.document
            .descendants_named("FOREIGN_OBJECT")
            .map(|object| ReportDocument::read(&self.document, object))
            .collect()
    }

    /// First embedded report with the given MIME type
    pub fn report_document(&self, mime_type: &str) -> Result<Option<ReportDocument>> {
        Ok(self
            .report_documents()?
            .into_iter()
            .find(|report| report.mime_type.eq_ignore_ascii_case(mime_type)))
    }

    pub fn rating_text(&self, code: &str, suppress_invalid: bool) -> Result<String> {
        rating_text(code, suppress_invalid)
    }

    pub fn summary(&self) -> Result<ReportSummary> {
        let mut people = Vec::new();
        for person in Person::ALL {
            if !self.is_present(person) {
                continue;
            }
            people.push(PersonSummary {
                person: person.to_string(),
                bureaus: self.bureau_responses(person)?,
                scores: self.credit_scores(person)?,
                liability_count: self.liabilities(Some(person))?.len(),
            });
        }

        Ok(ReportSummary {
            status: self.status.code,
            status_description: self.status.description.clone(),
            vendor_order_id: self.vendor_order_id.clone(),
            people,
            documents: self.report_documents()?,
        })
    }

    fn role_label(&self, person: Person) -> Option<&str> {
        self.roles[slot(person)]
            .get_or_init(|| {
                self.document.descendants_named("ROLE").find_map(|role| {
                    let classification = self
                        .document
                        .find_text(role, "BORROWER/BORROWER_DETAIL/BorrowerClassificationType")?;
                    if classification != person.classification() {
                        return None;
                    }
                    match self.document.attr_ns(role, XLINK_NS, "label") {
                        Some(label) if !label.is_empty() => Some(label.to_string()),
                        _ => {
                            warn!(%person, "Skipping {} role without an xlink label", classification);
                            None
                        }
                    }
                })
            })
            .as_deref()
    }

    fn require_role(&self, person: Person) -> Result<&str> {
        self.role_label(person)
            .ok_or(CreditError::PersonNotPresent { person })
    }
}

fn slot(person: Person) -> usize {
    match person {
        Person::Borrower => 0,
        Person::CoBorrower => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = r#"<DEAL_SETS><DEAL_SET><DEALS><DEAL><SERVICES><SERVICE>
<STATUSES><STATUS><StatusCode>COMPLETED</StatusCode></STATUS></STATUSES>
<SERVICE_PRODUCT_FULFILLMENT><SERVICE_PRODUCT_FULFILLMENT_DETAIL><VendorOrderIdentifier>1234</VendorOrderIdentifier></SERVICE_PRODUCT_FULFILLMENT_DETAIL></SERVICE_PRODUCT_FULFILLMENT>
</SERVICE></SERVICES></DEAL></DEALS></DEAL_SET></DEAL_SETS>"#;

    fn message(body: &str) -> String {
        format!(
            r#"<MESSAGE xmlns="http://www.mismo.org/residential/2009/schemas" xmlns:xlink="http://www.w3.org/1999/xlink">{}{}</MESSAGE>"#,
            STATUS, body
        )
    }

    fn credit_file(label: &str, source: &str) -> String {
        format!(
            r#"<CREDIT_FILE xlink:label="{}"><CREDIT_FILE_DETAIL><CreditRepositorySourceType>{}</CreditRepositorySourceType><CreditFileResultStatusType>FileReturned</CreditFileResultStatusType></CREDIT_FILE_DETAIL></CREDIT_FILE>"#,
            label, source
        )
    }

    fn edge(role: &str, from: &str, to: &str) -> String {
        format!(
            r#"<RELATIONSHIP xlink:arcrole="{}" xlink:from="{}" xlink:to="{}"/>"#,
            role, from, to
        )
    }

    const BORROWER_ROLE: &str = r#"<PARTY xlink:label="Party1"><ROLES><ROLE xlink:label="Role1"><BORROWER><BORROWER_DETAIL><BorrowerClassificationType>Primary</BorrowerClassificationType></BORROWER_DETAIL></BORROWER></ROLE></ROLES></PARTY>"#;

    fn three_bureau_response() -> String {
        let files = [
            credit_file("CF1", "Equifax"),
            credit_file("CF2", "Experian"),
            credit_file("CF3", "TransUnion"),
            credit_file("CF4", "Other"),
        ]
        .concat();
        let edges = ["CF1", "CF2", "CF3", "CF4"]
            .iter()
            .map(|file| edge(arcrole::CREDIT_FILE_ROLE, file, "Role1"))
            .collect::<String>();
        message(&format!(
            "<PARTIES>{}</PARTIES><CREDIT_FILES>{}</CREDIT_FILES><RELATIONSHIPS>{}</RELATIONSHIPS>",
            BORROWER_ROLE, files, edges
        ))
    }

    #[test]
    fn test_load_rejects_blank_and_foreign_roots() {
        assert!(matches!(
            ResponseResolver::load("   \n"),
            Err(CreditError::EmptyResponse)
        ));
        assert!(matches!(
            ResponseResolver::load("<RESPONSE/>"),
            Err(CreditError::MalformedResponse { .. })
        ));
        assert!(matches!(
            ResponseResolver::load("<MESSAGE>"),
            Err(CreditError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_status_and_order_id() {
        let resolver = ResponseResolver::load(&message("")).unwrap();
        assert_eq!(resolver.status().code, StatusCode::Completed);
        assert_eq!(resolver.vendor_order_id(), Some("1234"));
    }

    #[test]
    fn test_absent_borrower() {
        let resolver = ResponseResolver::load(&message("")).unwrap();
        assert!(!resolver.is_present(Person::Borrower));
        assert!(matches!(
            resolver.bureau_responses(Person::Borrower),
            Err(CreditError::PersonNotPresent {
                person: Person::Borrower
            })
        ));
        assert!(resolver.liabilities(None).unwrap().is_empty());
    }

    #[test]
    fn test_credit_files_in_document_order() {
        let resolver = ResponseResolver::load(&three_bureau_response()).unwrap();
        assert!(resolver.is_present(Person::Borrower));
        assert!(!resolver.is_present(Person::CoBorrower));

        assert_eq!(
            resolver.credit_file_labels(Person::Borrower).unwrap(),
            vec!["CF1", "CF2", "CF3"]
        );
        let names: Vec<_> = resolver
            .bureau_responses(Person::Borrower)
            .unwrap()
            .into_iter()
            .map(|response| response.bureau_name)
            .collect();
        assert_eq!(names, vec!["Equifax", "Experian", "TransUnion"]);
    }

    #[test]
    fn test_accessors_are_idempotent() {
        let resolver = ResponseResolver::load(&three_bureau_response()).unwrap();
        assert_eq!(
            resolver.bureau_responses(Person::Borrower).unwrap(),
            resolver.bureau_responses(Person::Borrower).unwrap()
        );
        assert_eq!(
            resolver.credit_file_labels(Person::Borrower).unwrap(),
            resolver.credit_file_labels(Person::Borrower).unwrap()
        );
        assert_eq!(resolver.summary().unwrap(), resolver.summary().unwrap());
    }

    #[test]
    fn test_unlabeled_role_is_absent() {
        let unlabeled = BORROWER_ROLE.replace(r#" xlink:label="Role1""#, "");
        let resolver =
            ResponseResolver::load(&message(&format!("<PARTIES>{}</PARTIES>", unlabeled))).unwrap();
        assert!(!resolver.is_present(Person::Borrower));

        let blank = BORROWER_ROLE.replace(r#"xlink:label="Role1""#, r#"xlink:label="""#);
        let resolver =
            ResponseResolver::load(&message(&format!("<PARTIES>{}</PARTIES>", blank))).unwrap();
        assert!(matches!(
            resolver.credit_scores(Person::Borrower),
            Err(CreditError::PersonNotPresent { .. })
        ));
    }

    #[test]
    fn test_resolver_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResponseResolver>();
    }
}
