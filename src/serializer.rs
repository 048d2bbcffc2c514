//! Request document serializer.
//!
//! Each request kind has its own builder. The builders differ only in the
//! fields they require and in how the service block is filled in; everything
//! else goes through the shared message skeleton.

use crate::error::{CreditError, Result};
use crate::fields::Address;
use crate::request::{BureauOptions, Person, PersonData, RequestContext, RequestKind};
use crate::xml::{
    MISMO_NS, VENDOR_NS, VENDOR_PREFIX, XLINK_NS, XLINK_PREFIX, XmlElement, arcrole, vendor,
    xlink,
};

pub const SERVICE_LABEL: &str = "Service1";
pub const PROPERTY_LABEL: &str = "Property1";

/// Field a request kind cannot be serialized without
pub struct RequiredField {
    pub field: &'static str,
    pub kinds: &'static [RequestKind],
    is_satisfied: fn(&RequestContext) -> bool,
}

impl RequiredField {
    pub fn applies_to(&self, kind: RequestKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_satisfied(&self, ctx: &RequestContext) -> bool {
        (self.is_satisfied)(ctx)
    }
}

const ALL_KINDS: &[RequestKind] = &RequestKind::ALL;

const ADDRESS_KINDS: &[RequestKind] = &[RequestKind::Submit, RequestKind::Refresh];

const ORDER_KINDS: &[RequestKind] = &[
    RequestKind::StatusQuery,
    RequestKind::Upgrade,
    RequestKind::Refresh,
    RequestKind::PermUnmerge,
];

fn has_borrower_name(ctx: &RequestContext) -> bool {
    ctx.borrower.name.is_some()
}

fn has_borrower_ssn(ctx: &RequestContext) -> bool {
    ctx.borrower.ssn.is_some()
}

fn has_borrower_address(ctx: &RequestContext) -> bool {
    ctx.borrower.current_address.is_some()
}

fn has_vendor_order_id(ctx: &RequestContext) -> bool {
    vendor_order_id(ctx).is_ok()
}

fn has_coborrower_ssn_if_named(ctx: &RequestContext) -> bool {
    !ctx.has_coborrower() || ctx.coborrower.ssn.is_some()
}

/// Required fields per request kind, checked in this order
pub const REQUIRED_FIELDS: &[RequiredField] = &[
    RequiredField {
        field: "borrower.name",
        kinds: ALL_KINDS,
        is_satisfied: has_borrower_name,
    },
    RequiredField {
        field: "borrower.ssn",
        kinds: ALL_KINDS,
        is_satisfied: has_borrower_ssn,
    },
    RequiredField {
        field: "borrower.current_address",
        kinds: ADDRESS_KINDS,
        is_satisfied: has_borrower_address,
    },
    RequiredField {
        field: "vendor_order_id",
        kinds: ORDER_KINDS,
        is_satisfied: has_vendor_order_id,
    },
    RequiredField {
        field: "coborrower.ssn",
        kinds: ALL_KINDS,
        is_satisfied: has_coborrower_ssn_if_named,
    },
];

/// Names of the fields `kind` requires
pub fn required_fields(kind: RequestKind) -> impl Iterator<Item = &'static str> {
    REQUIRED_FIELDS
        .iter()
        .filter(move |field| field.applies_to(kind))
        .map(|field| field.field)
}

/// Fail with the first field `kind` requires that `ctx` lacks
pub fn validate(ctx: &RequestContext, kind: RequestKind) -> Result<()> {
    match REQUIRED_FIELDS
        .iter()
        .find(|field| field.applies_to(kind) && !field.is_satisfied(ctx))
    {
        Some(field) => Err(CreditError::missing(field.field)),
        None => Ok(()),
    }
}

/// Renders request contexts as wire documents
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestSerializer;

impl RequestSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, ctx: &RequestContext) -> Result<String> {
        serialize(ctx)
    }
}

/// Serialize `ctx` as the document for its request kind
pub fn serialize(ctx: &RequestContext) -> Result<String> {
    build_message(ctx)?.to_document_string()
}

/// Build the `MESSAGE` element for `ctx.kind`
pub fn build_message(ctx: &RequestContext) -> Result<XmlElement> {
    match ctx.kind {
        RequestKind::Submit => build_submit(ctx),
        RequestKind::StatusQuery => build_status_query(ctx),
        RequestKind::Upgrade => build_upgrade(ctx),
        RequestKind::Refresh => build_refresh(ctx),
        RequestKind::PermUnmerge => build_perm_unmerge(ctx),
    }
}

fn build_submit(ctx: &RequestContext) -> Result<XmlElement> {
    validate(ctx, RequestKind::Submit)?;
    Ok(message(
        ctx,
        &ServiceRequest {
            action: ActionType::Direct(RequestKind::Submit),
            vendor_order_id: None,
            include_payment: true,
        },
    ))
}

fn build_status_query(ctx: &RequestContext) -> Result<XmlElement> {
    validate(ctx, RequestKind::StatusQuery)?;
    Ok(message(
        ctx,
        &ServiceRequest {
            action: ActionType::Direct(RequestKind::StatusQuery),
            vendor_order_id: Some(vendor_order_id(ctx)?),
            include_payment: false,
        },
    ))
}

fn build_upgrade(ctx: &RequestContext) -> Result<XmlElement> {
    validate(ctx, RequestKind::Upgrade)?;
    Ok(message(
        ctx,
        &ServiceRequest {
            action: ActionType::Direct(RequestKind::Upgrade),
            vendor_order_id: Some(vendor_order_id(ctx)?),
            include_payment: true,
        },
    ))
}

// The vendor has no Refresh action type; it is sent as Other with the kind as description.
fn build_refresh(ctx: &RequestContext) -> Result<XmlElement> {
    validate(ctx, RequestKind::Refresh)?;
    Ok(message(
        ctx,
        &ServiceRequest {
            action: ActionType::Other(RequestKind::Refresh),
            vendor_order_id: Some(vendor_order_id(ctx)?),
            include_payment: true,
        },
    ))
}

fn build_perm_unmerge(ctx: &RequestContext) -> Result<XmlElement> {
    validate(ctx, RequestKind::PermUnmerge)?;
    Ok(message(
        ctx,
        &ServiceRequest {
            action: ActionType::Direct(RequestKind::PermUnmerge),
            vendor_order_id: Some(vendor_order_id(ctx)?),
            include_payment: false,
        },
    ))
}

fn vendor_order_id(ctx: &RequestContext) -> Result<&str> {
    ctx.vendor_order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CreditError::missing("vendor_order_id"))
}

#[derive(Debug, Clone, Copy)]
enum ActionType {
    Direct(RequestKind),
    Other(RequestKind),
}

struct ServiceRequest<'a> {
    action: ActionType,
    vendor_order_id: Option<&'a str>,
    include_payment: bool,
}

type SectionRenderer = fn(&RequestContext) -> Option<XmlElement>;

/// DEAL children ahead of SERVICES, in document order; `None` omits the section
const DEAL_SECTIONS: &[SectionRenderer] = &[collaterals, loans, parties, relationships];

fn message(ctx: &RequestContext, service: &ServiceRequest<'_>) -> XmlElement {
    let deal = XmlElement::new("DEAL")
        .children(DEAL_SECTIONS.iter().filter_map(|render| render(ctx)))
        .child(XmlElement::new("SERVICES").child(service_element(ctx, service)));

    XmlElement::new("MESSAGE")
        .attr("xmlns", MISMO_NS)
        .attr(format!("xmlns:{}", XLINK_PREFIX), XLINK_NS)
        .attr(format!("xmlns:{}", VENDOR_PREFIX), VENDOR_NS)
        .attr("MessageType", "Request")
        .child(
            XmlElement::new("ABOUT_VERSIONS").child(
                XmlElement::new("ABOUT_VERSION").child(XmlElement::leaf(
                    "DataVersionIdentifier",
                    &ctx.data_version,
                )),
            ),
        )
        .child(
            XmlElement::new("DEAL_SETS").child(
                XmlElement::new("DEAL_SET").child(XmlElement::new("DEALS").child(deal)),
            ),
        )
}

fn collaterals(ctx: &RequestContext) -> Option<XmlElement> {
    let property = ctx.subject_property.as_ref()?;
    Some(
        XmlElement::new("COLLATERALS").child(
            XmlElement::new("COLLATERAL").child(
                XmlElement::new("SUBJECT_PROPERTY")
                    .attr(xlink("label"), PROPERTY_LABEL)
                    .child(property.to_xml(None)),
            ),
        ),
    )
}

fn loans(ctx: &RequestContext) -> Option<XmlElement> {
    let loan = ctx.loan.as_ref().filter(|loan| !loan.identifier.is_empty())?;
    let terms = (!loan.loan_type.is_empty()).then(|| {
        XmlElement::new("TERMS_OF_LOAN").child(XmlElement::leaf("MortgageType", &loan.loan_type))
    });
    Some(
        XmlElement::new("LOANS").child(
            XmlElement::new("LOAN")
                .attr("LoanRoleType", "SubjectLoan")
                .child(
                    XmlElement::new("LOAN_IDENTIFIERS").child(
                        XmlElement::new("LOAN_IDENTIFIER")
                            .child(XmlElement::leaf("LoanIdentifier", &loan.identifier))
                            .child(XmlElement::leaf("LoanIdentifierType", "LenderLoan")),
                    ),
                )
                .opt_child(terms),
        ),
    )
}

fn parties(ctx: &RequestContext) -> Option<XmlElement> {
    Some(
        XmlElement::new("PARTIES").children(
            present_parties(ctx).map(|person| party(person, ctx.person(person))),
        ),
    )
}

fn present_parties(ctx: &RequestContext) -> impl Iterator<Item = Person> + '_ {
    Person::ALL
        .into_iter()
        .filter(|&person| ctx.person(person).name.is_some())
}

fn party(person: Person, data: &PersonData) -> XmlElement {
    let contact_points: Vec<XmlElement> = data
        .phone
        .iter()
        .map(|phone| phone.to_xml(None))
        .chain(data.email.iter().map(|email| email.to_xml(None)))
        .collect();

    let individual = XmlElement::new("INDIVIDUAL")
        .opt_child(
            (!contact_points.is_empty())
                .then(|| XmlElement::new("CONTACT_POINTS").children(contact_points)),
        )
        .opt_child(data.name.as_ref().map(|name| name.to_xml(None)));

    let mailing = data.mailing_address.as_ref().map(|address| {
        XmlElement::new("ADDRESSES").child(
            address
                .to_xml(None)
                .child(XmlElement::leaf("AddressType", "Mailing")),
        )
    });

    let residences: Vec<XmlElement> = [
        (data.current_address.as_ref(), "Current"),
        (data.prior_address.as_ref(), "Prior"),
    ]
    .into_iter()
    .filter_map(|(address, residency)| address.map(|address| residence(address, residency)))
    .collect();

    let borrower = XmlElement::new("BORROWER")
        .child(
            XmlElement::new("BORROWER_DETAIL")
                .opt_leaf(
                    "BorrowerBirthDate",
                    data.date_of_birth.map(|dob| dob.to_wire()).as_deref(),
                )
                .child(XmlElement::leaf(
                    "BorrowerClassificationType",
                    person.classification(),
                )),
        )
        .opt_child(
            (!residences.is_empty()).then(|| XmlElement::new("RESIDENCES").children(residences)),
        );

    let taxpayer = data.ssn.as_ref().map(|ssn| {
        XmlElement::new("TAXPAYER_IDENTIFIERS").child(
            XmlElement::new("TAXPAYER_IDENTIFIER")
                .child(XmlElement::leaf(
                    "TaxpayerIdentifierType",
                    "SocialSecurityNumber",
                ))
                .child(XmlElement::leaf("TaxpayerIdentifierValue", ssn.as_str())),
        )
    });

    XmlElement::new("PARTY")
        .attr(xlink("label"), person.party_label())
        .attr("SequenceNumber", person.sequence_number())
        .child(individual)
        .opt_child(mailing)
        .child(
            XmlElement::new("ROLES").child(
                XmlElement::new("ROLE").child(borrower).child(
                    XmlElement::new("ROLE_DETAIL")
                        .child(XmlElement::leaf("PartyRoleType", "Borrower")),
                ),
            ),
        )
        .opt_child(taxpayer)
}

fn residence(address: &Address, residency: &str) -> XmlElement {
    XmlElement::new("RESIDENCE")
        .child(address.to_xml(None))
        .child(
            XmlElement::new("RESIDENCE_DETAIL")
                .child(XmlElement::leaf("BorrowerResidencyType", residency)),
        )
}

fn relationships(ctx: &RequestContext) -> Option<XmlElement> {
    let party_edges = present_parties(ctx).map(|person| {
        relationship(
            arcrole::PARTY_VERIFIED_BY_SERVICE,
            person.party_label(),
            SERVICE_LABEL,
        )
    });
    let property_edge = ctx.subject_property.as_ref().map(|_| {
        relationship(
            arcrole::PROPERTY_VERIFIED_BY_SERVICE,
            PROPERTY_LABEL,
            SERVICE_LABEL,
        )
    });

    Some(XmlElement::new("RELATIONSHIPS").children(party_edges.chain(property_edge)))
}

fn relationship(role: &str, from: &str, to: &str) -> XmlElement {
    XmlElement::new("RELATIONSHIP")
        .attr(xlink("arcrole"), role)
        .attr(xlink("from"), from)
        .attr(xlink("to"), to)
}

fn service_element(ctx: &RequestContext, service: &ServiceRequest<'_>) -> XmlElement {
    let payments = ctx
        .payment
        .as_ref()
        .filter(|_| service.include_payment)
        .map(|card| XmlElement::new("SERVICE_PAYMENTS").child(card.to_xml(None)));

    let fulfillment = service.vendor_order_id.map(|id| {
        XmlElement::new("SERVICE_PRODUCT_FULFILLMENT").child(
            XmlElement::new("SERVICE_PRODUCT_FULFILLMENT_DETAIL")
                .child(XmlElement::leaf("VendorOrderIdentifier", id)),
        )
    });

    XmlElement::new("SERVICE")
        .attr(xlink("label"), SERVICE_LABEL)
        .child(
            XmlElement::new("CREDIT").child(
                XmlElement::new("CREDIT_REQUEST").child(
                    XmlElement::new("CREDIT_REQUEST_DATAS").child(
                        XmlElement::new("CREDIT_REQUEST_DATA")
                            .child(repositories(ctx))
                            .child(request_detail(ctx, service.action)),
                    ),
                ),
            ),
        )
        .opt_child(payments)
        .child(product(ctx))
        .opt_child(fulfillment)
}

fn repositories(ctx: &RequestContext) -> XmlElement {
    let bureaus: [(&str, &BureauOptions); 3] = [
        ("Equifax", &ctx.equifax),
        ("Experian", &ctx.experian),
        ("TransUnion", &ctx.transunion),
    ];

    let mut addons = XmlElement::new("OTHER")
        .child(XmlElement::flag(vendor("REQUEST_EQUIFAX_SCORE"), ctx.equifax.score));
    for (name, options) in [("EXPERIAN", &ctx.experian), ("TRANSUNION", &ctx.transunion)] {
        addons.push(XmlElement::flag(
            vendor(&format!("REQUEST_{}_FRAUD", name)),
            options.fraud.unwrap_or(false),
        ));
        addons.push(XmlElement::flag(
            vendor(&format!("REQUEST_{}_SCORE", name)),
            options.score,
        ));
    }

    XmlElement::new("CREDIT_REPOSITORY_INCLUDED")
        .children(bureaus.into_iter().map(|(name, options)| {
            XmlElement::flag(
                format!("CreditRepositoryIncluded{}Indicator", name),
                options.credit,
            )
        }))
        .child(XmlElement::new("EXTENSION").child(addons))
}

fn request_detail(ctx: &RequestContext, action: ActionType) -> XmlElement {
    let detail = match action {
        ActionType::Direct(kind) => XmlElement::new("CREDIT_REQUEST_DATA_DETAIL")
            .child(XmlElement::leaf("CreditReportRequestActionType", kind.as_str())),
        ActionType::Other(kind) => XmlElement::new("CREDIT_REQUEST_DATA_DETAIL")
            .child(XmlElement::leaf("CreditReportRequestActionType", "Other"))
            .child(XmlElement::leaf(
                "CreditReportRequestActionTypeOtherDescription",
                kind.as_str(),
            )),
    };

    detail
        .child(XmlElement::leaf("CreditReportType", "Merge"))
        .child(XmlElement::leaf(
            "CreditRequestType",
            if ctx.has_coborrower() {
                "Joint"
            } else {
                "Individual"
            },
        ))
}

fn product(ctx: &RequestContext) -> XmlElement {
    let formats = ctx
        .response_formats
        .to_xml(Some(VENDOR_PREFIX))
        .map(|formats| XmlElement::new("EXTENSION").child(XmlElement::new("OTHER").child(formats)));

    XmlElement::new("SERVICE_PRODUCT").child(
        XmlElement::new("SERVICE_PRODUCT_REQUEST").child(
            XmlElement::new("SERVICE_PRODUCT_DETAIL")
                .child(XmlElement::leaf("ServiceProductDescription", "CreditOrder"))
                .opt_child(formats),
        ),
    )
}
