//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use smartapi_credit::request::{RequestContext, RequestKind};
use smartapi_credit::fields::Address;

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn completed_response(&self) -> PathBuf {
        self.fixtures_dir.join("response_completed.xml")
    }

    pub fn joint_order(&self) -> PathBuf {
        self.fixtures_dir.join("order_joint.toml")
    }

    pub fn status_query(&self) -> PathBuf {
        self.fixtures_dir.join("status_query.json")
    }

    pub fn completed_response_xml(&self) -> String {
        std::fs::read_to_string(self.completed_response()).expect("fixture response is readable")
    }
}

/// Minimal response carrying only a status and an order identifier
pub fn status_response(code: &str, vendor_order_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<MESSAGE xmlns="http://www.mismo.org/residential/2009/schemas">
  <DEAL_SETS><DEAL_SET><DEALS><DEAL><SERVICES><SERVICE>
    <SERVICE_PRODUCT_FULFILLMENT><SERVICE_PRODUCT_FULFILLMENT_DETAIL>
      <VendorOrderIdentifier>{}</VendorOrderIdentifier>
    </SERVICE_PRODUCT_FULFILLMENT_DETAIL></SERVICE_PRODUCT_FULFILLMENT>
    <STATUSES><STATUS><StatusCode>{}</StatusCode></STATUS></STATUSES>
  </SERVICE></SERVICES></DEAL></DEALS></DEAL_SET></DEAL_SETS>
</MESSAGE>"#,
        vendor_order_id, code
    )
}

/// Borrower-only submit context that passes validation
pub fn submit_context() -> RequestContext {
    let mut ctx = RequestContext::new(RequestKind::Submit);
    ctx.borrower.set_name("Ann", "Smith").unwrap();
    ctx.borrower.set_ssn("000-00-0015").unwrap();
    ctx.borrower
        .set_current_address(Address::new("1 Main St", "Denver", "CO", "80202").unwrap());
    ctx.set_experian(true, true, false);
    ctx
}
