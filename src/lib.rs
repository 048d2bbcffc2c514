//! # smartapi-credit Library
//!
//! Codec for the MISMO 3.4 SmartAPI credit-reporting protocol: builds order
//! request documents from a typed request context and resolves the
//! label/arcrole relationship graph of response documents into per-person
//! bureau results, scores, liabilities, and embedded reports. An async HTTP
//! transport and a submit-then-poll orchestrator sit on top of the codec.

pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod http_client;
pub mod output;
pub mod poller;
pub mod request;
pub mod resolver;
pub mod serializer;
pub mod xml;

pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{CreditError, ErrorCategory, Result};
pub use fields::{
    Address, BirthDate, EmailAddress, PaymentCard, PersonName, PhoneNumber, ResponseFormat,
    ResponseFormats, Ssn,
};
pub use http_client::{ApiCredentials, HttpClientConfig, SmartApiClient, Transport};
pub use output::Output;
pub use poller::{AbortSignal, PollOutcome, Poller};
pub use request::{BureauOptions, LoanInfo, Person, PersonData, RequestContext, RequestKind};
pub use resolver::{
    BureauResponse, CreditScore, Liability, PersonSummary, Rating, ReportDocument, ReportSummary,
    ResponseResolver, ScoreFactor, Status, StatusCode,
};
pub use serializer::{RequestSerializer, serialize};
