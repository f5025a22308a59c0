//! Output schema validation
//!
//! The crawl output is a JSON array of objects, each with the string fields
//! `url`, `title`, `publish_date`, `author`, `raw_html` and `clean_text`.
//! `url` must also be an absolute URI. Validation collects every violation
//! instead of stopping at the first one.

mod validator;

pub use validator::{SchemaValidator, ValidationReport, Violation, REQUIRED_FIELDS};
