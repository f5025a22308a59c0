//! Validation of crawl output against the fixed record schema
//!
//! Every violation is collected with a `$` / `[index].field` path and the
//! offending value; validation never stops at the first problem.

use crate::crawler::Record;
use crate::output::{CrawlEvent, CrawlReporter};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// Fields every record object must carry, as strings
pub const REQUIRED_FIELDS: &[&str] = &[
    "url",
    "title",
    "publish_date",
    "author",
    "raw_html",
    "clean_text",
];

/// Field additionally required to be an absolute URI
const URI_FIELD: &str = "url";

/// One schema violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// `$` for the document, `[index]` for an item, `[index].field` for a field
    pub path: String,
    pub message: String,
    /// The offending value; the whole record when a field is missing
    pub offending_value: Value,
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Violations in document order
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// Reports every violation as a [`CrawlEvent::SchemaViolation`]
    pub fn emit(&self, reporter: &dyn CrawlReporter) {
        for violation in &self.violations {
            reporter.report(&CrawlEvent::SchemaViolation {
                path: violation.path.clone(),
                message: violation.message.clone(),
            });
        }
    }
}

/// Validates crawl output against the fixed record schema
///
/// Validation is read-only.
///
/// # Example
///
/// ```
/// use multisite_crawler::SchemaValidator;
/// use serde_json::json;
///
/// let document = json!([{
///     "url": "https://example.com/a",
///     "title": "A",
///     "publish_date": "",
///     "raw_html": "<h1>A</h1>",
///     "clean_text": "A"
/// }]);
///
/// let report = SchemaValidator::new().validate_document(&document);
/// assert!(!report.valid);
/// assert_eq!(report.violations[0].path, "[0].author");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates records as they will be persisted
    pub fn validate_records(&self, records: &[Record]) -> ValidationReport {
        match serde_json::to_value(records) {
            Ok(document) => self.validate_document(&document),
            Err(e) => ValidationReport::from_violations(vec![Violation {
                path: "$".to_string(),
                message: format!("records could not be serialized: {}", e),
                offending_value: Value::Null,
            }]),
        }
    }

    /// Validates an arbitrary JSON document
    pub fn validate_document(&self, document: &Value) -> ValidationReport {
        let Some(items) = document.as_array() else {
            return ValidationReport::from_violations(vec![Violation {
                path: "$".to_string(),
                message: format!("expected an array, found {}", type_name(document)),
                offending_value: document.clone(),
            }]);
        };

        let mut violations = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match item.as_object() {
                Some(fields) => check_record(index, item, fields, &mut violations),
                None => violations.push(Violation {
                    path: format!("[{}]", index),
                    message: format!("expected an object, found {}", type_name(item)),
                    offending_value: item.clone(),
                }),
            }
        }

        ValidationReport::from_violations(violations)
    }
}

fn check_record(
    index: usize,
    record: &Value,
    fields: &Map<String, Value>,
    violations: &mut Vec<Violation>,
) {
    for &field in REQUIRED_FIELDS {
        let path = format!("[{}].{}", index, field);

        let Some(value) = fields.get(field) else {
            violations.push(Violation {
                path,
                message: format!("missing required field '{}'", field),
                offending_value: record.clone(),
            });
            continue;
        };

        let Some(text) = value.as_str() else {
            violations.push(Violation {
                path,
                message: format!("expected a string, found {}", type_name(value)),
                offending_value: value.clone(),
            });
            continue;
        };

        if field == URI_FIELD {
            if let Err(e) = Url::parse(text) {
                violations.push(Violation {
                    path,
                    message: format!("not a valid URI: {}", e),
                    offending_value: value.clone(),
                });
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryReporter;
    use serde_json::json;

    fn record(url: &str, author: &str) -> Record {
        Record {
            source_url: url.to_string(),
            title: "Title".to_string(),
            publish_date: String::new(),
            author: author.to_string(),
            raw_html: "<h1>Title</h1>".to_string(),
            clean_text: "Title".to_string(),
        }
    }

    #[test]
    fn test_valid_records() {
        let records = vec![record("https://a.com/1", "Ada"), record("http://x/a", "")];
        let report = SchemaValidator::new().validate_records(&records);
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_empty_document_is_valid() {
        assert!(SchemaValidator::new().validate_records(&[]).valid);
        assert!(SchemaValidator::new().validate_document(&json!([])).valid);
    }

    #[test]
    fn test_one_missing_author() {
        let records = vec![
            record("https://a.com/1", "Ada"),
            record("https://a.com/2", "Grace"),
            record("https://a.com/3", "Alan"),
        ];
        let mut document = serde_json::to_value(&records).unwrap();
        document[1].as_object_mut().unwrap().remove("author");

        let report = SchemaValidator::new().validate_document(&document);

        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].path, "[1].author");
        assert_eq!(report.violations[0].offending_value, document[1]);
    }

    #[test]
    fn test_collects_every_violation() {
        let document = json!([
            {
                "url": "not a uri",
                "title": 7,
                "publish_date": null,
                "author": "",
                "raw_html": "",
                "clean_text": ""
            },
            "loose string",
            { "url": "https://a.com/" }
        ]);

        let report = SchemaValidator::new().validate_document(&document);
        let paths: Vec<_> = report.violations.iter().map(|v| v.path.as_str()).collect();

        assert_eq!(
            paths,
            [
                "[0].url",
                "[0].title",
                "[0].publish_date",
                "[1]",
                "[2].title",
                "[2].publish_date",
                "[2].author",
                "[2].raw_html",
                "[2].clean_text",
            ]
        );
        assert_eq!(report.violations[1].offending_value, json!(7));
        assert_eq!(report.violations[3].offending_value, json!("loose string"));
    }

    #[test]
    fn test_non_array_document() {
        let report = SchemaValidator::new().validate_document(&json!({"records": []}));
        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].path, "$");
    }

    #[test]
    fn test_invalid_source_url_in_records() {
        let report = SchemaValidator::new().validate_records(&[record("/relative", "")]);
        assert!(!report.valid);
        assert_eq!(report.violations[0].path, "[0].url");
        assert_eq!(report.violations[0].offending_value, json!("/relative"));
    }

    #[test]
    fn test_emit_reports_violations() {
        let report = SchemaValidator::new().validate_document(&json!([{}]));
        let reporter = MemoryReporter::new();
        report.emit(&reporter);

        assert_eq!(report.violations.len(), REQUIRED_FIELDS.len());
        assert_eq!(
            reporter.count(|e| matches!(e, CrawlEvent::SchemaViolation { .. })),
            REQUIRED_FIELDS.len()
        );
    }
}
