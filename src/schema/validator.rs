//! Schema validation with detailed error reporting

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::core::lifecycle::LifecycleConfiguration;
use crate::core::lint::{lint, LintWarning};
use crate::schema::datatypes::Datatype;
use crate::schema::grammar::{Content, ElementRule, Member, Particle};
use crate::schema::registry::{camel_to_snake, Schema, SchemaRegistry};
use crate::xml::diagnostics::offset_to_line_col;
use crate::xml::tree::{self, Element};
use crate::xml::{DocumentError, XmlSyntaxError};

/// Storage classes accepted when configuration does not override them
pub const DEFAULT_STORAGE_CLASSES: [&str; 4] =
    ["STANDARD", "REDUCED_REDUNDANCY", "GLACIER", "UNKNOWN"];

/// Validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed: {summary}")]
#[diagnostic(code(lcv::schema::validation_error))]
pub struct ValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    /// Get the number of violations
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Result of validation
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// Number of rules in a lifecycle document
    pub rules: usize,
    /// Rules with `Status` Enabled
    pub enabled_rules: usize,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            rules: 0,
            enabled_rules: 0,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub suggestion: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Grammar validator
#[derive(Debug, Clone)]
pub struct Validator {
    registry: SchemaRegistry,
    storage_classes: Vec<String>,
    strict: bool,
}

impl Validator {
    /// Create a new validator with schemas from the registry
    pub fn new(registry: &SchemaRegistry) -> Self {
        Self {
            registry: *registry,
            storage_classes: DEFAULT_STORAGE_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strict: false,
        }
    }

    /// Replace the accepted `StorageClass` values
    pub fn with_storage_classes(mut self, storage_classes: Vec<String>) -> Self {
        self.storage_classes = storage_classes;
        self
    }

    /// Report lint findings as errors instead of warnings
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn storage_classes(&self) -> &[String] {
        &self.storage_classes
    }

    /// Parse a document, validating it when `root_tag` names a schema
    pub fn parse(
        &self,
        content: &str,
        filename: &str,
        root_tag: Option<&str>,
    ) -> Result<Element, DocumentError> {
        let root = tree::parse(content, filename).inspect_err(|e| {
            debug!(filename, error = %e.message(), "XML syntax error");
        })?;

        let Some(root_tag) = root_tag else {
            return Ok(root);
        };

        let schema = self.registry.find_by_root_tag(root_tag).ok_or_else(|| {
            let schema = camel_to_snake(root_tag);
            error!(root_tag, schema = %schema, "no schema registered for root element");
            DocumentError::SchemaNotFound {
                root_tag: root_tag.to_string(),
                schema,
            }
        })?;

        let violations = self.check(&root, schema);
        if violations.is_empty() {
            Ok(root)
        } else {
            debug!(
                filename,
                violations = violations.len(),
                "document failed schema validation"
            );
            Err(ValidationError::new(filename, content, violations).into())
        }
    }

    /// Validate a document and run lints over it
    ///
    /// Without `root_tag` the schema is chosen from the document's own root
    /// element. Every failure, including XML syntax errors, comes back as a
    /// [`ValidationError`] that renders with source context.
    pub fn validate(
        &self,
        content: &str,
        filename: &str,
        root_tag: Option<&str>,
    ) -> Result<ValidationResult, ValidationError> {
        trace!(filename, "validating document");

        let root = tree::parse(content, filename).map_err(|e| {
            debug!(filename, error = %e.message(), "XML syntax error");
            ValidationError::new(filename, content, vec![syntax_violation(&e)])
        })?;

        let root_tag = root_tag.unwrap_or(root.name.as_str());
        let Some(schema) = self.registry.find_by_root_tag(root_tag) else {
            error!(root_tag, "no schema registered for root element");
            let violation = SchemaViolation::new(
                format!("No schema for root element <{}>", root_tag),
                "unknown document type".to_string(),
                source_span(&root.name_span),
                Some("Run 'lcv schema list' to see the available schemas".to_string()),
            );
            return Err(ValidationError::new(filename, content, vec![violation]));
        };

        let violations = self.check(&root, schema);
        if !violations.is_empty() {
            debug!(
                filename,
                violations = violations.len(),
                "document failed schema validation"
            );
            return Err(ValidationError::new(filename, content, violations));
        }

        let mut result = ValidationResult::success();
        if root.name == LifecycleConfiguration::ROOT_TAG {
            let config = LifecycleConfiguration::from_element(&root).map_err(|e| {
                let violation = SchemaViolation::new(
                    e.to_string(),
                    "invalid document".to_string(),
                    source_span(&root.name_span),
                    None,
                );
                ValidationError::new(filename, content, vec![violation])
            })?;
            result.rules = config.rules.len();
            result.enabled_rules = config.enabled_rules().count();

            let issues: Vec<ValidationIssue> = lint(&config)
                .iter()
                .map(|w| lint_issue(content, &root, w))
                .collect();
            if self.strict {
                result.valid = issues.is_empty();
                result.errors = issues;
            } else {
                result.warnings = issues;
            }
        }

        Ok(result)
    }

    /// Validate a file directly
    pub fn validate_file(
        &self,
        path: &Path,
    ) -> Result<ValidationResult, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let filename = path.display().to_string();
        self.validate(&content, &filename, None)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    /// Check a parsed tree against a schema, collecting every violation
    fn check(&self, root: &Element, schema: &Schema) -> Vec<SchemaViolation> {
        let mut checker = Checker {
            storage_classes: &self.storage_classes,
            violations: Vec::new(),
        };

        if root.name == schema.root.name {
            checker.element(root, schema.root, &format!("/{}", root.name));
        } else {
            checker.report(
                format!(
                    "Root element is <{}>, expected <{}>",
                    root.name, schema.root.name
                ),
                "wrong root element",
                &root.name_span,
                Some(format!(
                    "Documents for the '{}' schema start with <{}>",
                    schema.name, schema.root.name
                )),
            );
        }

        checker.violations
    }
}

impl Default for Validator {
    fn default() -> Self {
        let registry = SchemaRegistry::default();
        Self::new(&registry)
    }
}

struct Checker<'a> {
    storage_classes: &'a [String],
    violations: Vec<SchemaViolation>,
}

impl Checker<'_> {
    fn report(
        &mut self,
        message: String,
        hint: impl Into<String>,
        span: &Range<usize>,
        help: Option<String>,
    ) {
        self.violations.push(SchemaViolation::new(
            message,
            hint.into(),
            source_span(span),
            help,
        ));
    }

    fn element(&mut self, el: &Element, rule: &ElementRule, path: &str) {
        for attr in &el.attributes {
            self.report(
                format!(
                    "Attribute '{}' is not allowed on <{}> at {}",
                    attr.name, el.name, path
                ),
                "unexpected attribute",
                &attr.span,
                Some(format!("Remove the '{}' attribute", attr.name)),
            );
        }

        match &rule.content {
            Content::Value(datatype) => self.value(el, *datatype, path),
            Content::Interleave(members) => self.interleave(el, members, path),
        }
    }

    fn value(&mut self, el: &Element, datatype: Datatype, path: &str) {
        for child in el.elements() {
            self.report(
                format!(
                    "Element <{}> is not allowed inside <{}> at {}",
                    child.name, el.name, path
                ),
                "unexpected element",
                &child.name_span,
                Some(format!(
                    "<{}> holds a {} value, not elements",
                    el.name,
                    datatype.label()
                )),
            );
        }

        if let Err(err) = datatype.check(&el.text(), self.storage_classes) {
            let span = el.text_span().unwrap_or_else(|| el.name_span.clone());
            self.report(
                format!("Invalid value for <{}> at {}: {}", el.name, path, err),
                err.hint(),
                &span,
                err.help(),
            );
        }
    }

    fn interleave(&mut self, el: &Element, members: &[Member], path: &str) {
        for text in el.texts() {
            if !is_xml_whitespace(&text.value) {
                self.report(
                    format!("Unexpected text in <{}> at {}", el.name, path),
                    "unexpected text",
                    &text.span,
                    Some(format!("<{}> contains only child elements", el.name)),
                );
            }
        }

        // First element matched by each member
        let mut seen: Vec<Option<&Element>> = vec![None; members.len()];
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for child in el.elements() {
            let matched = members.iter().enumerate().find_map(|(index, member)| {
                member
                    .particle
                    .matching(&child.name)
                    .map(|child_rule| (index, member, child_rule))
            });

            let Some((index, member, child_rule)) = matched else {
                let allowed = members
                    .iter()
                    .flat_map(|m| m.particle.names())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report(
                    format!(
                        "Unexpected element <{}> in <{}> at {}",
                        child.name, el.name, path
                    ),
                    "unexpected element",
                    &child.name_span,
                    Some(format!("Allowed elements: {}", allowed)),
                );
                continue;
            };

            let child_path = if member.occurs.is_repeatable() {
                let position = positions.entry(child_rule.name).or_insert(0);
                *position += 1;
                format!("{}/{}[{}]", path, child_rule.name, position)
            } else {
                format!("{}/{}", path, child_rule.name)
            };

            let first = seen[index];
            match first {
                None => seen[index] = Some(child),
                Some(_) if member.occurs.is_repeatable() => {}
                Some(first) if first.name == child.name => self.report(
                    format!(
                        "Duplicate element <{}> in <{}> at {}",
                        child.name, el.name, path
                    ),
                    "duplicate element",
                    &child.name_span,
                    Some(format!(
                        "<{}> may appear only once in <{}>",
                        child.name, el.name
                    )),
                ),
                Some(first) => self.report(
                    format!(
                        "<{}> conflicts with <{}> in <{}> at {}",
                        child.name, first.name, el.name, path
                    ),
                    "conflicting choice",
                    &child.name_span,
                    Some(format!(
                        "Use exactly one of {}",
                        member.particle.names().join(", ")
                    )),
                ),
            }

            self.element(child, child_rule, &child_path);
        }

        for (member, first) in members.iter().zip(&seen) {
            if first.is_some() || !member.occurs.is_required() {
                continue;
            }
            match &member.particle {
                Particle::Element(required) => self.report(
                    format!(
                        "Missing required element <{}> in <{}> at {}",
                        required.name, el.name, path
                    ),
                    format!("missing <{}>", required.name),
                    &el.name_span,
                    Some(format!("Add a <{}> element to <{}>", required.name, el.name)),
                ),
                Particle::Choice(_) => {
                    let expected = member.particle.names().join(", ");
                    self.report(
                        format!("<{}> at {} expected one of {}", el.name, path, expected),
                        "missing choice",
                        &el.name_span,
                        Some(format!("Add exactly one of {}", expected)),
                    )
                }
            }
        }
    }
}

fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

fn source_span(span: &Range<usize>) -> SourceSpan {
    SourceSpan::from(span.clone())
}

/// Fold an XML syntax error into a single schema violation
fn syntax_violation(err: &XmlSyntaxError) -> SchemaViolation {
    SchemaViolation::new(
        format!("XML syntax error: {}", err.message()),
        "invalid XML".to_string(),
        err.span(),
        err.help_text().map(str::to_string),
    )
}

/// Locate a lint warning at its rule element
fn lint_issue(content: &str, root: &Element, warning: &LintWarning) -> ValidationIssue {
    let (path, offset) = match warning.rule_index {
        Some(index) => (
            format!("/{}/Rule[{}]", root.name, index + 1),
            root.children_named("Rule")
                .nth(index)
                .map_or(root.span.start, |rule| rule.span.start),
        ),
        None => (format!("/{}", root.name), root.span.start),
    };
    let (line, column) = offset_to_line_col(content, offset);

    ValidationIssue {
        path,
        message: warning.to_string(),
        suggestion: warning.suggestion(),
        line: Some(line),
        column: Some(column),
    }
}
