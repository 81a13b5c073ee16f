//! XML parsing, schema-checked loading and serialization

pub mod diagnostics;
pub mod tree;
pub mod writer;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::lifecycle::ModelError;
use crate::schema::validator::{ValidationError, Validator};

pub use diagnostics::XmlSyntaxError;
pub use tree::{Attribute, Element, Node, Text};

/// Namespace of S3 API documents
pub const XMLNS_S3: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Errors from loading an XML document
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] XmlSyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationError),

    #[error("no schema for root element <{root_tag}> (looked for '{schema}')")]
    #[diagnostic(
        code(lcv::schema::not_found),
        help("Run 'lcv schema list' to see the available schemas")
    )]
    SchemaNotFound { root_tag: String, schema: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

/// Parse `text` into a namespace-cleaned element tree
///
/// When `root_tag` is given the document is validated against the schema
/// registered for that root element before the tree is returned.
pub fn fromstring(text: &str, root_tag: Option<&str>) -> Result<Element, DocumentError> {
    Validator::default().parse(text, "<input>", root_tag)
}
