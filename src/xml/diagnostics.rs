//! XML syntax diagnostics with source-located error messages

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::ops::Range;
use thiserror::Error;

/// XML syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("XML syntax error: {message}")]
#[diagnostic(code(lcv::xml::syntax))]
pub struct XmlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,
}

impl XmlSyntaxError {
    /// Create a syntax error from an `xmlparser` tokenizer error
    pub fn from_tokenizer_error(err: &xmlparser::Error, source: &str, filename: &str) -> Self {
        let pos = err.pos();
        let offset = line_col_to_offset(source, pos.row as usize, pos.col as usize);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1).min(source.len().max(1))),
            help,
            message,
        }
    }

    /// Create a syntax error covering a byte range of the source
    pub fn at_span(
        message: impl Into<String>,
        source: &str,
        filename: &str,
        span: Range<usize>,
        help: Option<String>,
    ) -> Self {
        let message = message.into();
        let help = help.or_else(|| generate_help(&message));
        let span = if span.is_empty() {
            span.start..span.start.saturating_add(1)
        } else {
            span
        };

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(span),
            help,
            message,
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

/// Convert 1-based line/column to byte offset
pub(crate) fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut current_line = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            let line_start = i;
            let mut col = 1;
            for (j, c) in source[line_start..].char_indices() {
                if col == column {
                    return line_start + j;
                }
                if c == '\n' {
                    break;
                }
                col += 1;
            }
            return (line_start + column.saturating_sub(1)).min(source.len());
        }
        if ch == '\n' {
            current_line += 1;
        }
        offset = i;
    }

    offset
}

/// Convert a byte offset to 1-based line/column
pub(crate) fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

/// Generate helpful suggestions based on error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("unknown entity") {
        return Some(
            "Only &lt; &gt; &amp; &apos; &quot;, character references and entities declared in the DTD can be used"
                .to_string(),
        );
    }

    if msg_lower.contains("not closed") || msg_lower.contains("unexpected end") {
        return Some("Every opening tag needs a matching closing tag".to_string());
    }

    if msg_lower.contains("closing tag") {
        return Some("Closing tags must match the most recently opened element".to_string());
    }

    if msg_lower.contains("prefix") {
        return Some("Declare the namespace prefix with xmlns:prefix=\"...\" or remove it".to_string());
    }

    if msg_lower.contains("root element") {
        return Some("A document must have exactly one root element".to_string());
    }

    if msg_lower.contains("invalid attribute") || msg_lower.contains("quote") {
        return Some("Attribute values must be enclosed in matching quotes".to_string());
    }

    None
}
