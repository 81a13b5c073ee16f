//! Element tree built from the `xmlparser` token stream
//!
//! The tree keeps byte spans for every element, attribute and text run so
//! that schema violations can point back into the original document.
//! Element names are namespace-cleaned while building: names in the S3
//! namespace or in the in-scope default namespace are reduced to their
//! local part, names in any other namespace become `{uri}local`.

use std::collections::HashMap;
use std::ops::Range;
use xmlparser::{ElementEnd, EntityDefinition, StrSpan, Token, Tokenizer};

use crate::xml::diagnostics::XmlSyntaxError;
use crate::xml::XMLNS_S3;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Nesting limit for entities referring to other entities
const MAX_ENTITY_DEPTH: usize = 8;

/// Upper bound on the text produced by expanding one run of character data
const MAX_EXPANDED_LEN: usize = 1 << 20;

/// A parsed XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Namespace-cleaned element name
    pub name: String,

    /// Name as written in the document (`prefix:local` or `local`)
    pub qname: String,

    /// Span of the name inside the start tag
    pub name_span: Range<usize>,

    /// Span of the whole element, start tag through end tag
    pub span: Range<usize>,

    /// Attributes other than namespace declarations
    pub attributes: Vec<Attribute>,

    pub children: Vec<Node>,
}

/// A non-namespace attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: Range<usize>,
}

/// Child content of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// A run of character data (text or CDATA) with entities resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub value: String,
    pub span: Range<usize>,
}

impl Element {
    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Text runs in document order
    pub fn texts(&self) -> impl Iterator<Item = &Text> {
        self.children.iter().filter_map(|node| match node {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// All child elements with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |el| el.name == name)
    }

    /// Concatenated character data of this element (direct children only)
    pub fn text(&self) -> String {
        self.texts().map(|t| t.value.as_str()).collect()
    }

    /// Span covering all direct text runs, if there are any
    pub fn text_span(&self) -> Option<Range<usize>> {
        let mut texts = self.texts();
        let first = texts.next()?;
        let end = texts.last().map_or(first.span.end, |t| t.span.end);
        Some(first.span.start..end)
    }
}

/// An element whose start tag has been seen but not yet closed
struct OpenElement {
    prefix: String,
    local: String,
    name_span: Range<usize>,
    start: usize,
    attributes: Vec<Attribute>,
    /// Namespace declarations made on this element (prefix "" is the default)
    declarations: Vec<(String, String)>,
    children: Vec<Node>,
    /// Cleaned name, resolved once the start tag is complete
    name: String,
}

struct TreeBuilder<'a> {
    source: &'a str,
    filename: &'a str,
    stack: Vec<OpenElement>,
    /// Namespace bindings in scope, innermost last
    scopes: Vec<(String, String)>,
    entities: HashMap<String, String>,
    root: Option<Element>,
}

/// Parse an XML document into an element tree
pub fn parse(source: &str, filename: &str) -> Result<Element, XmlSyntaxError> {
    let mut builder = TreeBuilder {
        source,
        filename,
        stack: Vec::new(),
        scopes: vec![("xml".to_string(), XML_NAMESPACE.to_string())],
        entities: HashMap::new(),
        root: None,
    };

    for token in Tokenizer::from(source) {
        let token =
            token.map_err(|e| XmlSyntaxError::from_tokenizer_error(&e, source, filename))?;
        builder.feed(token)?;
    }

    builder.finish()
}

impl<'a> TreeBuilder<'a> {
    fn error(&self, message: impl Into<String>, span: Range<usize>) -> XmlSyntaxError {
        XmlSyntaxError::at_span(message, self.source, self.filename, span, None)
    }

    fn feed(&mut self, token: Token<'a>) -> Result<(), XmlSyntaxError> {
        match token {
            Token::Declaration { .. }
            | Token::ProcessingInstruction { .. }
            | Token::Comment { .. }
            | Token::DtdStart { .. }
            | Token::EmptyDtd { .. }
            | Token::DtdEnd { .. } => Ok(()),
            Token::EntityDeclaration {
                name,
                definition,
                span,
            } => match definition {
                EntityDefinition::EntityValue(value) => {
                    if value.as_str().contains('<') {
                        return Err(self.error(
                            format!("markup in entity '{}' is not supported", name.as_str()),
                            value.range(),
                        ));
                    }
                    self.entities
                        .entry(name.as_str().to_string())
                        .or_insert_with(|| value.as_str().to_string());
                    Ok(())
                }
                EntityDefinition::ExternalId(_) => Err(self.error(
                    format!("external entity '{}' is not supported", name.as_str()),
                    span.range(),
                )),
            },
            Token::ElementStart {
                prefix,
                local,
                span,
            } => {
                if self.stack.is_empty() && self.root.is_some() {
                    return Err(self.error(
                        "only one root element is allowed",
                        span.range(),
                    ));
                }
                let name_start = if prefix.as_str().is_empty() {
                    local.start()
                } else {
                    prefix.start()
                };
                self.stack.push(OpenElement {
                    prefix: prefix.as_str().to_string(),
                    local: local.as_str().to_string(),
                    name_span: name_start..local.end(),
                    start: span.start(),
                    attributes: Vec::new(),
                    declarations: Vec::new(),
                    children: Vec::new(),
                    name: String::new(),
                });
                Ok(())
            }
            Token::Attribute {
                prefix,
                local,
                value,
                span,
            } => self.attribute(prefix, local, value, span),
            Token::ElementEnd { end, span } => match end {
                ElementEnd::Open => self.resolve_start_tag(),
                ElementEnd::Empty => {
                    self.resolve_start_tag()?;
                    self.close(span.end())
                }
                ElementEnd::Close(prefix, local) => {
                    let qname = qualified(prefix.as_str(), local.as_str());
                    let open = self
                        .stack
                        .last()
                        .map(|open| qualified(&open.prefix, &open.local));
                    match open {
                        Some(open) if open == qname => self.close(span.end()),
                        Some(open) => Err(self.error(
                            format!("closing tag </{}> does not match <{}>", qname, open),
                            span.range(),
                        )),
                        None => Err(self.error(
                            format!("closing tag </{}> has no matching opening tag", qname),
                            span.range(),
                        )),
                    }
                }
            },
            Token::Text { text } => {
                let value = self.unescape(text)?;
                self.push_text(value, text.range())
            }
            Token::Cdata { text, span } => {
                let mut value = String::with_capacity(text.as_str().len());
                push_normalized(&mut value, text.as_str());
                self.push_text(value, span.range())
            }
        }
    }

    fn attribute(
        &mut self,
        prefix: StrSpan<'a>,
        local: StrSpan<'a>,
        value: StrSpan<'a>,
        span: StrSpan<'a>,
    ) -> Result<(), XmlSyntaxError> {
        if self.stack.is_empty() {
            return Err(self.error("attribute outside of an element", span.range()));
        }
        let resolved = self.unescape(value)?;

        if let Some(open) = self.stack.last_mut() {
            match (prefix.as_str(), local.as_str()) {
                ("", "xmlns") => open.declarations.push((String::new(), resolved)),
                ("xmlns", declared) => open.declarations.push((declared.to_string(), resolved)),
                (prefix, local) => open.attributes.push(Attribute {
                    name: qualified(prefix, local),
                    value: resolved,
                    span: span.range(),
                }),
            }
        }
        Ok(())
    }

    /// Bring the element's namespace declarations into scope and clean its name
    fn resolve_start_tag(&mut self) -> Result<(), XmlSyntaxError> {
        let Some(open) = self.stack.last() else {
            return Ok(());
        };
        let declarations = open.declarations.clone();
        let prefix = open.prefix.clone();
        let local = open.local.clone();
        let name_span = open.name_span.clone();

        self.scopes.extend(declarations);

        let namespace = self.lookup(&prefix);
        if !prefix.is_empty() && namespace.is_none() {
            return Err(self.error(
                format!("undeclared namespace prefix '{}'", prefix),
                name_span,
            ));
        }

        let name = clean_name(&local, namespace, self.lookup(""));
        if let Some(open) = self.stack.last_mut() {
            open.name = name;
        }
        Ok(())
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn close(&mut self, end: usize) -> Result<(), XmlSyntaxError> {
        let Some(open) = self.stack.pop() else {
            return Ok(());
        };
        let keep = self.scopes.len() - open.declarations.len();
        self.scopes.truncate(keep);

        let element = Element {
            name: open.name,
            qname: qualified(&open.prefix, &open.local),
            name_span: open.name_span,
            span: open.start..end,
            attributes: open.attributes,
            children: open.children,
        };

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }

    fn push_text(&mut self, value: String, span: Range<usize>) -> Result<(), XmlSyntaxError> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(Node::Text(Text { value, span }));
                Ok(())
            }
            None if value.trim().is_empty() => Ok(()),
            None => Err(self.error("text is not allowed outside the root element", span)),
        }
    }

    /// Resolve entity and character references in raw character data
    ///
    /// Line endings in the literal text are normalized to `\n` first, so a
    /// `&#13;` reference is the only way to keep a carriage return.
    fn unescape(&self, raw: StrSpan<'a>) -> Result<String, XmlSyntaxError> {
        let text = raw.as_str();
        if !text.contains(['&', '\r']) {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        self.expand(text, raw.start(), None, 0, &mut out)?;
        Ok(out)
    }

    /// Append `text` to `out` with references resolved
    ///
    /// `base` is the source offset of `text`. Inside an entity's replacement
    /// text, `reference` is the span of the `&name;` that pulled it in and
    /// every error points there.
    fn expand(
        &self,
        text: &str,
        base: usize,
        reference: Option<&Range<usize>>,
        depth: usize,
        out: &mut String,
    ) -> Result<(), XmlSyntaxError> {
        let mut rest = text;
        let mut pos = base;

        while let Some(amp) = rest.find('&') {
            push_normalized(out, &rest[..amp]);
            let after = &rest[amp + 1..];
            let start = pos + amp;
            let Some(semi) = after.find(';') else {
                let span = reference.cloned().unwrap_or(start..start + 1);
                return Err(self.error("unterminated entity reference", span));
            };
            let name = &after[..semi];
            let span = reference.cloned().unwrap_or(start..start + semi + 2);

            match name {
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "amp" => out.push('&'),
                "apos" => out.push('\''),
                "quot" => out.push('"'),
                _ if name.starts_with('#') => {
                    let code = match name.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse::<u32>().ok(),
                    };
                    match code.and_then(char::from_u32).filter(|c| is_xml_char(*c)) {
                        Some(c) => out.push(c),
                        None => {
                            return Err(self.error(
                                format!("invalid character reference &{};", name),
                                span,
                            ))
                        }
                    }
                }
                _ => match self.entities.get(name) {
                    Some(value) => {
                        if depth >= MAX_ENTITY_DEPTH {
                            return Err(self.error(
                                format!("entity &{}; is nested too deeply", name),
                                span,
                            ));
                        }
                        self.expand(value, start, Some(&span), depth + 1, out)?;
                        if out.len() > MAX_EXPANDED_LEN {
                            return Err(self.error(
                                format!(
                                    "entity &{}; expands beyond {} bytes",
                                    name, MAX_EXPANDED_LEN
                                ),
                                span,
                            ));
                        }
                    }
                    None => {
                        return Err(self.error(format!("unknown entity &{};", name), span));
                    }
                },
            }

            let consumed = amp + semi + 2;
            rest = &rest[consumed..];
            pos += consumed;
        }
        push_normalized(out, rest);
        Ok(())
    }

    fn finish(self) -> Result<Element, XmlSyntaxError> {
        if let Some(open) = self.stack.last() {
            return Err(self.error(
                format!(
                    "unexpected end of document: <{}> is not closed",
                    qualified(&open.prefix, &open.local)
                ),
                self.source.len()..self.source.len(),
            ));
        }
        match self.root {
            Some(root) => Ok(root),
            None => Err(self.error("document has no root element", 0..self.source.len())),
        }
    }
}

/// The XML 1.0 `Char` production
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Append literal text with `\r\n` and lone `\r` turned into `\n`
fn push_normalized(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            chars.next_if_eq(&'\n');
            out.push('\n');
        } else {
            out.push(c);
        }
    }
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// Drop the S3 namespace and the default namespace from an element name
fn clean_name(local: &str, namespace: Option<&str>, default_namespace: Option<&str>) -> String {
    match namespace {
        None => local.to_string(),
        Some(ns) if ns == XMLNS_S3 => local.to_string(),
        Some(ns) if Some(ns) == default_namespace => local.to_string(),
        Some(ns) => format!("{{{}}}{}", ns, local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(xml: &str) -> Element {
        parse(xml, "test.xml").expect("document should parse")
    }

    #[test]
    fn test_parse_nested_elements() {
        let root = parse_ok("<a><b>one</b><c/></a>");
        assert_eq!(root.name, "a");
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
        assert_eq!(root.child("b").map(|b| b.text()), Some("one".to_string()));
        assert_eq!(root.span, 0..21);
    }

    #[test]
    fn test_s3_and_default_namespaces_are_removed() {
        let xml = format!(
            r#"<s3:LifecycleConfiguration xmlns:s3="{}"><s3:Rule/></s3:LifecycleConfiguration>"#,
            XMLNS_S3
        );
        let root = parse_ok(&xml);
        assert_eq!(root.name, "LifecycleConfiguration");
        assert_eq!(root.qname, "s3:LifecycleConfiguration");
        assert_eq!(root.elements().next().map(|e| e.name.as_str()), Some("Rule"));

        let root = parse_ok(r#"<Config xmlns="urn:example"><Rule/></Config>"#);
        assert_eq!(root.name, "Config");
        assert_eq!(root.child("Rule").map(|r| r.name.as_str()), Some("Rule"));
    }

    #[test]
    fn test_foreign_namespace_is_kept() {
        let root = parse_ok(r#"<a xmlns:x="urn:other"><x:b/></a>"#);
        assert_eq!(root.elements().next().map(|e| e.name.as_str()), Some("{urn:other}b"));
    }

    #[test]
    fn test_namespace_declarations_are_not_attributes() {
        let root = parse_ok(r#"<a xmlns="urn:x" xmlns:y="urn:y" id="1"/>"#);
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.attributes[0].name, "id");
        assert_eq!(root.attributes[0].value, "1");
    }

    #[test]
    fn test_entities_and_cdata() {
        let root = parse_ok("<a>x &amp; y &#65;&#x42; <![CDATA[<raw>]]></a>");
        assert_eq!(root.text(), "x & y AB <raw>");
    }

    #[test]
    fn test_declared_entity() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE a [
  <!ENTITY logs "logs/">
]>
<a>&logs;</a>"#;
        assert_eq!(parse_ok(xml).text(), "logs/");
    }

    #[test]
    fn test_entity_replacement_text_is_expanded() {
        let xml = r#"<!DOCTYPE a [
  <!ENTITY dir "logs&#47;">
  <!ENTITY path "&dir;2024 &amp; on">
]>
<a>&path;</a>"#;
        assert_eq!(parse_ok(xml).text(), "logs/2024 & on");
    }

    #[test]
    fn test_entity_markup_and_loops_fail() {
        let markup = r#"<!DOCTYPE a [<!ENTITY b "<b/>">]><a>&b;</a>"#;
        let err = parse(markup, "t.xml").unwrap_err();
        assert!(err.message().contains("markup in entity 'b'"));

        let looping = r#"<!DOCTYPE a [<!ENTITY x "&x;">]><a>&x;</a>"#;
        let err = parse(looping, "t.xml").unwrap_err();
        assert!(err.message().contains("nested too deeply"));
        assert_eq!(&looping[err.span().offset()..err.span().offset() + 3], "&x;");
    }

    #[test]
    fn test_character_reference_outside_char_range_fails() {
        for xml in ["<a>a&#1;b</a>", "<a>&#0;</a>", "<a>&#xFFFE;</a>", "<a>&#xD800;</a>"] {
            let err = parse(xml, "t.xml").unwrap_err();
            assert!(err.message().contains("invalid character reference"), "{xml}");
            assert_eq!(err.span().offset(), xml.find('&').unwrap());
        }
        let root = parse_ok("<a>&#9;&#xA;&#x10000;</a>");
        assert_eq!(root.text(), "\t\n\u{10000}");
    }

    #[test]
    fn test_line_endings_are_normalized() {
        assert_eq!(parse_ok("<a>a\r\nb\rc</a>").text(), "a\nb\nc");
        assert_eq!(parse_ok("<a><![CDATA[x\r\ny]]></a>").text(), "x\ny");
        assert_eq!(parse_ok("<a>x&#13;\r\n</a>").text(), "x\r\n");
        let root = parse_ok("<a id=\"1\r\n2\"/>");
        assert_eq!(root.attributes[0].value, "1\n2");
    }

    #[test]
    fn test_unknown_entity_fails() {
        let err = parse("<a>&nbsp;</a>", "t.xml").unwrap_err();
        assert!(err.message().contains("unknown entity"));
        assert_eq!(err.span().offset(), 3);
    }

    #[test]
    fn test_mismatched_close_tag_fails() {
        let err = parse("<a><b></a></b>", "t.xml").unwrap_err();
        assert!(err.message().contains("does not match"));
    }

    #[test]
    fn test_unclosed_element_fails() {
        let err = parse("<a><b></b>", "t.xml").unwrap_err();
        assert!(err.message().contains("not closed") || err.message().contains("end"));
    }

    #[test]
    fn test_undeclared_prefix_fails() {
        let err = parse("<x:a/>", "t.xml").unwrap_err();
        assert!(err.message().contains("undeclared namespace prefix 'x'"));
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(parse("", "t.xml").is_err());
        assert!(parse("   ", "t.xml").is_err());
    }

    #[test]
    fn test_text_span() {
        let root = parse_ok("<a>  42 </a>");
        assert_eq!(root.text_span(), Some(3..8));
        assert_eq!(parse_ok("<a/>").text_span(), None);
    }
}
