//! Canonical XML serialization of a lifecycle configuration

use crate::core::lifecycle::{Expiration, LifecycleConfiguration, Rule};
use crate::xml::XMLNS_S3;

const INDENT: &str = "  ";

/// Elements whose text is written verbatim even when URL encoding is on
const URL_ENCODE_EXEMPT: &[&str] = &["ID"];

/// Serialization switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Percent-encode free-text values (`Prefix`, tag `Key` and `Value`)
    pub url_encode: bool,

    /// Declare the S3 namespace as the default namespace on the root
    pub s3_namespace: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            url_encode: false,
            s3_namespace: true,
        }
    }
}

/// Serialize a configuration as an S3 lifecycle document
///
/// Rule members are written in a fixed order so that formatting the same
/// configuration twice gives identical output.
pub fn to_string(config: &LifecycleConfiguration) -> String {
    to_string_with(config, WriteOptions::default())
}

/// Serialize with explicit [`WriteOptions`]
pub fn to_string_with(config: &LifecycleConfiguration, options: WriteOptions) -> String {
    let mut w = Writer {
        out: String::new(),
        depth: 0,
        url_encode: options.url_encode,
    };
    w.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    if options.s3_namespace {
        w.line(&format!(
            "<{} xmlns=\"{}\">",
            LifecycleConfiguration::ROOT_TAG,
            XMLNS_S3
        ));
    } else {
        w.line(&format!("<{}>", LifecycleConfiguration::ROOT_TAG));
    }
    w.depth += 1;
    for rule in &config.rules {
        write_rule(&mut w, rule);
    }
    w.close(LifecycleConfiguration::ROOT_TAG);
    w.out
}

fn write_rule(w: &mut Writer, rule: &Rule) {
    w.open("Rule");

    if let Some(id) = &rule.id {
        w.text("ID", id);
    }

    if rule.filter.prefix.is_none() && rule.filter.tags.is_empty() {
        w.line("<Filter/>");
    } else {
        w.open("Filter");
        if let Some(prefix) = &rule.filter.prefix {
            w.text("Prefix", prefix);
        }
        for tag in &rule.filter.tags {
            w.open("Tag");
            w.text("Key", &tag.key);
            w.text("Value", &tag.value);
            w.close("Tag");
        }
        w.close("Filter");
    }

    w.leaf("Status", rule.status.as_str());

    if let Some(abort) = &rule.abort_incomplete_multipart_upload {
        w.open("AbortIncompleteMultipartUpload");
        w.leaf(
            "DaysAfterInitiation",
            &abort.days_after_initiation.to_string(),
        );
        w.close("AbortIncompleteMultipartUpload");
    }

    if let Some(expiration) = &rule.expiration {
        w.open("Expiration");
        write_timing(w, expiration);
        w.close("Expiration");
    }

    if let Some(nve) = &rule.noncurrent_version_expiration {
        w.open("NoncurrentVersionExpiration");
        w.leaf("NoncurrentDays", &nve.noncurrent_days.to_string());
        w.close("NoncurrentVersionExpiration");
    }

    if let Some(nvt) = &rule.noncurrent_version_transition {
        w.open("NoncurrentVersionTransition");
        w.leaf("NoncurrentDays", &nvt.noncurrent_days.to_string());
        w.leaf("StorageClass", nvt.storage_class.as_str());
        w.close("NoncurrentVersionTransition");
    }

    if let Some(transition) = &rule.transition {
        w.open("Transition");
        write_timing(w, &transition.timing);
        w.leaf("StorageClass", transition.storage_class.as_str());
        w.close("Transition");
    }

    w.close("Rule");
}

fn write_timing(w: &mut Writer, timing: &Expiration) {
    w.leaf(timing.element_name(), &timing.value_text());
}

struct Writer {
    out: String,
    depth: usize,
    url_encode: bool,
}

impl Writer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, name: &str) {
        self.line(&format!("<{}>", name));
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}>", name));
    }

    fn leaf(&mut self, name: &str, text: &str) {
        self.line(&format!("<{0}>{1}</{0}>", name, escape(text)));
    }

    /// Leaf holding free text, percent-encoded when URL encoding is on
    fn text(&mut self, name: &str, text: &str) {
        if self.url_encode && !URL_ENCODE_EXEMPT.contains(&name) {
            self.leaf(name, &url_encode(text));
        } else {
            self.leaf(name, text);
        }
    }
}

/// Escape character data
///
/// `\r` becomes a character reference since parsing turns a literal one
/// into `\n`.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\r', "&#13;")
}

/// Percent-encode a value, keeping `/` separators readable
fn url_encode(text: &str) -> String {
    text.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
