//! Typed lifecycle configuration model
//!
//! Built from an element tree that has already passed schema validation,
//! so every lookup here is expected to succeed. Failures still surface as
//! [`ModelError`] rather than panics.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::schema::datatypes::{
    collapse_whitespace, parse_boolean, parse_non_negative_integer, parse_positive_integer,
    DatatypeError, XsdDateTime,
};
use crate::xml::{self, DocumentError, Element};

/// Error building the typed model from an element tree
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("<{parent}> is missing <{element}>")]
    #[diagnostic(code(lcv::model::missing_element))]
    MissingElement { parent: String, element: String },

    #[error("<{parent}> must contain one of {expected}")]
    #[diagnostic(code(lcv::model::missing_choice))]
    MissingChoice { parent: String, expected: String },

    #[error("invalid <{element}>: {source}")]
    #[diagnostic(code(lcv::model::invalid_value))]
    InvalidValue {
        element: String,
        #[source]
        source: DatatypeError,
    },

    #[error("unexpected root element <{found}>, expected <{expected}>")]
    #[diagnostic(code(lcv::model::wrong_root))]
    WrongRoot { found: String, expected: String },
}

/// Whether a rule is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    Enabled,
    Disabled,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Enabled => "Enabled",
            RuleStatus::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage tier name; the accepted set is supplied by configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageClass(pub String);

impl StorageClass {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key/value pair selecting objects by tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Objects a rule applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, rename = "Tag", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// When an action fires: exactly one of the three forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Expiration {
    Days(u64),
    Date(XsdDateTime),
    ExpiredObjectDeleteMarker(bool),
}

impl Expiration {
    pub fn element_name(&self) -> &'static str {
        match self {
            Expiration::Days(_) => "Days",
            Expiration::Date(_) => "Date",
            Expiration::ExpiredObjectDeleteMarker(_) => "ExpiredObjectDeleteMarker",
        }
    }

    /// Text content of the chosen element
    pub fn value_text(&self) -> String {
        match self {
            Expiration::Days(days) => days.to_string(),
            Expiration::Date(date) => date.to_string(),
            Expiration::ExpiredObjectDeleteMarker(flag) => flag.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    #[serde(flatten)]
    pub timing: Expiration,
    pub storage_class: StorageClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AbortIncompleteMultipartUpload {
    pub days_after_initiation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    pub noncurrent_days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionTransition {
    pub noncurrent_days: u64,
    pub storage_class: StorageClass,
}

/// A single lifecycle rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    #[serde(default, rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub filter: Filter,

    pub status: RuleStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_incomplete_multipart_upload: Option<AbortIncompleteMultipartUpload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_transition: Option<NoncurrentVersionTransition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl Rule {
    /// True when the rule carries at least one action
    pub fn has_action(&self) -> bool {
        self.abort_incomplete_multipart_upload.is_some()
            || self.expiration.is_some()
            || self.noncurrent_version_expiration.is_some()
            || self.noncurrent_version_transition.is_some()
            || self.transition.is_some()
    }

    /// Label used in reports: the rule ID, or its 1-based position
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => format!("'{}'", id),
            None => format!("#{}", index + 1),
        }
    }
}

/// Root of a lifecycle document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    #[serde(rename = "Rule")]
    pub rules: Vec<Rule>,
}

impl LifecycleConfiguration {
    pub const ROOT_TAG: &'static str = "LifecycleConfiguration";

    /// Parse and validate an XML document, then build the typed model
    pub fn from_xml(text: &str) -> Result<Self, DocumentError> {
        let root = xml::fromstring(text, Some(Self::ROOT_TAG))?;
        Ok(Self::from_element(&root)?)
    }

    /// Build the typed model from a validated element tree
    pub fn from_element(root: &Element) -> Result<Self, ModelError> {
        if root.name != Self::ROOT_TAG {
            return Err(ModelError::WrongRoot {
                found: root.name.clone(),
                expected: Self::ROOT_TAG.to_string(),
            });
        }

        let rules = root
            .children_named("Rule")
            .map(rule_from_element)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(|r| r.status == RuleStatus::Enabled)
    }
}

fn required<'a>(parent: &'a Element, name: &str) -> Result<&'a Element, ModelError> {
    parent.child(name).ok_or_else(|| ModelError::MissingElement {
        parent: parent.name.clone(),
        element: name.to_string(),
    })
}

fn invalid(element: &Element) -> impl FnOnce(DatatypeError) -> ModelError + '_ {
    move |source| ModelError::InvalidValue {
        element: element.name.clone(),
        source,
    }
}

fn rule_from_element(el: &Element) -> Result<Rule, ModelError> {
    let status_el = required(el, "Status")?;
    let status = match collapse_whitespace(&status_el.text()).as_str() {
        "Enabled" => RuleStatus::Enabled,
        "Disabled" => RuleStatus::Disabled,
        other => {
            return Err(ModelError::InvalidValue {
                element: "Status".to_string(),
                source: DatatypeError::NotAllowed {
                    value: other.to_string(),
                    allowed: vec!["Enabled".to_string(), "Disabled".to_string()],
                },
            })
        }
    };

    let filter_el = required(el, "Filter")?;
    let filter = Filter {
        prefix: filter_el.child("Prefix").map(Element::text),
        tags: filter_el
            .children_named("Tag")
            .map(|tag| {
                Ok::<_, ModelError>(Tag {
                    key: required(tag, "Key")?.text(),
                    value: required(tag, "Value")?.text(),
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?,
    };

    let abort_incomplete_multipart_upload = el
        .child("AbortIncompleteMultipartUpload")
        .map(|abort| {
            let days = required(abort, "DaysAfterInitiation")?;
            Ok::<_, ModelError>(AbortIncompleteMultipartUpload {
                days_after_initiation: parse_positive_integer(&days.text())
                    .map_err(invalid(days))?,
            })
        })
        .transpose()?;

    let expiration = el.child("Expiration").map(expiration_from_element).transpose()?;

    let noncurrent_version_expiration = el
        .child("NoncurrentVersionExpiration")
        .map(|nve| {
            let days = required(nve, "NoncurrentDays")?;
            Ok::<_, ModelError>(NoncurrentVersionExpiration {
                noncurrent_days: parse_positive_integer(&days.text()).map_err(invalid(days))?,
            })
        })
        .transpose()?;

    let noncurrent_version_transition = el
        .child("NoncurrentVersionTransition")
        .map(|nvt| {
            let days = required(nvt, "NoncurrentDays")?;
            Ok::<_, ModelError>(NoncurrentVersionTransition {
                noncurrent_days: parse_non_negative_integer(&days.text())
                    .map_err(invalid(days))?,
                storage_class: storage_class(required(nvt, "StorageClass")?),
            })
        })
        .transpose()?;

    let transition = el
        .child("Transition")
        .map(|tr| {
            Ok::<_, ModelError>(Transition {
                timing: expiration_from_element(tr)?,
                storage_class: storage_class(required(tr, "StorageClass")?),
            })
        })
        .transpose()?;

    Ok(Rule {
        id: el.child("ID").map(Element::text),
        filter,
        status,
        abort_incomplete_multipart_upload,
        expiration,
        noncurrent_version_expiration,
        noncurrent_version_transition,
        transition,
    })
}

fn expiration_from_element(el: &Element) -> Result<Expiration, ModelError> {
    if let Some(days) = el.child("Days") {
        let value = parse_non_negative_integer(&days.text()).map_err(invalid(days))?;
        return Ok(Expiration::Days(value));
    }
    if let Some(date) = el.child("Date") {
        let value = date.text().parse::<XsdDateTime>().map_err(invalid(date))?;
        return Ok(Expiration::Date(value));
    }
    if let Some(marker) = el.child("ExpiredObjectDeleteMarker") {
        let value = parse_boolean(&marker.text()).map_err(invalid(marker))?;
        return Ok(Expiration::ExpiredObjectDeleteMarker(value));
    }
    Err(ModelError::MissingChoice {
        parent: el.name.clone(),
        expected: "Days, Date, ExpiredObjectDeleteMarker".to_string(),
    })
}

fn storage_class(el: &Element) -> StorageClass {
    StorageClass(collapse_whitespace(&el.text()))
}
