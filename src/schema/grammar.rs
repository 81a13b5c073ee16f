//! Static grammar tables
//!
//! Each schema is a tree of [`ElementRule`]s. Element content is either a
//! single datatype (leaf) or an unordered group of members, mirroring the
//! RELAX NG interleave (`&`) used throughout the lifecycle grammar.

use crate::schema::datatypes::Datatype;

/// How often a member may appear inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Occurs {
    pub fn is_required(self) -> bool {
        matches!(self, Occurs::One | Occurs::OneOrMore)
    }

    pub fn is_repeatable(self) -> bool {
        matches!(self, Occurs::ZeroOrMore | Occurs::OneOrMore)
    }

    /// Cardinality in `min..max` notation
    pub fn as_str(self) -> &'static str {
        match self {
            Occurs::One => "1",
            Occurs::Optional => "0..1",
            Occurs::ZeroOrMore => "0..n",
            Occurs::OneOrMore => "1..n",
        }
    }
}

/// What a member of an element group matches
#[derive(Debug)]
pub enum Particle {
    Element(&'static ElementRule),
    /// Exactly one of the listed elements
    Choice(&'static [&'static ElementRule]),
}

impl Particle {
    /// Find the element rule this particle uses for a child name
    pub fn matching(&self, name: &str) -> Option<&'static ElementRule> {
        match self {
            Particle::Element(rule) => Some(*rule).filter(|r| r.name == name),
            Particle::Choice(options) => options.iter().copied().find(|r| r.name == name),
        }
    }

    /// Element names accepted by this particle
    pub fn names(&self) -> Vec<&'static str> {
        match self {
            Particle::Element(rule) => vec![rule.name],
            Particle::Choice(options) => options.iter().map(|r| r.name).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Member {
    pub particle: Particle,
    pub occurs: Occurs,
}

#[derive(Debug)]
pub enum Content {
    /// Character data checked against a datatype
    Value(Datatype),
    /// Child elements in any order
    Interleave(&'static [Member]),
}

#[derive(Debug)]
pub struct ElementRule {
    pub name: &'static str,
    pub content: Content,
}

impl ElementRule {
    /// Element names allowed directly inside this element
    pub fn allowed_children(&self) -> Vec<&'static str> {
        match &self.content {
            Content::Value(_) => Vec::new(),
            Content::Interleave(members) => {
                members.iter().flat_map(|m| m.particle.names()).collect()
            }
        }
    }
}

const fn leaf(name: &'static str, datatype: Datatype) -> ElementRule {
    ElementRule {
        name,
        content: Content::Value(datatype),
    }
}

const fn one(rule: &'static ElementRule) -> Member {
    Member {
        particle: Particle::Element(rule),
        occurs: Occurs::One,
    }
}

const fn optional(rule: &'static ElementRule) -> Member {
    Member {
        particle: Particle::Element(rule),
        occurs: Occurs::Optional,
    }
}

// ---------------------------------------------------------------------------
// LifecycleConfiguration
// ---------------------------------------------------------------------------

static ID: ElementRule = leaf("ID", Datatype::String);
static PREFIX: ElementRule = leaf("Prefix", Datatype::String);
static KEY: ElementRule = leaf("Key", Datatype::String);
static VALUE: ElementRule = leaf("Value", Datatype::String);

static TAG_MEMBERS: [Member; 2] = [one(&KEY), one(&VALUE)];

static TAG: ElementRule = ElementRule {
    name: "Tag",
    content: Content::Interleave(&TAG_MEMBERS),
};

static FILTER_MEMBERS: [Member; 2] = [
    optional(&PREFIX),
    Member {
        particle: Particle::Element(&TAG),
        occurs: Occurs::ZeroOrMore,
    },
];

static FILTER: ElementRule = ElementRule {
    name: "Filter",
    content: Content::Interleave(&FILTER_MEMBERS),
};

static STATUS: ElementRule = leaf("Status", Datatype::Enumeration(&["Enabled", "Disabled"]));

static DAYS_AFTER_INITIATION: ElementRule =
    leaf("DaysAfterInitiation", Datatype::PositiveInteger);

static ABORT_INCOMPLETE_MULTIPART_UPLOAD_MEMBERS: [Member; 1] = [one(&DAYS_AFTER_INITIATION)];

static ABORT_INCOMPLETE_MULTIPART_UPLOAD: ElementRule = ElementRule {
    name: "AbortIncompleteMultipartUpload",
    content: Content::Interleave(&ABORT_INCOMPLETE_MULTIPART_UPLOAD_MEMBERS),
};

static DAYS: ElementRule = leaf("Days", Datatype::NonNegativeInteger);
static DATE: ElementRule = leaf("Date", Datatype::DateTime);
static EXPIRED_OBJECT_DELETE_MARKER: ElementRule =
    leaf("ExpiredObjectDeleteMarker", Datatype::Boolean);

/// `Expiration = Days | Date | ExpiredObjectDeleteMarker`
static EXPIRATION_CHOICE: [&ElementRule; 3] = [&DAYS, &DATE, &EXPIRED_OBJECT_DELETE_MARKER];

static STORAGE_CLASS: ElementRule = leaf("StorageClass", Datatype::StorageClass);

static EXPIRATION_MEMBERS: [Member; 1] = [Member {
    particle: Particle::Choice(&EXPIRATION_CHOICE),
    occurs: Occurs::One,
}];

static EXPIRATION: ElementRule = ElementRule {
    name: "Expiration",
    content: Content::Interleave(&EXPIRATION_MEMBERS),
};

static NONCURRENT_DAYS_POSITIVE: ElementRule = leaf("NoncurrentDays", Datatype::PositiveInteger);

static NONCURRENT_VERSION_EXPIRATION_MEMBERS: [Member; 1] = [one(&NONCURRENT_DAYS_POSITIVE)];

static NONCURRENT_VERSION_EXPIRATION: ElementRule = ElementRule {
    name: "NoncurrentVersionExpiration",
    content: Content::Interleave(&NONCURRENT_VERSION_EXPIRATION_MEMBERS),
};

static NONCURRENT_DAYS: ElementRule = leaf("NoncurrentDays", Datatype::NonNegativeInteger);

static NONCURRENT_VERSION_TRANSITION_MEMBERS: [Member; 2] =
    [one(&NONCURRENT_DAYS), one(&STORAGE_CLASS)];

static NONCURRENT_VERSION_TRANSITION: ElementRule = ElementRule {
    name: "NoncurrentVersionTransition",
    content: Content::Interleave(&NONCURRENT_VERSION_TRANSITION_MEMBERS),
};

/// `Transition = Expiration & StorageClass`
static TRANSITION_MEMBERS: [Member; 2] = [
    Member {
        particle: Particle::Choice(&EXPIRATION_CHOICE),
        occurs: Occurs::One,
    },
    one(&STORAGE_CLASS),
];

static TRANSITION: ElementRule = ElementRule {
    name: "Transition",
    content: Content::Interleave(&TRANSITION_MEMBERS),
};

static RULE_MEMBERS: [Member; 8] = [
    optional(&ID),
    one(&FILTER),
    one(&STATUS),
    optional(&ABORT_INCOMPLETE_MULTIPART_UPLOAD),
    optional(&EXPIRATION),
    optional(&NONCURRENT_VERSION_EXPIRATION),
    optional(&NONCURRENT_VERSION_TRANSITION),
    optional(&TRANSITION),
];

static RULE: ElementRule = ElementRule {
    name: "Rule",
    content: Content::Interleave(&RULE_MEMBERS),
};

static LIFECYCLE_CONFIGURATION_MEMBERS: [Member; 1] = [Member {
    particle: Particle::Element(&RULE),
    occurs: Occurs::OneOrMore,
}];

/// Root of the lifecycle grammar: `element LifecycleConfiguration { Rule+ }`
pub static LIFECYCLE_CONFIGURATION: ElementRule = ElementRule {
    name: "LifecycleConfiguration",
    content: Content::Interleave(&LIFECYCLE_CONFIGURATION_MEMBERS),
};

/// One line of a grammar outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub depth: usize,
    pub name: String,
    pub occurs: Occurs,
    /// Datatype label for leaves, `None` for element content
    pub datatype: Option<String>,
    /// Set when the entry is one alternative of a choice
    pub choice: bool,
}

/// Flatten a grammar into a depth-annotated outline for display
pub fn outline(root: &'static ElementRule) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    push_outline(root, Occurs::One, 0, false, &mut entries);
    entries
}

fn push_outline(
    rule: &'static ElementRule,
    occurs: Occurs,
    depth: usize,
    choice: bool,
    entries: &mut Vec<OutlineEntry>,
) {
    let datatype = match &rule.content {
        Content::Value(dt) => Some(dt.label()),
        Content::Interleave(_) => None,
    };
    entries.push(OutlineEntry {
        depth,
        name: rule.name.to_string(),
        occurs,
        datatype,
        choice,
    });

    if let Content::Interleave(members) = &rule.content {
        for member in members.iter() {
            match &member.particle {
                Particle::Element(child) => {
                    push_outline(child, member.occurs, depth + 1, false, entries)
                }
                Particle::Choice(options) => {
                    for child in options.iter() {
                        push_outline(child, member.occurs, depth + 1, true, entries);
                    }
                }
            }
        }
    }
}
