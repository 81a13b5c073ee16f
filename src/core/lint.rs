//! Semantic checks on a schema-valid lifecycle configuration
//!
//! The grammar cannot express these, so they are reported as warnings.
//! `lcv validate --strict` turns them into failures.

use std::collections::HashMap;
use std::fmt;

use crate::core::lifecycle::{Expiration, LifecycleConfiguration};

/// Longest rule ID object stores accept
pub const MAX_RULE_ID_LEN: usize = 255;

/// Most rules a single configuration may hold
pub const MAX_RULES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintKind {
    DuplicateRuleId { id: String, first: usize },
    RuleIdTooLong { len: usize },
    NoActions,
    TooManyRules { count: usize },
    DateNotMidnightUtc { element: &'static str },
    TransitionAfterExpiration { transition_days: u64, expiration_days: u64 },
    DeleteMarkerInTransition,
}

/// A warning tied to a rule (by position) or to the whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    /// 0-based rule position, `None` for document-level warnings
    pub rule_index: Option<usize>,
    pub kind: LintKind,
}

impl LintWarning {
    pub fn suggestion(&self) -> Option<String> {
        match &self.kind {
            LintKind::DuplicateRuleId { .. } => Some("Give every rule a unique ID".to_string()),
            LintKind::RuleIdTooLong { .. } => Some(format!(
                "Shorten the ID to at most {} characters",
                MAX_RULE_ID_LEN
            )),
            LintKind::NoActions => Some(
                "Add Expiration, Transition, NoncurrentVersionExpiration, NoncurrentVersionTransition or AbortIncompleteMultipartUpload"
                    .to_string(),
            ),
            LintKind::TooManyRules { .. } => {
                Some("Merge rules that share a filter".to_string())
            }
            LintKind::DateNotMidnightUtc { .. } => {
                Some("Use a date at midnight UTC, e.g. 2024-01-01T00:00:00Z".to_string())
            }
            LintKind::TransitionAfterExpiration { .. } => {
                Some("Transition objects before they expire".to_string())
            }
            LintKind::DeleteMarkerInTransition => {
                Some("Use Days or Date inside Transition".to_string())
            }
        }
    }
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LintKind::DuplicateRuleId { id, first } => {
                write!(f, "rule ID '{}' is already used by rule #{}", id, first + 1)
            }
            LintKind::RuleIdTooLong { len } => write!(
                f,
                "rule ID is {} characters long (max {})",
                len, MAX_RULE_ID_LEN
            ),
            LintKind::NoActions => write!(f, "rule has no lifecycle action"),
            LintKind::TooManyRules { count } => write!(
                f,
                "configuration has {} rules (max {})",
                count, MAX_RULES
            ),
            LintKind::DateNotMidnightUtc { element } => {
                write!(f, "{} date is not at midnight UTC", element)
            }
            LintKind::TransitionAfterExpiration {
                transition_days,
                expiration_days,
            } => write!(
                f,
                "transition after {} days never runs, objects expire after {} days",
                transition_days, expiration_days
            ),
            LintKind::DeleteMarkerInTransition => {
                write!(f, "ExpiredObjectDeleteMarker has no meaning inside Transition")
            }
        }
    }
}

/// Run every check over the configuration
pub fn lint(config: &LifecycleConfiguration) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    if config.rules.len() > MAX_RULES {
        warnings.push(LintWarning {
            rule_index: None,
            kind: LintKind::TooManyRules {
                count: config.rules.len(),
            },
        });
    }

    let mut seen_ids: HashMap<&str, usize> = HashMap::new();

    for (index, rule) in config.rules.iter().enumerate() {
        let mut warn = |kind| {
            warnings.push(LintWarning {
                rule_index: Some(index),
                kind,
            })
        };

        if let Some(id) = &rule.id {
            if let Some(&first) = seen_ids.get(id.as_str()) {
                warn(LintKind::DuplicateRuleId {
                    id: id.clone(),
                    first,
                });
            } else {
                seen_ids.insert(id.as_str(), index);
            }

            let len = id.chars().count();
            if len > MAX_RULE_ID_LEN {
                warn(LintKind::RuleIdTooLong { len });
            }
        }

        if !rule.has_action() {
            warn(LintKind::NoActions);
        }

        if let Some(Expiration::Date(date)) = &rule.expiration {
            if !date.is_midnight_utc() {
                warn(LintKind::DateNotMidnightUtc {
                    element: "Expiration",
                });
            }
        }

        if let Some(transition) = &rule.transition {
            match &transition.timing {
                Expiration::Date(date) if !date.is_midnight_utc() => {
                    warn(LintKind::DateNotMidnightUtc {
                        element: "Transition",
                    });
                }
                Expiration::ExpiredObjectDeleteMarker(_) => {
                    warn(LintKind::DeleteMarkerInTransition);
                }
                _ => {}
            }

            if let (Expiration::Days(transition_days), Some(Expiration::Days(expiration_days))) =
                (&transition.timing, &rule.expiration)
            {
                if transition_days >= expiration_days {
                    warn(LintKind::TransitionAfterExpiration {
                        transition_days: *transition_days,
                        expiration_days: *expiration_days,
                    });
                }
            }
        }
    }

    warnings
}
