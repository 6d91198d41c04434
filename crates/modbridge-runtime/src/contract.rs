//! The bridge contract.
//!
//! A type is eligible for auto-instantiation when its metadata lists the
//! bridge capability among its interfaces and carries a `description` tag
//! whose value is `bridge` (case-insensitive). Both checks run over the
//! parsed metadata model only.

use crate::image::TypeRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fully-qualified name of the bridge capability interface.
pub const BRIDGE_CAPABILITY: &str = "modbridge.Bridge";

/// Tag key holding the opt-in marker.
pub const DESCRIPTION_TAG: &str = "description";

/// Opt-in marker value.
pub const BRIDGE_SENTINEL: &str = "bridge";

/// The two-stage filter applied to every type record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeContract {
    /// Interface a type must implement.
    pub capability: String,

    /// Tag key carrying the opt-in marker.
    pub tag: String,

    /// Required tag value, compared case-insensitively.
    pub sentinel: String,
}

impl Default for BridgeContract {
    fn default() -> Self {
        Self {
            capability: BRIDGE_CAPABILITY.to_string(),
            tag: DESCRIPTION_TAG.to_string(),
            sentinel: BRIDGE_SENTINEL.to_string(),
        }
    }
}

impl BridgeContract {
    /// Check if any of the interfaces is exactly the bridge capability.
    pub fn implements_capability<I, S>(&self, interfaces: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        interfaces
            .into_iter()
            .any(|name| name.as_ref() == self.capability)
    }

    /// Check if the tags opt the type in.
    pub fn is_opted_in(&self, tags: &BTreeMap<String, String>) -> bool {
        match tags.get(&self.tag) {
            Some(value) if !value.is_empty() => {
                value.to_lowercase() == self.sentinel.to_lowercase()
            }
            _ => false,
        }
    }

    /// Both stages of the filter.
    pub fn matches<I, S>(&self, interfaces: I, tags: &BTreeMap<String, String>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.implements_capability(interfaces) && self.is_opted_in(tags)
    }

    /// Whether a type record is a bridge candidate (first stage only).
    pub fn is_candidate(&self, record: &TypeRecord) -> bool {
        record.is_resolvable()
            && !record.interfaces.is_empty()
            && self.implements_capability(&record.interfaces)
    }

    /// Whether a type record satisfies the whole contract.
    pub fn accepts(&self, record: &TypeRecord) -> bool {
        self.is_candidate(record) && self.is_opted_in(&record.tags)
    }
}
