//! Resource requirements and their text encoding.
//!
//! A requirement list persists as one string: `name:amount[:quality]` entries
//! joined by `,`. The quality field is only written for entries restricted to
//! a single upgrade level.

use serde::{Deserialize, Serialize};
use tracing::debug;

use itemforge_common::{AmountId, ForgeError};

/// Separator between requirements.
pub const ENTRY_SEPARATOR: char = ',';
/// Separator between the fields of one requirement.
pub const FIELD_SEPARATOR: char = ':';

/// A single resource requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Catalog name of the required item.
    pub item_name: String,
    /// Amount required.
    pub amount: u32,
    /// Upgrade level this entry is restricted to, 0 = all levels.
    #[serde(default)]
    pub quality: u32,
    /// External setting overriding `amount`, read at materialization.
    #[serde(skip)]
    pub amount_config: Option<AmountId>,
}

impl Requirement {
    /// Requirement applying at every level.
    #[must_use]
    pub fn new(item_name: impl Into<String>, amount: u32) -> Self {
        Self {
            item_name: item_name.into(),
            amount,
            quality: 0,
            amount_config: None,
        }
    }

    /// Requirement restricted to one upgrade level.
    #[must_use]
    pub fn at_quality(item_name: impl Into<String>, amount: u32, quality: u32) -> Self {
        Self {
            item_name: item_name.into(),
            amount,
            quality,
            amount_config: None,
        }
    }

    /// Whether this entry only applies at a single upgrade level.
    #[must_use]
    pub const fn is_quality_specific(&self) -> bool {
        self.quality > 0
    }

    /// Empty names mean "no requirement" and are skipped on resolution.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.item_name.is_empty()
    }
}

/// Ordered requirements plus the `free` flag.
///
/// An empty, non-free list hides every recipe built from it; an empty free
/// list makes the recipe craftable at no cost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementList {
    /// Requirements in declaration order.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Allow an empty list to mean "costs nothing".
    #[serde(default)]
    pub free: bool,
}

impl RequirementList {
    /// Add a requirement applying at every level.
    pub fn add(&mut self, item_name: impl Into<String>, amount: u32) {
        self.requirements.push(Requirement::new(item_name, amount));
    }

    /// Add a requirement restricted to one upgrade level.
    pub fn add_at_quality(&mut self, item_name: impl Into<String>, amount: u32, quality: u32) {
        self.requirements
            .push(Requirement::at_quality(item_name, amount, quality));
    }

    /// Add a requirement whose amount follows an external setting.
    ///
    /// `amount` is the declared value, used whenever the setting is not
    /// registered and as the encoded default.
    pub fn add_configured(&mut self, item_name: impl Into<String>, amount: u32, config: AmountId) {
        let mut requirement = Requirement::new(item_name, amount);
        requirement.amount_config = Some(config);
        self.requirements.push(requirement);
    }

    /// Check if no requirement is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Encoded form of the list.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.requirements)
    }
}

/// Encode requirements into their persisted string form.
#[must_use]
pub fn encode(requirements: &[Requirement]) -> String {
    requirements
        .iter()
        .map(|r| {
            if r.quality > 0 {
                format!("{}:{}:{}", r.item_name, r.amount, r.quality)
            } else {
                format!("{}:{}", r.item_name, r.amount)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a persisted requirement string.
///
/// Never fails: unparsable amounts become 1, unparsable qualities become 0.
#[must_use]
pub fn decode(encoded: &str) -> Vec<Requirement> {
    decode_reporting(encoded).0
}

/// Decode a persisted requirement string and report every fallback taken.
#[must_use]
pub fn decode_reporting(encoded: &str) -> (Vec<Requirement>, Vec<ForgeError>) {
    if encoded.is_empty() {
        return (vec![Requirement::new("", 0)], Vec::new());
    }

    let mut diagnostics = Vec::new();
    let requirements = encoded
        .split(ENTRY_SEPARATOR)
        .map(|entry| {
            let mut parts = entry.split(FIELD_SEPARATOR);
            let item_name = parts.next().unwrap_or_default().to_string();
            let amount = parse_field(entry, "amount", parts.next(), 1, &mut diagnostics);
            let quality = parse_field(entry, "quality", parts.next(), 0, &mut diagnostics);
            Requirement {
                item_name,
                amount,
                quality,
                amount_config: None,
            }
        })
        .collect();

    (requirements, diagnostics)
}

/// Parse an optional numeric field, recording a diagnostic when it is
/// present but unparsable.
pub(crate) fn parse_field<T>(
    entry: &str,
    field: &'static str,
    raw: Option<&str>,
    fallback: T,
    diagnostics: &mut Vec<ForgeError>,
) -> T
where
    T: std::str::FromStr + ToString + Copy,
{
    match raw {
        None | Some("") => fallback,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            debug!("Malformed {} '{}' in '{}'", field, raw, entry);
            diagnostics.push(ForgeError::MalformedEncoding {
                entry: entry.to_string(),
                field,
                value: raw.to_string(),
                fallback: fallback.to_string(),
            });
            fallback
        }),
    }
}
