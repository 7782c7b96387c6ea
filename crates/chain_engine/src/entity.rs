use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// The kinds of resources the API serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Site,
    Device,
    Sensor,
    ScalarData,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Site,
        EntityKind::Device,
        EntityKind::Sensor,
        EntityKind::ScalarData,
    ];

    /// Path segment of the kind's collection, e.g. `sites`.
    pub fn segment(&self) -> &'static str {
        match self {
            EntityKind::Site => "sites",
            EntityKind::Device => "devices",
            EntityKind::Sensor => "sensors",
            EntityKind::ScalarData => "scalar_data",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.segment() == segment)
    }

    /// Human readable singular name, e.g. `Scalar Data`.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Site => "Site",
            EntityKind::Device => "Device",
            EntityKind::Sensor => "Sensor",
            EntityKind::ScalarData => "Scalar Data",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Store-assigned identifier, unique within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parse a decimal id; anything else is not an id.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok().map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored entity as handed out by an [`crate::store::EntityStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: EntityId,
    /// Scalar and nested JSON attributes, in insertion order.
    pub attributes: Map<String, Value>,
    /// Named references to other entities, e.g. `site -> 1` on a device.
    pub references: BTreeMap<String, EntityId>,
    /// Links to things outside the API, e.g. `rawZMQStream`.
    pub external_links: BTreeMap<String, String>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn reference(&self, name: &str) -> Option<EntityId> {
        self.references.get(name).copied()
    }

    /// Display title taken from `attribute`, falling back to kind and id.
    pub fn title(&self, attribute: &str) -> String {
        match self.attributes.get(attribute) {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => format!("{} {}", self.kind.label(), self.id),
        }
    }

    /// Value the entity carries for a filter name: a reference id or a scalar attribute.
    fn filter_value(&self, name: &str) -> Option<String> {
        if let Some(id) = self.references.get(name) {
            return Some(id.to_string());
        }
        match self.attributes.get(name)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }
}

/// Data for an entity that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntity {
    pub attributes: Map<String, Value>,
    pub references: BTreeMap<String, EntityId>,
    pub external_links: BTreeMap<String, String>,
}

impl NewEntity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn reference(mut self, name: impl Into<String>, id: EntityId) -> Self {
        self.references.insert(name.into(), id);
        self
    }

    pub fn external_link(mut self, rel: impl Into<String>, href: impl Into<String>) -> Self {
        self.external_links.insert(rel.into(), href.into());
        self
    }
}

/// Equality filters on a collection, e.g. `site=1`. Kept sorted by name so
/// generated URLs are canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    criteria: BTreeMap<String, String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.criteria.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.criteria
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.criteria
            .iter()
            .all(|(name, value)| entity.filter_value(name).as_deref() == Some(value.as_str()))
    }
}
