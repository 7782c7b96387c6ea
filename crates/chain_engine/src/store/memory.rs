/* 📖 # Why does the in-memory store validate?

Creation is the only place where inbound data meets the domain. The store
knows which attributes each kind needs and which kind every reference must
point to, so it checks both and answers with a Validation error. The
dispatcher then only has to map that error onto a 400 response.
*/

use std::collections::{BTreeMap, HashMap};

use serde_json::{Value, json};
use tracing::{debug, instrument};

use chain_base::{ChainError, ChainResult};

use crate::entity::{Entity, EntityId, EntityKind, Filter, NewEntity};
use crate::store::traits::{EntityStore, Listing};

/// Entities kept in ordered maps, one id sequence per kind.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entities: BTreeMap<(EntityKind, EntityId), Entity>,
    next_ids: HashMap<EntityKind, u64>,
}

struct Requirements {
    strings: &'static [&'static str],
    numbers: &'static [&'static str],
    references: &'static [(&'static str, EntityKind)],
}

fn requirements(kind: EntityKind) -> Requirements {
    match kind {
        EntityKind::Site => Requirements {
            strings: &["name"],
            numbers: &[],
            references: &[],
        },
        EntityKind::Device => Requirements {
            strings: &["name"],
            numbers: &[],
            references: &[("site", EntityKind::Site)],
        },
        EntityKind::Sensor => Requirements {
            strings: &["metric", "unit"],
            numbers: &[],
            references: &[("device", EntityKind::Device)],
        },
        EntityKind::ScalarData => Requirements {
            strings: &["timestamp"],
            numbers: &["value"],
            references: &[("sensor", EntityKind::Sensor)],
        },
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store filled with two sites, five devices, ten sensors and twenty readings.
    pub fn with_demo_data() -> ChainResult<Self> {
        let mut store = Self::new();
        store.seed_demo_data()?;
        Ok(store)
    }

    pub fn seed_demo_data(&mut self) -> ChainResult<()> {
        let sites = [
            (
                "Test Site 1",
                json!({"elevation": 50.0, "latitude": 42.847, "longitude": 72.917}),
                "tcp://example.com:8372",
            ),
            (
                "Test Site 2",
                json!({"elevation": -23.8, "latitude": 40.847, "longitude": 42.917}),
                "tcp://example.com:8172",
            ),
        ];
        let mut site_ids = vec![];
        for (name, location, stream) in sites {
            let site = self.create(
                EntityKind::Site,
                NewEntity::new()
                    .attribute("name", name)
                    .attribute("geoLocation", location)
                    .external_link("rawZMQStream", stream),
            )?;
            site_ids.push(site.id);
        }

        for index in 0..5 {
            let device = self.create(
                EntityKind::Device,
                NewEntity::new()
                    .attribute("name", format!("Thermostat {}", index))
                    .reference("site", site_ids[index % site_ids.len()]),
            )?;
            for metric in ["Temperature", "Setpoint"] {
                let sensor = self.create(
                    EntityKind::Sensor,
                    NewEntity::new()
                        .attribute("metric", metric)
                        .attribute("unit", "C")
                        .reference("device", device.id),
                )?;
                for (second, value) in [(1, 22.0), (2, 23.0)] {
                    self.create(
                        EntityKind::ScalarData,
                        NewEntity::new()
                            .attribute("timestamp", format!("2013-01-01T00:00:0{}+00:00", second))
                            .attribute("value", value)
                            .reference("sensor", sensor.id),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn validate(&self, kind: EntityKind, entity: &NewEntity) -> ChainResult<()> {
        let rules = requirements(kind);
        for name in rules.strings {
            match entity.attributes.get(*name) {
                Some(Value::String(text)) if !text.trim().is_empty() => {}
                _ => return Err(invalid(kind, format!("'{}' must be a non-empty string", name))),
            }
        }
        for name in rules.numbers {
            if !entity.attributes.get(*name).is_some_and(Value::is_number) {
                return Err(invalid(kind, format!("'{}' must be a number", name)));
            }
        }
        for (name, target) in rules.references {
            let Some(id) = entity.references.get(*name) else {
                return Err(invalid(kind, format!("a '{}' reference is required", name)));
            };
            if !self.entities.contains_key(&(*target, *id)) {
                return Err(invalid(
                    kind,
                    format!("'{}' refers to unknown {} {}", name, target.label(), id),
                ));
            }
        }
        if let Some(name) = entity
            .references
            .keys()
            .find(|name| !rules.references.iter().any(|(known, _)| *known == name.as_str()))
        {
            return Err(invalid(kind, format!("unexpected reference '{}'", name)));
        }
        if let Some(location) = entity.attributes.get("geoLocation") {
            let valid = location.as_object().is_some_and(|object| {
                ["latitude", "longitude"]
                    .iter()
                    .all(|field| object.get(*field).is_some_and(Value::is_number))
                    && object.get("elevation").is_none_or(Value::is_number)
            });
            if !valid {
                return Err(invalid(
                    kind,
                    "'geoLocation' needs numeric latitude and longitude",
                ));
            }
        }
        if let Some((rel, _)) = entity.external_links.iter().find(|(_, href)| href.is_empty()) {
            return Err(invalid(kind, format!("link '{}' has an empty href", rel)));
        }
        Ok(())
    }
}

fn invalid(kind: EntityKind, message: impl AsRef<str>) -> Box<ChainError> {
    Box::new(ChainError::validation(format!(
        "{}: {}",
        kind.label(),
        message.as_ref()
    )))
}

impl EntityStore for InMemoryStore {
    fn get(&self, kind: EntityKind, id: EntityId) -> ChainResult<Option<Entity>> {
        Ok(self.entities.get(&(kind, id)).cloned())
    }

    #[instrument(level = "debug", skip(self))]
    fn list(&self, kind: EntityKind, filter: &Filter) -> ChainResult<Listing> {
        let items: Vec<Entity> = self
            .entities
            .range((kind, EntityId::new(0))..=(kind, EntityId::new(u64::MAX)))
            .map(|(_, entity)| entity)
            .filter(|entity| filter.matches(entity))
            .cloned()
            .collect();
        Ok(Listing {
            total_count: items.len(),
            items,
        })
    }

    #[instrument(level = "debug", skip(self, entity))]
    fn create(&mut self, kind: EntityKind, entity: NewEntity) -> ChainResult<Entity> {
        self.validate(kind, &entity)?;
        let next = self.next_ids.entry(kind).or_insert(1);
        let id = EntityId::new(*next);
        *next += 1;

        let stored = Entity {
            kind,
            id,
            attributes: entity.attributes,
            references: entity.references,
            external_links: entity.external_links,
        };
        self.entities.insert((kind, id), stored.clone());
        debug!(%kind, %id, "created entity");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreHandle;
    use chain_base::ErrorKind;

    fn assert_invalid(result: ChainResult<Entity>) -> String {
        let err = result.unwrap_err();
        match err.kind() {
            ErrorKind::Validation { message } => message.clone(),
            other => panic!("Expected Validation, got {}", other),
        }
    }

    #[test]
    fn test_store_new_is_empty() {
        let store = InMemoryStore::new();
        for kind in EntityKind::ALL {
            assert_eq!(store.list(kind, &Filter::new()).unwrap().total_count, 0);
        }
    }

    #[test]
    fn test_create_and_get() {
        let mut store = InMemoryStore::new();
        let site = store
            .create(EntityKind::Site, NewEntity::new().attribute("name", "MIT Media Lab"))
            .unwrap();
        assert_eq!(site.id, EntityId::new(1));

        let fetched = store.get(EntityKind::Site, site.id).unwrap().unwrap();
        assert_eq!(fetched, site);
        assert!(store.get(EntityKind::Device, site.id).unwrap().is_none());
        assert!(store.get(EntityKind::Site, EntityId::new(99)).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_per_kind() {
        let store = InMemoryStore::with_demo_data().unwrap();
        let sites = store.list(EntityKind::Site, &Filter::new()).unwrap();
        let devices = store.list(EntityKind::Device, &Filter::new()).unwrap();
        assert_eq!(sites.items[0].id, EntityId::new(1));
        assert_eq!(devices.items[0].id, EntityId::new(1));
    }

    #[test]
    fn test_demo_data_counts() {
        let store = InMemoryStore::with_demo_data().unwrap();
        let count = |kind| store.list(kind, &Filter::new()).unwrap().total_count;
        assert_eq!(count(EntityKind::Site), 2);
        assert_eq!(count(EntityKind::Device), 5);
        assert_eq!(count(EntityKind::Sensor), 10);
        assert_eq!(count(EntityKind::ScalarData), 20);
    }

    #[test]
    fn test_list_filters_by_reference() {
        let store = InMemoryStore::with_demo_data().unwrap();
        let listing = store
            .list(EntityKind::Device, &Filter::new().with("site", "1"))
            .unwrap();
        assert_eq!(listing.total_count, 3);
        assert!(
            listing
                .items
                .iter()
                .all(|device| device.reference("site") == Some(EntityId::new(1)))
        );
        let ids: Vec<u64> = listing.items.iter().map(|d| d.id.value()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_create_requires_attributes() {
        let mut store = InMemoryStore::new();
        let message = assert_invalid(store.create(EntityKind::Site, NewEntity::new()));
        assert_eq!(message, "Site: 'name' must be a non-empty string");

        let message = assert_invalid(store.create(
            EntityKind::Site,
            NewEntity::new().attribute("name", "   "),
        ));
        assert!(message.contains("'name'"));
    }

    #[test]
    fn test_create_checks_references() {
        let mut store = InMemoryStore::with_demo_data().unwrap();
        let missing = assert_invalid(store.create(
            EntityKind::Device,
            NewEntity::new().attribute("name", "Orphan"),
        ));
        assert_eq!(missing, "Device: a 'site' reference is required");

        let unknown = assert_invalid(store.create(
            EntityKind::Device,
            NewEntity::new()
                .attribute("name", "Lost")
                .reference("site", EntityId::new(42)),
        ));
        assert_eq!(unknown, "Device: 'site' refers to unknown Site 42");

        let unexpected = assert_invalid(store.create(
            EntityKind::Site,
            NewEntity::new()
                .attribute("name", "Odd")
                .reference("device", EntityId::new(1)),
        ));
        assert_eq!(unexpected, "Site: unexpected reference 'device'");
    }

    #[test]
    fn test_create_checks_geo_location() {
        let mut store = InMemoryStore::new();
        let message = assert_invalid(store.create(
            EntityKind::Site,
            NewEntity::new()
                .attribute("name", "Nowhere")
                .attribute("geoLocation", json!({"latitude": "north"})),
        ));
        assert!(message.contains("geoLocation"));
    }

    #[test]
    fn test_scalar_data_needs_numeric_value() {
        let mut store = InMemoryStore::with_demo_data().unwrap();
        let message = assert_invalid(store.create(
            EntityKind::ScalarData,
            NewEntity::new()
                .attribute("timestamp", "2013-01-01T00:00:03+00:00")
                .attribute("value", "hot")
                .reference("sensor", EntityId::new(1)),
        ));
        assert_eq!(message, "Scalar Data: 'value' must be a number");
    }

    #[test]
    fn test_store_handle_shares_state() {
        let handle = StoreHandle::new(InMemoryStore::new());
        let other = handle.clone();
        handle
            .create(EntityKind::Site, NewEntity::new().attribute("name", "Shared"))
            .unwrap();
        let listing = other.list(EntityKind::Site, &Filter::new()).unwrap();
        assert_eq!(listing.items[0].attribute("name"), Some(&json!("Shared")));
    }
}
