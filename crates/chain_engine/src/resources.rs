/* 📖 # Why describe resource kinds as a static table?

The assembler, paginator and dispatcher treat every kind the same way. What
differs between sites, devices, sensors and readings (which attribute titles
them, which relations point up and down the hierarchy, which filters a
collection accepts) is data, so it lives here and nowhere else.
*/

use crate::entity::EntityKind;

/// Link from an entity to the entity it references.
#[derive(Debug)]
pub struct ParentRelation {
    /// Relation name without curie prefix, e.g. `site`.
    pub relation: &'static str,
    /// Key in [`crate::entity::Entity::references`].
    pub reference: &'static str,
    pub kind: EntityKind,
}

/// Link from an entity to the filtered collection of its children.
#[derive(Debug)]
pub struct ChildRelation {
    pub relation: &'static str,
    pub title: &'static str,
    pub kind: EntityKind,
    /// Filter on the child collection that selects this entity's children.
    pub filter: &'static str,
}

#[derive(Debug)]
pub struct ResourceProfile {
    pub kind: EntityKind,
    /// Relation name of the collection on the API root.
    pub relation: &'static str,
    /// Title of the collection.
    pub collection_title: &'static str,
    /// Attribute used as the title of item links.
    pub title_attribute: &'static str,
    /// Query parameters accepted as collection filters.
    pub filters: &'static [&'static str],
    pub parents: &'static [ParentRelation],
    pub children: &'static [ChildRelation],
    /// Relations rendered from [`crate::entity::Entity::external_links`].
    pub external_links: &'static [&'static str],
    /// Title of the collection's `createForm` link; `None` makes it read-only.
    pub create_form: Option<&'static str>,
}

pub static PROFILES: [ResourceProfile; 4] = [
    ResourceProfile {
        kind: EntityKind::Site,
        relation: "sites",
        collection_title: "Sites",
        title_attribute: "name",
        filters: &[],
        parents: &[],
        children: &[ChildRelation {
            relation: "devices",
            title: "Devices",
            kind: EntityKind::Device,
            filter: "site",
        }],
        external_links: &["rawZMQStream"],
        create_form: Some("Create Site"),
    },
    ResourceProfile {
        kind: EntityKind::Device,
        relation: "devices",
        collection_title: "Devices",
        title_attribute: "name",
        filters: &["site"],
        parents: &[ParentRelation {
            relation: "site",
            reference: "site",
            kind: EntityKind::Site,
        }],
        children: &[ChildRelation {
            relation: "sensors",
            title: "Sensors",
            kind: EntityKind::Sensor,
            filter: "device",
        }],
        external_links: &[],
        create_form: Some("Create Device"),
    },
    ResourceProfile {
        kind: EntityKind::Sensor,
        relation: "sensors",
        collection_title: "Sensors",
        title_attribute: "metric",
        filters: &["device"],
        parents: &[ParentRelation {
            relation: "device",
            reference: "device",
            kind: EntityKind::Device,
        }],
        children: &[ChildRelation {
            relation: "history",
            title: "Data",
            kind: EntityKind::ScalarData,
            filter: "sensor",
        }],
        external_links: &[],
        create_form: Some("Create Sensor"),
    },
    ResourceProfile {
        kind: EntityKind::ScalarData,
        relation: "scalarData",
        collection_title: "Scalar Data",
        title_attribute: "timestamp",
        filters: &["sensor"],
        parents: &[ParentRelation {
            relation: "sensor",
            reference: "sensor",
            kind: EntityKind::Sensor,
        }],
        children: &[],
        external_links: &[],
        create_form: Some("Create Scalar Data"),
    },
];

pub fn profile(kind: EntityKind) -> &'static ResourceProfile {
    match kind {
        EntityKind::Site => &PROFILES[0],
        EntityKind::Device => &PROFILES[1],
        EntityKind::Sensor => &PROFILES[2],
        EntityKind::ScalarData => &PROFILES[3],
    }
}

impl ResourceProfile {
    pub fn accepts_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|filter| *filter == name)
    }

    /// Parent relation whose name matches `relation` with or without a curie prefix.
    pub fn parent(&self, relation: &str) -> Option<&ParentRelation> {
        let name = relation
            .split_once(':')
            .map_or(relation, |(_, name)| name);
        self.parents.iter().find(|parent| parent.relation == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_cover_every_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(profile(kind).kind, kind);
        }
    }

    #[test]
    fn test_child_filters_are_accepted_by_child_collection() {
        for profile in &PROFILES {
            for child in profile.children {
                assert!(super::profile(child.kind).accepts_filter(child.filter));
            }
        }
    }

    #[test]
    fn test_parent_lookup_ignores_curie_prefix() {
        let device = profile(EntityKind::Device);
        assert_eq!(device.parent("ch:site").map(|p| p.kind), Some(EntityKind::Site));
        assert_eq!(device.parent("site").map(|p| p.kind), Some(EntityKind::Site));
        assert!(device.parent("ch:sensor").is_none());
    }
}
