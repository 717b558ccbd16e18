/// Label-keyword grouping of meshes for multi-file manifests.
use crate::classify::GeometryKind;
use std::collections::BTreeMap;

/// Keyword rules evaluated in order; the first rule with a keyword contained
/// in the lower-cased label decides the group.
pub const GROUP_RULES: &[(&[&str], GeometryKind)] = &[
    (&["slice", "plane", "xy", "xz", "yz"], GeometryKind::Slice),
    (&["surface", "boundary", "internal"], GeometryKind::Surface),
    (&["iso", "value", "level"], GeometryKind::Isosurface),
    (&["stream", "line", "seed"], GeometryKind::Streamline),
];

/// Group assigned when no keyword matches.
pub const DEFAULT_GROUP_KIND: GeometryKind = GeometryKind::Surface;

/// Geometry kind a label's group stands for.
pub fn group_kind(label: &str) -> GeometryKind {
    let lower = label.to_lowercase();
    GROUP_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map_or(DEFAULT_GROUP_KIND, |&(_, kind)| kind)
}

/// Group id (`slices`, `surfaces`, ...) for a label.
pub fn group_name(label: &str) -> &'static str {
    group_kind(label).type_group_id()
}

/// Meshes filed under one type group for the duration of a batch encode.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGroup<T> {
    pub group_name: &'static str,
    pub group_type: GeometryKind,
    pub members: Vec<(String, T)>,
}

/// Splits labeled items into type groups keyed by group name.
///
/// Groups iterate in name order; members keep their input order.
pub fn group<T>(
    labeled: impl IntoIterator<Item = (String, T)>,
) -> BTreeMap<&'static str, DataGroup<T>> {
    let mut groups: BTreeMap<&'static str, DataGroup<T>> = BTreeMap::new();

    for (label, item) in labeled {
        let kind = group_kind(&label);
        groups
            .entry(kind.type_group_id())
            .or_insert_with(|| DataGroup {
                group_name: kind.type_group_id(),
                group_type: kind,
                members: Vec::new(),
            })
            .members
            .push((label, item));
    }

    groups
}
