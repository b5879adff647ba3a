//! Dissolve and multipart explosion.

use std::collections::BTreeMap;

use tracing::info;

use harvest_common::{HarvestError, HarvestResult};

use crate::features::{Feature, FeatureSet, Value};
use crate::geometry::MultiPolygon;

/// Merge features sharing a value of `field` into single multipart
/// features.
///
/// Output carries only the dissolve field; groups are ordered by their
/// key's string form, parts within a group keep source order.
pub fn dissolve(set: &FeatureSet, field: &str) -> HarvestResult<FeatureSet> {
    let def = set
        .field(field)
        .cloned()
        .ok_or_else(|| HarvestError::FieldMissing(field.to_string()))?;

    let mut groups: BTreeMap<String, (Value, MultiPolygon)> = BTreeMap::new();
    for feature in &set.features {
        let value = feature
            .attribute(field)
            .cloned()
            .ok_or_else(|| HarvestError::FieldMissing(field.to_string()))?;
        let entry = groups
            .entry(value.key())
            .or_insert_with(|| (value, MultiPolygon { parts: Vec::new() }));
        entry.1.parts.extend(feature.geometry.parts.iter().cloned());
    }

    let mut out = FeatureSet::new(vec![def]);
    out.crs = set.crs.clone();
    for (_, (value, geometry)) in groups {
        let mut feature = Feature::new(geometry);
        feature.attributes.insert(field.to_string(), value);
        out.features.push(feature);
    }

    info!(
        input = set.len(),
        output = out.len(),
        field = %field,
        "Dissolved features"
    );
    Ok(out)
}

/// Split every multipart feature into one feature per part, copying the
/// attribute row onto each.
pub fn explode(set: &FeatureSet) -> FeatureSet {
    let mut out = FeatureSet::new(set.fields.clone());
    out.crs = set.crs.clone();

    for feature in &set.features {
        for part in &feature.geometry.parts {
            let mut single = Feature::new(MultiPolygon::single(part.clone()));
            single.attributes = feature.attributes.clone();
            out.features.push(single);
        }
    }

    info!(input = set.len(), output = out.len(), "Exploded multipart features");
    out
}
