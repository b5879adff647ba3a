//! Feature tables: polygon geometries plus attribute fields.
//!
//! Mirrors the shape of an attribute table: an ordered field schema and
//! one attribute row per feature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use harvest_common::{CrsCode, HarvestError, HarvestResult};

use crate::geometry::MultiPolygon;

/// Attribute field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Float,
    Int,
}

/// Attribute field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Maximum length for text fields.
    pub length: Option<u32>,
}

impl FieldDef {
    pub fn text(name: impl Into<String>, length: u32) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Text,
            length: Some(length),
        }
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Float,
            length: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Int,
            length: None,
        }
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(i64),
}

impl Value {
    /// Stable string form, used as a dissolve group key.
    pub fn key(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Float(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
        }
    }
}

/// One polygon feature with its attribute row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: MultiPolygon,
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(geometry: MultiPolygon) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// An ordered set of features sharing a field schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Spatial reference of the feature coordinates, once defined.
    pub crs: Option<CrsCode>,
    pub fields: Vec<FieldDef>,
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            crs: None,
            fields,
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Append a field to the schema. Existing rows carry no value for it
    /// until calculated.
    pub fn add_field(&mut self, def: FieldDef) -> HarvestResult<()> {
        if self.field(&def.name).is_some() {
            return Err(HarvestError::FieldExists(def.name));
        }
        debug!(field = %def.name, "Added field");
        self.fields.push(def);
        Ok(())
    }

    /// Compute `field` for every feature.
    pub fn calculate_field<F>(&mut self, field: &str, calc: F) -> HarvestResult<()>
    where
        F: Fn(&Feature) -> Value,
    {
        if self.field(field).is_none() {
            return Err(HarvestError::FieldMissing(field.to_string()));
        }
        for feature in &mut self.features {
            let value = calc(&*feature);
            feature.attributes.insert(field.to_string(), value);
        }
        debug!(field = %field, rows = self.features.len(), "Calculated field");
        Ok(())
    }

    /// Copy the features satisfying `predicate` into a new set with the
    /// same schema.
    pub fn select<F>(&self, predicate: F) -> FeatureSet
    where
        F: Fn(&Feature) -> bool,
    {
        FeatureSet {
            crs: self.crs.clone(),
            fields: self.fields.clone(),
            features: self
                .features
                .iter()
                .filter(|f| predicate(f))
                .cloned()
                .collect(),
        }
    }

    /// Tag the set's coordinates with a spatial reference.
    pub fn define_projection(&mut self, crs: CrsCode) {
        self.crs = Some(crs);
    }
}
