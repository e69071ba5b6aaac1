// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Component schemas and per-entity component storage.

use crate::entity::EntityId;
use crate::weave::Weave;

/// The four primitive field types a schema's fields may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    String,
}

/// A single named, typed field in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub name: String,
    pub datatype: DataType,
}

impl DataField {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self { name: name.into(), datatype }
    }
}

/// A named, ordered list of fields. Registration order fixes field indexing.
#[derive(Debug, Clone)]
pub struct DataSchema {
    pub name: String,
    pub fields: Vec<DataField>,
}

/// A typed field value, stored by the Weave on behalf of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl DataValue {
    fn datatype(&self) -> DataType {
        match self {
            DataValue::Int(_) => DataType::Int,
            DataValue::Float(_) => DataType::Float,
            DataValue::Bool(_) => DataType::Bool,
            DataValue::String(_) => DataType::String,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            DataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl Weave {
    /// Registers a schema under `name`. Returns `false` (state unchanged) if
    /// `name` is already registered — definitions are immutable.
    pub fn define_data(&mut self, name: impl Into<String>, fields: Vec<DataField>) -> bool {
        let name = name.into();
        if self.schema_index.contains_key(&name) {
            #[cfg(feature = "profiling")]
            tracing::warn!(%name, "define_data: schema already registered");
            return false;
        }
        let id = self.schemas.len();
        self.schema_index.insert(name.clone(), id);
        self.schemas.push(DataSchema { name, fields });
        true
    }

    pub fn get_data_id(&self, name: &str) -> Option<usize> {
        self.schema_index.get(name).copied()
    }

    pub fn get_data_field_count(&self, name: &str) -> Option<usize> {
        let id = self.get_data_id(name)?;
        Some(self.schemas[id].fields.len())
    }

    pub fn get_data_field(&self, name: &str, index: usize) -> Option<&DataField> {
        let id = self.get_data_id(name)?;
        self.schemas[id].fields.get(index)
    }

    /// Attaches a component of schema `name` to `entity`, replacing any
    /// existing component of the same schema. A no-op returning `false` if
    /// the schema is unknown or `raw_fields` doesn't match the schema's
    /// arity/types (a contract violation per the spec's error design).
    pub fn add_component(&mut self, entity: EntityId, name: &str, raw_fields: Vec<DataValue>) -> bool {
        let Some(schema_id) = self.get_data_id(name) else {
            #[cfg(feature = "profiling")]
            tracing::warn!(%name, "add_component: unknown schema");
            return false;
        };
        if !self.is_valid(entity) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?entity, "add_component: entity not live");
            return false;
        }
        let schema = &self.schemas[schema_id];
        if raw_fields.len() != schema.fields.len()
            || raw_fields
                .iter()
                .zip(schema.fields.iter())
                .any(|(value, field)| value.datatype() != field.datatype)
        {
            #[cfg(feature = "profiling")]
            tracing::warn!(%name, "add_component: field arity/type mismatch");
            return false;
        }
        self.components.insert((entity, schema_id), raw_fields);
        self.entity_components.entry(entity).or_default().insert(schema_id);
        true
    }

    pub fn has_component(&self, entity: EntityId, name: &str) -> bool {
        let Some(schema_id) = self.get_data_id(name) else { return false };
        self.components.contains_key(&(entity, schema_id))
    }

    /// No-op if the component is absent; idempotent.
    pub fn remove_component(&mut self, entity: EntityId, name: &str) {
        let Some(schema_id) = self.get_data_id(name) else { return };
        if self.components.remove(&(entity, schema_id)).is_some() {
            if let Some(set) = self.entity_components.get_mut(&entity) {
                set.remove(&schema_id);
            }
        }
    }

    /// Borrowed field value, valid until the component is removed/replaced
    /// or the Weave is destroyed. `None` if the schema, entity, or field
    /// index is absent.
    pub fn get_component_field(&self, entity: EntityId, name: &str, index: usize) -> Option<&DataValue> {
        let schema_id = self.get_data_id(name)?;
        self.components.get(&(entity, schema_id))?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_schema_immutability() {
        let mut w = Weave::new();
        assert!(w.define_data(
            "X",
            vec![DataField::new("a", DataType::Int)]
        ));
        assert!(!w.define_data(
            "X",
            vec![DataField::new("a", DataType::Int), DataField::new("b", DataType::Bool)]
        ));
        assert_eq!(w.get_data_field_count("X"), Some(1));
        assert_eq!(w.get_data_field("X", 0).unwrap().name, "a");
    }

    #[test]
    fn s2_component_round_trip() {
        let mut w = Weave::new();
        w.define_data(
            "Test",
            vec![
                DataField::new("i", DataType::Int),
                DataField::new("b", DataType::Bool),
                DataField::new("s", DataType::String),
                DataField::new("f", DataType::Float),
                DataField::new("z", DataType::String),
            ],
        );
        let k = w.new_knot();
        assert!(!w.has_component(k, "Test"));

        w.add_component(
            k,
            "Test",
            vec![
                DataValue::Int(13),
                DataValue::Bool(true),
                DataValue::String("hello".to_string()),
                DataValue::Float(3.14),
                DataValue::String("world".to_string()),
            ],
        );
        assert!(w.has_component(k, "Test"));

        assert_eq!(w.get_component_field(k, "Test", 0).unwrap().as_int(), Some(13));
        assert_eq!(w.get_component_field(k, "Test", 1).unwrap().as_bool(), Some(true));
        assert_eq!(w.get_component_field(k, "Test", 2).unwrap().as_str(), Some("hello"));
        let f = w.get_component_field(k, "Test", 3).unwrap().as_float().unwrap();
        assert!((f - 3.14).abs() < 1e-9);
        assert_eq!(w.get_component_field(k, "Test", 4).unwrap().as_str(), Some("world"));

        w.remove_component(k, "Test");
        assert!(!w.has_component(k, "Test"));
        // Idempotent.
        w.remove_component(k, "Test");
        assert!(!w.has_component(k, "Test"));
    }

    #[test]
    fn add_component_rejects_unknown_schema() {
        let mut w = Weave::new();
        let k = w.new_knot();
        assert!(!w.add_component(k, "Nope", vec![]));
    }

    #[test]
    fn add_component_replaces_existing() {
        let mut w = Weave::new();
        w.define_data("Counter", vec![DataField::new("n", DataType::Int)]);
        let k = w.new_knot();
        w.add_component(k, "Counter", vec![DataValue::Int(1)]);
        w.add_component(k, "Counter", vec![DataValue::Int(2)]);
        assert_eq!(w.get_component_field(k, "Counter", 0).unwrap().as_int(), Some(2));
    }

    #[test]
    fn freeing_entity_drops_its_components() {
        let mut w = Weave::new();
        w.define_data("Counter", vec![DataField::new("n", DataType::Int)]);
        let mut k = w.new_knot();
        w.add_component(k, "Counter", vec![DataValue::Int(1)]);
        crate::delete::delete_cascade(&mut w, &mut k);
        // The component storage must not outlive the entity.
        assert_eq!(w.components.len(), 0);
    }
}
