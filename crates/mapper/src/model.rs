//! The in-memory mapper data model (§3): the shape every schema document
//! parses into once `load::load_mapper` has checked its invariants.

use serde::{Deserialize, Serialize};
use shared::{Address, Endian, MemoryBlock, PropertyType, PropertyValue};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RangeTransform {
    pub in_min: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_max: f64,
    #[serde(default)]
    pub clamp: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionRule {
    #[serde(rename = "if")]
    pub if_expr: String,
    pub then: String,
    #[serde(rename = "else")]
    pub else_expr: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StringOps {
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub upper: bool,
    #[serde(default)]
    pub lower: bool,
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
}

/// One property's transform pipeline (§3, §4.3 step 3). Every stage is
/// optional and, when absent, passes the value through unchanged.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Transform {
    pub multiply: Option<f64>,
    pub divide: Option<f64>,
    pub add: Option<f64>,
    pub subtract: Option<f64>,
    pub range: Option<RangeTransform>,
    pub conditions: Option<Vec<ConditionRule>>,
    pub lookup: Option<BTreeMap<String, String>>,
    pub string_ops: Option<StringOps>,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Validation {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed_values: Option<Vec<PropertyValue>>,
    pub pattern: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComputedSpec {
    pub expression: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(rename = "type")]
    pub result_type: PropertyType,
}

/// `{ name, type, address, length, position?, endian?, read_only,
/// description, transform?, validation?, freezable, default_frozen,
/// char_map?, depends_on, computed? }` (§3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Absent exactly when `computed` is present (§3: computed properties
    /// replace the direct memory decode).
    pub address: Option<Address>,
    #[serde(default = "default_length")]
    pub length: u32,
    pub position: Option<u8>,
    pub endian: Option<Endian>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub description: String,
    pub transform: Option<Transform>,
    pub validation: Option<Validation>,
    #[serde(default)]
    pub freezable: bool,
    #[serde(default)]
    pub default_frozen: bool,
    pub char_map: Option<HashMap<u8, char>>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub computed: Option<ComputedSpec>,
}

fn default_length() -> u32 {
    1
}

impl Property {
    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub collapsed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub name: String,
    pub endian: Endian,
    pub memory_blocks: Vec<MemoryBlock>,
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub base_addresses: BTreeMap<String, serde_json::Value>,
}

/// The raw document shape (§6), before invariant checking promotes it to a
/// [`Mapper`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperDocument {
    pub name: String,
    pub game: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub min_version: Option<String>,
    pub platform: Platform,
    pub properties: BTreeMap<String, Property>,
    #[serde(default)]
    pub groups: BTreeMap<String, PropertyGroup>,
    #[serde(default)]
    pub computed: BTreeMap<String, ComputedSpec>,
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub preprocess: Vec<String>,
    #[serde(default)]
    pub postprocess: Vec<String>,
}

/// The validated, immutable mapper (§3 "Lifecycle"). Computed properties
/// declared in the document's top-level `computed` map are folded into
/// `properties` as name-only entries with `computed` set and `address`
/// absent, so the update loop walks one unified property set.
#[derive(Debug, Clone)]
pub struct Mapper {
    pub name: String,
    pub game: String,
    pub version: Option<String>,
    pub min_version: Option<String>,
    pub platform: Platform,
    pub properties: BTreeMap<String, Property>,
    pub groups: BTreeMap<String, PropertyGroup>,
    pub constants: BTreeMap<String, serde_json::Value>,
    pub preprocess: Vec<String>,
    pub postprocess: Vec<String>,
    /// Dependency-topological order, computed once at load (§8 invariant 3).
    pub decode_order: Vec<String>,
}

impl Mapper {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn endian_for(&self, property: &Property) -> Endian {
        property.endian.unwrap_or(self.platform.endian)
    }

    /// `constants` resolvable inside expressions as bare identifiers
    /// alongside `value` and property names (§6), so a mapper can write
    /// `value + baseOffset`. Non-scalar JSON values (arrays, objects, null)
    /// have no `PropertyValue` representation and are dropped.
    pub fn constants_context(&self) -> HashMap<String, PropertyValue> {
        self.constants
            .iter()
            .filter_map(|(name, value)| json_to_property_value(value).map(|v| (name.clone(), v)))
            .collect()
    }
}

fn json_to_property_value(value: &serde_json::Value) -> Option<PropertyValue> {
    match value {
        serde_json::Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(PropertyValue::Integer(i))
            } else {
                n.as_f64().map(PropertyValue::Float)
            }
        }
        serde_json::Value::String(s) => Some(PropertyValue::Text(s.clone())),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}
