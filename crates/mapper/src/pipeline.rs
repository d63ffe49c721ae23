//! The per-property decode pipeline (§4.3: "Property decode pipeline").
//! Orchestrates computed-expression evaluation or memory-manager decode,
//! then transform, then validation, always landing on a value — decode
//! failures degrade to a typed default plus a warning rather than aborting
//! the tick (§4.3 "Decode failure policy").

use crate::expr;
use crate::model::{Mapper, Property};
use crate::transform;
use crate::validate;
use memory::Memory;
use shared::{PropertyType, PropertyValue, Warning};
use std::collections::HashMap;

pub struct DecodedProperty {
    pub value: PropertyValue,
    pub raw_bytes: Vec<u8>,
    pub warnings: Vec<Warning>,
}

fn default_for(ty: PropertyType) -> PropertyValue {
    match ty {
        PropertyType::String => PropertyValue::string_default(),
        PropertyType::Bool | PropertyType::Bit => PropertyValue::bool_default(),
        _ => PropertyValue::numeric_default(),
    }
}

/// Runs the full decode pipeline for one property. `context` holds the
/// already-decoded values for properties earlier in `mapper.decode_order`
/// (§8 invariant 3).
pub async fn decode_property(
    mapper: &Mapper,
    property: &Property,
    memory: &Memory,
    context: &HashMap<String, PropertyValue>,
) -> DecodedProperty {
    let mut warnings = Vec::new();

    let (mut value, raw_bytes) = if let Some(computed) = &property.computed {
        match expr::parse(&computed.expression).and_then(|ast| expr::eval(&ast, context, None)) {
            Ok(v) => (v, Vec::new()),
            Err(err) => {
                warnings.push(Warning::read_soft_fail(format!(
                    "computed property {:?} failed to evaluate: {err}",
                    property.name
                )));
                (default_for(property.property_type), Vec::new())
            }
        }
    } else {
        let addr = property
            .address
            .expect("non-computed properties always carry an address (enforced at load)");
        match memory.read_bytes(addr, property.length).await {
            Ok(bytes) if bytes.len() as u32 >= property.length => {
                let endian = mapper.endian_for(property);
                match memory::decode::decode_property_type(
                    property.property_type,
                    &bytes,
                    endian,
                    property.position,
                    property.char_map.as_ref(),
                ) {
                    Some(v) => (v, bytes),
                    None => {
                        warnings.push(Warning::read_soft_fail(format!(
                            "property {:?} has no scalar decode for type {:?}",
                            property.name, property.property_type
                        )));
                        (default_for(property.property_type), bytes)
                    }
                }
            }
            _ => {
                warnings.push(Warning::read_soft_fail(format!(
                    "property {:?} is unmapped or returned fewer bytes than expected",
                    property.name
                )));
                (default_for(property.property_type), Vec::new())
            }
        }
    };

    if let Some(t) = &property.transform {
        match transform::apply(t, value.clone(), context) {
            Ok(v) => value = v,
            Err(err) => {
                warnings.push(Warning::validation(format!(
                    "property {:?} transform failed: {err}",
                    property.name
                )));
            }
        }
    }

    if let Some(validation) = &property.validation {
        warnings.extend(validate::check(validation, &value));
    }

    DecodedProperty {
        value,
        raw_bytes,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_mapper;
    use shared::{Address, MemoryBlock};
    use std::collections::HashMap as Map;

    fn hp_document() -> &'static str {
        r#"{
            "name": "t",
            "game": "t",
            "platform": {
                "name": "gb",
                "endian": "little",
                "memoryBlocks": [{"name": "wram", "start": "0x0000", "end": "0xFFFF"}]
            },
            "properties": {
                "hp": {"name": "hp", "type": "uint16", "address": "0xD16C", "length": 2}
            }
        }"#
    }

    #[tokio::test]
    async fn decodes_hp_scenario_from_spec() {
        let mapper = load_mapper(hp_document()).unwrap();
        let memory = Memory::new();
        let block = MemoryBlock::new("wram", Address(0), Address(0xFFFF)).unwrap();
        let mut bytes = vec![0u8; 0x10000];
        bytes[0xD16C] = 0x2C;
        bytes[0xD16D] = 0x01;
        let mut by_block = Map::new();
        by_block.insert("wram".to_string(), bytes);
        memory.update(&[block], by_block).await;

        let hp = mapper.property("hp").unwrap();
        let decoded = decode_property(&mapper, hp, &memory, &Map::new()).await;
        assert_eq!(decoded.value, PropertyValue::Integer(300));
        assert!(decoded.warnings.is_empty());
    }

    #[tokio::test]
    async fn unmapped_read_degrades_to_default_with_a_warning() {
        let mapper = load_mapper(hp_document()).unwrap();
        let memory = Memory::new();
        // No `update` call: the snapshot is empty, so every address is unmapped.
        let hp = mapper.property("hp").unwrap();
        let decoded = decode_property(&mapper, hp, &memory, &Map::new()).await;
        assert_eq!(decoded.value, PropertyValue::Integer(0));
        assert_eq!(decoded.warnings.len(), 1);
    }
}
