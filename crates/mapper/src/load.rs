//! `Load(document) -> Mapper | mapper_invalid` (§4.3). Parses the schema
//! document then runs every invariant from §3 before handing back an
//! immutable [`Mapper`].

use crate::error::MapperError;
use crate::expr;
use crate::graph;
use crate::model::{Mapper, MapperDocument, Property};
use std::collections::{HashMap, HashSet};

pub fn load_mapper(document_json: &str) -> Result<Mapper, MapperError> {
    let document: MapperDocument = serde_json::from_str(document_json)?;
    load_from_document(document)
}

fn load_from_document(mut document: MapperDocument) -> Result<Mapper, MapperError> {
    let mut issues = Vec::new();

    // Fold the top-level `computed` map into the unified property set.
    for (name, spec) in std::mem::take(&mut document.computed) {
        if document.properties.contains_key(&name) {
            issues.push(format!("computed property {name:?} collides with a decoded property of the same name"));
            continue;
        }
        document.properties.insert(
            name.clone(),
            Property {
                name: name.clone(),
                property_type: spec.result_type,
                address: None,
                length: 0,
                position: None,
                endian: None,
                read_only: true,
                description: String::new(),
                transform: None,
                validation: None,
                freezable: false,
                default_frozen: false,
                char_map: None,
                depends_on: spec.dependencies.clone(),
                computed: Some(spec),
            },
        );
    }

    for (name, property) in &document.properties {
        if name != &property.name {
            issues.push(format!(
                "property key {name:?} does not match its declared name {:?}",
                property.name
            ));
        }
        check_property(&document, property, &mut issues);
    }

    for (name, group) in &document.groups {
        for member in &group.properties {
            if !document.properties.contains_key(member) {
                issues.push(format!(
                    "group {name:?} references undefined property {member:?}"
                ));
            }
        }
    }

    for (stage, hooks) in [("preprocess", &document.preprocess), ("postprocess", &document.postprocess)] {
        for expression in hooks {
            if let Err(err) = expr::validate_syntax(expression) {
                issues.push(format!("{stage} expression {expression:?} is invalid: {err}"));
            }
        }
    }

    let names: Vec<String> = document.properties.keys().cloned().collect();
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    for (name, property) in &document.properties {
        let mut deps: Vec<String> = property.depends_on.clone();
        if let Some(computed) = &property.computed {
            for dep in &computed.dependencies {
                if !deps.contains(dep) {
                    deps.push(dep.clone());
                }
            }
        }
        edges.insert(name.clone(), deps);
    }

    let decode_order = match graph::topological_order(&names, &edges) {
        Ok(order) => order,
        Err(err) => {
            issues.push(err.to_string());
            Vec::new()
        }
    };

    if !issues.is_empty() {
        for issue in &issues {
            tracing::warn!(issue, "mapper: validation failure");
        }
        return Err(MapperError::Invalid { issues });
    }

    Ok(Mapper {
        name: document.name,
        game: document.game,
        version: document.version,
        min_version: document.min_version,
        platform: document.platform,
        properties: document.properties,
        groups: document.groups,
        constants: document.constants,
        preprocess: document.preprocess,
        postprocess: document.postprocess,
        decode_order,
    })
}

fn check_property(document: &MapperDocument, property: &Property, issues: &mut Vec<String>) {
    if property.is_computed() {
        let computed = property.computed.as_ref().unwrap();
        if let Err(err) = expr::validate_syntax(&computed.expression) {
            issues.push(format!(
                "computed property {:?} has an invalid expression: {err}",
                property.name
            ));
        }
        for dep in &computed.dependencies {
            if !document.properties.contains_key(dep) {
                issues.push(format!(
                    "computed property {:?} depends on undefined property {dep:?}",
                    property.name
                ));
            }
        }
        return;
    }

    let Some(addr) = property.address else {
        issues.push(format!(
            "property {:?} has neither an address nor a computed expression",
            property.name
        ));
        return;
    };

    let covered = document
        .platform
        .memory_blocks
        .iter()
        .any(|block| block.contains_range(addr, property.length));
    if !covered {
        issues.push(format!(
            "property {:?} address range is not covered by any memory block",
            property.name
        ));
    }

    if let Some(max) = property.property_type.max_length() {
        if property.length > max {
            issues.push(format!(
                "property {:?} has length {} but type {} supports at most {max} bytes",
                property.name, property.length, property.property_type
            ));
        }
    }

    if property.property_type.requires_position() {
        match property.position {
            Some(pos) if pos <= property.property_type.max_position() => {}
            _ => issues.push(format!(
                "property {:?} requires a position in range 0..={}",
                property.name,
                property.property_type.max_position()
            )),
        }
    }

    for dep in &property.depends_on {
        if !document.properties.contains_key(dep) {
            issues.push(format!(
                "property {:?} depends on undefined property {dep:?}",
                property.name
            ));
        }
    }

    if let Some(transform) = &property.transform {
        if let Some(expression) = &transform.expression {
            if let Err(err) = expr::validate_syntax(expression) {
                issues.push(format!(
                    "property {:?} has an invalid transform expression: {err}",
                    property.name
                ));
            }
        }
        if let Some(conditions) = &transform.conditions {
            for rule in conditions {
                if let Err(err) = expr::validate_syntax(&rule.if_expr) {
                    issues.push(format!(
                        "property {:?} has an invalid condition: {err}",
                        property.name
                    ));
                }
            }
        }
    }

    let seen_dependents: HashSet<&str> = property.depends_on.iter().map(String::as_str).collect();
    if seen_dependents.len() != property.depends_on.len() {
        issues.push(format!(
            "property {:?} lists a duplicate dependency",
            property.name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_document() -> String {
        r#"{
            "name": "test-mapper",
            "game": "Test Game",
            "platform": {
                "name": "gb",
                "endian": "little",
                "memoryBlocks": [{"name": "wram", "start": "0x0000", "end": "0xFFFF"}]
            },
            "properties": {
                "hp": {
                    "name": "hp",
                    "type": "uint16",
                    "address": "0xD16C",
                    "length": 2
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn loads_a_minimal_valid_mapper() {
        let mapper = load_mapper(&minimal_document()).unwrap();
        assert_eq!(mapper.name, "test-mapper");
        assert!(mapper.property("hp").is_some());
        assert_eq!(mapper.decode_order, vec!["hp".to_string()]);
    }

    #[test]
    fn rejects_a_property_outside_every_memory_block() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["platform"]["memoryBlocks"] =
            serde_json::json!([{"name": "wram", "start": "0x0000", "end": "0x00FF"}]);
        let err = load_from_document(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, MapperError::Invalid { .. }));
    }

    #[test]
    fn rejects_a_dependency_cycle() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["properties"]["mp"] = serde_json::json!({
            "name": "mp",
            "type": "uint16",
            "address": "0xD170",
            "length": 2,
            "dependsOn": ["hp"]
        });
        doc["properties"]["hp"]["dependsOn"] = serde_json::json!(["mp"]);
        let err = load_from_document(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, MapperError::Invalid { .. }));
    }

    #[test]
    fn rejects_bit_property_without_position() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["properties"]["flag"] = serde_json::json!({
            "name": "flag",
            "type": "bit",
            "address": "0xD200",
            "length": 1
        });
        let err = load_from_document(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, MapperError::Invalid { .. }));
    }

    #[test]
    fn rejects_an_integer_like_property_declared_wider_than_eight_bytes() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["properties"]["hp"]["type"] = serde_json::json!("checksum");
        doc["properties"]["hp"]["length"] = serde_json::json!(16);
        let err = load_from_document(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, MapperError::Invalid { .. }));
    }

    #[test]
    fn rejects_an_invalid_preprocess_expression() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["preprocess"] = serde_json::json!(["for (;;) {}"]);
        let err = load_from_document(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, MapperError::Invalid { .. }));
    }

    #[test]
    fn folds_top_level_computed_properties_into_the_unified_set() {
        let mut doc: serde_json::Value = serde_json::from_str(&minimal_document()).unwrap();
        doc["computed"] = serde_json::json!({
            "hpPct": {
                "expression": "hp",
                "dependencies": ["hp"],
                "type": "float32"
            }
        });
        let mapper = load_from_document(serde_json::from_value(doc).unwrap()).unwrap();
        assert!(mapper.property("hpPct").unwrap().is_computed());
        assert_eq!(mapper.decode_order, vec!["hp".to_string(), "hpPct".to_string()]);
    }
}
