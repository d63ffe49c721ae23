//! Whole-document parse tests: does a realistic schema load into the
//! expected `Mapper` shape (§8 scenarios 1, 2, 4, 6).

use mapper::load_mapper;
use shared::{Address, PropertyValue};

fn pokemon_red_like_document() -> &'static str {
    r#"{
        "name": "pokemon_red",
        "game": "Pokemon Red",
        "version": "1.0.0",
        "platform": {
            "name": "gb",
            "endian": "little",
            "memoryBlocks": [
                {"name": "wram", "start": "0xC000", "end": "0xDFFF"}
            ]
        },
        "properties": {
            "hp": {
                "name": "hp",
                "type": "uint16",
                "address": "0xD16C",
                "length": 2,
                "description": "Current HP of the lead Pokemon"
            },
            "maxHp": {
                "name": "maxHp",
                "type": "uint16",
                "address": "0xD16E",
                "length": 2
            },
            "score": {
                "name": "score",
                "type": "uint32",
                "address": "0xD7DD",
                "length": 3,
                "transform": { "multiply": 10 }
            },
            "coins": {
                "name": "coins",
                "type": "uint8",
                "address": "0xD5A4",
                "length": 1,
                "transform": {
                    "lookup": { "99": "MAX" }
                }
            },
            "lives": {
                "name": "lives",
                "type": "uint8",
                "address": "0xD75A",
                "length": 1,
                "freezable": true
            },
            "name": {
                "name": "name",
                "type": "string",
                "address": "0xD158",
                "length": 11,
                "charMap": {
                    "145": "R",
                    "142": "O",
                    "146": "N"
                }
            }
        },
        "computed": {
            "hpPct": {
                "expression": "hp / maxHp * 100",
                "dependencies": ["hp", "maxHp"],
                "type": "float32"
            }
        },
        "groups": {
            "stats": {
                "name": "Stats",
                "properties": ["hp", "maxHp", "hpPct"]
            }
        }
    }"#
}

#[test]
fn loads_a_realistic_document_end_to_end() {
    let loaded = load_mapper(pokemon_red_like_document()).unwrap();
    assert_eq!(loaded.name, "pokemon_red");
    assert_eq!(loaded.game, "Pokemon Red");

    let hp = loaded.property("hp").unwrap();
    assert_eq!(hp.address, Some(Address(0xD16C)));
    assert_eq!(hp.length, 2);

    let score = loaded.property("score").unwrap();
    assert_eq!(score.transform.as_ref().unwrap().multiply, Some(10.0));

    assert!(loaded.property("hpPct").unwrap().is_computed());
    assert!(loaded.groups.contains_key("stats"));
}

#[test]
fn decode_order_places_hp_and_max_hp_before_the_computed_percentage() {
    let loaded = load_mapper(pokemon_red_like_document()).unwrap();
    let hp_index = loaded.decode_order.iter().position(|n| n == "hp").unwrap();
    let max_hp_index = loaded.decode_order.iter().position(|n| n == "maxHp").unwrap();
    let pct_index = loaded
        .decode_order
        .iter()
        .position(|n| n == "hpPct")
        .unwrap();
    assert!(hp_index < pct_index);
    assert!(max_hp_index < pct_index);
}

#[test]
fn parser_is_deterministic_across_repeated_loads() {
    let first = load_mapper(pokemon_red_like_document()).unwrap();
    let second = load_mapper(pokemon_red_like_document()).unwrap();
    assert_eq!(first.decode_order, second.decode_order);
    assert_eq!(first.properties.keys().collect::<Vec<_>>(), second.properties.keys().collect::<Vec<_>>());
}

#[test]
fn rejects_a_schema_with_a_group_referencing_an_undefined_property() {
    let mut doc: serde_json::Value =
        serde_json::from_str(pokemon_red_like_document()).unwrap();
    doc["groups"]["stats"]["properties"] = serde_json::json!(["ghost"]);
    let text = serde_json::to_string(&doc).unwrap();
    let err = load_mapper(&text).unwrap_err();
    match err {
        mapper::MapperError::Invalid { issues } => {
            assert!(issues.iter().any(|i| i.contains("ghost")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn constants_are_exposed_as_a_bare_identifier_context() {
    let mut doc: serde_json::Value =
        serde_json::from_str(pokemon_red_like_document()).unwrap();
    doc["constants"] = serde_json::json!({"baseOffset": 10, "region": "US"});
    let loaded = load_mapper(&serde_json::to_string(&doc).unwrap()).unwrap();
    let context = loaded.constants_context();
    assert_eq!(context.get("baseOffset"), Some(&PropertyValue::Integer(10)));
    assert_eq!(
        context.get("region"),
        Some(&PropertyValue::Text("US".to_string()))
    );
}

#[test]
fn lookup_transform_round_trips_the_max_scenario() {
    use mapper::transform::apply;
    use std::collections::HashMap;

    let loaded = load_mapper(pokemon_red_like_document()).unwrap();
    let coins = loaded.property("coins").unwrap();
    let transform = coins.transform.as_ref().unwrap();
    let result = apply(transform, PropertyValue::Integer(0x63), &HashMap::new()).unwrap();
    assert_eq!(result, PropertyValue::Text("MAX".to_string()));
}
