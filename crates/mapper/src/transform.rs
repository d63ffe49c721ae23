//! The transform pipeline (§4.3 step 3), applied in the canonical order
//! this spec fixes: arithmetic, then range, then conditions, then lookup,
//! then string_ops, then expression. Every stage is optional and passes
//! the value through unchanged when absent.

use crate::expr;
use crate::model::{ConditionRule, RangeTransform, StringOps, Transform};
use shared::PropertyValue;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("transform expression error: {0}")]
    Expr(#[from] expr::ExprError),
}

pub fn apply(
    transform: &Transform,
    mut value: PropertyValue,
    context: &HashMap<String, PropertyValue>,
) -> Result<PropertyValue, TransformError> {
    value = apply_arithmetic(transform, value);
    if let Some(range) = &transform.range {
        value = apply_range(range, value);
    }
    if let Some(conditions) = &transform.conditions {
        value = apply_conditions(conditions, value, context)?;
    }
    if let Some(lookup) = &transform.lookup {
        value = apply_lookup(lookup, value);
    }
    if let Some(string_ops) = &transform.string_ops {
        value = apply_string_ops(string_ops, value);
    }
    if let Some(expression) = &transform.expression {
        let ast = expr::parse(expression)?;
        value = expr::eval(&ast, context, Some(&value))?;
    }
    Ok(value)
}

fn apply_arithmetic(transform: &Transform, value: PropertyValue) -> PropertyValue {
    let has_arithmetic = transform.multiply.is_some()
        || transform.divide.is_some()
        || transform.add.is_some()
        || transform.subtract.is_some();
    if !has_arithmetic {
        return value;
    }
    let Some(mut n) = value.as_f64() else {
        return value;
    };
    if let Some(m) = transform.multiply {
        n *= m;
    }
    if let Some(d) = transform.divide {
        n /= d;
    }
    if let Some(a) = transform.add {
        n += a;
    }
    if let Some(s) = transform.subtract {
        n -= s;
    }
    PropertyValue::Float(n)
}

fn apply_range(range: &RangeTransform, value: PropertyValue) -> PropertyValue {
    let Some(n) = value.as_f64() else {
        return value;
    };
    let in_span = range.in_max - range.in_min;
    let scaled = if in_span == 0.0 {
        range.out_min
    } else {
        let t = (n - range.in_min) / in_span;
        range.out_min + t * (range.out_max - range.out_min)
    };
    let result = if range.clamp {
        scaled.clamp(
            range.out_min.min(range.out_max),
            range.out_min.max(range.out_max),
        )
    } else {
        scaled
    };
    PropertyValue::Float(result)
}

/// Evaluated as an if/elif chain: the first rule whose `if` is true wins;
/// if none match, the last rule's `else` (when present) is the fallback —
/// see DESIGN.md for why this reading was chosen over the alternatives.
fn apply_conditions(
    conditions: &[ConditionRule],
    value: PropertyValue,
    context: &HashMap<String, PropertyValue>,
) -> Result<PropertyValue, expr::ExprError> {
    for (i, rule) in conditions.iter().enumerate() {
        let cond_ast = expr::parse(&rule.if_expr)?;
        let cond = expr::eval(&cond_ast, context, Some(&value))?;
        let is_true = matches!(cond, PropertyValue::Bool(true))
            || cond.as_f64().map(|n| n != 0.0).unwrap_or(false);
        if is_true {
            let then_ast = expr::parse(&rule.then)?;
            return expr::eval(&then_ast, context, Some(&value));
        }
        if i == conditions.len() - 1 {
            if let Some(else_expr) = &rule.else_expr {
                let else_ast = expr::parse(else_expr)?;
                return expr::eval(&else_ast, context, Some(&value));
            }
        }
    }
    Ok(value)
}

fn apply_lookup(lookup: &std::collections::BTreeMap<String, String>, value: PropertyValue) -> PropertyValue {
    let key = value.to_string();
    match lookup.get(&key) {
        Some(replacement) => PropertyValue::Text(replacement.clone()),
        None => value,
    }
}

fn apply_string_ops(ops: &StringOps, value: PropertyValue) -> PropertyValue {
    let mut text = match value {
        PropertyValue::Text(s) => s,
        other => other.to_string(),
    };
    if ops.trim {
        text = text.trim().to_string();
    }
    for (from, to) in &ops.replace {
        text = text.replace(from.as_str(), to.as_str());
    }
    if ops.upper {
        text = text.to_uppercase();
    } else if ops.lower {
        text = text.to_lowercase();
    }
    PropertyValue::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConditionRule, RangeTransform};
    use std::collections::BTreeMap;

    fn ctx() -> HashMap<String, PropertyValue> {
        HashMap::new()
    }

    #[test]
    fn arithmetic_applies_multiply_divide_add_subtract_in_order() {
        let transform = Transform {
            multiply: Some(10.0),
            divide: Some(2.0),
            add: Some(1.0),
            subtract: Some(0.5),
            ..Transform::default()
        };
        // (3 * 10) / 2 + 1 - 0.5 = 16.5
        let result = apply(&transform, PropertyValue::Integer(3), &ctx()).unwrap();
        assert_eq!(result, PropertyValue::Float(16.5));
    }

    #[test]
    fn range_maps_and_clamps() {
        let transform = Transform {
            range: Some(RangeTransform {
                in_min: 0.0,
                in_max: 255.0,
                out_min: 0.0,
                out_max: 100.0,
                clamp: true,
            }),
            ..Transform::default()
        };
        let result = apply(&transform, PropertyValue::Integer(300), &ctx()).unwrap();
        assert_eq!(result, PropertyValue::Float(100.0));
    }

    #[test]
    fn lookup_replaces_on_exact_stringified_key_match() {
        let mut lookup = BTreeMap::new();
        lookup.insert("99".to_string(), "MAX".to_string());
        let transform = Transform {
            lookup: Some(lookup),
            ..Transform::default()
        };
        let result = apply(&transform, PropertyValue::Integer(99), &ctx()).unwrap();
        assert_eq!(result, PropertyValue::Text("MAX".to_string()));
    }

    #[test]
    fn conditions_first_match_wins() {
        let conditions = vec![
            ConditionRule {
                if_expr: "value > 100".to_string(),
                then: "\"big\"".to_string(),
                else_expr: None,
            },
            ConditionRule {
                if_expr: "value > 0".to_string(),
                then: "\"small\"".to_string(),
                else_expr: Some("\"zero\"".to_string()),
            },
        ];
        let transform = Transform {
            conditions: Some(conditions),
            ..Transform::default()
        };
        let result = apply(&transform, PropertyValue::Integer(50), &ctx()).unwrap();
        assert_eq!(result, PropertyValue::Text("small".to_string()));
    }

    #[test]
    fn canonical_order_runs_range_before_lookup() {
        let mut lookup = BTreeMap::new();
        lookup.insert("100".to_string(), "FULL".to_string());
        let transform = Transform {
            range: Some(RangeTransform {
                in_min: 0.0,
                in_max: 255.0,
                out_min: 0.0,
                out_max: 100.0,
                clamp: true,
            }),
            lookup: Some(lookup),
            ..Transform::default()
        };
        let result = apply(&transform, PropertyValue::Integer(255), &ctx()).unwrap();
        assert_eq!(result, PropertyValue::Text("FULL".to_string()));
    }
}
