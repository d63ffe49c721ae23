//! Property-value validation (§4.3 step 4). A violation is logged and
//! returned as a warning but never suppresses the value itself.

use crate::model::Validation;
use shared::{PropertyValue, Warning};

pub fn check(validation: &Validation, value: &PropertyValue) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if validation.required {
        let empty = matches!(value, PropertyValue::Text(s) if s.is_empty());
        if empty {
            warnings.push(Warning::validation(format!(
                "value {value} fails required constraint"
            )));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = validation.min {
            if n < min {
                warnings.push(Warning::validation(format!("{n} is below minimum {min}")));
            }
        }
        if let Some(max) = validation.max {
            if n > max {
                warnings.push(Warning::validation(format!("{n} is above maximum {max}")));
            }
        }
    }

    if let Some(allowed) = &validation.allowed_values {
        if !allowed.contains(value) {
            warnings.push(Warning::validation(format!(
                "{value} is not one of the allowed values"
            )));
        }
    }

    if let Some(pattern) = &validation.pattern {
        if let PropertyValue::Text(text) = value {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(text) {
                        warnings.push(Warning::validation(format!(
                            "{text:?} does not match pattern {pattern:?}"
                        )));
                    }
                }
                Err(err) => {
                    tracing::warn!(pattern, error = %err, "mapper: invalid validation pattern");
                }
            }
        }
    }

    for warning in &warnings {
        tracing::warn!(message = %warning.message, "mapper: validation warning");
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_violation_produces_a_warning_but_value_is_unaffected() {
        let validation = Validation {
            min: Some(0.0),
            max: Some(100.0),
            ..Validation::default()
        };
        let warnings = check(&validation, &PropertyValue::Integer(150));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn allowed_values_rejects_values_outside_the_set() {
        let validation = Validation {
            allowed_values: Some(vec![PropertyValue::Text("a".into()), PropertyValue::Text("b".into())]),
            ..Validation::default()
        };
        assert!(check(&validation, &PropertyValue::Text("a".into())).is_empty());
        assert_eq!(check(&validation, &PropertyValue::Text("c".into())).len(), 1);
    }

    #[test]
    fn pattern_checks_text_values() {
        let validation = Validation {
            pattern: Some("^[A-Z]+$".to_string()),
            ..Validation::default()
        };
        assert!(check(&validation, &PropertyValue::Text("ABC".into())).is_empty());
        assert_eq!(check(&validation, &PropertyValue::Text("abc".into())).len(), 1);
    }

    #[test]
    fn required_rejects_empty_text() {
        let validation = Validation {
            required: true,
            ..Validation::default()
        };
        assert_eq!(check(&validation, &PropertyValue::Text(String::new())).len(), 1);
        assert!(check(&validation, &PropertyValue::Text("x".into())).is_empty());
    }
}
