use std::collections::BTreeMap;

use validator::{ValidationError, ValidationErrors};

/// An error for a rule the derive can't express (`unique`, `exists`).
pub fn rule_error(code: &'static str) -> ValidationError {
    ValidationError::new(code)
}

/// Flattens validator output into `field -> [messages]`, sorted by field.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let field = field.to_string();
            let messages = errs.iter().map(|e| describe(&field, e)).collect();
            (field, messages)
        })
        .collect()
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let label = field.replace('_', " ");
    match error.code.as_ref() {
        "required" => format!("The {} field is required.", label),
        "length" => {
            let blank = error
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map_or(false, str::is_empty);
            match error.params.get("max") {
                Some(max) if !blank => {
                    format!("The {} may not be greater than {} characters.", label, max)
                }
                _ => format!("The {} field is required.", label),
            }
        }
        "unique" => format!("The {} has already been taken.", label),
        "exists" => format!("The selected {} is invalid.", label),
        other => format!("The {} is invalid ({}).", label, other),
    }
}
