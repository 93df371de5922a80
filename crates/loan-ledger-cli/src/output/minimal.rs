use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks for the headline figure of each result shape in priority order,
/// then falls back to the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "total_debt",
        "outstanding_balance",
        "total_collected",
        "total_due",
        "payment",
        "id",
    ];

    if let Value::Object(map) = result_obj {
        // Headline figures first, skipping nulls
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        // Otherwise the first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Bare value, e.g. a list of receipts
    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // Records (a receipt's payment) print as their id
        Value::Object(map) => match map.get("id") {
            Some(Value::String(id)) => id.clone(),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
