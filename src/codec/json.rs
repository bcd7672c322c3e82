use tracing::warn;

/// Serializes the values as a JSON array literal.
pub fn encode<S: AsRef<str>>(values: &[S]) -> String {
    let values: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
    // A slice of strings always serializes.
    serde_json::to_string(&values).unwrap_or_else(|_| "[]".to_string())
}

/// Parses a JSON array of strings. Null, blank and malformed input all
/// decode to an empty list.
pub fn decode(raw: Option<&str>) -> Vec<String> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Vec::new(),
    };
    match serde_json::from_str::<Option<Vec<String>>>(raw) {
        Ok(values) => values.unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "discarding malformed JSON list");
            Vec::new()
        }
    }
}
