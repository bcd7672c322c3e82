/// Separator written between values. Decoding splits on the bare comma.
pub const SEPARATOR: &str = ", ";

/// Trims each value, drops blanks and joins the rest with `", "`.
pub fn encode<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Splits on `,`, trims and drops blanks. `None` decodes to an empty list.
///
/// Values that contained a comma when encoded come back split in two.
pub fn decode(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}
