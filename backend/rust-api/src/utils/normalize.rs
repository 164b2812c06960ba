/// Canonicalizes program output for comparison: commas become spaces,
/// whitespace runs collapse to a single space, leading/trailing whitespace
/// is trimmed. Comparison stays sensitive to case, numeric formatting and
/// token order.
///
/// Note: commas are folded unconditionally, so comma-bearing *data* (CSV-like
/// output) compares equal to its space-separated form. Carried over as
/// observed product behavior; see DESIGN.md.
pub fn normalize(raw: &str) -> String {
    raw.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compares two program outputs under `normalize`.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    normalize(actual) == normalize(expected)
}
