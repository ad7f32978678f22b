/// Normalizes a phone number to the `+91XXXXXXXXXX` form used as the
/// login identity. Accepts local 10-digit numbers, a leading zero, and
/// the `91`/`+91` country prefix; separators are ignored.
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = cleaned.strip_prefix("+91") {
        rest
    } else if cleaned.len() == 12 && cleaned.starts_with("91") {
        &cleaned[2..]
    } else if cleaned.len() == 11 && cleaned.starts_with('0') {
        &cleaned[1..]
    } else {
        &cleaned
    };

    if digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(format!("+91{digits}"))
    } else {
        Err(format!("'{raw}' is not a valid phone number"))
    }
}
