//! Phone number formatting helpers

/// Default international prefix (Czech Republic)
pub const DEFAULT_INTL_PREFIX: &str = "420";
/// Default length from which a number starting with the prefix is international
pub const DEFAULT_INTL_LENGTH: usize = 12;

/// Normalize a phone number into `00<prefix><number>` or `+<prefix><number>`.
///
/// Spaces are removed. A number that already starts with `intl_prefix` and is
/// at least `intl_length` characters long is treated as international; a
/// number with neither `+` nor `00` gets `intl_prefix` prepended.
pub fn normalize_phone_number(
    raw: &str,
    plus_sign: bool,
    intl_prefix: &str,
    intl_length: usize,
) -> String {
    let marker = if plus_sign { "+" } else { "00" };
    let mut number = raw.replace(' ', "");

    if number.starts_with(intl_prefix) && number.chars().count() >= intl_length {
        number = format!("{}{}", marker, number);
    }
    if !number.starts_with('+') && !number.starts_with("00") {
        number = format!("{}{}{}", marker, intl_prefix, number);
    }
    if let Some(rest) = number.strip_prefix('+') {
        number = format!("{}{}", marker, rest);
    }
    if let Some(rest) = number.strip_prefix("00") {
        number = format!("{}{}", marker, rest);
    }

    number
}

/// [`normalize_phone_number`] with the default prefix and length
pub fn normalize_phone_number_default(raw: &str, plus_sign: bool) -> String {
    normalize_phone_number(raw, plus_sign, DEFAULT_INTL_PREFIX, DEFAULT_INTL_LENGTH)
}
