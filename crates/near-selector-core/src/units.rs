//! NEAR <-> yoctoNEAR conversions.

/// Number of decimal places in one NEAR.
pub const NEAR_NOMINATION_EXP: usize = 24;

/// Converts a human readable NEAR amount (`"1.5"`, `"1,000"`) into yoctoNEAR.
/// Returns `None` for empty or malformed input.
pub fn parse_near_amount(amount: &str) -> Option<String> {
    let cleaned: String = amount.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let mut parts = cleaned.split('.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next().unwrap_or_default();
    if parts.next().is_some() || frac.len() > NEAR_NOMINATION_EXP {
        return None;
    }
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = String::with_capacity(whole.len() + NEAR_NOMINATION_EXP);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(NEAR_NOMINATION_EXP - frac.len()));
    Some(trim_leading_zeroes(&digits))
}

/// Converts yoctoNEAR into NEAR, rounded half-up to `frac_digits` places.
pub fn format_near_amount(yocto: &str, frac_digits: usize) -> Option<String> {
    let mut value: u128 = yocto.trim().parse().ok()?;
    let frac_digits = frac_digits.min(NEAR_NOMINATION_EXP);
    if frac_digits < NEAR_NOMINATION_EXP {
        let rounding_exp = NEAR_NOMINATION_EXP - frac_digits - 1;
        if rounding_exp > 0 {
            value = value.checked_add(5 * 10u128.pow(rounding_exp as u32))?;
        }
    }
    let raw = value.to_string();
    let split = raw.len().saturating_sub(NEAR_NOMINATION_EXP);
    let whole = if split == 0 { "0" } else { &raw[..split] };
    let frac = format!("{:0>width$}", &raw[split..], width = NEAR_NOMINATION_EXP);
    let formatted = format!("{}.{}", with_commas(whole), &frac[..frac_digits]);
    Some(trim_trailing_zeroes(&formatted))
}

fn trim_leading_zeroes(value: &str) -> String {
    let trimmed = value.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn trim_trailing_zeroes(value: &str) -> String {
    let trimmed = value.trim_end_matches('0');
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_owned()
}

fn with_commas(whole: &str) -> String {
    let mut out = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
