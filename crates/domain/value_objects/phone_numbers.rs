use anyhow::{Result, bail};

/// Country code the M-Pesa STK push endpoint expects in `PartyA`/`PhoneNumber`.
pub const MPESA_COUNTRY_CODE: &str = "254";

const LESOTHO_COUNTRY_CODE: &str = "266";

/// Rewrites a user-entered phone number into the `2547XXXXXXXX` shape.
///
/// This is prefix substitution only: non-digits are dropped, a Lesotho `266`
/// prefix and a local leading `0` are swapped for the M-Pesa country code, a
/// bare 9-digit subscriber number gets the code prepended, and anything else is
/// passed through as the cleaned digits.
pub fn normalize_mpesa_phone_number(raw: &str) -> Result<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if cleaned.is_empty() {
        bail!("Invalid phone number: no digits");
    }

    if let Some(rest) = cleaned.strip_prefix(LESOTHO_COUNTRY_CODE) {
        return Ok(format!("{MPESA_COUNTRY_CODE}{rest}"));
    }

    if let Some(rest) = cleaned.strip_prefix('0') {
        return Ok(format!("{MPESA_COUNTRY_CODE}{rest}"));
    }

    if cleaned.starts_with(MPESA_COUNTRY_CODE) {
        return Ok(cleaned);
    }

    if cleaned.len() == 9 {
        return Ok(format!("{MPESA_COUNTRY_CODE}{cleaned}"));
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbers_get_country_code() {
        assert_eq!(
            normalize_mpesa_phone_number("0712345678").unwrap(),
            "254712345678"
        );
        assert_eq!(
            normalize_mpesa_phone_number("712345678").unwrap(),
            "254712345678"
        );
    }

    #[test]
    fn formatting_characters_are_stripped() {
        assert_eq!(
            normalize_mpesa_phone_number("+254 712-345-678").unwrap(),
            "254712345678"
        );
        assert_eq!(
            normalize_mpesa_phone_number("(0712) 345 678").unwrap(),
            "254712345678"
        );
    }

    #[test]
    fn lesotho_prefix_is_substituted() {
        assert_eq!(
            normalize_mpesa_phone_number("+266 5012 3456").unwrap(),
            "25450123456"
        );
    }

    #[test]
    fn unrecognised_shapes_pass_through_cleaned() {
        assert_eq!(
            normalize_mpesa_phone_number("1-555-0100").unwrap(),
            "15550100"
        );
    }

    #[test]
    fn input_without_digits_is_rejected() {
        let err = normalize_mpesa_phone_number("call me").unwrap_err().to_string();
        assert!(err.contains("Invalid phone number"), "got: {err}");
    }
}
