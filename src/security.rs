use subtle::ConstantTimeEq;

/// Constant-time comparison of a submitted one-time code against the stored one.
///
/// Exact byte equality: no trimming, no case folding. A length mismatch
/// returns early since code length is not secret.
pub fn otp_matches(submitted: &str, expected: &str) -> bool {
    if submitted.len() != expected.len() {
        return false;
    }
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_matches_identical() {
        assert!(otp_matches("482913", "482913"));
    }

    #[test]
    fn test_otp_matches_rejects_other_digits() {
        assert!(!otp_matches("482914", "482913"));
        assert!(!otp_matches("48291", "482913"));
        assert!(!otp_matches("", "482913"));
    }

    #[test]
    fn test_otp_matches_does_not_normalize() {
        assert!(!otp_matches(" 482913", "482913"));
        assert!(!otp_matches("482913 ", "482913"));
        assert!(!otp_matches("４８２９１３", "482913"));
    }
}
