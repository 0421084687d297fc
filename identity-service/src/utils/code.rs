use rand::Rng;

/// Length of one-time verification codes.
pub const VERIFICATION_CODE_LENGTH: usize = 6;

/// Generate a numeric one-time code of `length` digits. Leading zeros are kept.
pub fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed_length_digits() {
        for _ in 0..100 {
            let code = generate_numeric_code(VERIFICATION_CODE_LENGTH);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
