use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generates a random alphanumeric string of the given length.
pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generates a fresh document id, following the backend's 20 character
/// alphanumeric convention.
pub fn random_id() -> String {
    random_string(20)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_have_the_expected_shape() {
        let id = random_id();

        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
