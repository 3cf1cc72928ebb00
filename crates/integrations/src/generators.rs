//! Identifier and throwaway-password generators.

use domain::{IdGenerator, PasswordGenerator};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated reset passwords.
pub const GENERATED_PASSWORD_LENGTH: usize = 8;

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Alphanumeric passwords from the thread-local RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomPasswordGenerator {
    length: usize,
}

impl RandomPasswordGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomPasswordGenerator {
    fn default() -> Self {
        Self::new(GENERATED_PASSWORD_LENGTH)
    }
}

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidGenerator;
        let a = ids.new_id();
        let b = ids.new_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_passwords_are_eight_alphanumerics() {
        let generator = RandomPasswordGenerator::default();
        for _ in 0..100 {
            let password = generator.generate();
            assert_eq!(password.len(), 8);
            assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
