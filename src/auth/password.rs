use crate::error::AppError;
use bcrypt::{hash, verify};

/// Salted one-way password hashing with a configurable bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    /// `Ok(false)` on mismatch. A malformed stored hash is a server-side error.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        verify(password, hashed_password)
            .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = PasswordHasher::new(4);
        let password = "test_password123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(password, &hashed).unwrap());
        assert!(!hasher.verify("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new(4);
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        match PasswordHasher::new(4).verify("test_password123", "invalidhashformat") {
            Err(AppError::InternalServerError(msg)) => {
                assert!(msg.contains("Failed to verify password"));
            }
            Ok(false) => {}
            Ok(true) => panic!("Password verification should fail for invalid hash format"),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }
}
