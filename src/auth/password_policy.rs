/*!
 * # Password Policy Module
 *
 * Password rules applied at registration and staff account creation,
 * plus random password generation for seeded accounts.
 */

use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min_length} characters required")]
    TooShort { min_length: usize },

    #[error("Password too long: maximum {max_length} characters allowed")]
    TooLong { max_length: usize },

    #[error("Password must contain at least one letter")]
    MissingLetter,

    #[error("Password must contain at least one number")]
    MissingNumber,

    #[error("Password is in the list of commonly used passwords")]
    CommonPassword,

    #[error("Password is too similar to the email address")]
    SimilarToEmail,
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_letter: bool,
    pub require_number: bool,
    pub prevent_common_passwords: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: true,
            require_number: true,
            prevent_common_passwords: true,
        }
    }
}

lazy_static! {
    static ref COMMON_PASSWORDS: HashSet<&'static str> = {
        let common = [
            "password", "password1", "password123", "12345678", "123456789",
            "1234567890", "qwerty123", "iloveyou", "princess1", "abc12345",
            "welcome1", "letmein1", "football1", "baseball1", "superman1",
            "trustno1", "zaq1zaq1", "1qaz2wsx", "q1w2e3r4", "asdf1234",
            "pharmacy1", "pharmacy123", "medicine1", "qwertyuiop", "11111111",
        ];
        common.into_iter().collect()
    };
}

impl PasswordPolicy {
    /// Validate a password against the policy
    pub fn validate(&self, password: &str, email: Option<&str>) -> Result<(), PasswordPolicyError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }

        if length > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max_length: self.max_length,
            });
        }

        if self.require_letter && !password.chars().any(|c| c.is_alphabetic()) {
            return Err(PasswordPolicyError::MissingLetter);
        }

        if self.require_number && !password.chars().any(|c| c.is_numeric()) {
            return Err(PasswordPolicyError::MissingNumber);
        }

        if self.prevent_common_passwords
            && COMMON_PASSWORDS.contains(password.to_lowercase().as_str())
        {
            return Err(PasswordPolicyError::CommonPassword);
        }

        if let Some(email) = email {
            if Self::is_similar_to_email(password, email) {
                return Err(PasswordPolicyError::SimilarToEmail);
            }
        }

        Ok(())
    }

    /// Password contains the local part of the email (ignored when it is very short)
    fn is_similar_to_email(password: &str, email: &str) -> bool {
        let local = email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        local.len() >= 4 && password.to_lowercase().contains(&local)
    }

    /// Generate a random password that satisfies the policy
    pub fn generate_secure_password(&self) -> String {
        const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const NUMBERS: &[u8] = b"0123456789";

        let mut rng = thread_rng();
        let length = self.min_length.max(16);

        let mut password: Vec<char> = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(length.saturating_sub(2))
            .map(char::from)
            .collect();
        if let Some(c) = LETTERS.choose(&mut rng) {
            password.push(*c as char);
        }
        if let Some(c) = NUMBERS.choose(&mut rng) {
            password.push(*c as char);
        }
        password.shuffle(&mut rng);
        password.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_password_policy_validation() {
        let policy = PasswordPolicy::default();

        assert_matches!(
            policy.validate("ab1", None),
            Err(PasswordPolicyError::TooShort { min_length: 8 })
        );
        assert_matches!(
            policy.validate("abcdefghij", None),
            Err(PasswordPolicyError::MissingNumber)
        );
        assert_matches!(
            policy.validate("1234509876", None),
            Err(PasswordPolicyError::MissingLetter)
        );
        assert_matches!(
            policy.validate("Password1", None),
            Err(PasswordPolicyError::CommonPassword)
        );
        assert_matches!(
            policy.validate("maria.lopez99", Some("maria.lopez@example.com")),
            Err(PasswordPolicyError::SimilarToEmail)
        );
        assert!(policy
            .validate("Tablet-Dose-42", Some("maria.lopez@example.com"))
            .is_ok());
    }

    #[test]
    fn test_secure_password_generation() {
        let policy = PasswordPolicy::default();
        for _ in 0..20 {
            let password = policy.generate_secure_password();
            assert_eq!(password.len(), 16);
            assert!(policy.validate(&password, None).is_ok());
        }
    }
}
