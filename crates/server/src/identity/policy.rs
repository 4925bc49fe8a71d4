//! Password strength policy.

/// Decides whether a candidate password is acceptable. The returned message completes
/// the sentence "Password ...".
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, password: &str) -> Result<(), String>;
}

/// Minimum length plus at least one letter and one digit.
#[derive(Clone, Debug)]
pub struct StandardPasswordPolicy {
    pub min_length: usize,
}

impl PasswordPolicy for StandardPasswordPolicy {
    fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "must be at least {} characters long",
                self.min_length
            ));
        }
        if !password.chars().any(char::is_alphabetic) {
            return Err("must contain at least one letter".into());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("must contain at least one digit".into());
        }
        Ok(())
    }
}

/// Loose syntactic check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_policy() {
        let policy = StandardPasswordPolicy { min_length: 8 };
        assert!(policy.check("abcdefg1").is_ok());
        assert!(policy.check("abc1").is_err());
        assert!(policy.check("12345678").is_err());
        assert!(policy.check("abcdefgh").is_err());
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("ada@example.org"));
        assert!(!is_plausible_email("ada.example.org"));
        assert!(!is_plausible_email("@example.org"));
        assert!(!is_plausible_email("ada@localhost"));
        assert!(!is_plausible_email("ada@@example.org"));
        assert!(!is_plausible_email("ada lovelace@example.org"));
    }
}
