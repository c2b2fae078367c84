//! Password strength requirements for key encryption
//!
//! A password protecting a stored key must be at least
//! [`MINIMUM_PASSWORD_LENGTH`] characters, mix upper case, lower case, digits
//! and symbols, avoid common passwords, and reach
//! [`MINIMUM_ENTROPY_BITS`] of estimated entropy once penalties for
//! predictable patterns are applied.

use std::collections::HashSet;

/// Minimum number of characters in a key password
pub const MINIMUM_PASSWORD_LENGTH: usize = 14;

/// Minimum estimated entropy (bits) after pattern penalties
pub const MINIMUM_ENTROPY_BITS: f64 = 80.0;

/// Password strength score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordScore {
    /// < 60 bits
    TooWeak = 0,
    /// 60-79 bits
    Weak = 1,
    /// 80-99 bits
    Acceptable = 2,
    /// 100+ bits
    Strong = 3,
}

impl PasswordScore {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, PasswordScore::Acceptable | PasswordScore::Strong)
    }

    pub fn description(&self) -> &'static str {
        match self {
            PasswordScore::TooWeak => "TOO WEAK",
            PasswordScore::Weak => "WEAK",
            PasswordScore::Acceptable => "ACCEPTABLE",
            PasswordScore::Strong => "STRONG",
        }
    }
}

/// Password strength analysis result
#[derive(Debug, Clone)]
pub struct PasswordStrength {
    /// Entropy in bits
    pub entropy_bits: f64,
    /// Strength score
    pub score: PasswordScore,
    /// Whether length, character class and dictionary rules all pass
    pub meets_requirements: bool,
    /// Suggestions for improvement
    pub suggestions: Vec<String>,
}

impl PasswordStrength {
    pub fn is_strong(&self) -> bool {
        self.meets_requirements && self.score.is_acceptable()
    }
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "123456", "12345678", "123456789", "1234567890", "qwerty",
    "abc123", "admin", "letmein", "welcome", "monkey", "iloveyou", "princess",
    "sunshine", "football", "charlie", "dragon", "master", "shadow", "trustno1",
    "passw0rd", "changeme", "secret",
];

#[derive(Default)]
struct CharacterClasses {
    lower: bool,
    upper: bool,
    digit: bool,
    symbol: bool,
}

impl CharacterClasses {
    fn of(password: &str) -> Self {
        let mut classes = Self::default();
        for ch in password.chars() {
            if ch.is_ascii_lowercase() {
                classes.lower = true;
            } else if ch.is_ascii_uppercase() {
                classes.upper = true;
            } else if ch.is_ascii_digit() {
                classes.digit = true;
            } else {
                classes.symbol = true;
            }
        }
        classes
    }

    fn all_present(&self) -> bool {
        self.lower && self.upper && self.digit && self.symbol
    }

    fn alphabet_size(&self) -> usize {
        let mut size = 0;
        if self.lower {
            size += 26;
        }
        if self.upper {
            size += 26;
        }
        if self.digit {
            size += 10;
        }
        if self.symbol {
            size += 33;
        }
        size.max(26)
    }
}

/// Password strength checker
pub struct PasswordStrengthChecker {
    common_passwords: HashSet<String>,
}

impl PasswordStrengthChecker {
    pub fn new() -> Self {
        let common_passwords = COMMON_PASSWORDS
            .iter()
            .map(|pwd| pwd.to_string())
            .collect();

        Self { common_passwords }
    }

    /// Analyse a candidate password
    pub fn check_strength(&self, password: &str) -> PasswordStrength {
        let classes = CharacterClasses::of(password);
        let length = password.chars().count();
        let common = self.contains_common_password(password);

        let entropy = self.estimate_entropy(password, &classes);
        let score = Self::score_from_entropy(entropy);

        let mut suggestions = Vec::new();
        if length < MINIMUM_PASSWORD_LENGTH {
            suggestions.push(format!("Use at least {} characters", MINIMUM_PASSWORD_LENGTH));
        }
        if !classes.all_present() {
            suggestions.push(
                "Use a mix of uppercase, lowercase, digits, and special characters".to_string(),
            );
        }
        if common {
            suggestions.push("Avoid common passwords".to_string());
        }
        if Self::has_run(password) {
            suggestions.push("Avoid repeated or sequential characters (e.g. aaa, abc, 123)".to_string());
        }
        if !score.is_acceptable() {
            suggestions.push(format!(
                "Estimated entropy {:.0} bits is below the {:.0} bit minimum",
                entropy, MINIMUM_ENTROPY_BITS
            ));
        }

        PasswordStrength {
            entropy_bits: entropy,
            score,
            meets_requirements: length >= MINIMUM_PASSWORD_LENGTH && classes.all_present() && !common,
            suggestions,
        }
    }

    /// Shorthand for `check_strength(password).is_strong()`
    pub fn is_strong(&self, password: &str) -> bool {
        self.check_strength(password).is_strong()
    }

    fn estimate_entropy(&self, password: &str, classes: &CharacterClasses) -> f64 {
        let length = password.chars().count() as f64;
        let mut entropy = (classes.alphabet_size() as f64).log2() * length;

        if Self::has_run(password) {
            entropy -= 10.0;
        }
        if self.contains_common_password(password) {
            entropy -= 20.0;
        }

        entropy.max(0.0)
    }

    fn contains_common_password(&self, password: &str) -> bool {
        let lower = password.to_lowercase();
        self.common_passwords
            .iter()
            .any(|common| lower.contains(common.as_str()))
    }

    /// Three or more identical or consecutive (ascending/descending) characters
    fn has_run(password: &str) -> bool {
        let chars: Vec<u32> = password.chars().map(u32::from).collect();
        chars.windows(3).any(|w| {
            let repeated = w[0] == w[1] && w[1] == w[2];
            let ascending = w[1] == w[0].wrapping_add(1) && w[2] == w[1].wrapping_add(1);
            let descending = w[1] == w[0].wrapping_sub(1) && w[2] == w[1].wrapping_sub(1);
            repeated || ascending || descending
        })
    }

    fn score_from_entropy(entropy: f64) -> PasswordScore {
        if entropy < 60.0 {
            PasswordScore::TooWeak
        } else if entropy < MINIMUM_ENTROPY_BITS {
            PasswordScore::Weak
        } else if entropy < 100.0 {
            PasswordScore::Acceptable
        } else {
            PasswordScore::Strong
        }
    }
}

impl Default for PasswordStrengthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_accepted() {
        let checker = PasswordStrengthChecker::new();
        let strength = checker.check_strength("Fetch!Ai-ToTh3M00n!");

        assert!(strength.meets_requirements);
        assert!(strength.score.is_acceptable());
        assert!(strength.is_strong());
    }

    #[test]
    fn test_short_password_rejected() {
        let checker = PasswordStrengthChecker::new();
        let strength = checker.check_strength("Sh0rt!pw");

        assert!(!strength.is_strong());
        assert!(strength.suggestions.iter().any(|s| s.contains("at least 14")));
    }

    #[test]
    fn test_missing_character_class_rejected() {
        let checker = PasswordStrengthChecker::new();
        assert!(!checker.is_strong("alllowercaseandlong"));
        assert!(!checker.is_strong("NoSymbolsButLong12"));
    }

    #[test]
    fn test_common_password_rejected() {
        let checker = PasswordStrengthChecker::new();
        let strength = checker.check_strength("MyPassword!2024xyz");

        assert!(!strength.meets_requirements);
        assert!(strength.suggestions.iter().any(|s| s.contains("common")));
    }

    #[test]
    fn test_runs_detected() {
        assert!(PasswordStrengthChecker::has_run("xaaay"));
        assert!(PasswordStrengthChecker::has_run("x123y"));
        assert!(PasswordStrengthChecker::has_run("xcbay"));
        assert!(!PasswordStrengthChecker::has_run("a1b2c3"));
    }

    #[test]
    fn test_run_check_handles_low_code_points() {
        assert!(!PasswordStrengthChecker::has_run("\u{0}\u{1}x"));
    }

    #[test]
    fn test_score_levels_ordered() {
        assert!(PasswordScore::TooWeak < PasswordScore::Weak);
        assert!(PasswordScore::Weak < PasswordScore::Acceptable);
        assert!(PasswordScore::Acceptable < PasswordScore::Strong);
        assert_eq!(PasswordScore::Strong.description(), "STRONG");
    }
}
