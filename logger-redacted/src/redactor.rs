use regex::Regex;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use base64::{Engine as _, engine::general_purpose};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Local (07..) and international (+254..) subscriber numbers, 9 to 15 digits
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+|\b)\d{9,15}\b").unwrap();
}

/// Redaction switches
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
        }
    }
}

/// Redacts contact details from text that is about to be logged
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// A redactor that passes text through untouched
    pub fn disabled() -> Self {
        Self::new(RedactionConfig {
            redact_emails: false,
            redact_phones: false,
            hash_for_correlation: false,
        })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX.replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            if self.config.hash_for_correlation {
                format!("EMAIL[{}]", self.hash_value(email))
            } else {
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    ),
                    None => "***@***".to_string(),
                }
            }
        }).to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX.replace_all(text, |caps: &regex::Captures| {
            if self.config.hash_for_correlation {
                format!("PHONE[{}]", self.hash_value(&caps[0]))
            } else {
                let digits = &caps[0];
                let tail: String = digits.chars().rev().take(3).collect::<Vec<_>>().into_iter().rev().collect();
                format!("***{}", tail)
            }
        }).to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD.encode(&result[..8]) // Use first 8 bytes for shorter hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = plain().redact("Patient jane.wanjiru@example.co.ke registered");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("wanjiru"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = plain().redact("Reach me on +254712345678 or 0712345678");
        assert!(!redacted.contains("712345678"));
        assert_eq!(redacted.matches("***678").count(), 2);
    }

    #[test]
    fn test_hashing_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("mail a@b.io");
        let second = redactor.redact("mail a@b.io");
        assert_eq!(first, second);
        assert!(first.starts_with("mail EMAIL["));
    }

    #[test]
    fn test_disabled_redactor_passes_through() {
        let text = "Reach me on 0712345678";
        assert_eq!(PiiRedactor::disabled().redact(text), text);
    }
}
