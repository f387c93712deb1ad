use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

#[allow(clippy::unwrap_used)]
mod patterns {
    use super::{lazy_static, Regex};

    lazy_static! {
        pub static ref EMAIL_REGEX: Regex =
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
        pub static ref PHONE_REGEX: Regex =
            Regex::new(r"(?:\+91[-.\s]?)?\b[0-9]{5}[-.\s]?[0-9]{5}\b").unwrap();
        pub static ref BEARER_REGEX: Regex =
            Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*").unwrap();
    }
}

use patterns::{BEARER_REGEX, EMAIL_REGEX, PHONE_REGEX};

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_tokens: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_tokens: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Masks patient contact details and credentials in log text.
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // Tokens first so the phone pattern never sees digits inside a JWT.
        if self.config.redact_tokens {
            result = BEARER_REGEX.replace_all(&result, "Bearer [REDACTED]").to_string();
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    return format!("EMAIL[{}]", hash_value(email));
                }
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    ),
                    None => "***@***".to_string(),
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let phone = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    return format!("PHONE[{}]", hash_value(phone));
                }
                let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
                let tail = digits.get(digits.len().saturating_sub(2)..).unwrap_or("");
                format!("********{tail}")
            })
            .to_string()
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    // First 8 bytes keep the marker short while still correlating repeats.
    general_purpose::STANDARD_NO_PAD.encode(digest.get(..8).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking_redactor() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking_redactor().redact("Report mailed to asha.rao@example.com");
        assert!(redacted.contains("a***@e***"));
        assert!(!redacted.contains("asha.rao"));
    }

    #[test]
    fn test_phone_redaction_keeps_last_two_digits() {
        let redacted = masking_redactor().redact("Patient phone 9999900000 registered");
        assert_eq!(redacted, "Patient phone ********00 registered");
    }

    #[test]
    fn test_bearer_token_redaction() {
        let redacted = masking_redactor().redact("Authorization: Bearer eyJhbGciOi.abc-123");
        assert_eq!(redacted, "Authorization: Bearer [REDACTED]");
    }

    #[test]
    fn test_hash_correlation_is_stable() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("9999900000");
        let second = redactor.redact("9999900000");
        assert!(first.starts_with("PHONE["));
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_pattern() {
        let redactor = PiiRedactor::new(RedactionConfig {
            custom_patterns: vec![(Regex::new(r"P-\d+").unwrap(), "P-[ID]".to_string())],
            ..Default::default()
        });
        assert_eq!(redactor.redact("order for P-1"), "order for P-[ID]");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(masking_redactor().redact("CBC ₹500"), "CBC ₹500");
    }
}
