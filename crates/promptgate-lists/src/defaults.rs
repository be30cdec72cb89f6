//! Stock whitelist and blacklist phrases.
//!
//! All phrases are two or more words; single words ("password") match far
//! too much legitimate traffic. The free tier gets these read-only; paid
//! tiers can remove individual defaults and add their own phrases.

/// Phrases that signal legitimate business or educational use.
pub const DEFAULT_WHITELIST: &[&str] = &[
    // Business operations
    "business meeting",
    "team meeting",
    "discussed yesterday",
    "discussed last week",
    "management approved",
    "emergency procedure",
    "standard process",
    "business process",
    "company policy",
    "policy update",
    "management directive",
    "quarterly budget",
    "budget projection",
    "order number",
    "ticket number",
    "support ticket",
    "customer refund",
    "subscription management",
    "support team",
    "supervisor approved",
    // Educational / security research
    "educational example",
    "training example",
    "course material",
    "explain how",
    "tutorial about",
    "demonstrate attack",
    "demonstrate how",
    "academic research",
    "research paper",
    "security team",
    "security training",
    "for learning",
    "teaching security",
    "thesis about",
    "study shows",
    "can you explain",
    // Technical security discussion
    "cybersecurity strategy",
    "security assessment",
    "security audit",
    "implement security",
    "security framework",
    "security policy",
    "protect against injection",
    "protect against attack",
    "discussing security",
    "security best practices",
    "information security",
    // Common business phrases
    "shipping address",
    "warehouse location",
    "inventory system",
    "customer service",
    "account settings",
    "user preferences",
    "override address",
    "reset password",
    "change password",
    "update profile",
    "billing information",
    "payment method",
];

/// Phrases that signal credential exposure or PII leakage attempts.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    // Credential exposure
    "database password",
    "admin password",
    "root password",
    "api secret key",
    "private api key",
    "private key",
    "secret key",
    "access token",
    "bearer token",
    "auth token",
    "database connection string",
    "connection string",
    "database credentials",
    // PII
    "social security number",
    "ssn number",
    "credit card cvv",
    "credit card number",
    "card number",
    "bank account number",
    "account number",
    "driver license number",
    "passport number",
    // Infrastructure access
    "ssh private key",
    "aws credentials",
    "azure credentials",
    "gcp credentials",
    "service account key",
    "root credentials",
    "admin credentials",
    "database user",
    "database host",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_default_phrases_are_multi_word() {
        for phrase in DEFAULT_WHITELIST.iter().chain(DEFAULT_BLACKLIST) {
            assert!(
                phrase.split_whitespace().count() >= 2,
                "single-word default phrase: {:?}",
                phrase
            );
        }
    }

    #[test]
    fn test_defaults_are_lowercase() {
        for phrase in DEFAULT_WHITELIST.iter().chain(DEFAULT_BLACKLIST) {
            assert_eq!(*phrase, phrase.to_lowercase());
        }
    }

    #[test]
    fn test_no_overlap_between_lists() {
        for phrase in DEFAULT_WHITELIST {
            assert!(!DEFAULT_BLACKLIST.contains(phrase), "{:?} in both lists", phrase);
        }
    }
}
