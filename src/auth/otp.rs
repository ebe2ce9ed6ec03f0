use sha2::{Digest, Sha256};

use crate::codes::ALPHABET;

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mask an email for OTP responses: `j***@e***.com`. Anything that does
/// not parse degrades to the fully-masked form.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "***@***".to_string();
    };
    let Some(local_first) = local.chars().next() else {
        return "***@***".to_string();
    };

    let mut domain_parts = domain.split('.');
    let Some(domain_main) = domain_parts.next().filter(|p| !p.is_empty()) else {
        return "***@***".to_string();
    };
    let Some(domain_first) = domain_main.chars().next() else {
        return "***@***".to_string();
    };

    let tld: Vec<&str> = domain_parts.collect();
    let tld = if tld.is_empty() {
        String::new()
    } else {
        format!(".{}", tld.join("."))
    };

    format!("{local_first}***@{domain_first}***{tld}")
}

/// Account code format: exactly 5 characters from the restricted alphabet,
/// case-insensitive.
pub fn is_valid_account_code(code: &str) -> bool {
    let code = code.trim().to_uppercase();
    code.len() == 5 && code.bytes().all(|b| ALPHABET.contains(&b))
}
