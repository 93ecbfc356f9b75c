use std::fmt;

use url::Host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    Empty,
    Invalid,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::Empty => write!(f, "domain cannot be empty"),
            DomainError::Invalid => write!(f, "invalid domain format, e.g. example.com"),
        }
    }
}

/// Validates a domain entered by the operator and returns its normalized form.
///
/// Accepts `example.com`, `sub.example.com`, `example.com.tr`; rejects bare
/// labels, IP addresses, leading/trailing dots and numeric TLDs.
pub fn validate_domain(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Empty);
    }

    let domain = match Host::parse(trimmed) {
        Ok(Host::Domain(domain)) => domain,
        _ => return Err(DomainError::Invalid),
    };

    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return Err(DomainError::Invalid);
    };
    if rest.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::Invalid);
    }
    if !rest.iter().all(|label| is_valid_label(label)) {
        return Err(DomainError::Invalid);
    }
    Ok(domain)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    bytes.len() <= 63
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_domains() {
        assert_eq!(validate_domain("example.com").as_deref(), Ok("example.com"));
        assert_eq!(
            validate_domain("  Sub.Example.CO.uk ").as_deref(),
            Ok("sub.example.co.uk")
        );
        assert!(validate_domain("my-shop.com.tr").is_ok());
    }

    #[test]
    fn rejects_malformed_domains() {
        assert_eq!(validate_domain("   "), Err(DomainError::Empty));
        for raw in ["example", "example.", ".example.com", "-bad.com", "a.b.1", "10.0.0.1"] {
            assert_eq!(validate_domain(raw), Err(DomainError::Invalid), "{raw}");
        }
    }
}
