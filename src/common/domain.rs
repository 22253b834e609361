/// Normalize a domain: trim, lowercase, strip trailing dot.
pub fn normalize(domain: &str) -> String {
    let d = domain.trim().to_lowercase();
    d.strip_suffix('.').unwrap_or(&d).to_string()
}

/// Owner name of a domain's DMARC policy record.
pub fn dmarc_host(domain: &str) -> String {
    format!("_dmarc.{}", normalize(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercase() {
        assert_eq!(normalize("EXAMPLE.COM"), "example.com");
    }

    #[test]
    fn normalize_strip_trailing_dot() {
        assert_eq!(normalize("example.com."), "example.com");
    }

    #[test]
    fn normalize_combined() {
        assert_eq!(normalize(" Mail.EXAMPLE.COM. "), "mail.example.com");
    }

    #[test]
    fn normalize_keeps_non_ascii() {
        assert_eq!(normalize("Exämple.com"), "exämple.com");
    }

    #[test]
    fn dmarc_host_prefixes_label() {
        assert_eq!(dmarc_host("Example.com."), "_dmarc.example.com");
    }
}
