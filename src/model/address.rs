//! Email address parsing (RFC 5322 §3.4).

/// A parsed email address.
///
/// # Examples
/// - `"Mario Rossi <mario@esempio.it>"` → `display_name = "Mario Rossi"`, `address = "mario@esempio.it"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
/// - `"Ufficio Protocollo"` → `display_name = "Ufficio Protocollo"`, `address = ""`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`). Empty when the input holds
    /// no address-shaped text at all.
    pub address: String,
}

impl EmailAddress {
    /// Parse a single email address from a decoded header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Last, First\" <user@domain.com>"`
    ///
    /// Text with neither angle brackets nor an `@` is treated as a bare
    /// display name with no address, so callers can tell "no address"
    /// apart from a malformed one.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self {
                display_name: String::new(),
                address: String::new(),
            };
        }

        // Try "Display Name <address>" or "<address>"
        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let addr = trimmed[angle_start + 1..angle_end].trim().to_string();
                    let name_part = trimmed[..angle_start].trim();
                    let display_name = strip_quotes(name_part);
                    return Self {
                        display_name,
                        address: addr,
                    };
                }
            }
        }

        // Bare address: "user@domain.com"
        if trimmed.contains('@') {
            return Self {
                display_name: String::new(),
                address: trimmed.to_string(),
            };
        }

        // Name-only text: keep it as a display name.
        Self {
            display_name: strip_quotes(trimmed),
            address: String::new(),
        }
    }

    /// The domain portion of the address: everything after the last `@`,
    /// or the whole address when it contains none.
    pub fn domain(&self) -> &str {
        match self.address.rsplit_once('@') {
            Some((_, domain)) => domain,
            None => &self.address,
        }
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else if self.address.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let addr = EmailAddress::parse("<user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(addr.address, "user1@example.com");
        assert_eq!(addr.display_name, "User One");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "Last, First");
    }

    #[test]
    fn test_parse_name_only() {
        let addr = EmailAddress::parse("Ufficio Protocollo");
        assert_eq!(addr.address, "");
        assert_eq!(addr.display_name, "Ufficio Protocollo");
    }

    #[test]
    fn test_domain() {
        let addr = EmailAddress::parse("posta@pec.esempio.it");
        assert_eq!(addr.domain(), "pec.esempio.it");
    }

    #[test]
    fn test_display_with_name() {
        let addr = EmailAddress {
            display_name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        let addr = EmailAddress {
            display_name: String::new(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "alice@example.com");
    }

    #[test]
    fn test_parse_empty() {
        let addr = EmailAddress::parse("");
        assert_eq!(addr.address, "");
        assert_eq!(addr.display_name, "");
    }
}
