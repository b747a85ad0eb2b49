use serde::{Deserialize, Serialize};

/// Subreg API environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubregEnvironment {
    /// Live registrar account
    Production,
    /// Operational test environment (no real orders)
    Ote,
}

impl SubregEnvironment {
    pub fn endpoint(&self) -> &'static str {
        match self {
            SubregEnvironment::Production => "https://soap.subreg.cz/cmd.php",
            SubregEnvironment::Ote => "https://ote-soap.subreg.cz/cmd.php",
        }
    }
}

/// Autorenew policy for a registered domain.
///
/// By default a domain is deleted when it expires (`Expire`).
/// `Autorenew` renews from account credit every year, `RenewOnce`
/// renews only for the next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Autorenew {
    Expire,
    Autorenew,
    RenewOnce,
}

impl Autorenew {
    /// Wire spelling used by the `Set_Autorenew` command
    pub fn as_str(&self) -> &'static str {
        match self {
            Autorenew::Expire => "EXPIRE",
            Autorenew::Autorenew => "AUTORENEW",
            Autorenew::RenewOnce => "RENEWONCE",
        }
    }

    /// Parse a policy string; anything outside the allowed set is `None`
    pub fn from_policy(policy: &str) -> Option<Self> {
        match policy {
            "EXPIRE" => Some(Autorenew::Expire),
            "AUTORENEW" => Some(Autorenew::Autorenew),
            "RENEWONCE" => Some(Autorenew::RenewOnce),
            _ => None,
        }
    }
}

/// One DNS record within a zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// ID of an existing record; required for modify/delete, absent on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Hostname part, relative to the registered domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Record type (A, AAAA, CNAME, MX, TXT, ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record value: IP address, hostname, text value, ...
    pub content: String,

    /// Priority, MX records only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prio: Option<u32>,

    /// TTL in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl DnsRecord {
    pub fn new(record_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Registrant/admin contact record.
///
/// The registry requires one of `id`, `regid` or a full new contact;
/// no implemented command consumes this type yet, so the constraint is
/// documented here rather than enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    /// ID from the Subreg DB (G-xxxxxx)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// ID from the registry (CZ-NIC ID, SK-NIC ID, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regid: Option<String>,

    /// First name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Second name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,

    /// Organization name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// ZIP code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc: Option<String>,

    /// State or province
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp: Option<String>,

    /// ISO country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,

    /// Phone in the format +1.234567890
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Fax in the format +1.234567890
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_endpoints() {
        assert_eq!(
            SubregEnvironment::Production.endpoint(),
            "https://soap.subreg.cz/cmd.php"
        );
        assert_eq!(
            SubregEnvironment::Ote.endpoint(),
            "https://ote-soap.subreg.cz/cmd.php"
        );
    }

    #[test]
    fn test_autorenew_policy_parsing() {
        assert_eq!(Autorenew::from_policy("AUTORENEW"), Some(Autorenew::Autorenew));
        assert_eq!(Autorenew::from_policy("RENEWONCE"), Some(Autorenew::RenewOnce));
        assert_eq!(Autorenew::from_policy("BOGUS"), None);
        assert_eq!(Autorenew::from_policy("autorenew"), None);
    }

    #[test]
    fn test_dns_record_serialization_skips_absent_fields() {
        let record = DnsRecord::new("A", "192.0.2.1");
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("type").unwrap(), "A");
        assert_eq!(object.get("content").unwrap(), "192.0.2.1");
        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("prio"));
        assert!(!object.contains_key("ttl"));
    }

    #[test]
    fn test_dns_record_wire_key_for_type() {
        let record: DnsRecord = serde_json::from_value(serde_json::json!({
            "id": 42,
            "type": "MX",
            "content": "mail.example.com",
            "prio": 10,
            "ttl": 3600
        }))
        .unwrap();
        assert_eq!(record.id, Some(42));
        assert_eq!(record.record_type, "MX");
        assert_eq!(record.prio, Some(10));
    }
}
