use crate::value::MetadataValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    High,
    Medium,
    Low,
    Unknown,
}

/// High-sensitivity field-name substrings: remove the field entirely.
pub const HIGH_SENSITIVITY_FIELDS: &[&str] = &[
    "user_id",
    "username",
    "email",
    "phone",
    "device_id",
    "device_fingerprint",
    "ip_address",
    "mac_address",
    "location",
    "gps",
    "coordinates",
    "address",
    "browser_info",
    "user_agent",
    "session_id",
    "cookie",
    "credit_card",
    "biometric_data",
    "face_id",
    "fingerprint",
    "voice_print",
    "ssn",
    "social_security",
    "passport",
    "bank_account",
];

/// Medium-sensitivity field-name substrings: obfuscate the value.
pub const MEDIUM_SENSITIVITY_FIELDS: &[&str] = &[
    "timestamp",
    "time",
    "date",
    "created_at",
    "updated_at",
    "last_seen",
    "message_count",
    "frequency",
    "pattern",
    "behavior",
    "activity",
    "network_info",
    "connection_type",
    "bandwidth",
    "latency",
];

/// Low-sensitivity field-name substrings: quantize the value.
pub const LOW_SENSITIVITY_FIELDS: &[&str] =
    &["message_size", "padded_size", "ttl", "priority", "type", "category"];

/// Field-name substrings that bump an `Unknown` field's risk weight even
/// though they do not match a High/Medium/Low dictionary entry outright.
const SUSPICIOUS_KEYWORDS: &[&str] =
    &["id", "key", "secret", "private", "personal", "user", "client"];

/// Classifies `field_name` by case-insensitive substring match against
/// the three dictionaries, in High > Medium > Low precedence order.
pub fn classify_field_name(field_name: &str) -> FieldClass {
    let lower = field_name.to_ascii_lowercase();
    if HIGH_SENSITIVITY_FIELDS.iter().any(|f| lower.contains(f)) {
        FieldClass::High
    } else if MEDIUM_SENSITIVITY_FIELDS.iter().any(|f| lower.contains(f)) {
        FieldClass::Medium
    } else if LOW_SENSITIVITY_FIELDS.iter().any(|f| lower.contains(f)) {
        FieldClass::Low
    } else {
        FieldClass::Unknown
    }
}

/// Value-level heuristics that fire regardless of field name, returning
/// an additional risk-weight contribution.
pub fn value_risk_weight(value: &MetadataValue) -> f64 {
    let mut weight = 0.0;
    if let MetadataValue::String(s) = value {
        if s.contains('@') {
            weight += 0.8;
        }
        if looks_like_uuid(s) {
            weight += 0.5;
        }
        if s.chars().filter(|c| c.is_ascii_digit()).count() > (s.len() / 2) && s.len() > 10 {
            weight += 0.2;
        }
    }
    if let Some(i) = value.as_i64() {
        if (1_000_000_000..2_000_000_000).contains(&i) {
            weight += 0.4;
        }
    }
    weight
}

/// Extra weight for an `Unknown`-classified field whose name contains one
/// of the suspicious keywords the original source flags.
pub fn suspicious_keyword_weight(field_name: &str) -> f64 {
    let lower = field_name.to_ascii_lowercase();
    if SUSPICIOUS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        0.15
    } else {
        0.0
    }
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36 && s.chars().filter(|&c| c == '-').count() == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_high_fields_case_insensitively() {
        assert_eq!(classify_field_name("User_ID"), FieldClass::High);
        assert_eq!(classify_field_name("EMAIL"), FieldClass::High);
    }

    #[test]
    fn classifies_medium_and_low() {
        assert_eq!(classify_field_name("last_seen"), FieldClass::Medium);
        assert_eq!(classify_field_name("padded_size"), FieldClass::Low);
    }

    #[test]
    fn unknown_for_unrecognized_field() {
        assert_eq!(classify_field_name("arbitrary_field"), FieldClass::Unknown);
    }

    #[test]
    fn email_like_string_gets_risk_weight() {
        let weight = value_risk_weight(&MetadataValue::String("a@b.c".to_string()));
        assert!((weight - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn epoch_like_integer_gets_risk_weight() {
        let weight = value_risk_weight(&MetadataValue::Int(1_700_000_000));
        assert!((weight - 0.4).abs() < f64::EPSILON);
    }
}
