use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

/// Role claimed by a Supabase API key. Keys are JWTs; the payload's
/// `role` claim tells us whether the privileged catalog path is even
/// worth attempting. The signature is not verified here, the upstream
/// rejects forged keys on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Anon,
    ServiceRole,
    Unknown,
}

impl KeyRole {
    pub fn is_privileged(&self) -> bool {
        matches!(self, KeyRole::ServiceRole)
    }
}

/// Best-effort decode of the key's role claim. Anything that fails to
/// decode is simply Unknown, never an error.
pub fn key_role(api_key: &str) -> KeyRole {
    let Some(payload) = api_key.split('.').nth(1) else {
        return KeyRole::Unknown;
    };
    let Ok(bytes) = general_purpose::URL_SAFE_NO_PAD.decode(payload) else {
        return KeyRole::Unknown;
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&bytes) else {
        return KeyRole::Unknown;
    };
    match claims.get("role").and_then(Value::as_str) {
        Some("service_role") => KeyRole::ServiceRole,
        Some("anon") => KeyRole::Anon,
        _ => KeyRole::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jwt(claims: &str) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\"}");
        let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn detects_service_role() {
        let key = fake_jwt("{\"role\":\"service_role\"}");
        assert_eq!(key_role(&key), KeyRole::ServiceRole);
        assert!(key_role(&key).is_privileged());
    }

    #[test]
    fn detects_anon_role() {
        let key = fake_jwt("{\"role\":\"anon\"}");
        assert_eq!(key_role(&key), KeyRole::Anon);
        assert!(!key_role(&key).is_privileged());
    }

    #[test]
    fn garbage_keys_are_unknown() {
        assert_eq!(key_role("not-a-jwt"), KeyRole::Unknown);
        assert_eq!(key_role("a.%%%.c"), KeyRole::Unknown);
        assert_eq!(key_role(&fake_jwt("{}")), KeyRole::Unknown);
    }
}
