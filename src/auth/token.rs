use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Application-level session lifetime: 3 months in milliseconds.
///
/// Independent of Google's ~1 hour access-token lifetime. Once a session is
/// older than this the user must re-consent; no amount of refreshing gets
/// past it.
pub const SESSION_TTL_MS: i64 = 7_776_000_000;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The persisted credential bundle for the single configured identity.
///
/// Field names match Google's token endpoint payload, which is also the
/// shape persisted by the token store (plus a storage-internal `updatedAt`
/// the store strips on read).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    /// Issued by Google only on the first consent grant. Subsequent refresh
    /// responses omit it, so once captured it must never be overwritten
    /// with an absent value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When `access_token` expires, epoch ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Space-separated list of granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Hard session boundary, epoch ms. Stamped at exchange time and
    /// carried forward unchanged through every refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_expiry: Option<i64>,
}

impl TokenRecord {
    /// Whether the access token is stale. Absent `expiry_date` counts as
    /// still valid.
    pub fn access_expired(&self, now: i64) -> bool {
        self.expiry_date.is_some_and(|at| at < now)
    }

    /// Whether the application session is over. Absent `session_expiry`
    /// counts as still valid.
    pub fn session_expired(&self, now: i64) -> bool {
        self.session_expiry.is_some_and(|at| at < now)
    }

    /// Granted scopes as a list.
    pub fn scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_ref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }

    /// Overlay freshly issued credentials onto this record.
    ///
    /// New fields win, except the two long-lived ones: `refresh_token`
    /// (Google sends it once, refresh responses omit it) and
    /// `session_expiry` (fixed at exchange time) keep their stored values
    /// no matter what the refresh response carries.
    pub fn merged_with(&self, fresh: TokenRecord) -> TokenRecord {
        TokenRecord {
            access_token: fresh.access_token,
            refresh_token: self.refresh_token.clone(),
            expiry_date: fresh.expiry_date.or(self.expiry_date),
            token_type: fresh.token_type.or_else(|| self.token_type.clone()),
            scope: fresh.scope.or_else(|| self.scope.clone()),
            id_token: fresh.id_token.or_else(|| self.id_token.clone()),
            session_expiry: self.session_expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> TokenRecord {
        TokenRecord {
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            expiry_date: Some(1_000),
            token_type: Some("Bearer".to_string()),
            scope: Some("openid email".to_string()),
            id_token: Some("jwt-1".to_string()),
            session_expiry: Some(10_000_000_000),
        }
    }

    fn refresh_response(access_token: &str) -> TokenRecord {
        TokenRecord {
            access_token: access_token.to_string(),
            refresh_token: None,
            expiry_date: Some(3_601_000),
            token_type: None,
            scope: None,
            id_token: None,
            session_expiry: None,
        }
    }

    #[test]
    fn merge_takes_new_access_token_and_expiry() {
        let merged = stored().merged_with(refresh_response("a2"));
        assert_eq!(merged.access_token, "a2");
        assert_eq!(merged.expiry_date, Some(3_601_000));
    }

    #[test]
    fn merge_preserves_refresh_token_when_response_omits_it() {
        let merged = stored().merged_with(refresh_response("a2"));
        assert_eq!(merged.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn merge_pins_refresh_token_even_when_response_carries_one() {
        let mut fresh = refresh_response("a2");
        fresh.refresh_token = Some("r2".to_string());
        let merged = stored().merged_with(fresh);
        assert_eq!(merged.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn merge_never_touches_session_expiry() {
        let mut fresh = refresh_response("a2");
        fresh.session_expiry = Some(42);
        let merged = stored().merged_with(fresh);
        assert_eq!(merged.session_expiry, Some(10_000_000_000));
    }

    #[test]
    fn merge_keeps_auxiliary_fields_when_response_omits_them() {
        let merged = stored().merged_with(refresh_response("a2"));
        assert_eq!(merged.token_type.as_deref(), Some("Bearer"));
        assert_eq!(merged.scope.as_deref(), Some("openid email"));
        assert_eq!(merged.id_token.as_deref(), Some("jwt-1"));
    }

    #[test]
    fn absent_expiry_counts_as_valid() {
        let mut record = stored();
        record.expiry_date = None;
        record.session_expiry = None;
        assert!(!record.access_expired(i64::MAX));
        assert!(!record.session_expired(i64::MAX));
    }

    #[test]
    fn expiry_predicates_compare_against_now() {
        let record = stored();
        assert!(record.access_expired(1_001));
        assert!(!record.access_expired(999));
        assert!(record.session_expired(10_000_000_001));
        assert!(!record.session_expired(9_999_999_999));
    }

    #[test]
    fn scopes_split_on_whitespace() {
        assert_eq!(
            stored().scopes(),
            Some(vec!["openid".to_string(), "email".to_string()])
        );
    }
}
