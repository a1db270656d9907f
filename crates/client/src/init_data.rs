//! Telegram WebApp init data parsing and signature check.
//!
//! The host hands the app a query string signed with the bot token:
//! `secret = HMAC_SHA256("WebAppData", bot_token)` and
//! `hash = hex(HMAC_SHA256(secret, data_check_string))`, where the check string
//! is every `key=value` pair except `hash`, sorted by key and joined with `\n`.

use crate::error::ClientError;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use signaldesk_core::TelegramUser;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const SECRET_KEY: &[u8] = b"WebAppData";

/// Decoded init data.
#[derive(Debug, Clone, PartialEq)]
pub struct InitData {
    pub user: Option<TelegramUser>,
    pub auth_date: Option<DateTime<Utc>>,
    pub query_id: Option<String>,
    pub hash: String,
}

impl InitData {
    /// Parse `raw` and check its signature against `bot_token`.
    pub fn parse_and_verify(raw: &str, bot_token: &str) -> Result<Self, ClientError> {
        let pairs = parse_pairs(raw);
        let hash = find(&pairs, "hash")
            .ok_or_else(|| ClientError::InvalidInitData("missing hash".to_string()))?;
        let provided = hex::decode(hash)
            .map_err(|e| ClientError::InvalidInitData(format!("hash is not hex: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(&secret_key(bot_token)?)
            .map_err(|e| ClientError::InvalidInitData(e.to_string()))?;
        mac.update(data_check_string(&pairs).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| ClientError::InvalidInitData("signature mismatch".to_string()))?;

        Self::from_pairs(&pairs)
    }

    /// Parse without checking the signature. Only for trusted local input.
    pub fn parse_unchecked(raw: &str) -> Result<Self, ClientError> {
        Self::from_pairs(&parse_pairs(raw))
    }

    /// True when `auth_date` is older than `max_age` (or missing).
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.auth_date {
            Some(auth_date) => (now - auth_date).to_std().is_ok_and(|age| age > max_age),
            None => true,
        }
    }

    fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ClientError> {
        let user = find(pairs, "user")
            .map(serde_json::from_str::<TelegramUser>)
            .transpose()
            .map_err(|e| ClientError::InvalidInitData(format!("bad user field: {e}")))?;
        let auth_date = find(pairs, "auth_date")
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Ok(Self {
            user,
            auth_date,
            query_id: find(pairs, "query_id").map(str::to_string),
            hash: find(pairs, "hash").unwrap_or_default().to_string(),
        })
    }
}

fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.trim_start_matches('?').as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn find<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn secret_key(bot_token: &str) -> Result<Vec<u8>, ClientError> {
    let mut mac = HmacSha256::new_from_slice(SECRET_KEY)
        .map_err(|e| ClientError::InvalidInitData(e.to_string()))?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut fields: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| k != "hash").collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex signature for `pairs` under `bot_token`.
pub fn sign(pairs: &[(&str, &str)], bot_token: &str) -> Result<String, ClientError> {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut mac = HmacSha256::new_from_slice(&secret_key(bot_token)?)
        .map_err(|e| ClientError::InvalidInitData(e.to_string()))?;
    mac.update(data_check_string(&owned).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOKEN: &str = "123456:TEST-TOKEN";
    const USER_JSON: &str = r#"{"id":42,"first_name":"Ada","username":"ada"}"#;

    fn signed_query(token: &str) -> String {
        let fields = [
            ("auth_date", "1700000000"),
            ("query_id", "AAF"),
            ("user", USER_JSON),
        ];
        let hash = sign(&fields, token).unwrap();
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in fields {
            serializer.append_pair(k, v);
        }
        serializer.append_pair("hash", &hash);
        serializer.finish()
    }

    #[test]
    fn test_valid_signature_yields_user() {
        let data = InitData::parse_and_verify(&signed_query(TOKEN), TOKEN).unwrap();
        let user = data.user.unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert_eq!(data.query_id.as_deref(), Some("AAF"));
        assert_eq!(data.auth_date.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_wrong_token_is_rejected() {
        let err = InitData::parse_and_verify(&signed_query(TOKEN), "other").unwrap_err();
        assert!(matches!(err, ClientError::InvalidInitData(_)));
    }

    #[test]
    fn test_tampered_field_is_rejected() {
        let tampered = signed_query(TOKEN).replace("1700000000", "1700000001");
        assert!(InitData::parse_and_verify(&tampered, TOKEN).is_err());
    }

    #[test]
    fn test_missing_hash_is_rejected() {
        assert!(InitData::parse_and_verify("auth_date=1", TOKEN).is_err());
    }

    #[test]
    fn test_data_check_string_is_sorted_without_hash() {
        let pairs = vec![
            ("user".to_string(), "u".to_string()),
            ("hash".to_string(), "h".to_string()),
            ("auth_date".to_string(), "1".to_string()),
        ];
        assert_eq!(data_check_string(&pairs), "auth_date=1\nuser=u");
    }

    #[test]
    fn test_expiry() {
        let data = InitData::parse_unchecked("auth_date=1700000000").unwrap();
        let issued = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let day = Duration::from_secs(86_400);
        assert!(!data.is_expired(issued + chrono::Duration::hours(1), day));
        assert!(data.is_expired(issued + chrono::Duration::days(2), day));
    }
}
