//! Bearer token verification and key-set caching.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use code_assist_mcp::auth::{bearer_token, AuthError, TokenValidator};
use common::*;

fn validator_with(source: Arc<CountingSource>) -> TokenValidator {
    TokenValidator::new(&auth_config(), source)
}

// ═══════════════════════════════════════════════════════
// ACCEPTED TOKENS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_01_valid_token() {
    let claims = validator().validate(&token_for("user-a")).await.unwrap();

    assert_eq!(claims.subject(), "user-a");
    assert_eq!(claims.issuer(), ISSUER);
    assert_eq!(claims.audiences(), &[AUDIENCE.to_string()]);
    assert_eq!(claims.scopes(), &["user_impersonation".to_string(), "code.read".to_string()]);
    assert_eq!(claims.name(), Some("Test User"));
    assert!(claims.expires_at() > now());
    assert!(claims.not_before() > 0 && claims.not_before() <= now());
    assert!(claims.issued_at() > 0 && claims.issued_at() <= now());
    assert!(claims.issued_at() < claims.expires_at());

    println!("TEST 01 — Valid Token: PASS");
}

#[tokio::test]
async fn test_02_roles_without_scopes() {
    let mut payload = valid_claims("app-1");
    payload.as_object_mut().unwrap().remove("scp");
    payload["roles"] = json!(["Code.Analyze"]);
    payload["aud"] = json!(["other-api", AUDIENCE]);

    let claims = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &payload))
        .await
        .unwrap();
    assert!(claims.scopes().is_empty());
    assert_eq!(claims.roles(), &["Code.Analyze".to_string()]);
    assert_eq!(claims.grants(), vec!["Code.Analyze".to_string()]);

    println!("TEST 02 — Roles Without Scopes: PASS");
}

// ═══════════════════════════════════════════════════════
// REJECTED TOKENS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_03_expired() {
    let mut payload = valid_claims("user-a");
    payload["exp"] = json!(now() - 3600);

    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &payload))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::Expired);
    assert_eq!(err.reason(), "expired");

    println!("TEST 03 — Expired: PASS");
}

#[tokio::test]
async fn test_04_wrong_audience_and_issuer() {
    let mut wrong_aud = valid_claims("user-a");
    wrong_aud["aud"] = json!("api://someone-else");
    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &wrong_aud))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ClaimMismatch(_)), "got {err:?}");

    let mut wrong_iss = valid_claims("user-a");
    wrong_iss["iss"] = json!("https://evil.test/");
    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &wrong_iss))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ClaimMismatch(_)), "got {err:?}");

    println!("TEST 04 — Wrong Audience / Issuer: PASS");
}

#[tokio::test]
async fn test_05_not_yet_valid() {
    let mut payload = valid_claims("user-a");
    payload["nbf"] = json!(now() + 3600);

    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &payload))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ClaimMismatch(_)), "got {err:?}");

    println!("TEST 05 — Not Yet Valid: PASS");
}

#[tokio::test]
async fn test_06_required_time_claims() {
    for claim in ["exp", "nbf", "iat"] {
        let mut payload = valid_claims("user-a");
        payload.as_object_mut().unwrap().remove(claim);
        let err = validator()
            .validate(&mint(Some(KID_1), SIGNING_KEY, &payload))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::ClaimMismatch(_)),
            "missing {claim} gave {err:?}"
        );
    }

    let mut future_iat = valid_claims("user-a");
    future_iat["iat"] = json!(now() + 3600);
    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &future_iat))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ClaimMismatch(_)), "got {err:?}");

    println!("TEST 06 — Required Time Claims: PASS");
}

#[tokio::test]
async fn test_07_insufficient_scope() {
    let mut payload = valid_claims("user-a");
    payload.as_object_mut().unwrap().remove("scp");

    let err = validator()
        .validate(&mint(Some(KID_1), SIGNING_KEY, &payload))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InsufficientScope);

    println!("TEST 07 — Insufficient Scope: PASS");
}

#[tokio::test]
async fn test_08_malformed_tokens() {
    let v = validator();

    let err = v.validate("not-a-jwt").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed(_)), "got {err:?}");

    let no_kid = mint(None, SIGNING_KEY, &valid_claims("user-a"));
    let err = v.validate(&no_kid).await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed(_)), "got {err:?}");

    assert!(matches!(bearer_token(None), Err(AuthError::Malformed(_))));
    assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::Malformed(_))));
    assert!(matches!(bearer_token(Some("Bearer ")), Err(AuthError::Malformed(_))));
    assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");

    println!("TEST 08 — Malformed Tokens: PASS");
}

#[tokio::test]
async fn test_09_bad_signature() {
    // Signed with the rotated key but claiming the primary key's kid.
    let forged = mint(Some(KID_1), ROTATED_KEY, &valid_claims("user-a"));
    let err = validator().validate(&forged).await.unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);

    // Symmetric algorithm against an RSA key.
    let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(KID_1.to_string());
    let hmac = encode(
        &header,
        &valid_claims("user-a"),
        &EncodingKey::from_secret(b"shared-secret"),
    )
    .unwrap();
    let err = validator().validate(&hmac).await.unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);

    println!("TEST 09 — Bad Signature: PASS");
}

// ═══════════════════════════════════════════════════════
// KEY CACHE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_10_unknown_kid_refreshes_once() {
    let source = CountingSource::new(primary_keys());
    let v = validator_with(source.clone());

    let token = mint(Some(KID_2), ROTATED_KEY, &valid_claims("user-a"));
    let err = v.validate(&token).await.unwrap_err();

    assert_eq!(err, AuthError::UnknownKey(KID_2.to_string()));
    assert_eq!(source.fetches(), 2, "initial fetch plus one forced refresh");

    println!("TEST 10 — Unknown Kid Refreshes Once: PASS");
}

#[tokio::test]
async fn test_11_key_rotation_picked_up() {
    let source = CountingSource::new(primary_keys());
    let v = validator_with(source.clone());

    v.validate(&token_for("user-a")).await.unwrap();
    assert_eq!(source.fetches(), 1);

    source.set(Some(both_keys()));
    let rotated = mint(Some(KID_2), ROTATED_KEY, &valid_claims("user-a"));
    let claims = v.validate(&rotated).await.unwrap();
    assert_eq!(claims.subject(), "user-a");
    assert_eq!(source.fetches(), 2);

    // Fresh cache, known kid: no further fetches.
    v.validate(&rotated).await.unwrap();
    v.validate(&token_for("user-b")).await.unwrap();
    assert_eq!(source.fetches(), 2);

    println!("TEST 11 — Key Rotation: PASS");
}

#[tokio::test]
async fn test_12_refresh_cooldown_limits_fetches() {
    let source = CountingSource::new(primary_keys());
    let mut config = auth_config();
    config.refresh_cooldown = Duration::from_secs(60);
    let v = TokenValidator::new(&config, source.clone());

    let unknown = mint(Some("key-unknown"), ROTATED_KEY, &valid_claims("user-a"));
    for _ in 0..5 {
        let err = v.validate(&unknown).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownKey(_)));
    }
    assert_eq!(source.fetches(), 1);

    println!("TEST 12 — Refresh Cooldown: PASS");
}

#[tokio::test]
async fn test_13_stale_cache_served_when_fetch_fails() {
    let source = CountingSource::new(primary_keys());
    let mut config = auth_config();
    config.key_ttl = Duration::ZERO;
    let v = TokenValidator::new(&config, source.clone());

    v.validate(&token_for("user-a")).await.unwrap();
    source.set(None);

    let claims = v.validate(&token_for("user-a")).await.unwrap();
    assert_eq!(claims.subject(), "user-a");
    assert_eq!(source.fetches(), 2, "the refresh was attempted");

    println!("TEST 13 — Stale Cache Fallback: PASS");
}

#[tokio::test]
async fn test_14_no_cache_and_no_source() {
    let source = CountingSource::offline();
    let v = validator_with(source.clone());

    let err = v.validate(&token_for("user-a")).await.unwrap_err();
    assert!(matches!(err, AuthError::KeyUnavailable(_)), "got {err:?}");
    assert_eq!(err.reason(), "key_unavailable");

    println!("TEST 14 — Keys Unavailable: PASS");
}

#[tokio::test]
async fn test_15_concurrent_cold_start_fetches_once() {
    let source = CountingSource::new(primary_keys());
    let v = Arc::new(validator_with(source.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let v = v.clone();
            tokio::spawn(async move { v.validate(&token_for(&format!("user-{i}"))).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(source.fetches(), 1);
    assert!(v.key_cache().snapshot().await.is_some());

    println!("TEST 15 — Concurrent Cold Start: PASS");
}

#[tokio::test]
async fn test_16_keys_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&primary_keys()).unwrap().as_bytes())
        .unwrap();

    let mut config = auth_config();
    config.jwks_uri = Some("http://127.0.0.1:9/unreachable".to_string());
    config.jwks_file = Some(file.path().to_path_buf());

    let source = config.key_source().unwrap();
    assert_eq!(source.describe(), file.path().display().to_string());

    let claims = TokenValidator::new(&config, source)
        .validate(&token_for("user-a"))
        .await
        .unwrap();
    assert_eq!(claims.subject(), "user-a");

    config.jwks_file = Some(file.path().with_extension("missing"));
    assert!(config.key_source().is_err());

    println!("TEST 16 — Keys From File: PASS");
}
