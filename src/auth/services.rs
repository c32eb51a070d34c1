use anyhow::Context;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    auth::dto::{Claims, TokenKind},
    error::AppError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn argon_error(context: &'static str, e: argon2::password_hash::Error) -> anyhow::Error {
    error!(error = %e, context, "argon2 failure");
    anyhow::anyhow!("{context}: {e}")
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| argon_error("hash password", e))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| argon_error("parse stored hash", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Signing material derived from [`crate::config::JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            access_ttl: jwt.access_ttl,
            refresh_ttl: jwt.refresh_ttl,
        }
    }
}

impl JwtKeys {
    fn sign(&self, member_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = OffsetDateTime::now_utc();
        let exp = now.checked_add(ttl).context("token expiry out of range")?;
        let claims = Claims {
            sub: member_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %member_id, ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, member_id: Uuid) -> anyhow::Result<String> {
        self.sign(member_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, member_id: Uuid) -> anyhow::Result<String> {
        self.sign(member_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "jwt verified");
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

/// Token from an `Authorization: Bearer <token>` value. The scheme is
/// case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Member id from a valid access token. Plan handlers use it as the owner.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
        let token = bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }
        Ok(AuthUser(claims.sub))
    }
}
