use anyhow::Context;
use time::{macros::offset, Duration, UtcOffset};

use crate::plans::pricing::PriceTable;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Civil timezone used to decide which Monday "today" belongs to.
#[derive(Debug, Clone, Copy)]
pub struct WeekConfig {
    pub utc_offset: UtcOffset,
}

impl Default for WeekConfig {
    fn default() -> Self {
        Self {
            utc_offset: offset!(+5:30),
        }
    }
}

const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_ACCESS_TTL_MINUTES: u32 = 60 * 24;
const DEFAULT_REFRESH_TTL_MINUTES: u32 = 60 * 24 * 7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub pricing: PriceTable,
    pub week: WeekConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Optional variables fall
    /// back to defaults; present but malformed ones are errors.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL is not set")?;
        let access_minutes = parse_or(&get, "JWT_TTL_MINUTES", DEFAULT_ACCESS_TTL_MINUTES)?;
        let refresh_minutes = parse_or(&get, "JWT_REFRESH_TTL_MINUTES", DEFAULT_REFRESH_TTL_MINUTES)?;
        let jwt = JwtConfig {
            secret: get("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "tiffin".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "tiffin-members".into()),
            access_ttl: Duration::minutes(access_minutes.into()),
            refresh_ttl: Duration::minutes(refresh_minutes.into()),
        };

        let defaults = PriceTable::default();
        let pricing = PriceTable {
            half: parse_or(&get, "HALF_PRICE", defaults.half)?,
            full: parse_or(&get, "FULL_PRICE", defaults.full)?,
        };

        let offset_minutes = parse_or(&get, "PLAN_UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES)?;
        let week = WeekConfig {
            utc_offset: parse_utc_offset(offset_minutes)?,
        };

        Ok(Self {
            database_url,
            jwt,
            pricing,
            week,
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}

fn parse_utc_offset(minutes: i32) -> anyhow::Result<UtcOffset> {
    minutes
        .checked_mul(60)
        .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
        .with_context(|| format!("PLAN_UTC_OFFSET_MINUTES={minutes} is out of range"))
}
