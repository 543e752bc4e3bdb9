use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use common_auth::jwks::DEFAULT_FETCH_TIMEOUT;
use common_auth::provider::DEFAULT_CACHE_TTL;
use common_auth::{jwks_url_for_domain, Algorithm, JwtConfig, RSA_ALGORITHMS};

const MIN_REFRESH_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub auth_domain: String,
    pub audience: String,
    pub algorithms: Vec<Algorithm>,
    pub leeway_seconds: u32,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub jwks_refresh_interval: Duration,
    pub dev_public_key_pem: Option<String>,
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_domain = lookup("AUTH0_DOMAIN").context("AUTH0_DOMAIN must be set")?;
        let audience = lookup("API_AUDIENCE").context("API_AUDIENCE must be set")?;

        let algorithms = match lookup("JWT_ALGORITHMS") {
            Some(raw) => parse_algorithms(&raw)?,
            None => vec![Algorithm::RS256],
        };

        let leeway_seconds = parse_or("JWT_LEEWAY_SECONDS", lookup("JWT_LEEWAY_SECONDS"), 0u32)?;
        let cache_ttl = parse_or(
            "JWKS_CACHE_TTL_SECONDS",
            lookup("JWKS_CACHE_TTL_SECONDS"),
            DEFAULT_CACHE_TTL.as_secs(),
        )?;
        let fetch_timeout = parse_or(
            "JWKS_FETCH_TIMEOUT_SECONDS",
            lookup("JWKS_FETCH_TIMEOUT_SECONDS"),
            DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?;
        let refresh_secs = parse_or("JWKS_REFRESH_SECONDS", lookup("JWKS_REFRESH_SECONDS"), 300u64)?
            .max(MIN_REFRESH_SECS);

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;

        Ok(Self {
            auth_domain,
            audience,
            algorithms,
            leeway_seconds,
            jwks_cache_ttl: Duration::from_secs(cache_ttl),
            jwks_fetch_timeout: Duration::from_secs(fetch_timeout),
            jwks_refresh_interval: Duration::from_secs(refresh_secs),
            dev_public_key_pem: lookup("JWT_DEV_PUBLIC_KEY_PEM").filter(|pem| !pem.trim().is_empty()),
            host,
            port,
        })
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::for_domain(&self.auth_domain, self.audience.clone())
            .with_algorithms(self.algorithms.iter().copied())
            .with_leeway(self.leeway_seconds)
    }

    pub fn jwks_url(&self) -> String {
        jwks_url_for_domain(&self.auth_domain)
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow!("{name} is invalid: {err}")),
        None => Ok(default),
    }
}

fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>> {
    let mut algorithms = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name)
            .map_err(|err| anyhow!("JWT_ALGORITHMS contains unknown algorithm '{name}': {err}"))?;
        if !RSA_ALGORITHMS.contains(&alg) {
            return Err(anyhow!(
                "JWT_ALGORITHMS may only list RSA-family algorithms, got '{name}'"
            ));
        }
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }
    if algorithms.is_empty() {
        return Err(anyhow!("JWT_ALGORITHMS must list at least one algorithm"));
    }
    Ok(algorithms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_set() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("AUTH0_DOMAIN", "casting.eu.auth0.com"),
            ("API_AUDIENCE", "casting-agency"),
        ]))
        .expect("config");

        assert_eq!(config.algorithms, vec![Algorithm::RS256]);
        assert_eq!(config.leeway_seconds, 0);
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.jwks_fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwks_url(), "https://casting.eu.auth0.com/.well-known/jwks.json");

        let jwt = config.jwt_config();
        assert_eq!(jwt.issuer, "https://casting.eu.auth0.com/");
        assert_eq!(jwt.audience, "casting-agency");
    }

    #[test]
    fn missing_domain_or_audience_is_an_error() {
        assert!(ServiceConfig::from_lookup(lookup_from(&[("API_AUDIENCE", "a")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup_from(&[("AUTH0_DOMAIN", "d")])).is_err());
    }

    #[test]
    fn algorithm_list_is_restricted_to_rsa() {
        let ok = ServiceConfig::from_lookup(lookup_from(&[
            ("AUTH0_DOMAIN", "d"),
            ("API_AUDIENCE", "a"),
            ("JWT_ALGORITHMS", "RS256, PS256,RS256"),
        ]))
        .expect("config");
        assert_eq!(ok.algorithms, vec![Algorithm::RS256, Algorithm::PS256]);

        for bad in ["HS256", "RS256,ES256", "nope", " , "] {
            let result = ServiceConfig::from_lookup(lookup_from(&[
                ("AUTH0_DOMAIN", "d"),
                ("API_AUDIENCE", "a"),
                ("JWT_ALGORITHMS", bad),
            ]));
            assert!(result.is_err(), "{bad}");
        }
    }

    #[test]
    fn refresh_interval_has_floor() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("AUTH0_DOMAIN", "d"),
            ("API_AUDIENCE", "a"),
            ("JWKS_REFRESH_SECONDS", "5"),
        ]))
        .expect("config");
        assert_eq!(config.jwks_refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn unparsable_numbers_are_reported() {
        let err = ServiceConfig::from_lookup(lookup_from(&[
            ("AUTH0_DOMAIN", "d"),
            ("API_AUDIENCE", "a"),
            ("PORT", "eighty"),
        ]))
        .expect_err("bad port");
        assert!(err.to_string().contains("PORT"), "{err}");
    }
}
