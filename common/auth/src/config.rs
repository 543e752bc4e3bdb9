use jsonwebtoken::Algorithm;

/// RSA-family signature algorithms. Nothing outside this list is ever
/// accepted, whatever the configured allow-list says.
pub const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

pub fn is_rsa_family(alg: Algorithm) -> bool {
    RSA_ALGORITHMS.contains(&alg)
}

/// Runtime configuration for JWT verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Expected issuer claim (iss), compared exactly.
    pub issuer: String,
    /// Expected audience claim (aud).
    pub audience: String,
    /// Accepted header algorithms.
    pub algorithms: Vec<Algorithm>,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    /// Construct config accepting RS256 only, with no expiry leeway.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_seconds: 0,
        }
    }

    /// Config for a tenant of a hosted identity provider: the issuer is
    /// `https://<domain>/`.
    pub fn for_domain(domain: &str, audience: impl Into<String>) -> Self {
        Self::new(issuer_for_domain(domain), audience)
    }

    /// Replace the algorithm allow-list. Non-RSA entries are dropped.
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms
            .into_iter()
            .filter(|alg| is_rsa_family(*alg))
            .collect();
        self
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn accepts(&self, alg: Algorithm) -> bool {
        is_rsa_family(alg) && self.algorithms.contains(&alg)
    }
}

fn normalize_domain(domain: &str) -> &str {
    let trimmed = domain.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/')
}

pub fn issuer_for_domain(domain: &str) -> String {
    format!("https://{}/", normalize_domain(domain))
}

pub fn jwks_url_for_domain(domain: &str) -> String {
    format!("https://{}/.well-known/jwks.json", normalize_domain(domain))
}
