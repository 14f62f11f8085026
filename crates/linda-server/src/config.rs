use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Login identity that always gets the admin role.
    pub owner_open_id: Option<String>,
    pub upload_dir: PathBuf,
    /// Externally reachable base URL, used to build links to uploaded files.
    pub public_url: String,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub stt_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let jwt_secret = var("LINDA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LINDA_JWT_SECRET is unset or still a placeholder. Set it in your .env file and restart.");
        }

        let port = or("LINDA_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("LINDA_PORT is not a valid port: {}", port))?;

        Ok(Self {
            host: or("LINDA_HOST", "0.0.0.0"),
            port,
            db_path: or("LINDA_DB_PATH", "linda.db").into(),
            jwt_secret,
            owner_open_id: var("LINDA_OWNER_OPEN_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            upload_dir: or("LINDA_UPLOAD_DIR", "./uploads").into(),
            public_url: or("LINDA_PUBLIC_URL", "http://localhost:3000"),
            llm_api_url: or("LINDA_LLM_API_URL", "https://api.openai.com/v1"),
            llm_api_key: var("LINDA_LLM_API_KEY").unwrap_or_default(),
            llm_model: or("LINDA_LLM_MODEL", "gpt-4o-mini"),
            stt_model: or("LINDA_STT_MODEL", "whisper-1"),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {}", addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_lookup(lookup(&[("LINDA_JWT_SECRET", "s3cr3t-value")])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("linda.db"));
        assert_eq!(cfg.llm_model, "gpt-4o-mini");
        assert_eq!(cfg.stt_model, "whisper-1");
        assert!(cfg.owner_open_id.is_none());
        assert_eq!(cfg.addr().unwrap().port(), 3000);
    }

    #[test]
    fn rejects_missing_or_placeholder_secret() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("LINDA_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("LINDA_JWT_SECRET", "s3cr3t-value"),
            ("LINDA_PORT", "8080"),
            ("LINDA_OWNER_OPEN_ID", " amani "),
            ("LINDA_PUBLIC_URL", "https://linda.example.org"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.owner_open_id.as_deref(), Some("amani"));
        assert_eq!(cfg.public_url, "https://linda.example.org");

        let bad = Config::from_lookup(lookup(&[("LINDA_JWT_SECRET", "x1"), ("LINDA_PORT", "99999")]));
        assert!(bad.is_err());
    }
}
