#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// PostgreSQL connection string. When absent the server runs with the
    /// in-memory account store (local development and tests).
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    /// Account seeded into the in-memory store at startup so the service is
    /// usable out of the box without a database.
    pub demo_account_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("LECTERN_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            database_url: std::env::var("LECTERN_DATABASE_URL").ok().filter(|v| !v.is_empty()),
            cors_origins: std::env::var("LECTERN_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            demo_account_id: std::env::var("LECTERN_DEMO_ACCOUNT")
                .unwrap_or_else(|_| "acct_demo".to_string()),
        })
    }
}
