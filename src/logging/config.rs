/// Logging settings read from the environment
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub environment: String,
    pub level: String,
    pub directory: String,
}

impl LoggingConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Default filter when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> String {
        format!(
            "bloglist_backend={},tower_http=debug,axum=debug,sqlx=warn",
            self.level
        )
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if environment == "production" {
                "info".to_string()
            } else {
                "debug".to_string()
            }
        });
        Self {
            environment,
            level,
            directory: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
