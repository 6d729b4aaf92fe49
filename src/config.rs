// ⚙️ Configuration - command line flags with environment fallbacks

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://payments.db";
pub const DEFAULT_MODEL_PATH: &str = "account_payment_model.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Where the store lives
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Store connection string (sqlite://path, a file path, or :memory:)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,
}

/// Settings for the API server
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Trained scoring artifact, loaded once at startup
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Upper bound on a single store call, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        server: ServerConfig,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--database-url",
            ":memory:",
            "--model-path",
            "/tmp/model.json",
            "--request-timeout-secs",
            "0",
        ]);

        assert_eq!(cli.server.store.database_url, ":memory:");
        assert_eq!(cli.server.model_path, PathBuf::from("/tmp/model.json"));
        // Zero would make every call time out
        assert_eq!(cli.server.request_timeout(), Duration::from_secs(1));
    }
}
