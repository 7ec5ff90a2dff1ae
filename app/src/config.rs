use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Remote,
    Memory,
}

pub struct Config {
    inner: RwLock<InnerConfig>,
}

struct InnerConfig {
    server_port: u16,
    store_backend: StoreBackend,
    database_url: Option<String>,
    timescale_url: Option<String>,
    redis_url: Option<String>,
    mongodb_url: Option<String>,
    cassandra_hosts: Vec<String>,
    elasticsearch_url: Option<String>,
    store_timeout_ms: u64,
    low_battery_threshold: f64,
    otel_stdout: bool,
}

impl Config {
    pub fn server_port(&self) -> u16 {
        self.inner.read().server_port
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.inner.read().store_backend
    }

    pub fn database_url(&self) -> String {
        let inner = self.inner.read();
        inner
            .database_url
            .clone()
            .expect("DATABASE_URL must be set")
    }

    pub fn timescale_url(&self) -> String {
        let inner = self.inner.read();
        match &inner.timescale_url {
            Some(url) => url.clone(),
            None => inner
                .database_url
                .clone()
                .expect("TIMESCALE_URL or DATABASE_URL must be set"),
        }
    }

    pub fn redis_url(&self) -> String {
        let inner = self.inner.read();
        inner.redis_url.clone().expect("REDIS_URL must be set")
    }

    pub fn mongodb_url(&self) -> String {
        let inner = self.inner.read();
        inner.mongodb_url.clone().expect("MONGODB_URL must be set")
    }

    pub fn cassandra_hosts(&self) -> Vec<String> {
        let inner = self.inner.read();
        if inner.cassandra_hosts.is_empty() {
            panic!("No CASSANDRA_HOSTS provided");
        }
        inner.cassandra_hosts.clone()
    }

    pub fn elasticsearch_url(&self) -> String {
        let inner = self.inner.read();
        inner
            .elasticsearch_url
            .clone()
            .expect("ELASTICSEARCH_URL must be set")
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.read().store_timeout_ms)
    }

    pub fn low_battery_threshold(&self) -> f64 {
        self.inner.read().low_battery_threshold
    }

    pub fn otel_stdout(&self) -> bool {
        self.inner.read().otel_stdout
    }
}

fn parse_store_backend(raw: &str) -> StoreBackend {
    match raw.trim().to_ascii_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        "remote" | "" => StoreBackend::Remote,
        other => panic!("Unknown STORE_BACKEND: {}", other),
    }
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv::dotenv().ok();

    let server_port = env::var("SERVER_PORT")
        .map(|port| port.parse().expect("SERVER_PORT must be a port number"))
        .unwrap_or(8000);
    let store_backend = parse_store_backend(&env::var("STORE_BACKEND").unwrap_or_default());
    let cassandra_hosts = parse_hosts(&env::var("CASSANDRA_HOSTS").unwrap_or_default());
    let store_timeout_ms = env::var("STORE_TIMEOUT_MS")
        .map(|ms| ms.parse().expect("STORE_TIMEOUT_MS must be an integer"))
        .unwrap_or(5_000);
    let low_battery_threshold = env::var("LOW_BATTERY_THRESHOLD")
        .map(|t| t.parse().expect("LOW_BATTERY_THRESHOLD must be a number"))
        .unwrap_or(senser_core::DEFAULT_LOW_BATTERY_THRESHOLD);

    Config {
        inner: RwLock::new(InnerConfig {
            server_port,
            store_backend,
            database_url: env::var("DATABASE_URL").ok(),
            timescale_url: env::var("TIMESCALE_URL").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            mongodb_url: env::var("MONGODB_URL").ok(),
            cassandra_hosts,
            elasticsearch_url: env::var("ELASTICSEARCH_URL").ok(),
            store_timeout_ms,
            low_battery_threshold,
            otel_stdout: env::var("OTEL_STDOUT").is_ok(),
        }),
    }
});

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_hosts() {
        assert_eq!(
            vec!["cassandra".to_owned(), "10.0.0.2:9042".to_owned()],
            parse_hosts(" cassandra, 10.0.0.2:9042 ,")
        );
        assert!(parse_hosts("").is_empty());
    }

    #[test]
    fn test_parse_store_backend() {
        assert_eq!(StoreBackend::Memory, parse_store_backend("Memory"));
        assert_eq!(StoreBackend::Remote, parse_store_backend(""));
    }
}
