use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use ruhverse::remote::DEFAULT_API_BASE;
use ruhverse::web::{self, WebConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ruhverse=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "ruhverse", about = "Serve the RuhVerse Quran reader", version)]
pub struct Cli {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Public origin used in canonical links and the sitemap.
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "https://ruhverse.online")]
    base_url: String,

    /// How long a fetched dataset is served before it is refreshed.
    #[arg(long, env = "QURAN_CACHE_TTL_SECS", default_value_t = 21_600)]
    cache_ttl_secs: u64,

    /// AlQuran Cloud API root.
    #[arg(long, env = "QURAN_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,
}

impl Cli {
    fn into_config(self) -> WebConfig {
        WebConfig {
            addr: SocketAddr::new(self.host, self.port),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            api_base: self.api_base,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = Cli::parse().into_config();
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_config() {
        let cli = Cli::try_parse_from([
            "ruhverse",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--base-url",
            "https://example.org/",
            "--cache-ttl-secs",
            "60",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.base_url, "https://example.org");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn rejects_invalid_host() {
        assert!(Cli::try_parse_from(["ruhverse", "--host", "not-an-ip"]).is_err());
    }
}
