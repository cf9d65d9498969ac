use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Filter from `RUST_LOG` plus a `product_bot=info` directive.
pub fn init(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("product_bot=info".parse()?);

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
