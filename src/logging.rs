use tracing_subscriber::EnvFilter;

use crate::errors::{CosmosError, Result};

/// Install a fmt subscriber filtered by `RUST_LOG` plus `default_directive` (e.g. `"info"`
/// or `"keepkey_cosmos=debug"`). `log` records from this crate are captured too.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let directive = default_directive
        .parse()
        .map_err(|e| CosmosError::Config(format!("invalid log directive {:?}: {}", default_directive, e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| CosmosError::Config(format!("logging already initialized: {}", e)))?;
    log::info!("Logging initialized ({})", default_directive);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive() {
        assert!(matches!(
            init_logging("keepkey_cosmos=notalevel"),
            Err(CosmosError::Config(_))
        ));
    }
}
