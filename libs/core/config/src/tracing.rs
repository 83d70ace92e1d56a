use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in the main() before any fallible operations to ensure
/// colored error output. Safe to call multiple times.
///
/// Configuration:
/// - Shows file:line where errors occur
/// - Hides environment variables (less noise)
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`):
///   - JSON format, one object per line, fields flattened
///   - Defaults to `info`
///
/// - **Development** (default):
///   - Pretty-printed format (human-readable)
///   - Defaults to `debug`
///
/// Both include `tracing_error::ErrorLayer` so eyre reports carry span traces.
///
/// Environment variables:
/// - `APP_ENV`: Set to "production" for JSON logs (default: "development")
/// - `RUST_LOG`: Override log levels (e.g., "debug", "lifecycle=trace")
///
/// # Multiple Calls
///
/// Safe to call multiple times: if a subscriber is already installed
/// (common in tests) the call is a no-op.
pub fn init_tracing(environment: &Environment, service: &str) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("debug,hyper=info,h2=info,tower=info")
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!(service, environment = ?environment, "Tracing initialized");
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_development() {
        init_tracing(&Environment::Development, "test");
    }

    #[test]
    fn test_init_tracing_production() {
        init_tracing(&Environment::Production, "test");
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        let env = Environment::Development;
        init_tracing(&env, "test");
        init_tracing(&env, "test");
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            init_tracing(&Environment::Production, "test");
        });
    }
}
