//! Logging setup utilities for the trebuchet server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the server library crate and the binary get the default level.
/// `RUST_LOG` overrides it entirely.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "trebuchet-server")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use trebuchet_shared::logger::setup_logger;
///
/// setup_logger("trebuchet-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the `EnvFilter` directive string used when `RUST_LOG` is not set.
fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "trebuchet_server={level},trebuchet_shared={level},{bin}={level},tower_http=info",
        level = default_log_level,
        bin = binary_name.replace('-', "_"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_library_and_binary() {
        // テスト項目: ライブラリとバイナリの両方にデフォルトレベルが設定される
        // given (前提条件):
        let binary = "trebuchet-server";

        // when (操作):
        let directives = default_directives(binary, "debug");

        // then (期待する結果):
        assert!(directives.contains("trebuchet_server=debug"));
        assert!(directives.contains("trebuchet_shared=debug"));
        assert!(directives.ends_with("tower_http=info"));
    }
}
