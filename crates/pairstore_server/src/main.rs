//! Headless API server entrypoint.

use pairstore_core::config::env_flag_enabled;
use pairstore_server::{resolve_bind_address, serve_router, AppState, Config, DEFAULT_PORT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    check_config: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--check-config" => flags.check_config = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

fn describe_config(config: &Config) -> String {
    format!(
        "backend={} bucket={} table={} key_scheme={:?} duplicate_image_match={:?} lookup_match={} timeout={}s",
        config.backend.as_str(),
        config.bucket,
        config.table,
        config.key_scheme,
        config.duplicate_image_match,
        config.lookup_match,
        config.request_timeout().as_secs()
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairstore=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    config.validate()?;
    if cli_flags.check_config {
        println!("Configuration OK: {}", describe_config(&config));
        return Ok(());
    }
    tracing::info!("{}", describe_config(&config));

    let state = AppState::new(config.clone())?;

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("Pair store running at http://{}", actual_addr);

    serve_router(listener, state, allow_public, shutdown_signal()).await?;
    tracing::info!("Pair store stopped");
    Ok(())
}

fn print_help() {
    println!("Pair Store Server\n");
    println!("Usage: pairstore [OPTIONS]\n");
    println!("Options:");
    println!("  --check-config    Validate configuration and exit");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!("  PAIRSTORE_BACKEND      hosted | memory (default: hosted)");
    println!("  PAIRSTORE_URL          Hosted service base URL (required for hosted)");
    println!("  PAIRSTORE_KEY          Hosted service API key (required for hosted)");
    println!("  PAIRSTORE_BUCKET       Object bucket (default: images)");
    println!("  PAIRSTORE_TABLE        Pair table (default: image_text_pairs)");
    println!("  PORT                   Server port (default: {})", DEFAULT_PORT);
    println!("  MAX_UPLOAD_SIZE        Maximum image size in bytes (default: 10MB)");
    println!("  REQUEST_TIMEOUT_SECS   Per backend call timeout (default: 15)");
    println!("  KEY_SCHEME             timestamped | public (default: timestamped)");
    println!("  DUPLICATE_IMAGE_MATCH  exact | substring (default: exact)");
    println!("  LOOKUP_MATCH           case_insensitive | exact (default: case_insensitive)");
    println!("  ALLOW_PUBLIC_ACCESS    Allow CORS from any origin");
    println!(
        "  BIND                   Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_config, parse_cli_flags, CliFlags};
    use pairstore_server::Config;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("pairstore")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parse_cli_flags_rejects_unknown_and_positional_arguments() {
        let cases = [
            (args(&["--check-confg"]), "Unknown option"),
            (args(&["serve"]), "Unexpected positional argument"),
        ];

        for (args, expected_fragment) in cases {
            let err = parse_cli_flags(&args).expect_err("invalid args should be rejected");
            assert!(err.to_string().contains(expected_fragment));
        }
    }

    #[test]
    fn parse_cli_flags_accepts_supported_options() {
        let flags = parse_cli_flags(&args(&["--check-config", "-h"])).expect("known options");
        assert_eq!(
            flags,
            CliFlags {
                help: true,
                check_config: true,
            }
        );
        assert_eq!(parse_cli_flags(&args(&[])).expect("no options"), CliFlags::default());
    }

    #[test]
    fn describe_config_never_prints_the_api_key() {
        let config = Config {
            api_key: Some("super-secret".to_string()),
            ..Config::default()
        };
        let description = describe_config(&config);
        assert!(description.contains("backend=hosted"));
        assert!(!description.contains("super-secret"));
    }
}
