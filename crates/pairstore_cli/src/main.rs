//! Command-line client for the pair store API.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pairstore_core::models::pair::{CheckImageResponse, PairListing, UploadReceipt};
use pairstore_core::upload::guess_content_type;
use pairstore_core::{ImageTextPair, MatchMode, DEFAULT_CLI_SERVER_URL, EMPTY_LISTING_MESSAGE};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "pairs", about = "Image/text pair store CLI", version)]
struct Cli {
    /// Server URL (can also be set via PAIRS_SERVER env var)
    #[arg(short, long, env = "PAIRS_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Print timing for API requests
    #[arg(long, global = true)]
    timing: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Upload an image together with its text
    Upload {
        file: PathBuf,
        text: String,
        /// Replaying a key returns the first upload's receipt
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Find the image stored for a text
    FindImage {
        text: String,
        /// exact | case_insensitive (server default when omitted)
        #[arg(short, long)]
        mode: Option<MatchMode>,
    },
    /// Find the text stored for an image file name
    FindText { name: String },
    /// Look up the stored text for a local image by its file name
    Check { file: PathBuf },
    /// List every stored pair
    List,
}

fn log_timing(timing: bool, label: &str, duration: Duration) {
    if timing {
        eprintln!(
            "[timing] {}: {:.1} ms",
            label,
            duration.as_secs_f64() * 1000.0
        );
    }
}

fn log_timing_parts(timing: bool, label: &str, request: Duration, parse: Option<Duration>) {
    if !timing {
        return;
    }
    if let Some(parse) = parse {
        let total = request + parse;
        eprintln!(
            "[timing] {}: request {:.1} ms, parse {:.1} ms, total {:.1} ms",
            label,
            request.as_secs_f64() * 1000.0,
            parse.as_secs_f64() * 1000.0,
            total.as_secs_f64() * 1000.0
        );
    } else {
        log_timing(timing, label, request);
    }
}

fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

async fn ensure_success_or_exit(res: reqwest::Response, action: &str) -> reqwest::Response {
    let status = res.status();
    if status.is_success() {
        return res;
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    let message = error_message_for_response(status, &body);
    eprintln!("{} failed ({}): {}", action, status, message);
    std::process::exit(1);
}

fn exit_with(action: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

fn pretty_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("response encoding error: {}", err))
}

fn format_receipt_output(receipt: &UploadReceipt, json: bool) -> Result<String, String> {
    if json {
        return pretty_json(receipt);
    }
    Ok(format!(
        "Stored: {} -> {}",
        receipt.pair.text_content, receipt.pair.image_url
    ))
}

fn format_pair_output(pair: &ImageTextPair, json: bool) -> Result<String, String> {
    if json {
        return pretty_json(pair);
    }
    Ok(pair.image_url.clone())
}

fn format_pairs_output(pairs: &[ImageTextPair], json: bool) -> Result<String, String> {
    if json {
        return pretty_json(&pairs);
    }
    Ok(pairs
        .iter()
        .map(|pair| format!("{:<40} {}", pair.text_content, pair.image_url))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn format_listing_output(listing: &PairListing, json: bool) -> Result<String, String> {
    if json {
        return pretty_json(listing);
    }
    if listing.items.is_empty() {
        return Ok(listing
            .message
            .clone()
            .unwrap_or_else(|| EMPTY_LISTING_MESSAGE.to_string()));
    }
    format_pairs_output(&listing.items, false)
}

fn format_check_output(response: &CheckImageResponse, json: bool) -> Result<String, String> {
    if json {
        return pretty_json(response);
    }
    if response.matches > 1 {
        return Ok(format!(
            "{} ({} stored images match '{}')",
            response.text_content, response.matches, response.file_name
        ));
    }
    Ok(response.text_content.clone())
}

fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    let mut path = url
        .path_segments_mut()
        .map_err(|_| "Server URL cannot be used as an API base".to_string())?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

fn api_url_or_exit(server: &str, action: &str, segments: &[&str]) -> reqwest::Url {
    match api_url(server, segments) {
        Ok(url) => url,
        Err(message) => exit_with(action, message),
    }
}

fn normalize_server(server: String) -> String {
    if let Ok(mut url) = reqwest::Url::parse(&server) {
        let should_normalize_localhost =
            url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
        if should_normalize_localhost && url.set_host(Some("127.0.0.1")).is_err() {
            return server;
        }
        let mut normalized = url.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        return normalized;
    }
    server
}

fn explicit_server_override(server: Option<String>) -> Option<String> {
    server.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn resolve_server(server: Option<String>) -> String {
    explicit_server_override(server).unwrap_or_else(|| DEFAULT_CLI_SERVER_URL.to_string())
}

/// A local image ready to be sent as a multipart `file` part.
#[derive(Debug)]
struct ImageFile {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

fn read_image_file(path: &Path) -> Result<ImageFile, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| format!("'{}' has no usable file name", path.display()))?
        .to_string();
    let bytes = std::fs::read(path)
        .map_err(|err| format!("cannot read '{}': {}", path.display(), err))?;
    if bytes.is_empty() {
        return Err(format!("'{}' is empty", path.display()));
    }
    let mime = guess_content_type(&file_name).unwrap_or("application/octet-stream");
    Ok(ImageFile {
        file_name,
        mime,
        bytes,
    })
}

fn file_part(image: ImageFile) -> Result<reqwest::multipart::Part, reqwest::Error> {
    reqwest::multipart::Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(image.mime)
}

async fn timed_send(request: reqwest::RequestBuilder) -> reqwest::Result<(reqwest::Response, Duration)> {
    let request_start = Instant::now();
    let res = request.send().await?;
    Ok((res, request_start.elapsed()))
}

async fn parse_json_or_exit<T: serde::de::DeserializeOwned>(
    res: reqwest::Response,
    action: &str,
) -> (T, Duration) {
    let parse_start = Instant::now();
    match res.json::<T>().await {
        Ok(value) => (value, parse_start.elapsed()),
        Err(err) => exit_with(action, format!("unexpected response: {}", err)),
    }
}

fn print_or_exit(action: &str, output: Result<String, String>) {
    match output {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(message) => exit_with(action, message),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        server,
        json,
        timing,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    let server = normalize_server(resolve_server(server));

    match command {
        Commands::Completions { .. } => {}
        Commands::Upload {
            file,
            text,
            idempotency_key,
        } => {
            let endpoint = api_url_or_exit(&server, "Upload", &["api", "pairs"]);
            let image = read_image_file(&file).unwrap_or_else(|message| exit_with("Upload", message));
            let form = reqwest::multipart::Form::new()
                .text("text", text)
                .part("file", file_part(image)?);
            let mut request = client.post(endpoint).multipart(form);
            let idempotency_key = idempotency_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty());
            if let Some(key) = idempotency_key {
                request = request.header("Idempotency-Key", key);
            }

            let (res, request_elapsed) = timed_send(request).await?;
            let res = ensure_success_or_exit(res, "Upload").await;
            let (receipt, parse_elapsed): (UploadReceipt, _) =
                parse_json_or_exit(res, "Upload").await;
            log_timing_parts(timing, "upload", request_elapsed, Some(parse_elapsed));
            print_or_exit("Upload", format_receipt_output(&receipt, json));
        }
        Commands::FindImage { text, mode } => {
            let endpoint = api_url_or_exit(&server, "Find image", &["api", "pairs", "by-text"]);
            let mut query = vec![("text", text)];
            if let Some(mode) = mode {
                query.push(("mode", mode.as_str().to_string()));
            }

            let (res, request_elapsed) = timed_send(client.get(endpoint).query(&query)).await?;
            let res = ensure_success_or_exit(res, "Find image").await;
            let (pair, parse_elapsed): (ImageTextPair, _) =
                parse_json_or_exit(res, "Find image").await;
            log_timing_parts(timing, "find-image", request_elapsed, Some(parse_elapsed));
            print_or_exit("Find image", format_pair_output(&pair, json));
        }
        Commands::FindText { name } => {
            let endpoint = api_url_or_exit(&server, "Find text", &["api", "pairs", "by-image"]);
            let request = client.get(endpoint).query(&[("name", name.as_str())]);

            let (res, request_elapsed) = timed_send(request).await?;
            let res = ensure_success_or_exit(res, "Find text").await;
            let (pairs, parse_elapsed): (Vec<ImageTextPair>, _) =
                parse_json_or_exit(res, "Find text").await;
            log_timing_parts(timing, "find-text", request_elapsed, Some(parse_elapsed));
            print_or_exit("Find text", format_pairs_output(&pairs, json));
        }
        Commands::Check { file } => {
            let endpoint = api_url_or_exit(&server, "Check", &["api", "pairs", "check-image"]);
            let image = read_image_file(&file).unwrap_or_else(|message| exit_with("Check", message));
            let form = reqwest::multipart::Form::new().part("file", file_part(image)?);

            let (res, request_elapsed) = timed_send(client.post(endpoint).multipart(form)).await?;
            let res = ensure_success_or_exit(res, "Check").await;
            let (response, parse_elapsed): (CheckImageResponse, _) =
                parse_json_or_exit(res, "Check").await;
            log_timing_parts(timing, "check", request_elapsed, Some(parse_elapsed));
            print_or_exit("Check", format_check_output(&response, json));
        }
        Commands::List => {
            let endpoint = api_url_or_exit(&server, "List", &["api", "pairs"]);

            let (res, request_elapsed) = timed_send(client.get(endpoint)).await?;
            let res = ensure_success_or_exit(res, "List").await;
            let (listing, parse_elapsed): (PairListing, _) =
                parse_json_or_exit(res, "List").await;
            log_timing_parts(timing, "list", request_elapsed, Some(parse_elapsed));
            print_or_exit("List", format_listing_output(&listing, json));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
