//! Unit tests for the `pairs` CLI entrypoint module.

use super::{
    api_url, error_message_for_response, format_check_output, format_listing_output,
    format_pair_output, format_pairs_output, format_receipt_output, normalize_server,
    read_image_file, resolve_server,
};
use super::{Cli, Commands};
use clap::Parser;
use pairstore_core::env::{env_lock, EnvGuard};
use pairstore_core::models::pair::{CheckImageResponse, PairListing, SagaStatus, UploadReceipt};
use pairstore_core::{ImageTextPair, MatchMode, DEFAULT_CLI_SERVER_URL, DEFAULT_PORT};
use std::io::Write;

fn pair(text: &str, url: &str) -> ImageTextPair {
    ImageTextPair::new(url, text).expect("pair")
}

#[test]
fn normalize_server_matrix() {
    let cases = [
        (
            DEFAULT_CLI_SERVER_URL.to_string(),
            format!("http://127.0.0.1:{}", DEFAULT_PORT),
        ),
        (
            format!("https://localhost:{}", DEFAULT_PORT),
            format!("https://localhost:{}", DEFAULT_PORT),
        ),
        (
            format!("http://127.0.0.1:{}/", DEFAULT_PORT),
            format!("http://127.0.0.1:{}", DEFAULT_PORT),
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(normalize_server(input), expected);
    }
}

#[test]
fn default_cli_server_url_uses_default_port_constant() {
    assert_eq!(
        DEFAULT_CLI_SERVER_URL,
        format!("http://localhost:{}", DEFAULT_PORT)
    );
}

#[test]
fn error_message_for_response_prefers_json_error_field() {
    let status = reqwest::StatusCode::CONFLICT;
    let message = error_message_for_response(
        status,
        r#"{"error":"The text 'cat' is already paired with an image","kind":"duplicate_text"}"#,
    );
    assert_eq!(message, "The text 'cat' is already paired with an image");
}

#[test]
fn error_message_for_response_uses_reason_for_empty_body() {
    let status = reqwest::StatusCode::BAD_GATEWAY;
    assert_eq!(error_message_for_response(status, "   "), "Bad Gateway");
    assert_eq!(error_message_for_response(status, "upstream down"), "upstream down");
}

#[test]
fn empty_listing_prints_no_results_message() {
    let listing = PairListing::from(Vec::new());
    assert_eq!(
        format_listing_output(&listing, false).expect("render"),
        "No images found"
    );

    let without_message = PairListing {
        message: None,
        ..PairListing::from(Vec::new())
    };
    assert_eq!(
        format_listing_output(&without_message, false).expect("render"),
        "No images found"
    );
}

#[test]
fn text_output_helpers_render_expected_fields() {
    let cat = pair("a cat", "https://x.co/storage/v1/object/public/images/1_cat.png");
    let listing = PairListing::from(vec![cat.clone()]);
    let rendered = format_listing_output(&listing, false).expect("render");
    assert!(rendered.starts_with("a cat"));
    assert!(rendered.ends_with("1_cat.png"));

    assert_eq!(format_pair_output(&cat, false).expect("render"), cat.image_url);
    assert_eq!(format_pairs_output(&[], false).expect("render"), "");

    let receipt = UploadReceipt {
        pair: cat.clone(),
        object_path: "1_cat.png".to_string(),
        status: SagaStatus::Committed,
    };
    assert_eq!(
        format_receipt_output(&receipt, false).expect("render"),
        format!("Stored: a cat -> {}", cat.image_url)
    );

    let single = CheckImageResponse {
        file_name: "cat.png".to_string(),
        text_content: "a cat".to_string(),
        matches: 1,
    };
    assert_eq!(format_check_output(&single, false).expect("render"), "a cat");
    let ambiguous = CheckImageResponse { matches: 3, ..single };
    assert!(format_check_output(&ambiguous, false)
        .expect("render")
        .contains("3 stored images match 'cat.png'"));
}

#[test]
fn json_output_helpers_preserve_payload_shape() {
    let cat = pair("a cat", "https://x.co/a.png");
    let receipt = UploadReceipt {
        pair: cat.clone(),
        object_path: "a.png".to_string(),
        status: SagaStatus::Committed,
    };
    let rendered = format_receipt_output(&receipt, true).expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
    assert_eq!(parsed["status"], "committed");
    assert_eq!(parsed["pair"]["text_content"], "a cat");

    let listing = PairListing::from(Vec::new());
    let parsed: serde_json::Value =
        serde_json::from_str(&format_listing_output(&listing, true).expect("json"))
            .expect("valid json");
    assert_eq!(parsed["empty"], true);
    assert_eq!(parsed["message"], "No images found");

    let parsed: serde_json::Value =
        serde_json::from_str(&format_pairs_output(&[cat], true).expect("json"))
            .expect("valid json");
    assert_eq!(parsed[0]["image_url"], "https://x.co/a.png");
}

#[test]
fn api_url_appends_segments_to_existing_base_path() {
    let url = api_url(
        &format!("http://127.0.0.1:{}/base", DEFAULT_PORT),
        &["api", "pairs", "by-text"],
    )
    .expect("api_url should build");
    assert_eq!(
        url.as_str(),
        &format!("http://127.0.0.1:{}/base/api/pairs/by-text", DEFAULT_PORT)
    );
    assert!(api_url("not a url", &["api"]).is_err());
}

#[test]
fn cli_parses_upload_and_lookup_subcommands() {
    let cli = Cli::try_parse_from([
        "pairs",
        "upload",
        "cat.png",
        "a cat",
        "--idempotency-key",
        "req-1",
    ])
    .expect("upload should parse");
    match cli.command {
        Commands::Upload {
            file,
            text,
            idempotency_key,
        } => {
            assert_eq!(file.to_str(), Some("cat.png"));
            assert_eq!(text, "a cat");
            assert_eq!(idempotency_key.as_deref(), Some("req-1"));
        }
        _ => panic!("expected upload command"),
    }

    let cli = Cli::try_parse_from(["pairs", "find-image", "A Cat", "--mode", "exact", "--json"])
        .expect("find-image should parse");
    assert!(cli.json);
    match cli.command {
        Commands::FindImage { text, mode } => {
            assert_eq!(text, "A Cat");
            assert_eq!(mode, Some(MatchMode::Exact));
        }
        _ => panic!("expected find-image command"),
    }

    assert!(Cli::try_parse_from(["pairs", "find-image", "x", "--mode", "fuzzy"]).is_err());
    assert!(matches!(
        Cli::try_parse_from(["pairs", "find-text", "cat.png"])
            .expect("find-text should parse")
            .command,
        Commands::FindText { name } if name == "cat.png"
    ));
}

#[test]
fn resolve_server_treats_blank_explicit_override_as_absent() {
    assert_eq!(resolve_server(Some("   ".to_string())), DEFAULT_CLI_SERVER_URL);
    assert_eq!(
        resolve_server(Some(" http://127.0.0.1:45556 ".to_string())),
        "http://127.0.0.1:45556"
    );
}

#[test]
fn pairs_server_env_value_beats_default() {
    let _lock = env_lock().lock().expect("env lock");
    let _server = EnvGuard::set("PAIRS_SERVER", "http://127.0.0.1:47777");
    let cli = Cli::parse_from(["pairs", "list"]);
    assert_eq!(resolve_server(cli.server), "http://127.0.0.1:47777");
}

#[test]
fn read_image_file_guesses_mime_and_rejects_empty_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cat.png");
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(&[0x89, b'P', b'N', b'G']).expect("write");
    drop(file);

    let image = read_image_file(&path).expect("readable image");
    assert_eq!(image.file_name, "cat.png");
    assert_eq!(image.mime, "image/png");
    assert_eq!(image.bytes.len(), 4);

    let empty = dir.path().join("empty.jpg");
    std::fs::File::create(&empty).expect("create");
    assert!(read_image_file(&empty).expect_err("empty").contains("is empty"));
    assert!(read_image_file(&dir.path().join("missing.png")).is_err());
}
