//! Shared integration-test server bootstrap helpers.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use pairstore_core::config::BackendKind;
use pairstore_server::{create_app, AppState, Config, PairStoreClient};

pub(crate) fn test_config() -> Config {
    Config {
        backend: BackendKind::Memory,
        port: 0,
        max_upload_size: 1024 * 1024,
        ..Config::default()
    }
}

pub(crate) fn test_server_for_state(state: AppState) -> TestServer {
    TestServer::new(create_app(state, false)).expect("server")
}

pub(crate) fn setup_test_server() -> TestServer {
    let state = AppState::new(test_config()).expect("memory backend state");
    test_server_for_state(state)
}

pub(crate) fn setup_test_server_with_client(client: PairStoreClient) -> TestServer {
    test_server_for_state(AppState::with_client(test_config(), client))
}

pub(crate) fn png_part(file_name: &str) -> Part {
    Part::bytes(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        .file_name(file_name)
        .mime_type("image/png")
}

pub(crate) fn upload_form(file_name: &str, text: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("text", text)
        .add_part("file", png_part(file_name))
}
