//! Multipart form parsing for image uploads.

use crate::AppError;
use axum::extract::Multipart;

/// The uploaded image part.
#[derive(Debug, Default)]
pub(crate) struct FilePart {
    pub(crate) file_name: String,
    pub(crate) content_type: Option<String>,
    pub(crate) bytes: Vec<u8>,
}

/// Fields of an upload or check-image form; unknown fields are ignored.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) file: Option<FilePart>,
    pub(crate) text: Option<String>,
}

impl UploadForm {
    pub(crate) fn require_file(&mut self) -> Result<FilePart, AppError> {
        self.file
            .take()
            .filter(|file| !file.bytes.is_empty())
            .ok_or_else(|| AppError::Validation("An image file is required".to_string()))
    }
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(format!("Multipart error: {}", err.body_text())))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::Validation(format!("Read error: {}", err.body_text())))?
                    .to_vec();
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("text") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::Validation(format!("Read error: {}", err.body_text())))?;
                form.text = Some(text);
            }
            _ => {}
        }
    }
    Ok(form)
}
