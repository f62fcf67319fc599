//! PDF text extraction.

use super::DriveError;

/// Extract the text layer of a PDF on the blocking thread pool.
pub async fn extract_text(file_name: &str, bytes: Vec<u8>) -> Result<String, DriveError> {
    let outcome =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(DriveError::Pdf {
            file: file_name.to_string(),
            message: err.to_string(),
        }),
        Err(join_error) => Err(DriveError::Pdf {
            file: file_name.to_string(),
            message: format!("extraction aborted: {join_error}"),
        }),
    }
}
