//! Document and portfolio upload handlers.
//!
//! Multipart uploads land on local disk under the configured upload
//! directory; the session records which document and portfolio a later
//! analysis call should use.

use axum::extract::{Multipart, State};
use axum::response::Json;
use serde::Serialize;

use crate::AppState;
use crate::portfolio::{PortfolioKind, PortfolioSelection, seed_portfolio_files};
use crate::session::UploadedDocument;

use super::ApiError;

/// Extensions accepted for uploaded documents and portfolios.
const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "doc", "docx", "csv", "xml"];

/// Sentinel portfolio value meaning "user will upload their own file".
const PERSONAL_PORTFOLIO: &str = "personal-portfolio";

/// Response for the upload endpoints.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    pub message: String,
}

/// One multipart request, flattened.
#[derive(Debug, Default)]
struct UploadForm {
    session_id: Option<String>,
    portfolio: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {e}")))?
    {
        match field.name() {
            Some("session_id") => {
                form.session_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid session_id: {e}")))?,
                );
            }
            Some("portfolio") => {
                form.portfolio = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid portfolio: {e}")))?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                if !filename.is_empty() {
                    form.file = Some((filename, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Whether the filename carries an allowed extension.
fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Path separators are stripped, spaces become underscores, and anything
/// outside `[A-Za-z0-9._-]` is dropped. An empty result falls back to a
/// UUID-based name so the upload never collides with path traversal.
fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = basename
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        format!("file_{}", uuid::Uuid::new_v4())
    } else {
        cleaned
    }
}

/// POST /api/upload - Upload a financial document and/or select a portfolio.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(&mut multipart).await?;

    if form.file.is_none() && form.portfolio.is_none() {
        return Err(ApiError::bad_request(
            "No file selected and no portfolio specified",
        ));
    }

    let session = match &form.session_id {
        Some(id) if !id.is_empty() => state.sessions.get_or_create(id),
        _ => state.sessions.create(),
    };

    // Portfolio selection
    if let Some(portfolio) = &form.portfolio {
        if portfolio == PERSONAL_PORTFOLIO {
            // The actual file arrives through /api/upload_portfolio.
        } else {
            let kind: PortfolioKind = portfolio
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Portfolio {portfolio} not available")))?;

            let dir = &state.config.storage.portfolio_dir;
            if !kind.csv_path(dir).exists() {
                seed_portfolio_files(dir).map_err(|e| {
                    ApiError::internal(format!("Failed to create portfolio files: {e}"))
                })?;
            }

            session.set_portfolio(PortfolioSelection::Predefined(kind));
        }
    }

    // Document upload
    if let Some((original_name, data)) = form.file {
        if !allowed_file(&original_name) {
            return Err(ApiError::bad_request(format!(
                "Invalid file type. Please upload: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let filename = sanitize_filename(&original_name);
        let local_path = state.config.storage.upload_dir.join(&filename);

        tokio::fs::write(&local_path, &data)
            .await
            .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))?;

        tracing::info!(
            name: "upload.document.saved",
            session_id = %session.id(),
            filename = %filename,
            bytes = data.len(),
            "Financial document uploaded"
        );

        session.set_document(UploadedDocument {
            path: local_path,
            filename: filename.clone(),
        });

        return Ok(Json(UploadResponse {
            success: true,
            session_id: session.id().to_string(),
            filename: Some(filename),
            portfolio: form.portfolio,
            message: "File uploaded successfully! Ready for portfolio impact analysis.".into(),
        }));
    }

    // Only a portfolio was selected (no document yet)
    let portfolio = form.portfolio.unwrap_or_default();
    Ok(Json(UploadResponse {
        success: true,
        session_id: session.id().to_string(),
        filename: None,
        portfolio: Some(portfolio.clone()),
        message: format!(
            "{} portfolio selected. Please upload a document to analyze.",
            portfolio.to_uppercase()
        ),
    }))
}

/// POST /api/upload_portfolio - Upload a personal portfolio file.
pub async fn upload_portfolio_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(&mut multipart).await?;

    let Some((original_name, data)) = form.file else {
        return Err(ApiError::bad_request("No portfolio file selected"));
    };

    if !allowed_file(&original_name) {
        return Err(ApiError::bad_request(
            "Invalid portfolio file type. Please upload CSV, PDF, or TXT",
        ));
    }

    let session = match &form.session_id {
        Some(id) if !id.is_empty() => state.sessions.get_or_create(id),
        _ => state.sessions.create(),
    };

    let filename = sanitize_filename(&original_name);
    let portfolio_path = state
        .config
        .storage
        .upload_dir
        .join(format!("portfolio_{filename}"));

    tokio::fs::write(&portfolio_path, &data)
        .await
        .map_err(|e| ApiError::internal(format!("Portfolio upload failed: {e}")))?;

    tracing::info!(
        name: "upload.portfolio.saved",
        session_id = %session.id(),
        filename = %filename,
        "Personal portfolio uploaded"
    );

    session.set_portfolio(PortfolioSelection::Personal {
        path: portfolio_path,
        filename: filename.clone(),
    });

    Ok(Json(UploadResponse {
        success: true,
        session_id: session.id().to_string(),
        filename: Some(filename),
        portfolio: Some(PERSONAL_PORTFOLIO.to_string()),
        message: "Personal portfolio uploaded successfully!".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("report.pdf"));
        assert!(allowed_file("report.XML"));
        assert!(allowed_file("portfolio.csv"));
        assert!(!allowed_file("script.exe"));
        assert!(!allowed_file("noextension"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("my report.pdf"), "my_report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\doc.xml"), "doc.xml");
        assert_eq!(sanitize_filename("résumé.txt"), "rsum.txt");
        assert!(sanitize_filename("..").starts_with("file_"));
    }
}
