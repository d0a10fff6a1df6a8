//! Common utilities for the file intake path.

use axum::extract::Multipart;

use docsmith_core::AppError;

/// Extract the uploaded file and requested target format from a multipart
/// form. Exactly one field named `file` is accepted; the target comes from a
/// text field named `target_format` (or its legacy alias `action`).
pub async fn extract_conversion_request(
    mut multipart: Multipart,
) -> Result<(Vec<u8>, String, String), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut target_format: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file_data.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                filename = field.file_name().map(|s: &str| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                file_data = Some(data.to_vec());
            }
            "target_format" | "action" => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read target_format: {}", e))
                })?;
                target_format = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or(AppError::EmptyUpload)?;
    if file_data.is_empty() {
        return Err(AppError::EmptyUpload);
    }
    let filename = filename.filter(|name| !name.is_empty()).ok_or(AppError::EmptyUpload)?;
    let target_format = target_format
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing 'target_format' field".to_string()))?;

    Ok((file_data, filename, target_format))
}

/// Validate the payload against the configured upload cap.
pub fn validate_file_size(size: usize, max: usize) -> Result<(), AppError> {
    if size > max {
        return Err(AppError::PayloadTooLarge { size, max });
    }
    Ok(())
}

/// Validate the filename extension against the intake allow-list, returning
/// the lowercased extension.
pub fn validate_file_extension(filename: &str, allowed: &[String]) -> Result<String, AppError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if extension.is_empty() || !allowed.contains(&extension) {
        return Err(AppError::InvalidFileType {
            extension,
            allowed: allowed.to_vec(),
        });
    }
    Ok(extension)
}

/// Reduce an untrusted client filename to a safe display name: path
/// components stripped, anything outside `[A-Za-z0-9._-]` replaced.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.').to_string();
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\evil.pdf"), "evil.pdf");
        assert_eq!(sanitize_filename("report final.pdf"), "report_final.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename("données.tex"), "donn_es.tex");
    }

    #[test]
    fn extension_allow_list_is_enforced() {
        let allowed: Vec<String> = ["pdf", "doc", "docx", "tex", "jpg", "jpeg", "png"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(validate_file_extension("a.pdf", &allowed).unwrap(), "pdf");
        assert_eq!(validate_file_extension("A.PDF", &allowed).unwrap(), "pdf");
        assert!(validate_file_extension("run.exe", &allowed).is_err());
        assert!(validate_file_extension("noext", &allowed).is_err());
        // last extension wins, matching how files open on disk
        assert_eq!(
            validate_file_extension("archive.pdf.tex", &allowed).unwrap(),
            "tex"
        );
    }

    #[test]
    fn size_cap_is_exclusive_above_max() {
        assert!(validate_file_size(16 * 1024 * 1024, 16 * 1024 * 1024).is_ok());
        assert!(validate_file_size(16 * 1024 * 1024 + 1, 16 * 1024 * 1024).is_err());
    }
}
