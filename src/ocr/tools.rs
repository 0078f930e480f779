//! External tool invocation helpers.

use std::process::{ExitStatus, Output};

use super::PdfError;

/// Poppler and Tesseract binaries the extractor shells out to.
pub const PDF_TOOLS: &[&str] = &[
    "pdfinfo",
    "pdftotext",
    "pdftoppm",
    "pdfseparate",
    "pdfunite",
    "tesseract",
];

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    std::process::Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Report availability of every external binary the crate can use.
pub fn check_tools() -> Vec<(String, bool)> {
    let mut tools: Vec<(String, bool)> = PDF_TOOLS
        .iter()
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect();
    tools.push((
        "chromium".to_string(),
        crate::scrapers::browser::find_chrome(None).is_some(),
    ));
    tools
}

/// Extract stdout on success, or map the failure to a `PdfError`.
pub(crate) fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, PdfError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PdfError::ToolFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(PdfError::Io(e)),
    }
}

/// Check command status, returning appropriate error on failure.
pub(crate) fn check_cmd_status(
    result: std::io::Result<ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), PdfError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(PdfError::ToolFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(PdfError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools_lists_everything() {
        let tools = check_tools();
        assert_eq!(tools.len(), PDF_TOOLS.len() + 1);
        assert!(tools.iter().any(|(name, _)| name == "chromium"));
    }

    #[test]
    fn test_missing_tool_maps_to_not_found() {
        let result = std::process::Command::new("definitely-not-a-poppler-tool").output();
        let err = handle_cmd_output(result, "definitely-not-a-poppler-tool", "failed").unwrap_err();
        assert!(matches!(err, PdfError::ToolNotFound(_)));
    }
}
