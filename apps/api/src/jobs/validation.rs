use bytes::Bytes;
use thiserror::Error;

use crate::storage::filename::{client_basename, extension, validate_flat_filename, FilenameError};

/// Accepted document kinds: extension and its canonical content type.
pub const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
];

/// Browsers fall back to this when they cannot tell the type.
const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// A file as received at the upload boundary.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A submission that passed validation and may be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub role: String,
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a Job Role name.")]
    EmptyRole,

    #[error("Job Role names must be a single line of plain text.")]
    RoleControlCharacter,

    #[error("Please upload a Job Description file.")]
    MissingFile,

    #[error("'{0}' is not a supported file type. Upload a PDF, DOCX or TXT file.")]
    UnsupportedType(String),

    #[error("'{file_name}' was sent as {content_type}, which does not match its extension.")]
    ContentTypeMismatch {
        file_name: String,
        content_type: String,
    },

    #[error("{0}")]
    FileName(#[from] FilenameError),
}

/// Checks a form submission. Role is checked before the file.
pub fn validate(role: &str, upload: Option<Upload>) -> Result<NewJob, ValidationError> {
    let role = role.trim();
    if role.is_empty() {
        return Err(ValidationError::EmptyRole);
    }
    // Roles end up inside admin labels, which browsers rewrite line breaks in.
    if role.chars().any(char::is_control) {
        return Err(ValidationError::RoleControlCharacter);
    }

    // An untouched file picker still posts a part, with no name and no bytes.
    let upload = match upload {
        Some(u) if !(u.file_name.trim().is_empty() && u.bytes.is_empty()) => u,
        _ => return Err(ValidationError::MissingFile),
    };

    let file_name = validate_flat_filename(client_basename(&upload.file_name))?.to_string();

    let ext = extension(&file_name).unwrap_or_default();
    let expected = ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| ValidationError::UnsupportedType(file_name.clone()))?;

    if let Some(declared) = upload.content_type.as_deref() {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence != GENERIC_CONTENT_TYPE && essence != expected {
            return Err(ValidationError::ContentTypeMismatch {
                file_name,
                content_type: declared.to_string(),
            });
        }
    }

    Ok(NewJob {
        role: role.to_string(),
        file_name,
        bytes: upload.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>, body: &'static [u8]) -> Option<Upload> {
        Some(Upload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(body),
        })
    }

    #[test]
    fn test_valid_pdf() {
        let job = validate(
            "API Developer",
            upload("spec.pdf", Some("application/pdf"), b"%PDF-1.4"),
        )
        .unwrap();
        assert_eq!(job.role, "API Developer");
        assert_eq!(job.file_name, "spec.pdf");
        assert_eq!(&job.bytes[..], b"%PDF-1.4");
    }

    #[test]
    fn test_role_is_trimmed() {
        let job = validate("  QA Lead \n", upload("qa.txt", None, b"x")).unwrap();
        assert_eq!(job.role, "QA Lead");
    }

    #[test]
    fn test_empty_role_rejected_first() {
        assert_eq!(validate("", None), Err(ValidationError::EmptyRole));
        assert_eq!(
            validate("   ", upload("spec.pdf", None, b"x")),
            Err(ValidationError::EmptyRole)
        );
    }

    #[test]
    fn test_role_with_line_break_rejected() {
        for role in ["Lead\nPlatform", "Lead\r\nPlatform", "Tab\there"] {
            assert_eq!(
                validate(role, upload("spec.pdf", None, b"x")),
                Err(ValidationError::RoleControlCharacter),
                "{role:?}"
            );
        }
    }

    #[test]
    fn test_missing_file() {
        assert_eq!(validate("Tester", None), Err(ValidationError::MissingFile));
        assert_eq!(
            validate("Tester", upload("", Some(GENERIC_CONTENT_TYPE), b"")),
            Err(ValidationError::MissingFile)
        );
    }

    #[test]
    fn test_empty_but_named_file_is_accepted() {
        assert!(validate("Tester", upload("blank.txt", Some("text/plain"), b"")).is_ok());
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(validate("Writer", upload("JD.DOCX", None, b"PK")).is_ok());
    }

    #[test]
    fn test_unsupported_extensions() {
        for name in ["payload.exe", "image.png", "README", "old.doc"] {
            assert_eq!(
                validate("Role", upload(name, None, b"x")),
                Err(ValidationError::UnsupportedType(name.to_string())),
                "{name}"
            );
        }
    }

    #[test]
    fn test_content_type_must_match_extension() {
        let err = validate("Role", upload("spec.pdf", Some("image/png"), b"x")).unwrap_err();
        assert!(matches!(err, ValidationError::ContentTypeMismatch { .. }));
    }

    #[test]
    fn test_generic_and_parameterised_content_types_pass() {
        assert!(validate("Role", upload("spec.pdf", Some(GENERIC_CONTENT_TYPE), b"x")).is_ok());
        assert!(validate("Role", upload("a.txt", Some("text/plain; charset=utf-8"), b"x")).is_ok());
    }

    #[test]
    fn test_client_path_is_reduced_to_basename() {
        let job = validate("Role", upload(r"C:\Users\me\spec.pdf", None, b"x")).unwrap();
        assert_eq!(job.file_name, "spec.pdf");
    }

    #[test]
    fn test_bad_file_name() {
        assert_eq!(
            validate("Role", upload("bad\r\n.pdf", None, b"x")),
            Err(ValidationError::FileName(FilenameError::ControlCharacter))
        );
    }

    #[test]
    fn test_messages_match_the_form() {
        assert_eq!(
            ValidationError::EmptyRole.to_string(),
            "Please enter a Job Role name."
        );
        assert_eq!(
            ValidationError::MissingFile.to_string(),
            "Please upload a Job Description file."
        );
    }
}
