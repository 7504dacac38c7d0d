//! Object key layout.
//!
//! ```text
//! uploads/{userId}/{uuid}-{filename}     source videos uploaded by the browser
//! projects/{userId}/{projectId}/...      everything produced for a project
//! ```

use hookcut_models::UserId;

use crate::error::{StorageError, StorageResult};

pub const UPLOADS_PREFIX: &str = "uploads";

const MAX_FILENAME_LEN: usize = 120;

/// Key for a fresh browser upload.
pub fn upload_key(user_id: &UserId, filename: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        UPLOADS_PREFIX,
        user_id,
        uuid::Uuid::new_v4(),
        sanitize_filename(filename)
    )
}

/// True if `key` is an upload owned by `user_id`.
pub fn is_user_upload(user_id: &UserId, key: &str) -> bool {
    let prefix = format!("{}/{}/", UPLOADS_PREFIX, user_id);
    key.starts_with(&prefix) && key.len() > prefix.len() && !key.contains("..")
}

/// Reduce a client-supplied filename to `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_FILENAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Reject keys that could escape their prefix.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_key_layout() {
        let user = UserId::from("u1");
        let key = upload_key(&user, "My Episode #12.mp4");
        assert!(key.starts_with("uploads/u1/"));
        assert!(key.ends_with("-My_Episode__12.mp4"));
        assert!(is_user_upload(&user, &key));
        assert!(!is_user_upload(&UserId::from("u2"), &key));
    }

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\videos\\ep.mov"), "ep.mov");
        assert_eq!(sanitize_filename("..."), "video");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/u1/a.mp4").is_ok());
        assert!(validate_key("uploads/../secrets").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("").is_err());
    }
}
