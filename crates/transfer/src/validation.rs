use pcs_protocol::constants::{FORBIDDEN_PATH_CHARS, MAX_PATH_LEN};

use crate::TransferError;

/// Validates an absolute remote path before it is sent to the service.
///
/// Rejects:
/// - Paths not starting with `/`
/// - Paths longer than 1000 characters
/// - Any of `\ ? | " > < : *`
/// - Components that start or end with `.` or whitespace
pub fn validate_remote_path(path: &str) -> Result<(), TransferError> {
    if !path.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "path must be absolute: {path}"
        )));
    }

    if path.chars().count() > MAX_PATH_LEN {
        return Err(TransferError::InvalidPath(format!(
            "path longer than {MAX_PATH_LEN} characters"
        )));
    }

    if let Some(c) = path.chars().find(|c| FORBIDDEN_PATH_CHARS.contains(c)) {
        return Err(TransferError::InvalidPath(format!(
            "forbidden character {c:?} in {path}"
        )));
    }

    for component in path.split('/').filter(|c| !c.is_empty()) {
        let bad_edge = |c: char| c == '.' || c == '\0' || c.is_whitespace();
        let starts = component.chars().next().is_some_and(bad_edge);
        let ends = component.chars().next_back().is_some_and(bad_edge);
        if starts || ends {
            return Err(TransferError::InvalidPath(format!(
                "component {component:?} may not start or end with '.' or whitespace"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_remote_path("/apps/demo/file.txt").is_ok());
        assert!(validate_remote_path("/apps/demo/sub dir/a.b.c").is_ok());
        assert!(validate_remote_path("/").is_ok());
    }

    #[test]
    fn rejects_relative_path() {
        assert!(validate_remote_path("apps/demo").is_err());
        assert!(validate_remote_path("").is_err());
    }

    #[test]
    fn rejects_forbidden_chars() {
        for c in ['\\', '?', '|', '"', '>', '<', ':', '*'] {
            let path = format!("/apps/a{c}b");
            assert!(validate_remote_path(&path).is_err(), "{path}");
        }
    }

    #[test]
    fn rejects_dot_and_whitespace_edges() {
        assert!(validate_remote_path("/apps/.hidden").is_err());
        assert!(validate_remote_path("/apps/name.").is_err());
        assert!(validate_remote_path("/apps/../etc").is_err());
        assert!(validate_remote_path("/apps/ lead").is_err());
        assert!(validate_remote_path("/apps/trail /x").is_err());
        assert!(validate_remote_path("/apps/tab\t").is_err());
        assert!(validate_remote_path("/apps/\u{b}vt").is_err());
    }

    #[test]
    fn rejects_nul_edges() {
        assert!(validate_remote_path("/apps/\0lead").is_err());
        assert!(validate_remote_path("/apps/trail\0/x").is_err());
    }

    #[test]
    fn length_limit() {
        let ok = format!("/{}", "a".repeat(MAX_PATH_LEN - 1));
        assert!(validate_remote_path(&ok).is_ok());
        let long = format!("/{}", "a".repeat(MAX_PATH_LEN));
        assert!(validate_remote_path(&long).is_err());
    }
}
