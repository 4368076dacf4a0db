//! Persistent anonymous viewer id

use std::path::Path;

use tracing::debug;

use fadecast_core::models::ViewerId;

use crate::error::Result;

const MAX_LEN: usize = 64;

pub struct ViewerIdentity;

impl ViewerIdentity {
    /// Read the id stored at `path`, or generate and store a fresh one.
    ///
    /// A file that is empty or holds something unusable is overwritten.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<ViewerId> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let id = contents.trim();
                if !id.is_empty() && id.len() <= MAX_LEN && !id.contains(char::is_whitespace) {
                    return Ok(ViewerId::from(id));
                }
                debug!(path = %path.display(), "Stored viewer id unusable, regenerating");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let id = ViewerId::new();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, id.as_str())?;
        debug!(path = %path.display(), viewer_id = %id, "Created viewer id");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("viewer_id");

        let first = ViewerIdentity::load_or_create(&path).unwrap();
        let second = ViewerIdentity::load_or_create(&path).unwrap();
        assert_eq!(first, second);
        assert!(path.exists());
    }

    #[test]
    fn test_garbage_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer_id");
        std::fs::write(&path, "   \n").unwrap();

        let id = ViewerIdentity::load_or_create(&path).unwrap();
        assert!(!id.as_str().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), id.as_str());
    }
}
