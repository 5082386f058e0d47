use std::fs;
use std::path::PathBuf;

use crate::error::PortalError;
use crate::session::model::CachedSession;

/// Durable local tier. Reads and writes are synchronous so that start-up can
/// show the cached session before any network call.
pub trait SessionCache: Send + Sync {
    fn load(&self) -> Result<Option<CachedSession>, PortalError>;
    fn store(&self, session: &CachedSession) -> Result<(), PortalError>;
    fn clear(&self) -> Result<(), PortalError>;
}

/// JSON file in the portal data directory.
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionCache for FileSessionCache {
    fn load(&self) -> Result<Option<CachedSession>, PortalError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PortalError::Cache(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn store(&self, session: &CachedSession) -> Result<(), PortalError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PortalError::Cache(format!("mkdir {}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw)
            .map_err(|e| PortalError::Cache(format!("write {}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<(), PortalError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortalError::Cache(format!(
                "delete {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::Role;

    fn sample() -> CachedSession {
        CachedSession {
            email: "rh@atlas.ma".into(),
            name: "Atlas Agro".into(),
            role: Role::Employer,
            profile_complete: false,
        }
    }

    #[test]
    fn test_file_cache_store_load_clear_cycle() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = FileSessionCache::new(tmp.path().join("nested").join("session.json"));

        assert_eq!(cache.load().unwrap(), None);
        cache.store(&sample()).unwrap();
        assert_eq!(cache.load().unwrap(), Some(sample()));

        cache.clear().unwrap();
        assert_eq!(cache.load().unwrap(), None);
        // clearing twice is fine
        cache.clear().unwrap();
    }

    #[test]
    fn test_file_cache_ignores_blank_file() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(FileSessionCache::new(path).load().unwrap(), None);
    }

    #[test]
    fn test_file_cache_rejects_corrupt_file() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileSessionCache::new(path).load(),
            Err(PortalError::Parse(_))
        ));
    }
}
