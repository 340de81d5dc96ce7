//! Administrator list and authorization policy.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading the administrator list.
#[derive(Debug, Error)]
pub enum AdminsError {
    #[error("Failed to read admins file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse admins file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Admin id must be positive, got {0}")]
    InvalidId(i64),
}

/// Decides who may run privileged commands.
pub trait AuthorizationPolicy: Send + Sync {
    /// Returns `true` if `identity` is an administrator.
    fn is_admin(&self, identity: i64) -> bool;
}

/// On-disk format of the administrators file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminsFile {
    /// Platform user ids with administrator rights.
    #[serde(default)]
    pub admins: Vec<i64>,
}

impl AdminsFile {
    /// Loads the file, treating a missing file as an empty list.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AdminsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let file: Self = serde_json::from_str(&content)?;
        file.validate()?;
        Ok(file)
    }

    /// Saves the file as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), AdminsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Rejects non-positive ids; platform user ids are always positive.
    pub fn validate(&self) -> Result<(), AdminsError> {
        match self.admins.iter().find(|&&id| id <= 0) {
            Some(&id) => Err(AdminsError::InvalidId(id)),
            None => Ok(()),
        }
    }

    /// Creates an example file.
    #[must_use]
    pub fn example() -> Self {
        Self {
            admins: vec![123_456_789],
        }
    }
}

/// Administrator set backed by a JSON file plus fixed ids from the
/// environment. The file part can be reloaded at runtime.
#[derive(Debug)]
pub struct AdminList {
    /// File to reload from, if any.
    path: Option<PathBuf>,

    /// Ids that always stay administrators (from `ADMIN_IDS`).
    fixed: BTreeSet<i64>,

    /// Current effective set.
    current: RwLock<BTreeSet<i64>>,
}

impl AdminList {
    /// Creates a list from ids only, with nothing to reload.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let fixed: BTreeSet<i64> = ids.into_iter().collect();
        Self {
            path: None,
            current: RwLock::new(fixed.clone()),
            fixed,
        }
    }

    /// Loads the file at `path` and merges `fixed` ids into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(
        path: impl Into<PathBuf>,
        fixed: impl IntoIterator<Item = i64>,
    ) -> Result<Self, AdminsError> {
        let list = Self {
            path: Some(path.into()),
            ..Self::from_ids(fixed)
        };
        list.reload()?;
        Ok(list)
    }

    /// Re-reads the admins file. On error the previous set is kept.
    ///
    /// Returns the number of administrators now in effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn reload(&self) -> Result<usize, AdminsError> {
        let mut ids = self.fixed.clone();
        if let Some(path) = &self.path {
            ids.extend(AdminsFile::load_from_file(path)?.admins);
        }

        let count = ids.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = ids;
        info!("Administrator list loaded ({} admins)", count);
        Ok(count)
    }

    /// Returns the number of administrators currently in effect.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nobody has administrator rights.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuthorizationPolicy for AdminList {
    fn is_admin(&self, identity: i64) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&identity)
    }
}
