//! Where uploaded contribution sheets are kept.

use std::{
    fmt::Debug,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{Error, endpoints};

/// A store of uploaded sheet files, addressed by file name.
pub trait SheetStorage: Debug + Send + Sync {
    /// Store `bytes` under `name`, replacing any existing file.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), Error>;

    /// Remove the file called `name`.
    fn delete(&self, name: &str) -> Result<(), Error>;

    /// The URL at which members can download the file called `name`.
    fn url(&self, name: &str) -> String;
}

/// Keeps sheets in a directory on the local file system.
///
/// The directory is served under [endpoints::UPLOADS].
#[derive(Debug, Clone)]
pub struct LocalSheetStorage {
    root: PathBuf,
}

impl LocalSheetStorage {
    /// Use `root` for storing sheets, creating the directory if needed.
    ///
    /// # Errors
    /// Returns [Error::StorageError] if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();

        fs::create_dir_all(&root).map_err(|error| {
            Error::StorageError(format!("could not create {}: {error}", root.display()))
        })?;

        Ok(Self { root })
    }

    /// The directory the sheets are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, Error> {
        let is_plain_name = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\']);

        if is_plain_name {
            Ok(self.root.join(name))
        } else {
            Err(Error::StorageError(format!("\"{name}\" is not a valid file name")))
        }
    }
}

impl SheetStorage for LocalSheetStorage {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        let path = self.path_for(name)?;

        fs::write(&path, bytes)
            .map_err(|error| Error::StorageError(format!("could not write {name}: {error}")))
    }

    fn delete(&self, name: &str) -> Result<(), Error> {
        let path = self.path_for(name)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(Error::StorageError(format!("{name} does not exist")))
            }
            Err(error) => Err(Error::StorageError(format!(
                "could not remove {name}: {error}"
            ))),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{name}", endpoints::UPLOADS)
    }
}

#[cfg(test)]
pub(crate) mod test_storage {
    use std::env;

    use uuid::Uuid;

    use super::LocalSheetStorage;

    /// A storage rooted in a fresh directory under the system temp directory.
    pub fn must_create_temp_storage() -> LocalSheetStorage {
        let root = env::temp_dir().join(format!("savings-club-sheets-{}", Uuid::new_v4()));

        LocalSheetStorage::new(root).expect("could not create temp storage")
    }
}
