//! Keeping the bearer token around between runs.

use parking_lot::Mutex;
use serde_derive::{Deserialize, Serialize};
use std::{
    fmt::{self, Debug, Formatter},
    fs, io,
    path::{Path, PathBuf},
};

/// The fixed key the credential is persisted under.
pub const CREDENTIAL_KEY: &str = "auth_token";

/// An opaque bearer token issued by the server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new<S: Into<String>>(token: S) -> Self { Credential(token.into()) }

    pub fn secret(&self) -> &str { &self.0 }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Somewhere the [`Credential`] can be persisted.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, StoreError>;
    fn save(&self, credential: &Credential) -> Result<(), StoreError>;
    /// Forget the credential. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// A [`CredentialStore`] which only lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    pub fn with_credential(credential: Credential) -> Self {
        MemoryStore {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.slot.lock().take();
        Ok(())
    }
}

/// A [`CredentialStore`] backed by a single file, named [`CREDENTIAL_KEY`],
/// inside some state directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(state_dir: P) -> Self {
        FileStore {
            path: state_dir.as_ref().join(CREDENTIAL_KEY),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();

                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.error(e)),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        log::debug!("Saving the credential to \"{}\"", self.path.display());
        write_private(&self.path, credential.secret()).map_err(|e| self.error(e))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }
}

/// Only the owner may read or write the credential file.
#[cfg(unix)]
const FILE_PERMISSIONS: u32 = 0o600;

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::{
        fs::{OpenOptions, Permissions},
        io::Write,
        os::unix::fs::{OpenOptionsExt, PermissionsExt},
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_PERMISSIONS)
        .open(path)?;
    // the mode above only applies to newly created files
    file.set_permissions(Permissions::from_mode(FILE_PERMISSIONS))?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

/// Errors that may occur while persisting a [`Credential`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unable to access the credential file at \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
