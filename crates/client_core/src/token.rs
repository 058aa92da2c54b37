//! Bearer token lifecycle: one shared handle, pluggable persistence.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Persistence backend for the access token.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Keeps the token in a single file; the file is removed on clear.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Cloneable handle to the current access token. Reads are served from memory;
/// writes go through to the storage backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    cached: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn TokenStorage>) -> ClientResult<Self> {
        let cached = storage.load().map_err(token_io_error)?;
        debug!(present = cached.is_some(), "loaded access token");
        Ok(Self {
            storage,
            cached: Arc::new(RwLock::new(cached)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryTokenStorage::default()),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stores a new token. An empty token clears the stored one.
    pub fn set(&self, token: &str) -> ClientResult<()> {
        if token.trim().is_empty() {
            return self.clear();
        }
        self.storage.save(token).map_err(token_io_error)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        info!("access token stored");
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        self.storage.clear().map_err(token_io_error)?;
        self.cached
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("access token cleared");
        Ok(())
    }
}

fn token_io_error(err: io::Error) -> ClientError {
    ClientError::Token(err.to_string())
}
