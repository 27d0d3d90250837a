//! Software token keeping keys as PKCS#8 PEM files in a directory.
//!
//! Each key lives in `<path>/<label>.pem` with mode 0600. A key is found by its
//! configured id when one is set, otherwise by label. Key ids are derived from
//! the public key (see [`compute_key_id`]).
//!
//! When the token config carries `pin_sha256`, opening the token requires the
//! matching PIN, taken from `pin` or asked through the prompt.

mod material;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::backend::TokenBackend;
use crate::config::{ConfigStore, KeyConfig};
use crate::error::{TokenError, TokenResult};
use crate::prompt::{login, PasswordGetter};
use crate::token::{compute_key_id, parse_key_id, Key, KeyType, SharedToken, Token};

use material::KeyMaterial;

pub use material::RSA_BITS_RANGE;

const KEY_FILE_EXTENSION: &str = "pem";

/// Hex SHA-256 of a PIN, as stored in `pin_sha256`.
pub fn pin_digest(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()).as_slice())
}

/// Backend for `type: file` tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackend;

impl TokenBackend for FileBackend {
    fn open(
        &self,
        config: &Arc<ConfigStore>,
        token_name: &str,
        prompt: Option<&dyn PasswordGetter>,
    ) -> TokenResult<SharedToken> {
        let token_config = config.get_token(token_name)?;
        let dir = token_config.path.clone().ok_or_else(|| TokenError::Config {
            message: format!("token \"{token_name}\" has no path configured"),
        })?;
        ensure_dir(&dir)?;

        if let Some(verifier) = token_config.pin_sha256.as_deref() {
            let expected = verifier.trim().to_ascii_lowercase();
            login(token_name, token_config.pin.as_deref(), prompt, |pin| {
                Ok(pin_digest(pin) == expected)
            })?;
        }

        debug!(token = token_name, path = %dir.display(), "opened file token");
        Ok(Arc::new(FileToken {
            name: token_name.to_string(),
            dir,
            config: Arc::clone(config),
            closed: AtomicBool::new(false),
        }))
    }
}

fn ensure_dir(dir: &Path) -> TokenResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| TokenError::io(dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| TokenError::io(dir, e))?;
    }
    Ok(())
}

/// Open file token session.
pub struct FileToken {
    name: String,
    dir: PathBuf,
    config: Arc<ConfigStore>,
    closed: AtomicBool,
}

impl fmt::Debug for FileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileToken")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl FileToken {
    fn ensure_open(&self) -> TokenResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TokenError::TokenClosed {
                token: self.name.clone(),
            });
        }
        Ok(())
    }

    fn key_path(&self, key: &KeyConfig) -> TokenResult<PathBuf> {
        let label = key.label.as_str();
        if label.is_empty() {
            return Err(TokenError::Config {
                message: format!("key \"{}\" has no label", key.name),
            });
        }
        if label.starts_with('.') || label.contains('/') || label.contains('\\') {
            return Err(TokenError::Config {
                message: format!("key \"{}\" has an invalid label: {label}", key.name),
            });
        }
        Ok(self.dir.join(format!("{label}.{KEY_FILE_EXTENSION}")))
    }

    fn load(&self, label: &str, path: &Path) -> TokenResult<FileKey> {
        let pem = fs::read_to_string(path).map_err(|e| TokenError::io(path, e))?;
        let material = KeyMaterial::from_pem(&pem).ok_or_else(|| {
            TokenError::backend(
                &self.name,
                format!("{} is not a supported PKCS#8 private key", path.display()),
            )
        })?;
        FileKey::new(&self.name, label, material)
    }

    fn find_by_id(&self, id: &[u8]) -> TokenResult<Option<FileKey>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| TokenError::io(&self.dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| TokenError::io(&self.dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(KEY_FILE_EXTENSION) {
                continue;
            }
            let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(label, &path) {
                Ok(key) if key.id == id => return Ok(Some(key)),
                Ok(_) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable key file"),
            }
        }
        Ok(None)
    }

    fn not_found(&self, key_name: &str) -> TokenError {
        TokenError::KeyNotFound {
            token: self.name.clone(),
            key: key_name.to_string(),
        }
    }
}

impl Token for FileToken {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_key(&self, key_name: &str) -> TokenResult<Box<dyn Key>> {
        self.ensure_open()?;
        let key_config = self.config.get_key(key_name)?;

        let found = if key_config.id.is_empty() {
            let path = self.key_path(&key_config)?;
            if path.is_file() {
                Some(self.load(&key_config.label, &path)?)
            } else {
                None
            }
        } else {
            let id = parse_key_id(&key_config.id).ok_or_else(|| TokenError::Config {
                message: format!("key \"{key_name}\" has an invalid id: {}", key_config.id),
            })?;
            self.find_by_id(&id)?
        };

        match found {
            Some(key) => Ok(Box::new(key)),
            None => Err(self.not_found(key_name)),
        }
    }

    fn generate(&self, key_name: &str, key_type: KeyType, bits: u32) -> TokenResult<Box<dyn Key>> {
        self.ensure_open()?;
        let mut key_config = self.config.get_key(key_name)?;
        let path = self.key_path(&key_config)?;

        let material = KeyMaterial::generate(&self.name, key_type, bits)?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                TokenError::KeyExists {
                    token: self.name.clone(),
                    key: key_config.label.clone(),
                }
            } else {
                TokenError::io(&path, e)
            }
        })?;
        if let Err(e) = material.write_pkcs8_pem(&self.name, &mut file) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        let key = FileKey::new(&self.name, &key_config.label, material)?;
        debug!(token = %self.name, path = %path.display(), "wrote key file");

        // Later lookups in this run may address the key by id.
        key_config.id = hex::encode(&key.id);
        self.config.put_key(key_config)?;

        Ok(Box::new(key))
    }

    fn close(&self) -> TokenResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Key loaded from or written to a file token.
pub struct FileKey {
    label: String,
    id: Vec<u8>,
    token: String,
    material: KeyMaterial,
}

impl FileKey {
    fn new(token: &str, label: &str, material: KeyMaterial) -> TokenResult<Self> {
        let der = material.public_key_der(token)?;
        Ok(Self {
            label: label.to_string(),
            id: compute_key_id(&der),
            token: token.to_string(),
            material,
        })
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKey")
            .field("label", &self.label)
            .field("id", &hex::encode(&self.id))
            .field("material", &self.material)
            .finish()
    }
}

impl Key for FileKey {
    fn id(&self) -> &[u8] {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key_type(&self) -> KeyType {
        self.material.key_type()
    }

    fn public_key_pem(&self) -> TokenResult<String> {
        self.material.public_key_pem(&self.token)
    }
}
