//! In-memory token backend that counts opens, generations and closes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keysmith_core::{
    Backends, ConfigStore, Key, KeyType, PasswordGetter, Provisioner, SharedToken, Token,
    TokenBackend, TokenError, TokenRegistry, TokenResult, PKCS11_TOKEN_TYPE,
};

#[derive(Debug, Clone)]
pub struct FakeKey {
    pub id: Vec<u8>,
    pub label: String,
    pub key_type: KeyType,
}

impl Key for FakeKey {
    fn id(&self) -> &[u8] {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key_type(&self) -> KeyType {
        self.key_type
    }

    fn public_key_pem(&self) -> TokenResult<String> {
        Ok(format!("FAKE PUBLIC KEY {}", self.label))
    }
}

/// State shared by every session the fake backend opens, standing in for the
/// persistent contents of a device.
#[derive(Debug, Default)]
pub struct FakeState {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub generated: Mutex<Vec<(String, KeyType, u32)>>,
    pub keys: Mutex<HashMap<String, FakeKey>>,
    pub fail_open: Mutex<Option<String>>,
    pub fail_lookup: Mutex<Option<String>>,
}

impl FakeState {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn generated(&self) -> Vec<(String, KeyType, u32)> {
        self.generated.lock().unwrap().clone()
    }

    pub fn insert_key(&self, key_name: &str, id: &[u8]) {
        self.keys.lock().unwrap().insert(
            key_name.to_string(),
            FakeKey {
                id: id.to_vec(),
                label: key_name.to_string(),
                key_type: KeyType::Rsa,
            },
        );
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<FakeState>,
}

impl TokenBackend for FakeBackend {
    fn open(
        &self,
        config: &Arc<ConfigStore>,
        token_name: &str,
        _prompt: Option<&dyn PasswordGetter>,
    ) -> TokenResult<SharedToken> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        config.get_token(token_name)?;
        if let Some(message) = self.state.fail_open.lock().unwrap().clone() {
            return Err(TokenError::Backend {
                token: token_name.to_string(),
                message,
            });
        }
        Ok(Arc::new(FakeToken {
            name: token_name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
pub struct FakeToken {
    name: String,
    state: Arc<FakeState>,
}

impl Token for FakeToken {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_key(&self, key_name: &str) -> TokenResult<Box<dyn Key>> {
        if let Some(message) = self.state.fail_lookup.lock().unwrap().clone() {
            return Err(TokenError::Backend {
                token: self.name.clone(),
                message,
            });
        }
        match self.state.keys.lock().unwrap().get(key_name) {
            Some(key) => Ok(Box::new(key.clone())),
            None => Err(TokenError::KeyNotFound {
                token: self.name.clone(),
                key: key_name.to_string(),
            }),
        }
    }

    fn generate(&self, key_name: &str, key_type: KeyType, bits: u32) -> TokenResult<Box<dyn Key>> {
        let mut generated = self.state.generated.lock().unwrap();
        generated.push((key_name.to_string(), key_type, bits));
        let key = FakeKey {
            id: vec![generated.len() as u8, 0xAB],
            label: key_name.to_string(),
            key_type,
        };
        self.state
            .keys
            .lock()
            .unwrap()
            .insert(key_name.to_string(), key.clone());
        Ok(Box::new(key))
    }

    fn close(&self) -> TokenResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub const CONFIG: &str = r#"
tokens:
  hsm:
    provider: /usr/lib/softhsm/libsofthsm2.so
  hsm2:
    type: pkcs11
  weird:
    type: quantum
keys:
  release:
    token: hsm
    label: release-2024
    id: "0a0b0c"
  orphan:
    label: nowhere
"#;

/// Provisioner over [`CONFIG`] with the fake registered as the hardware backend.
pub fn provisioner(backend: &FakeBackend) -> Provisioner {
    let config = Arc::new(ConfigStore::from_yaml(CONFIG));
    let backends = Backends::builtin().with(PKCS11_TOKEN_TYPE, backend.clone());
    Provisioner::new(config, TokenRegistry::new(backends, None))
}
