//! Key file management
//!
//! PQ keypairs are stored as raw bytes in `<alg>-private.key` and
//! `<alg>-public.key`. ECDSA keys are a single line of hex.

use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::dilithium::{algorithm_for_public_key, DilithiumSecretKey};
use crate::ecdsa::EcdsaSecretKey;
use crate::error::{CryptoError, Result};
use crate::pq::PqAlgorithm;

/// Paths of a PQ keypair on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PqKeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl PqKeyFiles {
    /// Standard file names for `algorithm` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, algorithm: PqAlgorithm) -> Self {
        let dir = dir.as_ref();
        Self {
            private_key: dir.join(format!("{}-private.key", algorithm.name())),
            public_key: dir.join(format!("{}-public.key", algorithm.name())),
        }
    }
}

/// Writes a PQ keypair into `dir`, creating it if needed
pub fn save_pq_keypair(
    dir: impl AsRef<Path>,
    secret_key: &DilithiumSecretKey,
    public_key: &[u8],
) -> Result<PqKeyFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| CryptoError::key_file(dir, e))?;

    let files = PqKeyFiles::in_dir(dir, secret_key.algorithm());
    write_private(&files.private_key, secret_key.as_bytes())?;
    fs::write(&files.public_key, public_key).map_err(|e| CryptoError::key_file(&files.public_key, e))?;

    tracing::info!(
        algorithm = %secret_key.algorithm(),
        private_key = %files.private_key.display(),
        public_key = %files.public_key.display(),
        "Saved PQ keypair"
    );
    Ok(files)
}

/// Loads a PQ secret key; the algorithm is inferred from the key size
pub fn load_pq_secret_key(path: impl AsRef<Path>) -> Result<DilithiumSecretKey> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| CryptoError::key_file(path, e))?;
    DilithiumSecretKey::infer(bytes).map_err(|e| CryptoError::key_file(path, e))
}

/// Loads a raw PQ public key and identifies its algorithm
pub fn load_pq_public_key(path: impl AsRef<Path>) -> Result<(PqAlgorithm, Vec<u8>)> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| CryptoError::key_file(path, e))?;
    let algorithm = algorithm_for_public_key(&bytes).map_err(|e| CryptoError::key_file(path, e))?;
    Ok((algorithm, bytes))
}

/// Writes an ECDSA key as hex
pub fn save_ecdsa_key(path: impl AsRef<Path>, key: &EcdsaSecretKey) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CryptoError::key_file(parent, e))?;
    }
    let line = Zeroizing::new(format!("{}\n", key.to_hex().as_str()));
    write_private(path, line.as_bytes())
}

pub fn load_ecdsa_key(path: impl AsRef<Path>) -> Result<EcdsaSecretKey> {
    let path = path.as_ref();
    let text = Zeroizing::new(fs::read_to_string(path).map_err(|e| CryptoError::key_file(path, e))?);
    EcdsaSecretKey::from_hex(&text).map_err(|e| CryptoError::key_file(path, e))
}

/// Writes secret material, owner-only on unix
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| CryptoError::key_file(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| CryptoError::key_file(path, e))?;
    }
    Ok(())
}
