//! Subprocess PQ signer
//!
//! Drives an external tool over its command-line protocol:
//!
//! ```text
//! generate-keypair <dir>                  -> last two lines: private path, public path
//! sign <private-key-file> <hash-hex>      -> last line: signature hex
//! verify <public-key-file> <hash-hex> <sig-hex> -> last line: true | false
//! ```
//!
//! Diagnostics may precede the result lines; only the tail is parsed.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tandem_core::{PqSigner, PqVerifier, SignerError, TxHash};

type SignerResult<T> = std::result::Result<T, SignerError>;

/// PQ signer backed by an external program
#[derive(Clone, Debug)]
pub struct CommandPqSigner {
    program: PathBuf,
    base_args: Vec<OsString>,
    key_dir: PathBuf,
}

impl CommandPqSigner {
    /// `key_dir` is where `generate-keypair` writes new keys
    pub fn new(program: impl Into<PathBuf>, key_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            key_dir: key_dir.into(),
        }
    }

    /// Arguments placed before every protocol command (e.g. a jar or subcommand)
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Verifies against a public key that is already on disk
    pub fn verify_with_key_file(
        &self,
        public_key_file: &Path,
        digest: &TxHash,
        signature: &[u8],
    ) -> SignerResult<bool> {
        let lines = self.run(&[
            "verify".into(),
            public_key_file.into(),
            digest.to_hex().into(),
            hex::encode(signature).into(),
        ])?;

        match last_line(&lines)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(SignerError::MalformedOutput(format!(
                "expected true or false, got {:?}",
                other
            ))),
        }
    }

    /// Runs one protocol command and returns the non-empty stdout lines
    fn run(&self, args: &[OsString]) -> SignerResult<Vec<String>> {
        let command = args.first().map(|a| a.to_string_lossy().into_owned()).unwrap_or_default();
        tracing::debug!(program = %self.program.display(), %command, "Invoking external PQ signer");

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()
            .map_err(|e| SignerError::Unavailable(format!("{}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(%command, status = %output.status, %stderr, "External PQ signer failed");
            return Err(SignerError::Failed(format!(
                "{} {} exited with {}: {}",
                self.program.display(),
                command,
                output.status,
                stderr
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| SignerError::MalformedOutput(e.to_string()))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

impl PqSigner for CommandPqSigner {
    type KeyHandle = PathBuf;

    /// The private handle is the key file path; the public key is read back
    /// from the file the tool reports.
    fn generate_keypair(&self) -> SignerResult<(PathBuf, Vec<u8>)> {
        let lines = self.run(&["generate-keypair".into(), self.key_dir.clone().into()])?;
        let [private_key, public_key] = match lines.as_slice() {
            [.., private_key, public_key] => [PathBuf::from(private_key), PathBuf::from(public_key)],
            _ => {
                return Err(SignerError::MalformedOutput(
                    "generate-keypair printed fewer than two lines".into(),
                ))
            }
        };

        let public_key_bytes = fs::read(&public_key)
            .map_err(|e| SignerError::MalformedOutput(format!("{}: {}", public_key.display(), e)))?;
        Ok((private_key, public_key_bytes))
    }

    fn sign(&self, key: &PathBuf, digest: &TxHash) -> SignerResult<Vec<u8>> {
        let lines = self.run(&["sign".into(), key.clone().into(), digest.to_hex().into()])?;
        let signature_hex = last_line(&lines)?;
        let signature_hex = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);

        hex::decode(signature_hex)
            .map_err(|e| SignerError::MalformedOutput(format!("signature is not hex: {}", e)))
    }
}

impl PqVerifier for CommandPqSigner {
    /// The protocol takes a key file, so the public key is staged in a
    /// temporary file for the duration of the call.
    fn verify(&self, public_key: &[u8], digest: &TxHash, signature: &[u8]) -> SignerResult<bool> {
        let mut staged = tempfile::NamedTempFile::new()
            .map_err(|e| SignerError::Failed(format!("staging public key: {}", e)))?;
        staged
            .write_all(public_key)
            .and_then(|_| staged.flush())
            .map_err(|e| SignerError::Failed(format!("staging public key: {}", e)))?;

        self.verify_with_key_file(staged.path(), digest, signature)
    }
}

fn last_line(lines: &[String]) -> SignerResult<&str> {
    lines
        .last()
        .map(String::as_str)
        .ok_or_else(|| SignerError::MalformedOutput("no output".into()))
}
