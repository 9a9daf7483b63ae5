//! File reputation service.
//!
//! Files are never uploaded: the lookup input carries only a content hash,
//! computed locally by [`FileLookupInput::from_bytes`] or
//! [`FileLookupInput::from_path`].

use crate::core::{CallContext, Configuration, Response, Result};
use crate::dispatch::ApiClient;
use crate::services::intel::LookupOutput;
use crate::services::Service;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Service name and URL prefix.
pub const SERVICE_NAME: &str = "file-intel";

/// Hash algorithm identifying a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    /// SHA-256, the default.
    #[default]
    Sha256,
    /// MD5, for providers that only index legacy hashes.
    Md5,
}

impl HashType {
    /// Hashes an in-memory buffer, returning lowercase hex.
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => format!("{:x}", Sha256::digest(data)),
            Self::Md5 => format!("{:x}", Md5::digest(data)),
        }
    }

    /// Hashes everything a reader yields, streaming in 64 KiB chunks.
    pub fn digest_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<String> {
        let mut buffer = [0u8; 64 * 1024];
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let read = reader.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
            Self::Md5 => {
                let mut hasher = Md5::new();
                loop {
                    let read = reader.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Md5 => write!(f, "md5"),
        }
    }
}

/// Input of [`FileIntel::lookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLookupInput {
    /// Hex-encoded content hash.
    pub hash: String,

    /// Algorithm that produced `hash`.
    pub hash_type: HashType,

    /// Echo request parameters in the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Include the provider's raw response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// Reputation provider, e.g. `reversinglabs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl FileLookupInput {
    /// Creates an input from a precomputed hash.
    pub fn new(hash: impl Into<String>, hash_type: HashType) -> Self {
        Self {
            hash: hash.into(),
            hash_type,
            ..Self::default()
        }
    }

    /// Creates an input by hashing an in-memory buffer.
    pub fn from_bytes(data: &[u8], hash_type: HashType) -> Self {
        Self::new(hash_type.digest(data), hash_type)
    }

    /// Creates an input by hashing a file on disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or read.
    pub fn from_path(path: impl AsRef<Path>, hash_type: HashType) -> std::io::Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut reader = std::io::BufReader::new(file);
        let hash = hash_type.digest_reader(&mut reader)?;
        Ok(Self::new(hash, hash_type))
    }

    /// Sets the verbose flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Sets the raw flag.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Sets the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// File reputation client.
#[derive(Debug, Clone)]
pub struct FileIntel {
    client: ApiClient,
}

impl FileIntel {
    /// Creates the service with its own connection pool.
    pub fn new(config: Configuration) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(SERVICE_NAME, config)?,
        })
    }

    /// Creates the service sharing another client's pool.
    pub fn from_client(client: &ApiClient) -> Self {
        Self {
            client: client.for_service(SERVICE_NAME),
        }
    }

    /// Looks up the reputation of a file by hash.
    pub async fn lookup(
        &self,
        ctx: &CallContext,
        input: &FileLookupInput,
    ) -> Result<Response<LookupOutput>> {
        self.client.post(ctx, "v1/lookup", input).await
    }
}

impl Service for FileIntel {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
