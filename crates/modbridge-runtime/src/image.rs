//! Module image format and metadata reader.
//!
//! A module image (.bmod) is a binary container whose leading section
//! describes the types defined in the module. Discovery only ever reads
//! that section; the payload is never touched.
//!
//! ## Format
//!
//! ```text
//! +----------------------+
//! | Magic (4 bytes)      |  "BMI\x01" (version 1)
//! +----------------------+
//! | Metadata length      |  u32, little-endian
//! +----------------------+
//! | Metadata             |  JSON type table
//! +----------------------+
//! | Payload              |  opaque
//! +----------------------+
//! ```

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

/// Magic bytes for module images, the last byte is the format version.
pub const MAGIC: &[u8; 4] = b"BMI\x01";

/// Default file extension for module images.
pub const MODULE_EXTENSION: &str = "bmod";

/// Upper bound on the metadata section.
pub const MAX_METADATA_LEN: u32 = 16 * 1024 * 1024;

const HEADER_LEN: usize = 8;

/// Structural metadata embedded in a module image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Module name.
    pub name: String,

    /// Module version.
    #[serde(default)]
    pub version: Option<String>,

    /// Types defined in the module.
    #[serde(default)]
    pub types: Vec<TypeRecord>,
}

/// A type defined in a module, as described by its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Fully-qualified type name.
    pub full_name: String,

    /// Fully-qualified names of the interfaces the type implements.
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Key-value annotations attached to the type.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl TypeRecord {
    /// Create a type record with no interfaces or tags.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Default::default()
        }
    }

    /// Add an implemented interface.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the record names a type at all.
    pub fn is_resolvable(&self) -> bool {
        !self.full_name.trim().is_empty()
    }

    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

impl ModuleMetadata {
    /// Create metadata for a module with no types.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            types: Vec::new(),
        }
    }

    /// Add a type record.
    pub fn with_type(mut self, record: TypeRecord) -> Self {
        self.types.push(record);
        self
    }
}

/// Module image reader and writer.
pub struct ModuleImage;

impl ModuleImage {
    /// Read only the metadata section of a module image.
    ///
    /// The file handle is closed before this returns, whether or not the
    /// read succeeded.
    pub fn read_metadata(path: &Path) -> RuntimeResult<ModuleMetadata> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Read the metadata section from any reader positioned at the header.
    pub fn read_from<R: Read>(reader: &mut R) -> RuntimeResult<ModuleMetadata> {
        let mut header = [0u8; HEADER_LEN];
        read_exact_or_invalid(reader, &mut header, "header")?;

        let len = Self::check_header(&header)?;
        let mut metadata = vec![0u8; len as usize];
        read_exact_or_invalid(reader, &mut metadata, "metadata")?;

        Self::parse_metadata(&metadata)
    }

    /// Parse a complete module image held in memory.
    pub fn parse(bytes: &[u8]) -> RuntimeResult<ModuleMetadata> {
        if bytes.len() < HEADER_LEN {
            return Err(RuntimeError::InvalidImage(
                "File too small to be a module image".to_string(),
            ));
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        let len = Self::check_header(&header)? as usize;

        let metadata = bytes.get(HEADER_LEN..HEADER_LEN + len).ok_or_else(|| {
            RuntimeError::InvalidImage("Truncated metadata section".to_string())
        })?;

        Self::parse_metadata(metadata)
    }

    /// Validate the header and return the metadata length.
    fn check_header(header: &[u8; HEADER_LEN]) -> RuntimeResult<u32> {
        if header[0..3] != MAGIC[0..3] {
            return Err(RuntimeError::InvalidImage(
                "Missing module image magic".to_string(),
            ));
        }

        if header[3] != MAGIC[3] {
            return Err(RuntimeError::InvalidImage(format!(
                "Unsupported module image version: {}",
                header[3]
            )));
        }

        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_METADATA_LEN {
            return Err(RuntimeError::InvalidImage(format!(
                "Metadata section too large: {} bytes",
                len
            )));
        }

        Ok(len)
    }

    /// Parse the JSON metadata section.
    fn parse_metadata(bytes: &[u8]) -> RuntimeResult<ModuleMetadata> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| RuntimeError::InvalidImage(format!("Invalid UTF-8: {}", e)))?;

        serde_json::from_str(content)
            .map_err(|e| RuntimeError::InvalidImage(format!("Invalid metadata JSON: {}", e)))
    }

    /// Encode a module image from metadata and an opaque payload.
    pub fn encode(metadata: &ModuleMetadata, payload: &[u8]) -> RuntimeResult<Vec<u8>> {
        let json = serde_json::to_vec(metadata)?;
        let len = u32::try_from(json.len())
            .ok()
            .filter(|len| *len <= MAX_METADATA_LEN)
            .ok_or_else(|| {
                RuntimeError::InvalidImage(format!(
                    "Metadata section too large: {} bytes",
                    json.len()
                ))
            })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + json.len() + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&json);
        bytes.extend_from_slice(payload);
        Ok(bytes)
    }

    /// Write a module image to disk.
    pub fn write(path: &Path, metadata: &ModuleMetadata, payload: &[u8]) -> RuntimeResult<()> {
        let bytes = Self::encode(metadata, payload)?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

fn read_exact_or_invalid<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> RuntimeResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => RuntimeError::InvalidImage(format!("Truncated {}", what)),
        _ => RuntimeError::Io(e),
    })
}
