use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::entry::CorpusScope;
use crate::IndexError;

/// Compression codec options for stored entries.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression (useful for debugging).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for initializing the corpus index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of consecutive signature values hashed into one LSH band.
    pub band_width: usize,
    /// Partitioning of the corpus for candidate lookup.
    pub scope: CorpusScope,
    pub compression: CompressionConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            band_width: 4,
            scope: CorpusScope::default(),
            compression: CompressionConfig::default(),
        }
    }
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_band_width(mut self, band_width: usize) -> Self {
        self.band_width = band_width;
        self
    }

    pub fn with_scope(mut self, scope: CorpusScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.band_width == 0 {
            return Err(IndexError::InvalidConfig(
                "band_width must be >= 1".to_string(),
            ));
        }
        if self.compression.codec == CompressionCodec::Zstd
            && !(1..=22).contains(&self.compression.level)
        {
            return Err(IndexError::InvalidConfig(format!(
                "zstd level must be within 1..=22 (got {})",
                self.compression.level
            )));
        }
        Ok(())
    }
}
