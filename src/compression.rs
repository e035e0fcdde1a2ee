use flate2::{read::GzDecoder, read::ZlibDecoder, write::GzEncoder, write::ZlibEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{Read, Result as IoResult, Write};

#[cfg(feature = "zstd")]
use zstd::stream::{Decoder as ZstdDecoder, Encoder as ZstdEncoder};

/// Outbound frame compressor.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> IoResult<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> IoResult<Vec<u8>>;

    /// Value sent in the `compression` handshake header.
    fn encoding(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    #[default]
    Gzip,
    Zlib,
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Compressor for CompressionMethod {
    fn compress(&self, data: &[u8]) -> IoResult<Vec<u8>> {
        match self {
            CompressionMethod::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            CompressionMethod::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            #[cfg(feature = "zstd")]
            CompressionMethod::Zstd => {
                let mut encoder = ZstdEncoder::new(Vec::new(), 0)?;
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }

    fn decompress(&self, data: &[u8]) -> IoResult<Vec<u8>> {
        let mut decoded_data = Vec::new();
        match self {
            CompressionMethod::Gzip => {
                GzDecoder::new(data).read_to_end(&mut decoded_data)?;
            }
            CompressionMethod::Zlib => {
                ZlibDecoder::new(data).read_to_end(&mut decoded_data)?;
            }
            #[cfg(feature = "zstd")]
            CompressionMethod::Zstd => {
                ZstdDecoder::new(data)?.read_to_end(&mut decoded_data)?;
            }
        }
        Ok(decoded_data)
    }

    fn encoding(&self) -> &'static str {
        match self {
            CompressionMethod::Gzip => "gzip",
            CompressionMethod::Zlib => "deflate",
            #[cfg(feature = "zstd")]
            CompressionMethod::Zstd => "zstd",
        }
    }
}
