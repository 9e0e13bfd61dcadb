//! Per-column block compression. Backends other than `None` are behind the
//! `zstd` and `lz4` features; a file written with a backend this build lacks
//! fails to read with `CodecUnsupported`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Codec {
    #[default]
    None = 0,
    Zstd = 1,
    Lz4 = 2,
}

impl Codec {
    const ALL: [Codec; 3] = [Codec::None, Codec::Zstd, Codec::Lz4];

    /// Header tag byte.
    pub fn from_u8(v: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| *c as u8 == v)
            .ok_or_else(|| Error::CodecUnsupported(format!("tag {v}")))
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::CodecUnsupported(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Zstd => "zstd",
            Codec::Lz4 => "lz4",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn compress(codec: Codec, block: &[u8]) -> Result<Vec<u8>> {
    match codec {
        Codec::None => Ok(block.to_vec()),
        Codec::Zstd => zstd_block(block, true),
        Codec::Lz4 => lz4_block(block, true),
    }
}

pub fn decompress(codec: Codec, block: &[u8]) -> Result<Vec<u8>> {
    match codec {
        Codec::None => Ok(block.to_vec()),
        Codec::Zstd => zstd_block(block, false),
        Codec::Lz4 => lz4_block(block, false),
    }
}

#[cfg(feature = "zstd")]
fn zstd_block(block: &[u8], encode: bool) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let res = if encode {
        zstd::stream::copy_encode(block, &mut out, ZSTD_LEVEL)
    } else {
        zstd::stream::copy_decode(block, &mut out)
    };
    res.map_err(|e| Error::Codec(format!("zstd: {e}")))?;
    Ok(out)
}

#[cfg(not(feature = "zstd"))]
fn zstd_block(_block: &[u8], _encode: bool) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("zstd (feature disabled)".into()))
}

#[cfg(feature = "lz4")]
fn lz4_block(block: &[u8], encode: bool) -> Result<Vec<u8>> {
    if encode {
        return Ok(lz4_flex::compress_prepend_size(block));
    }
    lz4_flex::decompress_size_prepended(block).map_err(|e| Error::Codec(format!("lz4: {e}")))
}

#[cfg(not(feature = "lz4"))]
fn lz4_block(_block: &[u8], _encode: bool) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("lz4 (feature disabled)".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_passes_blocks_through() {
        let block = b"Lambdac_M".to_vec();
        let packed = compress(Codec::None, &block).unwrap();
        assert_eq!(decompress(Codec::None, &packed).unwrap(), block);
    }

    #[test]
    fn names_and_tags() {
        assert_eq!(Codec::from_name("LZ4").unwrap(), Codec::Lz4);
        assert_eq!(Codec::from_u8(1).unwrap(), Codec::Zstd);
        assert_eq!(Codec::Zstd.to_string(), "zstd");
        assert!(matches!(Codec::from_name("gzip"), Err(Error::CodecUnsupported(n)) if n == "gzip"));
        assert!(Codec::from_u8(9).is_err());
    }

    #[cfg(not(feature = "zstd"))]
    #[test]
    fn disabled_backend_is_unsupported() {
        assert!(matches!(
            compress(Codec::Zstd, b"x"),
            Err(Error::CodecUnsupported(_))
        ));
    }
}
