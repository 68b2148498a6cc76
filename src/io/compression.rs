//! Compression filter chain: `transform(byte-buffer) -> byte-buffer` (spec
//! §1 "Compression filters (treated as transform(byte-buffer) ->
//! byte-buffer)", out of scope as a collaborator, but the dispatch layer
//! (spec §4.H step 2) still needs to drive one for the four codecs spec §6
//! recognizes by suffix).

use std::io::{Read, Write};

use crate::error::Result;

/// The four transparent-decompression suffixes spec §6 recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Codec {
    /// Detects a codec from a trailing filename suffix, returning the
    /// suffix-stripped remainder alongside it.
    pub fn from_suffix(name: &str) -> Option<(Codec, &str)> {
        if let Some(stem) = name.strip_suffix(".gz") {
            Some((Codec::Gzip, stem))
        } else if let Some(stem) = name.strip_suffix(".bz2") {
            Some((Codec::Bzip2, stem))
        } else if let Some(stem) = name.strip_suffix(".xz") {
            Some((Codec::Xz, stem))
        } else if let Some(stem) = name.strip_suffix(".zst") {
            Some((Codec::Zstd, stem))
        } else {
            None
        }
    }

    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Codec::Gzip => {
                flate2::read::GzDecoder::new(input).read_to_end(&mut out)?;
            }
            Codec::Bzip2 => {
                bzip2::read::BzDecoder::new(input).read_to_end(&mut out)?;
            }
            Codec::Xz => {
                xz2::read::XzDecoder::new(input).read_to_end(&mut out)?;
            }
            Codec::Zstd => {
                out = zstd::stream::decode_all(input)?;
            }
        }
        Ok(out)
    }

    /// The write-side counterpart of `decompress`, used to post-process a
    /// freshly-written file before it is renamed into place (spec §4.H
    /// write path: "write, postWrite, post-process (compression filter),
    /// rename into place").
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Codec::Gzip => {
                let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(input)?;
                out = enc.finish()?;
            }
            Codec::Bzip2 => {
                let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(input)?;
                out = enc.finish()?;
            }
            Codec::Xz => {
                let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
                enc.write_all(input)?;
                out = enc.finish()?;
            }
            Codec::Zstd => {
                out = zstd::stream::encode_all(input, 0)?;
            }
        }
        Ok(out)
    }
}

/// Acquires bytes from a local path, transparently decompressing a
/// recognized trailing codec suffix (spec §4.H step 2, §6). Returns the
/// decompressed bytes and the format-resolution suffix stripped of any
/// compression extension.
pub fn read_bytes(path: &str) -> Result<(Vec<u8>, String)> {
    let raw = std::fs::read(path)?;
    match Codec::from_suffix(path) {
        Some((codec, stem)) => Ok((codec.decompress(&raw)?, stem.to_string())),
        None => Ok((raw, path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_suffixes() {
        assert_eq!(Codec::from_suffix("a.nc.gz").unwrap().1, "a.nc");
        assert_eq!(Codec::from_suffix("a.nc.bz2").unwrap().0, Codec::Bzip2);
        assert_eq!(Codec::from_suffix("a.nc.xz").unwrap().0, Codec::Xz);
        assert_eq!(Codec::from_suffix("a.nc.zst").unwrap().0, Codec::Zstd);
        assert!(Codec::from_suffix("a.nc").is_none());
    }

    #[test]
    fn gzip_round_trip() {
        use std::io::Write;
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"hello rapio").unwrap();
        let compressed = enc.finish().unwrap();
        let out = Codec::Gzip.decompress(&compressed).unwrap();
        assert_eq!(out, b"hello rapio");
    }
}
