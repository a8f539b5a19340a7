//! Packages index parsing and container codec handling.
//!
//! A Packages index is a sequence of blank-line-delimited stanzas, each a
//! list of `Key: Value` fields describing one package. Index blobs arrive
//! either plain or wrapped in a gzip/xz container; detection goes by magic
//! bytes first, filename extension second.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Magic bytes of a gzip stream.
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
/// Magic bytes of an xz stream.
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// Errors raised while decoding or re-encoding an index blob.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The blob looked like a known container but its stream is corrupt.
    #[error("failed to decode {codec} stream: {source}")]
    Decode {
        /// Container format that failed to decode.
        codec: &'static str,
        /// The decoder's error.
        source: io::Error,
    },
}

/// Container format of an index blob.
///
/// Detection tries each known magic in order and falls back to the filename
/// extension, then to [`Codec::Plain`]. Compressing with the detected codec
/// mirrors the input's container on output; no up- or down-conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// gzip container (`1F 8B`).
    Gzip,
    /// xz container (`FD 37 7A 58 5A 00`).
    Xz,
    /// No container; raw stanza text.
    Plain,
}

impl Codec {
    /// Detect the container format of `data`.
    ///
    /// Magic bytes take precedence over the `filename` hint so that a
    /// mislabeled blob still decodes.
    pub fn detect(data: &[u8], filename: &str) -> Self {
        // Ordered (magic, codec) table; extension only as fallback.
        const MAGICS: &[(&[u8], Codec)] = &[(GZIP_MAGIC, Codec::Gzip), (XZ_MAGIC, Codec::Xz)];

        for (magic, codec) in MAGICS {
            if data.starts_with(magic) {
                return *codec;
            }
        }
        if filename.ends_with(".gz") {
            return Codec::Gzip;
        }
        if filename.ends_with(".xz") {
            return Codec::Xz;
        }
        Codec::Plain
    }

    /// Name of the codec, for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Xz => "xz",
            Codec::Plain => "plain",
        }
    }

    /// Decompress `data` according to this codec.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Decode`] if the compressed stream is corrupt.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        let mut out = Vec::new();
        match self {
            Codec::Gzip => {
                flate2::read::GzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|source| IndexError::Decode {
                        codec: self.as_str(),
                        source,
                    })?;
            }
            Codec::Xz => {
                xz2::read::XzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|source| IndexError::Decode {
                        codec: self.as_str(),
                        source,
                    })?;
            }
            Codec::Plain => out.extend_from_slice(data),
        }
        Ok(out)
    }

    /// Compress `data` into this codec's container.
    ///
    /// Gzip uses the fastest compression level; filtered indexes are small
    /// and re-fetched often, so encode speed wins over ratio.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] if the encoder fails.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self {
            Codec::Gzip => {
                let mut enc =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
                enc.write_all(data)?;
                Ok(enc.finish()?)
            }
            Codec::Xz => {
                let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
                enc.write_all(data)?;
                Ok(enc.finish()?)
            }
            Codec::Plain => Ok(data.to_vec()),
        }
    }
}

/// One parsed index stanza: a package name plus its scalar fields in
/// original order.
///
/// Continuation lines (leading whitespace) are structural parts of a raw
/// stanza and survive verbatim when stanzas are re-emitted by the filter;
/// they carry nothing the curation side needs, so scalar parsing skips them.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Package name (the stanza's `Package` field).
    pub name: String,
    fields: Vec<(String, String)>,
}

impl Entry {
    /// Look up a scalar field by exact key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed Packages index: insertion-ordered entries with O(1) name lookup.
#[derive(Debug, Default)]
pub struct PackageIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl PackageIndex {
    /// Decode and parse a raw index blob.
    ///
    /// Detects the container per [`Codec::detect`], decompresses, and parses
    /// stanzas. Invalid UTF-8 is replaced, never an error; a stanza without a
    /// `Package` field is dropped; a repeated name overwrites the earlier
    /// entry in place (indexes do not legitimately repeat names, but a
    /// malformed one must not abort the run).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Decode`] if the container stream is corrupt.
    pub fn parse(raw: &[u8], filename: &str) -> Result<Self, IndexError> {
        let body = Codec::detect(raw, filename).decompress(raw)?;
        let text = String::from_utf8_lossy(&body);
        Ok(Self::parse_text(&text))
    }

    fn parse_text(text: &str) -> Self {
        let mut index = Self::default();
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.is_empty() {
                index.flush(&mut fields);
            } else if line.starts_with(' ') || line.starts_with('\t') {
                // Continuation line; not a scalar field.
            } else if let Some((key, value)) = line.split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }
        index.flush(&mut fields);
        index
    }

    fn flush(&mut self, fields: &mut Vec<(String, String)>) {
        if fields.is_empty() {
            return;
        }
        let fields = std::mem::take(fields);
        let Some(name) = fields
            .iter()
            .find(|(k, _)| k == "Package")
            .map(|(_, v)| v.clone())
        else {
            return;
        };
        let entry = Entry {
            name: name.clone(),
            fields,
        };
        match self.by_name.get(&name) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.by_name.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Look up an entry by package name.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Whether the index contains an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Package: curl\n\
                          Section: net\n\
                          Depends: libcurl4 (>= 8.0), libc6\n\
                          Description: command line tool\n \
                          for transferring data with URLs\n\
                          \n\
                          Package: libc6\n\
                          Section: libs\n";

    #[test]
    fn test_parse_plain() {
        let index = PackageIndex::parse(SAMPLE.as_bytes(), "Packages").unwrap();
        assert_eq!(index.len(), 2);
        let curl = index.get("curl").unwrap();
        assert_eq!(curl.field("Section"), Some("net"));
        assert_eq!(curl.field("Depends"), Some("libcurl4 (>= 8.0), libc6"));
        // Continuation line is not a scalar field.
        assert_eq!(curl.field("Description"), Some("command line tool"));
        assert!(index.contains("libc6"));
    }

    #[test]
    fn test_parse_gzip_by_magic() {
        let compressed = Codec::Gzip.compress(SAMPLE.as_bytes()).unwrap();
        // No extension hint; magic bytes must carry detection.
        let index = PackageIndex::parse(&compressed, "Packages").unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_parse_xz_roundtrip() {
        let compressed = Codec::Xz.compress(SAMPLE.as_bytes()).unwrap();
        assert_eq!(Codec::detect(&compressed, ""), Codec::Xz);
        let index = PackageIndex::parse(&compressed, "Packages.xz").unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_detect_extension_fallback() {
        // Empty data has no magic; the filename hint decides.
        assert_eq!(Codec::detect(b"", "Packages.gz"), Codec::Gzip);
        assert_eq!(Codec::detect(b"", "Packages.xz"), Codec::Xz);
        assert_eq!(Codec::detect(b"", "Packages"), Codec::Plain);
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let result = PackageIndex::parse(&[0x1f, 0x8b, 0xff, 0xff], "Packages.gz");
        assert!(matches!(result, Err(IndexError::Decode { codec: "gzip", .. })));
    }

    #[test]
    fn test_nameless_stanza_dropped() {
        let text = "Section: net\nVersion: 1.0\n\nPackage: real\nSection: utils\n";
        let index = PackageIndex::parse(text.as_bytes(), "Packages").unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains("real"));
    }

    #[test]
    fn test_duplicate_name_overwrites() {
        let text = "Package: dup\nSection: old\n\nPackage: dup\nSection: new\n";
        let index = PackageIndex::parse(text.as_bytes(), "Packages").unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("dup").unwrap().field("Section"), Some("new"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut bytes = b"Package: weird\nDescription: ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\n");
        let index = PackageIndex::parse(&bytes, "Packages").unwrap();
        assert!(index.contains("weird"));
    }
}
