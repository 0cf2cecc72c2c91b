//! In-memory gzip handling for downloaded source files

use crate::error::{CommonError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

/// Suffix marking a gzip-compressed file
pub const GZIP_SUFFIX: &str = ".gz";

/// Split a filename into its inner name and whether it was gzip-compressed
///
/// `data.csv.gz` -> (`data.csv`, true), `data.csv` -> (`data.csv`, false)
pub fn strip_gzip_suffix(filename: &str) -> (&str, bool) {
    match filename.strip_suffix(GZIP_SUFFIX) {
        Some(inner) => (inner, true),
        None => (filename, false),
    }
}

/// Decompress gzip data fully into memory
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CommonError::Decompression(e.to_string()))?;

    debug!(
        compressed = data.len(),
        decompressed = decompressed.len(),
        "Decompressed gzip data"
    );

    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
