//! Content type detection for catalog entries.

use anyhow::{Context, Result};
use std::path::Path;

use crate::utils::config::FALLBACK_MIME;

/// Resolve `(extension, mimetype)` for a file by sniffing its magic bytes.
///
/// When the content is recognized, its canonical extension is returned (dotted); otherwise the
/// path's own extension and [`FALLBACK_MIME`].
pub fn resolve(path: &Path) -> Result<(String, String)> {
    let kind = infer::get_from_path(path)
        .with_context(|| format!("sniff content type of {}", path.display()))?;
    Ok(match kind {
        Some(kind) => (format!(".{}", kind.extension()), kind.mime_type().to_string()),
        None => (
            crate::engine::tools::dotted_extension(path),
            FALLBACK_MIME.to_string(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::ARCHIVE_MIME;

    #[test]
    fn zip_magic_is_detected_regardless_of_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.bin");
        std::fs::write(&path, b"PK\x03\x04rest-of-local-header").unwrap();
        let (ext, mime) = resolve(&path).unwrap();
        assert_eq!(mime, ARCHIVE_MIME);
        assert_eq!(ext, ".zip");
    }

    #[test]
    fn unknown_content_falls_back_to_path_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.gb");
        std::fs::write(&path, [0x11u8; 64]).unwrap();
        let (ext, mime) = resolve(&path).unwrap();
        assert_eq!(mime, FALLBACK_MIME);
        assert_eq!(ext, ".gb");
    }
}
