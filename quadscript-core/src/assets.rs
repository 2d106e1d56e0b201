//! Content archive access.
//!
//! The archive is an opaque byte-producing collaborator: a zip file whose
//! `script.lua` entry drives the frame and whose remaining entries are
//! binary assets fetched by name on demand. The file is reopened per
//! extraction; nothing is cached.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::error::Error;

/// Name of the required script entry.
pub const SCRIPT_ENTRY: &str = "script.lua";

/// Byte-producing collaborator named assets are pulled from.
pub trait AssetSource {
    /// Returns the raw bytes of the named entry.
    ///
    /// # Errors
    /// Fails when no content is loaded, the archive cannot be read, or
    /// the entry does not exist.
    fn extract(&self, name: &str) -> Result<Vec<u8>, Error>;
}

/// Zip-backed content archive addressed by path.
#[derive(Debug, Default)]
pub struct ContentArchive {
    path: Option<PathBuf>,
}

impl ContentArchive {
    /// An archive with no content.
    #[must_use]
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Points the archive at `path`; `None` clears it.
    pub fn set_path(&mut self, path: Option<&Path>) {
        self.path = path.map(Path::to_path_buf);
    }

    /// Whether an archive path is set.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.path.is_some()
    }

    /// Extracts the script entry.
    ///
    /// # Errors
    /// Same failure modes as [`AssetSource::extract`].
    pub fn extract_script(&self) -> Result<Vec<u8>, Error> {
        self.extract(SCRIPT_ENTRY)
    }
}

impl AssetSource for ContentArchive {
    fn extract(&self, name: &str) -> Result<Vec<u8>, Error> {
        let Some(path) = self.path.as_deref() else {
            return Err(Error::no_content());
        };

        let file = File::open(path).map_err(|err| Error::archive_unreadable(path, err))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|err| Error::archive_unreadable(path, err))?;
        let mut entry = archive
            .by_name(name)
            .map_err(|_| Error::entry_not_found(name))?;

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|err| Error::entry_unreadable(name, err))?;

        log::info!(
            "extracted '{name}' ({} bytes) from {}",
            data.len(),
            path.display()
        );
        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    /// Writes a zip with the given entries into `dir` and returns its path.
    pub(crate) fn write_archive(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("content.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, bytes) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn extracts_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(
            dir.path(),
            &[(SCRIPT_ENTRY, b"function update(t) end"), ("a.bin", b"\x01\x02")],
        );

        let mut archive = ContentArchive::new();
        archive.set_path(Some(&path));

        assert_eq!(
            archive.extract_script().unwrap(),
            b"function update(t) end"
        );
        assert_eq!(archive.extract("a.bin").unwrap(), vec![1, 2]);
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), &[("other.txt", b"x")]);

        let mut archive = ContentArchive::new();
        archive.set_path(Some(&path));

        assert!(matches!(
            archive.extract_script(),
            Err(Error::Asset(message)) if message.contains(SCRIPT_ENTRY)
        ));
    }

    #[test]
    fn no_content_is_an_error() {
        let archive = ContentArchive::new();
        assert!(archive.extract("anything").is_err());
        assert!(!archive.has_content());
    }

    #[test]
    fn clearing_the_path_drops_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), &[(SCRIPT_ENTRY, b"")]);

        let mut archive = ContentArchive::new();
        archive.set_path(Some(&path));
        assert!(archive.has_content());

        archive.set_path(None);
        assert!(!archive.has_content());
        assert!(archive.extract_script().is_err());
    }
}
