use log::{debug, info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use xz2::read::XzDecoder;

use crate::package::Manifest;
use crate::runtime::{Runtime, path::join_under_root};

use super::{ArchiveExtractor, ExtractError};

/// Permission bits kept from an entry header.
const MODE_MASK: u32 = 0o7777;

/// Extractor for .tar.xz archives
pub struct TarXzExtractor;

impl ArchiveExtractor for TarXzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.xz") || name.ends_with(".txz")
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        root: &Path,
    ) -> Result<Manifest, ExtractError> {
        if !self.can_handle(archive_path) {
            return Err(ExtractError::Unsupported(archive_path.to_path_buf()));
        }

        let tar_path = decompressed_path(archive_path);
        self.decompress(runtime, archive_path, &tar_path)?;
        let manifest = self.unpack(runtime, &tar_path, root)?;

        runtime
            .remove_file(&tar_path)
            .map_err(|error| ExtractError::Write {
                path: tar_path.clone(),
                error,
            })?;

        info!(
            "Extraction complete: {} file(s), {} new director(ies).",
            manifest.files.len(),
            manifest.directories.len()
        );
        Ok(manifest)
    }
}

impl TarXzExtractor {
    /// Decode `archive_path` into an uncompressed tar next to it.
    fn decompress<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        tar_path: &Path,
    ) -> Result<(), ExtractError> {
        debug!("Decompressing {:?} to {:?}...", archive_path, tar_path);
        let decompress_err = |error: anyhow::Error| ExtractError::Decompress {
            path: archive_path.to_path_buf(),
            error,
        };

        let reader = runtime.open(archive_path).map_err(decompress_err)?;
        let mut decoder = XzDecoder::new(reader);
        let mut writer = runtime
            .create_file(tar_path)
            .map_err(|error| ExtractError::Write {
                path: tar_path.to_path_buf(),
                error,
            })?;

        io::copy(&mut decoder, &mut writer).map_err(|e| decompress_err(e.into()))?;
        writer.flush().map_err(|e| ExtractError::Write {
            path: tar_path.to_path_buf(),
            error: e.into(),
        })?;
        Ok(())
    }

    fn unpack<R: Runtime>(
        &self,
        runtime: &R,
        tar_path: &Path,
        root: &Path,
    ) -> Result<Manifest, ExtractError> {
        debug!("Unpacking {:?} onto {:?}...", tar_path, root);
        let read_err = |source: io::Error| ExtractError::Read {
            path: tar_path.to_path_buf(),
            source,
        };

        let reader = runtime
            .open(tar_path)
            .map_err(|error| ExtractError::Decompress {
                path: tar_path.to_path_buf(),
                error,
            })?;
        let mut archive = Archive::new(reader);
        let mut manifest = Manifest::default();

        for entry in archive.entries().map_err(read_err)? {
            let mut entry = entry.map_err(read_err)?;
            let entry_type = entry.header().entry_type();

            if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
                continue;
            }

            let entry_path = entry.path().map_err(read_err)?.into_owned();
            let target = join_under_root(root, &entry_path).ok_or_else(|| {
                ExtractError::UnsafePath {
                    entry: entry_path.clone(),
                }
            })?;

            if entry_type.is_dir() {
                let mode = entry.header().mode().map_err(read_err)? & MODE_MASK;
                if create_missing_dirs(runtime, root, &target, &mut manifest)? {
                    set_mode(runtime, &target, mode)?;
                }
            } else if entry_type.is_file() {
                let mode = entry.header().mode().map_err(read_err)? & MODE_MASK;
                if let Some(parent) = target.parent() {
                    create_missing_dirs(runtime, root, parent, &mut manifest)?;
                }
                debug!("Installing {:?} ({:o})", target, mode);
                let mut writer =
                    runtime
                        .create_file(&target)
                        .map_err(|error| ExtractError::Write {
                            path: target.clone(),
                            error,
                        })?;
                io::copy(&mut entry, &mut writer).map_err(|e| ExtractError::Write {
                    path: target.clone(),
                    error: e.into(),
                })?;
                drop(writer);
                set_mode(runtime, &target, mode)?;
                manifest.add_file(target);
            } else {
                warn!(
                    "Unsupported entry type {:?} for {:?}, skipping",
                    entry_type, entry_path
                );
            }
        }

        Ok(manifest)
    }
}

/// `app.pkg.tar.xz` -> `app.pkg.tar`, `app.txz` -> `app.tar`
fn decompressed_path(archive_path: &Path) -> PathBuf {
    let name = archive_path.to_string_lossy().to_lowercase();
    if name.ends_with(".txz") {
        archive_path.with_extension("tar")
    } else {
        archive_path.with_extension("")
    }
}

/// Create `dir` and any missing ancestors, recording each one created
/// below `root`.
///
/// Returns whether `dir` itself had to be created.
fn create_missing_dirs<R: Runtime>(
    runtime: &R,
    root: &Path,
    dir: &Path,
    manifest: &mut Manifest,
) -> Result<bool, ExtractError> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(path) = current {
        if path.as_os_str().is_empty() || path == root || runtime.exists(path) {
            break;
        }
        missing.push(path.to_path_buf());
        current = path.parent();
    }

    if missing.is_empty() {
        return Ok(false);
    }

    runtime
        .create_dir_all(dir)
        .map_err(|error| ExtractError::Write {
            path: dir.to_path_buf(),
            error,
        })?;
    for path in missing.into_iter().rev() {
        manifest.add_directory(path);
    }
    Ok(true)
}

fn set_mode<R: Runtime>(runtime: &R, path: &Path, mode: u32) -> Result<(), ExtractError> {
    runtime
        .set_permissions(path, mode)
        .map_err(|error| ExtractError::Write {
            path: path.to_path_buf(),
            error,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs;
    use std::io::Write;
    use tar::{Builder, EntryType, Header};
    use tempfile::tempdir;
    use xz2::write::XzEncoder;

    enum Item<'a> {
        Dir(&'a str, u32),
        File(&'a str, &'a str, u32),
        Symlink(&'a str, &'a str),
        RawName(&'a [u8], &'a str),
    }

    fn create_tar_xz(path: &Path, items: &[Item]) {
        let mut builder = Builder::new(Vec::new());
        for item in items {
            let mut header = Header::new_gnu();
            match item {
                Item::Dir(name, mode) => {
                    header.set_entry_type(EntryType::Directory);
                    header.set_path(name).unwrap();
                    header.set_mode(*mode);
                    header.set_size(0);
                    header.set_cksum();
                    builder.append(&header, io::empty()).unwrap();
                }
                Item::File(name, content, mode) => {
                    header.set_path(name).unwrap();
                    header.set_mode(*mode);
                    header.set_size(content.len() as u64);
                    header.set_cksum();
                    builder.append(&header, content.as_bytes()).unwrap();
                }
                Item::Symlink(name, target) => {
                    header.set_entry_type(EntryType::Symlink);
                    header.set_path(name).unwrap();
                    header.set_link_name(target).unwrap();
                    header.set_size(0);
                    header.set_cksum();
                    builder.append(&header, io::empty()).unwrap();
                }
                Item::RawName(name, content) => {
                    // set_path refuses `..`, so write the name bytes directly
                    header.as_old_mut().name[..name.len()].copy_from_slice(name);
                    header.set_mode(0o644);
                    header.set_size(content.len() as u64);
                    header.set_cksum();
                    builder.append(&header, content.as_bytes()).unwrap();
                }
            }
        }
        let tar = builder.into_inner().unwrap();

        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(&tar).unwrap();
        fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    #[test]
    fn test_can_handle() {
        let extractor = TarXzExtractor;
        assert!(extractor.can_handle(Path::new("app.pkg.tar.xz")));
        assert!(extractor.can_handle(Path::new("APP.TXZ")));
        assert!(!extractor.can_handle(Path::new("app.tar.gz")));
        assert!(!extractor.can_handle(Path::new("app.zip")));
    }

    #[test]
    fn test_decompressed_path() {
        assert_eq!(
            decompressed_path(Path::new("/cache/app.pkg.tar.xz")),
            PathBuf::from("/cache/app.pkg.tar")
        );
        assert_eq!(
            decompressed_path(Path::new("/cache/app.txz")),
            PathBuf::from("/cache/app.tar")
        );
    }

    #[test]
    fn test_extract_files_and_directories() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = cache.path().join("app.pkg.tar.xz");
        create_tar_xz(
            &archive,
            &[
                Item::Dir("usr/local/app/", 0o755),
                Item::Dir("usr/local/app/bin/", 0o755),
                Item::File("usr/local/app/bin/app", "#!/bin/sh\necho app", 0o755),
                Item::File("usr/local/app/README", "readme", 0o644),
            ],
        );

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        let bin = root.path().join("usr/local/app/bin/app");
        assert_eq!(fs::read_to_string(&bin).unwrap(), "#!/bin/sh\necho app");
        assert_eq!(
            fs::read_to_string(root.path().join("usr/local/app/README")).unwrap(),
            "readme"
        );

        assert_eq!(
            manifest.files,
            vec![bin.clone(), root.path().join("usr/local/app/README")]
        );
        assert_eq!(
            manifest.directories,
            vec![
                root.path().join("usr"),
                root.path().join("usr/local"),
                root.path().join("usr/local/app"),
                root.path().join("usr/local/app/bin"),
            ]
        );

        // The intermediate tar is gone, the cached archive stays
        assert!(!cache.path().join("app.pkg.tar").exists());
        assert!(archive.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&bin).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
            let readme = root.path().join("usr/local/app/README");
            let mode = fs::metadata(&readme).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[test]
    fn test_extract_file_without_directory_entries() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = cache.path().join("lib.pkg.tar.xz");
        create_tar_xz(
            &archive,
            &[Item::File("usr/local/lib/liblib.so", "elf", 0o644)],
        );

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        assert!(root.path().join("usr/local/lib/liblib.so").exists());
        assert_eq!(manifest.directories.len(), 3);
    }

    #[test]
    fn test_extract_missing_root_is_created_but_not_recorded() {
        let cache = tempdir().unwrap();
        let root = cache.path().join("newroot");
        let archive = cache.path().join("lib.pkg.tar.xz");
        create_tar_xz(&archive, &[Item::File("lib/liblib.so", "elf", 0o644)]);

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, &root)
            .unwrap();

        assert!(root.join("lib/liblib.so").exists());
        assert_eq!(manifest.directories, vec![root.join("lib")]);
    }

    #[test]
    fn test_extract_existing_directories_are_not_recorded() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("usr/local/bin")).unwrap();
        let archive = cache.path().join("tool.pkg.tar.xz");
        create_tar_xz(
            &archive,
            &[
                Item::Dir("usr/local/bin/", 0o700),
                Item::File("usr/local/bin/tool", "tool", 0o755),
            ],
        );

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        assert!(manifest.directories.is_empty());
        assert_eq!(manifest.files, vec![root.path().join("usr/local/bin/tool")]);

        #[cfg(unix)]
        {
            // Existing directory keeps its own mode
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(root.path().join("usr/local/bin"))
                .unwrap()
                .permissions()
                .mode();
            assert_ne!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_extract_overwrites_existing_file() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("etc")).unwrap();
        fs::write(root.path().join("etc/app.conf"), "old configuration, longer").unwrap();
        let archive = cache.path().join("app.pkg.tar.xz");
        create_tar_xz(&archive, &[Item::File("etc/app.conf", "new", 0o644)]);

        TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        assert_eq!(
            fs::read_to_string(root.path().join("etc/app.conf")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_extract_skips_symlinks() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = cache.path().join("app.pkg.tar.xz");
        create_tar_xz(
            &archive,
            &[
                Item::File("opt/app/app-1.0", "bin", 0o755),
                Item::Symlink("opt/app/app", "app-1.0"),
            ],
        );

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        assert!(root.path().join("opt/app/app-1.0").exists());
        assert!(fs::symlink_metadata(root.path().join("opt/app/app")).is_err());
        assert_eq!(manifest.files.len(), 1);
    }

    #[test]
    fn test_extract_rejects_path_traversal() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let root_dir = root.path().join("root");
        fs::create_dir(&root_dir).unwrap();
        let archive = cache.path().join("evil.pkg.tar.xz");
        create_tar_xz(
            &archive,
            &[
                Item::File("usr/ok.txt", "fine", 0o644),
                Item::RawName(b"../escaped.txt", "gotcha"),
            ],
        );

        let err = TarXzExtractor
            .extract(&RealRuntime, &archive, &root_dir)
            .unwrap_err();

        match err {
            ExtractError::UnsafePath { entry } => {
                assert_eq!(entry, PathBuf::from("../escaped.txt"))
            }
            other => panic!("Expected UnsafePath, got {:?}", other),
        }
        assert!(!root.path().join("escaped.txt").exists());
        // Entries before the failure stay on disk
        assert!(root_dir.join("usr/ok.txt").exists());
    }

    #[test]
    fn test_extract_rejects_deep_path_traversal() {
        let cache = tempdir().unwrap();
        let root_dir = cache.path().join("a/b/root");
        fs::create_dir_all(&root_dir).unwrap();
        let archive = cache.path().join("evil.pkg.tar.xz");
        create_tar_xz(&archive, &[Item::RawName(b"../../etc/passwd", "root::0:0")]);

        let err = TarXzExtractor
            .extract(&RealRuntime, &archive, &root_dir)
            .unwrap_err();

        assert!(matches!(err, ExtractError::UnsafePath { ref entry } if entry == Path::new("../../etc/passwd")));
        assert!(!root_dir.join("etc/passwd").exists());
        assert!(!cache.path().join("a/etc/passwd").exists());
    }

    #[test]
    fn test_extract_skips_entries_without_mode() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = cache.path().join("app.pkg.tar.xz");

        let mut builder = Builder::new(Vec::new());
        let mut fifo = Header::new_gnu();
        fifo.set_entry_type(EntryType::Fifo);
        fifo.set_path("opt/app/pipe").unwrap();
        fifo.set_size(0);
        // Blank mode field, as some archivers write for special entries
        fifo.as_old_mut().mode = [0; 8];
        fifo.set_cksum();
        builder.append(&fifo, io::empty()).unwrap();
        let mut file = Header::new_gnu();
        file.set_path("opt/app/app").unwrap();
        file.set_mode(0o755);
        file.set_size(3);
        file.set_cksum();
        builder.append(&file, &b"bin"[..]).unwrap();
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(&builder.into_inner().unwrap()).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let manifest = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap();

        assert!(!root.path().join("opt/app/pipe").exists());
        assert_eq!(manifest.files, vec![root.path().join("opt/app/app")]);
    }

    #[test]
    fn test_extract_corrupt_archive() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = cache.path().join("app.pkg.tar.xz");
        fs::write(&archive, "this is not xz data").unwrap();

        let err = TarXzExtractor
            .extract(&RealRuntime, &archive, root.path())
            .unwrap_err();

        assert!(matches!(err, ExtractError::Decompress { .. }));
    }

    #[test]
    fn test_extract_missing_archive() {
        let cache = tempdir().unwrap();
        let root = tempdir().unwrap();

        let err = TarXzExtractor
            .extract(&RealRuntime, &cache.path().join("gone.pkg.tar.xz"), root.path())
            .unwrap_err();

        assert!(matches!(err, ExtractError::Decompress { .. }));
    }

    #[test]
    fn test_extract_unsupported_format() {
        let root = tempdir().unwrap();
        let err = TarXzExtractor
            .extract(&RealRuntime, Path::new("/tmp/app.zip"), root.path())
            .unwrap_err();
        assert!(err.to_string().contains("unsupported archive format"));
    }
}
