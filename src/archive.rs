use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use memmap2::Mmap;
use zip::ZipArchive;

use crate::error::{MakeError, MakeResult};

// Declared member sizes come from the archive itself.
const MAX_CAPACITY_HINT: u64 = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_CAPACITY_HINT) as usize
}

pub struct Archive {
    zip: ZipArchive<Cursor<Mmap>>,
}

impl Archive {
    pub fn open(path: &Path) -> MakeResult<Self> {
        let file = File::open(path).map_err(|e| MakeError::io(path, e))?;
        // SAFETY: The file is opened read-only and the map is owned by the
        // archive, so it outlives every read through it.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| MakeError::io(path, e))?;
        let zip = ZipArchive::new(Cursor::new(mmap)).map_err(|e| MakeError::Config {
            reason: format!("cannot read archive {}: {e}", path.display()),
        })?;
        Ok(Self { zip })
    }

    pub fn read(&mut self, member: &str) -> MakeResult<Option<Vec<u8>>> {
        let mut entry = match self.zip.by_name(member) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(MakeError::Config {
                    reason: format!("cannot read archive member {member}: {e}"),
                });
            }
        };
        let mut out = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut out)
            .map_err(|e| MakeError::io(member, e))?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveClass {
    pub class_name: String,
    pub member: String,
    pub bytes: Vec<u8>,
}

pub fn read_classes(path: &Path) -> MakeResult<Vec<ArchiveClass>> {
    let mut archive = Archive::open(path)?;
    let mut classes = Vec::new();
    for i in 0..archive.zip.len() {
        let mut entry = archive.zip.by_index(i).map_err(|e| MakeError::Config {
            reason: format!("cannot read archive {}: {e}", path.display()),
        })?;
        let name = entry.name().to_string();
        if !name.ends_with(".class") || name.starts_with("META-INF/") || name.ends_with("module-info.class") {
            continue;
        }
        let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| MakeError::io(path, e))?;
        classes.push(ArchiveClass {
            class_name: name.trim_end_matches(".class").replace('\\', "/"),
            member: name,
            bytes,
        });
    }
    Ok(classes)
}

#[cfg(test)]
pub(crate) fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> std::io::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_classes_lists_class_members() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let jar = tmp.path().join("lib.jar");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", b"a"),
                ("org/example/A$Inner.class", b"b"),
                ("META-INF/MANIFEST.MF", b""),
                ("module-info.class", b""),
            ],
        )?;

        let classes = read_classes(&jar)?;
        let names: Vec<&str> = classes.iter().map(|c| c.class_name.as_str()).collect();
        assert_eq!(names, vec!["org/example/A", "org/example/A$Inner"]);
        assert_eq!(classes[1].bytes, b"b");
        Ok(())
    }

    #[test]
    fn oversized_member_header_is_not_trusted() -> anyhow::Result<()> {
        assert_eq!(capacity_hint(3), 3);
        assert_eq!(capacity_hint(u64::MAX), MAX_CAPACITY_HINT as usize);

        let tmp = tempfile::tempdir()?;
        let jar = tmp.path().join("lib.jar");
        write_jar(&jar, &[("p/A.class", b"abc")])?;
        // Central directory header: uncompressed size lives 24 bytes in.
        let mut raw = std::fs::read(&jar)?;
        let at = raw
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory present");
        raw[at + 24..at + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        std::fs::write(&jar, &raw)?;

        if let Ok(classes) = read_classes(&jar) {
            assert_eq!(classes[0].bytes, b"abc");
        }
        Ok(())
    }

    #[test]
    fn read_member_reports_missing() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let jar = tmp.path().join("lib.jar");
        write_jar(&jar, &[("p/A.class", b"x")])?;
        let mut archive = Archive::open(&jar)?;
        assert_eq!(archive.read("p/A.class")?.as_deref(), Some(&b"x"[..]));
        assert!(archive.read("p/B.class")?.is_none());
        Ok(())
    }
}
