//! Binary codec for the persisted project database.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! MAGIC(29) | formatVersion:i32 | payloadSize:i32 | entryCount:i32 | stringCount:i32
//!   | stringCount * (length:u16, UTF-8 bytes)
//!   | entryCount * (classNameRef:i32, sourcePathRef:i32, timestamp:i64,
//!                   fingerprint:i64, class model fields…)
//!   | sourcelessCount:i32 | sourcelessCount * (sourcePathRef:i32, timestamp:i64)
//! ```
//!
//! `payloadSize` counts every byte after itself. Every string in the entries
//! is written once in the table and referenced by index; `-1` encodes an
//! absent string. Format version 1 lacks the per-class target marker, and
//! versions 1 and 2 lack the trailing list of sources without classes.
//!
//! Encoding is two-phase: entry bodies go to a growable scratch buffer while
//! the string table accumulates, then the exact total size is known and the
//! header, table and bodies are emitted into one pre-sized buffer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::buffer::{ByteReader, ByteWriter, DEFAULT_INCREMENT, ReadError, WriteError};
use crate::error::{MakeError, MakeResult};
use crate::model::{
    AccessFlags, ClassModel, ConstantValue, FieldInfo, MemberRef, MethodInfo, NestedClass,
    TARGET_UNKNOWN,
};
use crate::project::{CheckResult, ClassVersion, ProjectDirectory, ProjectEntry};

pub const MAGIC: &[u8; 29] = b"class-make project database\n\0";
pub const FORMAT_V1: i32 = 1;
pub const FORMAT_V2: i32 = 2;
pub const FORMAT_CURRENT: i32 = 3;

const HEADER_LEN: usize = MAGIC.len() + 4 + 4;
const NO_STRING: i32 = -1;

// Smallest possible encodings, used to reject counts the payload cannot hold.
const MIN_STRING_LEN: usize = 2;
const MIN_ENTRY_LEN: usize = 28;
const SOURCELESS_LEN: usize = 12;

const CONST_NONE: u8 = 0;
const CONST_INT: u8 = 1;
const CONST_LONG: u8 = 2;
const CONST_FLOAT: u8 = 3;
const CONST_DOUBLE: u8 = 4;
const CONST_STRING: u8 = 5;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("file is {len} bytes, shorter than the {}-byte header", HEADER_LEN)]
    TooShort { len: usize },
    #[error("bad magic header")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(i32),
    #[error("payload size field says {declared} bytes but {actual} follow")]
    SizeMismatch { declared: i64, actual: usize },
    #[error("negative count {0}")]
    NegativeCount(i32),
    #[error("{count} {what} cannot fit in the {remaining} bytes left")]
    CountTooLarge {
        what: &'static str,
        count: i32,
        remaining: usize,
    },
    #[error("string reference {index} out of range ({count} strings)")]
    BadStringRef { index: i32, count: usize },
    #[error("string table entry {index} is not valid UTF-8")]
    BadString { index: usize },
    #[error("string of {len} bytes exceeds the 65535-byte limit")]
    StringTooLong { len: usize },
    #[error("unknown constant tag {0}")]
    BadConstantTag(u8),
    #[error("list of {len} items exceeds the 65535-item limit")]
    ListTooLong { len: usize },
    #[error("{0} bytes left over after the last entry")]
    TrailingBytes(usize),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Default)]
struct StringTable {
    index: HashMap<String, i32>,
    strings: Vec<String>,
}

impl StringTable {
    fn intern(&mut self, s: &str) -> i32 {
        if let Some(&idx) = self.index.get(s) {
            return idx;
        }
        let idx = self.strings.len() as i32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), idx);
        idx
    }

    fn intern_opt(&mut self, s: Option<&str>) -> i32 {
        s.map(|s| self.intern(s)).unwrap_or(NO_STRING)
    }

    fn encoded_len(&self) -> usize {
        self.strings.iter().map(|s| 2 + s.len()).sum()
    }
}

pub fn encode(dir: &ProjectDirectory) -> Result<Vec<u8>, CodecError> {
    encode_version(dir, FORMAT_CURRENT)
}

fn encode_version(dir: &ProjectDirectory, version: i32) -> Result<Vec<u8>, CodecError> {
    let mut table = StringTable::default();
    let mut bodies = ByteWriter::new(DEFAULT_INCREMENT);
    let mut count: i32 = 0;

    for entry in dir.entries() {
        let Some(old) = entry.old.as_ref() else {
            continue;
        };
        bodies.put_i32(table.intern(&entry.class_name));
        bodies.put_i32(table.intern(&entry.source));
        bodies.put_i64(old.timestamp);
        bodies.put_i64(old.fingerprint);
        bodies.put_i32(table.intern_opt(entry.archive_member.as_deref()));
        write_model(&mut bodies, &mut table, &old.model, version)?;
        count += 1;
    }
    if version >= FORMAT_CURRENT {
        let sourceless: Vec<(&str, i64)> = dir.sourceless().collect();
        bodies.put_i32(sourceless.len() as i32);
        for (source, timestamp) in sourceless {
            bodies.put_i32(table.intern(source));
            bodies.put_i64(timestamp);
        }
    }

    for s in &table.strings {
        if s.len() > u16::MAX as usize {
            return Err(CodecError::StringTooLong { len: s.len() });
        }
    }

    let payload = 4 + 4 + table.encoded_len() + bodies.len();
    let total = HEADER_LEN + payload;
    let mut out = ByteWriter::exact(total);
    out.put_bytes(MAGIC);
    out.put_i32(version);
    out.put_i32(payload as i32);
    out.put_i32(count);
    out.put_i32(table.strings.len() as i32);
    for s in &table.strings {
        out.put_u16(s.len() as u16);
        out.put_bytes(s.as_bytes());
    }
    out.put_bytes(bodies.as_slice());
    Ok(out.finish_exact(total)?)
}

fn put_len(w: &mut ByteWriter, len: usize) -> Result<(), CodecError> {
    let len16 = u16::try_from(len).map_err(|_| CodecError::ListTooLong { len })?;
    w.put_u16(len16);
    Ok(())
}

fn write_model(
    w: &mut ByteWriter,
    table: &mut StringTable,
    model: &ClassModel,
    version: i32,
) -> Result<(), CodecError> {
    w.put_u16(model.access.bits());
    w.put_i32(table.intern_opt(model.superclass.as_deref()));
    if version >= FORMAT_V2 {
        w.put_u16(model.target);
    }

    put_len(w, model.interfaces.len())?;
    for i in &model.interfaces {
        w.put_i32(table.intern(i));
    }

    put_len(w, model.fields.len())?;
    for f in &model.fields {
        w.put_i32(table.intern(&f.name));
        w.put_i32(table.intern(&f.signature));
        w.put_u16(f.access.bits());
        match &f.constant {
            None => w.put_u8(CONST_NONE),
            Some(ConstantValue::Int(v)) => {
                w.put_u8(CONST_INT);
                w.put_i32(*v);
            }
            Some(ConstantValue::Long(v)) => {
                w.put_u8(CONST_LONG);
                w.put_i64(*v);
            }
            Some(ConstantValue::Float(bits)) => {
                w.put_u8(CONST_FLOAT);
                w.put_u32(*bits);
            }
            Some(ConstantValue::Double(bits)) => {
                w.put_u8(CONST_DOUBLE);
                w.put_i64(*bits as i64);
            }
            Some(ConstantValue::String(s)) => {
                w.put_u8(CONST_STRING);
                w.put_i32(table.intern(s));
            }
        }
    }

    put_len(w, model.methods.len())?;
    for m in &model.methods {
        w.put_i32(table.intern(&m.name));
        w.put_i32(table.intern(&m.signature));
        w.put_u16(m.access.bits());
        put_len(w, m.exceptions.len())?;
        for e in &m.exceptions {
            w.put_i32(table.intern(e));
        }
    }

    put_len(w, model.nested.len())?;
    for n in &model.nested {
        w.put_i32(table.intern(&n.name));
        w.put_u16(n.access.bits());
        w.put_u8(n.local as u8);
    }

    put_len(w, model.referenced_classes.len())?;
    for c in &model.referenced_classes {
        w.put_i32(table.intern(c));
    }
    for refs in [
        &model.referenced_fields,
        &model.referenced_methods,
        &model.referenced_interface_methods,
    ] {
        put_len(w, refs.len())?;
        for r in refs {
            w.put_i32(table.intern(&r.class));
            w.put_i32(table.intern(&r.name));
            w.put_i32(table.intern(&r.signature));
        }
    }
    Ok(())
}

struct Decoder<'a> {
    r: ByteReader<'a>,
    strings: Vec<&'a str>,
    version: i32,
}

impl<'a> Decoder<'a> {
    fn string(&mut self) -> Result<String, CodecError> {
        let idx = self.r.i32()?;
        self.lookup(idx)
    }

    fn string_opt(&mut self) -> Result<Option<String>, CodecError> {
        let idx = self.r.i32()?;
        if idx == NO_STRING {
            return Ok(None);
        }
        self.lookup(idx).map(Some)
    }

    fn lookup(&self, idx: i32) -> Result<String, CodecError> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(|s| s.to_string())
            .ok_or(CodecError::BadStringRef {
                index: idx,
                count: self.strings.len(),
            })
    }

    fn flags(&mut self) -> Result<AccessFlags, CodecError> {
        Ok(AccessFlags::from_bits_retain(self.r.u16()?))
    }

    fn len(&mut self) -> Result<usize, CodecError> {
        Ok(self.r.u16()? as usize)
    }

    fn member_refs(&mut self) -> Result<Vec<MemberRef>, CodecError> {
        let n = self.len()?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(MemberRef {
                class: self.string()?,
                name: self.string()?,
                signature: self.string()?,
            });
        }
        Ok(out)
    }

    fn model(&mut self, name: String) -> Result<ClassModel, CodecError> {
        let mut model = ClassModel::new(name);
        model.access = self.flags()?;
        model.superclass = self.string_opt()?;
        model.target = if self.version >= FORMAT_V2 {
            self.r.u16()?
        } else {
            TARGET_UNKNOWN
        };

        let n = self.len()?;
        for _ in 0..n {
            let i = self.string()?;
            model.interfaces.push(i);
        }

        let n = self.len()?;
        for _ in 0..n {
            let name = self.string()?;
            let signature = self.string()?;
            let access = self.flags()?;
            let constant = match self.r.u8()? {
                CONST_NONE => None,
                CONST_INT => Some(ConstantValue::Int(self.r.i32()?)),
                CONST_LONG => Some(ConstantValue::Long(self.r.i64()?)),
                CONST_FLOAT => Some(ConstantValue::Float(self.r.u32()?)),
                CONST_DOUBLE => Some(ConstantValue::Double(self.r.i64()? as u64)),
                CONST_STRING => Some(ConstantValue::String(self.string()?)),
                other => return Err(CodecError::BadConstantTag(other)),
            };
            model.fields.push(FieldInfo {
                name,
                signature,
                access,
                constant,
            });
        }

        let n = self.len()?;
        for _ in 0..n {
            let name = self.string()?;
            let signature = self.string()?;
            let access = self.flags()?;
            let count = self.len()?;
            let mut exceptions = Vec::with_capacity(count);
            for _ in 0..count {
                exceptions.push(self.string()?);
            }
            model.methods.push(MethodInfo {
                name,
                signature,
                access,
                exceptions,
            });
        }

        let n = self.len()?;
        for _ in 0..n {
            let name = self.string()?;
            let access = self.flags()?;
            let local = self.r.u8()? != 0;
            model.nested.push(NestedClass {
                name,
                access,
                local,
            });
        }

        let n = self.len()?;
        for _ in 0..n {
            let c = self.string()?;
            model.referenced_classes.push(c);
        }
        model.referenced_fields = self.member_refs()?;
        model.referenced_methods = self.member_refs()?;
        model.referenced_interface_methods = self.member_refs()?;
        model.restore_derived();
        Ok(model)
    }
}

#[derive(Debug, Default)]
pub struct DatabaseImage {
    pub entries: Vec<ProjectEntry>,
    pub sourceless: Vec<(String, i64)>,
}

fn check_count(
    what: &'static str,
    count: i32,
    min_len: usize,
    remaining: usize,
) -> Result<usize, CodecError> {
    let n = usize::try_from(count).map_err(|_| CodecError::NegativeCount(count))?;
    if n.saturating_mul(min_len) > remaining {
        return Err(CodecError::CountTooLarge {
            what,
            count,
            remaining,
        });
    }
    Ok(n)
}

pub fn decode(bytes: &[u8]) -> Result<DatabaseImage, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TooShort { len: bytes.len() });
    }
    let mut r = ByteReader::new(bytes);
    if r.bytes(MAGIC.len())? != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = r.i32()?;
    if version != FORMAT_V1 && version != FORMAT_CURRENT {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let declared = r.i32()?;
    if declared as i64 != r.remaining() as i64 {
        return Err(CodecError::SizeMismatch {
            declared: declared as i64,
            actual: r.remaining(),
        });
    }
    let entry_count = r.i32()?;
    let string_count = r.i32()?;
    let string_count = check_count("strings", string_count, MIN_STRING_LEN, r.remaining())?;

    let mut strings = Vec::with_capacity(string_count);
    for index in 0..string_count {
        let len = r.u16()? as usize;
        let raw = r.bytes(len)?;
        strings.push(std::str::from_utf8(raw).map_err(|_| CodecError::BadString { index })?);
    }

    let mut d = Decoder {
        r,
        strings,
        version,
    };
    let entry_count = check_count("entries", entry_count, MIN_ENTRY_LEN, d.r.remaining())?;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let class_name = d.string()?;
        let source = d.string()?;
        let timestamp = d.r.i64()?;
        let fingerprint = d.r.i64()?;
        let archive_member = d.string_opt()?;
        let model = d.model(class_name.clone())?;
        entries.push(ProjectEntry {
            class_name,
            source,
            archive_member,
            old: Some(ClassVersion {
                timestamp,
                fingerprint,
                model,
            }),
            new: None,
            check: CheckResult::Unchecked,
        });
    }
    let mut sourceless = Vec::new();
    if version >= FORMAT_CURRENT {
        let raw = d.r.i32()?;
        let count = check_count("sourceless sources", raw, SOURCELESS_LEN, d.r.remaining())?;
        for _ in 0..count {
            let source = d.string()?;
            sourceless.push((source, d.r.i64()?));
        }
    }
    if d.r.remaining() != 0 {
        return Err(CodecError::TrailingBytes(d.r.remaining()));
    }
    Ok(DatabaseImage {
        entries,
        sourceless,
    })
}

/// Loads the project database, or an empty fresh directory if `path` does
/// not exist.
pub fn load(path: &Path) -> MakeResult<ProjectDirectory> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no project database, starting fresh");
            return Ok(ProjectDirectory::fresh());
        }
        Err(e) => return Err(MakeError::io(path, e)),
    };
    let image = decode(&bytes).map_err(|e| MakeError::DatabaseCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), entries = image.entries.len(), "loaded project database");
    let mut dir = ProjectDirectory::from_entries(image.entries).map_err(|e| match e {
        MakeError::DuplicateClass { class, .. } => MakeError::DatabaseCorrupt {
            path: path.to_path_buf(),
            reason: format!("class {class} recorded twice"),
        },
        other => other,
    })?;
    for (source, timestamp) in image.sourceless {
        dir.mark_sourceless(source, timestamp);
    }
    Ok(dir)
}

/// Writes the database atomically: a sibling temporary file is renamed over
/// the target.
pub fn save(dir: &ProjectDirectory, path: &Path) -> MakeResult<()> {
    let bytes = encode(dir).map_err(|e| MakeError::internal(format!("cannot encode project database: {e}")))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| MakeError::io(parent, e))?;
    }
    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(".tmp");
    let tmp = PathBuf::from(tmp_os);
    std::fs::write(&tmp, &bytes).map_err(|e| MakeError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| MakeError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved project database");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ClassBuilder, TestConst};

    fn entry(builder: ClassBuilder, source: &str, ts: i64) -> ProjectEntry {
        let model = builder.model();
        let mut e = ProjectEntry::from_source(model.name.clone(), source);
        e.old = Some(ClassVersion {
            timestamp: ts,
            fingerprint: ts * 31,
            model,
        });
        e.check = CheckResult::Unchecked;
        e
    }

    fn sample() -> ProjectDirectory {
        let a = entry(
            ClassBuilder::new("p/A")
                .implements("java/io/Serializable")
                .constant_field(0x0019, "MAX", "I", TestConst::Int(7))
                .constant_field(0x0019, "NAME", "Ljava/lang/String;", TestConst::Str("a"))
                .field(0x0004, "b", "Lp/B;")
                .method_throws(0x0001, "run", "(Lp/B;)V", &["java/io/IOException"])
                .inner("p/A$In", Some("p/A"), Some("In"), 0x0008)
                .calls("p/B", "go", "()V")
                .uses_field("p/B", "x", "I"),
            "src/p/A.java",
            100,
        );
        let nested = entry(
            ClassBuilder::new("p/A$In").inner("p/A$In", Some("p/A"), Some("In"), 0x0008),
            "src/p/A.java",
            101,
        );
        let mut b = entry(ClassBuilder::new("p/B").extends("p/Base"), "lib/b.jar", 200);
        b.archive_member = Some("p/B.class".to_string());
        let mut dir = ProjectDirectory::from_entries(vec![a, nested, b]).unwrap();
        dir.register(ProjectEntry::from_source("p/Unsaved", "src/p/Unsaved.java"))
            .unwrap();
        dir
    }

    #[test]
    fn round_trip_preserves_entries() {
        let dir = sample();
        let bytes = encode(&dir).unwrap();
        let decoded = ProjectDirectory::from_entries(decode(&bytes).unwrap().entries).unwrap();

        assert_eq!(decoded.len(), 3);
        assert!(!decoded.contains("p/Unsaved"));
        for original in dir.entries().filter(|e| e.old.is_some()) {
            let copy = decoded.get(&original.class_name).unwrap();
            assert_eq!(copy.source, original.source);
            assert_eq!(copy.archive_member, original.archive_member);
            assert_eq!(copy.old, original.old);
            assert_eq!(copy.check, CheckResult::Unchecked);
        }
        assert_eq!(
            decoded.get("p/A$In").unwrap().old_model().unwrap().enclosing.as_deref(),
            Some("p/A")
        );
    }

    #[test]
    fn strings_are_written_once() {
        let dir = sample();
        let bytes = encode(&dir).unwrap();
        let needle = b"src/p/A.java";
        let hits = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn header_fields_match_layout() {
        let bytes = encode(&sample()).unwrap();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.bytes(29).unwrap(), MAGIC);
        assert_eq!(r.i32().unwrap(), FORMAT_CURRENT);
        assert_eq!(r.i32().unwrap() as usize, bytes.len() - HEADER_LEN);
        assert_eq!(r.i32().unwrap(), 3);
    }

    #[test]
    fn old_format_defaults_target_marker() {
        let dir = sample();
        let bytes = encode_version(&dir, FORMAT_V1).unwrap();
        let decoded = decode(&bytes).unwrap();
        let a = decoded.entries.iter().find(|e| e.class_name == "p/A").unwrap();
        assert_eq!(a.old_model().unwrap().target, TARGET_UNKNOWN);
        assert_eq!(a.old_model().unwrap().methods.len(), 1);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project.pdb");
        let bytes = encode(&sample()).unwrap();
        std::fs::write(&path, &bytes[..10]).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, MakeError::DatabaseCorrupt { .. }), "{err}");
        assert!(err.to_string().contains("shorter than"));
    }

    fn header(entry_count: i32, string_count: i32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_CURRENT.to_be_bytes());
        bytes.extend_from_slice(&((8 + payload.len()) as i32).to_be_bytes());
        bytes.extend_from_slice(&entry_count.to_be_bytes());
        bytes.extend_from_slice(&string_count.to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn counts_larger_than_the_payload_are_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project.pdb");
        std::fs::write(&path, header(i32::MAX, 0, &[])).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, MakeError::DatabaseCorrupt { .. }), "{err}");
        assert!(err.to_string().contains("cannot fit"));

        assert!(matches!(
            decode(&header(0, i32::MAX, &[])),
            Err(CodecError::CountTooLarge { what: "strings", .. })
        ));
        assert!(matches!(
            decode(&header(0, 0, &i32::MAX.to_be_bytes())),
            Err(CodecError::CountTooLarge { .. })
        ));
        assert!(matches!(
            decode(&header(-1, 0, &[])),
            Err(CodecError::NegativeCount(-1))
        ));
    }

    #[test]
    fn sourceless_sources_round_trip() {
        let mut dir = sample();
        dir.mark_sourceless("src/p/package-info.java", 42);
        let image = decode(&encode(&dir).unwrap()).unwrap();
        assert_eq!(
            image.sourceless,
            vec![("src/p/package-info.java".to_string(), 42)]
        );

        let v2 = decode(&encode_version(&dir, FORMAT_V2).unwrap()).unwrap();
        assert!(v2.sourceless.is_empty());
        assert_eq!(v2.entries.len(), 3);
    }

    #[test]
    fn size_mismatch_is_detected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_and_version_are_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(CodecError::BadMagic)));

        let mut bytes = encode(&sample()).unwrap();
        bytes[MAGIC.len() + 3] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn missing_file_loads_fresh_and_save_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("project.pdb");
        let fresh = load(&path).unwrap();
        assert!(fresh.is_fresh());
        assert!(fresh.is_empty());

        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(!loaded.is_fresh());
        assert!(!path.with_extension("pdb.tmp").exists());
    }
}
