//! Decoder from compiled class bytes into [`ClassModel`].
//!
//! The constant pool is scanned once to record the offset and tag of every
//! entry. UTF-8 strings and trimmed class names are decoded lazily and cached
//! per pool index, so a class that references `java/lang/String` from fifty
//! places decodes it once.

use std::cell::OnceCell;

use crate::buffer::{ByteReader, ReadError};
use crate::model::{
    AccessFlags, ClassModel, ConstantValue, FieldInfo, JAVA5_MAJOR, MemberRef, MethodInfo,
    NestedClass, normalize_descriptor, top_level_of,
};

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const MIN_MAJOR: u16 = 45;
pub const MAX_MAJOR: u16 = 69;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ClassFileError {
    pub offset: usize,
    pub reason: String,
}

impl ClassFileError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

impl From<ReadError> for ClassFileError {
    fn from(err: ReadError) -> Self {
        let ReadError::Truncated { offset, .. } = err;
        ClassFileError::new(offset, err.to_string())
    }
}

#[derive(Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    pub shallow: bool,
    /// Decides whether a class belongs to the project. Private fields whose
    /// type is not a project class are dropped. When absent every
    /// reference-typed private field is kept.
    pub is_project_class: Option<&'a dyn Fn(&str) -> bool>,
}

impl<'a> ParseOptions<'a> {
    pub fn shallow() -> Self {
        Self {
            shallow: true,
            is_project_class: None,
        }
    }

    pub fn full(is_project_class: &'a dyn Fn(&str) -> bool) -> Self {
        Self {
            shallow: false,
            is_project_class: Some(is_project_class),
        }
    }
}

struct ConstantPool<'a> {
    data: &'a [u8],
    tags: Vec<u8>,
    offsets: Vec<usize>,
    utf8: Vec<OnceCell<String>>,
    class_names: Vec<OnceCell<Option<String>>>,
}

impl<'a> ConstantPool<'a> {
    fn scan(data: &'a [u8], reader: &mut ByteReader<'a>) -> Result<Self, ClassFileError> {
        let count = reader.u16()? as usize;
        let mut tags = vec![0u8; count.max(1)];
        let mut offsets = vec![0usize; count.max(1)];
        let mut idx = 1;
        while idx < count {
            let tag_offset = reader.position();
            let tag = reader.u8()?;
            tags[idx] = tag;
            offsets[idx] = reader.position();
            let mut slots = 1;
            match tag {
                TAG_UTF8 => {
                    let len = reader.u16()? as usize;
                    reader.skip(len)?;
                }
                TAG_INTEGER | TAG_FLOAT => reader.skip(4)?,
                TAG_LONG | TAG_DOUBLE => {
                    reader.skip(8)?;
                    slots = 2;
                }
                TAG_CLASS | TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    reader.skip(2)?
                }
                TAG_FIELDREF
                | TAG_METHODREF
                | TAG_INTERFACE_METHODREF
                | TAG_NAME_AND_TYPE
                | TAG_DYNAMIC
                | TAG_INVOKE_DYNAMIC => reader.skip(4)?,
                TAG_METHOD_HANDLE => reader.skip(3)?,
                other => {
                    return Err(ClassFileError::new(
                        tag_offset,
                        format!("unknown constant pool tag {other} at index {idx}"),
                    ));
                }
            }
            idx += slots;
        }
        if idx != count && count > 0 {
            return Err(ClassFileError::new(
                reader.position(),
                "wide constant occupies the last constant pool slot",
            ));
        }
        let len = tags.len();
        Ok(Self {
            data,
            tags,
            offsets,
            utf8: (0..len).map(|_| OnceCell::new()).collect(),
            class_names: (0..len).map(|_| OnceCell::new()).collect(),
        })
    }

    fn len(&self) -> usize {
        self.tags.len()
    }

    fn expect_tag(&self, index: u16, tag: u8) -> Result<usize, ClassFileError> {
        let idx = index as usize;
        if idx == 0 || idx >= self.tags.len() || self.tags[idx] != tag {
            let found = self.tags.get(idx).copied().unwrap_or(0);
            return Err(ClassFileError::new(
                self.offsets.get(idx).copied().unwrap_or(0),
                format!("constant pool index {index} has tag {found}, expected {tag}"),
            ));
        }
        Ok(self.offsets[idx])
    }

    fn u16_at(&self, offset: usize) -> Result<u16, ClassFileError> {
        Ok(ByteReader::at(self.data, offset).u16()?)
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        let offset = self.expect_tag(index, TAG_UTF8)?;
        let cell = &self.utf8[index as usize];
        if let Some(s) = cell.get() {
            return Ok(s);
        }
        let mut reader = ByteReader::at(self.data, offset);
        let len = reader.u16()? as usize;
        let bytes = reader.bytes(len)?;
        let decoded = decode_modified_utf8(bytes).ok_or_else(|| {
            ClassFileError::new(offset, format!("constant pool entry {index} is not valid UTF-8"))
        })?;
        Ok(cell.get_or_init(|| decoded))
    }

    /// Name of a `CONSTANT_Class` entry with array and `L…;` adornment
    /// stripped. `None` for arrays of primitives.
    fn class_name(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        let offset = self.expect_tag(index, TAG_CLASS)?;
        let cell = &self.class_names[index as usize];
        if let Some(name) = cell.get() {
            return Ok(name.as_deref());
        }
        let raw = self.utf8(self.u16_at(offset)?)?;
        let trimmed = trim_class_name(raw).map(str::to_string);
        Ok(cell.get_or_init(|| trimmed).as_deref())
    }

    fn required_class_name(&self, index: u16) -> Result<String, ClassFileError> {
        match self.class_name(index)? {
            Some(name) => Ok(name.to_string()),
            None => Err(ClassFileError::new(
                self.offsets[index as usize],
                format!("constant pool entry {index} does not name a class"),
            )),
        }
    }

    fn member_ref(&self, idx: usize) -> Result<Option<MemberRef>, ClassFileError> {
        let mut reader = ByteReader::at(self.data, self.offsets[idx]);
        let class_index = reader.u16()?;
        let nat_index = reader.u16()?;
        let Some(class) = self.class_name(class_index)? else {
            // Methods invoked on array types, e.g. `int[].clone()`.
            return Ok(None);
        };
        let nat_offset = self.expect_tag(nat_index, TAG_NAME_AND_TYPE)?;
        let mut nat = ByteReader::at(self.data, nat_offset);
        let name = self.utf8(nat.u16()?)?;
        let descriptor = self.utf8(nat.u16()?)?;
        Ok(Some(MemberRef {
            class: class.to_string(),
            name: name.to_string(),
            signature: normalize_descriptor(descriptor),
        }))
    }

    fn constant_value(&self, index: u16) -> Result<ConstantValue, ClassFileError> {
        let idx = index as usize;
        let tag = self.tags.get(idx).copied().unwrap_or(0);
        let offset = self.offsets.get(idx).copied().unwrap_or(0);
        let mut reader = ByteReader::at(self.data, offset);
        Ok(match tag {
            TAG_INTEGER => ConstantValue::Int(reader.i32()?),
            TAG_FLOAT => ConstantValue::Float(reader.u32()?),
            TAG_LONG => ConstantValue::Long(reader.i64()?),
            TAG_DOUBLE => ConstantValue::Double(reader.i64()? as u64),
            TAG_STRING => ConstantValue::String(self.utf8(reader.u16()?)?.to_string()),
            other => {
                return Err(ClassFileError::new(
                    offset,
                    format!("ConstantValue index {index} has non-constant tag {other}"),
                ));
            }
        })
    }
}

pub fn parse_class(bytes: &[u8], options: &ParseOptions<'_>) -> Result<ClassModel, ClassFileError> {
    let mut reader = ByteReader::new(bytes);
    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::new(0, format!("bad magic number {magic:#010x}")));
    }
    let _minor = reader.u16()?;
    let major = reader.u16()?;
    if !(MIN_MAJOR..=MAX_MAJOR).contains(&major) {
        return Err(ClassFileError::new(
            6,
            format!("unsupported class file version {major} (supported {MIN_MAJOR}..={MAX_MAJOR})"),
        ));
    }

    let pool = ConstantPool::scan(bytes, &mut reader)?;

    let access = AccessFlags::from_bits_retain(reader.u16()?);
    let name = pool.required_class_name(reader.u16()?)?;
    let super_index = reader.u16()?;
    let superclass = if super_index == 0 {
        None
    } else {
        Some(pool.required_class_name(super_index)?)
    };
    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.required_class_name(reader.u16()?)?);
    }

    let mut model = ClassModel::new(name);
    model.access = access;
    model.superclass = superclass;
    model.interfaces = interfaces;
    model.target = major;

    if options.shallow {
        model.lightweight = true;
        return Ok(model);
    }

    let field_count = reader.u16()?;
    for _ in 0..field_count {
        let field = read_field(&pool, &mut reader)?;
        if keep_field(&field, options) {
            model.fields.push(field);
        }
    }

    let method_count = reader.u16()?;
    for _ in 0..method_count {
        model.methods.push(read_method(&pool, &mut reader)?);
    }

    let attr_count = reader.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(reader.u16()?)?;
        let len = reader.u32()? as usize;
        let body_offset = reader.position();
        let body = reader.bytes(len)?;
        match attr_name {
            "InnerClasses" => read_inner_classes(&pool, body, body_offset, &mut model)?,
            "EnclosingMethod" => {
                let mut r = ByteReader::at(bytes, body_offset);
                let class_index = r.u16()?;
                if model.enclosing.is_none() {
                    model.enclosing = Some(pool.required_class_name(class_index)?);
                }
            }
            _ => {}
        }
    }

    collect_references(&pool, &mut model)?;
    Ok(model)
}

fn read_field(pool: &ConstantPool<'_>, reader: &mut ByteReader<'_>) -> Result<FieldInfo, ClassFileError> {
    let access = AccessFlags::from_bits_retain(reader.u16()?);
    let name = pool.utf8(reader.u16()?)?.to_string();
    let descriptor = pool.utf8(reader.u16()?)?;
    let signature = normalize_descriptor(descriptor);
    let mut constant = None;
    let attr_count = reader.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(reader.u16()?)?;
        let len = reader.u32()? as usize;
        if attr_name == "ConstantValue" && access.is_static() && access.is_final() {
            let mut body = ByteReader::new(reader.bytes(len)?);
            constant = Some(pool.constant_value(body.u16()?)?);
        } else {
            reader.skip(len)?;
        }
    }
    Ok(FieldInfo {
        name,
        signature,
        access,
        constant,
    })
}

fn read_method(pool: &ConstantPool<'_>, reader: &mut ByteReader<'_>) -> Result<MethodInfo, ClassFileError> {
    let access = AccessFlags::from_bits_retain(reader.u16()?);
    let name = pool.utf8(reader.u16()?)?.to_string();
    let signature = normalize_descriptor(pool.utf8(reader.u16()?)?);
    let mut exceptions = Vec::new();
    let attr_count = reader.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(reader.u16()?)?;
        let len = reader.u32()? as usize;
        let body = reader.bytes(len)?;
        if attr_name == "Exceptions" {
            let mut r = ByteReader::new(body);
            let count = r.u16()?;
            for _ in 0..count {
                exceptions.push(pool.required_class_name(r.u16()?)?);
            }
        }
    }
    Ok(MethodInfo {
        name,
        signature,
        access,
        exceptions,
    })
}

/// Private fields of primitive type, or of a reference type outside the
/// project, cannot influence any other project class.
fn keep_field(field: &FieldInfo, options: &ParseOptions<'_>) -> bool {
    if !field.access.is_private() {
        return true;
    }
    let element = field.signature.trim_start_matches('[');
    let Some(class) = element.strip_prefix('@').and_then(|s| s.strip_suffix('#')) else {
        return false;
    };
    match options.is_project_class {
        Some(is_project) => is_project(class),
        None => true,
    }
}

fn read_inner_classes(
    pool: &ConstantPool<'_>,
    body: &[u8],
    body_offset: usize,
    model: &mut ClassModel,
) -> Result<(), ClassFileError> {
    let mut r = ByteReader::new(body);
    let count = r.u16().map_err(|e| shift(e, body_offset))?;
    for _ in 0..count {
        let inner_index = r.u16().map_err(|e| shift(e, body_offset))?;
        let outer_index = r.u16().map_err(|e| shift(e, body_offset))?;
        let _simple_name = r.u16().map_err(|e| shift(e, body_offset))?;
        let flags = AccessFlags::from_bits_retain(r.u16().map_err(|e| shift(e, body_offset))?);

        let Some(inner) = pool.class_name(inner_index)? else {
            continue;
        };
        let outer = if outer_index == 0 {
            None
        } else {
            pool.class_name(outer_index)?
        };

        if inner == model.name {
            // The class file header widens protected to public and private to
            // package; the real flags live here.
            model.access = flags;
            if let Some(outer) = outer {
                model.enclosing = Some(outer.to_string());
            }
            continue;
        }

        let nested = match outer {
            Some(outer) if outer == model.name => Some(false),
            Some(_) => None,
            None if is_local_class_of(&model.name, inner, model.target) => Some(true),
            None => None,
        };
        if let Some(local) = nested
            && !model.nested.iter().any(|n| n.name == inner)
        {
            model.nested.push(NestedClass {
                name: inner.to_string(),
                access: flags,
                local,
            });
        }
    }
    Ok(())
}

fn shift(err: ReadError, base: usize) -> ClassFileError {
    let mut out = ClassFileError::from(err);
    out.offset += base;
    out
}

/// Decides whether `inner`, a local or anonymous class (no outer class in
/// `InnerClasses`), is declared directly inside `outer`.
///
/// Since Java 5 such classes are named `Outer$<n>[Name]` after their
/// immediately enclosing class. Older compilers named them after the
/// top-level class only, so for those targets only a top-level class can
/// own them.
pub fn is_local_class_of(outer: &str, inner: &str, target: u16) -> bool {
    let Some(rest) = inner.strip_prefix(outer).and_then(|r| r.strip_prefix('$')) else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || rest[digits..].contains('$') {
        return false;
    }
    target >= JAVA5_MAJOR || top_level_of(outer) == outer
}

fn collect_references(pool: &ConstantPool<'_>, model: &mut ClassModel) -> Result<(), ClassFileError> {
    for idx in 1..pool.len() {
        match pool.tags[idx] {
            TAG_CLASS => {
                if let Some(name) = pool.class_name(idx as u16)?
                    && name != model.name
                    && !model.referenced_classes.iter().any(|c| c == name)
                {
                    model.referenced_classes.push(name.to_string());
                }
            }
            TAG_FIELDREF => push_unique(&mut model.referenced_fields, pool.member_ref(idx)?),
            TAG_METHODREF => push_unique(&mut model.referenced_methods, pool.member_ref(idx)?),
            TAG_INTERFACE_METHODREF => {
                push_unique(&mut model.referenced_interface_methods, pool.member_ref(idx)?)
            }
            _ => {}
        }
    }
    Ok(())
}

fn push_unique(list: &mut Vec<MemberRef>, item: Option<MemberRef>) {
    if let Some(item) = item
        && !list.contains(&item)
    {
        list.push(item);
    }
}

fn trim_class_name(raw: &str) -> Option<&str> {
    if !raw.starts_with('[') {
        return Some(raw);
    }
    let element = raw.trim_start_matches('[');
    element.strip_prefix('L').and_then(|s| s.strip_suffix(';'))
}

/// Decodes the JVM's modified UTF-8: `NUL` as `C0 80` and supplementary
/// characters as surrogate pairs.
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(s.to_string());
    }
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)?;
            if b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return None;
            }
            units.push((((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16);
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::class_sentinel;
    use crate::testutil::{ClassBuilder, TestConst};

    fn full(bytes: &[u8]) -> ClassModel {
        parse_class(bytes, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn parses_header_members_and_references() {
        let bytes = ClassBuilder::new("p/C")
            .implements("java/lang/Runnable")
            .field(0x0001, "count", "I")
            .method(0x0001, "run", "()V")
            .method_throws(0x0001, "load", "(Ljava/lang/String;)V", &["java/io/IOException"])
            .uses_field("q/D", "x", "Lq/E;")
            .calls("q/D", "go", "(I)V")
            .calls_interface("java/util/List", "size", "()I")
            .build();

        let model = full(&bytes);
        assert_eq!(model.name, "p/C");
        assert_eq!(model.package, "p");
        assert_eq!(model.superclass.as_deref(), Some("java/lang/Object"));
        assert_eq!(model.interfaces, vec!["java/lang/Runnable".to_string()]);
        assert_eq!(model.fields.len(), 1);
        assert_eq!(model.methods.len(), 2);
        assert_eq!(
            model.methods[1].exceptions,
            vec!["java/io/IOException".to_string()]
        );
        assert!(model.methods[1].signature.contains(&class_sentinel("java/lang/String")));
        assert!(model.references_class("q/D"));
        assert!(model.references_class("java/util/List"));
        assert!(!model.references_class("p/C"));
        assert_eq!(model.referenced_fields[0].signature, "@q/E#");
        assert_eq!(model.referenced_methods[0].name, "go");
        assert_eq!(model.referenced_interface_methods[0].class, "java/util/List");
        assert!(!model.lightweight);
    }

    #[test]
    fn shallow_parse_skips_members() {
        let bytes = ClassBuilder::new("p/C")
            .extends("p/B")
            .method(0x0001, "run", "()V")
            .build();
        let model = parse_class(&bytes, &ParseOptions::shallow()).unwrap();
        assert!(model.lightweight);
        assert_eq!(model.superclass.as_deref(), Some("p/B"));
        assert!(model.methods.is_empty());
        assert!(model.referenced_classes.is_empty());
    }

    #[test]
    fn reads_constant_values() {
        let bytes = ClassBuilder::new("p/K")
            .constant_field(0x0019, "MAX", "I", TestConst::Int(42))
            .constant_field(0x0019, "NAME", "Ljava/lang/String;", TestConst::Str("k"))
            .constant_field(0x0019, "BIG", "J", TestConst::Long(1 << 40))
            .constant_field(0x0019, "PI", "D", TestConst::Double(3.5))
            .build();
        let model = full(&bytes);
        assert_eq!(model.fields[0].constant, Some(ConstantValue::Int(42)));
        assert_eq!(
            model.fields[1].constant,
            Some(ConstantValue::String("k".to_string()))
        );
        assert_eq!(model.fields[2].constant, Some(ConstantValue::Long(1 << 40)));
        assert_eq!(
            model.fields[3].constant,
            Some(ConstantValue::Double(3.5f64.to_bits()))
        );
        assert!(model.fields.iter().all(|f| f.is_constant()));
    }

    #[test]
    fn drops_private_fields_that_cannot_matter() {
        let bytes = ClassBuilder::new("p/C")
            .field(0x0002, "n", "I")
            .field(0x0002, "ns", "[J")
            .field(0x0002, "s", "Ljava/lang/String;")
            .field(0x0002, "d", "[Lp/D;")
            .field(0x0000, "m", "I")
            .build();
        let is_project = |c: &str| c.starts_with("p/");
        let model = parse_class(&bytes, &ParseOptions::full(&is_project)).unwrap();
        let names: Vec<&str> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["d", "m"]);
    }

    #[test]
    fn records_directly_nested_classes_only() {
        let bytes = ClassBuilder::new("p/Outer")
            .inner("p/Outer$Member", Some("p/Outer"), Some("Member"), 0x000A)
            .inner("p/Outer$Member$Deep", Some("p/Outer$Member"), Some("Deep"), 0x0001)
            .inner("p/Outer$1", None, None, 0x0000)
            .inner("p/Outer$2Local", None, Some("Local"), 0x0000)
            .inner("java/util/Map$Entry", Some("java/util/Map"), Some("Entry"), 0x0609)
            .build();
        let model = full(&bytes);
        let nested: Vec<(&str, bool)> = model
            .nested
            .iter()
            .map(|n| (n.name.as_str(), n.local))
            .collect();
        assert_eq!(
            nested,
            vec![
                ("p/Outer$Member", false),
                ("p/Outer$1", true),
                ("p/Outer$2Local", true)
            ]
        );
        assert!(model.nested[0].access.is_private());
    }

    #[test]
    fn nested_class_takes_flags_from_inner_classes() {
        let bytes = ClassBuilder::new("p/Outer$Member")
            .access(0x0020)
            .inner("p/Outer$Member", Some("p/Outer"), Some("Member"), 0x0004 | 0x0008)
            .build();
        let model = full(&bytes);
        assert!(model.access.contains(AccessFlags::PROTECTED));
        assert!(model.access.is_static());
        assert_eq!(model.enclosing.as_deref(), Some("p/Outer"));
    }

    #[test]
    fn local_class_naming_depends_on_target() {
        assert!(is_local_class_of("p/A$B", "p/A$B$1", 52));
        assert!(!is_local_class_of("p/A$B", "p/A$B$1", 48));
        assert!(is_local_class_of("p/A", "p/A$1", 48));
        assert!(!is_local_class_of("p/A", "p/A$B", 52));
        assert!(!is_local_class_of("p/A", "p/A$1$2", 52));
    }

    #[test]
    fn rejects_bad_magic_and_versions() {
        let mut bytes = ClassBuilder::new("p/C").build();
        bytes[0] = 0;
        let err = parse_class(&bytes, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.reason.contains("bad magic"));

        let old = ClassBuilder::new("p/C").major(44).build();
        let err = parse_class(&old, &ParseOptions::default()).unwrap_err();
        assert!(err.reason.contains("unsupported class file version 44"));

        let new = ClassBuilder::new("p/C").major(MAX_MAJOR + 1).build();
        assert!(parse_class(&new, &ParseOptions::default()).is_err());
    }

    #[test]
    fn truncated_class_fails_with_offset() {
        let bytes = ClassBuilder::new("p/C").method(0x0001, "m", "()V").build();
        let err = parse_class(&bytes[..bytes.len() - 5], &ParseOptions::default()).unwrap_err();
        assert!(err.offset > 10);
    }

    #[test]
    fn decodes_modified_utf8() {
        assert_eq!(decode_modified_utf8(&[0x61, 0xC0, 0x80]).as_deref(), Some("a\0"));
        // U+1F600 as a CESU-8 surrogate pair.
        let bytes = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&bytes).as_deref(), Some("\u{1F600}"));
        assert!(decode_modified_utf8(&[0xFF]).is_none());
    }

    #[test]
    fn trims_array_class_names() {
        assert_eq!(trim_class_name("[[Lp/C;"), Some("p/C"));
        assert_eq!(trim_class_name("[I"), None);
        assert_eq!(trim_class_name("p/C"), Some("p/C"));
    }
}
