//! Structural snapshot of one version of one class.
//!
//! A `ClassModel` is plain data: everything the compatibility checker and
//! reference finder need, decoded once from a class file. Names are
//! slash-separated (`java/lang/Object`). Type descriptors are stored in a
//! normalized form where every embedded class reference is written as
//! `@name#` instead of `Lname;`, so "does this signature mention class X" is a
//! substring search for `@X#`.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Package,
    Protected,
    Public,
}

impl AccessFlags {
    pub fn visibility(self) -> Visibility {
        if self.contains(AccessFlags::PUBLIC) {
            Visibility::Public
        } else if self.contains(AccessFlags::PROTECTED) {
            Visibility::Protected
        } else if self.contains(AccessFlags::PRIVATE) {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }

    pub fn is_public(self) -> bool {
        self.contains(AccessFlags::PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(AccessFlags::FINAL)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(AccessFlags::ABSTRACT)
    }

    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }
}

/// Value of a `static final` field initialized with a compile-time constant.
/// Floating-point values are kept as raw bits so equality is bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub signature: String,
    #[serde(serialize_with = "serialize_flags")]
    pub access: AccessFlags,
    pub constant: Option<ConstantValue>,
}

impl FieldInfo {
    pub fn is_constant(&self) -> bool {
        self.constant.is_some() && self.access.is_static() && self.access.is_final()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub signature: String,
    #[serde(serialize_with = "serialize_flags")]
    pub access: AccessFlags,
    pub exceptions: Vec<String>,
}

impl MethodInfo {
    pub fn is_class_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    pub fn parameter_count(&self) -> usize {
        parameter_count(&self.signature)
    }
}

pub trait Member {
    fn name(&self) -> &str;
    fn signature(&self) -> &str;
    fn access(&self) -> AccessFlags;
}

impl Member for FieldInfo {
    fn name(&self) -> &str {
        &self.name
    }
    fn signature(&self) -> &str {
        &self.signature
    }
    fn access(&self) -> AccessFlags {
        self.access
    }
}

impl Member for MethodInfo {
    fn name(&self) -> &str {
        &self.name
    }
    fn signature(&self) -> &str {
        &self.signature
    }
    fn access(&self) -> AccessFlags {
        self.access
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedClass {
    pub name: String,
    #[serde(serialize_with = "serialize_flags")]
    pub access: AccessFlags,
    /// Local or anonymous class: declared inside a method body, never
    /// referenced by name from outside.
    pub local: bool,
}

/// A field or method reference recorded in a class's constant pool. `class`
/// is the class the reference was compiled against, which may be a subclass
/// of the class that actually declares the member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub signature: String,
}

/// Major version of the first class file format using the current naming
/// scheme for local and anonymous classes (Java 5).
pub const JAVA5_MAJOR: u16 = 49;

/// Target marker used when the compiler target is unknown. Treated like the
/// old naming scheme.
pub const TARGET_UNKNOWN: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClassModel {
    pub name: String,
    pub package: String,
    #[serde(serialize_with = "serialize_flags")]
    pub access: AccessFlags,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub nested: Vec<NestedClass>,
    pub target: u16,
    pub referenced_classes: Vec<String>,
    pub referenced_fields: Vec<MemberRef>,
    pub referenced_methods: Vec<MemberRef>,
    pub referenced_interface_methods: Vec<MemberRef>,
    /// Directly enclosing class for nested classes. Derived, not persisted.
    pub enclosing: Option<String>,
    /// Only name, super class, interfaces and flags are populated.
    pub lightweight: bool,
}

impl ClassModel {
    pub fn new(name: impl Into<String>) -> Self {
        let mut model = ClassModel {
            name: name.into(),
            ..ClassModel::default()
        };
        model.restore_derived();
        model
    }

    /// Recomputes every field that is not persisted by the database codec.
    /// `enclosing` needs the whole project and is linked separately.
    pub fn restore_derived(&mut self) {
        self.package = package_of(&self.name).to_string();
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    pub fn is_nested(&self) -> bool {
        self.enclosing.is_some()
    }

    pub fn top_level_name(&self) -> &str {
        top_level_of(&self.name)
    }

    pub fn field(&self, name: &str, signature: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.signature == signature)
    }

    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldInfo> + 'a {
        self.fields.iter().filter(move |f| f.name == name)
    }

    pub fn method(&self, name: &str, signature: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.signature == signature)
    }

    pub fn methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MethodInfo> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn references_class(&self, class: &str) -> bool {
        self.referenced_classes.iter().any(|c| c == class)
    }

    /// True if `class` appears in any type position this class declares:
    /// super class, interfaces, field types, parameter and return types,
    /// and thrown exceptions.
    pub fn mentions_in_type_positions(&self, class: &str) -> bool {
        if self.superclass.as_deref() == Some(class) || self.interfaces.iter().any(|i| i == class)
        {
            return true;
        }
        let needle = class_sentinel(class);
        self.fields.iter().any(|f| f.signature.contains(&needle))
            || self.methods.iter().any(|m| {
                m.signature.contains(&needle) || m.exceptions.iter().any(|e| e == class)
            })
    }

    pub fn member_refs(&self) -> impl Iterator<Item = &MemberRef> {
        self.referenced_fields
            .iter()
            .chain(self.referenced_methods.iter())
            .chain(self.referenced_interface_methods.iter())
    }

    pub fn nested_names(&self) -> impl Iterator<Item = &str> {
        self.nested.iter().map(|n| n.name.as_str())
    }
}

pub fn package_of(class: &str) -> &str {
    match class.rfind('/') {
        Some(idx) => &class[..idx],
        None => "",
    }
}

pub fn top_level_of(class: &str) -> &str {
    let simple_start = class.rfind('/').map(|i| i + 1).unwrap_or(0);
    match class[simple_start..].find('$') {
        Some(idx) if idx > 0 => &class[..simple_start + idx],
        _ => class,
    }
}

pub fn class_sentinel(class: &str) -> String {
    format!("@{class}#")
}

/// Rewrites a JVM descriptor (`(Ljava/lang/String;[I)V`) into normalized
/// form (`(@java/lang/String#[I)V`).
pub fn normalize_descriptor(descriptor: &str) -> String {
    let mut out = String::with_capacity(descriptor.len());
    let mut in_class = false;
    for ch in descriptor.chars() {
        if in_class {
            if ch == ';' {
                out.push('#');
                in_class = false;
            } else {
                out.push(ch);
            }
        } else if ch == 'L' {
            out.push('@');
            in_class = true;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn denormalize_descriptor(signature: &str) -> String {
    signature.replace('@', "L").replace('#', ";")
}

pub fn signature_classes(signature: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = signature;
    while let Some(start) = rest.find('@') {
        let after = &rest[start + 1..];
        match after.find('#') {
            Some(end) => {
                out.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    out
}

pub fn parameter_count(signature: &str) -> usize {
    let Some(params) = signature
        .strip_prefix('(')
        .and_then(|s| s.split_once(')'))
        .map(|(p, _)| p)
    else {
        return 0;
    };
    let mut count = 0;
    let mut chars = params.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '[' => continue,
            '@' => {
                for c in chars.by_ref() {
                    if c == '#' {
                        break;
                    }
                }
                count += 1;
            }
            _ => count += 1,
        }
    }
    count
}

fn serialize_flags<S: serde::Serializer>(flags: &AccessFlags, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(flags.bits())
}
