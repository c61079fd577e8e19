use std::collections::HashMap;
use std::path::Path;

use crate::model::ClassModel;
use crate::project::{ClassVersion, ProjectDirectory, ProjectEntry};
use crate::classfile::{ParseOptions, parse_class};

#[derive(Debug, Clone, Copy)]
pub enum TestConst {
    Int(i32),
    Long(i64),
    Double(f64),
    Str(&'static str),
}

#[derive(Default)]
struct Pool {
    entries: Vec<u8>,
    index: HashMap<Vec<u8>, u16>,
    next: u16,
}

impl Pool {
    fn new() -> Self {
        Self {
            next: 1,
            ..Self::default()
        }
    }

    fn add(&mut self, entry: Vec<u8>, slots: u16) -> u16 {
        if let Some(&idx) = self.index.get(&entry) {
            return idx;
        }
        let idx = self.next;
        self.entries.extend_from_slice(&entry);
        self.index.insert(entry, idx);
        self.next += slots;
        idx
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let mut e = vec![1u8];
        e.extend_from_slice(&(s.len() as u16).to_be_bytes());
        e.extend_from_slice(s.as_bytes());
        self.add(e, 1)
    }

    fn class(&mut self, name: &str) -> u16 {
        let n = self.utf8(name);
        let mut e = vec![7u8];
        e.extend_from_slice(&n.to_be_bytes());
        self.add(e, 1)
    }

    fn name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let n = self.utf8(name);
        let d = self.utf8(desc);
        let mut e = vec![12u8];
        e.extend_from_slice(&n.to_be_bytes());
        e.extend_from_slice(&d.to_be_bytes());
        self.add(e, 1)
    }

    fn member(&mut self, tag: u8, class: &str, name: &str, desc: &str) -> u16 {
        let c = self.class(class);
        let nt = self.name_and_type(name, desc);
        let mut e = vec![tag];
        e.extend_from_slice(&c.to_be_bytes());
        e.extend_from_slice(&nt.to_be_bytes());
        self.add(e, 1)
    }

    fn constant(&mut self, value: TestConst) -> u16 {
        match value {
            TestConst::Int(v) => {
                let mut e = vec![3u8];
                e.extend_from_slice(&v.to_be_bytes());
                self.add(e, 1)
            }
            TestConst::Long(v) => {
                let mut e = vec![5u8];
                e.extend_from_slice(&v.to_be_bytes());
                self.add(e, 2)
            }
            TestConst::Double(v) => {
                let mut e = vec![6u8];
                e.extend_from_slice(&v.to_bits().to_be_bytes());
                self.add(e, 2)
            }
            TestConst::Str(s) => {
                let u = self.utf8(s);
                let mut e = vec![8u8];
                e.extend_from_slice(&u.to_be_bytes());
                self.add(e, 1)
            }
        }
    }
}

#[derive(Clone)]
struct FieldSpec {
    access: u16,
    name: String,
    desc: String,
    constant: Option<TestConst>,
}

#[derive(Clone)]
struct MethodSpec {
    access: u16,
    name: String,
    desc: String,
    exceptions: Vec<String>,
}

#[derive(Clone)]
struct InnerSpec {
    inner: String,
    outer: Option<String>,
    simple: Option<String>,
    flags: u16,
}

/// Fluent builder for a class file. Defaults: public class extending
/// `java/lang/Object`, Java 8 format.
#[derive(Clone)]
pub struct ClassBuilder {
    name: String,
    access: u16,
    superclass: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    inner: Vec<InnerSpec>,
    class_refs: Vec<String>,
    member_refs: Vec<(u8, String, String, String)>,
    major: u16,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: 0x0021,
            superclass: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner: Vec::new(),
            class_refs: Vec::new(),
            member_refs: Vec::new(),
            major: 52,
        }
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access = flags;
        self
    }

    pub fn major(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, desc: &str) -> Self {
        self.fields.push(FieldSpec {
            access,
            name: name.to_string(),
            desc: desc.to_string(),
            constant: None,
        });
        self
    }

    pub fn constant_field(mut self, access: u16, name: &str, desc: &str, value: TestConst) -> Self {
        self.fields.push(FieldSpec {
            access,
            name: name.to_string(),
            desc: desc.to_string(),
            constant: Some(value),
        });
        self
    }

    pub fn method(self, access: u16, name: &str, desc: &str) -> Self {
        self.method_throws(access, name, desc, &[])
    }

    pub fn method_throws(mut self, access: u16, name: &str, desc: &str, exceptions: &[&str]) -> Self {
        self.methods.push(MethodSpec {
            access,
            name: name.to_string(),
            desc: desc.to_string(),
            exceptions: exceptions.iter().map(|e| e.to_string()).collect(),
        });
        self
    }

    pub fn inner(mut self, inner: &str, outer: Option<&str>, simple: Option<&str>, flags: u16) -> Self {
        self.inner.push(InnerSpec {
            inner: inner.to_string(),
            outer: outer.map(str::to_string),
            simple: simple.map(str::to_string),
            flags,
        });
        self
    }

    pub fn uses_class(mut self, class: &str) -> Self {
        self.class_refs.push(class.to_string());
        self
    }

    pub fn uses_field(mut self, class: &str, name: &str, desc: &str) -> Self {
        self.member_refs
            .push((9, class.to_string(), name.to_string(), desc.to_string()));
        self
    }

    pub fn calls(mut self, class: &str, name: &str, desc: &str) -> Self {
        self.member_refs
            .push((10, class.to_string(), name.to_string(), desc.to_string()));
        self
    }

    pub fn calls_interface(mut self, class: &str, name: &str, desc: &str) -> Self {
        self.member_refs
            .push((11, class.to_string(), name.to_string(), desc.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::new();
        let this = pool.class(&self.name);
        let sup = self.superclass.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        for c in &self.class_refs {
            pool.class(c);
        }
        for (tag, class, name, desc) in &self.member_refs {
            pool.member(*tag, class, name, desc);
        }

        let mut body = Vec::new();
        body.extend_from_slice(&self.access.to_be_bytes());
        body.extend_from_slice(&this.to_be_bytes());
        body.extend_from_slice(&sup.to_be_bytes());
        body.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
        for i in interfaces {
            body.extend_from_slice(&i.to_be_bytes());
        }

        body.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for f in &self.fields {
            let name = pool.utf8(&f.name);
            let desc = pool.utf8(&f.desc);
            body.extend_from_slice(&f.access.to_be_bytes());
            body.extend_from_slice(&name.to_be_bytes());
            body.extend_from_slice(&desc.to_be_bytes());
            match f.constant {
                Some(value) => {
                    let attr = pool.utf8("ConstantValue");
                    let idx = pool.constant(value);
                    body.extend_from_slice(&1u16.to_be_bytes());
                    body.extend_from_slice(&attr.to_be_bytes());
                    body.extend_from_slice(&2u32.to_be_bytes());
                    body.extend_from_slice(&idx.to_be_bytes());
                }
                None => body.extend_from_slice(&0u16.to_be_bytes()),
            }
        }

        body.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for m in &self.methods {
            let name = pool.utf8(&m.name);
            let desc = pool.utf8(&m.desc);
            body.extend_from_slice(&m.access.to_be_bytes());
            body.extend_from_slice(&name.to_be_bytes());
            body.extend_from_slice(&desc.to_be_bytes());
            if m.exceptions.is_empty() {
                body.extend_from_slice(&0u16.to_be_bytes());
            } else {
                let attr = pool.utf8("Exceptions");
                let ex: Vec<u16> = m.exceptions.iter().map(|e| pool.class(e)).collect();
                body.extend_from_slice(&1u16.to_be_bytes());
                body.extend_from_slice(&attr.to_be_bytes());
                body.extend_from_slice(&(2 + 2 * ex.len() as u32).to_be_bytes());
                body.extend_from_slice(&(ex.len() as u16).to_be_bytes());
                for e in ex {
                    body.extend_from_slice(&e.to_be_bytes());
                }
            }
        }

        if self.inner.is_empty() {
            body.extend_from_slice(&0u16.to_be_bytes());
        } else {
            let attr = pool.utf8("InnerClasses");
            let mut entries = Vec::new();
            for spec in &self.inner {
                let inner = pool.class(&spec.inner);
                let outer = spec.outer.as_deref().map(|o| pool.class(o)).unwrap_or(0);
                let simple = spec.simple.as_deref().map(|s| pool.utf8(s)).unwrap_or(0);
                entries.extend_from_slice(&inner.to_be_bytes());
                entries.extend_from_slice(&outer.to_be_bytes());
                entries.extend_from_slice(&simple.to_be_bytes());
                entries.extend_from_slice(&spec.flags.to_be_bytes());
            }
            body.extend_from_slice(&1u16.to_be_bytes());
            body.extend_from_slice(&attr.to_be_bytes());
            body.extend_from_slice(&(2 + entries.len() as u32).to_be_bytes());
            body.extend_from_slice(&(self.inner.len() as u16).to_be_bytes());
            body.extend_from_slice(&entries);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&pool.next.to_be_bytes());
        out.extend_from_slice(&pool.entries);
        out.extend_from_slice(&body);
        out
    }

    pub fn model(&self) -> ClassModel {
        parse_class(&self.build(), &ParseOptions::default()).expect("builder output parses")
    }

    pub fn write_to(&self, dest: &Path) -> std::io::Result<std::path::PathBuf> {
        let path = dest.join(format!("{}.class", self.name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.build())?;
        Ok(path)
    }
}

/// A project directory whose persisted state holds the given classes, one
/// source per top-level class.
pub fn old_directory(builders: &[ClassBuilder]) -> ProjectDirectory {
    let entries = builders
        .iter()
        .map(|b| {
            let model = b.model();
            let mut entry = ProjectEntry::from_source(
                model.name.clone(),
                format!("{}.java", model.top_level_name()),
            );
            entry.old = Some(ClassVersion {
                timestamp: 1,
                fingerprint: 1,
                model,
            });
            entry
        })
        .collect();
    ProjectDirectory::from_entries(entries).expect("distinct test classes")
}
