use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::archive::Archive;
use crate::classfile::{ParseOptions, parse_class};
use crate::config::ClassPathConfig;
use crate::error::{MakeError, MakeResult};
use crate::model::ClassModel;
use crate::scan::{is_archive, scan_jars};

#[derive(Debug, Clone)]
enum Root {
    Dir(PathBuf),
    Archive(PathBuf),
}

pub struct ClassPath {
    roots: Vec<Root>,
    archives: RefCell<HashMap<PathBuf, Archive>>,
    models: RefCell<HashMap<String, Option<Rc<ClassModel>>>>,
}

impl ClassPath {
    pub fn empty() -> Self {
        Self::from_roots(Vec::new())
    }

    fn from_roots(roots: Vec<Root>) -> Self {
        Self {
            roots,
            archives: RefCell::new(HashMap::new()),
            models: RefCell::new(HashMap::new()),
        }
    }

    /// Search order: boot, extension archives, standard, virtual, project
    /// archives.
    pub fn new(config: &ClassPathConfig) -> MakeResult<Self> {
        let mut paths: Vec<PathBuf> = config.boot.clone();
        for dir in &config.ext_dirs {
            if !dir.is_dir() {
                continue;
            }
            let jars = scan_jars(dir).map_err(|e| MakeError::Config {
                reason: format!("cannot list extension directory {}: {e}", dir.display()),
            })?;
            paths.extend(jars);
        }
        paths.extend(config.standard.iter().cloned());
        paths.extend(config.virtual_path.iter().cloned());
        paths.extend(config.project_archives.iter().cloned());

        let roots = paths
            .into_iter()
            .filter_map(|p| {
                if p.is_dir() {
                    Some(Root::Dir(p))
                } else if p.is_file() && is_archive(&p) {
                    Some(Root::Archive(p))
                } else {
                    debug!(path = %p.display(), "skipping missing class path element");
                    None
                }
            })
            .collect();
        Ok(Self::from_roots(roots))
    }

    pub fn find_bytes(&self, class: &str) -> MakeResult<Option<(String, Vec<u8>)>> {
        let member = format!("{class}.class");
        for root in &self.roots {
            match root {
                Root::Dir(dir) => {
                    let path = dir.join(&member);
                    if path.is_file() {
                        let bytes = std::fs::read(&path).map_err(|e| MakeError::io(&path, e))?;
                        return Ok(Some((path.display().to_string(), bytes)));
                    }
                }
                Root::Archive(jar) => {
                    if let Some(bytes) = self.read_member(jar, &member)? {
                        return Ok(Some((format!("{}!{member}", jar.display()), bytes)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn read_member(&self, jar: &Path, member: &str) -> MakeResult<Option<Vec<u8>>> {
        let mut archives = self.archives.borrow_mut();
        if !archives.contains_key(jar) {
            archives.insert(jar.to_path_buf(), Archive::open(jar)?);
        }
        match archives.get_mut(jar) {
            Some(archive) => archive.read(member),
            None => Ok(None),
        }
    }

    /// Name, super class, interfaces and flags of a class outside the
    /// project, or `None` if the class path does not have it.
    pub fn lightweight(&self, class: &str) -> MakeResult<Option<Rc<ClassModel>>> {
        if let Some(cached) = self.models.borrow().get(class) {
            return Ok(cached.clone());
        }
        let model = match self.find_bytes(class)? {
            Some((origin, bytes)) => {
                let model = parse_class(&bytes, &ParseOptions::shallow()).map_err(|e| {
                    MakeError::ClassParse {
                        file: origin,
                        offset: e.offset,
                        reason: e.reason,
                    }
                })?;
                Some(Rc::new(model))
            }
            None => None,
        };
        self.models
            .borrow_mut()
            .insert(class.to_string(), model.clone());
        Ok(model)
    }
}
