//! Whole-project search for classes that depend on a changed entity.
//!
//! Every query scans the persisted (old) models only. A class is reported
//! only if the entity was accessible to it under the old visibility, since an
//! inaccessible entity could not have been referenced.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tracing::warn;

use crate::classpath::ClassPath;
use crate::config::DependentArchivePolicy;
use crate::error::{MakeError, MakeResult};
use crate::model::{
    AccessFlags, ClassModel, MemberRef, Visibility, package_of, parameter_count, top_level_of,
};
use crate::project::{ProjectDirectory, ProjectEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Thoroughness {
    /// The class appears in the client's constant pool.
    Direct,
    /// Direct, or the class appears in a declared type position.
    TypePositions,
    /// Type positions, or the class is a transitive supertype of the client.
    Hierarchy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone)]
struct TypeInfo {
    superclass: Option<String>,
    interfaces: Vec<String>,
}

pub struct ReferenceFinder<'a> {
    dir: &'a ProjectDirectory,
    classpath: &'a ClassPath,
    policy: DependentArchivePolicy,
    supertypes: RefCell<HashMap<String, Rc<Vec<String>>>>,
}

impl<'a> ReferenceFinder<'a> {
    pub fn new(
        dir: &'a ProjectDirectory,
        classpath: &'a ClassPath,
        policy: DependentArchivePolicy,
    ) -> Self {
        Self {
            dir,
            classpath,
            policy,
            supertypes: RefCell::new(HashMap::new()),
        }
    }

    pub fn project_model(&self, class: &str) -> Option<&'a ClassModel> {
        self.dir
            .get(class)
            .and_then(|e| e.old_model().or_else(|| e.new_model()))
    }

    fn type_info(&self, class: &str) -> MakeResult<Option<TypeInfo>> {
        if let Some(model) = self.project_model(class) {
            return Ok(Some(TypeInfo {
                superclass: model.superclass.clone(),
                interfaces: model.interfaces.clone(),
            }));
        }
        Ok(self.classpath.lightweight(class)?.map(|m| TypeInfo {
            superclass: m.superclass.clone(),
            interfaces: m.interfaces.clone(),
        }))
    }

    /// Every transitive super class and interface of `class`, nearest first.
    /// Unknown classes simply end the walk.
    pub fn supertypes(&self, class: &str) -> MakeResult<Rc<Vec<String>>> {
        if let Some(cached) = self.supertypes.borrow().get(class) {
            return Ok(cached.clone());
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        if let Some(info) = self.type_info(class)? {
            queue.extend(info.superclass);
            queue.extend(info.interfaces);
        }
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(info) = self.type_info(&next)? {
                queue.extend(info.superclass);
                queue.extend(info.interfaces);
            }
            out.push(next);
        }
        let out = Rc::new(out);
        self.supertypes
            .borrow_mut()
            .insert(class.to_string(), out.clone());
        Ok(out)
    }

    pub fn supertypes_of_model(&self, model: &ClassModel) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for direct in model.superclass.iter().chain(model.interfaces.iter()) {
            out.insert(direct.clone());
            out.extend(self.supertypes(direct)?.iter().cloned());
        }
        Ok(out)
    }

    pub fn is_subtype(&self, class: &str, ancestor: &str) -> MakeResult<bool> {
        Ok(self.supertypes(class)?.iter().any(|s| s == ancestor))
    }

    /// Follows a member reference compiled against `recorded` up its super
    /// class chain and returns the class that actually declares the member.
    /// The walk stops at `declaring` or at the first class redeclaring the
    /// member, whichever comes first. `None` means the chain never reaches a
    /// declaration the project knows about.
    pub fn resolve_declaring(
        &self,
        recorded: &str,
        declaring: &str,
        name: &str,
        signature: &str,
        kind: MemberKind,
    ) -> MakeResult<Option<String>> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([recorded.to_string()]);
        while let Some(class) = queue.pop_front() {
            if !seen.insert(class.clone()) {
                continue;
            }
            if class == declaring {
                return Ok(Some(class));
            }
            if let Some(model) = self.project_model(&class) {
                let declares = match kind {
                    MemberKind::Field => model.field(name, signature).is_some(),
                    MemberKind::Method => model.method(name, signature).is_some(),
                };
                if declares {
                    return Ok(Some(class));
                }
            }
            if let Some(info) = self.type_info(&class)? {
                queue.extend(info.superclass);
                // Fields and default methods can also be inherited from
                // interfaces.
                queue.extend(info.interfaces);
            }
        }
        Ok(None)
    }

    pub fn can_access(&self, client: &ClassModel, owner: &str, vis: Visibility) -> MakeResult<bool> {
        Ok(match vis {
            Visibility::Public => true,
            Visibility::Package => client.package == package_of(owner),
            Visibility::Protected => {
                if client.package == package_of(owner) {
                    true
                } else {
                    // A nested class of a subclass also sees protected members.
                    let mut current = Some(client.name.clone());
                    let mut found = false;
                    let mut steps = 0;
                    while let Some(name) = current {
                        if self.is_subtype(&name, owner)? {
                            found = true;
                            break;
                        }
                        steps += 1;
                        if steps > self.dir.len() {
                            break;
                        }
                        current = self
                            .project_model(&name)
                            .and_then(|m| m.enclosing.clone())
                            .filter(|outer| *outer != name);
                    }
                    found
                }
            }
            Visibility::Private => top_level_of(&client.name) == top_level_of(owner),
        })
    }

    fn lost_access(
        &self,
        client: &ClassModel,
        owner: &str,
        old: Visibility,
        still: Option<Visibility>,
    ) -> MakeResult<bool> {
        if !self.can_access(client, owner, old)? {
            return Ok(false);
        }
        match still {
            Some(new) => Ok(!self.can_access(client, owner, new)?),
            None => Ok(true),
        }
    }

    pub fn references_class(
        &self,
        client: &ClassModel,
        class: &str,
        level: Thoroughness,
    ) -> MakeResult<bool> {
        if client.references_class(class) {
            return Ok(true);
        }
        if level >= Thoroughness::TypePositions && client.mentions_in_type_positions(class) {
            return Ok(true);
        }
        if level >= Thoroughness::Hierarchy && self.is_subtype(&client.name, class)? {
            return Ok(true);
        }
        Ok(false)
    }

    fn clients(&self) -> impl Iterator<Item = (&'a ProjectEntry, &'a ClassModel)> + 'a {
        self.dir
            .entries()
            .filter_map(|e| e.old_model().map(|m| (e, m)))
    }

    /// Records `entry` as affected by a change to `changed`. Archive classes
    /// cannot be recompiled and go through the dependent-archive policy.
    fn admit(
        &self,
        changed: &str,
        entry: &ProjectEntry,
        out: &mut BTreeSet<String>,
    ) -> MakeResult<()> {
        if entry.class_name == changed {
            return Ok(());
        }
        if entry.is_archive() {
            match self.policy {
                DependentArchivePolicy::Ignore => {}
                DependentArchivePolicy::Warn => warn!(
                    class = %entry.class_name,
                    archive = %entry.source,
                    changed,
                    "archive class depends on an incompatible change and cannot be recompiled"
                ),
                DependentArchivePolicy::Fail => {
                    return Err(MakeError::DependentArchive {
                        class: entry.class_name.clone(),
                        archive: entry.source.clone(),
                        changed: changed.to_string(),
                    });
                }
            }
            return Ok(());
        }
        out.insert(entry.class_name.clone());
        Ok(())
    }

    pub fn subclasses(&self, class: &str, direct_only: bool) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            let hit = if direct_only {
                client.superclass.as_deref() == Some(class)
                    || client.interfaces.iter().any(|i| i == class)
            } else {
                self.is_subtype(&client.name, class)?
            };
            if hit {
                self.admit(class, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    pub fn concrete_subclasses(&self, class: &str) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if !client.access.is_abstract()
                && !client.is_interface()
                && self.is_subtype(&client.name, class)?
            {
                self.admit(class, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    pub fn class_references(
        &self,
        owner: &str,
        old: Visibility,
        still: Option<Visibility>,
        level: Thoroughness,
    ) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if self.lost_access(client, owner, old, still)?
                && self.references_class(client, owner, level)?
            {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Every dependent of a class that no longer exists. Any kind of
    /// reference counts.
    pub fn deleted_class_dependents(&self, class: &str) -> MakeResult<BTreeSet<String>> {
        let old_vis = self
            .project_model(class)
            .map(|m| m.access.visibility())
            .unwrap_or(Visibility::Public);
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if !self.can_access(client, class, old_vis)? {
                continue;
            }
            let hit = self.references_class(client, class, Thoroughness::Hierarchy)?
                || client.member_refs().any(|r| r.class == class)
                || client
                    .nested
                    .iter()
                    .any(|n| n.name == class && !n.local);
            if hit {
                self.admit(class, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    fn refs_of_kind(client: &ClassModel, kind: MemberKind) -> Box<dyn Iterator<Item = &MemberRef> + '_> {
        match kind {
            MemberKind::Field => Box::new(client.referenced_fields.iter()),
            MemberKind::Method => Box::new(
                client
                    .referenced_methods
                    .iter()
                    .chain(client.referenced_interface_methods.iter()),
            ),
        }
    }

    pub fn member_references(
        &self,
        owner: &str,
        name: &str,
        signature: &str,
        kind: MemberKind,
        old: Visibility,
        still: Option<Visibility>,
    ) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if !self.lost_access(client, owner, old, still)? {
                continue;
            }
            let mut hit = false;
            for r in Self::refs_of_kind(client, kind) {
                if r.name != name || r.signature != signature {
                    continue;
                }
                if r.class == owner
                    || self
                        .resolve_declaring(&r.class, owner, name, signature, kind)?
                        .as_deref()
                        == Some(owner)
                {
                    hit = true;
                    break;
                }
            }
            if hit {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Every class that could legally read a member of `owner` with
    /// visibility `vis`, referenced or not. Compile-time constants are
    /// inlined and leave no reference behind.
    pub fn accessible_clients(&self, owner: &str, vis: Visibility) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if self.can_access(client, owner, vis)? {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Classes referencing a field called `name` through `owner` or one of
    /// its subclasses. Used when a new field may hide an inherited one.
    pub fn field_name_references(&self, owner: &str, name: &str) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            let mut hit = false;
            for r in &client.referenced_fields {
                if r.name == name && (r.class == owner || self.is_subtype(&r.class, owner)?) {
                    hit = true;
                    break;
                }
            }
            if hit {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Classes calling a method called `name` with `params` parameters
    /// through `owner` or a subclass. A new overload of that arity may change
    /// which method such calls select.
    pub fn overload_references(
        &self,
        owner: &str,
        name: &str,
        params: usize,
        vis: Visibility,
    ) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if !self.can_access(client, owner, vis)? {
                continue;
            }
            let mut hit = false;
            for r in Self::refs_of_kind(client, MemberKind::Method) {
                if r.name == name
                    && parameter_count(&r.signature) == params
                    && (r.class == owner || self.is_subtype(&r.class, owner)?)
                {
                    hit = true;
                    break;
                }
            }
            if hit {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    pub fn overriding_subclasses(
        &self,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if client.method(name, signature).is_some() && self.is_subtype(&client.name, owner)? {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Concrete project subclasses of `owner` with no concrete
    /// implementation of the method between themselves and `owner`.
    pub fn concrete_subclasses_missing(
        &self,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> MakeResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if client.access.is_abstract()
                || client.is_interface()
                || !self.is_subtype(&client.name, owner)?
            {
                continue;
            }
            if !self.implements_concretely(client, owner, name, signature) {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    fn implements_concretely(
        &self,
        client: &ClassModel,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> bool {
        let mut current = Some(client);
        let mut steps = 0;
        while let Some(model) = current {
            if model.name == owner || steps > self.dir.len() {
                return false;
            }
            if model
                .method(name, signature)
                .is_some_and(|m| !m.access.contains(AccessFlags::ABSTRACT))
            {
                return true;
            }
            current = model
                .superclass
                .as_deref()
                .and_then(|s| self.project_model(s));
            steps += 1;
        }
        false
    }

    pub fn nestmates(&self, owner: &str) -> MakeResult<BTreeSet<String>> {
        let top = top_level_of(owner);
        let mut out = BTreeSet::new();
        for (entry, client) in self.clients() {
            if client.top_level_name() == top {
                self.admit(owner, entry, &mut out)?;
            }
        }
        Ok(out)
    }

    pub fn inherits_field(&self, class: &ClassModel, name: &str) -> MakeResult<bool> {
        for superclass in self.supertypes_of_model(class)? {
            if let Some(model) = self.project_model(&superclass)
                && model.fields_named(name).any(|f| !f.access.is_private())
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn inherits_method_arity(
        &self,
        class: &ClassModel,
        name: &str,
        params: usize,
    ) -> MakeResult<bool> {
        for superclass in self.supertypes_of_model(class)? {
            if let Some(model) = self.project_model(&superclass)
                && model
                    .methods_named(name)
                    .any(|m| !m.access.is_private() && m.parameter_count() == params)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
