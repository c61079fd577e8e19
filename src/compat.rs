//! Source compatibility of two versions of one class.
//!
//! The rule groups run in a fixed order and never skip each other: each
//! incompatibility implicates its own set of affected classes and all of
//! them are collected. The only early exit is a changed public constant,
//! after which every class is rebuilt anyway.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::MakeResult;
use crate::model::{AccessFlags, ClassModel, FieldInfo, Member, MethodInfo, Visibility};
use crate::project::CheckResult;
use crate::refs::{MemberKind, ReferenceFinder, Thoroughness};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Compatibility {
    pub incompatible: bool,
    pub affected: BTreeSet<String>,
    pub rebuild_all: bool,
    pub reasons: Vec<String>,
}

impl Compatibility {
    pub fn check_result(&self) -> CheckResult {
        if self.incompatible {
            CheckResult::Incompatible
        } else {
            CheckResult::Compatible
        }
    }
}

/// Position of `name`/`signature` in `members`, scanning from `hint` to the
/// end and then wrapping around. Edits rarely reorder members, so the match
/// is usually found at or just after the old position.
pub fn find_member<M: Member>(members: &[M], name: &str, signature: &str, hint: usize) -> Option<usize> {
    let len = members.len();
    if len == 0 {
        return None;
    }
    let start = hint.min(len - 1);
    (start..len)
        .chain(0..start)
        .find(|&i| members[i].name() == name && members[i].signature() == signature)
}

pub fn compare(
    old: &ClassModel,
    new: &ClassModel,
    finder: &ReferenceFinder<'_>,
) -> MakeResult<Compatibility> {
    let mut checker = Checker {
        old,
        new,
        finder,
        out: Compatibility::default(),
    };
    checker.class_flags()?;
    checker.supertypes()?;
    if checker.fields()? {
        return Ok(checker.out);
    }
    checker.methods()?;
    checker.nested_classes()?;
    if !checker.out.incompatible {
        debug!(class = %old.name, "compatible");
    }
    Ok(checker.out)
}

struct Checker<'c, 'f> {
    old: &'c ClassModel,
    new: &'c ClassModel,
    finder: &'c ReferenceFinder<'f>,
    out: Compatibility,
}

fn effective(class: &ClassModel, member: Visibility) -> Visibility {
    class.access.visibility().min(member)
}

impl Checker<'_, '_> {
    fn name(&self) -> &str {
        &self.old.name
    }

    fn incompatible(&mut self, reason: String, affected: BTreeSet<String>) {
        info!(
            class = %self.old.name,
            affected = affected.len(),
            "{reason}"
        );
        if !affected.is_empty() {
            debug!(class = %self.old.name, ?affected, "affected classes");
        }
        self.out.incompatible = true;
        self.out.reasons.push(reason);
        self.out.affected.extend(affected);
    }

    fn class_flags(&mut self) -> MakeResult<()> {
        let (old, new) = (self.old.access, self.new.access);
        let name = self.name().to_string();

        if !old.is_final() && new.is_final() {
            let affected = self.finder.subclasses(&name, true)?;
            self.incompatible(format!("{name} became final"), affected);
        }
        if !old.is_abstract() && new.is_abstract() && !new.is_interface() {
            let affected = self.finder.class_references(
                &name,
                old.visibility(),
                None,
                Thoroughness::Direct,
            )?;
            self.incompatible(format!("{name} became abstract"), affected);
        }
        if old.is_interface() != new.is_interface() {
            let affected = self.finder.class_references(
                &name,
                old.visibility(),
                None,
                Thoroughness::Hierarchy,
            )?;
            self.incompatible(format!("{name} changed between class and interface"), affected);
        }
        if new.visibility() < old.visibility() {
            let affected = self.finder.class_references(
                &name,
                old.visibility(),
                Some(new.visibility()),
                Thoroughness::Hierarchy,
            )?;
            self.incompatible(
                format!(
                    "{name} access narrowed from {:?} to {:?}",
                    old.visibility(),
                    new.visibility()
                ),
                affected,
            );
        }
        if self.old.is_nested() && old.is_static() != new.is_static() {
            let affected = self.finder.class_references(
                &name,
                old.visibility(),
                None,
                Thoroughness::Direct,
            )?;
            self.incompatible(format!("{name} changed static modifier"), affected);
        }
        Ok(())
    }

    fn supertypes(&mut self) -> MakeResult<()> {
        let name = self.name().to_string();
        let old_supers = self.finder.supertypes_of_model(self.old)?;
        let new_supers = self.finder.supertypes_of_model(self.new)?;

        let lost: Vec<&String> = old_supers.difference(&new_supers).collect();
        if !lost.is_empty() {
            let reason = format!("{name} no longer extends or implements {lost:?}");
            let affected = self.finder.class_references(
                &name,
                self.old.access.visibility(),
                None,
                Thoroughness::Hierarchy,
            )?;
            self.incompatible(reason, affected);
        }

        if self.new.access.is_abstract() || self.new.is_interface() {
            let gained: Vec<&String> = self
                .new
                .interfaces
                .iter()
                .filter(|i| !old_supers.contains(*i))
                .collect();
            if !gained.is_empty() {
                let reason = format!("abstract {name} gained interfaces {gained:?}");
                let affected = self.finder.concrete_subclasses(&name)?;
                self.incompatible(reason, affected);
            }
        }
        Ok(())
    }

    /// Returns true when a public constant changed and the comparison must
    /// stop with a global rebuild.
    fn fields(&mut self) -> MakeResult<bool> {
        let (old, new) = (self.old, self.new);
        let name = self.name().to_string();
        let mut matched = vec![false; new.fields.len()];

        for (i, old_field) in old.fields.iter().enumerate() {
            let found = find_member(&new.fields, &old_field.name, &old_field.signature, i);
            let old_vis = effective(old, old_field.access.visibility());
            let Some(j) = found else {
                if old_field.is_constant() {
                    if self.constant_changed(old_field, "deleted")? {
                        return Ok(true);
                    }
                } else {
                    let affected = self.finder.member_references(
                        &name,
                        &old_field.name,
                        &old_field.signature,
                        MemberKind::Field,
                        old_vis,
                        None,
                    )?;
                    self.incompatible(format!("field {name}.{} deleted", old_field.name), affected);
                }
                continue;
            };
            matched[j] = true;
            let new_field = &new.fields[j];

            if old_field.is_constant()
                && (!new_field.is_constant() || new_field.constant != old_field.constant)
                && self.constant_changed(old_field, "changed")?
            {
                return Ok(true);
            }

            let (oa, na) = (old_field.access, new_field.access);
            let new_vis = effective(new, na.visibility());
            if new_vis < old_vis {
                let affected = self.finder.member_references(
                    &name,
                    &old_field.name,
                    &old_field.signature,
                    MemberKind::Field,
                    old_vis,
                    Some(new_vis),
                )?;
                self.incompatible(format!("field {name}.{} access narrowed", old_field.name), affected);
            }
            let flag_change = if oa.is_static() != na.is_static() {
                Some("static")
            } else if !oa.is_final() && na.is_final() {
                Some("final")
            } else if oa.contains(AccessFlags::VOLATILE)
                != na.contains(AccessFlags::VOLATILE)
            {
                Some("volatile")
            } else {
                None
            };
            if let Some(flag) = flag_change {
                let affected = self.finder.member_references(
                    &name,
                    &old_field.name,
                    &old_field.signature,
                    MemberKind::Field,
                    old_vis,
                    None,
                )?;
                self.incompatible(
                    format!("field {name}.{} changed {flag} modifier", old_field.name),
                    affected,
                );
            }
        }

        for (j, new_field) in new.fields.iter().enumerate() {
            if matched[j] || new_field.access.is_private() {
                continue;
            }
            if self.finder.inherits_field(new, &new_field.name)? {
                let affected = self.finder.field_name_references(&name, &new_field.name)?;
                self.incompatible(
                    format!("new field {name}.{} hides an inherited field", new_field.name),
                    affected,
                );
            }
        }
        Ok(false)
    }

    /// A compile-time constant was deleted or changed its value. Every class
    /// that could read it has the old value inlined.
    fn constant_changed(&mut self, field: &FieldInfo, what: &str) -> MakeResult<bool> {
        let name = self.name().to_string();
        let vis = effective(self.old, field.access.visibility());
        let reason = format!("constant {name}.{} {what}", field.name);
        match vis {
            Visibility::Public => {
                info!(class = %name, field = %field.name, "public constant {what}, rebuilding everything");
                self.out.incompatible = true;
                self.out.rebuild_all = true;
                self.out.reasons.push(reason);
                Ok(true)
            }
            Visibility::Private => {
                let affected = self.finder.nestmates(&name)?;
                self.incompatible(reason, affected);
                Ok(false)
            }
            _ => {
                let affected = self.finder.accessible_clients(&name, vis)?;
                self.incompatible(reason, affected);
                Ok(false)
            }
        }
    }

    fn methods(&mut self) -> MakeResult<()> {
        let (old, new) = (self.old, self.new);
        let name = self.name().to_string();
        let mut matched = vec![false; new.methods.len()];

        for (i, old_method) in old.methods.iter().enumerate() {
            if old_method.is_class_initializer() {
                continue;
            }
            let old_vis = effective(old, old_method.access.visibility());
            let Some(j) = find_member(&new.methods, &old_method.name, &old_method.signature, i)
            else {
                let affected = self.method_refs(old_method, old_vis, None)?;
                self.incompatible(format!("method {name}.{} deleted", describe(old_method)), affected);
                continue;
            };
            matched[j] = true;
            let new_method = &new.methods[j];
            let (oa, na) = (old_method.access, new_method.access);

            let new_vis = effective(new, na.visibility());
            if new_vis < old_vis {
                let affected = self.method_refs(old_method, old_vis, Some(new_vis))?;
                self.incompatible(
                    format!("method {name}.{} access narrowed", describe(old_method)),
                    affected,
                );
            }
            if oa.is_static() != na.is_static() {
                let mut affected = self.method_refs(old_method, old_vis, None)?;
                affected.extend(self.finder.overriding_subclasses(
                    &name,
                    &old_method.name,
                    &old_method.signature,
                )?);
                self.incompatible(
                    format!("method {name}.{} changed static modifier", describe(old_method)),
                    affected,
                );
            }
            if !oa.is_final() && na.is_final() {
                let affected = self.finder.overriding_subclasses(
                    &name,
                    &old_method.name,
                    &old_method.signature,
                )?;
                self.incompatible(
                    format!("method {name}.{} became final", describe(old_method)),
                    affected,
                );
            }
            if !oa.is_abstract() && na.is_abstract() {
                let affected = self.finder.concrete_subclasses_missing(
                    &name,
                    &old_method.name,
                    &old_method.signature,
                )?;
                self.incompatible(
                    format!("method {name}.{} became abstract", describe(old_method)),
                    affected,
                );
            }
            let grown = self.grown_exceptions(old_method, new_method)?;
            if !grown.is_empty() {
                let affected = self.method_refs(old_method, old_vis, None)?;
                self.incompatible(
                    format!(
                        "method {name}.{} throws new checked exceptions {grown:?}",
                        describe(old_method)
                    ),
                    affected,
                );
            }
        }

        for (j, new_method) in new.methods.iter().enumerate() {
            if matched[j] || new_method.is_class_initializer() || new_method.access.is_private() {
                continue;
            }
            if new_method.access.is_abstract() {
                let affected = self.finder.concrete_subclasses_missing(
                    &name,
                    &new_method.name,
                    &new_method.signature,
                )?;
                self.incompatible(
                    format!("abstract method {name}.{} added", describe(new_method)),
                    affected,
                );
            }
            let params = new_method.parameter_count();
            let overloads_own = old.methods.iter().any(|m| {
                m.name == new_method.name && m.parameter_count() == params && !m.access.is_private()
            });
            if overloads_own || self.finder.inherits_method_arity(new, &new_method.name, params)? {
                let vis = effective(new, new_method.access.visibility());
                let affected = self
                    .finder
                    .overload_references(&name, &new_method.name, params, vis)?;
                self.incompatible(
                    format!(
                        "method {name}.{} may change overload resolution",
                        describe(new_method)
                    ),
                    affected,
                );
            }
        }
        Ok(())
    }

    fn method_refs(
        &self,
        method: &MethodInfo,
        old: Visibility,
        still: Option<Visibility>,
    ) -> MakeResult<BTreeSet<String>> {
        self.finder.member_references(
            self.name(),
            &method.name,
            &method.signature,
            MemberKind::Method,
            old,
            still,
        )
    }

    /// Exceptions the new version declares that are neither declared by the
    /// old version nor subclasses of an exception it declared.
    fn grown_exceptions(&self, old: &MethodInfo, new: &MethodInfo) -> MakeResult<Vec<String>> {
        let mut grown = Vec::new();
        for exception in &new.exceptions {
            if old.exceptions.contains(exception) {
                continue;
            }
            let mut covered = false;
            for declared in &old.exceptions {
                if self.finder.is_subtype(exception, declared)? {
                    covered = true;
                    break;
                }
            }
            if !covered {
                grown.push(exception.clone());
            }
        }
        Ok(grown)
    }

    fn nested_classes(&mut self) -> MakeResult<()> {
        let name = self.name().to_string();
        let members = |m: &ClassModel| -> BTreeSet<String> {
            m.nested
                .iter()
                .filter(|n| !n.local)
                .map(|n| n.name.clone())
                .collect()
        };
        let old_nested = members(self.old);
        let new_nested = members(self.new);

        for removed in old_nested.difference(&new_nested) {
            let affected = self.finder.deleted_class_dependents(removed)?;
            self.incompatible(format!("nested class {removed} removed from {name}"), affected);
        }
        let added: Vec<&String> = new_nested.difference(&old_nested).collect();
        if !added.is_empty() {
            // A new member class can shadow a same-named type in subclasses.
            let affected = self.finder.subclasses(&name, false)?;
            if !affected.is_empty() {
                self.incompatible(format!("nested classes {added:?} added to {name}"), affected);
            }
        }
        Ok(())
    }
}

fn describe(method: &MethodInfo) -> String {
    format!("{}{}", method.name, crate::model::denormalize_descriptor(&method.signature))
}
