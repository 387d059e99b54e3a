//! Modification service: structural edits persisted by whole-file regeneration.
//!
//! Every edit re-parses the file from disk, mutates the fresh descriptions,
//! regenerates the complete file text from all of its types and invalidates
//! the file in the cache. Formatting and comments the model does not capture
//! are lost on any edit. A failed precondition leaves the file untouched.
//!
//! Callers must not edit the same file concurrently: the second writer
//! regenerates from a model that does not include the first writer's change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analysis::AnalysisService;
use crate::cache::StructureCache;
use crate::error::{EngineError, Result};
use crate::model::{
    EventDescription, FieldDescription, MemberCollection, MemberItem, MethodDescription,
    PropertyDescription, TypeDescription, TypeModifiers, Visibility,
};
use crate::store::FileStore;
use crate::syntax::SyntaxProvider;
use crate::text::{block_contents, dedent, snippet_preview};

/// Fields of a type to overwrite. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypePatch {
    pub visibility: Option<Visibility>,
    pub modifiers: Option<TypeModifiers>,
    /// `Some(None)` clears the base type.
    pub base_type: Option<Option<String>>,
    pub implemented_interfaces: Option<Vec<String>>,
    pub members: Option<MemberCollection>,
    pub attributes: Option<Vec<String>>,
    pub documentation: Option<Option<String>>,
}

impl TypePatch {
    fn apply(self, ty: &mut TypeDescription) {
        if let Some(visibility) = self.visibility {
            ty.visibility = visibility;
        }
        if let Some(modifiers) = self.modifiers {
            ty.modifiers = modifiers;
        }
        if let Some(base_type) = self.base_type {
            ty.base_type = base_type;
        }
        if let Some(interfaces) = self.implemented_interfaces {
            ty.implemented_interfaces.clear();
            for iface in interfaces {
                ty.add_interface(iface);
            }
        }
        if let Some(members) = self.members {
            ty.members = members;
        }
        if let Some(attributes) = self.attributes {
            ty.attributes = attributes;
        }
        if let Some(documentation) = self.documentation {
            ty.documentation = documentation;
        }
    }
}

pub struct ModificationService {
    analysis: Arc<AnalysisService>,
    syntax: Arc<dyn SyntaxProvider>,
    store: Arc<dyn FileStore>,
    cache: Arc<StructureCache>,
}

impl ModificationService {
    pub fn new(
        analysis: Arc<AnalysisService>,
        syntax: Arc<dyn SyntaxProvider>,
        store: Arc<dyn FileStore>,
        cache: Arc<StructureCache>,
    ) -> Self {
        Self {
            analysis,
            syntax,
            store,
            cache,
        }
    }

    // ─── Protocol ──────────────────────────────────────────────

    /// Rewrite `file` from `types` and drop its cache entries.
    pub fn regenerate_file(&self, file: &Path, types: &[TypeDescription]) -> Result<()> {
        let text = self.syntax.generate_file(types);
        self.store.write_text(file, &text)?;
        let dropped = self.cache.invalidate_file(file);
        info!(file = %file.display(), types = types.len(), dropped, "regenerated file");
        Ok(())
    }

    /// Fresh parse, locate `type_name`, apply `edit`, regenerate.
    fn edit_type<F>(&self, file: &Path, type_name: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut TypeDescription) -> Result<()>,
    {
        let mut types = self.analysis.parse_all_types(file)?;
        let target = types
            .iter_mut()
            .find(|t| t.name == type_name)
            .ok_or_else(|| EngineError::type_not_found(type_name, file))?;
        edit(target)?;
        self.regenerate_file(file, &types)
    }

    // ─── Generic member CRUD ───────────────────────────────────

    pub fn add_member<M: MemberItem>(&self, file: &Path, type_name: &str, member: M) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            if !ty.kind.accepts_member(M::KIND) {
                return Err(EngineError::Unsupported(format!(
                    "adding a {} to {} '{}'",
                    M::KIND,
                    ty.kind,
                    type_name
                )));
            }
            let list = M::list_mut(&mut ty.members);
            if list.iter().any(|m| m.name() == member.name()) {
                return Err(EngineError::AlreadyExists(format!(
                    "{} '{}' in type '{}'",
                    M::KIND,
                    member.name(),
                    type_name
                )));
            }
            debug!(kind = %kind_name::<M>(), member = member.name(), type_name, "adding member");
            list.push(member);
            Ok(())
        })
    }

    pub fn remove_member<M: MemberItem>(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            let list = M::list_mut(&mut ty.members);
            let index = position(list, name)
                .ok_or_else(|| EngineError::member_not_found(&kind_name::<M>(), name, type_name))?;
            debug!(kind = %kind_name::<M>(), member = name, type_name, "removing member");
            list.remove(index);
            Ok(())
        })
    }

    pub fn replace_member<M: MemberItem>(
        &self,
        file: &Path,
        type_name: &str,
        name: &str,
        member: M,
    ) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            let list = M::list_mut(&mut ty.members);
            let index = position(list, name)
                .ok_or_else(|| EngineError::member_not_found(&kind_name::<M>(), name, type_name))?;
            debug!(kind = %kind_name::<M>(), member = name, type_name, "replacing member");
            list[index] = member;
            Ok(())
        })
    }

    /// Read one member through the cache-backed single-type lookup.
    pub fn get_member<M: MemberItem>(&self, file: &Path, type_name: &str, name: &str) -> Result<M> {
        let ty = self.analysis.parse_single_type(file, type_name)?;
        M::list(&ty.members)
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| EngineError::member_not_found(&kind_name::<M>(), name, type_name))
    }

    /// Parse a snippet that must declare exactly one member of kind `M`.
    pub fn parse_member_as<M: MemberItem>(&self, snippet: &str) -> Result<M> {
        let member = self.syntax.parse_member(snippet)?;
        let found = member.kind();
        M::from_member(member).ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "expected a {} but the snippet declares a {}: {}",
                M::KIND,
                found,
                snippet_preview(snippet)
            ))
        })
    }

    // ─── Methods ───────────────────────────────────────────────

    pub fn add_method(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        let method: MethodDescription = self.parse_member_as(source)?;
        self.add_member(file, type_name, method)
    }

    pub fn remove_method(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.remove_member::<MethodDescription>(file, type_name, name)
    }

    pub fn replace_method(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        let method: MethodDescription = self.parse_member_as(source)?;
        self.replace_member(file, type_name, name, method)
    }

    /// Replace only the body of a method, keeping its signature.
    ///
    /// `body` may be a braced block, an `=> expr` expression body or bare
    /// statements.
    pub fn update_method_body(&self, file: &Path, type_name: &str, name: &str, body: &str) -> Result<()> {
        let body = normalize_body(body);
        self.edit_type(file, type_name, |ty| {
            let method = ty
                .members
                .methods
                .iter_mut()
                .find(|m| m.name == name)
                .ok_or_else(|| EngineError::member_not_found("method", name, type_name))?;
            method.body = Some(body);
            Ok(())
        })
    }

    pub fn get_method(&self, file: &Path, type_name: &str, name: &str) -> Result<MethodDescription> {
        self.get_member(file, type_name, name)
    }

    /// Body text of a method; empty for a method without a body.
    pub fn get_method_body(&self, file: &Path, type_name: &str, name: &str) -> Result<String> {
        let method = self.get_method(file, type_name, name)?;
        Ok(method.body.unwrap_or_default())
    }

    // ─── Properties, fields, events ────────────────────────────

    pub fn add_property(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        let prop: PropertyDescription = self.parse_member_as(source)?;
        self.add_member(file, type_name, prop)
    }

    pub fn remove_property(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.remove_member::<PropertyDescription>(file, type_name, name)
    }

    pub fn replace_property(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        let prop: PropertyDescription = self.parse_member_as(source)?;
        self.replace_member(file, type_name, name, prop)
    }

    pub fn get_property(&self, file: &Path, type_name: &str, name: &str) -> Result<PropertyDescription> {
        self.get_member(file, type_name, name)
    }

    pub fn add_field(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        let field: FieldDescription = self.parse_member_as(source)?;
        self.add_member(file, type_name, field)
    }

    pub fn remove_field(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.remove_member::<FieldDescription>(file, type_name, name)
    }

    pub fn replace_field(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        let field: FieldDescription = self.parse_member_as(source)?;
        self.replace_member(file, type_name, name, field)
    }

    pub fn get_field(&self, file: &Path, type_name: &str, name: &str) -> Result<FieldDescription> {
        self.get_member(file, type_name, name)
    }

    pub fn add_event(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        let event: EventDescription = self.parse_member_as(source)?;
        self.add_member(file, type_name, event)
    }

    pub fn remove_event(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.remove_member::<EventDescription>(file, type_name, name)
    }

    // ─── Types ─────────────────────────────────────────────────

    /// Write `ty` to `file`, creating the file or appending to its types.
    pub fn create_type(&self, file: &Path, mut ty: TypeDescription) -> Result<()> {
        ty.owning_file = file.to_path_buf();
        if !self.store.exists(file) {
            debug!(file = %file.display(), type_name = %ty.name, "creating file");
            return self.regenerate_file(file, std::slice::from_ref(&ty));
        }

        let mut types = self.analysis.parse_all_types(file)?;
        if types.iter().any(|t| t.identity() == ty.identity()) {
            return Err(EngineError::AlreadyExists(format!(
                "type '{}' in {}",
                ty.full_name(),
                file.display()
            )));
        }
        types.push(ty);
        self.regenerate_file(file, &types)
    }

    pub fn create_type_from_source(&self, file: &Path, source: &str) -> Result<()> {
        let ty = self.syntax.parse_type_snippet(source, file)?;
        self.create_type(file, ty)
    }

    /// Remove a type together with the types nested inside it.
    pub fn remove_type(&self, file: &Path, type_name: &str) -> Result<()> {
        let mut types = self.analysis.parse_all_types(file)?;
        let (namespace, root) = types
            .iter()
            .find(|t| t.name == type_name)
            .map(|t| (t.namespace.clone(), t.nested_path()))
            .ok_or_else(|| EngineError::type_not_found(type_name, file))?;

        let nested_prefix = format!("{}.", root);
        let before = types.len();
        types.retain(|t| {
            let path = t.nested_path();
            t.namespace != namespace || (path != root && !path.starts_with(&nested_prefix))
        });
        debug!(file = %file.display(), removed = before - types.len(), "removing type");
        self.regenerate_file(file, &types)
    }

    pub fn modify_type(&self, file: &Path, type_name: &str, patch: TypePatch) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            patch.apply(ty);
            Ok(())
        })
    }

    pub fn add_interface(&self, file: &Path, type_name: &str, interface: &str) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            if !ty.add_interface(interface) {
                return Err(EngineError::AlreadyExists(format!(
                    "interface '{}' on type '{}'",
                    interface, type_name
                )));
            }
            Ok(())
        })
    }

    pub fn remove_interface(&self, file: &Path, type_name: &str, interface: &str) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            if !ty.remove_interface(interface) {
                return Err(EngineError::member_not_found("interface", interface, type_name));
            }
            Ok(())
        })
    }

    /// Set or, with `None`, clear the base type.
    pub fn change_base_class(&self, file: &Path, type_name: &str, base: Option<&str>) -> Result<()> {
        self.edit_type(file, type_name, |ty| {
            ty.base_type = base.map(str::to_string);
            Ok(())
        })
    }
}

fn kind_name<M: MemberItem>() -> String {
    M::KIND.to_string()
}

fn position<M: MemberItem>(list: &[M], name: &str) -> Option<usize> {
    list.iter().position(|m| m.name() == name)
}

/// Stored body form: block contents, `=> expr`, or de-indented statements.
pub(crate) fn normalize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        block_contents(trimmed)
    } else if let Some(expr) = trimmed.strip_prefix("=>") {
        format!("=> {}", expr.trim().trim_end_matches(';').trim())
    } else {
        dedent(body)
    }
}
