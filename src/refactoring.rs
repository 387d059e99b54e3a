//! Cross-file rename over the cached types.
//!
//! Like queries, a rename only sees types that are in the cache. Changed
//! types are merged into a fresh parse of their file, so types of that file
//! that were never cached survive the rewrite. Files are rewritten one after
//! another without rollback.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisService;
use crate::batch::ItemStatus;
use crate::error::{EngineError, Result};
use crate::model::{MemberItem, TypeDescription};
use crate::modification::ModificationService;
use crate::query::QueryService;
use crate::text::replace_identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRewrite {
    pub file: PathBuf,
    /// Names (after the rename) of the changed types in this file.
    pub types: Vec<String>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Default, Serialize)]
pub struct RenameReport {
    pub old_name: String,
    pub new_name: String,
    /// Declaring type for a member rename.
    pub type_name: Option<String>,
    /// Whether the declaration itself was found and renamed.
    pub declaration_renamed: bool,
    pub files: Vec<FileRewrite>,
    #[serde(skip)]
    error: Option<EngineError>,
}

impl RenameReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

/// A changed type and its identity in the file before the rename.
struct Changed {
    original_identity: String,
    ty: TypeDescription,
}

pub struct RefactoringService {
    analysis: Arc<AnalysisService>,
    query: Arc<QueryService>,
    modification: Arc<ModificationService>,
}

impl RefactoringService {
    pub fn new(
        analysis: Arc<AnalysisService>,
        query: Arc<QueryService>,
        modification: Arc<ModificationService>,
    ) -> Self {
        Self {
            analysis,
            query,
            modification,
        }
    }

    /// Rename a type (`type_name == None`) or a member of `type_name`, and
    /// rewrite references to it in every cached type.
    pub fn rename_symbol(
        &self,
        old_name: &str,
        new_name: &str,
        type_name: Option<&str>,
    ) -> Result<RenameReport> {
        if old_name.trim().is_empty() || new_name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "rename needs non-empty old and new names".to_string(),
            ));
        }
        let mut report = RenameReport {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            type_name: type_name.map(str::to_string),
            ..RenameReport::default()
        };
        if old_name == new_name {
            debug!(old_name, "rename to same name, nothing to do");
            return Ok(report);
        }

        let cached = self.query.cached_types();
        let (changed, declaration_renamed) = match type_name {
            None => rename_type(cached, old_name, new_name),
            Some(owner) => rename_member(cached, owner, old_name, new_name)?,
        };
        report.declaration_renamed = declaration_renamed;

        let mut by_file: BTreeMap<PathBuf, Vec<Changed>> = BTreeMap::new();
        for change in changed {
            by_file
                .entry(change.ty.owning_file.clone())
                .or_default()
                .push(change);
        }

        for (file, changes) in by_file {
            let types: Vec<String> = changes.iter().map(|c| c.ty.name.clone()).collect();
            let status = if report.error.is_some() {
                ItemStatus::NotAttempted
            } else {
                match self.persist(&file, changes) {
                    Ok(()) => ItemStatus::Applied,
                    Err(e) => {
                        warn!(file = %file.display(), error = %e, "rename rewrite failed, stopping");
                        let status = ItemStatus::Failed {
                            error: e.to_string(),
                        };
                        report.error = Some(e);
                        status
                    }
                }
            };
            report.files.push(FileRewrite {
                file,
                types,
                status,
            });
        }

        info!(
            old_name,
            new_name,
            files = report.files.len(),
            complete = report.is_complete(),
            "renamed symbol"
        );
        Ok(report)
    }

    fn persist(&self, file: &std::path::Path, changes: Vec<Changed>) -> Result<()> {
        let mut types = self.analysis.parse_all_types(file)?;
        for change in changes {
            match types
                .iter_mut()
                .find(|t| t.identity() == change.original_identity)
            {
                Some(slot) => {
                    let (start_line, end_line) = (slot.start_line, slot.end_line);
                    *slot = change.ty;
                    slot.start_line = start_line;
                    slot.end_line = end_line;
                }
                None => warn!(
                    file = %file.display(),
                    type_name = %change.original_identity,
                    "cached type no longer in file, skipped"
                ),
            }
        }
        self.modification.regenerate_file(file, &types)
    }
}

/// Rename every type called `old` and rewrite type positions and code.
fn rename_type(types: Vec<TypeDescription>, old: &str, new: &str) -> (Vec<Changed>, bool) {
    let mut renamed_any = false;
    let mut changed = Vec::new();

    for mut ty in types {
        let before = ty.clone();

        if ty.name == old {
            ty.name = new.to_string();
            renamed_any = true;
            for ctor in ty.members.methods.iter_mut().filter(|m| m.is_constructor) {
                if ctor.name == old {
                    ctor.name = new.to_string();
                }
            }
        }
        if let Some(parent) = &ty.declaring_type {
            ty.declaring_type = Some(replace_identifier(parent, old, new));
        }
        rewrite_type_positions(&mut ty, old, new);
        for_each_code(&mut ty, |code| *code = replace_identifier(code, old, new));

        if ty != before {
            changed.push(Changed {
                original_identity: before.identity(),
                ty,
            });
        }
    }
    (changed, renamed_any)
}

/// Visit every piece of free-form code a type carries: method bodies and
/// constructor initializers, accessor bodies, initializers, default values
/// and `where` clauses.
fn for_each_code<F: FnMut(&mut String)>(ty: &mut TypeDescription, mut visit: F) {
    ty.constraints.iter_mut().for_each(&mut visit);
    for method in &mut ty.members.methods {
        method.body.iter_mut().for_each(&mut visit);
        method.initializer.iter_mut().for_each(&mut visit);
        method.constraints.iter_mut().for_each(&mut visit);
        for param in &mut method.parameters {
            param.default_value.iter_mut().for_each(&mut visit);
        }
    }
    for prop in &mut ty.members.properties {
        prop.getter_body.iter_mut().for_each(&mut visit);
        prop.setter_body.iter_mut().for_each(&mut visit);
        prop.initializer.iter_mut().for_each(&mut visit);
    }
    for field in &mut ty.members.fields {
        field.default_value.iter_mut().for_each(&mut visit);
    }
}

fn rewrite_type_positions(ty: &mut TypeDescription, old: &str, new: &str) {
    let swap = |text: &mut String| *text = replace_identifier(text, old, new);

    if let Some(base) = &mut ty.base_type {
        swap(base);
    }
    for iface in &mut ty.implemented_interfaces {
        swap(iface);
    }
    for method in &mut ty.members.methods {
        swap(&mut method.return_type);
        for param in &mut method.parameters {
            swap(&mut param.type_name);
        }
    }
    for prop in &mut ty.members.properties {
        swap(&mut prop.type_name);
    }
    for field in &mut ty.members.fields {
        swap(&mut field.type_name);
    }
    for event in &mut ty.members.events {
        swap(&mut event.type_name);
    }
}

/// Rename the first method, property or field called `old` on `owner`, then
/// rewrite `Owner.old` in the code of every type and bare uses of `old`
/// inside the owner itself.
fn rename_member(
    types: Vec<TypeDescription>,
    owner: &str,
    old: &str,
    new: &str,
) -> Result<(Vec<Changed>, bool)> {
    if !types.iter().any(|t| t.name == owner) {
        return Err(EngineError::NotFound(format!("type '{}' in cache", owner)));
    }

    let qualified_old = format!("{}.{}", owner, old);
    let qualified_new = format!("{}.{}", owner, new);
    let mut declaration_renamed = false;
    let mut changed = Vec::new();

    for mut ty in types {
        let before = ty.clone();
        let is_owner = ty.name == owner;

        if is_owner && !declaration_renamed {
            declaration_renamed = rename_first(&mut ty.members.methods, old, new)
                || rename_first(&mut ty.members.properties, old, new)
                || rename_first(&mut ty.members.fields, old, new);
        }

        for_each_code(&mut ty, |code| {
            let mut text = replace_identifier(code, &qualified_old, &qualified_new);
            if is_owner {
                text = replace_identifier(&text, old, new);
            }
            *code = text;
        });

        if ty != before {
            changed.push(Changed {
                original_identity: before.identity(),
                ty,
            });
        }
    }

    if !declaration_renamed {
        return Err(EngineError::member_not_found("member", old, owner));
    }
    Ok((changed, declaration_renamed))
}

fn rename_first<M: MemberItem>(list: &mut [M], old: &str, new: &str) -> bool {
    match list.iter_mut().find(|m| m.name() == old) {
        Some(member) => {
            member.set_name(new);
            true
        }
        None => false,
    }
}
