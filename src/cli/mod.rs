//! Command-line front end over [`CodeStructureEngine`].
//!
//! Every command prints JSON to stdout. Query and rename commands index the
//! project root first so they see the whole tree.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::CodeStructureEngine;

#[derive(Parser)]
#[command(name = "typeforge")]
#[command(about = "Structural code editing for AI agents")]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // ─── Read ─────────────────────────────────────────────────────
    /// List every type declared in a file
    Types { file: PathBuf },

    /// Show one type from a file
    Type { file: PathBuf, name: String },

    /// Summarize the solution or project file under a path
    Project { path: Option<PathBuf> },

    // ─── Query ────────────────────────────────────────────────────
    /// Find types by name pattern (`*` matches any run of characters)
    Find { pattern: String },

    /// Textual references to a type or one of its members
    Refs {
        type_name: String,
        #[arg(short, long)]
        member: Option<String>,
    },

    /// Direct and indirect impact of changing a type or member
    Impact {
        type_name: String,
        #[arg(short, long)]
        member: Option<String>,
    },

    // ─── Write ────────────────────────────────────────────────────
    /// Add a method given its full source text
    AddMethod {
        file: PathBuf,
        type_name: String,
        source: String,
    },

    /// Remove a method by name
    RemoveMethod {
        file: PathBuf,
        type_name: String,
        name: String,
    },

    /// Rename a type, or a member when --type is given
    Rename {
        old_name: String,
        new_name: String,
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
    },

    /// Check an operation against a type without changing anything
    Validate {
        file: PathBuf,
        type_name: String,
        operation: String,
    },
}

/// Run one command against the project at `cli.root`.
pub fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let engine = CodeStructureEngine::open(&root);

    match cli.command {
        Commands::Types { file } => {
            print_json(&engine.parse_all_types(&resolve(&root, &file))?)
        }
        Commands::Type { file, name } => {
            print_json(&engine.parse_type(&resolve(&root, &file), &name)?)
        }
        Commands::Project { path } => {
            let path = path.map(|p| resolve(&root, &p)).unwrap_or_else(|| root.clone());
            print_json(&engine.analyze_project(&path)?)
        }
        Commands::Find { pattern } => {
            index(&engine, &root)?;
            print_json(&engine.find_types_by_name(&pattern))
        }
        Commands::Refs { type_name, member } => {
            index(&engine, &root)?;
            print_json(&engine.find_all_references(&type_name, member.as_deref()))
        }
        Commands::Impact { type_name, member } => {
            index(&engine, &root)?;
            print_json(&engine.get_change_impact(&type_name, member.as_deref()))
        }
        Commands::AddMethod {
            file,
            type_name,
            source,
        } => {
            let file = resolve(&root, &file);
            engine.add_method(&file, &type_name, &source)?;
            print_json(&engine.parse_type(&file, &type_name)?)
        }
        Commands::RemoveMethod {
            file,
            type_name,
            name,
        } => {
            let file = resolve(&root, &file);
            engine.remove_method(&file, &type_name, &name)?;
            print_json(&engine.parse_type(&file, &type_name)?)
        }
        Commands::Rename {
            old_name,
            new_name,
            type_name,
        } => {
            index(&engine, &root)?;
            let report = engine.rename_symbol(&old_name, &new_name, type_name.as_deref())?;
            print_json(&report)?;
            if let Some(e) = report.error() {
                bail!("rename stopped: {}", e);
            }
            Ok(())
        }
        Commands::Validate {
            file,
            type_name,
            operation,
        } => {
            let problems =
                engine.validate_modification(&resolve(&root, &file), &type_name, &operation);
            print_json(&problems)
        }
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn index(engine: &CodeStructureEngine, root: &Path) -> Result<()> {
    let stats = engine
        .index_directory(root)
        .with_context(|| format!("indexing {}", root.display()))?;
    info!(files = stats.files, types = stats.types, skipped = stats.skipped, "indexed");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "typeforge",
            "--root",
            "/tmp/project",
            "rename",
            "Save",
            "Persist",
            "--type",
            "Repository",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
        match cli.command {
            Commands::Rename {
                old_name,
                new_name,
                type_name,
            } => {
                assert_eq!(old_name, "Save");
                assert_eq!(new_name, "Persist");
                assert_eq!(type_name.as_deref(), Some("Repository"));
            }
            _ => panic!("expected rename"),
        }

        let cli = Cli::try_parse_from(["typeforge", "refs", "Widget", "-m", "Draw"]).unwrap();
        assert!(matches!(cli.command, Commands::Refs { member: Some(_), .. }));
        assert!(Cli::try_parse_from(["typeforge", "add-method", "A.cs"]).is_err());
    }

    #[test]
    fn test_resolve_relative_paths() {
        let root = Path::new("/repo");
        assert_eq!(resolve(root, Path::new("src/A.cs")), PathBuf::from("/repo/src/A.cs"));
        assert_eq!(resolve(root, Path::new("/abs/B.cs")), PathBuf::from("/abs/B.cs"));
    }
}
