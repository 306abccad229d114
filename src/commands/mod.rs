pub mod ls;
pub mod query;
pub mod status;

use anyhow::{Result, bail};
use std::{collections::HashSet, path::PathBuf};

use recipetree::{
    config::Config,
    graph::{NodeIndex, PackageGraph, QueryMatch, WalkOptions},
};

use crate::{
    Command,
    commands::{
        ls::{LsOptions, ls_cmd},
        query::{query_meta_cmd, query_recipe_cmd, query_scm_cmd},
        status::status_cmd,
    },
    log::package_not_found,
};

/// Everything a command works on.
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    pub graph: PackageGraph,
}

pub async fn main_commands(project: &Project, command: Command) -> Result<()> {
    let missing = match command {
        Command::Ls {
            package,
            all,
            origin,
            recursive,
            prefixed,
            direct,
        } => ls_cmd(
            &project.graph,
            package.as_deref().unwrap_or_default(),
            LsOptions {
                all,
                origin,
                recursive,
                prefixed,
                direct,
            },
        )?,

        Command::QueryMeta {
            packages,
            recursive,
        } => query_meta_cmd(&project.graph, &packages, recursive)?,

        Command::QueryScm {
            packages,
            recursive,
            formats,
            default,
        } => query_scm_cmd(project, &packages, recursive, &formats, default.as_deref())?,

        Command::QueryRecipe { package } => query_recipe_cmd(&project.graph, &package),

        Command::Status {
            packages,
            recursive,
            show_clean,
            table,
        } => status_cmd(project, &packages, recursive, show_clean, table).await?,
    };

    if missing > 0 {
        bail!("{missing} package path(s) could not be found");
    }

    Ok(())
}

/// Resolve every path, reporting the ones that match nothing. Returns the
/// matches and the number of failed paths.
pub fn resolve_paths<S: AsRef<str>>(
    graph: &PackageGraph,
    paths: &[S],
) -> (Vec<QueryMatch>, usize) {
    let mut matches = Vec::new();
    let mut missing = 0;

    for path in paths {
        match graph.query_path(path.as_ref()) {
            Ok(found) => matches.extend(found),
            Err(err) => {
                package_not_found(&err);
                missing += 1;
            }
        }
    }

    (matches, missing)
}

/// The matched packages, and with `recursive` everything below them, each
/// node once. Comes with the path it was first reached by.
pub fn select_packages(
    graph: &PackageGraph,
    matches: &[QueryMatch],
    recursive: bool,
) -> Result<Vec<(Vec<String>, NodeIndex)>> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let options = WalkOptions {
        recursive: true,
        once: true,
        ..WalkOptions::default()
    };

    for found in matches {
        if !seen.insert(found.node) {
            continue;
        }
        selected.push((found.stack.clone(), found.node));

        if recursive {
            for entry in graph.walk(found.node, found.stack.clone(), options) {
                let entry = entry?;
                if seen.insert(entry.node) {
                    selected.push((entry.stack, entry.node));
                }
            }
        }
    }

    Ok(selected)
}
