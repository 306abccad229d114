use anyhow::{Result, bail};
use std::collections::HashSet;

use recipetree::graph::PackageGraph;

use crate::{
    commands::{Project, resolve_paths, select_packages},
    log::package_not_found,
};

/// `name VAR=value` for every meta variable, once per recipe.
pub fn query_meta_cmd(graph: &PackageGraph, paths: &[String], recursive: bool) -> Result<usize> {
    let (matches, missing) = resolve_paths(graph, paths);
    let mut done = HashSet::new();

    for (_, node) in select_packages(graph, &matches, recursive)? {
        let package = graph.node(node);
        if !done.insert(package.name.as_str()) {
            continue;
        }

        for (var, value) in &package.meta_env {
            println!("{} {var}={value}", package.name);
        }
    }

    Ok(missing)
}

/// One formatted line per SCM, once per checkout variant.
pub fn query_scm_cmd(
    project: &Project,
    paths: &[String],
    recursive: bool,
    formats: &[String],
    default: Option<&str>,
) -> Result<usize> {
    let mut scm_formats = project.config.scm_formats.clone();
    for format in formats {
        let Some((kind, format)) = format.split_once('=') else {
            bail!("Malformed format '{format}', expected KIND=FORMAT");
        };
        scm_formats.set(kind, format);
    }
    let default = default.unwrap_or(project.config.scm_default.as_str());

    let graph = &project.graph;
    let (matches, missing) = resolve_paths(graph, paths);
    let mut done = HashSet::new();

    for (stack, node) in select_packages(graph, &matches, recursive)? {
        let package = graph.node(node);
        if !done.insert((package.name.as_str(), package.checkout.variant_id)) {
            continue;
        }

        let path = stack.join("/");
        for scm in &package.checkout.scms {
            println!("{}", scm.describe(&path, &scm_formats, default));
        }
    }

    Ok(missing)
}

/// Files the recipe of `path` was assembled from.
pub fn query_recipe_cmd(graph: &PackageGraph, path: &str) -> usize {
    let matches = match graph.query_path(path) {
        Ok(matches) => matches,
        Err(err) => {
            package_not_found(&err);
            return 1;
        }
    };

    let mut done = HashSet::new();
    for found in matches {
        let package = graph.node(found.node);
        if !done.insert(package.name.as_str()) {
            continue;
        }
        for source in &package.sources {
            println!("{}", source.display());
        }
    }

    0
}
