use std::collections::HashMap;

use super::{Recipe, RecipeSet};
use crate::{
    env::{Env, substitute},
    error::RecipeError,
    graph::{CheckoutStep, DepEdge, GraphBuilder, NodeIndex, PackageGraph, PackageNode},
    variant::VariantId,
};

/// Parameter that separates sandboxed from unsandboxed variants. Can't clash
/// with a variable, those never start with `@`.
const SANDBOX_PARAM: &str = "@sandbox";

impl RecipeSet {
    /// Resolve every root recipe into one graph.
    ///
    /// # Errors
    ///
    /// See [`RecipeSet::resolve`].
    pub fn generate_packages(&self, env: &Env, sandbox: bool) -> crate::Result<PackageGraph> {
        let roots: Vec<&str> = self.root_names().collect();
        self.resolve(&roots, env, sandbox)
    }

    /// Resolve `roots` and their transitive dependencies. Each root becomes a
    /// root alias of the same name.
    ///
    /// The result only depends on the arguments: the same recipes, roots and
    /// environment always produce the same graph.
    ///
    /// # Errors
    ///
    /// - A root or dependency is not defined
    /// - A fixed environment variable is already set to something else
    /// - Recipes depend on each other in a loop
    /// - A substitution fails or a SCM is invalid
    /// - The assembled graph violates an invariant
    pub fn resolve(&self, roots: &[&str], env: &Env, sandbox: bool) -> crate::Result<PackageGraph> {
        let mut resolver = Resolver {
            recipes: self,
            sandbox,
            builder: PackageGraph::builder(),
            resolved: HashMap::new(),
            active: Vec::new(),
        };

        for root in roots {
            if self.get(root).is_none() {
                return Err(RecipeError::UnknownRoot((*root).to_string()).into());
            }
            let node = resolver.package(root, env, None)?;
            resolver.builder.add_root(*root, node);
        }

        let graph = resolver.builder.build()?;
        log::debug!("resolved {} package variant(s)", graph.len());

        Ok(graph)
    }
}

struct Resolver<'r> {
    recipes: &'r RecipeSet,
    sandbox: bool,
    builder: GraphBuilder,
    resolved: HashMap<VariantId, NodeIndex>,
    /// Recipes being resolved right now, outermost first
    active: Vec<String>,
}

impl Resolver<'_> {
    fn package(
        &mut self,
        name: &str,
        inherited: &Env,
        parent: Option<&str>,
    ) -> Result<NodeIndex, RecipeError> {
        let recipes = self.recipes;
        let recipe = recipes.get(name).ok_or_else(|| match parent {
            Some(parent) => RecipeError::UndefinedDependency {
                recipe: parent.to_string(),
                dependency: name.to_string(),
            },
            None => RecipeError::UnknownRoot(name.to_string()),
        })?;

        let env = package_env(recipe, inherited)?;

        let mut params: Vec<(&str, &str)> = env
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        if self.sandbox {
            params.push((SANDBOX_PARAM, "1"));
        }
        let variant_id = VariantId::compute(name, params);

        if let Some(pos) = self.active.iter().position(|active| active == name) {
            let chain = self.active[pos..]
                .iter()
                .map(String::as_str)
                .chain([name])
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(RecipeError::Cycle(chain));
        }
        if let Some(&node) = self.resolved.get(&variant_id) {
            log::trace!("reusing {name} variant {}", variant_id.short());
            return Ok(node);
        }

        self.active.push(name.to_string());
        let node = self.build(recipe, &env, variant_id);
        self.active.pop();
        let node = node?;

        self.resolved.insert(variant_id, node);
        Ok(node)
    }

    fn build(
        &mut self,
        recipe: &Recipe,
        env: &Env,
        variant_id: VariantId,
    ) -> Result<NodeIndex, RecipeError> {
        let recipes = self.recipes;
        let mut edges: Vec<(NodeIndex, DepEdge)> = Vec::new();
        let mut by_name: HashMap<String, NodeIndex> = HashMap::new();

        for dep in &recipe.depends {
            let mut child_env = env.clone();
            for (key, template) in &dep.environment {
                child_env.insert(key.clone(), substitute(&recipe.name, template, env)?);
            }

            let child = self.package(&dep.name, &child_env, Some(&recipe.name))?;
            if by_name.insert(dep.name.clone(), child).is_some() {
                return Err(RecipeError::DuplicateDependency {
                    recipe: recipe.name.clone(),
                    dependency: dep.name.clone(),
                });
            }
            edges.push((child, DepEdge::direct()));
        }

        let direct: Vec<NodeIndex> = edges.iter().map(|(child, _)| *child).collect();
        for child in direct {
            let provider_name = self.builder.node(child).name.clone();
            let Some(provider) = recipes.get(&provider_name) else {
                continue;
            };

            let provided: Vec<(NodeIndex, String)> = self
                .builder
                .edges(child)
                .into_iter()
                .map(|(grandchild, _)| (grandchild, self.builder.node(grandchild).name.clone()))
                .filter(|(_, name)| provider.provides(name))
                .collect();

            for (grandchild, name) in provided {
                match by_name.get(&name) {
                    Some(existing) if *existing == grandchild => {}
                    Some(_) => {
                        return Err(RecipeError::IncompatibleVariants {
                            recipe: recipe.name.clone(),
                            dependency: name,
                        });
                    }
                    None => {
                        by_name.insert(name, grandchild);
                        edges.push((
                            grandchild,
                            DepEdge::indirect(format!("provided by {provider_name}")),
                        ));
                    }
                }
            }
        }

        let checkout = checkout_step(recipe, env)?;
        let node = self.builder.add_node(PackageNode {
            name: recipe.name.clone(),
            variant_id,
            meta_env: recipe.meta_environment.clone(),
            checkout,
            sources: recipe.sources.clone(),
        });
        for (child, edge) in edges {
            self.builder.add_edge(node, child, edge);
        }

        log::debug!("resolved {} variant {}", recipe.name, variant_id.short());
        Ok(node)
    }
}

/// Apply the recipe's fixed values and defaults on top of what the parent
/// passed down. Fixed values win over the recipe's own defaults.
fn package_env(recipe: &Recipe, inherited: &Env) -> Result<Env, RecipeError> {
    let mut env = inherited.clone();

    for (key, expected) in &recipe.fixed_environment {
        if let Some(found) = env.get(key)
            && found != expected
        {
            return Err(RecipeError::Contradiction {
                recipe: recipe.name.clone(),
                variable: key.clone(),
                expected: expected.clone(),
                found: found.clone(),
            });
        }
        env.insert(key.clone(), expected.clone());
    }
    for (key, value) in &recipe.environment {
        env.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Ok(env)
}

/// The checkout only sees `checkoutVars`, so its identity ignores everything
/// else.
fn checkout_step(recipe: &Recipe, env: &Env) -> Result<CheckoutStep, RecipeError> {
    let checkout_env: Env = recipe
        .checkout_vars
        .iter()
        .filter_map(|var| env.get(var).map(|value| (var.clone(), value.clone())))
        .collect();
    let scms = recipe.checkout_scms(&checkout_env)?;

    let mut params: Vec<(String, String)> = checkout_env.into_iter().collect();
    for (i, scm) in scms.iter().enumerate() {
        params.extend(
            scm.properties()
                .into_iter()
                .map(|(key, value)| (format!("@scm{i}.{key}"), value)),
        );
    }

    Ok(CheckoutStep {
        variant_id: VariantId::compute(
            &recipe.name,
            params.iter().map(|(key, value)| (key.as_str(), value.as_str())),
        ),
        scms,
    })
}
