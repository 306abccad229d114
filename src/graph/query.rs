use globset::{GlobBuilder, GlobMatcher};

use super::{NodeIndex, PackageGraph};
use crate::error::QueryError;

/// A node reached by a path query, with the path that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    pub stack: Vec<String>,
    pub node: NodeIndex,
}

enum Segment<'a> {
    Exact(&'a str),
    Pattern(GlobMatcher),
}

impl<'a> Segment<'a> {
    fn parse(segment: &'a str) -> Result<Self, QueryError> {
        if !segment.contains(['*', '?', '[']) {
            return Ok(Self::Exact(segment));
        }

        let glob = GlobBuilder::new(segment)
            .literal_separator(true)
            .build()
            .map_err(|source| QueryError::Pattern {
                segment: segment.to_string(),
                source,
            })?;
        Ok(Self::Pattern(glob.compile_matcher()))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => *exact == name,
            Self::Pattern(glob) => glob.is_match(name),
        }
    }
}

impl PackageGraph {
    /// Resolve a `/` separated package path.
    ///
    /// The empty path matches every root alias. The first segment is looked up
    /// among the root aliases, every further one among the children of the
    /// nodes matched so far: direct dependencies first, indirect ones only if
    /// no direct dependency matches. Segments may be glob patterns.
    ///
    /// # Errors
    ///
    /// - A segment matches nothing
    /// - A segment is an invalid glob pattern
    pub fn query_path(&self, path: &str) -> Result<Vec<QueryMatch>, QueryError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let Some((&first, rest)) = segments.split_first() else {
            return Ok(self
                .roots()
                .map(|(alias, node)| QueryMatch {
                    stack: vec![alias.to_string()],
                    node,
                })
                .collect());
        };

        let not_found = |segment: &str| QueryError::PackageNotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        };

        let first_segment = Segment::parse(first)?;
        let mut matches: Vec<QueryMatch> = self
            .roots()
            .filter(|(alias, _)| first_segment.matches(alias))
            .map(|(alias, node)| QueryMatch {
                stack: vec![alias.to_string()],
                node,
            })
            .collect();
        if matches.is_empty() {
            return Err(not_found(first));
        }

        for &segment in rest {
            let pattern = Segment::parse(segment)?;
            let mut next = Vec::new();

            for current in &matches {
                let direct: Vec<_> = self
                    .children(current.node, false)
                    .into_iter()
                    .filter(|child| pattern.matches(child.name))
                    .collect();
                let found = if direct.is_empty() {
                    self.children(current.node, true)
                        .into_iter()
                        .filter(|child| !child.direct && pattern.matches(child.name))
                        .collect()
                } else {
                    direct
                };

                next.extend(found.into_iter().map(|child| {
                    let mut stack = current.stack.clone();
                    stack.push(child.name.to_string());
                    QueryMatch {
                        stack,
                        node: child.node,
                    }
                }));
            }

            if next.is_empty() {
                return Err(not_found(segment));
            }
            matches = next;
        }

        log::debug!("{path} matched {} package(s)", matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::GraphError,
        graph::{DepEdge, tests::diamond, tests::package},
    };

    fn stacks(matches: &[QueryMatch]) -> Vec<String> {
        matches.iter().map(|m| m.stack.join("/")).collect()
    }

    #[test]
    fn empty_path_is_every_root() -> Result<(), GraphError> {
        let mut builder = PackageGraph::builder();
        let b = builder.add_node(package("b"));
        let a = builder.add_node(package("a"));
        builder.add_root("beta", b);
        builder.add_root("alpha", a);
        let graph = builder.build()?;

        let matches = graph
            .query_path("")
            .map_err(|e| GraphError::Integrity(e.to_string()))?;
        assert_eq!(
            matches,
            [
                QueryMatch {
                    stack: vec!["alpha".to_string()],
                    node: a
                },
                QueryMatch {
                    stack: vec!["beta".to_string()],
                    node: b
                },
            ]
        );
        assert_eq!(graph.query_path("/").map(|m| m.len()).ok(), Some(2));

        Ok(())
    }

    #[test]
    fn follows_children() -> Result<(), Box<dyn std::error::Error>> {
        let (graph, [_, libb, _, libd, _]) = diamond()?;

        let matches = graph.query_path("app/libb")?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node, libb);

        let matches = graph.query_path("/app/libc/libd/")?;
        assert_eq!(stacks(&matches), ["app/libc/libd"]);
        assert_eq!(matches[0].node, libd);

        Ok(())
    }

    #[test]
    fn indirect_children_are_a_fallback() -> Result<(), Box<dyn std::error::Error>> {
        let (graph, [_, _, _, libd, _]) = diamond()?;

        let matches = graph.query_path("app/libd")?;
        assert_eq!(matches[0].node, libd);

        Ok(())
    }

    #[test]
    fn missing_segment() -> Result<(), GraphError> {
        let (graph, _) = diamond()?;

        assert!(matches!(
            graph.query_path("app/nope/libd"),
            Err(QueryError::PackageNotFound { segment, .. }) if segment == "nope"
        ));
        assert!(matches!(
            graph.query_path("libb"),
            Err(QueryError::PackageNotFound { segment, .. }) if segment == "libb"
        ));

        Ok(())
    }

    #[test]
    fn glob_segments() -> Result<(), Box<dyn std::error::Error>> {
        let (graph, _) = diamond()?;

        assert_eq!(
            stacks(&graph.query_path("app/lib*")?),
            ["app/libb", "app/libc"]
        );
        assert_eq!(
            stacks(&graph.query_path("app/*/libd")?),
            ["app/libb/libd", "app/libc/libd"]
        );
        assert_eq!(stacks(&graph.query_path("a?p/lib[c]")?), ["app/libc"]);
        assert!(matches!(
            graph.query_path("app/[unterminated"),
            Err(QueryError::Pattern { .. })
        ));

        Ok(())
    }

    #[test]
    fn glob_segment_prefers_direct_children() -> Result<(), Box<dyn std::error::Error>> {
        let mut builder = PackageGraph::builder();
        let tool = builder.add_node(package("tool"));
        let zlib = builder.add_node(package("zlib"));
        let app = builder.add_node(package("app"));
        builder.add_edge(app, tool, DepEdge::direct());
        builder.add_edge(app, zlib, DepEdge::indirect("provided by tool"));
        builder.add_root("app", app);
        let graph = builder.build()?;

        assert_eq!(stacks(&graph.query_path("app/*")?), ["app/tool"]);
        assert_eq!(stacks(&graph.query_path("app/z*")?), ["app/zlib"]);

        Ok(())
    }
}
