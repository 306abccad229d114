use anyhow::Result;
use console::{Term, style};

use recipetree::graph::{PackageGraph, WalkOptions};

use crate::log::package_not_found;

#[derive(Debug, Clone, Copy, Default)]
pub struct LsOptions {
    pub all: bool,
    pub origin: bool,
    pub recursive: bool,
    pub prefixed: bool,
    pub direct: bool,
}

struct Connectors {
    middle: &'static str,
    last: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

const UNICODE: Connectors = Connectors {
    middle: "├── ",
    last: "└── ",
    pipe: "│   ",
    blank: "    ",
};

const ASCII: Connectors = Connectors {
    middle: "|-- ",
    last: "\\-- ",
    pipe: "|   ",
    blank: "    ",
};

struct Printer {
    options: LsOptions,
    connectors: &'static Connectors,
    /// Per tree level, whether more siblings follow
    open: Vec<bool>,
}

impl Printer {
    fn new(options: LsOptions) -> Self {
        let connectors = if Term::stdout().features().wants_emoji() {
            &UNICODE
        } else {
            &ASCII
        };

        Self {
            options,
            connectors,
            open: Vec::new(),
        }
    }

    fn print(&mut self, stack: &[String], depth: usize, last: bool, origin: Option<&str>) {
        let origin = match origin {
            Some(origin) if self.options.origin => format!(" {}", style(format!("({origin})")).dim()),
            _ => String::new(),
        };

        if self.options.prefixed {
            println!("{}{origin}", stack.join("/"));
            return;
        }

        let name = stack.last().map_or("", String::as_str);
        if !self.options.recursive {
            println!("{name}{origin}");
            return;
        }

        self.open.truncate(depth.saturating_sub(1));
        let mut line = String::new();
        for open in &self.open {
            line.push_str(if *open {
                self.connectors.pipe
            } else {
                self.connectors.blank
            });
        }
        line.push_str(if last {
            self.connectors.last
        } else {
            self.connectors.middle
        });
        self.open.push(!last);

        println!("{line}{name}{origin}");
    }
}

/// List what `path` depends on. Without a path the roots are the first level.
/// Returns the number of paths that matched nothing.
pub fn ls_cmd(graph: &PackageGraph, path: &str, options: LsOptions) -> Result<usize> {
    let matches = match graph.query_path(path) {
        Ok(matches) => matches,
        Err(err) => {
            package_not_found(&err);
            return Ok(1);
        }
    };

    if options.direct {
        for found in &matches {
            println!("{}", found.stack.join("/"));
        }
        return Ok(0);
    }

    let walk_options = WalkOptions {
        recursive: options.recursive,
        include_indirect: options.all,
        once: false,
    };
    let mut printer = Printer::new(options);
    let roots_first = path.trim_matches('/').is_empty();

    for (i, found) in matches.iter().enumerate() {
        let offset = if roots_first {
            printer.print(&found.stack, 1, i + 1 == matches.len(), None);
            if !options.recursive {
                continue;
            }
            1
        } else {
            printer.open.clear();
            0
        };

        for entry in graph.walk(found.node, found.stack.clone(), walk_options) {
            let entry = entry?;
            printer.print(&entry.stack, entry.depth + offset, entry.last, entry.origin);
        }
    }

    Ok(0)
}
