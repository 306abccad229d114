use anyhow::Result;
use comfy_table::Table;
use std::collections::HashSet;

use recipetree::scm::{StatusChecker, StatusKind, StatusRequest};

use crate::{
    commands::{Project, resolve_paths, select_packages},
    log::{checkout_status, nothing_to_check},
};

pub async fn status_cmd(
    project: &Project,
    paths: &[String],
    recursive: bool,
    show_clean: bool,
    table: bool,
) -> Result<usize> {
    let graph = &project.graph;
    let (matches, missing, recursive) = if paths.is_empty() {
        (graph.query_path("")?, 0, true)
    } else {
        let (matches, missing) = resolve_paths(graph, paths);
        (matches, missing, recursive)
    };

    let mut done = HashSet::new();
    let mut labels = Vec::new();
    let mut requests = Vec::new();

    for (stack, node) in select_packages(graph, &matches, recursive)? {
        let package = graph.node(node);
        if !done.insert(package.checkout.variant_id) {
            continue;
        }

        let checkout_root = project.config.checkout_root(
            &project.root,
            &package.name,
            package.checkout.variant_id,
        );
        for spec in &package.checkout.scms {
            labels.push(stack.join("/"));
            requests.push(StatusRequest {
                spec: spec.clone(),
                checkout_root: checkout_root.clone(),
            });
        }
    }

    if requests.is_empty() {
        nothing_to_check();
        return Ok(missing);
    }

    let statuses = StatusChecker::new().check_all(&requests).await;
    let shown = labels
        .iter()
        .zip(&requests)
        .zip(&statuses)
        .filter(|(_, status)| show_clean || status.kind != StatusKind::Clean);

    if table {
        let mut table = Table::new();
        table.set_header(vec!["Status", "Package", "Directory", "Message"]);

        for ((label, request), status) in shown {
            table.add_row(vec![
                status.kind.to_string(),
                label.clone(),
                request
                    .spec
                    .checkout_dir(&request.checkout_root)
                    .display()
                    .to_string(),
                status.message.clone(),
            ]);
        }

        println!("{table}");
    } else {
        for ((label, request), status) in shown {
            checkout_status(
                label,
                &request.spec.checkout_dir(&request.checkout_root),
                status,
            );
        }
    }

    Ok(missing)
}
