use console::style;
use std::path::Path;

use recipetree::{
    error::QueryError,
    scm::{ScmStatus, StatusKind},
};

pub fn package_not_found(err: &QueryError) {
    println!("[{}] {err}", style("NOT FOUND").bright().red());
}

pub fn checkout_status(path: &str, dir: &Path, status: &ScmStatus) {
    let kind = match status.kind {
        StatusKind::Clean => style("CLEAN").bright().green(),
        StatusKind::Dirty => style("DIRTY").bright().yellow(),
        StatusKind::Empty => style("EMPTY").bright().black(),
        StatusKind::Error => style("ERROR").bright().red(),
    };

    if status.message.is_empty() {
        println!("[{kind}] {} {}", style(path).bright().green(), dir.display());
    } else {
        println!(
            "[{kind}] {} {} ({})",
            style(path).bright().green(),
            dir.display(),
            status.message
        );
    }
}

pub fn nothing_to_check() {
    println!(
        "[{}] No checkouts to check",
        style("NOTICE").bright().green()
    );
}
