//! Text output for the CLI.

use colored::Colorize;
use procgraph_core::{AnswerSource, Hierarchy, InvalidHierarchy, ResultRow, Session, Subtype};

pub fn print_fallback(reason: &Option<String>) {
    if let Some(reason) = reason {
        eprintln!(
            "{} engine failed ({reason}); answered by the local evaluator",
            "warning:".yellow().bold()
        );
    }
}

pub fn print_rows(variables: &[String], rows: &[ResultRow], source: &AnswerSource) {
    if !variables.is_empty() {
        let header: Vec<String> = variables.iter().map(|v| format!("?{v}")).collect();
        println!("{}", header.join("\t").bold());
    }
    for row in rows {
        let cells: Vec<&str> = variables
            .iter()
            .map(|v| row.get(v).map_or("", |value| value.display()))
            .collect();
        println!("{}", cells.join("\t"));
    }
    let source = match source {
        AnswerSource::Engine(name) => format!("engine `{name}`"),
        AnswerSource::Local => "local evaluator".to_string(),
    };
    eprintln!("{} row(s) from {}", rows.len(), source.cyan());
}

pub fn print_validation_errors(invalid: &InvalidHierarchy) {
    eprintln!(
        "{} hierarchy is invalid ({} error(s))",
        "error:".red().bold(),
        invalid.errors.len()
    );
    for error in &invalid.errors {
        eprintln!("  {} {}: {}", "→".red(), error.graph.bold(), error.message);
    }
}

pub fn print_hierarchy(hierarchy: &Hierarchy, session: &Session) {
    let prefixes = session.prefixes();
    for (depth, node) in hierarchy.walk() {
        let mut line = format!("{}{}", "  ".repeat(depth), node.display_label());
        line.push_str(&format!(" {}", prefixes.display(&node.id).dimmed()));
        if let Some(ty) = &node.declared_type {
            line.push_str(&format!(" [{}]", prefixes.display(ty).cyan()));
        }
        if node.placeholder {
            line.push_str(&format!(" {}", "(placeholder)".yellow()));
        }
        if !node.individuals.is_empty() {
            line.push_str(&format!(" {} individual(s)", node.individuals.len()));
        }
        println!("{line}");
    }
}

pub fn print_subtypes(session: &Session) {
    let prefixes = session.prefixes();
    let hierarchy = session.hierarchy().ok();
    let label = |id: &str| {
        hierarchy
            .and_then(|h| h.node(id))
            .and_then(|n| n.label.clone())
            .unwrap_or_else(|| prefixes.display(id))
    };
    for (schema, entries) in session.subtypes() {
        println!("{} {}", label(schema).bold(), prefixes.display(schema).dimmed());
        for (individual, subtype) in entries {
            println!("  {:<32} {}", label(individual), paint(*subtype));
        }
    }
}

fn paint(subtype: Subtype) -> colored::ColoredString {
    let name = subtype.local_name();
    match subtype {
        Subtype::NotDefined => name.red(),
        Subtype::DetailedChild => name.green(),
        Subtype::DetailedExternal => name.cyan(),
        Subtype::NotDetailedChild => name.normal(),
        Subtype::NotDetailedExternal => name.yellow(),
    }
}
