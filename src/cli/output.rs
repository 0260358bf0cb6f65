//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::ward::{SearchResult, Statistics};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print secret names one per line, or a hint for an empty ward.
pub fn print_secret_names(ward: &str, names: &[String]) {
    if names.is_empty() {
        info(&format!("No passphrases in ward '{ward}' yet."));
        tip("Run `warded edit <NAME>` or `warded generate <LEN> <NAME>` to add one.");
        return;
    }

    for name in names {
        println!("{name}");
    }
}

/// Print one grep hit as `name:line  text` with the match highlighted.
pub fn print_search_result(result: &SearchResult) {
    let (before, hit, after) = result.parts();
    println!(
        "{} {}{}{}",
        style(format!("{}:{}", result.name, result.line_number + 1)).blue(),
        before,
        style(hit).red().bold(),
        after
    );
}

/// Print duplicate groups, the length histogram and the totals.
pub fn print_stats(stats: &Statistics) {
    println!("{}", style("Duplicates:").bold());
    let mut dupes = Table::new();
    dupes.set_content_arrangement(ContentArrangement::Dynamic);
    dupes.set_header(vec!["Length", "Passphrases"]);
    let mut found = false;
    for group in stats.duplicates() {
        found = true;
        dupes.add_row(vec![group.length.to_string(), group.secrets.join(", ")]);
    }
    if found {
        println!("{dupes}");
    } else {
        success("None found");
    }

    println!("{}", style("Lengths:").bold());
    let mut lengths = Table::new();
    lengths.set_content_arrangement(ContentArrangement::Dynamic);
    lengths.set_header(vec!["Length", "Count"]);
    for (length, count) in stats.length_histogram() {
        lengths.add_row(vec![length.to_string(), count.to_string()]);
    }
    println!("{lengths}");

    println!("Passphrase count: {}", stats.count);
    match stats.average_length() {
        Some(avg) => println!("Average passphrase length: {avg:.2}"),
        None => println!("Average passphrase length: -"),
    }
}
