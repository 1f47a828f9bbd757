//! Human readable rendering of reports and pipelines.

use console::style;

use adviser_core::{Justification, JustificationType, Report};

use crate::show_pipeline::UnitListing;

pub fn print_report(report: &Report) {
    print_stack_info(&report.stack_info);

    for (rank, product) in report.products.iter().enumerate() {
        println!(
            "{} #{} {}",
            style("Stack").green().bold(),
            rank + 1,
            style(format!("(score {:.4})", product.score)).dim()
        );
        for line in product.to_requirements().lines() {
            println!("  {}", line);
        }
        for record in &product.justification {
            print_justification(record, "  ");
        }
        println!();
    }

    println!(
        "{} {} iterations, {} accepted and {} discarded final states in {:.3}s (seed {})",
        style("Summary:").cyan().bold(),
        report.iterations,
        report.accepted_final_states_count,
        report.discarded_final_states_count,
        report.elapsed_secs,
        report.seed
    );
}

/// Run level records, followed by a blank line if there were any
pub fn print_stack_info(stack_info: &[Justification]) {
    for record in stack_info {
        print_justification(record, "");
    }
    if !stack_info.is_empty() {
        println!();
    }
}

fn print_justification(record: &Justification, indent: &str) {
    let label = match record.kind {
        JustificationType::Info => style("info:").cyan(),
        JustificationType::Warning => style("warning:").yellow(),
        JustificationType::Error => style("error:").red().bold(),
    };
    println!("{}{} {}", indent, label, record.message);
    if let Some(link) = &record.link {
        println!("{}  {}", indent, style(link).dim());
    }
}

pub fn print_units(units: &[UnitListing]) {
    if units.is_empty() {
        println!("{}", style("No pipeline units").dim());
        return;
    }

    let width = units.iter().map(|u| u.name.len()).max().unwrap_or(0);
    for unit in units {
        let configuration = if unit.configuration.is_empty() {
            String::new()
        } else {
            serde_json::Value::Object(unit.configuration.clone()).to_string()
        };
        println!(
            "{:<6} {:<width$} {}",
            style(unit.category).cyan(),
            style(unit.name).white().bold(),
            style(configuration).dim(),
            width = width
        );
    }
}
