//! Court catalogue listing.

use console::style;

use caselook::catalogue::load_catalogue;
use caselook::config::Config;

use crate::cli::helpers::format_number;

/// Print the catalogue with include flags.
pub fn cmd_courts(config: &Config, only_included: bool) -> anyhow::Result<()> {
    let path = config.resolved_paths().catalogue;
    let courts = load_catalogue(&path)?;
    let included = courts.iter().filter(|c| c.included).count();

    println!("{:<12} {:<8} {}", style("ID").bold(), style("CRAWL").bold(), style("TITLE").bold());
    for court in courts.iter().filter(|c| c.included || !only_included) {
        let flag = if court.included {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!("{:<12} {:<8} {}", court.id, flag, court.title);
    }

    println!();
    println!(
        "{} of {} courts included ({})",
        format_number(included),
        format_number(courts.len()),
        path.display()
    );
    Ok(())
}
