//! `hotwire list`: resolve identifiers without starting anything.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::SupervisorConfig;
use crate::resolve::{Identifier, Resolution, SourceResolver, WorkerClassRef};
use crate::utils::plural::plural_count;

pub fn list_workers(config: &SupervisorConfig, identifiers: &[String]) -> Result<()> {
    let identifiers = Identifier::parse_all(identifiers)?;
    let resolution = SourceResolver::new(&config.root).resolve(&identifiers, false)?;
    print!("{}", render(&resolution, config));
    Ok(())
}

fn render(resolution: &Resolution, config: &SupervisorConfig) -> String {
    let mut out = String::new();

    for location in &resolution.locations {
        let path = location.path();
        let shown = path.strip_prefix(&config.root).unwrap_or(path);
        out.push_str(&format!("{}\n", shown.display().bold()));

        for class in resolution.classes.iter().filter(|c| &c.location == location) {
            out.push_str(&format!("  {}\n", describe(class)));
        }
    }

    out.push_str(&format!(
        "{} in {}\n",
        plural_count(resolution.classes.len(), "worker"),
        plural_count(resolution.locations.len(), "location")
    ));
    out
}

fn describe(class: &WorkerClassRef) -> String {
    let def = &class.definition;
    format!(
        "{} (queue: {}, every {}ms, x{})",
        def.name,
        def.queue,
        def.interval.as_millis(),
        def.concurrency
    )
}
