//! List the projects of the configured workspace.

use std::io::Write;

use anyhow::{Context, Result};
use wt_clockify::{Client, Project};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, json: bool, config: &Config) -> Result<()> {
    let client = Client::new(config.client_settings()?).context("failed to create Clockify client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let projects = runtime
        .block_on(client.projects())
        .context("failed to list projects")?;
    write_projects(writer, &projects, json)
}

fn write_projects<W: Write>(writer: &mut W, projects: &[Project], json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(projects)?)?;
        return Ok(());
    }
    if projects.is_empty() {
        writeln!(writer, "No projects in workspace.")?;
        return Ok(());
    }

    let width = projects.iter().map(|p| p.id.len()).max().unwrap_or(0);
    for project in projects {
        write!(writer, "{:<width$}  {}", project.id, project.name)?;
        if let Some(client) = project.client_name.as_deref().filter(|c| !c.is_empty()) {
            write!(writer, " ({client})")?;
        }
        if project.archived {
            write!(writer, " [archived]")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
