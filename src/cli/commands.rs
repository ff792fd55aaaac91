//! Command dispatch

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, project_config_path, Settings};
use crate::domain::DocumentShape;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute the parsed command line.
pub fn execute(cli: Cli) -> CliResult<()> {
    let Some(command) = cli.command else {
        return Err(CliError::Usage(
            "no command given, see `routekit --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => {
            let settings = Settings::load(cli.project_dir.as_deref())?;
            cmd_config(command, &settings, cli.project_dir.as_deref())
        }
        command => {
            let settings = Settings::load(cli.project_dir.as_deref())?;
            let container = ServiceContainer::new(settings)?;
            dispatch(command, &container, cli.project_dir.as_deref())
        }
    }
}

fn dispatch(command: Commands, container: &ServiceContainer, project_dir: Option<&Path>) -> CliResult<()> {
    match command {
        Commands::Fmt {
            files,
            check,
            write,
        } => cmd_fmt(container, &files, check, write),
        Commands::Check { files } => cmd_check(container, &files),
        Commands::Placeholders { file } => cmd_placeholders(container, &file),
        Commands::Tree { file } => cmd_tree(container, &file),
        Commands::Topology { paths, json } => cmd_topology(container, paths, json, project_dir),
        Commands::New { file, shape, name } => cmd_new(container, &file, shape, name.as_deref()),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_fmt(container: &ServiceContainer, files: &[PathBuf], check: bool, write: bool) -> CliResult<()> {
    let mut unformatted = 0usize;
    for file in files {
        let outcome = container.documents.format(file)?;
        if check {
            if outcome.changed {
                unformatted += 1;
                output::failure(&file.display());
            } else {
                output::success_detail(&file.display());
            }
        } else if write {
            if outcome.changed {
                container
                    .fs
                    .write(file, &outcome.text)
                    .map_err(|e| InfraError::io(format!("write {}", file.display()), e))?;
                output::action("Formatted", &file.display());
            } else {
                debug!("cmd_fmt: unchanged {}", file.display());
            }
        } else {
            print!("{}", outcome.text);
        }
    }

    if unformatted > 0 {
        return Err(CliError::Failed(format!(
            "{} of {} files not in canonical form",
            unformatted,
            files.len()
        )));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_check(container: &ServiceContainer, files: &[PathBuf]) -> CliResult<()> {
    let mut problems = 0usize;
    for file in files {
        let findings = container.documents.check(file)?;
        if findings.is_empty() {
            output::success(&file.display());
            continue;
        }
        output::header(&file.display());
        for finding in &findings {
            let step = container
                .registry
                .step_name(&finding.kind)
                .unwrap_or(&finding.kind);
            for reason in &finding.reasons {
                problems += 1;
                output::failure(&format!("{} [{}]: {}", step, finding.camel_id, reason));
            }
        }
    }

    if problems > 0 {
        return Err(CliError::Failed(format!("{problems} problems found")));
    }
    Ok(())
}

fn cmd_placeholders(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let found = container.documents.placeholders(file)?;
    if found.is_empty() {
        output::info("no placeholders");
        return Ok(());
    }
    print_scope("global", &found.global);
    print_scope("route", &found.route);
    print_scope("exchange", &found.exchange);
    Ok(())
}

fn print_scope(label: &str, names: &BTreeSet<String>) {
    if names.is_empty() {
        return;
    }
    output::header(label);
    for name in names {
        output::detail(name);
    }
}

fn cmd_tree(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let doc = container.documents.load(file)?;
    output::info(&container.documents.render_tree(&doc));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_topology(
    container: &ServiceContainer,
    paths: Vec<PathBuf>,
    json: bool,
    project_dir: Option<&Path>,
) -> CliResult<()> {
    let paths = if paths.is_empty() {
        vec![project_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))]
    } else {
        paths
    };
    let docs = container.project.load_paths(&paths)?;
    let topology = container.project.topology(&docs);

    if json {
        let text = serde_json::to_string_pretty(&topology)
            .map_err(|e| CliError::Failed(format!("serialize topology: {e}")))?;
        output::info(&text);
        return Ok(());
    }

    let titles: HashMap<&str, String> = topology
        .nodes()
        .map(|n| (n.id(), format!("{} ({})", n.title(), n.file_name())))
        .collect();
    let title = |id: &str| titles.get(id).cloned().unwrap_or_else(|| id.to_string());

    output::header(&format!("{} documents", docs.len()));
    for route in &topology.routes {
        output::info(&title(&route.id));
        let targets = topology
            .edges
            .iter()
            .filter(|e| e.source == route.id)
            .map(|e| title(&e.target))
            .join(", ");
        if !targets.is_empty() {
            output::detail(&format!("-> {targets}"));
        }
    }
    for rest in &topology.rests {
        output::info(&format!("{} {}", title(&rest.id), rest.uris.iter().join(" ")));
    }
    for bean in &topology.beans {
        output::info(&format!(
            "bean {}: {}",
            bean.title,
            bean.bean_type.as_deref().unwrap_or("?")
        ));
    }
    output::header("edges");
    for edge in &topology.edges {
        output::edge(&title(&edge.source), &title(&edge.target));
    }
    Ok(())
}

fn cmd_new(
    container: &ServiceContainer,
    file: &Path,
    shape: Option<DocumentShape>,
    name: Option<&str>,
) -> CliResult<()> {
    let doc = container.documents.create(file, shape, name)?;
    output::action("Created", &format!("{} ({})", file.display(), doc.shape));
    Ok(())
}

fn cmd_config(command: ConfigCommands, settings: &Settings, project_dir: Option<&Path>) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            let dir = project_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            output::action("project", &project_config_path(&dir).display());
        }
    }
    Ok(())
}
