//! Command implementations.
//!
//! Every data command runs against a plugin the user names explicitly:
//! the executable is probed, launched, registered in a fresh manager,
//! and activated with the headless dialog host before the command's
//! calls are made. Logs go to stderr via tracing; stdout carries only
//! the command's output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use ridgeline_config::HostConfig;
use ridgeline_host::{
    Discovery, HostError, IpcPlugin, NoopDialogHost, PluginManager, SeriesBridge,
};
use ridgeline_protocol::StorageLayout;

use crate::cli::{Cli, CliCommand, PluginsAction, SeriesAction};
use crate::error::CliError;
use crate::telemetry;

pub(crate) fn execute(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let config = load_config(cli)?;
    telemetry::initialise(&config)?;
    match &cli.command {
        CliCommand::Plugins { action } => match action {
            PluginsAction::List { dirs } => list_plugins(&config, dirs, out),
            PluginsAction::Probe { path } => probe_plugin(&config, path, out),
        },
        CliCommand::Chart { path, args } => show_chart(&config, path, args.as_deref(), out),
        CliCommand::Series { action } => match action {
            SeriesAction::List { path, args } => list_series(&config, path, args.as_deref(), out),
            SeriesAction::Fetch {
                path,
                series_id,
                args,
                layout,
                output,
            } => fetch_series(
                &config,
                path,
                series_id,
                args.as_deref(),
                layout.map(Into::into),
                output.as_deref(),
                out,
            ),
        },
    }
}

fn load_config(cli: &Cli) -> Result<HostConfig, CliError> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ridgeline_config::default_config_path()?,
    };
    let mut config = HostConfig::load(&path)?;
    if let Some(filter) = &cli.log_filter {
        config.set_log_filter(filter.clone());
    }
    if let Some(format) = cli.log_format {
        config.set_log_format(format.into());
    }
    Ok(config)
}

fn discovery(config: &HostConfig) -> Discovery {
    Discovery::new().with_probe_timeout(config.probe_timeout())
}

fn list_plugins(
    config: &HostConfig,
    extra: &[PathBuf],
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let mut dirs: Vec<PathBuf> = config.plugin_dirs().to_vec();
    if let Some(default) = ridgeline_config::default_plugin_dir() {
        if !dirs.contains(&default) {
            dirs.push(default);
        }
    }
    for dir in extra {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }

    for descriptor in discovery(config).scan_dirs(&dirs) {
        let state = if config.is_disabled(descriptor.name()) {
            "disabled"
        } else {
            "enabled"
        };
        writeln!(
            out,
            "{}\t{}\t{}",
            descriptor.name(),
            state,
            descriptor.executable().display()
        )?;
    }
    Ok(())
}

fn probe_plugin(config: &HostConfig, path: &Path, out: &mut dyn Write) -> Result<(), CliError> {
    let descriptor = discovery(config).probe(path)?;
    let value = json!({
        "name": descriptor.name(),
        "patterns": descriptor.patterns(),
    });
    writeln!(out, "{value}")?;
    Ok(())
}

/// Probes and registers one plugin in a fresh manager. The subprocess
/// is spawned later, on activation.
fn launch(config: &HostConfig, executable: &Path) -> Result<(Arc<PluginManager>, String), CliError> {
    let descriptor = discovery(config).probe(executable)?;
    if config.is_disabled(descriptor.name()) {
        return Err(HostError::Disabled {
            name: descriptor.name().to_owned(),
        }
        .into());
    }
    let manager = Arc::new(PluginManager::new());
    let name = manager.register(Arc::new(IpcPlugin::new(descriptor)))?;
    Ok((manager, name))
}

fn show_chart(
    config: &HostConfig,
    path: &Path,
    args: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let (manager, name) = launch(config, path)?;
    manager.activate(&name, args, &mut NoopDialogHost)?;
    let chart = manager.get(&name)?.chart_config(args)?;
    serde_json::to_writer_pretty(&mut *out, &chart)?;
    writeln!(out)?;
    manager.close_all()?;
    Ok(())
}

fn list_series(
    config: &HostConfig,
    path: &Path,
    args: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let (manager, name) = launch(config, path)?;
    manager.activate(&name, args, &mut NoopDialogHost)?;
    let series = manager.get(&name)?.series_config()?;
    serde_json::to_writer_pretty(&mut *out, &series)?;
    writeln!(out)?;
    manager.close_all()?;
    Ok(())
}

fn fetch_series(
    config: &HostConfig,
    path: &Path,
    series_id: &str,
    args: Option<&str>,
    layout: Option<StorageLayout>,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let (manager, name) = launch(config, path)?;
    manager.activate(&name, args, &mut NoopDialogHost)?;

    let bridge = SeriesBridge::new(Arc::clone(&manager));
    let frame = match layout {
        Some(wanted) => bridge.fetch_as(Some(&name), series_id, wanted)?,
        None => bridge.fetch(Some(&name), series_id, None)?,
    };

    match output {
        Some(file) => std::fs::write(file, frame.payload())?,
        None => {
            let value = json!({
                "storage": frame.storage().as_str(),
                "points": frame.point_count(),
                "values": frame.values(),
            });
            writeln!(out, "{value}")?;
        }
    }
    manager.close_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    fn cli_for(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn listing_an_empty_directory_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("config.json");
        let plugin_dir = dir.path().join("plugins");
        std::fs::create_dir(&plugin_dir).expect("mkdir");

        let cli = cli_for(&[
            "ridgeline",
            "--config",
            config_path.to_str().expect("utf8 path"),
            "plugins",
            "list",
            "--dir",
            plugin_dir.to_str().expect("utf8 path"),
        ]);
        let mut out = Vec::new();
        execute(&cli, &mut out).expect("list succeeds");
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn probing_a_script_prints_its_metadata() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("config.json");
        let script = dir.path().join("csv_reader");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"name\":\"CSV Reader\",\"patterns\":[]}'\n",
        )
        .expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let cli = cli_for(&[
            "ridgeline",
            "--config",
            config_path.to_str().expect("utf8 path"),
            "plugins",
            "probe",
            script.to_str().expect("utf8 path"),
        ]);
        let mut out = Vec::new();
        execute(&cli, &mut out).expect("probe succeeds");
        let text = String::from_utf8(out).expect("utf8 output");
        assert!(text.contains("CSV Reader"));
    }

    #[test]
    fn a_broken_settings_file_fails_the_command() {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").expect("write");

        let cli = cli_for(&[
            "ridgeline",
            "--config",
            config_path.to_str().expect("utf8 path"),
            "plugins",
            "list",
        ]);
        let mut out = Vec::new();
        let err = execute(&cli, &mut out).expect_err("invalid settings");
        assert!(matches!(err, CliError::Config(_)));
    }
}
