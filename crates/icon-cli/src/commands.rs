use anyhow::Context;
use colored::Colorize;

use icon_server::{AppConfig, IconServer, ServiceContext};

use crate::cli::*;

/// Read the configuration file (if any) and apply command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Command::Serve(ServeArgs { bind: Some(bind) }) = &cli.command {
        config.bind_addr = *bind;
    }
}

pub async fn run_command(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    if !matches!(cli.command, Command::Serve(_)) {
        // Operator commands inspect existing data; never wipe it.
        config.reset_data = false;
    }
    tracing::debug!(
        backend = ?config.backend,
        data_dir = %config.data_dir.display(),
        reset_data = config.reset_data,
        "effective configuration"
    );
    match cli.command {
        Command::Serve(_) => cmd_serve(config).await,
        Command::List => cmd_list(&config, &cli.format).await,
        Command::Verify => cmd_verify(&config, &cli.format).await,
        Command::Log(args) => cmd_log(&config, &cli.format, args).await,
        Command::Config => cmd_config(&config, &cli.format),
    }
}

async fn context(config: &AppConfig) -> anyhow::Result<ServiceContext> {
    ServiceContext::build(config)
        .await
        .with_context(|| format!("opening icon data in {}", config.data_dir.display()))
}

async fn cmd_serve(config: AppConfig) -> anyhow::Result<()> {
    let ctx = context(&config).await?;
    println!(
        "{} Icon repository on {} (data: {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.data_dir.display()
    );
    IconServer::new(config.bind_addr, ctx).serve().await?;
    Ok(())
}

async fn cmd_list(config: &AppConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let icons = context(config).await?.coordinator.list_icons().await?;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&icons)?);
        return Ok(());
    }
    if icons.is_empty() {
        println!("No icons.");
        return Ok(());
    }
    for icon in &icons {
        println!("{} ({} files)", icon.name.yellow().bold(), icon.file_count());
        for sizes in icon.paths.values() {
            for path in sizes.values() {
                println!("  {}", path.cyan());
            }
        }
    }
    Ok(())
}

async fn cmd_verify(config: &AppConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let report = context(config).await?.coordinator.verify_consistency().await?;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Checked {} icons, {} files",
            report.icons_checked.to_string().bold(),
            report.files_checked.to_string().bold()
        );
        for path in &report.missing_blobs {
            println!("  {} {}", "missing blob:".red(), path);
        }
        for path in &report.orphan_blobs {
            println!("  {} {}", "orphan blob: ".yellow(), path);
        }
        for path in &report.damaged_blobs {
            println!("  {} {}", "damaged blob:".red(), path);
        }
        if report.is_consistent() {
            println!("{} Metadata and blob store agree", "✓".green().bold());
        }
    }
    if !report.is_consistent() {
        anyhow::bail!("{} discrepancies found", report.discrepancy_count());
    }
    Ok(())
}

async fn cmd_log(config: &AppConfig, format: &OutputFormat, args: LogArgs) -> anyhow::Result<()> {
    let commits = context(config).await?.coordinator.history(args.limit).await?;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }
    if commits.is_empty() {
        println!("No commits.");
        return Ok(());
    }
    for commit in &commits {
        let change = if commit.is_delete() { "-".red() } else { "+".green() };
        if args.oneline {
            println!("{} {} {}", commit.id.short().yellow(), change, commit.message);
        } else {
            println!("{}  {}", commit.id.short().yellow().bold(), commit.timestamp.to_rfc3339().dimmed());
            println!("  Author: {}", commit.author);
            println!("  {} {}", change, commit.path());
            println!("  {}", commit.message);
        }
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let allow_list = &config.allowed_formats;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&allow_list.summary())?);
        return Ok(());
    }
    println!("Allowed formats and sizes:");
    for format in allow_list.formats() {
        let sizes = allow_list.sizes(format).unwrap_or_default().join(", ");
        println!("  {} {}", format.bold(), sizes);
    }
    println!("Backend: {:?}, data: {}", config.backend, config.data_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use clap::Parser;
    use icon_server::Backend;
    use icon_types::{Caller, PrivilegeSet};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = parse(&[
            "iconrepo",
            "serve",
            "--bind",
            "0.0.0.0:9999",
            "--data-dir",
            "/srv/icons",
            "--log-level",
            "warn",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.bind_addr.port(), 9999);
        assert_eq!(config.data_dir, std::path::PathBuf::from("/srv/icons"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iconrepo.toml");
        std::fs::write(&path, "backend = \"memory\"\nlog_level = \"debug\"\n").unwrap();

        let cli = parse(&["iconrepo", "list", "--config", path.to_str().unwrap()]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["iconrepo", "list", "--config", "/no/such/iconrepo.toml"]);
        assert!(load_config(&cli).is_err());
    }

    #[tokio::test]
    async fn verify_passes_on_fresh_repository() {
        let dir = tempfile::tempdir().unwrap();
        let cli = parse(&["iconrepo", "verify", "--data-dir", dir.path().to_str().unwrap()]);
        let config = load_config(&cli).unwrap();
        run_command(cli, config).await.unwrap();
    }

    #[tokio::test]
    async fn operator_commands_ignore_reset_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        {
            let ctx = ServiceContext::build(&config).await.unwrap();
            let caller = Caller::new("ux", PrivilegeSet::all());
            ctx.coordinator
                .create_icon("attach", "svg", "24px", Bytes::from_static(b"<svg/>"), &caller)
                .await
                .unwrap();
        }

        config.reset_data = true;
        let cli = parse(&["iconrepo", "list"]);
        run_command(cli, config.clone()).await.unwrap();

        config.reset_data = false;
        let ctx = ServiceContext::build(&config).await.unwrap();
        assert_eq!(ctx.coordinator.list_icons().await.unwrap().len(), 1);
    }
}
