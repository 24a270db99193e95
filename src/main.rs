//! Rollout CLI - fail-fast provisioning pipeline
//!
//! Usage: rollout [COMMAND]
//!
//! Commands:
//!   run     Run the pipeline: install deps, collect assets, migrate, admin
//!   status  Report provisioning state without mutating anything
//!   init    Write a rollout.toml template and an empty manifest
//!
//! Bare `rollout` is equivalent to `rollout run` with defaults.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use rollout::cli::{Cli, Commands};
use rollout::config::{self, Config, ConfigWarning, CONFIG_FILE_NAME};
use rollout::migrate::migration_status;
use rollout::pipeline::{ProvisionEvent, ProvisionOptions, Provisioner};
use rollout::{admin, Manifest};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;
    let verbose = cli.verbose;

    match cli.command {
        Some(Commands::Run {
            config,
            project_dir,
            manifest,
            admin_username,
            admin_email,
            admin_password,
            yes,
        }) => cmd_run(
            RunArgs {
                config,
                project_dir,
                manifest,
                admin_username,
                admin_email,
                admin_password,
                yes,
            },
            json,
            verbose,
        ),
        Some(Commands::Status {
            config,
            project_dir,
        }) => cmd_status(config, project_dir, json),
        Some(Commands::Init { project_dir, force }) => cmd_init(project_dir, force, json),
        None => cmd_run(RunArgs::default(), json, verbose),
    }
}

#[derive(Debug, Default)]
struct RunArgs {
    config: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    manifest: Option<PathBuf>,
    admin_username: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    yes: bool,
}

fn cmd_run(args: RunArgs, json: bool, verbose: u8) -> Result<()> {
    let discovery_dir = args
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let (mut config, warnings) = load_config(args.config.as_deref(), &discovery_dir)?;
    report_warnings(&warnings, json);

    config = config.with_env_overrides();

    // CLI flags take the highest priority
    if let Some(dir) = args.project_dir {
        config.project.dir = dir;
    }
    if let Some(manifest) = args.manifest {
        config.dependencies.manifest = manifest;
    }
    if let Some(username) = args.admin_username {
        config.admin.username = Some(username);
    }
    if let Some(email) = args.admin_email {
        config.admin.email = Some(email);
    }
    if let Some(password) = args.admin_password {
        config.admin.password = Some(password);
    }

    if !json {
        println!("🚀 Rollout provisioning");
        println!("Project: {}", config.project.dir.display());
    }

    let options = ProvisionOptions {
        allow_prompt: !args.yes && !json,
    };
    let provisioner = Provisioner::new(config, options);

    let mut on_event = |event: ProvisionEvent| {
        if json {
            print_json_event(&event);
        } else {
            print_human_event(&event, verbose);
        }
    };

    match provisioner.run_with_events(&mut on_event) {
        Ok(report) => {
            if json {
                let summary = serde_json::json!({
                    "event": "run",
                    "status": "success",
                    "installed": report.install.as_ref().map_or(0, |r| r.installed.len()),
                    "assets_written": report.assets.as_ref().map_or(0, |r| r.written.len()),
                    "migrations_applied": report.migrations.as_ref().map_or(0, |r| r.applied.len()),
                    "admin": report.admin_username,
                });
                println!("{summary}");
            } else {
                if verbose > 0 {
                    print_verbose_report(&report);
                }
                println!("\n✓ Provisioning complete");
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                let summary = serde_json::json!({
                    "event": "run",
                    "status": "failed",
                    "step": failure.step.id(),
                    "error": failure.error.to_string(),
                });
                println!("{summary}");
            }
            Err(failure.into())
        }
    }
}

fn print_human_event(event: &ProvisionEvent, verbose: u8) {
    match event {
        ProvisionEvent::StepStart { step } => {
            if verbose > 0 {
                println!("\n▶ {step}");
            }
        }
        ProvisionEvent::StepDone { step, detail } => {
            println!("✓ {step}: {detail}");
        }
        ProvisionEvent::StepFailed { step, message } => {
            eprintln!("✗ {step}: {message}");
        }
    }
}

fn print_json_event(event: &ProvisionEvent) {
    let value = match event {
        ProvisionEvent::StepStart { step } => serde_json::json!({
            "event": "step_start",
            "step": step.id(),
        }),
        ProvisionEvent::StepDone { step, detail } => serde_json::json!({
            "event": "step_done",
            "step": step.id(),
            "detail": detail,
        }),
        ProvisionEvent::StepFailed { step, message } => serde_json::json!({
            "event": "step_failed",
            "step": step.id(),
            "error": message,
        }),
    };
    println!("{value}");
}

fn print_verbose_report(report: &rollout::pipeline::ProvisionReport) {
    if let Some(install) = &report.install {
        for (name, version) in &install.installed {
            println!("  + {name} {version}");
        }
    }
    if let Some(assets) = &report.assets {
        for path in &assets.written {
            println!("  » {path}");
        }
    }
    if let Some(migrations) = &report.migrations {
        for name in &migrations.applied {
            println!("  ⇡ {name}");
        }
    }
}

fn cmd_status(config: Option<PathBuf>, project_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let discovery_dir = project_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let (mut config, warnings) = load_config(config.as_deref(), &discovery_dir)?;
    report_warnings(&warnings, json);
    config = config.with_env_overrides();
    if let Some(dir) = project_dir {
        config.project.dir = dir;
    }

    let requirements = match Manifest::load(&config.manifest_path()) {
        Ok(manifest) => Some(manifest.len()),
        Err(_) => None,
    };

    let migrations = migration_status(&config.migrations_path(), &config.database_dir_path())?;

    let db_dir = config.database_dir_path();
    let admin_state = match &config.admin.username {
        Some(username) => admin::admin_exists(&db_dir, username)?,
        None => admin::admin_count(&db_dir)? > 0,
    };

    if json {
        let value = serde_json::json!({
            "event": "status",
            "requirements": requirements,
            "migrations_applied": migrations.applied.len(),
            "migrations_pending": migrations.pending,
            "admin_exists": admin_state,
        });
        println!("{value}");
        return Ok(());
    }

    println!("📋 Rollout status");
    println!("Project: {}", config.project.dir.display());
    match requirements {
        Some(count) => println!("Requirements: {count}"),
        None => println!("Requirements: manifest missing or invalid"),
    }
    println!(
        "Migrations: {} applied, {} pending",
        migrations.applied.len(),
        migrations.pending.len()
    );
    for name in &migrations.pending {
        println!("  - {name}");
    }
    println!(
        "Admin account: {}",
        if admin_state { "present" } else { "absent" }
    );

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# Rollout project configuration
#
# All paths are relative to the project directory.

[dependencies]
manifest = "requirements.txt"
index = "pkg-index"
env_dir = "env"

[assets]
source = "static"
dest = "staticfiles"

[database]
dir = "db"
migrations = "migrations"

[admin]
# username = "admin"
# email = "admin@example.com"
# Prefer ROLLOUT_ADMIN_PASSWORD over storing a password here.
"#;

fn cmd_init(project_dir: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    let project_dir = project_dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&project_dir)?;

    let mut created: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    let targets = [
        (project_dir.join(CONFIG_FILE_NAME), CONFIG_TEMPLATE),
        (project_dir.join("requirements.txt"), "# one package per line\n"),
    ];

    for (path, content) in targets {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if path.exists() && !force {
            skipped.push(name);
            continue;
        }
        std::fs::write(&path, content)?;
        created.push(name);
    }

    if json {
        let value = serde_json::json!({
            "event": "init",
            "created": created,
            "skipped": skipped,
        });
        println!("{value}");
        return Ok(());
    }

    for name in &created {
        println!("✓ Created {name}");
    }
    for name in &skipped {
        println!("⚠ Skipped {name} (already exists, use --force to overwrite)");
    }

    Ok(())
}

fn load_config(
    explicit: Option<&Path>,
    project_dir: &Path,
) -> Result<(Config, Vec<ConfigWarning>)> {
    if let Some(path) = explicit {
        return Ok(Config::load_with_warnings(path)?);
    }

    let project_config = project_dir.join(CONFIG_FILE_NAME);
    if project_config.exists() {
        return Ok(Config::load_with_warnings(&project_config)?);
    }

    if let Some(user_config) = config::user_config_path() {
        if user_config.exists() {
            return Ok(Config::load_with_warnings(&user_config)?);
        }
    }

    Ok((Config::default(), Vec::new()))
}

fn report_warnings(warnings: &[ConfigWarning], json: bool) {
    for warning in warnings {
        let location = match warning.line {
            Some(line) => format!("{}:{line}", warning.file.display()),
            None => warning.file.display().to_string(),
        };
        let suggestion = warning
            .suggestion
            .as_ref()
            .map(|s| format!(" (did you mean '{s}'?)"))
            .unwrap_or_default();
        if json {
            let value = serde_json::json!({
                "event": "config_warning",
                "key": warning.key,
                "file": warning.file.display().to_string(),
                "line": warning.line,
                "suggestion": warning.suggestion,
            });
            println!("{value}");
        } else {
            eprintln!("⚠ Unknown config key '{}' in {location}{suggestion}", warning.key);
        }
    }
}
