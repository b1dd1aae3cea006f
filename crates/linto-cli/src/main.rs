//! linto - deployment CLI for the LinTO platform
//!
//! Usage:
//!   linto wizard            # Create a profile interactively
//!   linto render <profile>  # Generate deployment artifacts
//!   linto deploy <profile>  # Apply a deployment
//!   linto status <profile>  # Inspect a running deployment

mod wizard;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linto_core::error::DeployError;
use linto_core::gpu::validate_gpu_capacity;
use linto_core::render::{DeployContext, DestroyOptions, LogOptions, backend_for};
use linto_core::runner::CommandRunner;
use linto_core::store::ProfileStore;

use crate::wizard::WizardFlow;

#[derive(Parser)]
#[command(name = "linto")]
#[command(about = "LinTO deployment tool - render and apply deployment profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Hide docker/kubectl/helm commands being executed
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive wizard to create a deployment profile
    Wizard,

    /// List all deployment profiles
    List,

    /// Show a profile's configuration
    Show {
        /// Profile name
        profile: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Render deployment artifacts for a profile
    Render {
        /// Profile name
        profile: String,

        /// Write artifacts to this directory instead of .linto/render/
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a deployment
    Deploy {
        /// Profile name
        profile: String,
    },

    /// Tear a deployment down
    Destroy {
        /// Profile name
        profile: String,

        /// Also remove rendered files on disk
        #[arg(long)]
        remove_files: bool,

        /// Also remove persistent volumes (k3s: PVCs)
        #[arg(long)]
        remove_volumes: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show status of deployed services
    Status {
        /// Profile name
        profile: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show logs from a deployed service
    Logs {
        /// Profile name
        profile: String,

        /// Service, pod/<name> or deployment/<name>
        service: Option<String>,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(long, default_value_t = 100)]
        tail: u32,
    },

    /// Manage profiles
    Profile(ProfileArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct ProfileArgs {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand)]
enum ProfileSubcommand {
    /// Delete a profile
    Delete {
        /// Profile name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Copy a profile to a new name
    Copy {
        /// Source profile name
        src: String,
        /// Destination profile name
        dst: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linto=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(deploy_err) = err.downcast_ref::<DeployError>() {
                eprintln!(
                    "{} {}",
                    style(format!("Error ({}):", deploy_err.code())).red().bold(),
                    deploy_err.message()
                );
            } else {
                eprintln!("{} {err:#}", style("Error:").red().bold());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let runner = CommandRunner::new(!cli.quiet);
    let ctx = DeployContext::from_cwd(runner)?;
    let store = ProfileStore::new(ctx.base_dir.clone());

    match cli.command {
        Commands::Wizard => run_wizard(store),
        Commands::List => run_list(&store),
        Commands::Show { profile, format } => run_show(&store, &profile, format),
        Commands::Render { profile, output } => run_render(&ctx, &store, &profile, output),
        Commands::Deploy { profile } => run_deploy(&ctx, &store, &profile),
        Commands::Destroy {
            profile,
            remove_files,
            remove_volumes,
            yes,
        } => run_destroy(&ctx, &store, &profile, remove_files, remove_volumes, yes),
        Commands::Status { profile, format } => run_status(&ctx, &store, &profile, format),
        Commands::Logs {
            profile,
            service,
            follow,
            tail,
        } => run_logs(&ctx, &store, &profile, service.as_deref(), follow, tail),
        Commands::Profile(args) => match args.command {
            ProfileSubcommand::Delete { name, yes } => run_profile_delete(&store, &name, yes),
            ProfileSubcommand::Copy { src, dst } => run_profile_copy(&store, &src, &dst),
        },
    }
}

fn run_wizard(store: ProfileStore) -> Result<()> {
    let flow = WizardFlow::new(store);
    if flow.run()?.is_none() {
        println!("{}", style("Wizard cancelled, nothing saved.").yellow());
    }
    Ok(())
}

fn run_list(store: &ProfileStore) -> Result<()> {
    let profiles = store.list()?;
    if profiles.is_empty() {
        println!("{}", style("No profiles found.").yellow());
        println!("{}", style("Use 'linto wizard' to create one.").dim());
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:<28} {}",
        style("NAME").bold(),
        style("BACKEND").bold(),
        style("DOMAIN").bold(),
        style("SERVICES").bold()
    );
    for profile in &profiles {
        let summary = ProfileStore::summary(profile);
        println!(
            "{:<20} {:<10} {:<28} {}",
            summary.name, summary.backend, summary.domain, summary.services
        );
    }
    Ok(())
}

fn run_show(store: &ProfileStore, profile_name: &str, format: OutputFormat) -> Result<()> {
    let profile = store.load(profile_name)?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        OutputFormat::Table => {
            let summary = ProfileStore::summary(&profile);
            let rows = [
                ("Name", summary.name),
                ("Backend", summary.backend),
                ("Domain", summary.domain),
                ("Image tag", profile.image_tag.clone()),
                ("TLS mode", profile.tls_mode.as_str().to_string()),
                ("GPU mode", profile.gpu_mode.as_str().to_string()),
                ("Services", summary.services),
                ("Admin email", profile.super_admin_email.clone()),
            ];
            for (label, value) in rows {
                println!("{:<14} {}", style(label).cyan(), value);
            }
        }
    }
    Ok(())
}

fn print_gpu_warnings(profile: &linto_core::ProfileConfig) {
    for warning in validate_gpu_capacity(profile) {
        println!("{}", style(warning).yellow());
    }
}

fn run_render(ctx: &DeployContext, store: &ProfileStore, profile_name: &str, output: Option<PathBuf>) -> Result<()> {
    let profile = store.load(profile_name)?;
    print_gpu_warnings(&profile);

    let backend = backend_for(profile.backend);
    let path = backend.generate(ctx, profile_name, output.as_deref())?;
    println!("{} {}", style("Artifacts written to").green(), style(path.display()).bold());
    Ok(())
}

fn run_deploy(ctx: &DeployContext, store: &ProfileStore, profile_name: &str) -> Result<()> {
    let profile = store.load(profile_name)?;
    print_gpu_warnings(&profile);

    let backend = backend_for(profile.backend);
    backend.apply(ctx, profile_name)?;
    println!(
        "{} {}",
        style("Deployment complete. Access at:").green(),
        style(format!("{}://{}", profile.tls_mode.scheme(), profile.domain)).bold()
    );
    Ok(())
}

fn run_destroy(
    ctx: &DeployContext,
    store: &ProfileStore,
    profile_name: &str,
    remove_files: bool,
    remove_volumes: bool,
    yes: bool,
) -> Result<()> {
    let profile = store.load(profile_name)?;

    if !yes {
        let mut prompt = format!("Destroy deployment '{profile_name}'");
        if remove_volumes {
            prompt.push_str(" and delete its data volumes");
        }
        prompt.push('?');
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }

    let backend = backend_for(profile.backend);
    backend.destroy(
        ctx,
        profile_name,
        &DestroyOptions {
            remove_files,
            remove_volumes,
        },
    )?;
    println!("{}", style("Deployment removed.").green());
    Ok(())
}

fn run_status(ctx: &DeployContext, store: &ProfileStore, profile_name: &str, format: OutputFormat) -> Result<()> {
    let profile = store.load(profile_name)?;
    let backend = backend_for(profile.backend);
    let services = backend.status(ctx, profile_name)?;

    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = services
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "status": s.status,
                        "detail": s.detail,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            if services.is_empty() {
                println!("{}", style("No deployed services found.").yellow());
                return Ok(());
            }
            println!("{:<48} {:<12} {}", style("NAME").bold(), style("STATUS").bold(), style("DETAIL").bold());
            for service in &services {
                println!(
                    "{:<48} {:<12} {}",
                    service.name,
                    service.status,
                    service.detail.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn run_logs(
    ctx: &DeployContext,
    store: &ProfileStore,
    profile_name: &str,
    service: Option<&str>,
    follow: bool,
    tail: u32,
) -> Result<()> {
    let profile = store.load(profile_name)?;
    let backend = backend_for(profile.backend);
    backend.logs(ctx, profile_name, service, &LogOptions { follow, tail })?;
    Ok(())
}

fn run_profile_delete(store: &ProfileStore, name: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete profile '{name}'?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }
    store.delete(name)?;
    println!("{}", style(format!("Profile '{name}' deleted.")).green());
    Ok(())
}

fn run_profile_copy(store: &ProfileStore, src: &str, dst: &str) -> Result<()> {
    let path = store.copy(src, dst)?;
    println!(
        "{} {}",
        style(format!("Profile '{src}' copied to '{dst}' at")).green(),
        style(path.display()).bold()
    );
    Ok(())
}
