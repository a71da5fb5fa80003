mod affordance;
mod classifier;
mod conversation;
mod orchestrator;
mod report;
mod runner;

#[cfg(test)]
mod testkit;

use clap::{Parser, Subcommand};
use rollcall_channels::{factory::build_notifiers, ChannelFactory};
use rollcall_core::{
    config::{self, shellexpand, Config},
    mask::mask_identifier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "rollcall: daily check-ins against chat bots and web endpoints"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "ROLLCALL_CONFIG",
        global = true
    )]
    config: String,

    /// Log at debug level (RUST_LOG still wins).
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in every enabled account and send the report.
    Run {
        /// Print the report instead of delivering it.
        #[arg(long)]
        no_notify: bool,
        /// Only run the named account(s).
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
        /// Also print the results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate the config and list accounts.
    Check,
    /// Classify a reply text, to help write patterns.
    Classify {
        /// Include this account's extra patterns.
        #[arg(long)]
        account: Option<String>,
        /// The reply text.
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match &cli.command {
        Commands::Classify { account: None, .. } => None,
        _ => match config::load(&cli.config) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                let _guard = init_logging(None, cli.debug);
                error!("{e}");
                return ExitCode::from(report::EXIT_HARD_FAILURE);
            }
        },
    };
    let _guard = init_logging(cfg.as_ref(), cli.debug);

    let outcome = match cli.command {
        Commands::Run {
            no_notify,
            only,
            json,
        } => match cfg {
            Some(cfg) => run(cfg, no_notify, only, json).await,
            None => Err(anyhow::anyhow!("no config loaded")),
        },
        Commands::Check => match cfg {
            Some(cfg) => check(&cli.config, &cfg),
            None => Err(anyhow::anyhow!("no config loaded")),
        },
        Commands::Classify { account, text } => {
            classify(cfg.as_ref(), account, &text.join(" "))
        }
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(report::EXIT_HARD_FAILURE)
        }
    }
}

/// Install the tracing subscriber: stderr always, plus a daily log file
/// under `{data_dir}/logs` when a config is loaded.
fn init_logging(
    cfg: Option<&Config>,
    debug: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = if debug {
        "debug"
    } else {
        cfg.map_or("info", |c| c.rollcall.log_level.as_str())
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = cfg.and_then(|c| {
        let dir = PathBuf::from(shellexpand(&c.rollcall.data_dir)).join("logs");
        std::fs::create_dir_all(&dir).ok().map(|()| dir)
    });
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rollcall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

async fn run(cfg: Config, no_notify: bool, only: Vec<String>, json: bool) -> anyhow::Result<u8> {
    let cfg = Arc::new(cfg);
    let accounts: Vec<_> = cfg
        .accounts
        .iter()
        .filter(|a| only.is_empty() || only.contains(&a.name))
        .cloned()
        .collect();
    if accounts.is_empty() {
        anyhow::bail!("no accounts match {only:?}");
    }

    let factory = Arc::new(ChannelFactory::new(cfg.clone()));
    let runner = runner::AccountRunner::new(cfg.policy.clone(), factory);

    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing the in-flight account");
            cancel.cancel();
        }
    });

    info!("{}: checking in {} account(s)", cfg.rollcall.name, accounts.len());
    let results = runner.run_all(&accounts).await;
    let body = report::render(&results);
    let summary = report::summarize(&results);
    if summary.failed() > 0 {
        warn!("{summary}");
    } else {
        info!("{summary}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    let title = format!(
        "{} {}",
        cfg.notify.title,
        chrono::Local::now().format("%Y-%m-%d")
    );
    if no_notify {
        println!("{title}\n\n{body}");
    } else {
        let notifiers = build_notifiers(&cfg.notify);
        if notifiers.is_empty() {
            warn!("no notifiers enabled; printing report");
            println!("{title}\n\n{body}");
        } else {
            let delivered = report::notify_all(&notifiers, &title, &body).await;
            info!("report delivered to {delivered}/{} notifier(s)", notifiers.len());
        }
    }

    Ok(report::exit_code(&results))
}

fn check(path: &str, cfg: &Config) -> anyhow::Result<u8> {
    println!("rollcall config check\n");
    println!("Config: {path}");
    println!(
        "Policy: {} attempt(s), backoff {}s, settle {}s, delay {}s",
        cfg.policy.attempt_budget,
        cfg.policy.backoff_secs,
        cfg.policy.settle_secs,
        cfg.policy.inter_account_delay_secs
    );
    let builtin = classifier::PatternSet::defaults();
    println!(
        "Patterns: {} status rule(s), {} field rule(s) built in",
        builtin.status_rule_count(),
        builtin.field_rule_count()
    );
    println!();
    for account in &cfg.accounts {
        classifier::PatternSet::for_account(&account.patterns)?;
        let extra = match account.patterns.len() {
            0 => String::new(),
            n => format!(", {n} extra pattern(s)"),
        };
        println!(
            "  {}: {:?} → {} ({}){extra}",
            mask_identifier(&account.name),
            account.transport,
            account.agent,
            if account.enabled { "enabled" } else { "disabled" },
        );
    }
    println!();
    let notifiers = build_notifiers(&cfg.notify);
    let names: Vec<_> = notifiers.iter().map(|n| n.name()).collect();
    if names.is_empty() {
        println!("Notifiers: none");
    } else {
        println!("Notifiers: {}", names.join(", "));
    }
    Ok(report::EXIT_OK)
}

fn classify(cfg: Option<&Config>, account: Option<String>, text: &str) -> anyhow::Result<u8> {
    let patterns = match (cfg, account) {
        (Some(cfg), Some(name)) => {
            let account = cfg
                .accounts
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| anyhow::anyhow!("no account named {name}"))?;
            classifier::PatternSet::for_account(&account.patterns)?
        }
        _ => classifier::PatternSet::defaults(),
    };
    let outcome = classifier::classify(text, &patterns);
    println!("status: {}", outcome.status);
    println!("detail: {}", outcome.detail);
    for (key, value) in &outcome.fields {
        println!("{key}: {value}");
    }
    Ok(report::EXIT_OK)
}
