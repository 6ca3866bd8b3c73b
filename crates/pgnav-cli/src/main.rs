// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use pgnav_app::{Browser, DEFAULT_API_BASE};
use pgnav_prefs::PrefStore;
use pgnav_testkit::DemoApi;
use runtime::ApiRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pgnav --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let prefs_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        pgnav_prefs::default_prefs_path()?
    };
    if options.print_prefs_path {
        println!("{}", prefs_path.display());
        return Ok(());
    }

    init_logging(&config)?;

    let prefs = if options.demo {
        PrefStore::open_memory()?
    } else {
        PrefStore::open(&prefs_path).with_context(|| {
            format!(
                "open prefs database {} -- if this path is wrong, set PGNAV_PREFS_PATH",
                prefs_path.display()
            )
        })?
    };
    prefs.bootstrap()?;

    let client = pgnav_api::Client::new(config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix the timeout value",
            options.config_path.display()
        )
    })?;

    let demo = if options.demo {
        Some(DemoApi::start()?)
    } else {
        None
    };

    let api_base = resolve_api_base(
        options.api_base.as_deref(),
        demo.as_ref().map(DemoApi::base_url),
        prefs.get_api_base()?,
        config.api_base(),
    )?;
    info!(%api_base, demo = options.demo, "starting pgnav");
    if options.check_only {
        return Ok(());
    }

    let mut browser = Browser::new(&api_base);
    let password = env::var("PGPASSWORD").ok();
    let mut runtime = ApiRuntime::new(client, prefs, config.connection_defaults(password));
    let result = pgnav_tui::run_app(&mut browser, &mut runtime);
    drop(demo);
    result
}

/// Picks the API base for this session: explicit flag, demo server, saved
/// preference, config file, built-in default.
fn resolve_api_base(
    cli: Option<&str>,
    demo: Option<&str>,
    saved: Option<String>,
    configured: Option<&str>,
) -> Result<String> {
    if let Some(cli) = cli {
        let url = pgnav_api::validate_api_base(cli).context("--api-base")?;
        return Ok(url.as_str().trim_end_matches('/').to_owned());
    }
    if let Some(demo) = demo {
        return Ok(demo.to_owned());
    }
    if let Some(saved) = saved {
        match pgnav_api::validate_api_base(&saved) {
            Ok(_) => return Ok(saved),
            Err(error) => warn!(error = %format!("{error:#}"), "ignoring saved API base"),
        }
    }
    Ok(configured.unwrap_or(DEFAULT_API_BASE).to_owned())
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].path to a writable location",
                path.display()
            )
        })?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .context("build log filter")?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    api_base: Option<String>,
    print_config_path: bool,
    print_prefs_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        api_base: None,
        print_config_path: false,
        print_prefs_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--api-base" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--api-base requires a URL"))?;
                options.api_base = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-prefs-path" => {
                options.print_prefs_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("pgnav: terminal browser for the pgweb API");
    println!("  --config <path>          Use a specific config path");
    println!("  --api-base <url>         Use this API base for the session (not saved)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-prefs-path       Print resolved preferences database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Browse a built-in sample catalog");
    println!("  --check                  Validate config, prefs and HTTP client, then exit");
    println!("  --help                   Show this help");
}
