use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::Instant;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::client::{ClientOptions, HomeClient};
use crate::config::{self, ConfigFile};
use crate::controller::{PageController, ToggleOutcome};
use crate::output;
use crate::search::RowFilter;

fn print_banner(no_color: bool) {
    let _ = no_color;
    const BANNER: &str = r#"
             _     _          _  __
__   _____ | |___| |__   ___| |/ _|
\ \ / / _ \| / __| '_ \ / _ \ | |_
 \ V / (_) | \__ \ | | |  __/ |  _|
  \_/ \___/|_|___/_| |_|\___|_|_|
       v0.2.1 - category shelf controller
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[derive(Clone, Debug)]
struct SessionConfig {
    base_url: String,
    categories: Vec<String>,
    toggles: Vec<String>,
    quit: bool,
    find: Option<String>,
    timeout: usize,
    proxy: Option<String>,
    follow_redirects: bool,
    no_color: bool,
    output: Option<String>,
    output_format: Option<String>,
}

fn merge_categories(cli: &[String], cfg: Option<&[String]>, toggles: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    fn push(out: &mut Vec<String>, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    for name in cfg.unwrap_or_default() {
        push(&mut out, name);
    }
    for name in cli {
        push(&mut out, name);
    }
    // With no category list at all, the panels are exactly the ones being
    // toggled.
    if out.is_empty() {
        for name in toggles {
            push(&mut out, name);
        }
    }
    out
}

fn build_session_config(args: CliArgs, cfg: ConfigFile) -> Result<SessionConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .url
        .or(cfg.base_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "server base URL is required (--url or config base_url)".to_string())?;
    if reqwest::Url::parse(&base_url).is_err() {
        return Err(format!("invalid base URL: {base_url}"));
    }

    let toggles: Vec<String> = args
        .toggle
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let categories = merge_categories(&args.categories, cfg.categories.as_deref(), &toggles);

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    let proxy = args
        .proxy
        .or(cfg.proxy)
        .filter(|p| !p.trim().is_empty());
    let follow_redirects = args.follow_redirects || cfg.follow_redirects.unwrap_or(false);

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = args.output_format.or(cfg.output_format);

    Ok(SessionConfig {
        base_url,
        categories,
        toggles,
        quit: args.quit,
        find: args.find,
        timeout,
        proxy,
        follow_redirects,
        no_color,
        output,
        output_format,
    })
}

async fn run_async(session: SessionConfig) -> Result<(), String> {
    if session.no_color {
        colored::control::set_override(false);
    }
    print_banner(session.no_color);

    format_kv_line("Target", &session.base_url);
    format_kv_line(
        "Shelf",
        &if session.categories.is_empty() {
            "no categories registered".to_string()
        } else {
            session.categories.join(", ")
        },
    );
    format_kv_line(
        "HTTP",
        &format!(
            "timeout={}s redirects={} proxy={}",
            session.timeout,
            format_bool(session.follow_redirects),
            if session.proxy.is_some() { "on" } else { "off" }
        ),
    );
    format_kv_line(
        "Actions",
        &format!(
            "toggles={} quit={} find={}",
            if session.toggles.is_empty() {
                "none".to_string()
            } else {
                session.toggles.join(",")
            },
            format_bool(session.quit),
            session.find.as_deref().unwrap_or("none"),
        ),
    );
    println!();

    let client_options = ClientOptions {
        timeout_seconds: session.timeout,
        proxy: session.proxy.clone(),
        follow_redirects: session.follow_redirects,
    };
    let client = HomeClient::new(&session.base_url, &client_options).map_err(|e| e.to_string())?;

    let controller = PageController::new(client, RowFilter::new());
    controller.init(&session.categories).await;

    let now = Instant::now();
    let mut failures = 0usize;

    if !session.toggles.is_empty() {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template(":: {spinner} {msg}")
                .map_err(|e| format!("failed to build spinner style: {e}"))?,
        );
        pb.set_message(format!("{} panel request(s) in flight", session.toggles.len()));

        let mut in_flight = FuturesUnordered::new();
        for name in session.toggles.iter().cloned() {
            let controller = controller.clone();
            in_flight.push(async move {
                let outcome = controller.toggle(&name).await;
                (name, outcome)
            });
        }

        let mut lines: Vec<String> = Vec::new();
        while let Some((name, outcome)) = in_flight.next().await {
            match outcome {
                Ok(ToggleOutcome::Loaded { rows }) => {
                    lines.push(format!(
                        "{} {} ({} rows)",
                        "loaded".green().bold(),
                        name.bold(),
                        rows
                    ));
                }
                Ok(ToggleOutcome::Unloaded) => {
                    lines.push(format!("{} {}", "unloaded".yellow().bold(), name.bold()));
                }
                Ok(ToggleOutcome::InFlight) => {
                    lines.push(format!(
                        "{} {} (request already in flight)",
                        "ignored".blue().bold(),
                        name.bold()
                    ));
                }
                Err(e) => {
                    failures += 1;
                    lines.push(format!("{} {}: {}", "failed".red().bold(), name.bold(), e));
                }
            }
        }
        pb.finish_and_clear();
        for line in lines {
            println!("{line}");
        }
        println!();
    }

    let panels = controller.panels().await;
    for panel in panels.iter() {
        println!(
            ":: [{}] {} ({} rows)",
            panel.state.as_str(),
            panel.name,
            panel.rows.len()
        );
    }

    if let Some(query) = session.find.as_deref() {
        let hits: Vec<String> = controller
            .with_search(|filter| {
                filter
                    .filter(query)
                    .into_iter()
                    .map(|row| row.text())
                    .collect()
            })
            .await;
        println!();
        format_kv_line("Find", &format!("'{}' matched {} row(s)", query, hits.len()));
        for hit in hits {
            println!("  {hit}");
        }
    }

    if let Some(outfile_path) = session.output.as_ref() {
        let format = session
            .output_format
            .as_deref()
            .and_then(output::OutputFormat::parse)
            .or_else(|| output::infer_format_from_path(outfile_path))
            .unwrap_or(output::OutputFormat::Text);
        let records = output::build_records(&panels);
        let rendered = match format {
            output::OutputFormat::Text => output::render_text(&records),
            output::OutputFormat::Json => output::render_json(&records),
        };
        tokio::fs::write(outfile_path, rendered)
            .await
            .map_err(|e| format!("failed to write output file '{outfile_path}': {e}"))?;
    }

    if session.quit {
        match controller.quit().await {
            Ok(body) => {
                println!();
                format_kv_line(
                    "Quit",
                    &format!(
                        "page root replaced ({} bytes), shutdown action fired",
                        body.len()
                    ),
                );
            }
            Err(e) => {
                failures += 1;
                println!();
                println!("{} {}", "failed".red().bold(), e);
            }
        }
    }

    let elapsed_time = now.elapsed();
    println!();
    println!(
        ":: Completed :: session took {}ms ::",
        elapsed_time.as_millis()
    );

    if failures > 0 {
        return Err(format!("{failures} action(s) failed"));
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                let mut cmd = CliArgs::command();
                let _ = cmd.print_help();
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            config::load_config(&path, false)?
        }
        None => match config::default_config_path() {
            Some(path) => {
                let _ = config::ensure_default_config_file(&path);
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let session = build_session_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(session))?;
    Ok(())
}
