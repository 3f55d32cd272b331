//! Initialization flow for folio
//!
//! Handles first-run setup and answering backend selection.

use crate::config::{Backend, Config};
use crate::extract::pdf::OXIDE_LAYER_VERSION;
use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Result of running the init flow
#[derive(Debug)]
pub enum InitResult {
    /// User completed init with this config
    Configured(Config),
    /// User cancelled the init
    Cancelled,
}

/// Run the interactive init flow on the terminal
pub fn run_init(existing_config: Option<&Config>) -> Result<InitResult> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let result = prompt_config(existing_config, &mut input, &mut output)?;
    if let InitResult::Configured(config) = &result {
        config.save()?;
    }
    Ok(result)
}

/// Ask for the answering settings. Empty answers keep the current value.
fn prompt_config<R: BufRead, W: Write>(
    existing_config: Option<&Config>,
    input: &mut R,
    out: &mut W,
) -> Result<InitResult> {
    let mut config = existing_config.cloned().unwrap_or_default();

    if existing_config.is_some() {
        writeln!(out, "\nCurrent configuration:")?;
        writeln!(out, "  Backend:  {}", config.answering.backend.name())?;
        writeln!(out, "  Endpoint: {}", config.answering.endpoint)?;
        writeln!(out, "  Model:    {}", config.answering.model)?;
        writeln!(out)?;
    }

    config.answering.backend = select_backend(config.answering.backend, input, out)?;

    match config.answering.backend {
        Backend::Endpoint => {
            let endpoint = ask(out, input, "Endpoint URL", &config.answering.endpoint)?;
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                writeln!(out, "Endpoint must be an http(s) URL.")?;
                return Ok(InitResult::Cancelled);
            }
            config.answering.endpoint = endpoint;
        }
        Backend::OpenAi => {
            config.answering.base_url = ask(out, input, "API base URL", &config.answering.base_url)?;
            config.answering.model = ask(out, input, "Model", &config.answering.model)?;
            writeln!(
                out,
                "The API key is read from FOLIO_API_KEY or OPENAI_API_KEY."
            )?;
        }
    }

    Ok(InitResult::Configured(config))
}

/// Select the answering backend interactively
fn select_backend<R: BufRead, W: Write>(
    current: Backend,
    input: &mut R,
    out: &mut W,
) -> Result<Backend> {
    writeln!(out, "Answering backend:")?;

    let backends = Backend::all();
    for (i, backend) in backends.iter().enumerate() {
        let current_marker = if *backend == current { " ← current" } else { "" };
        writeln!(out, "  [{}] {}{}", i + 1, backend.description(), current_marker)?;
    }
    writeln!(out)?;

    let default_idx = backends.iter().position(|b| *b == current).unwrap_or(0);

    let choice = ask(out, input, "Choice", &(default_idx + 1).to_string())?;
    match choice.parse::<usize>() {
        Ok(n) if n >= 1 && n <= backends.len() => Ok(backends[n - 1]),
        _ => {
            writeln!(out, "Invalid selection, using default.")?;
            Ok(backends[default_idx])
        }
    }
}

fn ask<R: BufRead, W: Write>(out: &mut W, input: &mut R, label: &str, default: &str) -> Result<String> {
    write!(out, "{} [{}]: ", label, default)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();

    Ok(if line.is_empty() {
        default.to_string()
    } else {
        line.to_string()
    })
}

/// Display status information
pub fn show_status(config: &Config) {
    println!("folio v{} - Ask questions about your documents\n", env!("CARGO_PKG_VERSION"));

    println!("Config:");
    match Config::path() {
        Ok(path) if path.exists() => println!("  File:     {}", path.display()),
        Ok(path) => println!("  File:     {} (not created yet)", path.display()),
        Err(_) => println!("  File:     unavailable"),
    }
    println!();

    println!("Answering:");
    println!("  Backend:  {}", config.answering.backend.name());
    match config.answering.backend {
        Backend::Endpoint => println!("  Endpoint: {}", config.answering.endpoint),
        Backend::OpenAi => {
            println!("  API:      {}", config.answering.base_url);
            println!("  Model:    {}", config.answering.model);
            println!(
                "  API key:  {}",
                if config.answering.api_key.is_some() { "set" } else { "missing" }
            );
        }
    }
    println!();

    println!("PDF:");
    println!("  Text layer: {}", OXIDE_LAYER_VERSION);
    println!(
        "  Worker pin: {}",
        config.pdf.worker_version.as_deref().unwrap_or(OXIDE_LAYER_VERSION)
    );
    println!();

    println!("Run 'folio --help' for commands.");
}

/// Display first-run welcome message
pub fn show_welcome() {
    println!("folio v{} - Ask questions about your documents\n", env!("CARGO_PKG_VERSION"));
    println!("First run detected. Let's set you up.\n");
}
