//! Console front-end for the updraft self-update client.
//!
//! Checks a repository's releases for a version newer than the one given,
//! prints the changelog, and on confirmation downloads and launches the
//! platform installer. When a release ships no installer artifact for this
//! platform, the release page is opened in the browser instead.

mod console;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use log::debug;

use updraft_core::{AutoUpdater, UpdaterConfig};
use updraft_platform::update_file_extension;

use crate::console::ConsoleListener;

const API_BASE_ENV: &str = "UPDRAFT_API_BASE";

struct CliArgs {
    repo: String,
    current_version: String,
    product_name: String,
    check_only: bool,
    assume_yes: bool,
    quiet: bool,
    debug: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut product_name = None;
    let mut check_only = false;
    let mut assume_yes = false;
    let mut quiet = false;
    let mut debug = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--product" => {
                product_name = Some(
                    args.next()
                        .ok_or_else(|| "--product requires a value".to_string())?,
                );
            }
            "--check-only" => check_only = true,
            "--yes" | "-y" => assume_yes = true,
            "--quiet" | "-q" => quiet = true,
            "--debug" => debug = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let repo = positional
        .next()
        .ok_or_else(|| "missing repository (owner/name)".to_string())?;
    let current_version = positional
        .next()
        .ok_or_else(|| "missing current version".to_string())?;
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument: {extra}"));
    }

    let product_name = product_name.unwrap_or_else(|| {
        repo.rsplit('/')
            .next()
            .unwrap_or(repo.as_str())
            .to_string()
    });

    Ok(CliArgs {
        repo,
        current_version,
        product_name,
        check_only,
        assume_yes,
        quiet,
        debug,
    })
}

fn print_usage() {
    eprintln!("usage: updraft <owner/repo> <current-version> [options]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --product <name>  staging file / user agent name (default: repo name)");
    eprintln!("  --check-only      print the changelog and exit");
    eprintln!("  --yes, -y         install without asking");
    eprintln!("  --quiet, -q       no output when already up to date");
    eprintln!("  --debug           verbose logging");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("updraft: {message}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    logging::init(args.debug);

    let mut config = UpdaterConfig::new(args.repo, args.current_version, args.product_name);
    if let Ok(base) = std::env::var(API_BASE_ENV) {
        let trimmed = base.trim();
        if !trimmed.is_empty() {
            debug!("Using API base override from {API_BASE_ENV}: {trimmed}");
            config.api_base = trimmed.to_string();
        }
    }

    let updater = match AutoUpdater::new(config) {
        Ok(updater) => updater,
        Err(error) => {
            eprintln!("updraft: {error}");
            return ExitCode::FAILURE;
        }
    };

    let listener = Arc::new(ConsoleListener::new());
    updater.set_listener(listener.clone());

    if let Err(error) = updater.check_for_updates().await {
        eprintln!("updraft: {error}");
        return ExitCode::FAILURE;
    }
    if listener.failed() {
        return ExitCode::FAILURE;
    }

    let Some(changelog) = listener.take_changelog() else {
        return ExitCode::FAILURE;
    };

    if changelog.is_empty() {
        if !args.quiet {
            println!("You already have the latest version.");
        }
        return ExitCode::SUCCESS;
    }

    console::render_changelog(&changelog);
    if args.check_only {
        return ExitCode::SUCCESS;
    }

    let newest = &changelog[0];
    let update_url = newest.update_url.clone();

    if !update_url.ends_with(update_file_extension()) {
        // The release ships no installer for this platform; point the user
        // at a manual download instead.
        println!("Opening the release page for a manual download: {update_url}");
        return match open::that(&update_url) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("updraft: failed to open {update_url}: {error}");
                ExitCode::FAILURE
            }
        };
    }

    if !args.assume_yes {
        match console::confirm_install(&newest.version) {
            Ok(true) => {}
            Ok(false) => return ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("updraft: failed to read the confirmation: {error}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(error) = updater.download_and_install(&update_url).await {
        eprintln!("updraft: {error}");
        return ExitCode::FAILURE;
    }

    if listener.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
