use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use updraft_core::{ChangeLog, UpdateStatusListener, VersionEntry};

/// Listener that renders update progress on the terminal and stores the
/// check result for the main flow to pick up.
pub struct ConsoleListener {
    changelog: Mutex<Option<ChangeLog>>,
    failed: AtomicBool,
}

impl Default for ConsoleListener {
    fn default() -> Self {
        Self {
            changelog: Mutex::new(None),
            failed: AtomicBool::new(false),
        }
    }
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changelog delivered by the last check, if any.
    pub fn take_changelog(&self) -> Option<ChangeLog> {
        self.changelog
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

impl UpdateStatusListener for ConsoleListener {
    fn on_update_available(&self, changelog: ChangeLog) {
        *self
            .changelog
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(changelog);
    }

    fn on_update_download_progress(&self, percent: f32) {
        print!("\rDownloading the update... {percent:5.1}%");
        let _ = io::stdout().flush();
    }

    fn on_update_download_finished(&self) {
        println!();
        println!("Download finished.");
    }

    fn on_update_error(&self, message: String) {
        println!();
        eprintln!("Update error: {message}");
        self.failed.store(true, Ordering::Release);
    }
}

pub fn render_changelog(changelog: &ChangeLog) {
    println!("An update is available:");
    println!();
    for entry in changelog {
        println!("{}", entry_header(entry));
        println!("{}", annotate_changes(entry));
        println!();
    }
}

fn entry_header(entry: &VersionEntry) -> String {
    let mut header = entry.version.clone();
    if entry.is_prerelease {
        header.push_str(" [pre-release]");
    }
    if !entry.date.is_empty() {
        header.push_str(&format!(" ({})", entry.date));
    }
    header
}

fn annotate_changes(entry: &VersionEntry) -> &str {
    if entry.changes.is_empty() {
        "This release doesn't provide a description."
    } else {
        &entry.changes
    }
}

/// Ask on the terminal whether the given version should be installed.
pub fn confirm_install(version: &str) -> io::Result<bool> {
    print!("Install version {version}? [y/N] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes"))
}
