//! Watch mode for automatic rebuilds on file changes
//!
//! Provides file system watching with debouncing for the `taskconf build --watch` command.
//! Every rebuild runs the full pipeline with a fresh module resolver, so
//! edited modules are always read again.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::build::{BuildContext, BuildPipeline, BuildResult};
use crate::config::schema::WatchConfig;

/// Error during watch mode
#[derive(Debug)]
pub enum WatchError {
    /// Failed to initialize file watcher
    WatcherInit(notify::Error),
    /// Failed to add watch path
    WatchPath(notify::Error),
    /// Channel receive error
    ChannelError(String),
    /// Context directory not found
    ContextNotFound(PathBuf),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::WatcherInit(e) => write!(f, "Failed to initialize file watcher: {}", e),
            WatchError::WatchPath(e) => write!(f, "Failed to watch path: {}", e),
            WatchError::ChannelError(msg) => write!(f, "Watch channel error: {}", msg),
            WatchError::ContextNotFound(path) => {
                write!(f, "Context directory not found: {}", path.display())
            }
        }
    }
}

impl std::error::Error for WatchError {}

/// Tracks failing patterns across build iterations for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Asset names whose pattern failed in the previous build
    failing: HashSet<String>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update tracker with new build result, returns the patterns that recovered
    pub fn update(&mut self, result: &BuildResult) -> Vec<String> {
        let current: HashSet<String> =
            result.failures().into_iter().map(|t| t.target_id.clone()).collect();

        let mut fixed: Vec<String> = self.failing.difference(&current).cloned().collect();
        fixed.sort();

        self.failing = current;
        fixed
    }

    /// Forget everything, e.g. after a build that did not run at all
    pub fn clear(&mut self) {
        self.failing.clear();
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.failing.is_empty()
    }

    /// Get the number of failing patterns
    pub fn error_count(&self) -> usize {
        self.failing.len()
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory to watch
    pub context_dir: PathBuf,
    /// Output directory, changes below it are ignored
    pub out_dir: PathBuf,
    /// Watch configuration (debounce, clear screen)
    pub config: WatchConfig,
}

impl WatchOptions {
    /// Watch options for a build context.
    pub fn from_context(ctx: &BuildContext) -> Self {
        Self {
            context_dir: ctx.context_dir(),
            out_dir: ctx.out_dir(),
            config: ctx.config().watch.clone(),
        }
    }
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Watch for file changes and rebuild automatically.
///
/// Runs an initial build, then blocks rebuilding after each debounced batch
/// of changes until interrupted (Ctrl+C). Build failures are reported and
/// watching continues.
pub fn watch_and_rebuild(pipeline: &BuildPipeline) -> Result<(), WatchError> {
    let options = WatchOptions::from_context(pipeline.context());

    if !options.context_dir.exists() {
        return Err(WatchError::ContextNotFound(options.context_dir.clone()));
    }

    // Create channel for debounced events
    let (tx, rx) = channel();

    let debounce_duration = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    debouncer
        .watcher()
        .watch(&options.context_dir, RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    let mut error_tracker = ErrorTracker::new();

    // Initial build
    if options.config.clear_screen {
        clear_screen();
    }
    rebuild(pipeline, &mut error_tracker);
    println!("[{}] Watching {} for changes...", timestamp(), options.context_dir.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<&Path> = events
                    .iter()
                    .filter(|e| {
                        matches!(e.kind, DebouncedEventKind::Any)
                            && is_relevant_change(&e.path, &options.out_dir)
                    })
                    .map(|e| e.path.as_path())
                    .collect();

                if changed.is_empty() {
                    continue;
                }

                for path in &changed {
                    let shown = path.strip_prefix(&options.context_dir).unwrap_or(path);
                    println!("[{}] Changed: {}", timestamp(), shown.display());
                }

                if options.config.clear_screen {
                    clear_screen();
                }

                rebuild(pipeline, &mut error_tracker);
                println!(
                    "[{}] Watching {} for changes...",
                    timestamp(),
                    options.context_dir.display()
                );
            }
            Ok(Err(error)) => {
                // Watch error (non-fatal) - log but continue watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::ChannelError(e.to_string()));
            }
        }
    }
}

/// Run one build and report it.
fn rebuild(pipeline: &BuildPipeline, error_tracker: &mut ErrorTracker) {
    println!("[{}] Building...", timestamp());
    match pipeline.build() {
        Ok(result) => {
            let fixed = error_tracker.update(&result);
            print_build_result(&result, &fixed);
        }
        Err(e) => {
            error_tracker.clear();
            eprintln!("[{}] Error: {}", timestamp(), e);
        }
    }
}

/// Changes below the output directory never trigger a rebuild
fn is_relevant_change(path: &Path, out_dir: &Path) -> bool {
    !path.starts_with(out_dir)
}

/// Print build result to console with recovered pattern notifications
fn print_build_result(result: &BuildResult, fixed: &[String]) {
    for target in fixed {
        println!("[{}] Fixed: {}", timestamp(), target);
    }

    if result.is_success() {
        println!(
            "[{}] Build complete ({}) - Written: {} | Skipped: {}",
            timestamp(),
            format_duration(result.total_duration),
            result.written.len(),
            result.skipped_count()
        );
    } else {
        let error_count = result.failed_count();
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            format_duration(result.total_duration),
            error_count,
            if error_count == 1 { "" } else { "s" }
        );

        for target in result.failures() {
            eprintln!("[{}] Error in {}: {}", timestamp(), target.target_id, target.status);
        }
        if result.emit_suppressed {
            eprintln!("[{}] Output left unchanged", timestamp());
        }
    }

    for warning in result.all_warnings() {
        eprintln!("[{}] Warning: {}", timestamp(), warning);
    }
}
