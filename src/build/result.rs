//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Asset produced
    Success,
    /// Nothing to write (null export)
    Skipped,
    /// Pattern failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of processing a single pattern.
#[derive(Debug, Clone)]
pub struct TargetResult {
    /// Asset name the pattern targets
    pub target_id: String,
    /// Build status
    pub status: BuildStatus,
    /// Asset names produced
    pub outputs: Vec<PathBuf>,
    /// Processing duration
    pub duration: Duration,
    /// Warning messages (if any)
    pub warnings: Vec<String>,
}

impl TargetResult {
    /// Create a successful result.
    pub fn success(target_id: String, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { target_id, status: BuildStatus::Success, outputs, duration, warnings: vec![] }
    }

    /// Create a skipped result.
    pub fn skipped(target_id: String) -> Self {
        Self {
            target_id,
            status: BuildStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    /// Create a failed result.
    pub fn failed(target_id: String, error: String, duration: Duration) -> Self {
        Self {
            target_id,
            status: BuildStatus::Failed(error),
            outputs: vec![],
            duration,
            warnings: vec![],
        }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each pattern, in processing order
    pub targets: Vec<TargetResult>,
    /// Every asset in the finished compilation (copies included), sorted
    pub assets: Vec<String>,
    /// Files written to the output directory
    pub written: Vec<PathBuf>,
    /// Assets were held back because the compilation had errors
    pub emit_suppressed: bool,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target result.
    pub fn add_result(&mut self, result: TargetResult) {
        self.targets.push(result);
    }

    /// Get the number of successful patterns.
    pub fn success_count(&self) -> usize {
        self.targets.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of skipped patterns.
    pub fn skipped_count(&self) -> usize {
        self.targets.iter().filter(|r| matches!(r.status, BuildStatus::Skipped)).count()
    }

    /// Get the number of failed patterns.
    pub fn failed_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.targets.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Get failed target results.
    pub fn failures(&self) -> Vec<&TargetResult> {
        self.targets.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.targets.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for target in self.failures() {
                lines.push(format!("  - {}: {}", target.target_id, target.status));
            }
            if self.emit_suppressed {
                lines.push("No assets were written".to_string());
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} built, {} skipped ({} total) in {:?}",
                success, skipped, total, self.total_duration
            ));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}): ", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_display() {
        assert_eq!(BuildStatus::Success.to_string(), "success");
        assert_eq!(BuildStatus::Skipped.to_string(), "skipped");
        assert_eq!(BuildStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_build_status_is_success() {
        assert!(BuildStatus::Success.is_success());
        assert!(BuildStatus::Skipped.is_success());
        assert!(!BuildStatus::Failed("error".to_string()).is_success());
    }

    #[test]
    fn test_target_result_failed() {
        let result = TargetResult::failed(
            "lua/task.conf".to_string(),
            "module not found".to_string(),
            Duration::from_millis(5),
        );

        assert!(!result.is_success());
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_build_result_counts() {
        let mut result = BuildResult::new();
        result.add_result(TargetResult::success(
            "a.conf".to_string(),
            vec![PathBuf::from("a.conf")],
            Duration::ZERO,
        ));
        result.add_result(TargetResult::skipped("b.conf".to_string()));
        result.add_result(TargetResult::failed(
            "c.conf".to_string(),
            "error".to_string(),
            Duration::ZERO,
        ));

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.skipped_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.targets[0].outputs, vec![PathBuf::from("a.conf")]);
        assert!(!result.is_success());
    }

    #[test]
    fn test_build_result_summary_success() {
        let mut result = BuildResult::new();
        result.add_result(TargetResult::success(
            "x/task.conf".to_string(),
            vec![],
            Duration::from_millis(10),
        ));
        result.add_result(
            TargetResult::skipped("y/task.conf".to_string())
                .with_warnings(vec!["./y/task.json: export is null".to_string()]),
        );

        result.total_duration = Duration::from_millis(10);

        let summary = result.summary();
        assert!(summary.contains("Build succeeded"));
        assert!(summary.contains("1 built, 1 skipped"));
        assert!(summary.contains("export is null"));
    }

    #[test]
    fn test_build_result_summary_failure() {
        let mut result = BuildResult::new();
        result.add_result(TargetResult::failed(
            "x/task.conf".to_string(),
            "module not found".to_string(),
            Duration::ZERO,
        ));
        result.emit_suppressed = true;

        let summary = result.summary();
        assert!(summary.contains("Build failed"));
        assert!(summary.contains("x/task.conf: failed: module not found"));
        assert!(summary.contains("No assets were written"));
    }
}
