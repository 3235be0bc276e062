//! Live progress lines on stdout.

use std::io::Write;
use std::time::Duration;

use ranker_core::{error_preview, Candidate, CanonicalResult};
use ranker_runtime::{CandidateProgress, ProgressObserver};

/// Characters of an error shown on a progress line.
const PROGRESS_ERROR_CHARS: usize = 50;

/// Prints `[i/N] Processing: name... ✓ (1.2s)` per candidate.
///
/// When candidates run one at a time the prefix is printed as soon as a
/// candidate starts; with concurrency the whole line is printed at the end
/// so lines from different candidates never interleave.
pub struct ConsoleProgress {
    inline: bool,
}

impl ConsoleProgress {
    pub fn new(concurrency: usize) -> Self {
        Self {
            inline: concurrency <= 1,
        }
    }
}

fn prefix(index: usize, total: usize, candidate: &Candidate) -> String {
    format!("[{}/{}] Processing: {}... ", index, total, candidate.display_name())
}

/// Outcome part of a progress line.
pub fn outcome(result: &CanonicalResult, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    match result.failure_message() {
        None => format!("✓ ({:.1}s)", secs),
        Some(message) => format!(
            "✗ ({:.1}s) - Error: {}",
            secs,
            error_preview(message, PROGRESS_ERROR_CHARS)
        ),
    }
}

impl ProgressObserver for ConsoleProgress {
    fn candidate_started(&self, index: usize, total: usize, candidate: &Candidate) {
        if self.inline {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{}", prefix(index, total, candidate));
            let _ = stdout.flush();
        }
    }

    fn candidate_finished(&self, progress: &CandidateProgress<'_>) {
        let outcome = outcome(progress.result, progress.elapsed);
        if self.inline {
            println!("{}", outcome);
        } else {
            println!(
                "{}{}",
                prefix(progress.index, progress.total, progress.candidate),
                outcome
            );
        }
    }
}
