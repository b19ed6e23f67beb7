//! Progress reporting and display.
//!
//! Trait-based so the pipeline stays decoupled from display concerns: a
//! fancy reporter for interactive terminals, a plain one for logs, and a
//! null one for tests.

use std::sync::{Arc, Mutex};

/// Phase of the overall batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPhase {
    LoadingDocuments,
    Normalizing,
    DerivingSchema,
    CreatingLayer,
    Uploading,
    Completed,
    Failed(String),
}

impl BatchPhase {
    fn message(&self) -> String {
        match self {
            Self::LoadingDocuments => "Loading cached documents...".into(),
            Self::Normalizing => "Normalizing reach records...".into(),
            Self::DerivingSchema => "Deriving layer schema...".into(),
            Self::CreatingLayer => "Registering layer definition...".into(),
            Self::Uploading => "Uploading feature batches...".into(),
            Self::Completed => "Completed".into(),
            Self::Failed(error) => format!("Failed: {error}"),
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn set_phase(&self, phase: BatchPhase);

    /// Register the number of documents about to be processed.
    fn register_documents(&self, total: usize);

    /// Record one document as normalized.
    fn document_done(&self, name: &str);

    /// Record one document as skipped, with the reason.
    fn document_skipped(&self, name: &str, reason: &str);

    /// Update upload progress in batches and cumulative features.
    fn set_upload_progress(&self, batches_done: usize, batches_total: usize, features: usize);

    /// Finish and clean up the display.
    fn finish(&self);
}

/// No-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_phase(&self, _phase: BatchPhase) {}
    fn register_documents(&self, _total: usize) {}
    fn document_done(&self, _name: &str) {}
    fn document_skipped(&self, _name: &str, _reason: &str) {}
    fn set_upload_progress(&self, _batches_done: usize, _batches_total: usize, _features: usize) {}
    fn finish(&self) {}
}

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    normalized: usize,
    skipped: usize,
    batches: usize,
    features: usize,
}

impl Counts {
    fn summarize(&self) {
        eprintln!();
        eprintln!("Summary");
        eprintln!("  documents:  {} total", self.total);
        eprintln!("  normalized: {}", self.normalized);
        if self.skipped > 0 {
            eprintln!("  skipped:    {}", self.skipped);
        }
        if self.batches > 0 {
            eprintln!(
                "  uploaded:   {} features in {} batches",
                self.features, self.batches
            );
        }
    }
}

/// Plain reporter that prints to stderr (for non-TTY runs).
pub struct PlainReporter {
    counts: Mutex<Counts>,
}

impl PlainReporter {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(Counts::default()),
        }
    }
}

impl Default for PlainReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for PlainReporter {
    fn set_phase(&self, phase: BatchPhase) {
        eprintln!("{}", phase.message());
    }

    fn register_documents(&self, total: usize) {
        self.counts.lock().unwrap().total = total;
        eprintln!("  found {total} documents");
    }

    fn document_done(&self, _name: &str) {
        self.counts.lock().unwrap().normalized += 1;
    }

    fn document_skipped(&self, name: &str, reason: &str) {
        self.counts.lock().unwrap().skipped += 1;
        eprintln!("  skipped {name}: {reason}");
    }

    fn set_upload_progress(&self, batches_done: usize, batches_total: usize, features: usize) {
        let mut counts = self.counts.lock().unwrap();
        counts.batches = batches_done;
        counts.features = features;
        if batches_done == batches_total {
            eprintln!("  uploaded {features} features in {batches_done} batches");
        }
    }

    fn finish(&self) {
        self.counts.lock().unwrap().summarize();
    }
}

/// Interactive reporter with a phase spinner and a document bar (for TTY).
pub struct TermReporter {
    multi: indicatif::MultiProgress,
    phase: indicatif::ProgressBar,
    documents: Mutex<Option<indicatif::ProgressBar>>,
    counts: Mutex<Counts>,
}

impl TermReporter {
    pub fn new() -> Self {
        let multi = indicatif::MultiProgress::new();
        let phase = multi.add(indicatif::ProgressBar::new_spinner());
        phase.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        phase.enable_steady_tick(std::time::Duration::from_millis(100));
        Self {
            multi,
            phase,
            documents: Mutex::new(None),
            counts: Mutex::new(Counts::default()),
        }
    }
}

impl Default for TermReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TermReporter {
    fn set_phase(&self, phase: BatchPhase) {
        let message = phase.message();
        if matches!(phase, BatchPhase::Completed | BatchPhase::Failed(_)) {
            self.phase.finish_with_message(message);
        } else {
            self.phase.set_message(message);
        }
    }

    fn register_documents(&self, total: usize) {
        self.counts.lock().unwrap().total = total;
        let bar = self.multi.add(indicatif::ProgressBar::new(total as u64));
        bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("  {bar:40.cyan/blue} {pos}/{len} documents")
                .unwrap(),
        );
        *self.documents.lock().unwrap() = Some(bar);
    }

    fn document_done(&self, _name: &str) {
        self.counts.lock().unwrap().normalized += 1;
        if let Some(bar) = self.documents.lock().unwrap().as_ref() {
            bar.inc(1);
        }
    }

    fn document_skipped(&self, name: &str, reason: &str) {
        self.counts.lock().unwrap().skipped += 1;
        self.multi.println(format!("skipped {name}: {reason}")).ok();
        if let Some(bar) = self.documents.lock().unwrap().as_ref() {
            bar.inc(1);
        }
    }

    fn set_upload_progress(&self, batches_done: usize, batches_total: usize, features: usize) {
        let mut counts = self.counts.lock().unwrap();
        counts.batches = batches_done;
        counts.features = features;
        self.phase.set_message(format!(
            "Uploading feature batches... ({batches_done}/{batches_total})"
        ));
    }

    fn finish(&self) {
        if let Some(bar) = self.documents.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        self.phase.finish_and_clear();
        self.counts.lock().unwrap().summarize();
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(TermReporter::new())
    } else {
        Arc::new(PlainReporter::new())
    }
}
