//! Concurrent batched frame analysis.
//!
//! Frames are grouped into fixed-size batches, every batch is dispatched at
//! once through the gateway's parallel lane, and the settled batches are
//! reassembled by frame index. A batch that fails or is declined yields
//! explicitly marked placeholder records; analysis never aborts on one batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;
use tracing::{debug, info, warn};
use vlens_gateway::{
    InferenceGateway, InferenceOutcome, InferenceRequest, Lane, Payload, RefusalScope,
};
use vlens_models::{Frame, FrameAnalysisRecord, JobId, Phase};

use crate::metrics;
use crate::progress::ProgressTracker;
use crate::prompts::frame_batch_prompt;
use crate::response_parser::parse_frame_batch;

static CONTEXT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t\-*•]*\**[ \t]*context[ \t]*\**[ \t]*:[ \t]*\**[ \t]*(.+)$").unwrap()
});

/// Characters of a whole batch reply inspected for a refusal. Kept below the
/// length of one frame block so a refusal inside a later block is left to
/// per-frame detection.
const BATCH_REFUSAL_WINDOW: usize = 48;

/// Characters of one frame's block inspected for a refusal.
const FRAME_REFUSAL_WINDOW: usize = 120;

/// Output tokens budgeted per frame in a batch.
const TOKENS_PER_FRAME: u32 = 600;

const MAX_MEANING_CHARS: usize = 200;

/// Progress percentage after `done` of `total` batches have settled.
///
/// Frame analysis spans 10-70% of the job.
pub fn frame_phase_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 70;
    }
    let fraction = done.min(total) as f64 / total as f64;
    10 + (fraction * 60.0).round() as u8
}

/// How one batch settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOutcome {
    Analyzed,
    Declined,
    Failed,
    Unparseable,
}

impl BatchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Analyzed => "analyzed",
            BatchOutcome::Declined => "declined",
            BatchOutcome::Failed => "failed",
            BatchOutcome::Unparseable => "unparseable",
        }
    }
}

/// Analyzes frames in concurrent batches.
#[derive(Debug, Clone)]
pub struct FrameBatchAnalyzer {
    gateway: InferenceGateway,
    batch_size: usize,
}

impl FrameBatchAnalyzer {
    pub fn new(gateway: InferenceGateway, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Produce exactly one record per frame, sorted by frame index.
    ///
    /// Progress for `job_id` is updated as each batch settles, in whatever
    /// order the batches finish.
    pub async fn analyze(
        &self,
        job_id: &JobId,
        frames: &[Frame],
        progress: &ProgressTracker,
    ) -> Vec<FrameAnalysisRecord> {
        let batches: Vec<&[Frame]> = frames.chunks(self.batch_size).collect();
        let total = batches.len();
        let settled = AtomicUsize::new(0);

        info!(
            job_id = %job_id,
            frames = frames.len(),
            batches = total,
            batch_size = self.batch_size,
            "Dispatching frame batches"
        );

        let tasks = batches.iter().enumerate().map(|(batch_no, batch)| {
            let settled = &settled;
            async move {
                let (outcome, records) = self.analyze_batch(job_id, batch_no, batch).await;
                remove_frame_files(batch).await;

                let done = settled.fetch_add(1, Ordering::SeqCst) + 1;
                metrics::record_batch(outcome.as_str());
                progress.update(
                    job_id,
                    Phase::FrameAnalysis,
                    frame_phase_percent(done, total),
                    format!("Analyzed {done}/{total} frame batches"),
                    Some(serde_json::json!({
                        "batches_done": done,
                        "batches_total": total,
                        "last_batch": batch_no,
                        "last_outcome": outcome.as_str(),
                    })),
                );
                records
            }
        });

        let mut records: Vec<FrameAnalysisRecord> = join_all(tasks).await.into_iter().flatten().collect();
        records.sort_by_key(|r| r.frame_index);

        for record in &records {
            metrics::record_frame_record(record.status.as_str());
        }
        records
    }

    async fn analyze_batch(
        &self,
        job_id: &JobId,
        batch_no: usize,
        frames: &[Frame],
    ) -> (BatchOutcome, Vec<FrameAnalysisRecord>) {
        let mut request = InferenceRequest::new(format!("frame_batch_{batch_no}"))
            .with_text(frame_batch_prompt(frames))
            .with_lane(Lane::Parallel)
            .with_refusal_scope(RefusalScope::Preamble(BATCH_REFUSAL_WINDOW))
            .with_max_output_tokens(TOKENS_PER_FRAME * frames.len() as u32);

        for frame in frames {
            match tokio::fs::read(&frame.path).await {
                Ok(bytes) => request = request.with_part(Payload::jpeg(bytes)),
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        batch = batch_no,
                        frame = frame.index,
                        error = %e,
                        "Failed to read frame image"
                    );
                    let reason = format!("Frame image unreadable: {e}");
                    return (BatchOutcome::Failed, failed_records(frames, &reason));
                }
            }
        }

        let reply = match self.gateway.invoke(request).await {
            Ok(InferenceOutcome::Completed(reply)) => reply,
            Ok(InferenceOutcome::Declined(declined)) => {
                warn!(
                    job_id = %job_id,
                    batch = batch_no,
                    attempts = declined.attempts,
                    reason = %declined.reason,
                    "Frame batch declined"
                );
                let records = frames
                    .iter()
                    .map(|f| FrameAnalysisRecord::declined(f, declined.reason.clone()))
                    .collect();
                return (BatchOutcome::Declined, records);
            }
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    batch = batch_no,
                    attempts = e.attempts(),
                    error = %e,
                    "Frame batch failed"
                );
                let reason = format!("Inference failed: {e}");
                return (BatchOutcome::Failed, failed_records(frames, &reason));
            }
        };

        let parsed = match parse_frame_batch(&reply.text, frames.len()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(job_id = %job_id, batch = batch_no, error = %e, "Frame batch reply unparseable");
                let reason = format!("Unparseable reply: {e}");
                return (BatchOutcome::Unparseable, failed_records(frames, &reason));
            }
        };

        debug!(
            job_id = %job_id,
            batch = batch_no,
            strategy = parsed.strategy.as_str(),
            exact = parsed.exact,
            fillers = parsed.filler_count(),
            attempts = reply.attempts,
            "Parsed frame batch"
        );

        let detector = self.gateway.refusal_detector();
        let records = frames
            .iter()
            .zip(parsed.slots)
            .map(|(frame, slot)| {
                if let Some(phrase) = detector.detect(&slot.text, RefusalScope::Preamble(FRAME_REFUSAL_WINDOW)) {
                    debug!(job_id = %job_id, frame = frame.index, phrase = %phrase, "Frame declined");
                    return FrameAnalysisRecord::declined(frame, slot.text);
                }
                let meaning = contextual_meaning(&slot.text);
                if slot.filler {
                    FrameAnalysisRecord::filler(frame, slot.text, meaning)
                } else {
                    FrameAnalysisRecord::analyzed(frame, slot.text, meaning)
                }
            })
            .collect();

        (BatchOutcome::Analyzed, records)
    }
}

fn failed_records(frames: &[Frame], reason: &str) -> Vec<FrameAnalysisRecord> {
    frames
        .iter()
        .map(|f| FrameAnalysisRecord::failed(f, reason))
        .collect()
}

/// Best-effort removal of a settled batch's images.
async fn remove_frame_files(frames: &[Frame]) {
    for frame in frames {
        if let Err(e) = tokio::fs::remove_file(&frame.path).await {
            debug!(path = %frame.path.display(), error = %e, "Frame file not removed");
        }
    }
}

/// Short meaning of a frame: its CONTEXT line, else its first sentence.
pub fn contextual_meaning(description: &str) -> String {
    if let Some(caps) = CONTEXT_LINE.captures(description) {
        let line = caps[1].trim().trim_matches('*').trim();
        if !line.is_empty() {
            return truncate(line);
        }
    }

    let first = description
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let sentence = match first.find(". ") {
        Some(i) => &first[..=i],
        None => first,
    };
    if sentence.is_empty() {
        "No description available".to_string()
    } else {
        truncate(sentence)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_MEANING_CHARS).collect()
}
