//! Dry-run narration on a virtual clock.
//!
//! Drives a [`NarrationController`] backed by a [`RecordingSynthesizer`]
//! the way a host would: each utterance "speaks" for its estimated reading
//! time, the ticker fires at the configured interval and end events are
//! reported back. Nothing is played; the report shows the schedule.

use crate::config::NarrationConfig;
use crate::error::NarrationResult;
use crate::narration::{NarrationController, NarrationSnapshot};
use crate::post::Post;
use crate::tts::{RecordingSynthesizer, SynthesisEvent, UtteranceId};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One chunk handed to the synthesizer during a dry run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedUtterance {
    pub chunk_index: usize,
    pub started_at_ms: u64,
    pub spoken_for_ms: u64,
    pub percent_at_start: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub utterances: Vec<SimulatedUtterance>,
    pub total_ms: u64,
    pub snapshot: NarrationSnapshot,
}

struct Speaking {
    id: UtteranceId,
    index: usize,
    ends_at: Instant,
}

/// Narrate `post` start to finish against a recording synthesizer.
pub fn dry_run(post: &Post, config: NarrationConfig) -> NarrationResult<SimulationReport> {
    let estimator = config.estimator();
    let tick = config.tick_interval().max(Duration::from_millis(1));
    let mut controller = NarrationController::new(RecordingSynthesizer::new(), config);
    controller.load_post(post);

    let start = Instant::now();
    let mut now = start;
    controller.play(now)?;

    // Generous ceiling so a stuck schedule cannot spin forever.
    let limit = Duration::from_secs(controller.progress().estimated_duration_secs * 2 + 10);
    let mut utterances: Vec<SimulatedUtterance> = Vec::new();
    let mut speaking: Option<Speaking> = None;

    while controller.wants_ticks() {
        if now.duration_since(start) > limit {
            warn!(limit_secs = limit.as_secs(), "Dry run exceeded its time limit");
            break;
        }

        let current = controller.in_flight();
        if current.is_some() && current != speaking.as_ref().map(|s| s.id) {
            if let Some(utterance) = controller.synthesizer().last_spoken().cloned() {
                let spoken_for = estimator.speaking_time(&utterance.text, utterance.rate);
                controller.on_synthesis_event(utterance.id, SynthesisEvent::Started, now)?;
                debug!(
                    chunk_idx = utterance.chunk_index,
                    spoken_for_ms = spoken_for.as_millis() as u64,
                    "Dry run utterance started"
                );
                utterances.push(SimulatedUtterance {
                    chunk_index: utterance.chunk_index,
                    started_at_ms: now.duration_since(start).as_millis() as u64,
                    spoken_for_ms: spoken_for.as_millis() as u64,
                    percent_at_start: controller.progress().percent,
                    text: utterance.text,
                });
                speaking = Some(Speaking {
                    id: utterance.id,
                    index: utterance.chunk_index,
                    ends_at: now + spoken_for,
                });
            }
        }

        if let Some(active) = speaking.as_ref().filter(|active| now >= active.ends_at) {
            let (id, index) = (active.id, active.index);
            speaking = None;
            debug!(chunk_idx = index, "Dry run utterance ended");
            controller.on_synthesis_event(id, SynthesisEvent::Ended, now)?;
            continue;
        }

        now += tick;
        controller.tick(now)?;
    }

    let total_ms = now.duration_since(start).as_millis() as u64;
    let snapshot = controller.snapshot();
    info!(
        utterances = utterances.len(),
        total_ms,
        status = snapshot.status.label(),
        "Dry run complete"
    );
    Ok(SimulationReport {
        utterances,
        total_ms,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NarrationError;
    use crate::narration::NarrationStatus;

    fn long_post() -> Post {
        let paragraph = "The narrator reads every sentence in order. ".repeat(12);
        Post::new("A long read", Some("With an excerpt"), format!("<p>{paragraph}</p>"))
    }

    #[test]
    fn dry_run_speaks_every_chunk_once_in_order() {
        let post = long_post();
        let report = dry_run(&post, NarrationConfig::default()).expect("dry run");

        let indices: Vec<usize> = report.utterances.iter().map(|u| u.chunk_index).collect();
        let expected: Vec<usize> = (0..report.snapshot.chunk_count).collect();
        assert_eq!(indices, expected);
        assert_eq!(report.snapshot.status, NarrationStatus::Finished);
        assert_eq!(report.snapshot.progress.percent, 100.0);
    }

    #[test]
    fn utterances_start_after_previous_plus_gap() {
        let post = long_post();
        let report = dry_run(&post, NarrationConfig::default()).expect("dry run");
        for pair in report.utterances.windows(2) {
            assert!(pair[1].started_at_ms >= pair[0].started_at_ms + pair[0].spoken_for_ms + 100);
            assert!(pair[1].percent_at_start >= pair[0].percent_at_start);
        }
    }

    #[test]
    fn faster_speed_shortens_the_run() {
        let post = long_post();
        let normal = dry_run(&post, NarrationConfig::default()).expect("normal");
        let fast = dry_run(
            &post,
            NarrationConfig {
                speed: 2.0,
                ..NarrationConfig::default()
            },
        )
        .expect("fast");
        assert!(fast.total_ms < normal.total_ms);
        assert_eq!(fast.snapshot.speed, 2.0);
    }

    #[test]
    fn empty_post_fails() {
        let post = Post::new("", None, "<style>p{}</style>");
        assert_eq!(
            dry_run(&post, NarrationConfig::default()),
            Err(NarrationError::EmptyContent)
        );
    }
}
