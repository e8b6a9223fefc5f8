use super::{NarrationController, PlaybackState};
use crate::cancellation::CancelReason;
use crate::error::{NarrationError, NarrationResult};
use crate::tts::{SpeechSynthesizer, SynthesisEvent, UtteranceId, is_interruption_reason};
use std::time::Instant;
use tracing::{debug, info};

impl<S: SpeechSynthesizer> NarrationController<S> {
    /// Feed an event reported by the synthesizer for utterance `id`.
    ///
    /// Events for utterances the controller cancelled itself are swallowed,
    /// as are events for utterances it no longer tracks. An interruption the
    /// platform raised on its own pauses playback. A genuine failure moves
    /// the controller to `Error` and is returned.
    pub fn on_synthesis_event(
        &mut self,
        id: UtteranceId,
        event: SynthesisEvent,
        now: Instant,
    ) -> NarrationResult<()> {
        if let Some(reason) = self.cancellations.take(id) {
            debug!(
                request_id = id.0,
                %reason,
                ?event,
                "Swallowing event for intentionally cancelled utterance"
            );
            return Ok(());
        }

        let Some(flight) = self.in_flight.filter(|flight| flight.id == id) else {
            debug!(
                request_id = id.0,
                current = ?self.in_flight.map(|flight| flight.id.0),
                ?event,
                "Ignoring event for stale utterance"
            );
            return Ok(());
        };

        match event {
            SynthesisEvent::Started => {
                if let Some(current) = self.in_flight.as_mut() {
                    current.started = true;
                }
                debug!(request_id = id.0, chunk_idx = flight.chunk_index, "Utterance started");
                Ok(())
            }
            SynthesisEvent::Ended => {
                self.in_flight = None;
                self.on_chunk_ended(flight.chunk_index, now)
            }
            SynthesisEvent::Failed(reason) => {
                self.in_flight = None;
                if is_interruption_reason(&reason) {
                    debug!(
                        request_id = id.0,
                        chunk_idx = flight.chunk_index,
                        started = flight.started,
                        %reason,
                        "Platform interrupted utterance; not an error"
                    );
                    // Nothing is speaking any more; park in Paused so resume
                    // repeats this chunk instead of idling until the clock ends.
                    if self.state.is_playing() {
                        self.pause_with(CancelReason::PlatformInterrupted, now);
                    }
                    return Ok(());
                }
                self.halt(NarrationError::SynthesisError(reason), now)
            }
        }
    }

    /// Periodic clock update while playing. Advances the virtual clock,
    /// finishes narration once the estimated duration is reached and speaks
    /// the next chunk when the inter-chunk gap has elapsed.
    pub fn tick(&mut self, now: Instant) -> NarrationResult<()> {
        if !self.state.is_playing() {
            return Ok(());
        }

        self.sync_progress(now);
        if self.progress.is_complete() {
            info!(
                estimated_secs = self.progress.estimated_duration_secs,
                "Estimated duration reached"
            );
            self.finish(Some(CancelReason::ClockElapsed));
            return Ok(());
        }

        self.service_pending_advance(now)
    }

    fn on_chunk_ended(&mut self, chunk_index: usize, now: Instant) -> NarrationResult<()> {
        if self.state != PlaybackState::Playing {
            debug!(chunk_idx = chunk_index, state = %self.state, "Chunk ended while not playing");
            return Ok(());
        }

        if chunk_index + 1 < self.cursor.len() {
            self.cursor.advance_due = Some(now + self.config.chunk_gap());
            debug!(chunk_idx = chunk_index, "Chunk ended; next chunk scheduled");
            self.service_pending_advance(now)
        } else {
            self.finish(None);
            Ok(())
        }
    }

    fn service_pending_advance(&mut self, now: Instant) -> NarrationResult<()> {
        match self.cursor.advance_due {
            Some(due) if now >= due => {
                self.cursor.advance_due = None;
                self.progress.current_chunk_index =
                    self.cursor.clamp_index(self.progress.current_chunk_index + 1);
                self.speak_current(now)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::NarrationConfig;
    use crate::error::{NarrationError, NarrationResult};
    use crate::narration::{NarrationController, NarrationStatus, PlaybackState, Visibility};
    use crate::post::Post;
    use crate::tts::{
        RecordingSynthesizer, SpeechSynthesizer, SynthesisEvent, Utterance, UtteranceId, Voice,
    };
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Four 148-char sentences, one per chunk. 599 chars estimate to 48s.
    fn four_chunk_post() -> Post {
        let sentence = |tag: char| format!("{} {}", tag, "w".repeat(146));
        let body = format!(
            "<p>{}. {}. {}. {}.</p>",
            sentence('a'),
            sentence('b'),
            sentence('c'),
            sentence('d')
        );
        Post::new("", None, body)
    }

    fn controller_with(post: &Post) -> NarrationController<RecordingSynthesizer> {
        let mut controller =
            NarrationController::new(RecordingSynthesizer::new(), NarrationConfig::default());
        assert!(controller.load_post(post));
        controller
    }

    fn last_id(controller: &NarrationController<RecordingSynthesizer>) -> UtteranceId {
        controller
            .synthesizer()
            .last_spoken()
            .expect("something should have been spoken")
            .id
    }

    #[test]
    fn play_speaks_first_chunk_and_starts_clock() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        assert_eq!(c.chunks().len(), 4);
        let t0 = Instant::now();

        c.play(t0).expect("play");
        assert_eq!(c.state(), &PlaybackState::Playing);
        assert!(c.wants_ticks());
        let spoken = c.synthesizer().last_spoken().expect("spoken");
        assert_eq!(spoken.chunk_index, 0);
        assert_eq!(spoken.rate, 1.0);
        assert_eq!(spoken.voice.as_ref().map(|v| v.name.as_str()), Some("Dry Run"));
        assert_eq!(c.in_flight(), Some(spoken.id));

        c.tick(t0 + Duration::from_secs(6)).expect("tick");
        assert_eq!(c.progress().estimated_duration_secs, 48);
        assert_eq!(c.progress().elapsed_secs, 6.0);
        assert_eq!(c.progress().percent, 12.5);
    }

    #[test]
    fn chunks_chain_after_gap_until_finished() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");

        let mut now = t0;
        for expected_next in 1..4 {
            now += ms(500);
            let id = last_id(&c);
            c.on_synthesis_event(id, SynthesisEvent::Started, now).expect("start");
            c.on_synthesis_event(id, SynthesisEvent::Ended, now).expect("end");
            assert_eq!(c.in_flight(), None);
            assert_eq!(c.synthesizer().spoken.len(), expected_next);

            c.tick(now + ms(50)).expect("tick before gap");
            assert_eq!(c.synthesizer().spoken.len(), expected_next);

            now += ms(100);
            c.tick(now).expect("tick after gap");
            assert_eq!(c.synthesizer().spoken.len(), expected_next + 1);
            assert_eq!(c.progress().current_chunk_index, expected_next);
        }

        let id = last_id(&c);
        c.on_synthesis_event(id, SynthesisEvent::Ended, now).expect("end");
        assert_eq!(c.state(), &PlaybackState::Finished);
        assert_eq!(c.progress().percent, 100.0);
        assert_eq!(c.progress().elapsed_secs, 48.0);
        assert_eq!(c.progress().current_chunk_index, 4);
        assert!(!c.wants_ticks());
    }

    #[test]
    fn pause_then_resume_keeps_chunk_and_swallows_cancel() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.seek(50.0, t0).expect("seek");
        let paused_id = last_id(&c);
        let before = c.progress().current_chunk_index;

        c.pause(t0 + ms(10)).expect("pause");
        assert_eq!(c.state(), &PlaybackState::Paused);
        assert_eq!(c.synthesizer().cancel_count, 2);
        c.on_synthesis_event(paused_id, SynthesisEvent::Failed("interrupted".into()), t0 + ms(11))
            .expect("cancellation is not an error");

        c.resume(t0 + ms(20)).expect("resume");
        assert_eq!(c.state(), &PlaybackState::Playing);
        assert_eq!(c.progress().current_chunk_index, before);
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, before);
    }

    #[test]
    fn immediate_play_pause_resume_stays_on_first_chunk() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let first = last_id(&c);
        c.pause(t0).expect("pause");
        c.resume(t0).expect("resume");
        c.on_synthesis_event(first, SynthesisEvent::Failed("synthesis-failed".into()), t0)
            .expect("event for a paused utterance is swallowed");
        assert_eq!(c.state(), &PlaybackState::Playing);
        assert_eq!(c.progress().current_chunk_index, 0);
    }

    #[test]
    fn paused_time_does_not_count_as_progress() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.pause(t0 + Duration::from_secs(4)).expect("pause");
        c.resume(t0 + Duration::from_secs(30)).expect("resume");
        c.tick(t0 + Duration::from_secs(32)).expect("tick");
        assert_eq!(c.progress().elapsed_secs, 6.0);
    }

    #[test]
    fn seek_maps_percent_to_chunk_and_elapsed() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let first = last_id(&c);

        c.seek(50.0, t0 + ms(200)).expect("seek");
        assert_eq!(c.progress().current_chunk_index, 2);
        assert_eq!(c.progress().elapsed_secs, 24.0);
        assert_eq!(c.progress().percent, 50.0);
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 2);

        c.on_synthesis_event(first, SynthesisEvent::Failed("canceled".into()), t0 + ms(201))
            .expect("seek cancellation swallowed");
        assert_eq!(c.state(), &PlaybackState::Playing);

        c.tick(t0 + ms(1200)).expect("tick");
        assert_eq!(c.progress().elapsed_secs, 25.0);
    }

    #[test]
    fn seek_on_single_chunk_stays_at_zero() {
        let post = Post::new("Just a title", None, "");
        let mut c = controller_with(&post);
        c.seek(50.0, Instant::now()).expect("seek");
        assert_eq!(c.chunks().len(), 1);
        assert_eq!(c.progress().current_chunk_index, 0);
    }

    #[test]
    fn seek_while_paused_only_moves_pointer() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.pause(t0 + ms(100)).expect("pause");
        let spoken_before = c.synthesizer().spoken.len();

        c.seek(75.0, t0 + ms(200)).expect("seek");
        assert_eq!(c.state(), &PlaybackState::Paused);
        assert_eq!(c.progress().current_chunk_index, 3);
        assert_eq!(c.synthesizer().spoken.len(), spoken_before);

        c.resume(t0 + ms(300)).expect("resume");
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 3);
        c.tick(t0 + ms(1300)).expect("tick");
        assert_eq!(c.progress().elapsed_secs, 37.0);
    }

    #[test]
    fn clock_reaching_estimate_finishes_playback() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let in_flight = last_id(&c);

        c.tick(t0 + Duration::from_secs(48)).expect("tick");
        assert_eq!(c.state(), &PlaybackState::Finished);
        assert_eq!(c.progress().percent, 100.0);
        assert_eq!(c.in_flight(), None);

        c.on_synthesis_event(in_flight, SynthesisEvent::Failed("interrupted".into()), t0)
            .expect("swallowed");
        assert_eq!(c.state(), &PlaybackState::Finished);
    }

    #[test]
    fn hidden_page_pauses_without_error() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let id = last_id(&c);

        c.set_visibility(Visibility::Hidden, t0 + ms(300));
        assert_eq!(c.state(), &PlaybackState::Paused);
        assert_eq!(c.in_flight(), None);
        assert_eq!(c.synthesizer().cancel_count, 1);

        c.on_synthesis_event(id, SynthesisEvent::Failed("audio-hardware".into()), t0 + ms(301))
            .expect("cancelled utterance error swallowed");
        assert_eq!(c.state(), &PlaybackState::Paused);

        c.set_visibility(Visibility::Visible, t0 + ms(400));
        assert_eq!(c.state(), &PlaybackState::Paused);
    }

    #[test]
    fn stop_keeps_position_and_play_resumes() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.seek(50.0, t0).expect("seek");
        let id = last_id(&c);

        c.stop(t0 + Duration::from_secs(2));
        assert_eq!(c.state(), &PlaybackState::Idle);
        assert_eq!(c.status(), NarrationStatus::Stopped);
        assert_eq!(c.progress().current_chunk_index, 2);
        assert_eq!(c.progress().elapsed_secs, 26.0);
        assert!(!c.wants_ticks());
        c.on_synthesis_event(id, SynthesisEvent::Ended, t0 + Duration::from_secs(2))
            .expect("swallowed");
        assert_eq!(c.progress().current_chunk_index, 2);

        c.play(t0 + Duration::from_secs(10)).expect("play again");
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 2);
        c.tick(t0 + Duration::from_secs(11)).expect("tick");
        assert_eq!(c.progress().elapsed_secs, 27.0);
    }

    #[test]
    fn speed_change_restarts_current_chunk_at_new_rate() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let first = last_id(&c);
        c.tick(t0 + Duration::from_secs(12)).expect("tick");

        c.set_speed(2.0, t0 + Duration::from_secs(12)).expect("speed");
        let restarted = c.synthesizer().last_spoken().expect("spoken");
        assert_eq!(restarted.chunk_index, 0);
        assert_eq!(restarted.rate, 2.0);
        assert_ne!(restarted.id, first);
        assert_eq!(c.progress().estimated_duration_secs, 24);
        assert_eq!(c.progress().percent, 25.0);

        c.on_synthesis_event(first, SynthesisEvent::Failed("synthesis-failed".into()), t0)
            .expect("speed-change cancellation swallowed");
        assert_eq!(c.state(), &PlaybackState::Playing);
    }

    #[test]
    fn invalid_speed_is_rejected() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        assert_eq!(
            c.set_speed(3.0, Instant::now()),
            Err(NarrationError::InvalidSpeed(3.0))
        );
        assert_eq!(c.speed().value(), 1.0);
    }

    #[test]
    fn genuine_failure_surfaces_and_is_dismissible() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.seek(50.0, t0).expect("seek");
        let id = last_id(&c);

        let err = c
            .on_synthesis_event(id, SynthesisEvent::Failed("network".into()), t0 + ms(10))
            .expect_err("real failure");
        assert_eq!(err, NarrationError::SynthesisError("network".into()));
        assert!(matches!(c.state(), PlaybackState::Error(msg) if msg.contains("network")));
        assert!(!c.wants_ticks());

        c.dismiss_error();
        assert_eq!(c.state(), &PlaybackState::Idle);
        assert_eq!(c.progress().current_chunk_index, 2);

        c.play(t0 + ms(50)).expect("retry");
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 2);
    }

    #[test]
    fn stale_events_are_ignored() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.on_synthesis_event(UtteranceId(999), SynthesisEvent::Ended, t0)
            .expect("ignored");
        assert_eq!(c.progress().current_chunk_index, 0);
        assert!(c.in_flight().is_some());
    }

    #[test]
    fn pause_during_gap_resumes_on_next_chunk() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let id = last_id(&c);
        c.on_synthesis_event(id, SynthesisEvent::Ended, t0 + ms(500)).expect("end");

        c.pause(t0 + ms(520)).expect("pause");
        assert_eq!(c.progress().current_chunk_index, 1);
        c.resume(t0 + ms(600)).expect("resume");
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 1);
    }

    #[test]
    fn unavailable_synthesizer_is_reported() {
        let post = four_chunk_post();
        let mut c =
            NarrationController::new(RecordingSynthesizer::unavailable(), NarrationConfig::default());
        c.load_post(&post);
        assert_eq!(c.play(Instant::now()), Err(NarrationError::UnsupportedCapability));
        assert_eq!(c.status(), NarrationStatus::Error);
        assert!(c.synthesizer().spoken.is_empty());
    }

    #[test]
    fn empty_post_is_reported() {
        let post = Post::new("  ", Some(""), "<script>track()</script>");
        let mut c = controller_with(&post);
        assert_eq!(c.play(Instant::now()), Err(NarrationError::EmptyContent));
        assert!(c.synthesizer().spoken.is_empty());
    }

    #[test]
    fn speak_failure_halts_playback() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        c.synthesizer_mut().fail_next_speak = Some("no-voice".into());
        let err = c.play(Instant::now()).expect_err("speak fails");
        assert_eq!(err, NarrationError::SynthesisError("no-voice".into()));
        assert!(c.state().error_message().is_some());
        assert_eq!(c.in_flight(), None);
    }

    #[test]
    fn loading_new_post_cancels_and_resets() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.seek(75.0, t0).expect("seek");

        assert!(!c.load_post(&post));
        assert_eq!(c.state(), &PlaybackState::Playing);

        let other = Post::new("Another", Some("Post"), "<p>Short body.</p>");
        assert!(c.load_post(&other));
        assert_eq!(c.state(), &PlaybackState::Idle);
        assert_eq!(c.status(), NarrationStatus::Ready);
        assert_eq!(c.in_flight(), None);
        assert_eq!(c.progress().current_chunk_index, 0);
        assert_eq!(c.progress().elapsed_secs, 0.0);
        assert_eq!(c.text(), "Another. Post. Short body.");
    }

    #[test]
    fn finished_play_restarts_from_beginning() {
        let post = Post::new("One chunk only", None, "");
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let id = last_id(&c);
        c.on_synthesis_event(id, SynthesisEvent::Ended, t0 + ms(900)).expect("end");
        assert_eq!(c.state(), &PlaybackState::Finished);

        c.play(t0 + Duration::from_secs(5)).expect("replay");
        assert_eq!(c.progress().current_chunk_index, 0);
        assert_eq!(c.progress().elapsed_secs, 0.0);
        assert_eq!(c.synthesizer().spoken.len(), 2);
    }

    #[test]
    fn skip_moves_one_chunk_and_reconciles_elapsed() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");

        c.skip_forward(t0 + ms(100)).expect("forward");
        assert_eq!(c.progress().current_chunk_index, 1);
        assert_eq!(c.progress().elapsed_secs, 12.0);
        c.skip_backward(t0 + ms(200)).expect("backward");
        assert_eq!(c.progress().current_chunk_index, 0);
        c.skip_backward(t0 + ms(300)).expect("stays at first");
        assert_eq!(c.progress().current_chunk_index, 0);
        assert_eq!(c.synthesizer().last_spoken().expect("spoken").chunk_index, 0);
    }

    #[test]
    fn snapshot_reports_labels() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        c.tick(t0 + Duration::from_secs(7)).expect("tick");
        let snap = c.snapshot();
        assert_eq!(snap.status, NarrationStatus::Playing);
        assert_eq!(snap.chunk_count, 4);
        assert_eq!(snap.elapsed_label, "0:07");
        assert_eq!(snap.total_label, "0:48");
        assert!(snap.current_chunk.expect("chunk").starts_with("a w"));
    }

    #[test]
    fn shutdown_cancels_in_flight_synthesis() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        c.play(Instant::now()).expect("play");
        c.shutdown();
        assert_eq!(c.in_flight(), None);
        assert_eq!(c.synthesizer().cancel_count, 1);
        assert_eq!(c.status(), NarrationStatus::Stopped);
    }

    /// Counts cancels in a cell that outlives the controller.
    struct SharedCancelCounter {
        cancels: Rc<Cell<usize>>,
    }

    impl SpeechSynthesizer for SharedCancelCounter {
        fn is_available(&self) -> bool {
            true
        }

        fn voices(&self) -> Vec<Voice> {
            Vec::new()
        }

        fn speak(&mut self, _utterance: &Utterance) -> NarrationResult<()> {
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels.set(self.cancels.get() + 1);
        }
    }

    #[test]
    fn dropping_controller_cancels_in_flight_synthesis() {
        let cancels = Rc::new(Cell::new(0));
        let mut c = NarrationController::new(
            SharedCancelCounter {
                cancels: Rc::clone(&cancels),
            },
            NarrationConfig::default(),
        );
        c.load_post(&four_chunk_post());
        c.play(Instant::now()).expect("play");
        assert!(c.in_flight().is_some());
        assert_eq!(cancels.get(), 0);

        drop(c);
        assert_eq!(cancels.get(), 1);
    }

    #[test]
    fn dropping_idle_controller_does_not_cancel() {
        let cancels = Rc::new(Cell::new(0));
        let c = NarrationController::new(
            SharedCancelCounter {
                cancels: Rc::clone(&cancels),
            },
            NarrationConfig::default(),
        );
        drop(c);
        assert_eq!(cancels.get(), 0);
    }

    #[test]
    fn platform_interruption_of_current_chunk_pauses() {
        let post = four_chunk_post();
        let mut c = controller_with(&post);
        let t0 = Instant::now();
        c.play(t0).expect("play");
        let id = last_id(&c);

        c.on_synthesis_event(id, SynthesisEvent::Failed("interrupted".into()), t0 + ms(300))
            .expect("interruption is not an error");
        assert_eq!(c.state(), &PlaybackState::Paused);
        assert_eq!(c.in_flight(), None);
        assert!(!c.wants_ticks());
        assert_eq!(c.synthesizer().cancel_count, 0);

        c.tick(t0 + Duration::from_secs(48)).expect("tick while paused");
        assert_eq!(c.state(), &PlaybackState::Paused);

        c.resume(t0 + Duration::from_secs(50)).expect("resume");
        let respoken = c.synthesizer().last_spoken().expect("spoken");
        assert_eq!(respoken.chunk_index, 0);
        assert_ne!(respoken.id, id);
        c.tick(t0 + Duration::from_secs(51)).expect("tick");
        assert!(c.progress().elapsed_secs < 2.0);
        assert_eq!(c.state(), &PlaybackState::Playing);
    }
}
