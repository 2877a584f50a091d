//! End-to-end scenarios
//!
//! - Classifier ladder through a live sampling loop
//! - Slot isolation with concurrent sessions
//! - Session replacement on one slot
//! - Blink cleanup across character swaps
//! - Teardown on completion, stop and failure

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kuchi_audio::{AudioSource, SpectrumSource};
    use kuchi_core::{CharacterFamily, CharacterSlot, ControlScope, ErrorKind, VoiceId};
    use kuchi_runtime::{LipSyncController, PlaybackStatus, TimerGauge};
    use kuchi_visual::{AssetPaths, CharacterSurface, MouthState, SceneSurface, SpriteNode};

    use crate::*;

    const METAN: VoiceId = VoiceId(2);
    const ZUNDAMON: VoiceId = VoiceId(3);
    const TAKEHIRO: VoiceId = VoiceId(11);

    fn mouth_states(scene: &SceneSurface, slot: CharacterSlot) -> Vec<String> {
        file_names(&scene.writes_for(slot, SpriteNode::Mouth))
    }

    fn sprite_names(family: CharacterFamily, states: &[MouthState]) -> Vec<String> {
        states
            .iter()
            .map(|s| format!("{}_mouse_{}.png", family.asset_prefix(), s.sprite_suffix()))
            .collect()
    }

    fn controller(scene: &Arc<SceneSurface>, slot: CharacterSlot, family: CharacterFamily) -> LipSyncController {
        LipSyncController::new(
            slot,
            Some(family),
            scene.clone(),
            AssetPaths::default(),
            Duration::from_millis(40),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ladder_scenarios_through_loop() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        let mut lipsync = controller(&scene, CharacterSlot::A, CharacterFamily::Metan);

        let script = Arc::new(ScriptedSpectrum::new([
            Frame::Bins(vec![100, 100, 0, 0]),
            Frame::Bins(vec![10, 10, 0, 0]),
            Frame::Bins(vec![0, 0, 0, 0]),
            Frame::Energy(1000),
            Frame::Energy(400),
        ]));
        lipsync.start(script.clone()).await;
        tokio::time::sleep(Duration::from_millis(210)).await;
        lipsync.stop().await;

        // five ticks, then the resting mouth from stop
        let expected = [
            MouthState::Open,
            MouthState::OpenMid,
            MouthState::OpenMid,
            MouthState::Open,
            MouthState::Closed,
            MouthState::Closed,
        ];
        assert_eq!(script.reads(), 5);
        assert_eq!(
            mouth_states(&scene, CharacterSlot::A),
            sprite_names(CharacterFamily::Metan, &expected)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_slots_keep_their_own_energy() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        scene.mount(CharacterSlot::B, CharacterFamily::Zundamon);

        let energies_a = [900, 100, 800, 800, 50, 600];
        let energies_b = [10, 20, 5000, 4700, 4000, 0];

        let mut a = controller(&scene, CharacterSlot::A, CharacterFamily::Metan);
        let mut b = controller(&scene, CharacterSlot::B, CharacterFamily::Zundamon);
        a.start(Arc::new(ScriptedSpectrum::energies(&energies_a))).await;
        b.start(Arc::new(ScriptedSpectrum::energies(&energies_b))).await;

        tokio::time::sleep(Duration::from_millis(250)).await;
        a.stop().await;
        b.stop().await;

        let mut expected_a = expected_states(&energies_a);
        expected_a.push(MouthState::Closed);
        let mut expected_b = expected_states(&energies_b);
        expected_b.push(MouthState::Closed);

        assert_eq!(
            mouth_states(&scene, CharacterSlot::A),
            sprite_names(CharacterFamily::Metan, &expected_a)
        );
        assert_eq!(
            mouth_states(&scene, CharacterSlot::B),
            sprite_names(CharacterFamily::Zundamon, &expected_b)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_do_not_end_sampling() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::B, CharacterFamily::Tsumugi);
        let mut lipsync = controller(&scene, CharacterSlot::B, CharacterFamily::Tsumugi);

        let script: Arc<dyn SpectrumSource> = Arc::new(ScriptedSpectrum::new([
            Frame::Fail,
            Frame::Energy(300),
            Frame::Fail,
            Frame::Fail,
            Frame::Energy(0),
        ]));
        lipsync.start(script).await;
        tokio::time::sleep(Duration::from_millis(210)).await;

        let stats = lipsync.stats();
        assert_eq!(stats.ticks, 5);
        assert_eq!(stats.ticks_failed, 3);
        assert_eq!(stats.mouth_writes, 2);
        // 300 then 0 is a drop of 300
        assert_eq!(stats.last_state, Some(MouthState::CloseMid));
        lipsync.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_director_plays_both_slots_at_once() {
        let rig = TestRig::new(ControlScope::PerSlot).unwrap();
        rig.director.assign(CharacterSlot::A, METAN).await.unwrap();
        rig.director.assign(CharacterSlot::B, ZUNDAMON).await.unwrap();

        let (a, b) = tokio::join!(
            rig.director.play(CharacterSlot::A, AudioSource::from(syllables(4, 120, 60)), METAN),
            rig.director.play(CharacterSlot::B, AudioSource::from(tone(220.0, 500, 0.7)), ZUNDAMON),
        );

        assert_eq!(a.status, PlaybackStatus::Completed);
        assert_eq!(b.status, PlaybackStatus::Completed);
        assert_eq!(a.elapsed, Duration::from_millis(720));
        assert_eq!(b.elapsed, Duration::from_millis(500));
        assert_ne!(a.session, b.session);

        assert!(rig.mouth_files(CharacterSlot::A).iter().all(|f| f.starts_with("metan_")));
        assert!(rig.mouth_files(CharacterSlot::B).iter().all(|f| f.starts_with("zunda_")));
        assert!(rig.mouth_files(CharacterSlot::A).contains(&"metan_mouse_open.png".to_string()));
        assert_eq!(
            rig.scene.mouth(CharacterSlot::A).unwrap(),
            rig.paths.mouth(CharacterFamily::Metan, MouthState::Closed)
        );
        assert_eq!(
            rig.scene.mouth(CharacterSlot::B).unwrap(),
            rig.paths.mouth(CharacterFamily::Zundamon, MouthState::Closed)
        );
        assert_eq!(rig.director.contexts().live(), 0);
        assert!(rig.scene.controls_enabled(CharacterSlot::A));
        assert!(rig.scene.controls_enabled(CharacterSlot::B));
        rig.director.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_on_same_slot_leaves_one_timer() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        rig.director.assign(CharacterSlot::A, METAN).await.unwrap();

        let director = rig.director.clone();
        let first = tokio::spawn(async move {
            director
                .play(CharacterSlot::A, AudioSource::from(tone(300.0, 5_000, 0.5)), METAN)
                .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rig.director.timers(CharacterSlot::A).lipsync, 1);

        let director = rig.director.clone();
        let second = tokio::spawn(async move {
            director
                .play(CharacterSlot::A, AudioSource::from(tone(300.0, 400, 0.5)), METAN)
                .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(rig.director.timers(CharacterSlot::A).lipsync, 1);
        let first = first.await.unwrap();
        assert_eq!(first.status, PlaybackStatus::Stopped);

        let second = second.await.unwrap();
        assert_eq!(second.status, PlaybackStatus::Completed);
        assert_eq!(rig.director.timers(CharacterSlot::A).lipsync, 0);
        assert_eq!(rig.director.contexts().live(), 0);
        assert!(!*rig.director.busy(CharacterSlot::A).borrow());
        rig.director.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_mid_utterance_stops_writes_to_old_face() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        let metan = rig.director.assign(CharacterSlot::A, METAN).await.unwrap().unwrap();

        let director = rig.director.clone();
        let play = tokio::spawn(async move {
            director
                .play(CharacterSlot::A, AudioSource::from(tone(300.0, 2_000, 0.5)), METAN)
                .await
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rig.mouth_writes_on(CharacterSlot::A, metan) > 0);

        // the surrounding page swaps the picture without telling the director
        let zunda = rig.scene.mount(CharacterSlot::A, CharacterFamily::Zundamon);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rig.mouth_writes_on(CharacterSlot::A, zunda), 0);

        rig.director.stop(CharacterSlot::A).await;
        let report = play.await.unwrap();
        assert_eq!(report.status, PlaybackStatus::Stopped);
        assert!(report.lipsync.ticks_gated >= 4);
        assert_eq!(rig.scene.rejected_writes(), 0);
        rig.director.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanimated_voice_plays_without_sprites() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        let element = rig.director.assign(CharacterSlot::B, TAKEHIRO).await.unwrap();
        assert!(element.is_none());
        assert!(rig.scene.mounted(CharacterSlot::B).is_none());

        let report = rig
            .director
            .play(CharacterSlot::B, AudioSource::from(tone(200.0, 300, 0.5)), TAKEHIRO)
            .await;
        assert_eq!(report.status, PlaybackStatus::Completed);
        assert!(report.lipsync.ticks > 0);
        assert!(rig.scene.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_character_swaps_do_not_leak_blink_timers() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        for voice in [METAN, ZUNDAMON, VoiceId(8), VoiceId(10), VoiceId(9), METAN] {
            rig.director.assign(CharacterSlot::A, voice).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(rig.director.timers(CharacterSlot::A).blink, 2);

        rig.director.clear(CharacterSlot::A).await;
        rig.director.clear(CharacterSlot::A).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(rig.director.timers(CharacterSlot::A).blink, 0);
        assert!(!rig.director.is_blinking(CharacterSlot::A));

        let writes = rig.scene.writes().len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rig.scene.writes().len(), writes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assigned_character_keeps_blinking() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        rig.director.assign(CharacterSlot::B, VoiceId(9)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        // a blink caught mid-hold reopens on cleanup
        rig.director.shutdown().await;

        let eyes = file_names(&rig.scene.writes_for(CharacterSlot::B, SpriteNode::Eyes));
        assert!(eyes.len() >= 4);
        assert_eq!(eyes.len() % 2, 0);
        for pair in eyes.chunks(2) {
            assert_eq!(pair, ["ritsu_eye_close.png", "ritsu_eye_open.png"]);
        }
    }

    #[tokio::test]
    async fn test_wav_source_end_to_end() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        rig.director.assign(CharacterSlot::A, VoiceId(10)).await.unwrap();

        let source = wav_source(&syllables(2, 100, 50)).unwrap();
        let report = rig.director.play(CharacterSlot::A, source, VoiceId(10)).await;

        assert_eq!(report.status, PlaybackStatus::Completed);
        assert!(report.elapsed >= Duration::from_millis(300));
        assert!(rig.mouth_files(CharacterSlot::A).iter().any(|f| f == "hau_mouse_open.png"));
        assert_eq!(rig.director.contexts().live(), 0);
        rig.director.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_failure_tears_down() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        rig.director.assign(CharacterSlot::A, METAN).await.unwrap();

        let report = rig
            .director
            .play(CharacterSlot::A, AudioSource::url("http://127.0.0.1:9/missing.mp3"), METAN)
            .await;

        match &report.status {
            PlaybackStatus::Failed(e) => assert_eq!(e.kind(), ErrorKind::Fetch),
            other => panic!("unexpected status {other}"),
        }
        assert_eq!(rig.director.contexts().live(), 0);
        assert!(rig.scene.controls_enabled(CharacterSlot::A));
        assert_eq!(
            rig.scene.mouth(CharacterSlot::A).unwrap(),
            rig.paths.mouth(CharacterFamily::Metan, MouthState::Closed)
        );
        assert_eq!(rig.director.timers(CharacterSlot::A).lipsync, 0);
        rig.director.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_loading_discards_result() {
        let rig = TestRig::new(ControlScope::Global).unwrap();
        rig.director.assign(CharacterSlot::A, METAN).await.unwrap();
        let (producer, source) = AudioSource::deferred();

        let director = rig.director.clone();
        let play = tokio::spawn(async move { director.play(CharacterSlot::A, source, METAN).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rig.director.stop(CharacterSlot::A).await);

        let _ = producer.send(Ok(tone(300.0, 500, 0.5)));
        let report = play.await.unwrap();
        assert_eq!(report.status, PlaybackStatus::Stopped);
        assert_eq!(report.lipsync.ticks, 0);
        assert_eq!(rig.director.contexts().live(), 0);
        assert_eq!(rig.director.timers(CharacterSlot::A).lipsync, 0);
        rig.director.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_gauge_counts_one_loop_per_controller() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        let gauge = TimerGauge::new();
        let mut lipsync =
            controller(&scene, CharacterSlot::A, CharacterFamily::Metan).with_gauge(gauge.clone());

        for _ in 0..5 {
            lipsync
                .start(Arc::new(ScriptedSpectrum::energies(&[100, 200, 300])))
                .await;
        }
        assert_eq!(gauge.active(), 1);
        lipsync.stop().await;
        assert_eq!(gauge.active(), 0);
    }
}
