//! End-to-end tests for the engines and the orchestrator.

#[cfg(test)]
mod tests {
    use crate::analysis::{
        CommunicationStyle, Confidence, DerivedProfile, FallbackSet, Intent, MessageAnalysis,
        Relationship, ResultMap, SocialView, StyleSource, SubAnalysis, FALLBACK_CONFIDENCE,
    };
    use crate::config::EngineConfig;
    use crate::context::{Context, Enrichments, ErrorKind, Slot};
    use crate::errors::{codes, ContextflowError, StageError};
    use crate::events::{names, CollectingEventSink};
    use crate::pipeline::{
        pipeline_names, stage_names, AnalysisDescriptor, Collaborators, ConcurrentEngine,
        ContextOrchestrator, PipelineDefinition, ProfileSynthesizer, SequentialEngine,
        StageDescriptor, Synthesizer, SYNTHESIS_STAGE,
    };
    use crate::stages::builtin::{KeywordMessageAnalyzer, MockSessionStore};
    use crate::testing::{
        assert_error_kind, assert_error_recorded, assert_no_errors, assert_profile_in_range,
        assert_run_failed, assert_run_succeeded, fallback_names, fallback_results, seeded_collaborators,
        FailingStage, PanickingStage, RecordingStage, SlowStage, StaticAnalysis, StaticStage,
        TestContext,
    };
    use crate::trace::StageOutcome;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    const SHORT: Duration = Duration::from_millis(500);

    fn greeting(confidence: f64) -> SubAnalysis {
        SubAnalysis::Message(MessageAnalysis::new(Intent::Greeting, confidence))
    }

    #[derive(Debug)]
    struct BrokenSynthesizer;

    #[async_trait]
    impl Synthesizer for BrokenSynthesizer {
        async fn synthesize(
            &self,
            _results: &ResultMap,
            _fallbacks: &FallbackSet,
            _ctx: &Context,
        ) -> Result<DerivedProfile, StageError> {
            Err(StageError::unavailable("profile service"))
        }
    }

    // Sequential engine

    #[tokio::test]
    async fn test_sequential_dependent_with_seeded_collaborators() {
        let collaborators = seeded_collaborators();
        let config = EngineConfig::default();
        let definition = PipelineDefinition::sequential_dependent(&collaborators, &config);

        let run = ContextOrchestrator::new(config)
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        assert_no_errors(&run.context);
        assert_eq!(
            run.context.operations_log(),
            &[
                stage_names::MESSAGE_ANALYSIS,
                stage_names::SESSION_CONTEXT,
                stage_names::MEMORY_CONTEXT,
                stage_names::SOCIAL_CONTEXT,
                stage_names::PERSONALITY_CONTEXT,
            ]
        );
        assert_eq!(run.context.enrichments().populated(), Slot::ALL.to_vec());
        assert!(run.results.is_none());

        assert_eq!(run.context.session_state().unwrap().turn_count, 2);
        let memory = run.context.memory_view().unwrap();
        assert_eq!(memory.snippets.len(), 1);
        assert!(memory.snippets[0].content.starts_with("Ana"));
        let social = run.context.social_view().unwrap();
        assert_eq!(social.relationship.as_ref().unwrap().person, "Ana");

        let profile = run.context.derived_profile().unwrap();
        assert!(!profile.is_fallback());
        assert_profile_in_range(profile);

        assert_eq!(run.trace.len(), 5);
        assert!(run.trace.entries().iter().all(|e| e.outcome == StageOutcome::Completed));
    }

    #[tokio::test]
    async fn test_later_stage_sees_earlier_output() {
        let recorder = Arc::new(RecordingStage::new());
        let writer = StaticStage::new(Enrichments {
            analysis: Some(MessageAnalysis::new(Intent::Question, 0.7)),
            ..Enrichments::default()
        });
        let stages = vec![
            StageDescriptor::required("writer", writer),
            StageDescriptor::from_arc("reader", true, recorder.clone()),
        ];

        let run = SequentialEngine::default()
            .run(TestContext::new().build(), &stages)
            .await
            .unwrap();

        assert!(run.success);
        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operations_seen, vec!["writer".to_string()]);
        assert_eq!(calls[0].slots_seen, vec![Slot::Analysis]);
    }

    #[tokio::test]
    async fn test_required_failure_stops_sequential_run() {
        let recorder = Arc::new(RecordingStage::new());
        let stages = vec![
            StageDescriptor::optional("flaky", FailingStage::new("cache miss")),
            StageDescriptor::required("broken", FailingStage::new("store offline")),
            StageDescriptor::from_arc("never", false, recorder.clone()),
        ];

        let run = SequentialEngine::default()
            .run(TestContext::new().build(), &stages)
            .await
            .unwrap();

        assert!(!run.success);
        assert_eq!(recorder.call_count(), 0);
        assert!(run.context.operations_log().is_empty());
        assert_error_recorded(&run.context, "flaky", true);
        assert_error_recorded(&run.context, "broken", false);
        assert!(run.context.has_fatal_errors());
        assert_eq!(run.trace.stage_names(), vec!["flaky", "broken"]);
    }

    #[tokio::test]
    async fn test_sequential_panic_and_timeout_are_recorded() {
        let stages = vec![
            StageDescriptor::optional("panics", PanickingStage::new("index out of bounds")),
            StageDescriptor::optional(
                "slow",
                SlowStage::with_delay_ms(2_000, SubAnalysis::memory_fallback()),
            )
            .with_timeout(Duration::from_millis(20)),
            StageDescriptor::required("after", RecordingStage::new()),
        ];

        let run = SequentialEngine::default()
            .run(TestContext::new().build(), &stages)
            .await
            .unwrap();

        assert!(run.success);
        assert_error_kind(&run.context, "panics", ErrorKind::Panic);
        assert_error_kind(&run.context, "slow", ErrorKind::Timeout);
        assert_eq!(run.context.operations_log(), &["after".to_string()]);
        assert_eq!(run.trace.get("slow").unwrap().outcome, StageOutcome::TimedOut);
        assert_eq!(run.trace.get("panics").unwrap().outcome, StageOutcome::Panicked);
    }

    #[tokio::test]
    async fn test_undeclared_overwrite_is_a_slot_conflict() {
        let initial = TestContext::new()
            .build()
            .with_analysis(MessageAnalysis::new(Intent::Greeting, 0.9));
        let rewrite = || {
            StaticStage::new(Enrichments {
                analysis: Some(MessageAnalysis::new(Intent::Request, 0.6)),
                ..Enrichments::default()
            })
        };

        let engine = SequentialEngine::default();
        let run = engine
            .run(initial.clone(), &[StageDescriptor::optional("rewrite", rewrite())])
            .await
            .unwrap();
        assert_error_kind(&run.context, "rewrite", ErrorKind::SlotConflict);
        assert_eq!(run.context.analysis().unwrap().intent, Intent::Greeting);

        let declared = StageDescriptor::optional("rewrite", rewrite()).depends_on(Slot::Analysis);
        let run = engine.run(initial, &[declared]).await.unwrap();
        assert_no_errors(&run.context);
        assert_eq!(run.context.analysis().unwrap().intent, Intent::Request);
    }

    #[tokio::test]
    async fn test_sequential_runs_are_idempotent() {
        let collaborators = seeded_collaborators();
        let config = EngineConfig::default();
        let definition = PipelineDefinition::sequential_dependent(&collaborators, &config);
        let orchestrator = ContextOrchestrator::new(config);
        let initial = TestContext::new().build();

        let first = orchestrator.run(initial.clone(), &definition).await.unwrap();
        let second = orchestrator.run(initial, &definition).await.unwrap();

        assert_eq!(first.context.fingerprint(), second.context.fingerprint());
        assert_eq!(first.trace.outcomes(), second.trace.outcomes());
    }

    // Concurrent engine

    #[tokio::test]
    async fn test_parallel_then_synthesize_with_seeded_collaborators() {
        let collaborators = seeded_collaborators();
        let config = EngineConfig::default();
        let definition = PipelineDefinition::parallel_then_synthesize(&collaborators, &config);

        let run = ContextOrchestrator::new(config)
            .with_session_store(Arc::clone(&collaborators.sessions))
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        let results = run.results.as_ref().unwrap();
        assert_eq!(
            results.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![
                stage_names::MEMORY_ANALYSIS,
                stage_names::MESSAGE_ANALYSIS,
                stage_names::SESSION_ANALYSIS,
                stage_names::SOCIAL_ANALYSIS,
            ]
        );
        assert_eq!(
            run.context.operations_log(),
            &[
                stage_names::MESSAGE_ANALYSIS,
                stage_names::SESSION_ANALYSIS,
                stage_names::MEMORY_ANALYSIS,
                stage_names::SOCIAL_ANALYSIS,
                SYNTHESIS_STAGE,
            ]
        );

        assert_eq!(run.context.session().unwrap().session_id, "session-1");
        assert_eq!(run.context.session_state().unwrap().turn_count, 2);
        assert_eq!(
            run.context.social_view().unwrap().relationship.as_ref().unwrap().person,
            "Ana"
        );

        let profile = run.context.derived_profile().unwrap();
        assert!(!profile.is_fallback());
        assert_profile_in_range(profile);

        assert_eq!(run.trace.len(), 5);
        assert!(run.trace.get(SYNTHESIS_STAGE).is_some());
    }

    #[tokio::test]
    async fn test_lightweight_fills_only_its_slots() {
        let collaborators = seeded_collaborators();
        let orchestrator = ContextOrchestrator::default();

        let run = orchestrator
            .run_named(
                TestContext::new().with_message("Hello there!").build(),
                pipeline_names::LIGHTWEIGHT,
                &collaborators,
            )
            .await
            .unwrap();

        assert_run_succeeded(&run);
        assert_eq!(run.results.as_ref().unwrap().len(), 2);
        assert_eq!(run.context.analysis().unwrap().intent, Intent::Greeting);
        assert!(run.context.session_state().is_some());
        assert!(run.context.memory_view().is_none());
        assert!(run.context.social_view().is_none());
        assert!(run.context.derived_profile().is_some());
    }

    #[tokio::test]
    async fn test_every_registered_stage_yields_one_result() {
        let stages = vec![
            AnalysisDescriptor::required(
                "fast",
                StaticAnalysis::new(greeting(0.9)),
                SHORT,
                SubAnalysis::message_fallback(),
            ),
            AnalysisDescriptor::optional(
                "fails",
                FailingStage::new("store offline"),
                SHORT,
                SubAnalysis::memory_fallback(),
            ),
            AnalysisDescriptor::optional(
                "panics",
                PanickingStage::new("unexpected state"),
                SHORT,
                SubAnalysis::social_fallback(),
            ),
            AnalysisDescriptor::optional(
                "sleeps",
                SlowStage::with_delay_ms(2_000, greeting(0.9)),
                Duration::from_millis(20),
                SubAnalysis::custom_fallback("sleeps"),
            ),
        ];

        let run = ConcurrentEngine::default()
            .run(&TestContext::new().build(), &stages)
            .await
            .unwrap();

        assert!(run.success);
        assert_eq!(run.results.len(), stages.len());
        assert_eq!(run.trace.len(), stages.len());
        assert_eq!(run.completed, vec!["fast".to_string()]);
        for name in ["fails", "panics", "sleeps"] {
            assert!(run.results[name].confidence() <= FALLBACK_CONFIDENCE);
        }

        let failed: Vec<(&str, ErrorKind, bool)> = run
            .errors
            .iter()
            .map(|e| (e.stage.as_str(), e.kind, e.recoverable))
            .collect();
        assert_eq!(
            failed,
            vec![
                ("fails", ErrorKind::StageFailure, true),
                ("panics", ErrorKind::Panic, true),
                ("sleeps", ErrorKind::Timeout, true),
            ]
        );
    }

    #[tokio::test]
    async fn test_required_failure_fails_run_but_still_synthesizes() {
        let definition = PipelineDefinition::builder("required-failure")
            .analysis(AnalysisDescriptor::required(
                "message",
                FailingStage::new("tokenizer crashed"),
                SHORT,
                SubAnalysis::message_fallback(),
            ))
            .analysis(AnalysisDescriptor::optional(
                "memory",
                StaticAnalysis::new(SubAnalysis::memory_fallback()),
                SHORT,
                SubAnalysis::memory_fallback(),
            ))
            .synthesizer(Arc::new(ProfileSynthesizer::default()))
            .build()
            .unwrap();

        let run = ContextOrchestrator::default()
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_failed(&run);
        assert_error_recorded(&run.context, "message", false);
        assert_eq!(run.results.as_ref().unwrap().len(), 2);
        assert_eq!(run.context.operations_log(), &["memory".to_string(), SYNTHESIS_STAGE.to_string()]);
        assert_profile_in_range(run.context.derived_profile().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_merge_is_independent_of_completion_order() {
        let build = || {
            vec![
                AnalysisDescriptor::required(
                    "a-message",
                    StaticAnalysis::new(greeting(0.8)).with_jitter(Duration::from_millis(15)),
                    SHORT,
                    SubAnalysis::message_fallback(),
                ),
                AnalysisDescriptor::optional(
                    "b-memory",
                    StaticAnalysis::new(SubAnalysis::memory_fallback())
                        .with_delay(Duration::from_millis(2))
                        .with_jitter(Duration::from_millis(15)),
                    SHORT,
                    SubAnalysis::memory_fallback(),
                ),
                AnalysisDescriptor::optional(
                    "c-broken",
                    FailingStage::new("nope"),
                    SHORT,
                    SubAnalysis::social_fallback(),
                ),
                AnalysisDescriptor::optional(
                    "d-custom",
                    StaticAnalysis::new(SubAnalysis::custom_fallback("extra"))
                        .with_jitter(Duration::from_millis(15)),
                    SHORT,
                    SubAnalysis::custom_fallback("extra"),
                ),
            ]
        };
        let engine = ConcurrentEngine::default();
        let ctx = TestContext::new().build();

        let baseline = engine.run(&ctx, &build()).await.unwrap();
        for _ in 0..8 {
            let run = engine.run(&ctx, &build()).await.unwrap();
            assert_eq!(run.results, baseline.results);
            assert_eq!(run.completed, baseline.completed);
            assert_eq!(run.trace.outcomes(), baseline.trace.outcomes());
            assert_eq!(
                run.errors.iter().map(|e| &e.stage).collect::<Vec<_>>(),
                baseline.errors.iter().map(|e| &e.stage).collect::<Vec<_>>()
            );
        }
    }

    #[tokio::test]
    async fn test_prepopulated_slots_are_kept() {
        let initial = TestContext::new()
            .with_message("Hello!")
            .build()
            .with_analysis(MessageAnalysis::new(Intent::Emotional, 0.95));
        let definition =
            PipelineDefinition::lightweight(&seeded_collaborators(), &EngineConfig::default());

        let run = ContextOrchestrator::default().run(initial, &definition).await.unwrap();

        assert_eq!(run.context.analysis().unwrap().intent, Intent::Emotional);
        let result = run.results.as_ref().unwrap()[stage_names::MESSAGE_ANALYSIS].as_message();
        assert_eq!(result.unwrap().intent, Intent::Greeting);
    }

    #[tokio::test]
    async fn test_prepopulated_profile_is_kept() {
        let mut preset = DerivedProfile::fallback();
        preset.communication_style = CommunicationStyle::Formal;
        preset.style_source = StyleSource::Relationship;
        preset.confidence_level = 0.8;
        let initial = TestContext::new().build().with_derived_profile(preset.clone());
        let definition =
            PipelineDefinition::lightweight(&seeded_collaborators(), &EngineConfig::default());

        let run = ContextOrchestrator::default().run(initial, &definition).await.unwrap();

        assert_eq!(run.context.derived_profile(), Some(&preset));
        assert!(run.context.operations_log().contains(&SYNTHESIS_STAGE.to_string()));
    }

    #[tokio::test]
    async fn test_session_fallback_carries_run_session_id() {
        let mut store = MockSessionStore::new();
        store
            .expect_resolve()
            .returning(|_| Err(StageError::unavailable("session store")));
        let seeded = seeded_collaborators();
        let collaborators = Collaborators::new(
            Arc::new(store),
            Arc::clone(&seeded.memories),
            Arc::clone(&seeded.relationships),
        );
        let definition = PipelineDefinition::lightweight(&collaborators, &EngineConfig::default());

        let run = ContextOrchestrator::default()
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_failed(&run);
        assert_error_recorded(&run.context, stage_names::SESSION_ANALYSIS, false);
        let fallback = run.results.as_ref().unwrap()[stage_names::SESSION_ANALYSIS].as_session();
        assert_eq!(fallback.unwrap().session_id, "session-1");
        assert!(run.context.session_state().is_none());
    }

    // Synthesis

    #[test]
    fn test_synthesizer_stays_in_range_on_fallbacks() {
        let profile = ProfileSynthesizer::default().profile(&fallback_results(), &fallback_names());
        assert_profile_in_range(&profile);
        assert!(profile.signals.is_empty());

        let empty = ProfileSynthesizer::default().profile(&ResultMap::new(), &FallbackSet::new());
        assert_profile_in_range(&empty);
    }

    #[tokio::test]
    async fn test_low_confidence_social_result_sets_style() {
        let weak_social = SocialView::new(
            Some(Relationship::new("Ana", 0.1).with_preferred_style(CommunicationStyle::Playful)),
            0.1,
        );
        let definition = PipelineDefinition::builder("weak-social")
            .analysis(AnalysisDescriptor::required(
                "message",
                StaticAnalysis::new(SubAnalysis::Message(MessageAnalysis::new(Intent::Question, 0.9))),
                SHORT,
                SubAnalysis::message_fallback(),
            ))
            .analysis(AnalysisDescriptor::optional(
                "social",
                StaticAnalysis::new(SubAnalysis::Social(weak_social)),
                SHORT,
                SubAnalysis::social_fallback(),
            ))
            .synthesizer(Arc::new(ProfileSynthesizer::default()))
            .build()
            .unwrap();

        let run = ContextOrchestrator::default()
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        let profile = run.context.derived_profile().unwrap();
        assert_eq!(profile.communication_style, CommunicationStyle::Playful);
        assert_eq!(profile.style_source, StyleSource::Relationship);
        assert_eq!(profile.signals, vec!["message".to_string(), "social".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_personality_stage_leaves_fallback_profile() {
        let sink = Arc::new(CollectingEventSink::new());
        let stages = vec![
            StageDescriptor::required(stage_names::MESSAGE_ANALYSIS, KeywordMessageAnalyzer::new()),
            StageDescriptor::optional(
                stage_names::PERSONALITY_CONTEXT,
                FailingStage::new("model offline"),
            ),
        ];

        let run = ContextOrchestrator::default()
            .with_event_sink(sink.clone())
            .run_sequential(TestContext::new().build(), &stages)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        assert_error_recorded(&run.context, stage_names::PERSONALITY_CONTEXT, true);
        assert_eq!(run.context.derived_profile(), Some(&DerivedProfile::fallback()));
        assert_eq!(sink.events_of_type(names::SYNTHESIS_FALLBACK).len(), 1);
    }

    #[tokio::test]
    async fn test_all_stages_failing_still_produces_profile() {
        let definition = PipelineDefinition::builder("all-fail")
            .analysis(AnalysisDescriptor::optional(
                "message",
                FailingStage::new("a"),
                SHORT,
                SubAnalysis::message_fallback(),
            ))
            .analysis(AnalysisDescriptor::optional(
                "social",
                PanickingStage::new("b"),
                SHORT,
                SubAnalysis::social_fallback(),
            ))
            .synthesizer(Arc::new(ProfileSynthesizer::default()))
            .build()
            .unwrap();

        let run = ContextOrchestrator::default()
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        assert_eq!(run.context.operations_log(), &[SYNTHESIS_STAGE.to_string()]);
        assert_profile_in_range(run.context.derived_profile().unwrap());
    }

    #[tokio::test]
    async fn test_synthesis_failure_uses_fallback_and_emits_event() {
        let sink = Arc::new(CollectingEventSink::new());
        let definition = PipelineDefinition::builder("broken-synthesis")
            .analysis(AnalysisDescriptor::required(
                "message",
                StaticAnalysis::new(greeting(0.9)),
                SHORT,
                SubAnalysis::message_fallback(),
            ))
            .synthesizer(Arc::new(BrokenSynthesizer))
            .build()
            .unwrap();

        let run = ContextOrchestrator::default()
            .with_event_sink(sink.clone())
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_run_succeeded(&run);
        assert_eq!(run.context.derived_profile(), Some(&DerivedProfile::fallback()));
        assert_error_kind(&run.context, SYNTHESIS_STAGE, ErrorKind::SynthesisFailure);
        assert_error_recorded(&run.context, SYNTHESIS_STAGE, true);
        assert_eq!(run.context.operations_log(), &["message".to_string()]);
        assert_eq!(sink.events_of_type(names::SYNTHESIS_FALLBACK).len(), 1);
    }

    // Orchestrator surface

    #[tokio::test]
    async fn test_lifecycle_events_for_concurrent_run() {
        let sink = Arc::new(CollectingEventSink::new());
        let collaborators = seeded_collaborators();
        let definition =
            PipelineDefinition::lightweight(&collaborators, &EngineConfig::default());

        ContextOrchestrator::default()
            .with_event_sink(sink.clone())
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();

        assert_eq!(sink.events_of_type(names::STAGE_STARTED).len(), 2);
        assert_eq!(sink.events_of_type(names::STAGE_COMPLETED).len(), 2);
        let completed = sink.events_of_type(names::PIPELINE_COMPLETED);
        assert_eq!(completed.len(), 1);
        let payload = completed[0].1.as_ref().unwrap();
        assert_eq!(payload["mode"], "concurrent");
        assert_eq!(payload["success"], true);
    }

    #[tokio::test]
    async fn test_existing_session_handle_is_kept() {
        let collaborators = seeded_collaborators();
        let initial = TestContext::new().with_session_handle().build();
        let token = initial.session().unwrap().token;

        let run = ContextOrchestrator::default()
            .with_session_store(Arc::clone(&collaborators.sessions))
            .run_named(initial, pipeline_names::LIGHTWEIGHT, &collaborators)
            .await
            .unwrap();

        assert_eq!(run.context.session().unwrap().token, token);
    }

    #[tokio::test]
    async fn test_unresolvable_session_is_not_fatal() {
        let collaborators = seeded_collaborators();
        let initial = TestContext::new().with_session_id("").build();

        let run = ContextOrchestrator::default()
            .with_session_store(Arc::clone(&collaborators.sessions))
            .run_named(initial, pipeline_names::PARALLEL_THEN_SYNTHESIZE, &collaborators)
            .await
            .unwrap();

        assert!(run.context.session().is_none());
        assert_run_failed(&run);
        assert_error_recorded(&run.context, stage_names::SESSION_ANALYSIS, false);
        assert!(run.context.derived_profile().is_some());
    }

    #[tokio::test]
    async fn test_unknown_named_pipeline() {
        let err = ContextOrchestrator::default()
            .run_named(
                TestContext::new().build(),
                "everything-at-once",
                &seeded_collaborators(),
            )
            .await
            .unwrap_err();

        match err {
            ContextflowError::Validation(e) => assert_eq!(e.code, codes::UNKNOWN_PIPELINE),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_config_file_overrides_stage_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"stage_timeouts_ms": {{"sleeps": 20}}}}"#).unwrap();
        let orchestrator = ContextOrchestrator::from_config_file(file.path()).unwrap();

        let definition = PipelineDefinition::builder("override")
            .analysis(AnalysisDescriptor::optional(
                "sleeps",
                SlowStage::with_delay_ms(2_000, greeting(0.9)),
                Duration::from_secs(5),
                SubAnalysis::message_fallback(),
            ))
            .synthesizer(Arc::new(ProfileSynthesizer::default()))
            .build()
            .unwrap();

        let run = orchestrator
            .run(TestContext::new().build(), &definition)
            .await
            .unwrap();
        assert_error_kind(&run.context, "sleeps", ErrorKind::Timeout);
    }

    #[test]
    fn test_bad_config_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_confidence": 3.0}}"#).unwrap();
        let err = ContextOrchestrator::from_config_file(file.path()).unwrap_err();
        assert!(matches!(err, ContextflowError::Config(_)));
    }
}
