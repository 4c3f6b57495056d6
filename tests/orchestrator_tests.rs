mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use stagehand::error::{ProtocolError, StagehandError};
use stagehand::orchestrator::{Action, ExecuteRequest, Orchestrator, Processed};
use stagehand::stage::Stage;
use stagehand::tools::{StageTool, ToolContext, ToolOutput, ToolParameters};
use stagehand::workflow::{Workflow, WorkflowRegistry};

fn request(action: Action) -> ExecuteRequest {
    ExecuteRequest::new("zillow", action)
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn transition_to(stage: &str) -> Action {
    Action::StageTransition {
        target: stage.to_string(),
    }
}

async fn handshake(orchestrator: &Orchestrator) -> Processed {
    orchestrator
        .process(None, request(Action::Handshake))
        .await
        .expect("handshake should open a session")
}

fn protocol_error(result: Result<Processed, StagehandError>) -> ProtocolError {
    match result {
        Err(StagehandError::Protocol(err)) => err,
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn actions_without_handshake_are_rejected() {
    let orchestrator = common::demo_orchestrator();

    let err = protocol_error(
        orchestrator
            .process(None, request(Action::StateInput { updates: Map::new() }))
            .await,
    );
    assert_eq!(err, ProtocolError::SessionNotFound);

    let err = protocol_error(
        orchestrator
            .process(Some("no-such-session"), request(transition_to("underwriting")))
            .await,
    );
    assert_eq!(err, ProtocolError::SessionNotFound);
    assert_eq!(orchestrator.session_count().await, 0);
}

#[tokio::test]
async fn handshake_renders_comprehensive_view_with_tools() {
    let orchestrator = common::demo_orchestrator();
    let opened = handshake(&orchestrator).await;

    assert!(!opened.session_id.is_empty());
    assert_eq!(opened.response.current_stage, "search");
    assert!(opened.response.content.starts_with("Connected to workflow 'zillow'."));
    assert!(opened.response.content.contains("Workflow: zillow"));
    assert!(opened.response.content.contains("Available transitions: underwriting, portfolio"));

    let names: Vec<String> = opened
        .response
        .tools
        .expect("handshake advertises tools")
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(
        names,
        [
            "search_properties",
            "save_property",
            "transition_stage",
            "provide_state",
            "terminate_session",
        ]
    );
}

#[tokio::test]
async fn rejected_transition_leaves_session_untouched() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let err = protocol_error(
        orchestrator
            .process(Some(&id), request(transition_to("portfolio")))
            .await,
    );
    assert_eq!(
        err,
        ProtocolError::PrerequisiteUnmet {
            stage: "portfolio".into(),
            missing: vec!["underwriting".into()],
        }
    );

    let err = protocol_error(
        orchestrator
            .process(Some(&id), request(transition_to("book")))
            .await,
    );
    assert_eq!(
        err,
        ProtocolError::InvalidTransition {
            from: "search".into(),
            to: "book".into(),
        }
    );

    let still_here = orchestrator
        .process(Some(&id), request(Action::StateInput { updates: Map::new() }))
        .await
        .unwrap();
    assert_eq!(still_here.response.current_stage, "search");
    assert!(still_here.response.content.starts_with("No state changes."));
}

#[tokio::test]
async fn unknown_tool_is_a_protocol_error() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let err = protocol_error(
        orchestrator
            .process(
                Some(&id),
                request(Action::MethodCall {
                    task: "track_rent_comps".into(),
                    args: args(json!({"property_id": "A"})),
                }),
            )
            .await,
    );
    assert_eq!(
        err,
        ProtocolError::UnknownTool {
            stage: "search".into(),
            tool: "track_rent_comps".into(),
        }
    );
}

#[tokio::test]
async fn full_path_reaches_portfolio_tools() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let moved = orchestrator
        .process(Some(&id), request(transition_to("underwriting")))
        .await
        .unwrap();
    assert_eq!(moved.response.current_stage, "underwriting");
    assert!(moved.response.tools.is_some());
    assert!(moved
        .response
        .content
        .starts_with("Transitioned from 'search' to 'underwriting'."));

    orchestrator
        .process(Some(&id), request(transition_to("portfolio")))
        .await
        .unwrap();

    let called = orchestrator
        .process(
            Some(&id),
            request(Action::MethodCall {
                task: "track_rent_comps".into(),
                args: args(json!({"property_id": "A"})),
            }),
        )
        .await
        .unwrap();
    assert_eq!(called.session_id, id);
    assert_eq!(called.response.tools, None);
    assert!(!called.response.is_error);
    assert_eq!(
        called.response.content,
        "Property A: Current rent $2100, market $2350. Recommend $200 increase\n\n\
         Current stage: portfolio\n\
         State: {}\n\
         Available tools: monitor_property_values, track_rent_comps, detect_refi_opportunities, \
         run_cost_segregation, simulate_rebalance\n\
         Available transitions: none"
    );
}

#[tokio::test]
async fn missing_tool_argument_comes_back_as_tool_error() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let called = orchestrator
        .process(
            Some(&id),
            request(Action::MethodCall {
                task: "search_properties".into(),
                args: Map::new(),
            }),
        )
        .await
        .unwrap();
    assert!(called.response.is_error);
    assert!(called.response.content.contains("search_properties"));
    assert_eq!(called.response.current_stage, "search");
}

#[tokio::test]
async fn reentered_stage_keeps_its_local_state() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let saved = orchestrator
        .process(
            Some(&id),
            request(Action::MethodCall {
                task: "save_property".into(),
                args: args(json!({"property_id": "B"})),
            }),
        )
        .await
        .unwrap();
    assert!(saved.response.content.contains(r#"State: {"shortlist": ["B"]}"#));

    let away = orchestrator
        .process(Some(&id), request(transition_to("underwriting")))
        .await
        .unwrap();
    assert!(away.response.content.contains("State: {}"));

    let back = orchestrator
        .process(Some(&id), request(transition_to("search")))
        .await
        .unwrap();
    assert!(back.response.content.contains(r#"State: {"shortlist": ["B"]}"#));

    let again = orchestrator
        .process(
            Some(&id),
            request(Action::MethodCall {
                task: "save_property".into(),
                args: args(json!({"property_id": "C"})),
            }),
        )
        .await
        .unwrap();
    assert!(again
        .response
        .content
        .starts_with("Saved property C. Shortlist has 2 properties"));
}

#[tokio::test]
async fn terminated_session_cannot_be_used_again() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let ended = orchestrator
        .process(Some(&id), request(Action::terminate(Some("user done"))))
        .await
        .unwrap();
    assert!(ended.response.content.starts_with("Session terminated: user done"));
    assert_eq!(orchestrator.session_count().await, 0);

    let err = protocol_error(
        orchestrator
            .process(Some(&id), request(Action::StateInput { updates: Map::new() }))
            .await,
    );
    assert_eq!(err, ProtocolError::SessionNotFound);

    let reopened = orchestrator
        .process(Some(&id), request(Action::Handshake))
        .await
        .unwrap();
    assert_ne!(reopened.session_id, id);
    assert_eq!(reopened.response.current_stage, "search");
}

#[tokio::test]
async fn handshake_with_live_id_resumes_the_session() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;
    orchestrator
        .process(Some(&id), request(transition_to("underwriting")))
        .await
        .unwrap();

    let resumed = orchestrator
        .process(Some(&id), request(Action::Handshake))
        .await
        .unwrap();
    assert_eq!(resumed.session_id, id);
    assert_eq!(resumed.response.current_stage, "underwriting");
    assert_eq!(orchestrator.session_count().await, 1);
}

#[tokio::test]
async fn session_id_is_bound_to_its_workflow() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    let err = protocol_error(
        orchestrator
            .process(
                Some(&id),
                ExecuteRequest::new("travel", Action::StateInput { updates: Map::new() }),
            )
            .await,
    );
    assert_eq!(err, ProtocolError::SessionNotFound);
}

#[tokio::test]
async fn unknown_workflow_is_an_invalid_argument() {
    let orchestrator = common::demo_orchestrator();
    let err = orchestrator
        .process(None, ExecuteRequest::new("nope", Action::Handshake))
        .await
        .unwrap_err();
    assert!(matches!(err, StagehandError::InvalidArgument(ref m) if m.contains("nope")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_sessions_run_in_parallel() {
    let orchestrator = common::demo_orchestrator();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let id = handshake(&orchestrator).await.session_id;
                let location = format!("city-{i}");
                let searched = orchestrator
                    .process(
                        Some(&id),
                        request(Action::MethodCall {
                            task: "search_properties".into(),
                            args: args(json!({"location": location})),
                        }),
                    )
                    .await
                    .unwrap();
                assert!(searched
                    .response
                    .content
                    .contains(&format!(r#"State: {{"location": "{location}"}}"#)));
                id
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in futures::future::join_all(tasks).await {
        ids.push(task.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(orchestrator.session_count().await, 16);
}

fn counter_orchestrator() -> Arc<Orchestrator> {
    // The handler yields between reading and writing its counter, so two
    // calls that overlap on one session would both write the same value.
    let increment = StageTool::new(
        "increment",
        "Add one to the counter",
        ToolParameters::empty(),
        |ctx: ToolContext, _| async move {
            let count = ctx.get_state("count").and_then(Value::as_u64).unwrap_or(0);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            let next = count + 1;
            Ok(ToolOutput::text(format!("count is {next}")).with_state("count", next))
        },
    );
    let workflow = Workflow::builder("counter")
        .stage(Stage::builder("tally").tool(increment).build())
        .build()
        .unwrap();
    let registry = WorkflowRegistry::new("http://localhost").register(workflow).unwrap();
    Arc::new(Orchestrator::new(registry))
}

fn increment() -> ExecuteRequest {
    ExecuteRequest::new(
        "counter",
        Action::MethodCall {
            task: "increment".into(),
            args: Map::new(),
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn actions_on_one_session_are_serialized() {
    let orchestrator = counter_orchestrator();
    let id = orchestrator
        .process(None, ExecuteRequest::new("counter", Action::Handshake))
        .await
        .unwrap()
        .session_id;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let id = id.clone();
            tokio::spawn(async move { orchestrator.process(Some(&id), increment()).await.unwrap() })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        assert!(!task.unwrap().response.is_error);
    }

    let last = orchestrator.process(Some(&id), increment()).await.unwrap();
    assert!(
        last.response.content.starts_with("count is 21"),
        "{}",
        last.response.content
    );
}

#[tokio::test]
async fn idle_sessions_are_reaped() {
    let orchestrator = common::demo_orchestrator();
    let id = handshake(&orchestrator).await.session_id;

    assert_eq!(orchestrator.reap_idle(std::time::Duration::from_secs(3600)).await, 0);
    assert_eq!(orchestrator.reap_idle(std::time::Duration::ZERO).await, 1);

    let err = protocol_error(
        orchestrator
            .process(Some(&id), request(Action::StateInput { updates: Map::new() }))
            .await,
    );
    assert_eq!(err, ProtocolError::SessionNotFound);
}
