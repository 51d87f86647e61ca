//! Integration tests for remote fact collection.
//!
//! Every combination of missing worker, anonymous worker, missing channel,
//! and failing channel must surface as a connection error.


use std::sync::Arc;

use rstest::rstest;

use harness::{linux, ScriptedChannel};
use plabel_labeler::{
    request_facts, AgentWorker, Channel, ChannelError, LabelerError, Unavailable, Worker,
};

#[derive(Debug, Clone, Copy)]
enum WorkerCase {
    Missing,
    Anonymous,
    Named,
}

#[derive(Debug, Clone, Copy)]
enum ChannelCase {
    Missing,
    Failing,
    Remote,
    Working,
}

fn worker_for(case: WorkerCase) -> Option<AgentWorker> {
    match case {
        WorkerCase::Missing => None,
        WorkerCase::Anonymous => Some(AgentWorker::anonymous()),
        WorkerCase::Named => Some(AgentWorker::new("agent-1")),
    }
}

fn channel_for(case: ChannelCase) -> Option<Arc<ScriptedChannel>> {
    match case {
        ChannelCase::Missing => None,
        ChannelCase::Failing => Some(ScriptedChannel::failing(ChannelError::Transport(
            "Oops".to_string(),
        ))),
        ChannelCase::Remote => Some(ScriptedChannel::failing(ChannelError::Remote(
            "probe panicked".to_string(),
        ))),
        ChannelCase::Working => Some(ScriptedChannel::answering(linux("5.15.0"))),
    }
}

#[rstest]
#[tokio::test]
async fn test_request_facts_matrix(
    #[values(WorkerCase::Missing, WorkerCase::Anonymous, WorkerCase::Named)] worker_case: WorkerCase,
    #[values(
        ChannelCase::Missing,
        ChannelCase::Failing,
        ChannelCase::Remote,
        ChannelCase::Working
    )]
    channel_case: ChannelCase,
) {
    let worker = worker_for(worker_case);
    let channel = channel_for(channel_case);

    let result = request_facts(
        worker.as_ref().map(|w| w as &dyn Worker),
        channel.as_deref().map(|c| c as &dyn Channel),
    )
    .await;

    match (worker_case, channel_case) {
        (WorkerCase::Named, ChannelCase::Working) => {
            assert_eq!(result.unwrap(), linux("5.15.0"));
        }
        _ => {
            let err = result.unwrap_err();
            assert!(matches!(err, LabelerError::ConnectionUnavailable { .. }));
        }
    }
}

#[tokio::test]
async fn test_missing_worker_is_reported_first() {
    let channel = ScriptedChannel::answering(linux("5.15.0"));

    let err = request_facts(None, Some(&*channel)).await.unwrap_err();

    assert_eq!(err.cause(), &Unavailable::NoWorker);
    assert_eq!(channel.calls(), 0);
}

#[tokio::test]
async fn test_missing_channel() {
    let worker = AgentWorker::new("agent-1");

    let err = request_facts(Some(&worker), None).await.unwrap_err();

    assert_eq!(err.cause(), &Unavailable::NoChannel);
    assert!(err.to_string().contains("agent-1"));
}

#[tokio::test]
async fn test_remote_error_is_rethrown_as_connection_error() {
    let worker = AgentWorker::new("agent-1");
    let channel = ScriptedChannel::failing(ChannelError::Remote("probe panicked".to_string()));

    let err = request_facts(Some(&worker), Some(&*channel))
        .await
        .unwrap_err();

    assert_eq!(
        err.cause(),
        &Unavailable::Channel(ChannelError::Remote("probe panicked".to_string()))
    );
    assert_eq!(channel.calls(), 1);
}
