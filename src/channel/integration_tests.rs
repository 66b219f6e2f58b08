// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::abi::ClockUnit;
use crate::bridge::fixtures;
use crate::bridge::output::{ExecutionId, OutputEvent};
use crate::bridge::loader::ModuleLoader;
use crate::channel::{self, ChannelState, InlineChannel, IsolatedChannel, Topology, WorkerMessage};
use crate::config::HostConfig;
use crate::console::{Console, RunOutcome};
use crate::traits::ExecutionChannel;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

fn config_for(file: &NamedTempFile, topology: Topology) -> HostConfig {
    let mut config = HostConfig::default();
    config.module.source = file.path().display().to_string();
    config.topology = topology;
    config.abi.clock_unit = ClockUnit::Milliseconds;
    config
}

fn console_for(file: &NamedTempFile, topology: Topology) -> Console {
    let channel = channel::open(&config_for(file, topology)).expect("open channel");
    Console::new(channel)
}

/// Drain messages until `count` requests have finished.
async fn collect_terminals(channel: &mut dyn ExecutionChannel, count: usize) -> Vec<WorkerMessage> {
    let mut messages = Vec::new();
    let mut finished = 0;
    while finished < count {
        let message = channel.next_message().await.expect("worker alive");
        if message.is_terminal() {
            finished += 1;
        }
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn test_output_order_is_preserved_in_both_topologies() {
    let file = fixtures::module_file(fixtures::INTERLEAVED);

    for topology in [Topology::Inline, Topology::Isolated] {
        let mut console = console_for(&file, topology);
        let outcome = console.run("").await.unwrap();

        assert_eq!(outcome, RunOutcome::Completed, "{topology}");
        assert_eq!(
            console.surface().segments(),
            &[
                OutputEvent::stdout("one "),
                OutputEvent::stderr("two "),
                OutputEvent::stdout("three"),
            ],
            "{topology}"
        );
    }
}

#[tokio::test]
async fn test_echo_through_isolated_worker() {
    let file = fixtures::module_file(fixtures::ECHO_SPLIT);
    let mut console = console_for(&file, Topology::Isolated);

    assert_eq!(console.channel_state(), ChannelState::Uninitialized);
    console.run("print \"hello\";").await.unwrap();

    assert_eq!(console.surface().text(), "print \"hello\";");
    assert_eq!(console.channel_state(), ChannelState::Ready);
}

#[tokio::test]
async fn test_each_submit_clears_before_appending() {
    let file = fixtures::module_file(fixtures::ECHO_SPLIT);

    for topology in [Topology::Inline, Topology::Isolated] {
        let mut console = console_for(&file, topology);

        console.run("first").await.unwrap();
        console.run("second").await.unwrap();

        assert_eq!(console.surface().text(), "second", "{topology}");
    }
}

#[tokio::test]
async fn test_queued_requests_run_in_submission_order() {
    let file = fixtures::module_file(fixtures::SIZED_COMBINED);
    let mut channel = channel::open(&config_for(&file, Topology::Isolated)).unwrap();

    let a = channel.submit("aaa".to_string()).await.unwrap();
    let b = channel.submit("bbb".to_string()).await.unwrap();
    let c = channel.submit("ccc".to_string()).await.unwrap();
    assert_eq!((a, b, c), (ExecutionId(1), ExecutionId(2), ExecutionId(3)));

    let messages = collect_terminals(channel.as_mut(), 3).await;
    assert_eq!(
        messages,
        vec![
            WorkerMessage::Stdout { id: a, text: "aaa".to_string() },
            WorkerMessage::Done { id: a },
            WorkerMessage::Stdout { id: b, text: "bbb".to_string() },
            WorkerMessage::Done { id: b },
            WorkerMessage::Stdout { id: c, text: "ccc".to_string() },
            WorkerMessage::Done { id: c },
        ]
    );
}

#[tokio::test]
async fn test_failed_load_rejects_every_request() {
    let mut config = HostConfig::default();
    config.module.source = "/nonexistent/loxi.wasm".to_string();

    for topology in [Topology::Inline, Topology::Isolated] {
        config.topology = topology;
        let mut console = Console::new(channel::open(&config).unwrap());

        match console.run("print 1;").await.unwrap() {
            RunOutcome::Failed(message) => assert!(message.contains("Failed to load module")),
            other => panic!("Expected Failed, got {other:?}"),
        }
        match console.run("print 2;").await.unwrap() {
            RunOutcome::Failed(message) => assert!(message.contains("Session failed")),
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert_eq!(console.channel_state(), ChannelState::Failed, "{topology}");
        assert!(console.fatal().is_some());
    }
}

#[tokio::test]
async fn test_import_mismatch_is_fatal() {
    let file = fixtures::module_file(fixtures::UNKNOWN_IMPORT);
    let mut console = console_for(&file, Topology::Isolated);

    match console.run("").await.unwrap() {
        RunOutcome::Failed(message) => assert!(message.contains("open_socket")),
        other => panic!("Expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_trap_is_a_fault_not_a_failure() {
    let file = fixtures::module_file(fixtures::TRAPS);

    for topology in [Topology::Inline, Topology::Isolated] {
        let mut console = console_for(&file, topology);

        let outcome = console.run("").await.unwrap();
        assert!(matches!(outcome, RunOutcome::Faulted(_)), "{topology}: {outcome:?}");
        assert_eq!(console.surface().text(), "before");

        // Same instance serves the next request.
        let outcome = console.run("").await.unwrap();
        assert!(matches!(outcome, RunOutcome::Faulted(_)));
        assert_eq!(console.channel_state(), ChannelState::Ready);
        assert!(console.fatal().is_none());
    }
}

#[tokio::test]
async fn test_stderr_output_is_not_a_fault() {
    let file = fixtures::module_file(fixtures::STDERR_ONLY);
    let mut console = console_for(&file, Topology::Inline);

    let outcome = console.run("print 1").await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        console.surface().segments(),
        &[OutputEvent::stderr("[line 1] Error at end: Expect ';' after value.\n")]
    );
}

#[tokio::test]
async fn test_ui_stays_responsive_during_isolated_execution() {
    let file = fixtures::module_file(fixtures::SLOW);
    let mut console = console_for(&file, Topology::Isolated);

    let started = Instant::now();
    console.submit("").await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(250));

    // The UI task keeps running while the worker spins.
    let ticker = tokio::spawn(async {
        let mut ticks = 0;
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ticks += 1;
        }
        ticks
    });
    assert_eq!(ticker.await.unwrap(), 5);
    assert_eq!(console.channel_state(), ChannelState::Executing);

    let outcome = console.pump(|_| {}).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.surface().text(), "done");
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_inline_execution_blocks_the_caller() {
    let file = fixtures::module_file(fixtures::SLOW);
    let mut channel = channel::open(&config_for(&file, Topology::Inline)).unwrap();

    let started = Instant::now();
    let id = channel.submit(String::new()).await.unwrap();

    // Everything is queued by the time submit returns.
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(
        channel.try_next_message(),
        Some(WorkerMessage::Stdout { id, text: "done".to_string() })
    );
    assert_eq!(channel.try_next_message(), Some(WorkerMessage::Done { id }));
    assert_eq!(channel.try_next_message(), None);
}

#[tokio::test]
async fn test_superseded_request_output_is_ignored() {
    let file = fixtures::module_file(fixtures::SLOW);
    let mut console = console_for(&file, Topology::Isolated);

    let first = console.submit("").await.unwrap();
    let second = console.submit("").await.unwrap();
    assert_ne!(first, second);

    let outcome = console.pump(|message| assert_eq!(message.id(), second)).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.surface().segments(), &[OutputEvent::stdout("done")]);
}

#[tokio::test]
async fn test_open_reports_topology_without_loading() {
    let file = fixtures::module_file(fixtures::ECHO_SPLIT);

    let inline = channel::open(&config_for(&file, Topology::Inline)).unwrap();
    assert_eq!(inline.topology(), Topology::Inline);
    assert_eq!(inline.state(), ChannelState::Uninitialized);

    let isolated = channel::open(&config_for(&file, Topology::Isolated)).unwrap();
    assert_eq!(isolated.topology(), Topology::Isolated);
    assert_eq!(isolated.state(), ChannelState::Uninitialized);
}

#[tokio::test]
async fn test_inline_preload_runs_setup_before_the_first_request() {
    let file = fixtures::module_file(fixtures::SIZED_COMBINED);
    let mut channel = InlineChannel::new(ModuleLoader::from_config(&config_for(&file, Topology::Inline)));

    channel.preload().await.unwrap();
    assert_eq!(channel.state(), ChannelState::Ready);
    assert!(channel.core().instance().unwrap().profile().has_setup);

    let id = channel.submit("abc".to_string()).await.unwrap();
    assert_eq!(
        channel.next_message().await,
        Some(WorkerMessage::Stdout { id, text: "abc".to_string() })
    );
}

#[tokio::test]
async fn test_isolated_shutdown_drains_the_queue() {
    let file = fixtures::module_file(fixtures::ECHO_SPLIT);
    let loader = ModuleLoader::from_config(&config_for(&file, Topology::Isolated));
    let mut channel = IsolatedChannel::spawn(loader).unwrap();

    channel.submit("one".to_string()).await.unwrap();
    channel.submit("two".to_string()).await.unwrap();

    // Shutdown joins the worker, so the replies are complete afterwards.
    let remaining = tokio::task::spawn_blocking(move || channel.shutdown())
        .await
        .unwrap();

    assert_eq!(
        remaining,
        vec![
            WorkerMessage::Stdout { id: ExecutionId(1), text: "one".to_string() },
            WorkerMessage::Done { id: ExecutionId(1) },
            WorkerMessage::Stdout { id: ExecutionId(2), text: "two".to_string() },
            WorkerMessage::Done { id: ExecutionId(2) },
        ]
    );
}
