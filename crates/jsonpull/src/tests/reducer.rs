use std::convert::Infallible;

use futures::executor::block_on;
use futures::StreamExt;

use crate::{SegmentDelta, SegmentKind, SegmentSplitter, SyncedReducer};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Append(String),
    Clear,
}

fn apply(state: &String, action: &Action) -> Result<String, Infallible> {
    Ok(match action {
        Action::Append(s) => format!("{state}{s}"),
        Action::Clear => String::new(),
    })
}

#[test]
fn folds_and_mirrors_in_dispatch_order() {
    let (mut reducer, actions) = SyncedReducer::new(String::new(), apply);
    reducer.dispatch(Action::Append("a".into())).unwrap();
    reducer.dispatch(Action::Append("b".into())).unwrap();
    reducer.dispatch(Action::Clear).unwrap();
    reducer.dispatch(Action::Append("c".into())).unwrap();
    assert_eq!(reducer.state(), "c");

    reducer.done();
    assert!(reducer.is_done());
    let mirrored = block_on(actions.collect::<Vec<_>>());
    assert_eq!(
        mirrored,
        vec![
            Action::Append("a".into()),
            Action::Append("b".into()),
            Action::Clear,
            Action::Append("c".into()),
        ]
    );
}

#[test]
fn state_is_observable_between_dispatches() {
    let (mut reducer, _actions) = SyncedReducer::new(String::new(), apply);
    reducer.dispatch(Action::Append("x".into())).unwrap();
    assert_eq!(reducer.state(), "x");
    reducer.dispatch(Action::Append("y".into())).unwrap();
    assert_eq!(reducer.state(), "xy");
}

#[test]
fn reducer_failure_leaves_state_and_stream_untouched() {
    let (mut reducer, mut actions) = SyncedReducer::new(0u32, |count: &u32, n: &u32| {
        if *n == 13 {
            Err("unlucky")
        } else {
            Ok(count + n)
        }
    });

    reducer.dispatch(1).unwrap();
    assert_eq!(reducer.dispatch(13).unwrap_err(), "unlucky");
    assert_eq!(*reducer.state(), 1);
    reducer.dispatch(2).unwrap();
    assert_eq!(*reducer.state(), 3);

    reducer.done();
    let mirrored = block_on(async {
        let mut out = Vec::new();
        while let Some(a) = actions.next().await {
            out.push(a);
        }
        out
    });
    // The failed action was never pushed.
    assert_eq!(mirrored, vec![1, 2]);
}

#[test]
fn splitter_deltas_feed_the_reducer() {
    // The splitter's collaborator: fold deltas into a transcript while
    // mirroring them downstream.
    let (mut reducer, actions) = SyncedReducer::new(
        (String::new(), String::new()),
        |state: &(String, String), delta: &SegmentDelta| {
            let (prose, reasoning) = state;
            Ok::<_, Infallible>(match delta.kind {
                SegmentKind::Prose => (format!("{prose}{}", delta.text), reasoning.clone()),
                SegmentKind::Reasoning => (prose.clone(), format!("{reasoning}{}", delta.text)),
            })
        },
    );

    let mut splitter = SegmentSplitter::new();
    for fragment in ["Initial text", "<pl", "an>This is a thought</plan>More text"] {
        for delta in splitter.append(fragment) {
            reducer.dispatch(delta).unwrap();
        }
    }
    reducer.done();

    let (prose, reasoning) = reducer.state().clone();
    assert_eq!(prose, "Initial textMore text");
    assert_eq!(reasoning, "This is a thought");

    let mirrored = block_on(actions.collect::<Vec<_>>());
    assert_eq!(mirrored.len(), 3);
    let generations: Vec<u64> = mirrored.iter().map(|d| d.generation).collect();
    assert_eq!(generations, vec![0, 1, 2]);
}
