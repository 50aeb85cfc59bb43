//! Composition laws for `Cmd::batch` and `Cmd::sequence`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use teatui_runtime::{Cmd, Msg};

fn yielding(n: u32) -> Cmd<u32> {
    Cmd::task(move || n)
}

#[test]
fn batch_of_three_returns_exactly_one() {
    let got = Cmd::batch(vec![yielding(1), yielding(2), yielding(3)])
        .execute()
        .and_then(Msg::into_app);
    assert!(matches!(got, Some(1..=3)));
}

#[test]
fn empty_batch_returns_nothing() {
    assert!(Cmd::<u32>::batch(Vec::new()).execute().is_none());
}

#[test]
fn sequence_never_runs_steps_after_a_result() {
    let runs = Arc::new(AtomicUsize::new(0));
    let late = Arc::clone(&runs);
    let cmd = Cmd::sequence(vec![
        Cmd::none(),
        Cmd::msg(10),
        Cmd::task(move || {
            late.fetch_add(1, Ordering::SeqCst);
            11
        }),
    ]);
    assert_eq!(cmd.execute(), Some(Msg::App(10)));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

proptest! {
    #[test]
    fn batch_result_is_a_member_result(values in prop::collection::vec(0u32..1000, 1..8)) {
        let cmds = values.iter().copied().map(yielding).collect();
        let got = Cmd::batch(cmds).execute().and_then(Msg::into_app);
        prop_assert!(got.is_some_and(|v| values.contains(&v)));
    }

    #[test]
    fn sequence_returns_first_non_empty(
        silent in 0usize..5,
        values in prop::collection::vec(0u32..1000, 1..5),
    ) {
        let mut cmds: Vec<Cmd<u32>> = (0..silent).map(|_| Cmd::task_with(|| None)).collect();
        cmds.extend(values.iter().copied().map(yielding));
        let got = Cmd::sequence(cmds).execute().and_then(Msg::into_app);
        prop_assert_eq!(got, Some(values[0]));
    }
}
