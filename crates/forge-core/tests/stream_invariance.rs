//! The final tree and log must not depend on how the stream was split.

use forge_core::{BuildConfig, BuildOutcome, Outcome, SessionState};
use forge_protocol::{Command, CommandKind};
use forge_test_utils::{arb_cuts, char_chunks, chunks, run_fragments, split_at_cuts, COUNTER_APP, MESSY};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn fingerprint(outcome: &BuildOutcome) -> Vec<(u64, CommandKind, Option<Command>, Outcome)> {
    outcome
        .log
        .iter()
        .map(|e| (e.sequence, e.kind, e.command.clone(), e.outcome.clone()))
        .collect()
}

fn assert_same_build(a: &BuildOutcome, b: &BuildOutcome) {
    assert_eq!(a.state, b.state);
    assert_eq!(fingerprint(a), fingerprint(b));
    assert!(a.snapshot().same_tree(&b.snapshot()));
    assert_eq!(a.snapshot().root(), b.snapshot().root());
}

#[test]
fn test_whole_vs_single_bytes() {
    let config = BuildConfig::new();
    for text in [COUNTER_APP, MESSY] {
        let whole = run_fragments(&config, [text]);
        let tiny = run_fragments(&config, chunks(text, 1));
        assert_same_build(&whole, &tiny);
    }
}

#[test]
fn test_fixed_chunk_sizes() {
    let config = BuildConfig::new();
    let whole = run_fragments(&config, [COUNTER_APP]);
    for size in [2, 3, 5, 8, 13, 64, 4096] {
        let split = run_fragments(&config, chunks(COUNTER_APP, size));
        assert_same_build(&whole, &split);
    }
}

#[test]
fn test_multibyte_content_split_per_char() {
    let text = "[CREATE] file:/i18n.json\n```json\n{\"greeting\": \"héllo 漢字 👋\"}\n```\n[THOUGHT] ünïcode ✓\n";
    let config = BuildConfig::new();
    let whole = run_fragments(&config, [text]);
    let split = run_fragments(&config, char_chunks(text));
    assert_same_build(&whole, &split);

    let file = split.vfs.read(&forge_test_utils::path("/i18n.json")).unwrap();
    assert_eq!(file.content(), "{\"greeting\": \"héllo 漢字 👋\"}\n");
}

#[test]
fn test_markers_split_across_fragments() {
    let config = BuildConfig::new();
    let whole = run_fragments(&config, ["[CREATE] /a.txt\nhi\n[DELETE] /a.txt\n"]);
    let split = run_fragments(
        &config,
        ["[CRE", "ATE] /a.", "txt\nhi\n", "[", "D", "ELETE", "]", " /a.txt\n"],
    );
    assert_same_build(&whole, &split);
    assert!(split.vfs.is_empty());
    assert_eq!(split.log.summary().applied, 2);
}

#[test]
fn test_empty_fragments_are_harmless() {
    let config = BuildConfig::new();
    let whole = run_fragments(&config, [MESSY]);
    let padded: Vec<&str> = chunks(MESSY, 4)
        .into_iter()
        .flat_map(|piece| ["", piece, ""])
        .collect();
    assert_same_build(&whole, &run_fragments(&config, padded));
}

fn oversize_transcript() -> String {
    format!(
        "[CREATE] /a\nsmall\n[CREATE] /b\n{}\n[CREATE] /c\nz\n",
        "x".repeat(200)
    )
}

proptest! {
    #[test]
    fn prop_oversize_failure_any_partition(cuts in arb_cuts(oversize_transcript().len())) {
        let text = oversize_transcript();
        let config = BuildConfig::new().with_max_command_bytes(Some(64));
        let whole = run_fragments(&config, [text.as_str()]);
        let split = run_fragments(&config, split_at_cuts(&text, cuts));
        prop_assert!(matches!(whole.state, SessionState::Failed(_)));
        prop_assert_eq!(&whole.state, &split.state);
        prop_assert_eq!(fingerprint(&whole), fingerprint(&split));
        prop_assert!(whole.snapshot().same_tree(&split.snapshot()));
    }

    #[test]
    fn prop_counter_app_any_partition(cuts in arb_cuts(COUNTER_APP.len())) {
        let config = BuildConfig::new();
        let whole = run_fragments(&config, [COUNTER_APP]);
        let split = run_fragments(&config, split_at_cuts(COUNTER_APP, cuts));
        prop_assert_eq!(&whole.state, &split.state);
        prop_assert_eq!(fingerprint(&whole), fingerprint(&split));
        prop_assert!(whole.snapshot().same_tree(&split.snapshot()));
    }

    #[test]
    fn prop_messy_any_partition(cuts in arb_cuts(MESSY.len())) {
        let config = BuildConfig::new();
        let whole = run_fragments(&config, [MESSY]);
        let split = run_fragments(&config, split_at_cuts(MESSY, cuts));
        prop_assert_eq!(fingerprint(&whole), fingerprint(&split));
        prop_assert!(whole.snapshot().same_tree(&split.snapshot()));
    }
}
