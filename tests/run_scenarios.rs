//! End-to-end runs through the `Harvester` facade

mod common;

use common::{Outcome, ScriptedFetcher, Workspace, read_rows, sessions};
use profile_harvester::output::OUTPUT_COLUMNS;
use profile_harvester::{Harvester, Session, run_until};
use std::time::{Duration, Instant};
use std::sync::Arc;

#[tokio::test]
async fn items_are_routed_round_robin_over_active_sessions() {
    let ws = Workspace::new(&["a", "b", "c"], sessions(2));
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher.clone()).await.unwrap();

    assert_eq!(fetcher.credentials(), ["tok0", "tok1", "tok0"]);
    assert_eq!(fetcher.identities(), ["a", "b", "c"]);
    assert_eq!(report.start_index, 0);
    assert_eq!(report.end_index, 3);
    assert_eq!(ws.read_config().last_processed_index, 3);
}

#[tokio::test]
async fn timed_out_item_disables_its_session_and_checkpoint_advances() {
    let ws = Workspace::new(&["a", "b", "c"], sessions(2));
    ws.update_config(|c| c.count = 2);
    let fetcher = Arc::new(ScriptedFetcher::new(&[("b", Outcome::Hang)]));

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher).await.unwrap();

    assert_eq!(report.end_index, 2);
    assert_eq!(report.timed_out_sessions, ["s1"]);

    let saved = ws.read_config();
    assert_eq!(saved.last_processed_index, 2);
    assert_eq!(saved.sessions[1].session_id, "#tok1");
    assert_eq!(saved.sessions[1].tag, "s1 - Disabled");
    assert!(saved.sessions[0].is_active());
    assert_eq!(harvester.config(), &saved);
}

#[tokio::test]
async fn all_sessions_disabled_is_a_no_op() {
    let handles = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let mut table = sessions(2);
    for session in &mut table {
        session.disable();
    }
    let ws = Workspace::new(&handles, table);
    ws.update_config(|c| c.last_processed_index = 5);
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher.clone()).await.unwrap();

    assert_eq!(report.end_index, 5);
    assert!(fetcher.calls().is_empty());
    assert!(!ws.output_path().exists());
    assert_eq!(ws.read_config().last_processed_index, 5);
}

#[tokio::test]
async fn restart_resumes_from_the_checkpoint() {
    let handles = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let ws = Workspace::new(&handles, sessions(3));
    ws.update_config(|c| {
        c.last_processed_index = 5;
        c.count = 3;
    });
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher.clone()).await.unwrap();

    assert_eq!(fetcher.identities(), ["f", "g", "h"]);
    // Index i goes to rotation[i mod 3]
    assert_eq!(fetcher.credentials(), ["tok2", "tok0", "tok1"]);
    assert_eq!(report.end_index, 8);
    assert_eq!(ws.read_config().last_processed_index, 8);
}

#[tokio::test]
async fn consecutive_runs_append_under_a_single_header() {
    let ws = Workspace::new(&["a", "b", "c", "d"], sessions(1));
    ws.update_config(|c| c.count = 2);
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    harvester.run(fetcher.clone()).await.unwrap();
    harvester.run(fetcher.clone()).await.unwrap();

    let rows = read_rows(&ws.output_path());
    assert_eq!(rows[0], OUTPUT_COLUMNS.map(String::from).to_vec());
    let usernames: Vec<_> = rows.iter().skip(1).map(|r| r[1].as_str()).collect();
    assert_eq!(usernames, ["a", "b", "c", "d"]);
    assert_eq!(rows[1][2], "https://www.instagram.com/a/");
    assert_eq!(rows[1][12], "shop");
    assert_eq!(rows[1][13], "Tehran");
    assert_eq!(ws.read_config().last_processed_index, 4);
}

#[tokio::test]
async fn failures_are_reported_and_can_be_marked() {
    let ws = Workspace::new(&["a", "b", "c", "d"], sessions(2));
    let fetcher = Arc::new(ScriptedFetcher::new(&[
        ("b", Outcome::Missing),
        ("c", Outcome::Fail),
    ]));

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher).await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.failed_indices, [2]);
    assert_eq!(report.processed(), 4);
    assert_eq!(ws.output_rows().len(), 2);

    assert_eq!(harvester.mark_failures(&report.failed_indices).unwrap(), 1);
    let rows = read_rows(&ws.input_path());
    assert_eq!(rows[3], ["https://www.instagram.com/c/", "shop", "Tehran", "*"]);
    assert_eq!(rows[2].len(), 3);
}

#[tokio::test]
async fn run_validates_the_work_file_first() {
    let ws = Workspace::new(&[], sessions(1));
    ws.write_input(
        "link,category,city\n\
         https://www.instagram.com/a/,shop,Tehran\n\
         ,shop,Shiraz\n\
         https://www.instagram.com/b/,shop,Tabriz\n",
    );
    ws.update_config(|c| c.count = 10);
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher.clone()).await.unwrap();

    assert_eq!(fetcher.identities(), ["a", "b"]);
    assert_eq!(report.end_index, 2);
    assert_eq!(
        ws.read_input(),
        "link,category,city\n\
         https://www.instagram.com/a/,shop,Tehran\n\
         https://www.instagram.com/b/,shop,Tabriz\n"
    );
}

#[tokio::test]
async fn unknown_config_keys_survive_a_run() {
    let ws = Workspace::new(&["a"], vec![Session::new("tok", "main")]);
    ws.update_config(|c| {
        c.extra
            .insert("theme".to_string(), serde_json::json!("dark"));
    });

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    harvester
        .run(Arc::new(ScriptedFetcher::default()))
        .await
        .unwrap();

    let saved = ws.read_config();
    assert_eq!(saved.extra.get("theme"), Some(&serde_json::json!("dark")));
    assert_eq!(saved.last_processed_index, 1);
}

#[tokio::test]
async fn stop_request_during_the_delay_ends_the_run_at_the_resume_point() {
    let ws = Workspace::new(&["a", "b", "c"], sessions(2));
    ws.update_config(|c| c.delay = Duration::from_secs(60));
    let fetcher = Arc::new(ScriptedFetcher::default());

    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let started = Instant::now();
    let report = run_until(
        &mut harvester,
        fetcher.clone(),
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.end_index, 1);
    assert_eq!(fetcher.identities(), ["a"]);
    assert_eq!(ws.read_config().last_processed_index, 1);
    assert_eq!(ws.output_rows().len(), 1);

    // The next run resumes where the stopped one ended
    ws.update_config(|c| c.delay = Duration::ZERO);
    drop(harvester);
    let mut harvester = Harvester::open(ws.config_path()).unwrap();
    let report = harvester.run(fetcher.clone()).await.unwrap();
    assert_eq!(report.start_index, 1);
    assert_eq!(report.end_index, 3);
}
