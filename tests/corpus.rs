//! Loader properties checked through the public library API.

use chrono::{TimeZone, Utc};
use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tempfile::TempDir;

use convo_harness::analytics::corpus_stats;
use convo_harness::config::LoaderConfig;
use convo_harness::loader::{CorpusLoader, LoadOptions, LoadOutcome};
use convo_harness::models::Role;
use convo_harness::normalize::DualShapePolicy;
use convo_harness::progress::{LoadProgressEvent, LoadProgressReporter, NoProgress};
use convo_harness::timestamp::BatchClock;

fn loader() -> CorpusLoader {
    loader_with(LoaderConfig::default())
}

fn loader_with(config: LoaderConfig) -> CorpusLoader {
    let clock = BatchClock::fixed(Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap());
    CorpusLoader::with_options(LoadOptions::from_config(&config, clock))
}

fn flat(id: &str, ts: i64) -> String {
    format!(
        r#"{{"id":"{id}","platform":"gemini","messages":[
            {{"role":"user","content":"question {id}?","timestamp":{ts}}},
            {{"role":"model","content":"answer {id}","timestamp":{}}}
        ]}}"#,
        ts + 1000
    )
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        for (name, data) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

#[test]
fn valid_and_invalid_files_are_isolated() {
    let tmp = TempDir::new().unwrap();
    for i in 0..5 {
        let body = flat(&format!("c{}", i), 1_700_000_000_000 + i);
        fs::write(tmp.path().join(format!("ok{}.json", i)), body).unwrap();
    }
    fs::write(tmp.path().join("bad1.json"), "{").unwrap();
    fs::write(tmp.path().join("bad2.json"), "[1, 2").unwrap();
    fs::write(tmp.path().join("bad3.txt"), [0xc3u8, 0x28]).unwrap();

    let report = loader().load(&[tmp.path().to_path_buf()], &NoProgress).unwrap();
    assert_eq!(report.conversations.len(), 5);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.sources_found, 8);
    for conv in &report.conversations {
        assert_eq!(conv.platform, "Gemini");
        assert_eq!(conv.messages[1].role, Role::Assistant);
        assert!(conv.start_date <= conv.end_date);
    }
}

#[test]
fn archive_with_one_corrupt_entry() {
    let tmp = TempDir::new().unwrap();
    let bundle = tmp.path().join("export.zip");
    fs::write(
        &bundle,
        build_zip(&[
            ("a.json", flat("a", 1_000).as_bytes()),
            ("nested/b.json", flat("b", 2_000).as_bytes()),
            ("broken.json", b"{\"messages\": ["),
        ]),
    )
    .unwrap();

    let report = loader().load(&[bundle.clone()], &NoProgress).unwrap();
    let ids: Vec<&str> = report.conversations.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, format!("{}!broken.json", bundle.display()));
}

#[test]
fn archive_bytes_upload() {
    let bytes = build_zip(&[
        ("one.md", b"Human: hi\nAssistant: hello".as_slice()),
        ("two.txt", b"Assistant: unprompted".as_slice()),
    ]);
    let report = loader().load_bytes("upload.zip", &bytes);
    assert_eq!(report.outcome(), LoadOutcome::Loaded);
    assert_eq!(report.conversations.len(), 2);
    let sources: Vec<&str> = report
        .conversations
        .iter()
        .map(|c| c.metadata["source"].as_str().unwrap())
        .collect();
    assert!(sources.contains(&"upload.zip!one.md"));
    assert!(sources.contains(&"upload.zip!two.txt"));
}

#[test]
fn empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let report = loader().load(&[tmp.path().to_path_buf()], &NoProgress).unwrap();
    assert_eq!(report.outcome(), LoadOutcome::NoSources);
    let stats = corpus_stats(&report.conversations);
    assert_eq!(stats.total_conversations, 0);
    assert_eq!(stats.average_messages_per_conversation, 0);
}

#[test]
fn reloading_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.json"), flat("a", 5_000)).unwrap();
    fs::write(tmp.path().join("chat.md"), "Human: one\nAssistant: two").unwrap();
    fs::write(
        tmp.path().join("anon.json"),
        r#"{"messages":[{"role":"user","content":"no id here","timestamp":9000}]}"#,
    )
    .unwrap();

    let l = loader();
    let roots = vec![tmp.path().to_path_buf()];
    let first = l.load(&roots, &NoProgress).unwrap();
    let second = l.load(&roots, &NoProgress).unwrap();

    let comparable = |r: &convo_harness::loader::LoadReport| -> Vec<(String, usize)> {
        r.conversations
            .iter()
            .filter(|c| !c.id.starts_with("conv_"))
            .map(|c| (c.id.clone(), c.messages.len()))
            .collect()
    };
    assert_eq!(comparable(&first), comparable(&second));
    assert_eq!(first.conversations.len(), 3);
    assert_eq!(
        first.conversations.iter().filter(|c| c.id.starts_with("conv_")).count(),
        1
    );
}

#[test]
fn tree_export_with_shuffled_timestamps_keeps_path_order() {
    let export = r#"{
        "id": "t",
        "current_node": "n3",
        "mapping": {
            "n0": { "message": null, "parent": null, "children": ["n1"] },
            "n1": { "message": { "author": {"role": "user"}, "create_time": 300, "content": {"parts": ["first"]} },
                    "parent": "n0", "children": ["n2"] },
            "n2": { "message": { "author": {"role": "assistant"}, "create_time": 100, "content": {"parts": ["second"]} },
                    "parent": "n1", "children": ["n3"] },
            "n3": { "message": { "author": {"role": "user"}, "create_time": 200, "content": {"parts": ["third"]} },
                    "parent": "n2", "children": [] }
        }
    }"#;
    let report = loader().load_bytes("conversations.json", export.as_bytes());
    let conv = &report.conversations[0];
    let contents: Vec<&str> = conv.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(conv.start_date, Utc.timestamp_opt(100, 0).unwrap());
    assert_eq!(conv.end_date, Utc.timestamp_opt(300, 0).unwrap());
}

#[test]
fn dual_shape_policy_from_config() {
    let export = r#"{
        "id": "d",
        "mapping": {
            "r": { "message": { "author": {"role": "user"}, "content": {"parts": ["from tree"]} },
                   "parent": null, "children": [] }
        },
        "messages": [ { "role": "user", "content": "from list" } ]
    }"#;

    let report = loader().load_bytes("d.json", export.as_bytes());
    assert_eq!(report.conversations.len(), 1);
    assert_eq!(report.conversations[0].messages[0].content, "from tree");

    let both = loader_with(LoaderConfig {
        dual_shape: DualShapePolicy::Both,
        ..LoaderConfig::default()
    });
    let report = both.load_bytes("d.json", export.as_bytes());
    let mut ids: Vec<&str> = report.conversations.iter().map(|c| c.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["d", "d_messages"]);
}

struct Recorder(std::sync::Mutex<Vec<LoadProgressEvent>>);

impl LoadProgressReporter for Recorder {
    fn report(&self, event: LoadProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn parallel_loader_reports_every_file() {
    let tmp = TempDir::new().unwrap();
    for i in 0..20 {
        let body = flat(&format!("p{:02}", i), 1_000 * (i + 1));
        fs::write(tmp.path().join(format!("f{:02}.json", i)), body).unwrap();
    }
    fs::write(tmp.path().join("broken.json"), "nope").unwrap();

    let l = loader_with(LoaderConfig {
        concurrency: 3,
        ..LoaderConfig::default()
    });
    let recorder = Recorder(std::sync::Mutex::new(Vec::new()));
    let roots: Vec<PathBuf> = vec![tmp.path().to_path_buf()];
    let report = l.load_concurrent(&roots, &recorder).await.unwrap();

    assert_eq!(report.conversations.len(), 20);
    assert_eq!(report.failures.len(), 1);
    let ids: Vec<&str> = report.conversations.iter().map(|c| c.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "timestamps increase with the id");

    let events = recorder.0.lock().unwrap();
    let loading: Vec<(u64, u64)> = events
        .iter()
        .filter_map(|e| match e {
            LoadProgressEvent::Loading { n, total } => Some((*n, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(loading.len(), 21);
    assert_eq!(loading.last(), Some(&(21, 21)));
}
