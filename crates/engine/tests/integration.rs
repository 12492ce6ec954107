use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use caselink_engine::case::{BulkAnnotator, CaseSearch};
use caselink_engine::config::RunConfig;
use caselink_engine::matcher::build_query;
use caselink_engine::model::{
    Field, FieldKind, FieldValue, ItemRef, Record, RecordSource,
};
use caselink_engine::progress::{CancelToken, NullSink};
use caselink_engine::{run, EngineError};

const CONFIG: &str = r#"
name = "integration"
tag_prefix = "GDriveLabels"

[[files]]
path = "export.xml"
format = "xml"
"#;

struct FixedSearch {
    by_query: HashMap<String, Vec<ItemRef>>,
}

impl FixedSearch {
    fn with_item(name: &str, guid: &str) -> Self {
        Self {
            by_query: HashMap::from([(build_query(name), vec![ItemRef(guid.into())])]),
        }
    }

    fn empty() -> Self {
        Self {
            by_query: HashMap::new(),
        }
    }

    fn insert(&mut self, name: &str, guids: &[&str]) {
        self.by_query.insert(
            build_query(name),
            guids.iter().map(|g| ItemRef(g.to_string())).collect(),
        );
    }
}

impl CaseSearch for FixedSearch {
    fn search(&self, query: &str) -> Result<Vec<ItemRef>, String> {
        Ok(self.by_query.get(query).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct RecordingAnnotator {
    tags: Vec<(String, BTreeSet<String>, bool)>,
    metadata: Vec<(String, String, FieldValue)>,
}

impl BulkAnnotator for RecordingAnnotator {
    fn add_tag(
        &mut self,
        tag: &str,
        items: &[ItemRef],
        propagate_to_descendants: bool,
    ) -> Result<(), String> {
        self.tags.push((
            tag.into(),
            items.iter().map(|i| i.0.clone()).collect(),
            propagate_to_descendants,
        ));
        Ok(())
    }

    fn set_custom_metadata(
        &mut self,
        item: &ItemRef,
        field_name: &str,
        value: &FieldValue,
        _propagate_to_descendants: bool,
    ) -> Result<(), String> {
        self.metadata
            .push((item.0.clone(), field_name.into(), value.clone()));
        Ok(())
    }
}

fn record(identifier: &str, labels: &[&str], fields: Vec<Field>) -> Record {
    Record {
        identifier: identifier.into(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        fields,
    }
}

fn source(path: &str, records: Vec<Result<Record, EngineError>>) -> RecordSource {
    RecordSource {
        path: PathBuf::from(path),
        records: Box::new(records.into_iter()),
    }
}

#[test]
fn matched_record_is_tagged_and_annotated() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let search = FixedSearch::with_item("a.txt", "g1");
    let mut annotator = RecordingAnnotator::default();

    let fields = vec![Field {
        name: "DateModified".into(),
        kind: FieldKind::DateTime,
        raw_value: "2014-03-04T12:00:00.000+0000".into(),
    }];
    let sources = vec![source(
        "export.xml",
        vec![Ok(record("a.txt", &["Inbox"], fields))],
    )];

    let result = run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(result.summary.matches, 1);
    assert_eq!(result.summary.warnings, 0);
    assert_eq!(result.summary.errors, 0);
    assert_eq!(result.summary.records_parsed, 1);
    assert_eq!(
        result.summary.distinct_field_names,
        vec!["DateModified".to_string()]
    );

    assert_eq!(annotator.tags.len(), 1);
    assert_eq!(annotator.tags[0].0, "GDriveLabels|Inbox");
    assert!(annotator.tags[0].1.contains("g1"));

    assert_eq!(annotator.metadata.len(), 1);
    assert_eq!(annotator.metadata[0].0, "g1");
    assert_eq!(annotator.metadata[0].1, "DateModified");
    assert!(matches!(annotator.metadata[0].2, FieldValue::DateTime(_)));

    assert_eq!(result.query, "guid:(g1)");
}

#[test]
fn unmatched_record_warns_and_writes_nothing() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let search = FixedSearch::empty();
    let mut annotator = RecordingAnnotator::default();

    let sources = vec![source(
        "messages.csv",
        vec![Ok(record("<gone@example.com>", &["Inbox"], Vec::new()))],
    )];

    let result = run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(result.summary.matches, 0);
    assert_eq!(result.summary.warnings, 1);
    assert!(annotator.tags.is_empty());
    assert!(annotator.metadata.is_empty());
    assert_eq!(result.query, "");
}

#[test]
fn shared_label_across_files_is_one_tag_call() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let mut search = FixedSearch::empty();
    search.insert("a.txt", &["g1"]);
    search.insert("b.txt", &["g2"]);
    let mut annotator = RecordingAnnotator::default();

    let sources = vec![
        source("one.xml", vec![Ok(record("a.txt", &["Important"], Vec::new()))]),
        source("two.xml", vec![Ok(record("b.txt", &["Important"], Vec::new()))]),
    ];

    run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(annotator.tags.len(), 1);
    let (tag, items, _) = &annotator.tags[0];
    assert_eq!(tag, "GDriveLabels|Important");
    assert_eq!(
        items.iter().cloned().collect::<Vec<_>>(),
        vec!["g1".to_string(), "g2".to_string()]
    );
}

#[test]
fn grouping_is_independent_of_file_order() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let mut search = FixedSearch::empty();
    search.insert("a.txt", &["g1"]);
    search.insert("b.txt", &["g2"]);

    let build = |reversed: bool| {
        let mut sources = vec![
            source("one.xml", vec![Ok(record("a.txt", &["X", "Y"], Vec::new()))]),
            source("two.xml", vec![Ok(record("b.txt", &["Y"], Vec::new()))]),
        ];
        if reversed {
            sources.reverse();
        }
        sources
    };

    let mut forward = RecordingAnnotator::default();
    run(
        &config,
        build(false),
        None,
        &search,
        &mut forward,
        &NullSink,
        &CancelToken::new(),
    );

    let mut backward = RecordingAnnotator::default();
    run(
        &config,
        build(true),
        None,
        &search,
        &mut backward,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(forward.tags, backward.tags);
}

#[test]
fn failed_file_is_reported_and_run_continues() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let search = FixedSearch::with_item("a.txt", "g1");
    let mut annotator = RecordingAnnotator::default();

    let sources = vec![
        source(
            "broken.xml",
            vec![Err(EngineError::FileParse {
                path: "broken.xml".into(),
                message: "unexpected end of document".into(),
            })],
        ),
        source("good.xml", vec![Ok(record("a.txt", &["Inbox"], Vec::new()))]),
    ];

    let result = run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(result.summary.errors, 1);
    assert_eq!(result.summary.matches, 1);
    assert_eq!(result.files.len(), 2);
    assert!(result.files[0].failed);
    assert!(!result.files[1].failed);
    assert_eq!(annotator.tags.len(), 1);
}

#[test]
fn record_level_error_skips_record_only() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let search = FixedSearch::with_item("a.txt", "g1");
    let mut annotator = RecordingAnnotator::default();

    let sources = vec![source(
        "messages.csv",
        vec![
            Err(EngineError::RecordParse {
                path: "messages.csv".into(),
                message: "line 3: wrong number of fields".into(),
            }),
            Ok(record("a.txt", &["Inbox"], Vec::new())),
        ],
    )];

    let result = run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(result.summary.errors, 1);
    assert_eq!(result.summary.matches, 1);
    assert!(!result.files[0].failed);
    assert_eq!(result.files[0].records, 1);
}

#[test]
fn search_failure_drops_record_and_counts_error() {
    struct FailingSearch;
    impl CaseSearch for FailingSearch {
        fn search(&self, _query: &str) -> Result<Vec<ItemRef>, String> {
            Err("backend unavailable".into())
        }
    }

    let config = RunConfig::from_toml(CONFIG).unwrap();
    let mut annotator = RecordingAnnotator::default();
    let sources = vec![source(
        "export.xml",
        vec![Ok(record("a.txt", &["Inbox"], Vec::new()))],
    )];

    let result = run(
        &config,
        sources,
        None,
        &FailingSearch,
        &mut annotator,
        &NullSink,
        &CancelToken::new(),
    );

    assert_eq!(result.summary.errors, 1);
    assert_eq!(result.summary.matches, 0);
    assert!(annotator.tags.is_empty());
}

#[test]
fn cancelled_run_issues_no_writes() {
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let search = FixedSearch::with_item("a.txt", "g1");
    let mut annotator = RecordingAnnotator::default();
    let cancel = CancelToken::new();
    cancel.cancel();

    let sources = vec![source(
        "export.xml",
        vec![Ok(record("a.txt", &["Inbox"], Vec::new()))],
    )];

    let result = run(
        &config,
        sources,
        None,
        &search,
        &mut annotator,
        &NullSink,
        &cancel,
    );

    assert!(annotator.tags.is_empty());
    assert!(annotator.metadata.is_empty());
    assert_eq!(result.summary.matches, 0);
    assert!(result.files.is_empty());
}
