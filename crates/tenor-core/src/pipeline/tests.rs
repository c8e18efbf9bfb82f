//! Orchestrator tests against in-memory fakes.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use chrono::Utc;

use super::*;
use crate::{
  alias::KnowledgeIndex,
  enrichment::{
    EnrichmentContent, EnrichmentRecord, EnrichmentStatus, Sentiment,
    StatusRecord,
  },
  knowledge::{KnowledgeBase, KnowledgeEntry},
  store::ResultStore,
  subject::IdentifiedSubject,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
struct Unavailable;

#[derive(Default)]
struct MemoryStore {
  rows:           Mutex<HashMap<String, EnrichmentRecord>>,
  descriptions:   HashMap<String, String>,
  fail_completed: bool,
}

impl MemoryStore {
  fn row(&self, item_id: &str) -> Option<EnrichmentRecord> {
    self.rows.lock().unwrap().get(item_id).cloned()
  }
}

impl ResultStore for MemoryStore {
  type Error = Unavailable;

  async fn upsert_completed(
    &self,
    item_id: &str,
    content: &EnrichmentContent,
  ) -> Result<EnrichmentRecord, Unavailable> {
    if self.fail_completed {
      return Err(Unavailable);
    }
    let record = EnrichmentRecord {
      item_id:          item_id.to_owned(),
      status:           EnrichmentStatus::Completed,
      last_enriched_at: Utc::now(),
      content:          Some(content.clone()),
    };
    self
      .rows
      .lock()
      .unwrap()
      .insert(item_id.to_owned(), record.clone());
    Ok(record)
  }

  async fn upsert_status(
    &self,
    item_id: &str,
    status: EnrichmentStatus,
  ) -> Result<StatusRecord, Unavailable> {
    let now = Utc::now();
    let mut rows = self.rows.lock().unwrap();
    let row = rows
      .entry(item_id.to_owned())
      .or_insert_with(|| EnrichmentRecord {
        item_id: item_id.to_owned(),
        status,
        last_enriched_at: now,
        content: None,
      });
    row.status = status;
    row.last_enriched_at = now;
    Ok(StatusRecord {
      item_id: item_id.to_owned(),
      status,
      last_enriched_at: now,
    })
  }

  async fn get_record(
    &self,
    item_id: &str,
  ) -> Result<Option<EnrichmentRecord>, Unavailable> {
    Ok(self.row(item_id))
  }

  async fn item_description(
    &self,
    item_id: &str,
  ) -> Result<Option<String>, Unavailable> {
    Ok(self.descriptions.get(item_id).cloned())
  }

  async fn unprocessed_items(
    &self,
    _limit: usize,
  ) -> Result<Vec<String>, Unavailable> {
    Ok(Vec::new())
  }

  async fn items_with_status(
    &self,
    status: EnrichmentStatus,
  ) -> Result<Vec<String>, Unavailable> {
    let rows = self.rows.lock().unwrap();
    Ok(
      rows
        .values()
        .filter(|r| r.status == status)
        .map(|r| r.item_id.clone())
        .collect(),
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fetch {
  Ok,
  Removed,
  Broken,
}

#[derive(Clone)]
struct FakeDownloader {
  fetch:        Fetch,
  fail_discard: bool,
  discarded:    Arc<Mutex<Vec<Artifacts>>>,
}

impl Downloader for FakeDownloader {
  async fn download(
    &self,
    item_id: &str,
  ) -> Result<Artifacts, CollaboratorError> {
    match self.fetch {
      Fetch::Ok => Ok(Artifacts {
        video_path: PathBuf::from(format!("videos/{item_id}.mp4")),
        audio_path: PathBuf::from(format!("audio/{item_id}.wav")),
      }),
      Fetch::Removed => Err(CollaboratorError::SourceRemoved(
        "video not available".into(),
      )),
      Fetch::Broken => Err(CollaboratorError::failed("connection reset")),
    }
  }

  async fn discard(
    &self,
    artifacts: &Artifacts,
  ) -> Result<(), CollaboratorError> {
    self.discarded.lock().unwrap().push(artifacts.clone());
    if self.fail_discard {
      return Err(CollaboratorError::failed("permission denied"));
    }
    Ok(())
  }
}

#[derive(Clone)]
struct FakeTranscriber {
  language: String,
  fail:     bool,
}

impl Transcriber for FakeTranscriber {
  async fn transcribe(
    &self,
    _audio: &Path,
  ) -> Result<Transcript, CollaboratorError> {
    if self.fail {
      return Err(CollaboratorError::failed("model file missing"));
    }
    Ok(Transcript {
      text:     "they said things".into(),
      language: self.language.clone(),
    })
  }
}

#[derive(Clone)]
struct FakeSentiment {
  result:    Option<Sentiment>,
  languages: Arc<Mutex<Vec<String>>>,
}

impl SentimentClassifier for FakeSentiment {
  async fn classify(
    &self,
    _text: &str,
    language: &str,
  ) -> Result<Sentiment, CollaboratorError> {
    self.languages.lock().unwrap().push(language.to_owned());
    self
      .result
      .ok_or_else(|| CollaboratorError::failed("classifier offline"))
  }
}

#[derive(Clone)]
struct FakeAnalyzer {
  reply:    Option<ContentAnalysis>,
  /// `(description, knowledge)` of every request.
  requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl ContentAnalyzer for FakeAnalyzer {
  fn model_name(&self) -> &str { "fake-model" }

  async fn analyze(
    &self,
    request: AnalysisRequest<'_>,
  ) -> Result<ContentAnalysis, CollaboratorError> {
    self
      .requests
      .lock()
      .unwrap()
      .push((request.description.to_owned(), request.knowledge.to_owned()));
    self
      .reply
      .clone()
      .ok_or_else(|| CollaboratorError::failed("quota exceeded"))
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

type TestPipeline = Pipeline<
  FakeDownloader,
  FakeTranscriber,
  FakeSentiment,
  FakeAnalyzer,
  MemoryStore,
>;

struct Harness {
  downloader:  FakeDownloader,
  transcriber: FakeTranscriber,
  sentiment:   FakeSentiment,
  analyzer:    FakeAnalyzer,
  store:       Arc<MemoryStore>,
}

fn analysis(subjects: &[(&str, f64)], overall: f64) -> ContentAnalysis {
  ContentAnalysis {
    summary:             "a summary".into(),
    identified_subjects: subjects
      .iter()
      .map(|(s, stance)| IdentifiedSubject::new(*s, *stance))
      .collect(),
    overall_alignment:   overall,
  }
}

impl Harness {
  fn new() -> Self {
    Self {
      downloader:  FakeDownloader {
        fetch:        Fetch::Ok,
        fail_discard: false,
        discarded:    Arc::default(),
      },
      transcriber: FakeTranscriber { language: "en".into(), fail: false },
      sentiment:   FakeSentiment {
        result:    Some(Sentiment {
          positive: 0.6,
          negative: 0.1,
          neutral:  0.3,
        }),
        languages: Arc::default(),
      },
      analyzer:    FakeAnalyzer {
        reply:    Some(analysis(&[("Putin", -0.8)], 0.5)),
        requests: Arc::default(),
      },
      store:       Arc::new(MemoryStore::default()),
    }
  }

  fn pipeline(&self) -> TestPipeline {
    let kb = KnowledgeBase::new([
      (
        "vladimir putin".to_string(),
        KnowledgeEntry::new("Political Leader", -1.0).with_alias("Putin"),
      ),
      (
        "european union".to_string(),
        KnowledgeEntry::new("Alliance", 1.0).with_alias("EU"),
      ),
    ])
    .unwrap();
    Pipeline::new(
      Arc::new(KnowledgeIndex::new(kb).unwrap()),
      Collaborators {
        downloader:  self.downloader.clone(),
        transcriber: self.transcriber.clone(),
        sentiment:   self.sentiment.clone(),
        analyzer:    self.analyzer.clone(),
      },
      Arc::clone(&self.store),
    )
  }

  fn discarded(&self) -> usize {
    self.downloader.discarded.lock().unwrap().len()
  }
}

/// Whether `report` failed at `stage` because a collaborator answered with
/// something unusable.
fn malformed_at(report: &ItemReport, stage: Stage) -> bool {
  match &report.error {
    Some(PipelineError::TransientInfra { stage: s, source }) => {
      *s == stage
        && matches!(
          source.downcast_ref::<CollaboratorError>(),
          Some(CollaboratorError::Malformed(_))
        )
    }
    _ => false,
  }
}

fn content(record: &EnrichmentRecord) -> &EnrichmentContent {
  record.content.as_ref().expect("completed row has content")
}

// ─── Completed ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_persists_and_cleans_up() {
  let h = Harness::new();
  let report = h.pipeline().process("7001").await;

  assert!(report.is_completed());
  assert!(report.error.is_none());

  let row = h.store.row("7001").unwrap();
  assert_eq!(row.status, EnrichmentStatus::Completed);
  let c = content(&row);
  // det = (-0.8 · -1.0) / 1 = 0.8; same sign as 0.5, so blended.
  assert!((c.deterministic_alignment - 0.8).abs() < 1e-9);
  assert!((c.final_alignment - 0.65).abs() < 1e-9);
  assert!((c.alignment_conflict - 0.3).abs() < 1e-9);
  assert!((c.polarity - 0.5).abs() < 1e-9);
  assert_eq!(c.detected_language, "en");
  assert_eq!(c.model_name, "fake-model");
  assert!(c.identified_subjects[0].is_in_knowledge);

  assert_eq!(h.discarded(), 1);
}

#[tokio::test]
async fn sign_clash_uses_deterministic_score() {
  let mut h = Harness::new();
  h.analyzer.reply = Some(analysis(&[("putin", 0.9)], 0.8));

  h.pipeline().process("7002").await;

  let row = h.store.row("7002").unwrap();
  let c = content(&row);
  assert!((c.final_alignment - -0.9).abs() < 1e-9);
  assert!((c.llm_overall_alignment - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn out_of_range_scores_are_clamped_before_scoring() {
  let mut h = Harness::new();
  h.analyzer.reply = Some(analysis(&[("Putin", -4.0)], 3.0));

  let report = h.pipeline().process("7003").await;
  assert!(report.is_completed());

  let row = h.store.row("7003").unwrap();
  let c = content(&row);
  assert_eq!(c.llm_overall_alignment, 1.0);
  assert_eq!(c.identified_subjects[0].stance, -1.0);
  assert_eq!(c.deterministic_alignment, 1.0);
  assert_eq!(c.final_alignment, 1.0);
}

#[tokio::test]
async fn analyzer_sees_description_and_knowledge() {
  let mut h = Harness::new();
  let mut store = MemoryStore::default();
  store
    .descriptions
    .insert("7004".into(), "#news tonight".into());
  h.store = Arc::new(store);
  h.transcriber.language = "de".into();

  h.pipeline().process("7004").await;
  h.pipeline().process("7005").await;

  let requests = h.analyzer.requests.lock().unwrap();
  assert_eq!(requests[0].0, "#news tonight");
  assert!(requests[0].1.contains("vladimir putin"));
  // Unknown item: empty description, still analysed.
  assert_eq!(requests[1].0, "");
  assert_eq!(*h.sentiment.languages.lock().unwrap(), ["de", "de"]);
}

#[tokio::test]
async fn failed_cleanup_does_not_change_outcome() {
  let mut h = Harness::new();
  h.downloader.fail_discard = true;

  let report = h.pipeline().process("7006").await;
  assert!(report.is_completed());
  assert_eq!(h.discarded(), 1);
}

// ─── Deleted ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn removed_source_is_marked_deleted_without_cleanup() {
  let mut h = Harness::new();
  h.downloader.fetch = Fetch::Removed;

  let report = h.pipeline().process("7010").await;

  assert_eq!(report.stage, Stage::Deleted);
  assert!(matches!(
    report.error,
    Some(PipelineError::SourceRemoved { .. })
  ));
  let row = h.store.row("7010").unwrap();
  assert_eq!(row.status, EnrichmentStatus::Deleted);
  assert!(row.content.is_none());
  assert_eq!(h.discarded(), 0);
  assert!(h.analyzer.requests.lock().unwrap().is_empty());
}

// ─── Failed ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_failure_is_marked_failed() {
  let mut h = Harness::new();
  h.downloader.fetch = Fetch::Broken;

  let report = h.pipeline().process("7020").await;

  assert_eq!(report.stage, Stage::Failed);
  assert!(matches!(
    report.error,
    Some(PipelineError::TransientInfra { stage: Stage::Downloading, .. })
  ));
  assert_eq!(h.store.row("7020").unwrap().status, EnrichmentStatus::Failed);
  assert_eq!(h.discarded(), 0);
}

#[tokio::test]
async fn transcriber_failure_is_marked_failed() {
  let mut h = Harness::new();
  h.transcriber.fail = true;

  let report = h.pipeline().process("7025").await;

  assert_eq!(report.stage, Stage::Failed);
  assert!(matches!(
    report.error,
    Some(PipelineError::TransientInfra { stage: Stage::Transcribing, .. })
  ));
  assert_eq!(h.store.row("7025").unwrap().status, EnrichmentStatus::Failed);
  assert!(h.sentiment.languages.lock().unwrap().is_empty());
  assert!(h.analyzer.requests.lock().unwrap().is_empty());
  assert_eq!(h.discarded(), 0);
}

#[tokio::test]
async fn sentiment_failure_is_marked_failed() {
  let mut h = Harness::new();
  h.sentiment.result = None;

  let report = h.pipeline().process("7021").await;

  assert_eq!(report.stage, Stage::Failed);
  assert!(matches!(
    report.error,
    Some(PipelineError::TransientInfra { stage: Stage::Transcribing, .. })
  ));
  assert_eq!(h.store.row("7021").unwrap().status, EnrichmentStatus::Failed);
  assert!(h.analyzer.requests.lock().unwrap().is_empty());
  assert_eq!(h.discarded(), 0);
}

#[tokio::test]
async fn non_finite_sentiment_is_malformed() {
  let mut h = Harness::new();
  h.sentiment.result = Some(Sentiment {
    positive: f64::NAN,
    negative: 0.1,
    neutral:  0.3,
  });

  let report = h.pipeline().process("7026").await;

  assert_eq!(report.stage, Stage::Failed);
  assert!(malformed_at(&report, Stage::Transcribing));
  assert_eq!(h.store.row("7026").unwrap().status, EnrichmentStatus::Failed);
  assert!(h.analyzer.requests.lock().unwrap().is_empty());
  assert_eq!(h.discarded(), 0);
}

#[tokio::test]
async fn failure_keeps_previous_content() {
  let mut h = Harness::new();
  let first = h.pipeline().process("7022").await;
  assert!(first.is_completed());
  let before = h.store.row("7022").unwrap();

  h.analyzer.reply = None;
  let second = h.pipeline().process("7022").await;

  assert_eq!(second.stage, Stage::Failed);
  assert!(matches!(
    second.error,
    Some(PipelineError::TransientInfra { stage: Stage::Analyzing, .. })
  ));
  let after = h.store.row("7022").unwrap();
  assert_eq!(after.status, EnrichmentStatus::Failed);
  assert_eq!(after.content, before.content);
  assert!(after.last_enriched_at >= before.last_enriched_at);
  // Only the first, successful run cleaned up.
  assert_eq!(h.discarded(), 1);
}

#[tokio::test]
async fn non_finite_alignment_is_malformed() {
  let mut h = Harness::new();
  h.analyzer.reply = Some(analysis(&[("eu", 0.5)], f64::NAN));

  let report = h.pipeline().process("7023").await;

  assert_eq!(report.stage, Stage::Failed);
  assert!(malformed_at(&report, Stage::Analyzing));
  assert_eq!(h.store.row("7023").unwrap().status, EnrichmentStatus::Failed);
}

#[tokio::test]
async fn non_finite_stance_is_malformed() {
  for stance in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
    let mut h = Harness::new();
    h.analyzer.reply = Some(analysis(&[("eu", 0.5), ("Putin", stance)], 0.2));

    let report = h.pipeline().process("7027").await;

    assert_eq!(report.stage, Stage::Failed, "stance {stance}");
    assert!(malformed_at(&report, Stage::Analyzing), "stance {stance}");
    let row = h.store.row("7027").unwrap();
    assert_eq!(row.status, EnrichmentStatus::Failed);
    assert!(row.content.is_none());
    assert_eq!(h.discarded(), 0);
  }
}

#[tokio::test]
async fn persistence_failure_is_marked_failed() {
  let mut h = Harness::new();
  h.store = Arc::new(MemoryStore {
    fail_completed: true,
    ..Default::default()
  });

  let report = h.pipeline().process("7024").await;

  assert!(matches!(
    report.error,
    Some(PipelineError::TransientInfra { stage: Stage::Scoring, .. })
  ));
  let row = h.store.row("7024").unwrap();
  assert_eq!(row.status, EnrichmentStatus::Failed);
  assert!(row.content.is_none());
  assert_eq!(h.discarded(), 0);
}

#[test]
fn only_the_downloader_can_remove_a_source() {
  let err = PipelineError::from_collaborator(
    "1",
    Stage::Analyzing,
    CollaboratorError::SourceRemoved("gone".into()),
  );
  assert_eq!(err.outcome(), StepOutcome::Errored);
  assert_eq!(Stage::Analyzing.next(err.outcome()), Stage::Failed);
}
