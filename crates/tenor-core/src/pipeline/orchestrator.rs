//! [`Pipeline`]: drives one item through every stage and records the outcome.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{
  AnalysisRequest, Artifacts, CollaboratorError, ContentAnalysis,
  ContentAnalyzer, Downloader, PipelineError, SentimentClassifier, Stage,
  StepOutcome, Transcriber,
};
use crate::{
  alias::KnowledgeIndex,
  enrichment::{EnrichmentContent, EnrichmentRecord},
  reconcile::{DEFAULT_BLEND, reconcile},
  scoring::clamp_unit,
  store::ResultStore,
};

/// The external services a [`Pipeline`] calls, one per stage.
#[derive(Debug, Clone)]
pub struct Collaborators<D, T, S, A> {
  pub downloader:  D,
  pub transcriber: T,
  pub sentiment:   S,
  pub analyzer:    A,
}

/// How a single item ended.
#[derive(Debug)]
pub struct ItemReport {
  pub item_id: String,
  /// Always terminal.
  pub stage:   Stage,
  /// Set unless `stage` is [`Stage::Completed`].
  pub error:   Option<PipelineError>,
}

impl ItemReport {
  pub fn is_completed(&self) -> bool { self.stage == Stage::Completed }
}

pub struct Pipeline<D, T, S, A, R> {
  knowledge:     Arc<KnowledgeIndex>,
  collaborators: Collaborators<D, T, S, A>,
  store:         Arc<R>,
  blend:         f64,
}

impl<D, T, S, A, R> Pipeline<D, T, S, A, R>
where
  D: Downloader,
  T: Transcriber,
  S: SentimentClassifier,
  A: ContentAnalyzer,
  R: ResultStore,
{
  pub fn new(
    knowledge: Arc<KnowledgeIndex>,
    collaborators: Collaborators<D, T, S, A>,
    store: Arc<R>,
  ) -> Self {
    Self { knowledge, collaborators, store, blend: DEFAULT_BLEND }
  }

  /// Weight given to the deterministic score when reconciling.
  pub fn with_blend(mut self, blend: f64) -> Self {
    self.blend = blend;
    self
  }

  pub fn store(&self) -> &Arc<R> { &self.store }

  /// Run `item_id` to a terminal stage.
  ///
  /// Never fails: every problem is folded into the returned report and, for
  /// non-completed items, into a status-only row in the store.
  pub async fn process(&self, item_id: &str) -> ItemReport {
    info!(item_id, "enrichment started");
    let mut stage = Stage::Queued;

    match self.run(item_id, &mut stage).await {
      Ok((record, artifacts)) => {
        stage = self.advance(item_id, stage, StepOutcome::Done);
        info!(
          item_id,
          final_alignment = record
            .content
            .as_ref()
            .map_or(0.0, |c| c.final_alignment),
          "enrichment completed"
        );
        if let Err(e) = self.collaborators.downloader.discard(&artifacts).await
        {
          warn!(item_id, error = %e, "failed to clean up artifacts");
        }
        ItemReport { item_id: item_id.to_owned(), stage, error: None }
      }
      Err(err) => {
        stage = self.advance(item_id, stage, err.outcome());
        match stage {
          Stage::Deleted => info!(item_id, error = %err, "source removed"),
          _ => error!(item_id, error = %err, "enrichment failed"),
        }
        if let Some(status) = stage.status() {
          if let Err(e) = self.store.upsert_status(item_id, status).await {
            error!(item_id, %status, error = %e, "failed to record status");
          }
        }
        ItemReport { item_id: item_id.to_owned(), stage, error: Some(err) }
      }
    }
  }

  fn advance(&self, item_id: &str, from: Stage, outcome: StepOutcome) -> Stage {
    let to = from.next(outcome);
    debug!(item_id, %from, %to, "stage transition");
    to
  }

  /// Every step up to and including persistence. On error, `stage` holds the
  /// stage that failed.
  async fn run(
    &self,
    item_id: &str,
    stage: &mut Stage,
  ) -> Result<(EnrichmentRecord, Artifacts), PipelineError> {
    let fail = |stage: Stage| {
      move |e: CollaboratorError| {
        PipelineError::from_collaborator(item_id, stage, e)
      }
    };

    // ── Download ──
    *stage = self.advance(item_id, *stage, StepOutcome::Done);
    let artifacts = self
      .collaborators
      .downloader
      .download(item_id)
      .await
      .map_err(fail(*stage))?;

    // ── Transcribe + sentiment ──
    *stage = self.advance(item_id, *stage, StepOutcome::Done);
    let transcript = self
      .collaborators
      .transcriber
      .transcribe(&artifacts.audio_path)
      .await
      .map_err(fail(*stage))?;
    let sentiment = self
      .collaborators
      .sentiment
      .classify(&transcript.text, &transcript.language)
      .await
      .map_err(fail(*stage))?;
    if !sentiment.is_finite() {
      return Err(fail(*stage)(CollaboratorError::Malformed(
        "sentiment distribution is not finite".into(),
      )));
    }

    // ── Analyze ──
    *stage = self.advance(item_id, *stage, StepOutcome::Done);
    let description = self.description(item_id).await;
    let analysis = self
      .collaborators
      .analyzer
      .analyze(AnalysisRequest {
        item_id,
        video_path: &artifacts.video_path,
        transcript: &transcript.text,
        sentiment: &sentiment,
        description: &description,
        knowledge: self.knowledge.context_json(),
      })
      .await
      .and_then(|analysis| sanitize(item_id, analysis))
      .map_err(fail(*stage))?;

    // ── Score + persist ──
    *stage = self.advance(item_id, *stage, StepOutcome::Done);
    let outcome = reconcile(
      &self.knowledge,
      &analysis.identified_subjects,
      analysis.overall_alignment,
      self.blend,
    );
    if outcome.sign_clash {
      info!(
        item_id,
        deterministic = outcome.deterministic_alignment,
        external = analysis.overall_alignment,
        "sign clash, using deterministic score"
      );
    }

    let model_name = self.collaborators.analyzer.model_name().to_owned();
    let content = EnrichmentContent {
      transcript:              transcript.text,
      detected_language:       transcript.language,
      summary:                 analysis.summary,
      identified_subjects:     outcome.subjects,
      llm_overall_alignment:   analysis.overall_alignment,
      final_alignment:         outcome.final_alignment,
      deterministic_alignment: outcome.deterministic_alignment,
      alignment_conflict:      outcome.alignment_conflict,
      polarity:                sentiment.polarity(),
      sentiment,
      model_name,
    };
    let record = self
      .store
      .upsert_completed(item_id, &content)
      .await
      .map_err(|e| PipelineError::transient(*stage, e))?;

    Ok((record, artifacts))
  }

  /// The item's description, or an empty string when there is none.
  async fn description(&self, item_id: &str) -> String {
    match self.store.item_description(item_id).await {
      Ok(Some(description)) => description,
      Ok(None) => {
        warn!(item_id, "no description on record");
        String::new()
      }
      Err(e) => {
        warn!(item_id, error = %e, "description lookup failed");
        String::new()
      }
    }
  }
}

/// Clamp every score the analyser produced into [-1, 1].
fn sanitize(
  item_id: &str,
  mut analysis: ContentAnalysis,
) -> Result<ContentAnalysis, CollaboratorError> {
  if !analysis.overall_alignment.is_finite() {
    return Err(CollaboratorError::Malformed(format!(
      "overall_alignment is {}",
      analysis.overall_alignment
    )));
  }
  let clamped = clamp_unit(analysis.overall_alignment);
  if clamped != analysis.overall_alignment {
    warn!(
      item_id,
      value = analysis.overall_alignment,
      "overall_alignment out of range, clamped"
    );
    analysis.overall_alignment = clamped;
  }

  for subject in &mut analysis.identified_subjects {
    if !subject.stance.is_finite() {
      return Err(CollaboratorError::Malformed(format!(
        "stance for {:?} is {}",
        subject.subject, subject.stance
      )));
    }
    let clamped = clamp_unit(subject.stance);
    if clamped != subject.stance {
      warn!(
        item_id,
        subject = %subject.subject,
        value = subject.stance,
        "stance out of range, clamped"
      );
      subject.stance = clamped;
    }
  }

  Ok(analysis)
}
