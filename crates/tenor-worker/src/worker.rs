//! The worker loop: take ids from a subscription and process them one at a
//! time.

use std::future::Future;

use tenor_core::{
  pipeline::{
    ContentAnalyzer, Downloader, ItemReport, Pipeline, SentimentClassifier,
    Stage, Transcriber,
  },
  store::ResultStore,
};
use tracing::{info, warn};

use crate::{Result, queue::Subscription};

/// Something that can run an item to completion.
pub trait ItemProcessor: Sync {
  fn process_item<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = ItemReport> + Send + 'a;
}

impl<D, T, S, A, R> ItemProcessor for Pipeline<D, T, S, A, R>
where
  D: Downloader,
  T: Transcriber,
  S: SentimentClassifier,
  A: ContentAnalyzer,
  R: ResultStore,
{
  fn process_item<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = ItemReport> + Send + 'a {
    self.process(item_id)
  }
}

/// Outcome counts for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
  pub completed: usize,
  pub failed:    usize,
  pub deleted:   usize,
}

impl Tally {
  pub fn record(&mut self, report: &ItemReport) {
    match report.stage {
      Stage::Completed => self.completed += 1,
      Stage::Deleted => self.deleted += 1,
      _ => self.failed += 1,
    }
  }

  pub fn total(&self) -> usize { self.completed + self.failed + self.deleted }
}

/// Process items from `subscription` until it closes or `shutdown` resolves.
///
/// Shutdown is only observed between items; an item in flight always runs to
/// its terminal state.
pub async fn run<Q, P>(
  subscription: &mut Q,
  processor: &P,
  shutdown: impl Future<Output = ()>,
) -> Result<Tally>
where
  Q: Subscription,
  P: ItemProcessor,
{
  let mut tally = Tally::default();
  tokio::pin!(shutdown);

  loop {
    let next = tokio::select! {
      biased;
      () = &mut shutdown => {
        info!("shutdown requested");
        break;
      }
      next = subscription.next_item() => next?,
    };

    let Some(item_id) = next else {
      warn!("subscription closed");
      break;
    };
    let item_id = item_id.trim();
    if item_id.is_empty() {
      warn!("ignoring empty item id");
      continue;
    }

    let report = processor.process_item(item_id).await;
    tally.record(&report);
  }

  info!(
    completed = tally.completed,
    failed = tally.failed,
    deleted = tally.deleted,
    "worker stopped"
  );
  Ok(tally)
}

/// Process a fixed list of ids in order.
pub async fn process_all<P, I>(processor: &P, item_ids: I) -> Tally
where
  P: ItemProcessor,
  I: IntoIterator,
  I::Item: AsRef<str>,
{
  let mut tally = Tally::default();
  for item_id in item_ids {
    let report = processor.process_item(item_id.as_ref()).await;
    tally.record(&report);
  }
  tally
}
