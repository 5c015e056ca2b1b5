//! Attach classifier scores to headline records.
//!
//! One classification call per record, in input order. Only the numeric
//! score is kept; the winning label is discarded, so a confident "negative"
//! and a confident "positive" both come out high.

use metrics::counter;

use super::{ensure_metrics_described, Classifier};
use crate::error::{Result, SentimentError};
use crate::ingest::HeadlineRecord;

/// Score every record's title. Any failure aborts the whole batch with the
/// index of the offending record.
pub async fn score_all(
    records: &[HeadlineRecord],
    classifier: &dyn Classifier,
) -> Result<Vec<HeadlineRecord>> {
    ensure_metrics_described();

    let mut out = Vec::with_capacity(records.len());
    for (index, rec) in records.iter().enumerate() {
        let score = classify_one(index, rec, classifier).await.inspect_err(|e| {
            counter!("classifier_errors_total").increment(1);
            tracing::warn!(
                index,
                ticker = %rec.ticker,
                provider = classifier.provider_name(),
                error = %e,
                "classification failed"
            );
        })?;
        out.push(rec.with_score(score));
    }

    counter!("headlines_scored_total").increment(out.len() as u64);
    tracing::debug!(
        records = out.len(),
        provider = classifier.provider_name(),
        "scored headlines"
    );
    Ok(out)
}

async fn classify_one(
    index: usize,
    rec: &HeadlineRecord,
    classifier: &dyn Classifier,
) -> Result<f64> {
    if rec.title.trim().is_empty() {
        return Err(SentimentError::Classification {
            index,
            reason: "empty title".to_string(),
        });
    }

    let c = classifier
        .classify(&rec.title)
        .await
        .map_err(|e| SentimentError::Classification {
            index,
            reason: format!("{e:#}"),
        })?;

    if !c.score.is_finite() || !(-1.0..=1.0).contains(&c.score) {
        return Err(SentimentError::Classification {
            index,
            reason: format!("malformed score {} for label {:?}", c.score, c.label),
        });
    }
    Ok(c.score)
}
