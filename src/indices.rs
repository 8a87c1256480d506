use crate::args::TrimIndicesOpt;
use crate::date;
use crate::report::JobReport;
use chrono::{DateTime, Duration, Utc};
use elasticsearch::{
    cat::CatIndicesParts,
    indices::{IndicesCloseParts, IndicesDeleteParts},
    params::ExpandWildcards,
    Elasticsearch,
};
use serde::Deserialize;

/// An index paired with its creation date, from the cat indices API.
#[derive(Deserialize, Debug, Clone)]
pub struct IndexInfo {
    /// cd is the creation.date column, epoch millis as a string
    #[serde(with = "date", rename(deserialize = "cd"))]
    pub creation_date: DateTime<Utc>,
    /// i is the index name column
    #[serde(rename(deserialize = "i"))]
    pub index: String,
}

/// Fetch every index whose name starts with `prefix`, in any state (open,
/// closed, hidden).
pub async fn list_matching_indices(
    client: &Elasticsearch, prefix: &str,
) -> anyhow::Result<Vec<IndexInfo>> {
    let pattern = format!("{}*", prefix);
    let response = client
        .cat()
        .indices(CatIndicesParts::Index(&[&pattern]))
        // h: comma-separated list of column names to display
        .h(&["cd", "i"])
        .format("json")
        .expand_wildcards(&[ExpandWildcards::All])
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("index listing for {} returned {}", pattern, status);
    }
    let indices = response.json::<Vec<IndexInfo>>().await?;
    log::debug!("{} indices match {}", indices.len(), pattern);
    Ok(indices)
}

/// The indices strictly older than `max_age_days`, oldest first.
///
/// The comparison is on the exact duration, so an index aged exactly the
/// limit stays. Sorting makes the eviction order predictable instead of
/// inheriting whatever order the listing API used.
pub fn select_expired(
    mut indices: Vec<IndexInfo>, max_age_days: i64, now: DateTime<Utc>,
) -> Vec<IndexInfo> {
    let limit = Duration::days(max_age_days);
    indices
        .retain(|i| now.signed_duration_since(i.creation_date) > limit);
    indices.sort_by_key(|i| i.creation_date);
    indices
}

/// Close then delete one expired index.
///
/// The two steps are logged and reported separately; a failed close does not
/// skip the delete attempt, they are independent mutations.
pub async fn evict_index(
    client: &Elasticsearch, index: &str, report: &mut JobReport,
) {
    match close_index(client, index).await {
        Ok(()) => {
            log::info!("{} closed", index);
            report.success(format!("close index {}", index));
        }
        Err(e) => report.failure(format!("close index {}", index), e),
    }

    match delete_index(client, index).await {
        Ok(()) => {
            log::info!("{} deleted", index);
            report.success(format!("delete index {}", index));
        }
        Err(e) => report.failure(format!("delete index {}", index), e),
    }
}

async fn close_index(
    client: &Elasticsearch, index: &str,
) -> anyhow::Result<()> {
    let response = client
        .indices()
        .close(IndicesCloseParts::Index(&[index]))
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("index close returned {}", status);
    }
    Ok(())
}

async fn delete_index(
    client: &Elasticsearch, index: &str,
) -> anyhow::Result<()> {
    let response = client
        .indices()
        .delete(IndicesDeleteParts::Index(&[index]))
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("index delete returned {}", status);
    }
    Ok(())
}

/// Index-trim job: drop everything under the prefix older than the age
/// limit.
pub async fn run_trim_job(
    client: &Elasticsearch, opts: &TrimIndicesOpt,
) -> JobReport {
    let mut report = JobReport::new();

    let indices = match list_matching_indices(client, &opts.index).await {
        Ok(indices) => indices,
        Err(e) => {
            report.failure(
                format!("list indices matching {}*", opts.index),
                e,
            );
            return report;
        }
    };

    let now = Utc::now();
    let expired = select_expired(indices, opts.indexage, now);
    if expired.is_empty() {
        log::info!(
            "no indices under {}* older than {} days",
            opts.index,
            opts.indexage
        );
        return report;
    }

    for index in &expired {
        log::info!(
            "{} created {} ({} days old)",
            index.index,
            index.creation_date,
            now.signed_duration_since(index.creation_date).num_days()
        );
        evict_index(client, &index.index, &mut report).await;
    }
    report
}
