use crate::args::SnapshotOpt;
use crate::report::JobReport;
use chrono::{DateTime, Utc};
use elasticsearch::{
    snapshot::{SnapshotCreateParts, SnapshotDeleteParts, SnapshotGetParts},
    Elasticsearch,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const CREATE_TIMEOUT: Duration = Duration::from_secs(7200);
const LIST_TIMEOUT: Duration = Duration::from_secs(120);
const DELETE_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Deserialize, Debug, Clone)]
pub struct SnapshotInfo {
    pub snapshot: String,
    #[serde(default)]
    pub start_time_in_millis: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct SnapshotListing {
    snapshots: Vec<SnapshotInfo>,
}

/// Default snapshot name: `all_` plus the current hour.
///
/// Hour granularity is deliberate: a rerun within the same hour computes the
/// same name and targets the same logical snapshot instead of piling up
/// near-duplicates.
pub fn default_snapshot_name(now: DateTime<Utc>) -> String {
    format!("all_{}", now.format("%Y%m%d%H"))
}

fn snapshot_body(indices: &[String]) -> serde_json::Value {
    let mut body = json!({ "include_global_state": true });
    if !indices.is_empty() {
        body["indices"] = json!(indices.join(","));
    }
    body
}

/// Create one snapshot in `repository`.
///
/// A non-empty `indices` list scopes the snapshot, otherwise everything is
/// included. `wait_for_completion` blocks the call until the snapshot
/// finishes or the request times out.
pub async fn create_snapshot(
    client: &Elasticsearch, repository: &str, snapshot: &str,
    indices: &[String], wait_for_completion: bool,
) -> anyhow::Result<()> {
    log::info!(
        "creating snapshot {} in repository {}",
        snapshot,
        repository
    );
    let response = client
        .snapshot()
        .create(SnapshotCreateParts::RepositorySnapshot(
            repository, snapshot,
        ))
        .body(snapshot_body(indices))
        .wait_for_completion(wait_for_completion)
        .request_timeout(CREATE_TIMEOUT)
        .send()
        .await?;

    let status = response.status_code();
    let body = response.text().await?;
    if !status.is_success() {
        anyhow::bail!("snapshot create returned {}: {}", status, body);
    }
    log::debug!("snapshot create response: {}", body);
    Ok(())
}

/// List every snapshot in `repository`, oldest first.
///
/// The get-snapshots API is not documented to guarantee an order, so the
/// listing is sorted by start time before any retention decision is made.
pub async fn list_snapshots(
    client: &Elasticsearch, repository: &str,
) -> anyhow::Result<Vec<SnapshotInfo>> {
    let response = client
        .snapshot()
        .get(SnapshotGetParts::RepositorySnapshot(repository, &["_all"]))
        .request_timeout(LIST_TIMEOUT)
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("snapshot listing returned {}", status);
    }
    let mut snapshots = response.json::<SnapshotListing>().await?.snapshots;
    sort_oldest_first(&mut snapshots);
    Ok(snapshots)
}

fn sort_oldest_first(snapshots: &mut [SnapshotInfo]) {
    // stable sort: snapshots without a start time sort first, ties keep the
    // order the API returned
    snapshots.sort_by_key(|s| s.start_time_in_millis.unwrap_or(0));
}

/// The snapshots beyond the `keep` most recent ones, oldest first.
pub fn excess_snapshots(
    snapshots: &[SnapshotInfo], keep: usize,
) -> &[SnapshotInfo] {
    if snapshots.len() > keep {
        &snapshots[..snapshots.len() - keep]
    } else {
        &[]
    }
}

/// Delete the oldest snapshots beyond the retention count.
///
/// Deletions run sequentially and are independent of each other: one failure
/// is recorded and the remaining deletions still run.
pub async fn prune_old_snapshots(
    client: &Elasticsearch, repository: &str, keep: usize,
    report: &mut JobReport,
) {
    let snapshots = match list_snapshots(client, repository).await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            report.failure(format!("list snapshots in {}", repository), e);
            return;
        }
    };

    let excess = excess_snapshots(&snapshots, keep);
    if excess.is_empty() {
        log::info!(
            "{} snapshots in {}, retention {} satisfied, nothing to prune",
            snapshots.len(),
            repository,
            keep
        );
        return;
    }

    log::info!(
        "{} snapshots in {}, deleting the oldest {}",
        snapshots.len(),
        repository,
        excess.len()
    );
    for snap in excess {
        match delete_snapshot(client, repository, &snap.snapshot).await {
            Ok(()) => {
                log::info!("deleted snapshot {}", snap.snapshot);
                report.success(format!("delete snapshot {}", snap.snapshot));
            }
            Err(e) => {
                report.failure(
                    format!("delete snapshot {}", snap.snapshot),
                    e,
                );
            }
        }
    }
}

async fn delete_snapshot(
    client: &Elasticsearch, repository: &str, snapshot: &str,
) -> anyhow::Result<()> {
    let response = client
        .snapshot()
        .delete(SnapshotDeleteParts::RepositorySnapshot(repository, snapshot))
        .request_timeout(DELETE_TIMEOUT)
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("snapshot delete returned {}", status);
    }
    Ok(())
}

/// Snapshot job: create one snapshot, then prune beyond the retention count.
///
/// Pruning does not depend on the creation succeeding, so it runs either
/// way; both outcomes end up in the report.
pub async fn run_snapshot_job(
    client: &Elasticsearch, opts: &SnapshotOpt,
) -> JobReport {
    let mut report = JobReport::new();

    let name = opts
        .snapshot
        .clone()
        .unwrap_or_else(|| default_snapshot_name(Utc::now()));

    match create_snapshot(
        client,
        &opts.repository,
        &name,
        &opts.indices,
        opts.wait,
    )
    .await
    {
        Ok(()) => report.success(format!("create snapshot {}", name)),
        Err(e) => report.failure(format!("create snapshot {}", name), e),
    }

    prune_old_snapshots(client, &opts.repository, opts.keep, &mut report)
        .await;
    report
}
