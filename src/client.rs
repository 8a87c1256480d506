use crate::config::ClusterConnectionConfig;
use elasticsearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    params::WaitForStatus,
    Elasticsearch,
};
use std::time::Duration;

const MAX_CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Create an Elasticsearch client from the connection config.
pub fn create_client(
    config: &ClusterConnectionConfig,
) -> anyhow::Result<Elasticsearch> {
    let url = config.base_url()?;

    let conn_pool = SingleNodeConnectionPool::new(url);
    let mut builder = TransportBuilder::new(conn_pool);
    if let Some(auth) = &config.credentials {
        builder = builder.auth(Credentials::Basic(
            auth.username.clone(),
            auth.password.clone(),
        ));
    }

    let transport = builder.build()?;
    Ok(Elasticsearch::new(transport))
}

/// Connect to the cluster and wait until it reports at least yellow health.
///
/// Each probe gets a bounded timeout; failures are retried after a fixed
/// delay up to a fixed attempt cap. Exhausting the cap is a hard error, the
/// caller gets no half-connected handle.
pub async fn connect(
    config: &ClusterConnectionConfig,
) -> anyhow::Result<Elasticsearch> {
    let client = create_client(config)?;

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match probe_health(&client).await {
            Ok(()) => {
                log::info!("connected to {}", config.endpoint());
                return Ok(client);
            }
            Err(e) => {
                log::warn!(
                    "still trying to connect to Elasticsearch (attempt \
                     {}/{}): {:#}",
                    attempt,
                    MAX_CONNECT_ATTEMPTS,
                    e
                );
            }
        }
        if attempt < MAX_CONNECT_ATTEMPTS {
            log::debug!("sleeping {:?} before retrying", CONNECT_RETRY_DELAY);
            tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        }
    }

    anyhow::bail!(
        "could not reach {} after {} attempts",
        config.endpoint(),
        MAX_CONNECT_ATTEMPTS
    )
}

async fn probe_health(client: &Elasticsearch) -> anyhow::Result<()> {
    let response = client
        .cluster()
        .health(ClusterHealthParts::None)
        .wait_for_status(WaitForStatus::Yellow)
        .request_timeout(HEALTH_PROBE_TIMEOUT)
        .send()
        .await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("cluster health probe returned {}", status);
    }
    Ok(())
}
