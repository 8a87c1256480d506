use anyhow::Context;
use elasticsearch::Elasticsearch;
use serde::Deserialize;
use std::net::{IpAddr, UdpSocket};

/// One row of the cat master response, reduced to the column we ask for.
#[derive(Deserialize, Debug)]
struct MasterRow {
    ip: Option<String>,
}

/// Answers "which IP would this host use for outbound cluster traffic?".
///
/// Behind a trait so the gate can be exercised in tests without touching the
/// real network configuration.
pub trait LocalIpProvider {
    fn local_ip(&self) -> anyhow::Result<IpAddr>;
}

/// Default provider. Policy, in order:
///
/// 1. the first non-loopback address bound to a local interface
/// 2. the local endpoint of a connectionless UDP socket pointed at a public
///    resolver, as assigned by the routing table (no packet is sent)
///
/// Both failing means the host's network configuration cannot support the
/// master gate and is a hard error, never a silent "not master".
pub struct SystemIpProvider;

impl LocalIpProvider for SystemIpProvider {
    fn local_ip(&self) -> anyhow::Result<IpAddr> {
        if let Ok(ip) = local_ip_address::local_ip() {
            if !ip.is_loopback() {
                return Ok(ip);
            }
        }
        outbound_probe_ip().context(
            "could not determine a local IP from the interfaces or the \
             routing table",
        )
    }
}

fn outbound_probe_ip() -> anyhow::Result<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(("8.8.8.8", 53))?;
    Ok(socket.local_addr()?.ip())
}

/// Ask the cluster for the elected master's published IP address.
///
/// Uses the cat master API with an explicit column selection so the address
/// comes out of a named field instead of a token position in a text row.
pub async fn master_ip(client: &Elasticsearch) -> anyhow::Result<IpAddr> {
    let response =
        client.cat().master().h(&["ip"]).format("json").send().await?;

    let status = response.status_code();
    if !status.is_success() {
        anyhow::bail!("cat master returned {}", status);
    }
    let rows = response.json::<Vec<MasterRow>>().await?;
    ip_from_rows(rows)
}

fn ip_from_rows(rows: Vec<MasterRow>) -> anyhow::Result<IpAddr> {
    let row = rows
        .into_iter()
        .next()
        .context("cat master returned no rows")?;
    let ip = row.ip.context("cat master row has no ip field")?;
    ip.parse().with_context(|| {
        format!("cat master reported an unparseable ip: {}", ip)
    })
}

/// True when the locally detected IP matches the master's published IP.
///
/// This is the sole fleet-level coordination mechanism: every node runs the
/// same schedule, only the one that sees itself as the elected master acts.
/// Advisory only, there is no atomicity across a failover window.
pub async fn is_local_node_master(
    client: &Elasticsearch, provider: &dyn LocalIpProvider,
) -> anyhow::Result<bool> {
    let master = master_ip(client).await?;
    let local = provider.local_ip()?;
    log::debug!("local ip {}, master ip {}", local, master);
    Ok(local == master)
}
