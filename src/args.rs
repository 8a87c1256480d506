use crate::config::{self, ClusterConnectionConfig};
use std::path::PathBuf;
use structopt::StructOpt;

/// Scheduled maintenance jobs for an Elasticsearch cluster
#[derive(StructOpt, Debug)]
#[structopt(name = "elasticsearch-maintenance")]
pub struct Opt {
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Take a snapshot into a repository, then prune snapshots beyond the
    /// retention count
    Snapshot(SnapshotOpt),
    /// Close and delete indices under a prefix once they exceed a maximum
    /// age
    TrimIndices(TrimIndicesOpt),
}

impl Command {
    pub fn common(&self) -> &CommonOpt {
        match self {
            Command::Snapshot(opt) => &opt.common,
            Command::TrimIndices(opt) => &opt.common,
        }
    }
}

/// Connection and process flags shared by every job.
#[derive(StructOpt, Debug)]
pub struct CommonOpt {
    /// Elasticsearch host
    #[structopt(long = "eshost", default_value = "localhost")]
    pub eshost: String,

    /// Elasticsearch port
    #[structopt(long = "esport", default_value = "9200")]
    pub esport: u16,

    /// Protocol to use when talking to Elasticsearch
    #[structopt(long = "esproto", default_value = "http")]
    pub esproto: String,

    /// Configuration file that contains credentials to auth against
    /// Elasticsearch
    #[structopt(
        long = "esauthcfg",
        default_value = "/etc/default/elasticsearch-snapshots"
    )]
    pub esauthcfg: PathBuf,

    /// Only run if this host is the elected master
    #[structopt(long)]
    pub master: bool,

    /// Print debug information
    #[structopt(long)]
    pub debug: bool,
}

impl CommonOpt {
    pub fn connection_config(&self) -> ClusterConnectionConfig {
        ClusterConnectionConfig {
            host: self.eshost.clone(),
            port: self.esport,
            protocol: self.esproto.clone(),
            credentials: config::load_auth_file(&self.esauthcfg),
        }
    }
}

#[derive(StructOpt, Debug)]
pub struct SnapshotOpt {
    #[structopt(flatten)]
    pub common: CommonOpt,

    /// Snapshot repository
    #[structopt(long)]
    pub repository: String,

    /// Snapshot name; defaults to all_YYYYMMDDHH for the current hour
    #[structopt(long)]
    pub snapshot: Option<String>,

    /// Indices to include in the snapshot, comma separated; everything when
    /// omitted
    #[structopt(long, use_delimiter = true)]
    pub indices: Vec<String>,

    /// Wait for the snapshot to complete
    #[structopt(long, parse(try_from_str), default_value = "true")]
    pub wait: bool,

    /// Number of snapshots to keep in the repository
    #[structopt(long, default_value = "60")]
    pub keep: usize,
}

#[derive(StructOpt, Debug)]
pub struct TrimIndicesOpt {
    #[structopt(flatten)]
    pub common: CommonOpt,

    /// Index name prefix to check
    #[structopt(long)]
    pub index: String,

    /// Oldest index to keep live, in days
    #[structopt(long, default_value = "14")]
    pub indexage: i64,

    /// Accepted for parity with the snapshot job; trimming always runs
    /// synchronously
    #[structopt(long, parse(try_from_str), default_value = "true")]
    pub wait: bool,
}
