use elasticsearch_maintenance::{
    args::{Command, Opt},
    client, indices,
    master::{self, SystemIpProvider},
    snapshot,
};
use structopt::StructOpt;

const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();
    init_logging(opt.command.common().debug);

    match run(&opt.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();
}

async fn run(command: &Command) -> anyhow::Result<i32> {
    let common = command.common();
    let config = common.connection_config();
    let client = client::connect(&config).await?;

    if common.master {
        if !master::is_local_node_master(&client, &SystemIpProvider).await? {
            log::info!("not running because we're not the master");
            return Ok(EXIT_OK);
        }
        log::info!("running because we're the master");
    }

    let report = match command {
        Command::Snapshot(opts) => {
            snapshot::run_snapshot_job(&client, opts).await
        }
        Command::TrimIndices(opts) => {
            indices::run_trim_job(&client, opts).await
        }
    };

    report.log_summary();
    if report.has_failures() {
        Ok(EXIT_PARTIAL_FAILURE)
    } else {
        Ok(EXIT_OK)
    }
}
