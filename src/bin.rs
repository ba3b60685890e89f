// Copyright 2026 modelcoupler contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use structopt::StructOpt;

#[macro_use]
extern crate log;

#[derive(Debug, StructOpt, Clone)]
#[structopt(name = "modelcoupler", about = "Run a model-coupling configuration")]
struct Cli {
    /// Use multiprocessing: coordinate with peer processes over the `mp`
    /// transport instead of running everything on this process alone.
    #[structopt(long = "mp")]
    mp: bool,

    /// Directory for writing logfiles. Default is stdout.
    #[structopt(short = "l", parse(from_os_str))]
    logdir: Option<PathBuf>,

    /// Verbose mode: log output at DEBUG level (overrides -q).
    #[structopt(short = "v")]
    verbose: bool,

    /// Quiet mode: log output at WARN level.
    #[structopt(short = "q")]
    quiet: bool,

    /// This peer's rank, required with `--mp`. Rank 0 is the supervisor that
    /// parses `ctlfile` and distributes assignments to the others.
    #[structopt(long = "rank", default_value = "0")]
    rank: u32,

    /// Total number of peers, required with `--mp`.
    #[structopt(long = "peers", default_value = "1")]
    peers: u32,

    /// NATS server URL, used only with `--mp`.
    #[structopt(long = "nats-url", default_value = "nats://localhost:4222")]
    nats_url: String,

    /// Name of the configuration file for the calculation.
    #[structopt(name = "ctlfile", parse(from_os_str))]
    ctlfile: PathBuf,
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_module_path(false);
    if let Some(dir) = &cli.logdir {
        let _ = std::fs::create_dir_all(dir);
        let path = dir.join("modelcoupler.log");
        if let Ok(file) = std::fs::File::create(&path) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }
    let _ = builder.try_init();
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::from_args();
    init_logging(&cli);
    info!("modelcoupler starting");

    let config = modelcoupler::config::load(&cli.ctlfile)?;

    let report = if cli.mp {
        #[cfg(feature = "mp")]
        {
            use modelcoupler::orchestrator::{run_multi_process, MpOptions};
            use modelcoupler::transport::PeerId;

            let opts = MpOptions {
                nats_url: cli.nats_url.clone(),
                run_id: run_id_from_path(&cli.ctlfile),
                peer_id: PeerId(cli.rank),
                n_peers: cli.peers,
            };
            let config_ref = if cli.rank == 0 { Some(&config) } else { None };
            run_multi_process(config_ref, opts)?
        }
        #[cfg(not(feature = "mp"))]
        {
            return Err("this binary was built without the `mp` feature".into());
        }
    } else {
        modelcoupler::orchestrator::run_single_process(&config)?
    };

    if report.success() {
        info!("all {} component(s) completed successfully", report.total);
        Ok(())
    } else {
        error!("{} component(s) failed: {:?}", report.failed.len(), report.failed);
        Err(format!("{} component(s) failed", report.failed.len()).into())
    }
}

#[cfg(feature = "mp")]
fn run_id_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("modelcoupler")
        .to_string()
}
