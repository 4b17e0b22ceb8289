#![forbid(unsafe_code)]

//! Replay a chart list script against the in-memory server.
//!
//! ```sh
//! cargo run -p chartdeck-harness -- --titles Revenue,Costs session.txt
//! CHARTDECK_LOG=chartdeck_runtime=debug cargo run -p chartdeck-harness -- < session.txt
//! ```
//!
//! Prints one JSON line per script command. Exits with status 1 when the
//! script does not parse or the rendered list ends out of sync with the
//! server.

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use chartdeck_core::ChartTypeCatalog;
use chartdeck_harness::script;
use chartdeck_harness::{FakeServer, Session};
use chartdeck_runtime::{ClientConfig, logging};

struct Config {
    script: Option<PathBuf>,
    titles: Vec<String>,
}

fn print_usage() {
    eprintln!(
        "Usage: chartdeck-replay [--titles <a,b,...>] [SCRIPT]\n\
         \n\
         Reads the script from SCRIPT, or stdin when omitted.\n\
         Client settings come from CHARTDECK_* environment variables."
    );
}

fn parse_args() -> Result<Config, String> {
    let mut args = env::args().skip(1);
    let mut script = None;
    let mut titles = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--titles" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--titles requires a value".to_string())?;
                titles = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument `{arg}`")),
        }
    }
    Ok(Config { script, titles })
}

fn run() -> Result<bool, Box<dyn Error>> {
    let cfg = parse_args().inspect_err(|_| {
        print_usage();
    })?;
    let client = ClientConfig::from_env()?;
    logging::install(&client.log)?;

    let text = match &cfg.script {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let steps = script::parse(&text)?;

    let catalog = if client.chart_types.is_empty() {
        ChartTypeCatalog::new(["ichart", "xbar"])
    } else {
        client.chart_types.clone()
    };
    let server = FakeServer::with_titles(catalog, cfg.titles);
    let mut session = Session::new(server, client);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in script::replay(&mut session, &steps) {
        writeln!(out, "{line}")?;
    }
    Ok(session.in_sync())
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("chartdeck-replay: rendered list out of sync with server");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("chartdeck-replay error: {err}");
            std::process::exit(1);
        }
    }
}
