use std::path::PathBuf;
use std::process;

use clap::{App, Arg};
use log::{error, info};

use indexer::coordinator::{run_command_loop, Coordinator};
use indexer::docfile::read_docfile;

fn setup_logger(verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}][{}] {}", chrono_like_timestamp(), record.target(), message))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn chrono_like_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    format!("{}", secs)
}

fn main() {
    let matches = App::new("jobExecutor")
        .about("Forks one indexing worker per docfile shard and serves search commands")
        .arg(Arg::with_name("docfile").short("d").takes_value(true).required(true).value_name("DOCFILE"))
        .arg(Arg::with_name("workers").short("w").takes_value(true).required(true).value_name("NUM_WORKERS"))
        .arg(Arg::with_name("verbose").long("verbose").short("v"))
        .get_matches();

    setup_logger(matches.is_present("verbose")).expect("failed to initialize logger");

    let docfile_path = PathBuf::from(matches.value_of("docfile").unwrap());
    let num_workers: usize = matches.value_of("workers").unwrap().parse().expect("invalid -w worker count");

    let directories = read_docfile(&docfile_path).unwrap_or_else(|why| {
        error!("{}", why);
        process::exit(1);
    });

    info!("indexing {} directories across {} workers", directories.len(), num_workers);

    let runtime_dir = docfile_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let fifo_dir = runtime_dir.join("jobexecutor-fifos");
    let log_dir = runtime_dir.join("jobexecutor-logs");

    let coordinator = Coordinator::spawn(directories, num_workers, fifo_dir, log_dir).unwrap_or_else(|why| {
        error!("failed to start workers: {}", why);
        process::exit(2);
    });

    if let Err(why) = run_command_loop(coordinator) {
        error!("command loop exited with an error: {}", why);
    }
}
