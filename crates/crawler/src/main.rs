use std::net::TcpListener;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{App, Arg};
use log::{error, info};

use crawler::config::CrawlerConfig;
use crawler::control::ControlPlane;
use crawler::docfile::Docfile;
use crawler::stats::Stats;
use crawler::worker::{spawn_workers, CrawlContext};
use frontier::Frontier;

fn setup_logger(verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono_like_timestamp(),
                record.target(),
                message
            ))
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
    let matches = App::new("crawler")
        .about("Single-host multi-threaded web crawler")
        .arg(Arg::with_name("host").short("h").takes_value(true).required(true).value_name("HOST"))
        .arg(Arg::with_name("sport").short("p").takes_value(true).required(true).value_name("SPORT"))
        .arg(Arg::with_name("cport").short("c").takes_value(true).required(true).value_name("CPORT"))
        .arg(Arg::with_name("threads").short("t").takes_value(true).required(true).value_name("NUM_THREADS"))
        .arg(Arg::with_name("save_dir").short("d").takes_value(true).required(true).value_name("SAVE_DIR"))
        .arg(Arg::with_name("config").long("config").takes_value(true).value_name("FILE"))
        .arg(Arg::with_name("verbose").long("verbose").short("v"))
        .arg(Arg::with_name("seed_url").required(true).value_name("SEED_URL"))
        .get_matches();

    setup_logger(matches.is_present("verbose")).expect("failed to initialize logger");

    let config_path = matches.value_of("config").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("webcrawl.toml"));
    let config = CrawlerConfig::load(&config_path).unwrap_or_else(|why| {
        error!("{}", why);
        process::exit(1);
    });

    let host = matches.value_of("host").unwrap().to_owned();
    let sport: u16 = matches.value_of("sport").unwrap().parse().expect("invalid -p port");
    let cport: u16 = matches.value_of("cport").unwrap().parse().expect("invalid -c port");
    let threads: usize = matches.value_of("threads").unwrap().parse().expect("invalid -t thread count");
    let save_dir = PathBuf::from(matches.value_of("save_dir").unwrap());
    let seed_url = matches.value_of("seed_url").unwrap().to_owned();
    let index_workers = config.index_workers.unwrap_or(4);

    info!("crawling {} from seed {}", host, seed_url);

    std::fs::create_dir_all(&save_dir).expect("failed to create save directory");
    let docfile_path = save_dir.join("docfile.txt");
    let docfile = Arc::new(Docfile::create(&docfile_path).expect("failed to create docfile"));

    let ctx = Arc::new(CrawlContext {
        frontier: Arc::new(Frontier::new(seed_url)),
        stats: Arc::new(Stats::new()),
        save_dir,
        docfile,
    });

    let workers = spawn_workers(threads, Arc::clone(&ctx));

    let command_listener = match TcpListener::bind((host.as_str(), cport)) {
        Ok(listener) => listener,
        Err(why) => {
            error!("failed to bind command port {}: {}", cport, why);
            process::exit(2);
        }
    };
    info!("control plane listening on {}:{}", host, cport);
    // -p is accepted for CLI-shape parity with `myhttpd`, which serves the
    // pages this crawler saves; the crawler itself has nothing to bind it to.
    let _ = sport;

    let control = ControlPlane::new(Arc::clone(&ctx), docfile_path, index_workers);
    if let Err(why) = control.run(command_listener) {
        error!("control plane exited with an error: {}", why);
    }

    for handle in workers {
        let _ = handle.join();
    }
}
