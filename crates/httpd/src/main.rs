use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{App, Arg};
use log::{error, info, warn};

use httpd::queue::{self, Job};
use httpd::request::{self, StatusCode};
use httpd::stats::Stats;

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.target(), message)))
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn main() {
    setup_logger().expect("failed to initialize logger");

    let matches = App::new("myhttpd")
        .about("One-shot HTTP/1.1 static file server")
        .arg(Arg::with_name("sport").short("p").takes_value(true).required(true).value_name("SPORT"))
        .arg(Arg::with_name("cport").short("c").takes_value(true).required(true).value_name("CPORT"))
        .arg(Arg::with_name("threads").short("t").takes_value(true).required(true).value_name("NUM_THREADS"))
        .arg(Arg::with_name("root_dir").short("d").takes_value(true).required(true).value_name("ROOT_DIR"))
        .get_matches();

    let sport: u16 = matches.value_of("sport").unwrap().parse().expect("invalid -p port");
    let cport: u16 = matches.value_of("cport").unwrap().parse().expect("invalid -c port");
    let threads: usize = matches.value_of("threads").unwrap().parse().expect("invalid -t thread count");
    let root_dir = PathBuf::from(matches.value_of("root_dir").unwrap());

    if !root_dir.is_dir() {
        error!("'{}' is not a directory", root_dir.display());
        process::exit(1);
    }

    let stats = Arc::new(Stats::new());
    let (tx, rx) = queue::channel();
    let stop = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..threads)
        .map(|id| {
            let rx = rx.clone();
            let stats = Arc::clone(&stats);
            let root_dir = root_dir.clone();
            thread::Builder::new()
                .name(format!("httpd-worker-{}", id))
                .spawn(move || worker_loop(rx, &root_dir, &stats))
                .expect("failed to spawn httpd worker")
        })
        .collect();

    let web_listener = TcpListener::bind(("0.0.0.0", sport)).unwrap_or_else(|why| {
        error!("failed to bind web port {}: {}", sport, why);
        process::exit(2);
    });
    let cmd_listener = TcpListener::bind(("0.0.0.0", cport)).unwrap_or_else(|why| {
        error!("failed to bind command port {}: {}", cport, why);
        process::exit(2);
    });
    info!("serving {} on port {}, commands on port {}", root_dir.display(), sport, cport);

    {
        let stop = Arc::clone(&stop);
        let stats = Arc::clone(&stats);
        thread::spawn(move || {
            for incoming in cmd_listener.incoming() {
                let mut client = match incoming {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                if handle_command(&mut client, &stats) {
                    stop.store(true, Ordering::SeqCst);
                    break;
                }
            }
        });
    }

    for incoming in web_listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let client = match incoming {
            Ok(c) => c,
            Err(why) => {
                warn!("accept failed: {}", why);
                continue;
            }
        };
        if let Err(why) = accept_request(client, &tx) {
            warn!("failed to queue request: {}", why);
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }
    }

    drop(tx);
    for worker in workers {
        let _ = worker.join();
    }
}

fn accept_request(mut client: TcpStream, tx: &crossbeam_channel::Sender<Job>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = client.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let raw = String::from_utf8_lossy(&buf);
    match request::parse_request(&raw) {
        Some(path) => {
            let _ = tx.send(Job { path, client });
        }
        None => {
            let (status, body) = request::status_for(StatusCode::BadRequest);
            let _ = client.write_all(request::response(status, body).as_bytes());
        }
    }
    Ok(())
}

fn worker_loop(rx: crossbeam_channel::Receiver<Job>, root_dir: &Path, stats: &Stats) {
    for job in rx {
        serve(job, root_dir, stats);
    }
}

fn serve(job: Job, root_dir: &Path, stats: &Stats) {
    let Job { path, mut client } = job;
    let relative = path.trim_start_matches('/');
    let full_path = root_dir.join(relative);
    let display_path = format!("/{}", relative);

    if request::invalid_file(&display_path) {
        let (status, body) = request::status_for(StatusCode::Forbidden);
        let _ = client.write_all(request::response(status, body).as_bytes());
        return;
    }

    let metadata = match fs::metadata(&full_path) {
        Ok(m) => m,
        Err(_) => {
            let (status, body) = request::status_for(StatusCode::NotFound);
            let _ = client.write_all(request::response(status, body).as_bytes());
            return;
        }
    };

    if !metadata.is_file() {
        let (status, body) = request::status_for(StatusCode::Forbidden);
        let _ = client.write_all(request::response(status, body).as_bytes());
        return;
    }

    match fs::read(&full_path) {
        Ok(contents) => {
            let headers = request::response_headers(StatusCode::Ok, contents.len());
            if client.write_all(headers.as_bytes()).and_then(|_| client.write_all(&contents)).is_ok() {
                stats.record(contents.len());
            }
        }
        Err(why) => warn!("failed to read {}: {}", full_path.display(), why),
    }
}

fn handle_command(client: &mut TcpStream, stats: &Stats) -> bool {
    let mut buf = [0u8; 32];
    let n = match client.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return false,
    };
    let cmd = String::from_utf8_lossy(&buf[..n]);
    let cmd = cmd.trim();

    if cmd.starts_with("STATS") {
        let _ = client.write_all(stats.render().as_bytes());
        false
    } else if cmd.starts_with("SHUTDOWN") {
        let _ = client.write_all(b"\n*** SERVER SHUTTING DOWN ***\n");
        true
    } else {
        let _ = client.write_all(b"INVALID COMMAND\n");
        false
    }
}
