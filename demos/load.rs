use std::sync::Arc;
use std::time::{Duration, Instant};

use log_fanout::backend::Connector;
use log_fanout::sink::{LogSink, NoopSink};
use log_fanout::{facade, global, Logger, LoggerConfig, RemoteConfig};

fn main() {
    let connector: Connector = Arc::new(|_cfg: &RemoteConfig| Ok(Arc::new(NoopSink) as Arc<dyn LogSink>));

    let remote = RemoteConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        batch_wait: Duration::from_millis(200),
        ..RemoteConfig::default()
    };
    let config = LoggerConfig::new("load")
        .stdout(false)
        .remote_config(remote)
        .remote(true, "");

    let logger = Logger::open_with_connector(config, connector).expect("open log file");
    global::install(Arc::new(logger));

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        facade::with_fields_error(log_fanout::fields! { "iteration" => i }, "load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "sent {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    if let Some(stats) = global::current().and_then(|l| l.remote_stats()) {
        println!("submitted {}, dropped {}", stats.submitted, stats.dropped);
    }
    global::shutdown();
}
