use log_fanout::{global, init::init_tracing, LoggerConfig};
use tracing::{error, info, warn};

fn main() {
    // LOG_FANOUT_REMOTE=1 LOG_FANOUT_ENDPOINT=... also ships the events to Loki.
    global::init_with_config(LoggerConfig::from_env("tracing bridge"));
    init_tracing();

    info!("starting service");
    warn!(url = "http://google.com", status = 404, "ping to google");
    error!(user_id = 42, reason = "invalid password", "authentication failed");

    global::shutdown();
}
