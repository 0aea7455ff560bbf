use std::thread::sleep;
use std::time::Duration;

use log_fanout::{facade, fields, global};

fn main() {
    // Local file under ./log plus a push to the default Loki endpoint.
    // Disable the remote when running inside a container whose stdout is
    // already collected by an agent.
    let logger = global::init("game server", true, "");
    println!("logging to {:?}, remote {:?}", logger.log_path(), logger.remote_status());

    facade::info("test");
    facade::warn("warn");
    facade::error("error");

    facade::with_fields_warn(
        fields! { "error" => "error 404 found", "url" => "http://google.com" },
        "ping to google",
    );
    facade::with_fields_info(
        fields! { "time" => chrono::Local::now().to_rfc3339() },
        format_args!("{:?}", [("log_level", "info"), ("access_level", "root")]),
    );

    if let Err(e) = global::reconfigure_remote("http://localhost:3100/loki/api/v1/push", 1024, 5) {
        facade::with_fields_error(fields! { "error" => e.to_string() }, "remote reconfiguration failed");
    }
    facade::info("after reconfiguration");

    sleep(Duration::from_secs(5));
    global::shutdown();
}
