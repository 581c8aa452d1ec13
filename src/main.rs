// Relays UI port messages on stdin/stdout to the configured backend
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    record_bridge::init_logging();

    let config_path = record_bridge::config_path(std::env::args().nth(1));
    record_bridge::run(config_path).await
}
