#[tokio::main]
async fn main() {
    let code = orchestrator::app::startup::startup().await;
    std::process::exit(code);
}
