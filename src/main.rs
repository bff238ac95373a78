#[tokio::main]
async fn main() {
    if let Err(e) = transcript_analyzer::run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
