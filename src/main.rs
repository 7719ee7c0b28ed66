#[tokio::main]
async fn main() {
    if let Err(err) = class_reminder::run().await {
        eprintln!("Fatal: {err}");
        std::process::exit(1);
    }
}
