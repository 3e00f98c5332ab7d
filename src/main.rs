#[tokio::main]
async fn main() {
    potluck::start_server().await;
}
