#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swapdesk_lib::run().await
}
