#[tokio::main]
async fn main() -> anyhow::Result<()> {
    micwave::app::run().await
}
