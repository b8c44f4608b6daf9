#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rehab_library_sync::run(std::env::args().skip(1).collect()).await
}
