use folio_site::{SiteConfig, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let cfg = SiteConfig::from_env()?;
    let handle = start_server(cfg).await?;
    // Park forever
    handle.await.ok();
    Ok(())
}
