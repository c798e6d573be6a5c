use amc_service::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config);

    let state = match AppState::builder().config(config.clone()).build().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to build application state: {}", e);
            return Err(e.into());
        }
    };

    Server::new(config).serve(router(state)).await?;
    Ok(())
}
