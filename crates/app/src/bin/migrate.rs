//! Applies the schema migrations to `DATABASE_URL`.

use app::{AppContext, Config};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    app::init_tracing(&config);

    if let Err(e) = run(&config).await {
        tracing::error!(error = %e, "migration failed");
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> app::Result<()> {
    let context = AppContext::connect(config).await?;
    let outcome = context.migrate().await;
    context.shutdown().await;
    outcome
}
