use std::fs::File;

use bh_axum::{openapi, start_server};
use bh_sqlite::Db;
use bhserver::{AppConfig, Cli, impls::MarketApp};
use jwt_simple::prelude::HS256Key;
use tokio::select;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::import()?;

    // If requested, dump the schema and exit.
    if let Some(path) = &cli.schema {
        let schema = openapi::<MarketApp>();
        serde_json::to_writer_pretty(File::create(path)?, &schema)?;
        return Ok(());
    }

    let key = HS256Key::from_bytes(cli.secret.as_bytes());
    let AppConfig {
        server,
        database,
        document,
        ledger,
        schedule,
        propagation,
        verification,
        seed,
    } = AppConfig::load(&cli)?;

    let db = Db::open(&database).await?;
    seed.apply(&db).await?;
    let app = MarketApp::new(db, key, &document, &ledger, &propagation, &verification);

    let sweep_enabled = schedule.is_enabled();
    let worker = propagation.scheduler();
    let worker_enabled = worker.is_enabled();

    let server_task = tokio::spawn({
        let app = app.clone();
        async move { start_server(server, app).await }
    });

    let sweep_task = tokio::spawn({
        let app = app.clone();
        async move {
            schedule
                .schedule("expiry sweep", async move |now| app.sweep(now).await)
                .await
        }
    });

    let batch_size = propagation.batch_size;
    let worker_task = tokio::spawn(async move {
        worker
            .schedule("propagation", async move |_| app.propagate(batch_size).await)
            .await
    });

    // A disabled job returns at once, so only enabled ones may end the process.
    select! {
        r = server_task => r??,
        r = sweep_task, if sweep_enabled => r??,
        r = worker_task, if worker_enabled => r??,
    }

    Ok(())
}
