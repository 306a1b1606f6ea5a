//! Runs a short command script through the engine and prints the outcome.

use demo::valuechanger::{self, ClearValue, SetValue};
use domain::Payload;
use pipeline::Config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Compile domains and wire the pipelines
    let mut app = demo::create_app(&config).expect("failed to assemble application");
    tracing::info!(source = %config.source_uri, "engine ready");

    // 4. Drive one aggregate through a few commands
    let set = |value: &str| SetValue {
        value: value.to_string(),
    };
    let script: Vec<Box<dyn Payload>> = vec![
        Box::new(set("first")),
        Box::new(set("first")),
        Box::new(set("second")),
        Box::new(set(valuechanger::RESET)),
        Box::new(ClearValue {}),
    ];

    for command in script {
        let message = app
            .deps
            .registry
            .new_message(1, 1, 0, &[], command.as_ref())
            .expect("command belongs to a registered domain");
        let event = app.deps.handle(&message).await;
        app.dispatcher.drain().await;
        tracing::info!(
            command = command.message_name(),
            event = %event,
            payload = %String::from_utf8_lossy(event.data()),
            "command handled"
        );
    }

    // 5. Report
    tracing::info!(events = app.store.event_count().await, "script finished");
    println!("{}", metrics_handle.render());
}
