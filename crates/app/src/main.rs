mod hooks;
mod response;
mod router;
mod telemetry;

use std::{collections::BTreeSet, net::SocketAddr, sync::Arc, time::Duration};

use reqwest::Client;
use tracing::info;
use url::Url;
use webhookd_bus::{AmqpPublisher, BrokerOptions, NatsPublisher, Publisher};
use webhookd_travis::TravisConfigClient;
use webhookd_util::{load_env_file, AppConfig, BrokerKind};

const TRAVIS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;
    info!(stage = "app", config = %config.config_path.display(), routes = config.routes.len(), "configuration loaded");

    let broker = &config.gateway.mq;
    let exchanges: BTreeSet<&str> = config
        .routes
        .iter()
        .map(|route| route.exchange.as_str())
        .collect();
    let options = BrokerOptions {
        url: config.broker_url.to_string(),
        exchanges: exchanges.into_iter().map(str::to_string).collect(),
    };
    let publisher: Arc<dyn Publisher> = match broker.kind {
        BrokerKind::Rabbitmq => Arc::new(AmqpPublisher::connect(&options).await?),
        BrokerKind::Nats => Arc::new(NatsPublisher::connect(&options).await?),
    };
    info!(stage = "app", kind = ?broker.kind, host = broker.host(), port = broker.port(), "connected to broker");

    let http = Client::builder().timeout(TRAVIS_FETCH_TIMEOUT).build()?;
    let travis = TravisConfigClient::new(Url::parse(&config.gateway.travis.config_url)?, http);

    let state = router::AppState::new(metrics, publisher, travis);
    let app = router::app_router(state, &config.routes);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.map_err(|err| err.into())
}
