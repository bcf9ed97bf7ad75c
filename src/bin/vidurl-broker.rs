//! Service entry point.

// crates.io
use clap::Parser;
// self
use vidurl_broker::{config::ServiceConfig, obs, server};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let config = ServiceConfig::parse();

	obs::init_subscriber(&config.log_filter)?;

	let state = config.build_state()?;
	let listener = tokio::net::TcpListener::bind(config.bind).await?;

	server::serve(listener, state, async {
		let _ = tokio::signal::ctrl_c().await;
	})
	.await?;

	Ok(())
}
