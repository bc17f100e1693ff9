//! Prints the mean and pooled fee for one offer of the configured seller account.
//!
//! Settings come from `MARKETPLACE_*` environment variables. When no usable user token is
//! stored yet, the demo prints the consent URL and waits for the redirect URL to be pasted
//! on stdin.
//!
//! ```sh
//! cargo run --example offer_fee -- <offer-id> [token-file]
//! ```

// std
use std::{env, sync::Arc, time::Duration};
// crates.io
use color_eyre::{
	Result,
	eyre::{OptionExt, eyre},
};
use tokio::{
	io::{self, AsyncBufReadExt, BufReader},
	time,
};
use tracing_subscriber::EnvFilter;
// self
use marketplace_fee::{
	config::MarketplaceSettings,
	error::Error,
	flows::ReqwestBroker,
	marketplace::MarketplaceClient,
	service::FeeService,
	store::{FileStore, TokenStore},
	url::Url,
};

const REDIRECT_WAIT: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let mut args = env::args().skip(1);
	let offer = args.next().ok_or_eyre("Usage: offer_fee <offer-id> [token-file]")?;
	let token_file = args.next().unwrap_or_else(|| "marketplace-token.json".into());
	let settings = MarketplaceSettings::from_env()?;
	let store: Arc<dyn TokenStore> = Arc::new(FileStore::open(token_file)?);
	let broker = ReqwestBroker::new(
		store,
		settings.descriptor()?,
		settings.client_identity()?,
		settings.client_secret.clone(),
	)?
	.with_options(settings.broker_options()?);
	let broker = Arc::new(broker);

	match broker.get_user_token().await {
		Ok(_) => {},
		Err(Error::AuthorizationRequired { authorize_url }) => {
			println!("Grant access at {authorize_url}");
			println!("Then paste the full redirect URL here:");

			let redirect = time::timeout(REDIRECT_WAIT, read_line()).await??;
			let redirect = Url::parse(redirect.trim())?;
			let param = |name: &str| {
				redirect
					.query_pairs()
					.find(|(key, _)| key == name)
					.map(|(_, value)| value.into_owned())
					.ok_or_else(|| eyre!("Redirect URL has no `{name}` parameter."))
			};

			broker.complete_authorization(&param("state")?, &param("code")?).await?;
			println!("Authorization stored.");
		},
		Err(e) => return Err(e.into()),
	}

	let client: Arc<MarketplaceClient<_>> = Arc::new(MarketplaceClient::new(broker));
	let service =
		FeeService::new(client).with_concurrency(settings.order_fetch_concurrency);
	let mean = service.calculated_offer_fee(&offer).await?;
	let pooled = service.calculated_total_offer_fee(&offer).await?;

	println!("Offer {offer}: mean fee {}, pooled fee {}.", mean.fee_percent, pooled.fee_percent);

	Ok(())
}

async fn read_line() -> Result<String> {
	let mut line = String::new();

	BufReader::new(io::stdin()).read_line(&mut line).await?;

	Ok(line)
}
