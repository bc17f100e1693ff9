//! Shared helpers for flow implementations (facade construction, write-through, guards).

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientIdentity, StoredToken},
	flows::TokenBroker,
	http::BrokerHttpClient,
	oauth::BasicFacade,
};

/// Returns (and creates on demand) the single-flight guard for a client identity.
pub(crate) fn flow_guard<C>(broker: &TokenBroker<C>, client: &ClientIdentity) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + BrokerHttpClient,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(client.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Builds the token endpoint facade for the broker's descriptor and credentials.
pub(crate) fn facade<C>(broker: &TokenBroker<C>) -> Result<BasicFacade<C>>
where
	C: ?Sized + BrokerHttpClient,
{
	BasicFacade::from_descriptor(
		&broker.descriptor,
		&broker.client,
		&broker.client_secret,
		broker.http_client.clone(),
	)
}

/// Writes a freshly issued user token through to the store and the cache.
pub(crate) async fn write_through<C>(
	broker: &TokenBroker<C>,
	record: StoredToken,
) -> Result<AccessToken>
where
	C: ?Sized + BrokerHttpClient,
{
	let access = record.access();

	broker.store.upsert(record).await?;
	broker.cache.put(broker.client.clone(), access.clone());

	Ok(access)
}
