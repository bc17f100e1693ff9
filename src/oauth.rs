//! Internal OAuth client facade over the `oauth2` crate.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::StatusCode,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, StoredToken, TokenSecret},
	error::ConfigError,
	http::{self, BrokerHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{GrantType, MarketplaceDescriptor},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

pub(crate) trait OAuth2Facade {
	fn exchange_client_credentials<'a>(
		&'a self,
		client: &'a ClientIdentity,
	) -> FacadeFuture<'a, StoredToken>;

	fn refresh_token<'a>(
		&'a self,
		client: &'a ClientIdentity,
		refresh_token: &'a TokenSecret,
	) -> FacadeFuture<'a, StoredToken>;

	fn exchange_authorization_code<'a>(
		&'a self,
		client: &'a ClientIdentity,
		code: &'a str,
		pkce_verifier: &'a str,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, StoredToken>;
}

/// Token endpoint facade. Client credentials travel as HTTP Basic auth on every grant.
pub(crate) struct BasicFacade<C>
where
	C: ?Sized + BrokerHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
}
impl<C> BasicFacade<C>
where
	C: ?Sized + BrokerHttpClient,
{
	pub(crate) fn from_descriptor(
		descriptor: &MarketplaceDescriptor,
		client_id: &ClientIdentity,
		client_secret: &TokenSecret,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_string()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		Ok(Self { oauth_client, http_client: http_client.into() })
	}
}
impl<C> OAuth2Facade for BasicFacade<C>
where
	C: ?Sized + BrokerHttpClient,
{
	fn exchange_client_credentials<'a>(
		&'a self,
		client: &'a ClientIdentity,
	) -> FacadeFuture<'a, StoredToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let response = self
				.oauth_client
				.exchange_client_credentials()
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(GrantType::ClientCredentials, meta.take(), err))?;
			let status = meta.take().and_then(|value| value.status);

			map_token_response(GrantType::ClientCredentials, status, client, response)
		})
	}

	fn refresh_token<'a>(
		&'a self,
		client: &'a ClientIdentity,
		refresh_token: &'a TokenSecret,
	) -> FacadeFuture<'a, StoredToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(GrantType::RefreshToken, meta.take(), err))?;
			let status = meta.take().and_then(|value| value.status);

			map_token_response(GrantType::RefreshToken, status, client, response)
		})
	}

	fn exchange_authorization_code<'a>(
		&'a self,
		client: &'a ClientIdentity,
		code: &'a str,
		pkce_verifier: &'a str,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, StoredToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let redirect_url = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidDescriptor { source })?;
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url))
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(GrantType::AuthorizationCode, meta.take(), err))?;
			let status = meta.take().and_then(|value| value.status);

			if response.refresh_token().is_none() {
				return Err(upstream_auth(
					GrantType::AuthorizationCode,
					status,
					"Token response carries no refresh_token.".into(),
				));
			}

			map_token_response(GrantType::AuthorizationCode, status, client, response)
		})
	}
}

fn map_token_response(
	grant: GrantType,
	status: Option<u16>,
	client: &ClientIdentity,
	response: FacadeTokenResponse,
) -> Result<StoredToken> {
	let expires_in = response
		.expires_in()
		.ok_or_else(|| {
			upstream_auth(grant, status, "Token response carries no expires_in.".into())
		})?
		.as_secs();
	let expires_in = i64::try_from(expires_in)
		.ok()
		.filter(|secs| *secs > 0)
		.ok_or_else(|| {
			let reason = format!("Token response expires_in {expires_in} is invalid.");

			upstream_auth(grant, status, reason)
		})?;

	let mut builder = StoredToken::builder(client.clone())
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in));

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|e| ConfigError::from(e).into())
}

fn map_request_error<E>(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);
	let failed_status = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::ServerResponse(response) =>
			upstream_auth(grant, status, server_reason(&response, status)),
		RequestTokenError::Request(error) => http::map_http_client_error(error).into(),
		RequestTokenError::Parse(_, _) if failed_status.is_some() =>
			upstream_auth(grant, failed_status, canonical_reason(failed_status)),
		RequestTokenError::Parse(source, _) =>
			Error::MalformedResponse { resource: "token", source },
		RequestTokenError::Other(message) if failed_status.is_some() => upstream_auth(
			grant,
			failed_status,
			format!("{} ({message})", canonical_reason(failed_status)),
		),
		RequestTokenError::Other(message) => upstream_auth(grant, status, message),
	}
}

fn upstream_auth(grant: GrantType, status: Option<u16>, reason: String) -> Error {
	Error::UpstreamAuth { grant: grant.as_str(), status, reason }
}

fn server_reason(response: &BasicErrorResponse, status: Option<u16>) -> String {
	match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None if status.is_some() =>
			format!("{}: {}", canonical_reason(status), response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	}
}

fn canonical_reason(status: Option<u16>) -> String {
	status
		.and_then(|code| StatusCode::from_u16(code).ok())
		.and_then(|code| code.canonical_reason())
		.unwrap_or("Unknown")
		.to_owned()
}
