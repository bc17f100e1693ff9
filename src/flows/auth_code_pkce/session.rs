// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, provider::MarketplaceDescriptor};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_BYTES: usize = 32;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Pending Authorization Code + PKCE handshake.
///
/// The seller visits [`authorize_url`](Self::authorize_url); the host hands the returned
/// `state` and `code` to [`TokenBroker::complete_authorization`](crate::flows::TokenBroker::complete_authorization)
/// before [`expires_at`](Self::expires_at).
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL the seller should visit.
	pub authorize_url: Url,
	/// Instant the session was opened.
	pub created_at: OffsetDateTime,
	/// Instant after which the session no longer accepts a code.
	pub expires_at: OffsetDateTime,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// Returns `true` once the session can no longer be completed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::AuthorizationStateMismatch) }
	}

	pub(super) fn verifier(&self) -> &str {
		&self.pkce.verifier
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("created_at", &self.created_at)
			.field("expires_at", &self.expires_at)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let mut entropy = [0_u8; PKCE_VERIFIER_BYTES];

		rand::rng().fill(&mut entropy);

		let verifier = URL_SAFE_NO_PAD.encode(entropy);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(super) fn build_session(
	descriptor: &MarketplaceDescriptor,
	client_id: &str,
	now: OffsetDateTime,
	ttl: Duration,
) -> AuthorizationSession {
	let state = random_string(STATE_LEN);
	let pkce = PkcePair::generate();
	let redirect_uri = descriptor.redirect_uri.clone();
	let authorize_url = build_authorize_url(descriptor, client_id, &state, &pkce);

	AuthorizationSession {
		state,
		redirect_uri,
		authorize_url,
		created_at: now,
		expires_at: now + ttl,
		pkce,
	}
}

fn build_authorize_url(
	descriptor: &MarketplaceDescriptor,
	client_id: &str,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", descriptor.redirect_uri.as_str());
	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge_method", pkce.method.as_str());
	pairs.append_pair("code_challenge", &pkce.challenge);

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor() -> MarketplaceDescriptor {
		MarketplaceDescriptor::builder()
			.authorization_endpoint(
				Url::parse("https://allegro.pl/auth/oauth/authorize")
					.expect("Authorization URL fixture should parse."),
			)
			.token_endpoint(
				Url::parse("https://allegro.pl/auth/oauth/token")
					.expect("Token URL fixture should parse."),
			)
			.api_base(Url::parse("https://api.allegro.pl/").expect("API base fixture should parse."))
			.build()
			.expect("Descriptor fixture should build.")
	}

	#[test]
	fn challenge_matches_rfc7636_example() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn verifier_carries_32_bytes_of_entropy() {
		let pair = PkcePair::generate();

		assert_eq!(pair.verifier.len(), 43);
		assert!(!pair.verifier.contains('='));
		assert_eq!(pair.challenge, compute_pkce_challenge(&pair.verifier));
	}

	#[test]
	fn authorize_url_carries_pkce_parameters() {
		let now = OffsetDateTime::now_utc();
		let session = build_session(&descriptor(), "client-pkce", now, Duration::minutes(10));
		let query: HashMap<String, String> =
			session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(query.get("client_id").map(String::as_str), Some("client-pkce"));
		assert_eq!(query.get("redirect_uri").map(String::as_str), Some("http://localhost:8000/"));
		assert_eq!(query.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert_eq!(query.get("code_challenge").map(String::as_str), Some(session.code_challenge()));
		assert_eq!(query.get("state"), Some(&session.state));
		assert_eq!(session.expires_at - session.created_at, Duration::minutes(10));
		assert!(!session.authorize_url.as_str().contains(session.verifier()));
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let session = build_session(
			&descriptor(),
			"client-pkce",
			OffsetDateTime::now_utc(),
			Duration::minutes(10),
		);

		assert!(session.validate_state(&session.state.clone()).is_ok());
		assert!(matches!(session.validate_state("other"), Err(Error::AuthorizationStateMismatch)));
	}
}
