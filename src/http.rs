//! TLS-hardened, pooled HTTP transport shared by every authenticator.
//!
//! [`AuthTransport`] wraps a [`ReqwestClient`] built on a preconfigured `rustls` config: a
//! minimum protocol version, an AEAD-only cipher suite allow-list, Mozilla roots, bounded pooling,
//! explicit timeouts, and no redirect following. Only method, redacted URL, status, and duration
//! are logged; headers and bodies never are.

// std
use std::time::Instant;
// crates.io
use reqwest::{
	Method, Request, RequestBuilder, Response,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use rustls::{
	CipherSuite, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
	SupportedCipherSuite, SupportedProtocolVersion,
	client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
	crypto::{self, CryptoProvider},
	pki_types::{CertificateDer, ServerName, UnixTime},
	version::{TLS12, TLS13},
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	config::{AuthConfig, TlsVersion},
	obs,
};

/// AEAD suites the transport will ever offer, with their IANA names.
const CIPHER_ALLOW_LIST: [(CipherSuite, &str); 9] = [
	(CipherSuite::TLS13_AES_256_GCM_SHA384, "TLS_AES_256_GCM_SHA384"),
	(CipherSuite::TLS13_AES_128_GCM_SHA256, "TLS_AES_128_GCM_SHA256"),
	(CipherSuite::TLS13_CHACHA20_POLY1305_SHA256, "TLS_CHACHA20_POLY1305_SHA256"),
	(
		CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
		"TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
	),
	(
		CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
		"TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
	),
	(
		CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
		"TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
	),
	(CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"),
	(CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"),
	(
		CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
		"TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
	),
];

/// Failures while assembling the TLS client configuration.
#[derive(Debug, ThisError)]
pub enum TlsConfigError {
	/// A configured cipher suite name is not on the allow-list.
	#[error("Cipher suite `{name}` is not an allowed AEAD suite.")]
	UnknownCipherSuite {
		/// Name as configured.
		name: String,
	},
	/// Narrowing left no suite usable with the configured protocol versions.
	#[error("No allowed cipher suite remains for TLS {min_version} and above.")]
	NoCipherSuites {
		/// Configured protocol floor.
		min_version: TlsVersion,
	},
	/// rustls rejected the provider/protocol combination.
	#[error("rustls rejected the TLS configuration: {0}.")]
	Rustls(#[from] rustls::Error),
}

/// Pooled, TLS-hardened HTTP transport.
#[derive(Clone, Debug)]
pub struct AuthTransport {
	client: ReqwestClient,
}
impl AuthTransport {
	/// Builds the transport from `config`.
	pub fn new(config: &AuthConfig) -> Result<Self> {
		let tls = tls_client_config(config)?;
		let client = ReqwestClient::builder()
			.use_preconfigured_tls(tls)
			.connect_timeout(config.connect_timeout)
			.timeout(config.request_timeout)
			.pool_max_idle_per_host(config.pool_max_idle_per_host)
			.pool_idle_timeout(config.pool_idle_timeout)
			.redirect(Policy::none())
			.build()
			.map_err(|e| Error::config("HTTP client could not be constructed.").with_source(e))?;

		Ok(Self { client })
	}

	/// Wraps an already configured client (tests, custom stacks).
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client }
	}

	/// Underlying pooled client.
	pub fn client(&self) -> &ReqwestClient {
		&self.client
	}

	/// Starts a request on the pooled client.
	pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
		self.client.request(method, url)
	}

	/// Finalizes a builder, classifying failures as configuration errors.
	pub fn build(builder: RequestBuilder) -> Result<Request> {
		builder.build().map_err(classify)
	}

	/// Sends `request`, classifying transport failures. Any HTTP status is returned as-is.
	pub async fn send(&self, request: Request) -> Result<Response> {
		let method = request.method().clone();
		let url = request.url().clone();
		let started = Instant::now();

		match self.client.execute(request).await {
			Ok(response) => {
				obs::record_http(
					method.as_str(),
					&url,
					Some(response.status().as_u16()),
					started.elapsed(),
				);

				Ok(response)
			},
			Err(e) => {
				obs::record_http(method.as_str(), &url, None, started.elapsed());

				Err(classify(e))
			},
		}
	}

	/// Sends `request` and classifies any non-2xx response exactly once.
	pub async fn send_checked(&self, request: Request) -> Result<Response> {
		let response = self.send(request).await?;
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		let retry_after = parse_retry_after(response.headers());
		let body = response.text().await.ok();
		let err = Error::from_status(status.as_u16(), body);

		Err(match retry_after {
			Some(hint) => err.with_retry_after(hint),
			None => err,
		})
	}

	/// Decodes a JSON body, reporting the failing field path on error.
	pub async fn read_json<T>(response: Response) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let bytes = response.bytes().await.map_err(classify)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			let path = e.path().to_string();

			Error::data_invalid(format!("Response body did not match the expected shape at `{path}`."))
				.with_source(e.into_inner())
		})
	}
}

/// Builds the rustls client configuration described by `config`.
pub fn tls_client_config(config: &AuthConfig) -> Result<ClientConfig, TlsConfigError> {
	let min_version = effective_min_version(config.tls_min_version);
	let base = crypto::ring::default_provider();
	let suites = allowed_cipher_suites(&base.cipher_suites, &config.cipher_suites, min_version)?;
	let provider = Arc::new(CryptoProvider { cipher_suites: suites, ..base });
	let versions: &[&'static SupportedProtocolVersion] = match min_version {
		TlsVersion::V1_3 => &[&TLS13],
		_ => &[&TLS12, &TLS13],
	};
	let roots = RootCertStore { roots: webpki_roots::TLS_SERVER_ROOTS.to_vec() };
	let mut tls = ClientConfig::builder_with_provider(provider.clone())
		.with_protocol_versions(versions)?
		.with_root_certificates(roots)
		.with_no_client_auth();

	if !config.verify_ssl {
		obs::log_security_warning(
			"TLS certificate verification is disabled; connections can be intercepted.",
		);
		tls.dangerous().set_certificate_verifier(Arc::new(NoVerifier(provider)));
	}

	Ok(tls)
}

/// Filters `available` down to the allow-list, optionally narrowed by `requested` names.
pub fn allowed_cipher_suites(
	available: &[SupportedCipherSuite],
	requested: &[String],
	min_version: TlsVersion,
) -> Result<Vec<SupportedCipherSuite>, TlsConfigError> {
	let mut permitted = Vec::with_capacity(CIPHER_ALLOW_LIST.len());

	for name in requested {
		let normalized = name.trim().to_ascii_uppercase();
		let Some((suite, _)) = CIPHER_ALLOW_LIST.iter().find(|(suite, iana)| {
			*iana == normalized || format!("{suite:?}") == normalized
		}) else {
			return Err(TlsConfigError::UnknownCipherSuite { name: name.clone() });
		};

		permitted.push(*suite);
	}
	if permitted.is_empty() {
		permitted.extend(CIPHER_ALLOW_LIST.iter().map(|(suite, _)| *suite));
	}

	let suites = available
		.iter()
		.copied()
		.filter(|supported| permitted.contains(&supported.suite()))
		.filter(|supported| min_version < TlsVersion::V1_3 || supported.tls13().is_some())
		.collect::<Vec<_>>();

	if suites.is_empty() {
		return Err(TlsConfigError::NoCipherSuites { min_version });
	}

	Ok(suites)
}

/// Parses a `Retry-After` header given as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		return Duration::try_from(moment - OffsetDateTime::now_utc()).ok();
	}

	None
}

fn effective_min_version(requested: TlsVersion) -> TlsVersion {
	if requested < TlsVersion::V1_2 {
		obs::log_security_warning(
			"TLS 1.0 and 1.1 are not supported; raising the minimum protocol version to 1.2.",
		);

		return TlsVersion::V1_2;
	}

	requested
}

fn classify(e: ReqwestError) -> Error {
	if e.is_builder() {
		Error::config("HTTP request could not be built.").with_source(e)
	} else if e.is_decode() {
		Error::data_invalid("Response body could not be decoded.").with_source(e)
	} else {
		Error::network(e)
	}
}

/// Accepts any server certificate. Installed only when verification is explicitly disabled.
#[derive(Debug)]
struct NoVerifier(Arc<CryptoProvider>);
impl ServerCertVerifier for NoVerifier {
	fn verify_server_cert(
		&self,
		_end_entity: &CertificateDer<'_>,
		_intermediates: &[CertificateDer<'_>],
		_server_name: &ServerName<'_>,
		_ocsp_response: &[u8],
		_now: UnixTime,
	) -> Result<ServerCertVerified, rustls::Error> {
		Ok(ServerCertVerified::assertion())
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.0.signature_verification_algorithms.supported_schemes()
	}
}
