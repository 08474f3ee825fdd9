//! Validates a bearer token against a mock introspection endpoint secured with the
//! client-credentials grant, caching answers between calls.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_introspection::{
	cache::CachingHttpClient,
	http::ReqwestHttpClient,
	introspect::{EndpointProfile, IntrospectionConfig},
	reqwest::Client,
	secured::{ClientCredentialsConfig, SecuredHttpClient},
	services::RemoteTokenServices,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-bearer\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let check_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/check-token").header("authorization", "Bearer demo-bearer");
			then.status(200).header("content-type", "application/json").body(
				"{\"client_id\":\"demo-client\",\"scope\":\"read write\",\"user_id\":\"alice\",\"expires_in\":600}",
			);
		})
		.await;
	let config = IntrospectionConfig::builder(EndpointProfile::CheckToken)
		.endpoint(server.url("/check-token"))
		.build()?;
	let credentials = ClientCredentialsConfig::builder()
		.token_endpoint(server.url("/token"))
		.client_id("demo-resource-server")
		.client_secret("super-secret")
		.build()?;
	let http_client = ReqwestHttpClient::with_client(Client::builder().build()?);
	let secured = SecuredHttpClient::<ReqwestHttpClient>::new(credentials, http_client);
	let transport = <CachingHttpClient<SecuredHttpClient<ReqwestHttpClient>>>::new(secured);
	let services = RemoteTokenServices::with_http_client(config, transport);

	for _ in 0..2 {
		let authentication = services.load_authentication("opaque-token").await?;

		println!(
			"Authenticated {} via {} with authorities {:?}.",
			authentication.name(),
			authentication.client_id(),
			authentication.authorities()
		);
	}

	token_mock.assert_async().await;
	check_mock.assert_async().await;

	Ok(())
}
