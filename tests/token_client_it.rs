#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use vidurl_broker::{
	authority::{AuthorityDescriptor, HttpTokenAuthority},
	client::TokenClient,
	error::{Error, PreconditionError},
};

fn build_client(server: &MockServer) -> TokenClient {
	let descriptor = AuthorityDescriptor::builder()
		.introspection_endpoint(
			Url::parse(&server.url("/introspect"))
				.expect("Mock introspection endpoint should parse successfully."),
		)
		.allow_insecure(true)
		.client_id("decoder")
		.client_secret("decoder-secret")
		.build()
		.expect("Authority descriptor should build successfully.");
	let authority =
		HttpTokenAuthority::new(descriptor).expect("Authority HTTP client should build successfully.");

	TokenClient::new(Arc::new(authority))
}

#[tokio::test]
async fn active_token_validates_and_exposes_claims() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect").form_urlencoded_tuple("token", "live-token");
			then.status(200).header("content-type", "application/json").body(
				"{\"active\":true,\"sub\":\"student-7\",\"exp\":4102444800,\"iat\":1735689600,\"scope\":\"video.play\"}",
			);
		})
		.await;
	let client = build_client(&server);

	assert!(client.validate("live-token").await);

	let info =
		client.get_token_info("live-token").await.expect("Active token should expose metadata.");

	assert_eq!(info.subject.as_ref(), "student-7");
	assert!(info.scopes.contains("video.play"));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn expired_token_fails_closed_and_yields_no_metadata() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"active\":true,\"sub\":\"student-7\",\"exp\":1600000000}");
		})
		.await;
	let client = build_client(&server);

	assert!(!client.validate("expired-token-X").await);

	let err = client
		.get_token_info("expired-token-X")
		.await
		.expect_err("Expired tokens must not yield metadata.");

	assert!(matches!(err, Error::Precondition(PreconditionError::UnvalidatedToken { .. })));
}

#[tokio::test]
async fn rejection_and_outage_both_fail_closed() {
	let server = MockServer::start_async().await;
	let mut rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_token\"}");
		})
		.await;
	let client = build_client(&server);

	assert!(!client.validate("revoked-token").await);

	rejected.delete_async().await;

	let _outage = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(503).header("retry-after", "30").body("maintenance");
		})
		.await;

	assert!(!client.validate("any-token").await);

	match client.get_token_info("any-token").await {
		Err(Error::Precondition(PreconditionError::UnvalidatedToken { source })) =>
			assert!(!source.is_rejection(), "Outages must stay distinguishable from rejections."),
		other => panic!("Unexpected result: {other:?}."),
	}
}

#[tokio::test]
async fn slow_authority_counts_as_invalid() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(200)
				.delay(std::time::Duration::from_secs(3))
				.header("content-type", "application/json")
				.body("{\"active\":true,\"sub\":\"student-7\",\"exp\":4102444800}");
		})
		.await;
	let client = build_client(&server).with_timeout(Duration::milliseconds(200));

	assert!(!client.validate("live-token").await);
}

#[tokio::test]
async fn malformed_tokens_never_reach_the_authority() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(200).body("{\"active\":true}");
		})
		.await;
	let client = build_client(&server);

	assert!(!client.validate("").await);
	assert!(!client.validate("two words").await);
	assert!(!client.validate("line\nbreak").await);

	mock.assert_calls_async(0).await;
}
