//! Many encrypted URLs under one validated token, each item succeeding or failing alone.

// crates.io
use serde::Serializer;
// self
use crate::{
	_prelude::*,
	client::ValidatedToken,
	decoder::{DecodedUrl, PlayableUrl, UrlDecoder},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// One requested item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
	/// Encrypted URL; absent or empty values fail the item.
	#[serde(default)]
	pub encrypted_url: Option<String>,
	/// Caller-supplied identifier echoed back in the result.
	#[serde(default)]
	pub video_id: Option<String>,
}
impl BatchItem {
	/// Convenience constructor.
	pub fn new(encrypted_url: impl Into<String>, video_id: Option<String>) -> Self {
		Self { encrypted_url: Some(encrypted_url.into()), video_id }
	}
}

/// Why a single item failed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ItemFailure {
	/// Item carried no encrypted URL.
	#[error("Missing encrypted_url")]
	MissingEncryptedUrl,
	/// Encrypted URL did not decode under the batch token.
	#[error("Failed to decode URL")]
	DecodeFailed,
	/// Item was not an object of the expected shape.
	#[error("{0}")]
	Malformed(String),
}
impl Serialize for ItemFailure {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}

/// Outcome of one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemResult {
	/// Identifier echoed from the request.
	pub video_id: Option<String>,
	/// Decoded and signed URLs, or the reason the item failed.
	pub outcome: Result<(DecodedUrl, PlayableUrl), ItemFailure>,
}
impl ItemResult {
	/// Whether the item produced a playable URL.
	pub fn is_success(&self) -> bool {
		self.outcome.is_ok()
	}
}
impl Serialize for ItemResult {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		#[derive(Serialize)]
		struct Wire<'a> {
			video_id: Option<&'a str>,
			success: bool,
			#[serde(skip_serializing_if = "Option::is_none")]
			video_url: Option<&'a PlayableUrl>,
			#[serde(skip_serializing_if = "Option::is_none")]
			decoded_url: Option<&'a DecodedUrl>,
			#[serde(skip_serializing_if = "Option::is_none")]
			error: Option<&'a ItemFailure>,
		}

		let (decoded_url, video_url, error) = match &self.outcome {
			Ok((decoded, playable)) => (Some(decoded), Some(playable), None),
			Err(failure) => (None, None, Some(failure)),
		};

		Wire {
			video_id: self.video_id.as_deref(),
			success: self.outcome.is_ok(),
			video_url,
			decoded_url,
			error,
		}
		.serialize(serializer)
	}
}

/// Aggregate outcome of a batch, in request order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchReport {
	/// Per-item results.
	pub results: Vec<ItemResult>,
	/// Number of items requested.
	pub total: usize,
	/// Number of items that produced a playable URL.
	pub successful: usize,
	/// Instant the batch completed.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// Request entry that may or may not have parsed as a [`BatchItem`].
pub type BatchEntry = Result<BatchItem, ItemFailure>;

impl UrlDecoder {
	/// Decodes and signs every item under `token`. One item's failure never affects another.
	pub fn decode_batch<I>(&self, token: &ValidatedToken, items: I) -> BatchReport
	where
		I: IntoIterator<Item = BatchEntry>,
	{
		let _guard = OpSpan::for_token(OpKind::Batch, "decode_batch", token.token()).entered();

		obs::record_op_outcome(OpKind::Batch, OpOutcome::Attempt);

		let results = items
			.into_iter()
			.map(|entry| match entry {
				Ok(item) => self.decode_item(token, item),
				Err(failure) => ItemResult { video_id: None, outcome: Err(failure) },
			})
			.collect::<Vec<_>>();
		let successful = results.iter().filter(|result| result.is_success()).count();

		obs::record_op_outcome(OpKind::Batch, OpOutcome::Success);
		obs::record_batch_items(results.len(), successful);

		BatchReport { total: results.len(), successful, results, timestamp: self.get_timestamp() }
	}

	fn decode_item(&self, token: &ValidatedToken, item: BatchItem) -> ItemResult {
		let outcome = match item.encrypted_url.as_deref().filter(|url| !url.is_empty()) {
			None => Err(ItemFailure::MissingEncryptedUrl),
			Some(encrypted) => self
				.resolve(encrypted, token)
				.map(|resolved| (resolved.decoded, resolved.playable))
				.ok_or(ItemFailure::DecodeFailed),
		};

		ItemResult { video_id: item.video_id, outcome }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{AuthToken, SubjectId, TokenInfo},
		clock::FixedClock,
		decoder::{SealedCodec, SignerConfig, UrlCodec},
	};

	fn validated() -> ValidatedToken {
		let info = TokenInfo::builder(SubjectId::new("u-5").expect("Subject fixture should be valid."))
			.expires_at(macros::datetime!(2030-01-01 00:00 UTC))
			.build()
			.expect("Token info fixture should build.");

		ValidatedToken::new(AuthToken::new("batch-token"), info)
	}

	#[test]
	fn five_items_two_malformed() {
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let signer = SignerConfig::new("edge-secret").build().expect("Signer should build.");
		let decoder = UrlDecoder::new(Arc::new(SealedCodec), signer).with_clock(clock);
		let token = validated();
		let seal = |n: u8| SealedCodec.encode(&format!("https://cdn.example.com/{n}.mp4"), token.token());
		let items = vec![
			Ok(BatchItem::new(seal(1), Some("v1".into()))),
			Ok(BatchItem::new("garbage", Some("v2".into()))),
			Ok(BatchItem::new(seal(3), Some("v3".into()))),
			Ok(BatchItem { encrypted_url: None, video_id: Some("v4".into()) }),
			Ok(BatchItem::new(seal(5), None)),
		];
		let report = decoder.decode_batch(&token, items);

		assert_eq!(report.total, 5);
		assert_eq!(report.successful, 3);
		assert_eq!(report.results[1].outcome, Err(ItemFailure::DecodeFailed));
		assert_eq!(report.results[3].outcome, Err(ItemFailure::MissingEncryptedUrl));
		assert_eq!(report.timestamp, macros::datetime!(2025-01-01 00:00 UTC));

		let json = serde_json::to_value(&report).expect("Report should serialize.");

		assert_eq!(json["results"][1]["error"], "Failed to decode URL");
		assert_eq!(json["results"][3]["video_id"], "v4");
		assert_eq!(json["results"][4]["video_id"], serde_json::Value::Null);
		assert!(json["results"][0]["video_url"].as_str().is_some_and(|url| url.contains("signature=")));
		assert_eq!(json["timestamp"], "2025-01-01T00:00:00Z");
	}

	#[test]
	fn malformed_entries_are_reported_in_place() {
		let signer = SignerConfig::new("edge-secret").build().expect("Signer should build.");
		let decoder = UrlDecoder::new(Arc::new(SealedCodec), signer);
		let report = decoder.decode_batch(
			&validated(),
			[Err(ItemFailure::Malformed("item must be an object".into()))],
		);

		assert_eq!(report.successful, 0);
		assert_eq!(
			serde_json::to_value(&report.results[0]).expect("Result should serialize."),
			serde_json::json!({ "video_id": null, "success": false, "error": "item must be an object" })
		);
	}
}
