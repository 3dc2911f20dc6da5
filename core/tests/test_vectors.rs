//! Verify status classification and decoding against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each vector gives a simulated status and body and either the expected
//! decoded value or the expected error kind. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field ordering.

use bytes::Bytes;
use futures_util::stream;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use typed_http::{ApiError, BodyStream, NamingConvention, RawResponse, ResponseEnvelope, TransportError};

struct CannedReply {
    status: u16,
    headers: HeaderMap,
    body: Option<String>,
}

impl RawResponse for CannedReply {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn content_headers(&self) -> Option<&HeaderMap> {
        None
    }

    fn take_body(&mut self) -> Option<BodyStream> {
        let body = self.body.take()?;
        Some(Box::pin(stream::iter([Ok::<_, TransportError>(Bytes::from(body))])))
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "UserId")]
    user_id: u64,
    #[serde(rename = "DisplayName")]
    display_name: String,
}

#[tokio::test]
async fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let reply = CannedReply {
            status: case["status"].as_u64().unwrap() as u16,
            headers: HeaderMap::new(),
            body: case["body"].as_str().map(str::to_string),
        };
        let mut envelope = ResponseEnvelope::new(reply, NamingConvention::SnakeCase);
        let result = envelope.decode_or_fail::<User>().await;

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "UnexpectedEmptyResponse" => {
                    assert!(matches!(err, ApiError::UnexpectedEmptyResponse), "{name}: {err:?}")
                }
                "Decode" => assert!(matches!(err, ApiError::Decode { .. }), "{name}: {err:?}"),
                "UnexpectedStatus" => {
                    assert_eq!(err.status(), case["status"].as_u64().map(|s| s as u16), "{name}: status");
                    assert_eq!(err.body(), case["expected_body"].as_str(), "{name}: body");
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let user = result.unwrap();
            let wire = typed_http::wire::to_value(&user, NamingConvention::SnakeCase).unwrap();
            assert_eq!(wire, case["expected_result"], "{name}: decoded result");
        }
    }
}
