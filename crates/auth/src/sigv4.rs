//! AWS Signature Version 4 query-string presigning.
//!
//! Only what MSK IAM tokens need: a presigned `GET /` with `host` as the sole
//! signed header and an empty body.
//!
//! ```text
//! canonical request ─sha256─► string to sign ─hmac(signing key)─► signature
//!                                                    ▲
//!   "AWS4"+secret ─hmac(date)─hmac(region)─hmac(service)─hmac("aws4_request")
//! ```

use crate::identity::AwsKeys;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of the empty string, the payload hash of a body-less request.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Derive the request signing key for one date/region/service scope.
pub fn signing_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> [u8; 32] {
    let k_date = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding as SigV4 expects it: everything but `A-Za-z0-9-_.~`.
pub fn uri_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Sorted, encoded `k=v&k=v` form of the query parameters.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Presigns `GET https://{host}/` for one service and region.
#[derive(Debug, Clone)]
pub struct Presigner<'a> {
    pub service: &'a str,
    pub region: &'a str,
    pub host: &'a str,
    pub expires_secs: u64,
}

impl Presigner<'_> {
    fn scope(&self, date: &str) -> String {
        format!("{date}/{}/{}/aws4_request", self.region, self.service)
    }

    /// All query parameters that take part in the signature.
    fn signed_params(
        &self,
        keys: &AwsKeys,
        params: &[(&str, &str)],
        at: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let date = at.format("%Y%m%d").to_string();
        let mut all: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        all.push(("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()));
        all.push((
            "X-Amz-Credential".to_string(),
            format!("{}/{}", keys.access_key_id(), self.scope(&date)),
        ));
        all.push((
            "X-Amz-Date".to_string(),
            at.format("%Y%m%dT%H%M%SZ").to_string(),
        ));
        all.push(("X-Amz-Expires".to_string(), self.expires_secs.to_string()));
        all.push(("X-Amz-SignedHeaders".to_string(), "host".to_string()));
        if let Some(token) = keys.session_token() {
            all.push(("X-Amz-Security-Token".to_string(), token.to_string()));
        }
        all
    }

    pub fn canonical_request(&self, query: &str) -> String {
        format!(
            "GET\n/\n{query}\nhost:{}\n\nhost\n{EMPTY_PAYLOAD_SHA256}",
            self.host
        )
    }

    pub fn string_to_sign(&self, canonical_request: &str, at: DateTime<Utc>) -> String {
        let date = at.format("%Y%m%d").to_string();
        format!(
            "{ALGORITHM}\n{}\n{}\n{}",
            at.format("%Y%m%dT%H%M%SZ"),
            self.scope(&date),
            sha256_hex(canonical_request.as_bytes())
        )
    }

    /// Produce the presigned URL, signature included.
    pub fn presign(&self, keys: &AwsKeys, params: &[(&str, &str)], at: DateTime<Utc>) -> String {
        let query = canonical_query(&self.signed_params(keys, params, at));
        let string_to_sign = self.string_to_sign(&self.canonical_request(&query), at);

        let date = at.format("%Y%m%d").to_string();
        let key = signing_key(keys.secret_access_key(), &date, self.region, self.service);
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        format!("https://{}/?{query}&X-Amz-Signature={signature}", self.host)
    }
}
