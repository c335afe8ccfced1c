//! JSON output formats (CLI `--json` and HTTP responses).

use serde::Serialize;

#[derive(Serialize)]
pub struct SignJson<'a> {
    pub status: &'a str,
    pub command: &'a str,
    pub input: String,
    pub output: Option<String>,
    pub signature: String,
    pub key_fingerprint: String,
    pub digest_sri: String,
}

#[derive(Serialize)]
pub struct VerifyJson<'a> {
    pub status: &'a str,
    pub command: &'a str,
    pub input: String,
    pub valid: bool,
    pub key_fingerprint: String,
    pub digest_sri: String,
}

#[derive(Serialize)]
pub struct PublicKeyJson<'a> {
    pub status: &'a str,
    pub command: &'a str,
    pub public_key_pem: String,
    pub key_fingerprint: String,
    pub modulus_length: usize,
    pub divisor_length: usize,
}

#[derive(Serialize)]
pub struct ErrorJson<'a> {
    pub status: &'a str,
    pub error: String,
    pub causes: Vec<String>,
}

/// `POST /sign` success body.
#[derive(Serialize)]
pub struct SignResponse {
    pub success: bool,
    pub signature: String,
}

/// `POST /verify` success body; `valid` may be false.
#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub valid: bool,
}

/// Rejected request (missing upload, missing signature, oversized file).
#[derive(Serialize)]
pub struct RejectionResponse {
    pub success: bool,
    pub error: String,
}

/// Internal failure while signing or verifying.
#[derive(Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
    pub key_fingerprint: String,
    pub modulus_length: usize,
    pub divisor_length: usize,
}
