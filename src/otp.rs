use async_trait::async_trait;
use std::sync::Arc;

// 1. OtpService Contract
/// OtpService
///
/// The abstract contract for the phone-verification collaborator. The core only
/// needs two operations: deliver a passcode and check one. Everything about the
/// provider (transport, channel, retry policy) stays behind this trait, so the
/// real client (TwilioVerifyClient) can be swapped for the in-memory mock
/// (MockOtpService) in tests.
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Asks the provider to deliver a one-time passcode to the phone number.
    async fn send_verification(&self, phone: &str) -> Result<(), String>;

    /// Checks a submitted passcode. `Ok(true)` means the provider approved it;
    /// `Ok(false)` means the code was wrong or stale. `Err` is a provider or
    /// transport failure.
    async fn check_verification(&self, phone: &str, code: &str) -> Result<bool, String>;
}

// 2. The Real Implementation (Twilio Verify)
/// TwilioVerifyClient
///
/// Concrete implementation over the Twilio Verify v2 REST API. Verification
/// state lives entirely on the provider side; this client holds no per-request
/// state beyond the shared HTTP connection pool.
#[derive(Clone)]
pub struct TwilioVerifyClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    verify_sid: String,
}

impl TwilioVerifyClient {
    pub fn new(account_sid: &str, auth_token: &str, verify_sid: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            verify_sid: verify_sid.to_string(),
        }
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "https://verify.twilio.com/v2/Services/{}/{}",
            self.verify_sid, resource
        )
    }
}

#[async_trait]
impl OtpService for TwilioVerifyClient {
    async fn send_verification(&self, phone: &str) -> Result<(), String> {
        let response = self
            .http
            .post(self.service_url("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Channel", "sms")])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("verification send failed: {}", response.status()))
        }
    }

    async fn check_verification(&self, phone: &str, code: &str) -> Result<bool, String> {
        let response = self
            .http
            .post(self.service_url("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Code", code)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("verification check failed: {}", response.status()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.get("status").and_then(|s| s.as_str()) == Some("approved"))
    }
}

// 3. The Mock Implementation (For Tests)
/// MockOtpService
///
/// In-memory stand-in used by unit and integration tests, and by local runs
/// that should not hit the real provider. Approves exactly one configured code.
#[derive(Clone)]
pub struct MockOtpService {
    /// When true, both operations return a simulated provider failure.
    pub should_fail: bool,
    /// The single passcode `check_verification` will approve.
    pub accepted_code: String,
}

impl MockOtpService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            accepted_code: "123456".to_string(),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            accepted_code: String::new(),
        }
    }
}

impl Default for MockOtpService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpService for MockOtpService {
    async fn send_verification(&self, _phone: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock OTP Error: simulation requested".to_string());
        }
        Ok(())
    }

    async fn check_verification(&self, _phone: &str, code: &str) -> Result<bool, String> {
        if self.should_fail {
            return Err("Mock OTP Error: simulation requested".to_string());
        }
        Ok(code == self.accepted_code)
    }
}

/// OtpState
///
/// The concrete type used to share the OTP collaborator across the app state.
pub type OtpState = Arc<dyn OtpService>;
