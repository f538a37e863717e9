use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Minimal Daraja (M-Pesa Express) client built on reqwest.
pub struct MpesaClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    business_short_code: String,
    passkey: String,
    callback_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StkPushRequest {
    /// Already normalised to the `254…` form.
    pub phone_number: String,
    /// Whole currency units.
    pub amount: i64,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'a str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    call_back_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'a str,
}

#[derive(Debug, Deserialize)]
struct DarajaErrorEnvelope {
    #[serde(rename = "requestId")]
    request_id: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Asynchronous STK result posted to the callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Looks up a metadata item by name, rendering numbers and strings alike.
    pub fn metadata_value(&self, name: &str) -> Option<String> {
        let item = self
            .callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?;

        match item.value.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn receipt_number(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber")
    }
}

/// Fixed acknowledgement returned to Daraja for every callback delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Success".to_string(),
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

impl MpesaClient {
    pub fn new(
        base_url: String,
        consumer_key: String,
        consumer_secret: String,
        business_short_code: String,
        passkey: String,
        callback_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            consumer_key,
            consumer_secret,
            business_short_code,
            passkey,
            callback_url,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (request_id, error_code, error_message) =
            match serde_json::from_str::<DarajaErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope.request_id,
                    envelope.error_code,
                    envelope.error_message,
                ),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            mpesa_request_id = ?request_id,
            mpesa_error_code = ?error_code,
            mpesa_error_message = ?error_message,
            response_body = %body,
            context = %context,
            "mpesa api request failed"
        );

        match error_message {
            Some(message) => anyhow::bail!("M-Pesa {} failed: {} (status {})", context, message, status),
            None => anyhow::bail!("M-Pesa {} failed (status {})", context, status),
        }
    }

    /// OAuth client-credentials token. https://developer.safaricom.co.ke/APIs/Authorization
    pub async fn get_access_token(&self) -> Result<String> {
        let resp = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.base_url
            ))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .context("M-Pesa token request could not be sent")?;
        let resp = Self::ensure_success(resp, "access token").await?;

        #[derive(Deserialize)]
        struct TokenResp {
            access_token: String,
        }

        let parsed: TokenResp = resp.json().await?;
        Ok(parsed.access_token)
    }

    /// `base64(shortcode + passkey + timestamp)`.
    pub fn generate_password(&self, timestamp: &str) -> String {
        STANDARD.encode(format!(
            "{}{}{}",
            self.business_short_code, self.passkey, timestamp
        ))
    }

    pub async fn initiate_stk_push(&self, request: StkPushRequest) -> Result<StkPushResponse> {
        let access_token = self.get_access_token().await?;
        let timestamp = format_timestamp(Utc::now());

        let body = StkPushBody {
            business_short_code: &self.business_short_code,
            password: self.generate_password(&timestamp),
            timestamp,
            transaction_type: TRANSACTION_TYPE,
            amount: request.amount,
            party_a: &request.phone_number,
            party_b: &self.business_short_code,
            phone_number: &request.phone_number,
            call_back_url: &self.callback_url,
            account_reference: &request.account_reference,
            transaction_desc: &request.transaction_desc,
        };

        let resp = self
            .http
            .post(format!("{}/mpesa/stkpush/v1/processrequest", self.base_url))
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .context("M-Pesa STK push request could not be sent")?;
        let resp = Self::ensure_success(resp, "STK push").await?;

        let parsed: StkPushResponse = resp.json().await?;

        info!(
            checkout_request_id = %parsed.checkout_request_id,
            response_code = ?parsed.response_code,
            "mpesa stk push accepted"
        );

        Ok(parsed)
    }
}
