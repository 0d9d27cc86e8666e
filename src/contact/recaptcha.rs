//! Risk-score verification of the client's challenge token (reCAPTCHA v3)

use crate::config::RecaptchaConfig;
use serde::Deserialize;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification secret is not configured")]
    MissingSecret,

    #[error("no verification token submitted")]
    MissingToken,

    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token rejected by verification service: {codes:?}")]
    Denied { codes: Vec<String> },

    #[error("verification response carried no score")]
    MissingScore,

    #[error("score {score} below minimum {min}")]
    LowScore { score: f64, min: f64 },
}

pub trait RiskVerifier: Send + Sync {
    /// Verify `token`, returning the accepted score
    fn verify(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> impl Future<Output = Result<f64, VerifyError>> + Send;
}

/// `siteverify` response body
#[derive(Debug, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Apply the acceptance rules to a service response
pub fn evaluate(response: SiteVerifyResponse, min_score: f64) -> Result<f64, VerifyError> {
    if !response.success {
        return Err(VerifyError::Denied {
            codes: response.error_codes,
        });
    }
    let score = response.score.ok_or(VerifyError::MissingScore)?;
    if score < min_score {
        return Err(VerifyError::LowScore {
            score,
            min: min_score,
        });
    }
    Ok(score)
}

pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
    min_score: f64,
}

impl RecaptchaVerifier {
    pub fn from_config(cfg: &RecaptchaConfig) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            secret: cfg.secret_key.clone(),
            verify_url: cfg.verify_url.clone(),
            min_score: cfg.min_score,
        })
    }
}

impl RiskVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<f64, VerifyError> {
        if self.secret.is_empty() {
            return Err(VerifyError::MissingSecret);
        }
        if token.is_empty() {
            return Err(VerifyError::MissingToken);
        }

        let remote_ip = remote_ip.map(|ip| ip.to_string()).unwrap_or_default();
        let params = [
            ("secret", self.secret.as_str()),
            ("response", token),
            ("remoteip", remote_ip.as_str()),
        ];
        let response = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await?;

        evaluate(response, self.min_score)
    }
}
