use crate::bot::Message;
use crate::config::timeout;
use crate::spam::{OracleError, SpamOracle, Verdict};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CasResponse {
    ok: bool,
    #[serde(default)]
    description: String,
}

/// Combot Anti-Spam lookup: `GET {api}/check?user_id=N`, `ok=true` means a known spammer.
pub struct CasOracle {
    client: Client,
    api: String,
}

impl CasOracle {
    pub fn new(api: impl Into<String>) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout::ORACLE).build()?;
        Ok(Self {
            client,
            api: api.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpamOracle for CasOracle {
    fn name(&self) -> &str {
        "cas"
    }

    async fn check(&self, msg: &Message) -> Result<Verdict, OracleError> {
        let resp = self
            .client
            .get(format!("{}/check", self.api))
            .query(&[("user_id", msg.from.id)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(OracleError::Status(resp.status().as_u16()));
        }
        let body = resp.bytes().await?;
        let cas: CasResponse =
            serde_json::from_slice(&body).map_err(|e| OracleError::Decode(e.to_string()))?;
        if cas.ok {
            let reason = if cas.description.is_empty() {
                "listed in CAS".to_string()
            } else {
                cas.description
            };
            return Ok(Verdict::Spam(reason));
        }
        Ok(Verdict::Ham)
    }
}
