use crate::bot::Message;
use crate::llm::{ChatMessage, LlmClient, LlmError};
use crate::spam::{OracleError, SpamOracle, Verdict};
use async_trait::async_trait;

const PROMPT_HEAD: &str = "You are a spam filter for a podcast chat. \
Answer with exactly one word: SPAM if the next message is spam, OK otherwise. \
Known spam examples follow, one per line.\n";

/// Asks a language model whether the message looks like the known spam samples.
pub struct LlmOracle {
    client: LlmClient,
    system_prompt: String,
}

impl LlmOracle {
    /// Builds the system prompt from at most `prompt_size` characters of samples.
    pub fn new(client: LlmClient, samples: &[String], prompt_size: usize) -> Self {
        let mut prompt = String::from(PROMPT_HEAD);
        let mut used = 0;
        for sample in samples {
            let len = sample.chars().count() + 1;
            if used + len > prompt_size {
                break;
            }
            prompt.push_str(sample);
            prompt.push('\n');
            used += len;
        }
        Self {
            client,
            system_prompt: prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Http(e) => OracleError::Http(e),
            LlmError::Status { status, .. } => OracleError::Status(status),
            LlmError::Empty => OracleError::Decode("empty completion".to_string()),
        }
    }
}

#[async_trait]
impl SpamOracle for LlmOracle {
    fn name(&self) -> &str {
        "llm"
    }

    async fn check(&self, msg: &Message) -> Result<Verdict, OracleError> {
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(msg.text.clone()),
        ];
        let answer = self.client.complete(&messages, 1).await?;
        if answer.contains("SPAM") {
            return Ok(Verdict::Spam("llm says spam".to_string()));
        }
        Ok(Verdict::Ham)
    }
}
