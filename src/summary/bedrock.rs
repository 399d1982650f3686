//! Bedrock Converse API summary generator.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock,
};

use crate::error::{AppError, Result};
use crate::models::{Movie, SummaryConfig};
use crate::summary::{SYSTEM_PROMPT, SummaryGenerator, build_prompt};

/// Summary generator backed by a Bedrock-hosted model.
pub struct BedrockSummaryGenerator {
    client: Client,
    model_id: String,
    max_tokens: i32,
}

impl BedrockSummaryGenerator {
    /// Create a new generator for the configured model.
    pub fn new(client: Client, config: &SummaryConfig) -> Self {
        Self {
            client,
            model_id: config.model_id.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl SummaryGenerator for BedrockSummaryGenerator {
    async fn generate(&self, movie: &Movie) -> Result<String> {
        let prompt = build_prompt(movie);
        log::info!("Generating summary for {} with {}", movie.movie_id, self.model_id);

        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(prompt))
            .build()
            .map_err(AppError::summary)?;

        let output = self
            .client
            .converse()
            .model_id(&self.model_id)
            .messages(message)
            .system(SystemContentBlock::Text(SYSTEM_PROMPT.to_string()))
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(self.max_tokens)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AppError::summary(DisplayErrorContext(e)))?;

        let reply = output
            .output()
            .and_then(|o| o.as_message().ok())
            .ok_or_else(|| AppError::summary("model returned no message"))?;

        // Only the first content block carries the summary
        let text = reply
            .content()
            .first()
            .and_then(|block| block.as_text().ok())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::summary("model returned no text"))?;

        Ok(text)
    }
}
