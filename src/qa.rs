//! Answer generation over retrieved transcript chunks.

use crate::error::{Result, YtqaError};
use crate::models::{format_timestamp, Answer, ScoredChunk};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use tracing::debug;

const SYSTEM_PROMPT_QA: &str = "You are a helpful assistant that answers questions about YouTube videos based on their transcripts.
When answering questions:
1. Use only the information provided in the transcript chunks
2. If you're not sure about something, say so
3. Include relevant timestamps [MM:SS] when referencing specific parts
4. Keep your answers concise and to the point
5. If the question can't be answered with the given context, say so";

/// Generates answers from retrieved context.
pub struct AnswerEngine {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
}

impl AnswerEngine {
    pub fn new(model: &str) -> Self {
        Self {
            client: crate::openai::create_client(),
            model: model.to_string(),
        }
    }

    /// Answer a question from retrieved chunks.
    ///
    /// With no context at all the engine returns a canned answer rather than
    /// calling the model.
    pub async fn answer(&self, question: &str, chunks: Vec<ScoredChunk>) -> Result<Answer> {
        if chunks.is_empty() {
            return Ok(Answer {
                question: question.to_string(),
                answer: "I couldn't find any relevant information to answer your question."
                    .to_string(),
                context: chunks,
                confidence: None,
            });
        }

        let context = format_chunks_for_context(&chunks);
        debug!("Answering with {} context chunks", chunks.len());

        let user_prompt = format!(
            "Here are some relevant parts of the video transcript:\n\n{}\n\nQuestion: {}\n\nPlease provide a helpful answer based on the transcript above.",
            context, question
        );

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT_QA)
                .build()
                .map_err(|e| YtqaError::Qa(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| YtqaError::Qa(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .max_tokens(500u32)
            .build()
            .map_err(|e| YtqaError::Qa(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| YtqaError::OpenAI(format!("Failed to generate answer: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| YtqaError::Qa("Empty response from model".to_string()))?
            .trim()
            .to_string();

        Ok(Answer {
            question: question.to_string(),
            answer,
            context: chunks,
            confidence: None,
        })
    }
}

/// Format retrieved chunks as `[MM:SS] text` blocks separated by blank lines.
pub fn format_chunks_for_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[{}] {}",
                format_timestamp(chunk.metadata.start),
                chunk.metadata.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn chunk(text: &str, start: f64) -> ScoredChunk {
        ScoredChunk {
            metadata: ChunkMetadata {
                video_id: "v1".to_string(),
                text: text.to_string(),
                start,
                duration: 60.0,
                chunk_index: 0,
            },
            distance: 0.1,
        }
    }

    #[test]
    fn test_format_chunks_for_context() {
        let chunks = vec![chunk("intro here", 0.0), chunk("second part", 125.0)];
        let context = format_chunks_for_context(&chunks);
        assert_eq!(context, "[00:00] intro here\n\n[02:05] second part");
    }

    #[tokio::test]
    async fn test_empty_context_returns_canned_answer() {
        let engine = AnswerEngine::new("gpt-4.1-nano");
        let answer = engine.answer("what is this?", Vec::new()).await.unwrap();
        assert!(answer.answer.contains("couldn't find"));
        assert!(answer.context.is_empty());
    }
}
