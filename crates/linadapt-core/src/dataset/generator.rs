//! LLM-backed question generation for retrieval datasets.
//!
//! For each corpus chunk, asks a chat-completions model to write questions
//! that the chunk answers. The chunk is the relevant document for those
//! questions by construction, so no manual labeling is needed.

use super::{QueryId, RetrievalDataset};
use crate::config::QUESTIONS_PER_CHUNK;
use crate::corpus::NodeId;
use crate::error::DatasetError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Global HTTP client for connection pooling.
///
/// Question generation makes one request per corpus chunk against the same
/// host, so connection reuse matters.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

/// Prompt template for question generation.
///
/// `{context}` and `{num_questions}` are substituted per chunk. The model is
/// instructed to answer with a numbered list, which `parse_questions` strips.
const QA_GENERATE_PROMPT: &str = "\
Context information is below.

---------------------
{context}
---------------------

Given the context information and no prior knowledge, generate {num_questions} \
questions based on the context. The questions should be diverse in nature and \
restricted to the context information provided. Respond with one question per \
line, numbered.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Generates questions from corpus chunks via an OpenAI-compatible
/// chat-completions endpoint.
pub struct QuestionGenerator {
    base_url: String,
    api_key: String,
    model: String,
    questions_per_chunk: usize,
}

impl QuestionGenerator {
    /// Creates a generator for the given endpoint and model.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            questions_per_chunk: QUESTIONS_PER_CHUNK,
        }
    }

    /// Creates a generator for the OpenAI API, reading the key from
    /// `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Generation` if the variable is unset.
    pub fn openai(model: impl Into<String>) -> Result<Self, DatasetError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DatasetError::Generation("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new("https://api.openai.com", api_key, model))
    }

    /// Sets how many questions to request per chunk.
    pub fn with_questions_per_chunk(mut self, n: usize) -> Self {
        self.questions_per_chunk = n;
        self
    }

    /// Generates a dataset from (node_id, chunk_text) pairs.
    ///
    /// Generation is best-effort per chunk: a failed request or a chunk the
    /// model returns nothing for is logged and skipped, and the remaining
    /// chunks still produce queries. `progress` is invoked after each chunk
    /// with the number processed so far.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::EmptyGeneration` if no chunk produced any
    /// question.
    pub async fn generate_dataset(
        &self,
        nodes: &[(NodeId, String)],
        mut progress: impl FnMut(usize),
    ) -> Result<RetrievalDataset, DatasetError> {
        let mut dataset = RetrievalDataset::new();
        for (node_id, text) in nodes {
            dataset.add_node(node_id.clone(), text.clone());
        }

        let mut failures = 0;
        for (processed, (node_id, text)) in nodes.iter().enumerate() {
            match self.generate_for_chunk(text).await {
                Ok(questions) => {
                    for (i, question) in questions.iter().enumerate() {
                        dataset.add_query(
                            QueryId::new(node_id, i),
                            question.clone(),
                            vec![node_id.clone()],
                        );
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("Question generation failed for {}: {}", node_id, e);
                }
            }
            progress(processed + 1);
        }

        if dataset.num_queries() == 0 {
            return Err(DatasetError::EmptyGeneration);
        }

        info!(
            "Generated {} queries over {} nodes ({} chunk failures)",
            dataset.num_queries(),
            dataset.num_nodes(),
            failures
        );
        Ok(dataset)
    }

    /// Generates questions for a single chunk.
    async fn generate_for_chunk(&self, context: &str) -> Result<Vec<String>, DatasetError> {
        let prompt = QA_GENERATE_PROMPT
            .replace("{context}", context)
            .replace("{num_questions}", &self.questions_per_chunk.to_string());

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &prompt,
                }],
                temperature: 0.7,
            })
            .send()
            .await
            .map_err(|e| DatasetError::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatasetError::Generation(format!(
                "Chat request returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DatasetError::Generation(format!("Invalid response: {}", e)))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let questions = parse_questions(content, self.questions_per_chunk);
        debug!("Parsed {} questions from model response", questions.len());

        if questions.is_empty() {
            return Err(DatasetError::Generation(
                "Model returned no usable questions".to_string(),
            ));
        }
        Ok(questions)
    }
}

/// Extracts questions from a numbered-list model response.
///
/// Strips leading numbering (`1.`, `2)`, `-`) and whitespace, drops blank
/// lines, and keeps at most `limit` questions.
pub fn parse_questions(response: &str, limit: usize) -> Vec<String> {
    response
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(|line| line.to_string())
        .collect()
}

/// Strips a leading list marker if one is present.
///
/// Digits only count as numbering when a `.` or `)` delimiter follows them,
/// so a question that starts with a number ("2023 revenue grew by...") is
/// left intact.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let after_digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() < line.len() {
        if let Some(rest) = after_digits.strip_prefix(['.', ')']) {
            return rest.trim();
        }
        return line;
    }
    line.strip_prefix('-').map(str::trim).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_questions() {
        let response = "1. What was the revenue growth?\n2. How many employees were hired?";
        let questions = parse_questions(response, 2);
        assert_eq!(
            questions,
            vec![
                "What was the revenue growth?".to_string(),
                "How many employees were hired?".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_questions_mixed_numbering() {
        let response = "1) First question?\n\n- Second question?\n";
        let questions = parse_questions(response, 5);
        assert_eq!(
            questions,
            vec!["First question?".to_string(), "Second question?".to_string()]
        );
    }

    #[test]
    fn test_parse_questions_respects_limit() {
        let response = "1. A?\n2. B?\n3. C?";
        let questions = parse_questions(response, 2);
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn test_parse_questions_empty_response() {
        assert!(parse_questions("", 2).is_empty());
        assert!(parse_questions("\n\n", 2).is_empty());
    }

    #[test]
    fn test_parse_questions_keeps_leading_numbers_without_delimiter() {
        let response = "1. What changed?\n2023 revenue grew by what percent?";
        let questions = parse_questions(response, 5);
        assert_eq!(
            questions,
            vec![
                "What changed?".to_string(),
                "2023 revenue grew by what percent?".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_dataset_empty_corpus_is_error() {
        let generator = QuestionGenerator::new("http://localhost:0", "test-key", "test-model");
        let result = generator.generate_dataset(&[], |_| {}).await;
        assert!(matches!(result, Err(DatasetError::EmptyGeneration)));
    }

    #[tokio::test]
    async fn test_generate_dataset_all_chunks_failing_is_error() {
        // Port 1 refuses connections, so every chunk fails and the run
        // ends with no queries at all
        let generator = QuestionGenerator::new("http://127.0.0.1:1", "test-key", "test-model");
        let nodes = vec![(NodeId::new("report", 0), "Some chunk text.".to_string())];

        let mut seen = 0;
        let result = generator.generate_dataset(&nodes, |done| seen = done).await;
        assert!(matches!(result, Err(DatasetError::EmptyGeneration)));
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_openai_requires_env_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let result = QuestionGenerator::openai("gpt-4o-mini");
        assert!(matches!(result, Err(DatasetError::Generation(_))));
    }
}
