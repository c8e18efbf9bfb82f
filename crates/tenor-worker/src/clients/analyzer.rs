//! Multimodal content analysis with the Gemini `generateContent` API.
//!
//! The video is sent inline (base64) together with a prompt carrying the
//! transcript, the sentiment scores, the creator's description and the
//! knowledge base. The model is constrained to a JSON response schema, but
//! its numbers are still clamped by the pipeline.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tenor_core::pipeline::{
  AnalysisRequest, CollaboratorError, ContentAnalysis, ContentAnalyzer,
};
use tracing::debug;

use super::http_failure;
use crate::{Error, Result, config::AnalyzerConfig};

const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 8192;

const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_HARASSMENT",
];

const PROMPT_TEMPLATE: &str = r#"You analyse short-form videos for geopolitical framing and propaganda.
Answer with one JSON object that follows the response schema and nothing else.

VIDEO DESCRIPTION (written by the creator):
"{description}"

AUDIO TRANSCRIPT:
"{transcript}"

TEXT SENTIMENT (from a separate classifier):
{sentiment}

KNOWLEDGE BASE (canonical subjects, aliases and alignment tendencies):
{knowledge}

Instructions:
1. summary: one neutral paragraph describing what the video shows and says.
   Report unverified claims as allegations.
2. identified_subjects: every person, organisation, country or concept the
   video mentions or shows. When a name matches an alias in the knowledge
   base, use the canonical name instead. For each subject give a stance in
   [-1.0, 1.0] describing how THIS video portrays it: praise and defence are
   positive, criticism, mockery and blame are negative, factual mention is
   0.0. Sarcasm counts as the opposite of its literal wording. Do not let the
   knowledge base tendencies influence the stance.
3. overall_alignment: in [-1.0, 1.0], where -1.0 is a pro-Russian or
   anti-Western narrative and 1.0 a pro-Western or anti-Russian one. Combine
   the stances with the knowledge base tendencies and weights: praising a
   negative-tendency subject or attacking a positive-tendency one pushes the
   score down, and the reverse pushes it up. A video with no geopolitical
   subjects scores 0.0.
"#;

#[derive(Clone)]
pub struct GeminiAnalyzer {
  client:      Client,
  api_base:    String,
  api_key:     String,
  model:       String,
  temperature: f64,
}

impl GeminiAnalyzer {
  pub fn new(config: AnalyzerConfig) -> Result<Self> {
    let api_key = config
      .api_key
      .filter(|k| !k.is_empty())
      .ok_or(Error::MissingSetting("analyzer.api_key"))?;
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      api_base: config.api_base.trim_end_matches('/').to_owned(),
      api_key,
      model: config.model,
      temperature: config.temperature,
    })
  }

  fn url(&self) -> String {
    format!("{}/models/{}:generateContent", self.api_base, self.model)
  }

  fn request_body(&self, video_b64: String, prompt: String) -> Value {
    json!({
      "contents": [{
        "role": "user",
        "parts": [
          { "inline_data": { "mime_type": "video/mp4", "data": video_b64 } },
          { "text": prompt },
        ],
      }],
      "generationConfig": {
        "responseMimeType": "application/json",
        "responseSchema": response_schema(),
        "temperature": self.temperature,
        "topP": TOP_P,
        "maxOutputTokens": MAX_OUTPUT_TOKENS,
      },
      "safetySettings": SAFETY_CATEGORIES
        .iter()
        .map(|category| {
          json!({ "category": category, "threshold": "BLOCK_NONE" })
        })
        .collect::<Vec<_>>(),
    })
  }
}

impl ContentAnalyzer for GeminiAnalyzer {
  fn model_name(&self) -> &str { &self.model }

  async fn analyze(
    &self,
    request: AnalysisRequest<'_>,
  ) -> Result<ContentAnalysis, CollaboratorError> {
    let video = tokio::fs::read(request.video_path)
      .await
      .map_err(CollaboratorError::failed)?;
    debug!(
      item_id = request.item_id,
      bytes = video.len(),
      model = %self.model,
      "sending video for analysis"
    );

    let body =
      self.request_body(STANDARD.encode(&video), build_prompt(&request));
    let resp = self
      .client
      .post(self.url())
      .header("x-goog-api-key", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(CollaboratorError::failed)?;
    if !resp.status().is_success() {
      return Err(http_failure("gemini", resp).await);
    }

    let text = resp.text().await.map_err(CollaboratorError::failed)?;
    parse_response(&text)
  }
}

// ─── Prompt and schema ───────────────────────────────────────────────────────

fn build_prompt(request: &AnalysisRequest<'_>) -> String {
  let sentiment = serde_json::to_string(request.sentiment).unwrap_or_default();
  fill_template(PROMPT_TEMPLATE, |name| match name {
    "description" => Some(request.description),
    "transcript" => Some(request.transcript),
    "sentiment" => Some(sentiment.as_str()),
    "knowledge" => Some(request.knowledge),
    _ => None,
  })
}

/// Substitute `{name}` placeholders in a single pass over `template`.
/// Substituted values are never rescanned, and unknown placeholders are kept
/// as written.
fn fill_template<'a>(
  template: &str,
  value: impl Fn(&str) -> Option<&'a str>,
) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let replacement = after
      .find('}')
      .and_then(|close| value(&after[..close]).map(|v| (v, close)));
    match replacement {
      Some((v, close)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

fn response_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "summary": {
        "type": "STRING",
        "description": "Neutral one-paragraph summary of the video.",
      },
      "identified_subjects": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "subject": { "type": "STRING" },
            "stance": {
              "type": "NUMBER",
              "description": "How the video portrays the subject, -1.0 to 1.0.",
            },
          },
          "required": ["subject", "stance"],
        },
      },
      "overall_alignment": {
        "type": "NUMBER",
        "description": "-1.0 pro-Russian/anti-Western to 1.0 pro-Western/anti-Russian.",
      },
    },
    "required": ["summary", "identified_subjects", "overall_alignment"],
  })
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)]
  candidates:      Vec<Candidate>,
  prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  content:       Option<CandidateContent>,
  finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  block_reason: Option<String>,
}

fn parse_response(body: &str) -> Result<ContentAnalysis, CollaboratorError> {
  let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
    CollaboratorError::Malformed(format!("gemini response: {e}"))
  })?;

  let Some(candidate) = response.candidates.into_iter().next() else {
    let reason = response
      .prompt_feedback
      .and_then(|f| f.block_reason)
      .unwrap_or_else(|| "no candidates".into());
    return Err(CollaboratorError::Malformed(format!(
      "gemini returned nothing: {reason}"
    )));
  };

  let text: String = candidate
    .content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();
  if text.trim().is_empty() {
    return Err(CollaboratorError::Malformed(format!(
      "gemini returned no text (finish reason {})",
      candidate.finish_reason.as_deref().unwrap_or("unknown")
    )));
  }

  serde_json::from_str(&text)
    .map_err(|e| CollaboratorError::Malformed(format!("analysis JSON: {e}")))
}
