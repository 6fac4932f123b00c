//! AI-assisted extraction for messages the rule engine cannot read.
//!
//! The extractor only turns text into an [`AiCandidate`]; validation (currency,
//! amount, category vocabulary, completeness) happens in the parser exactly as it
//! does for rule-based results.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const SYSTEM_INSTRUCTION: &str = "Eres un asistente financiero para usuarios en Perú. Idioma: español. \
Tu tarea: extraer campos estructurados desde un texto libre del usuario. \
Moneda preferida: soles (PEN). Si detectas otra moneda, marca currency='OTHER'. \
Devuelve un JSON estricto con campos: {type: 'gasto'|'ingreso'|null, amount: number|null, \
currency: 'PEN'|'OTHER'|'UNKNOWN', category: una de [comida, diversión, ropa, transporte, salud, \
vivienda, servicios, educación, ahorro, otros] para gastos o [salario, freelance, regalos, otros] \
para ingresos, description: string, date_text: referencia temporal breve (e.g. 'ayer', '12/11') o null}. \
Respeta las categorías fijas y nunca inventes nuevas.";

/// Amount as returned by the model: a number or a string such as `"12,50"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AiAmount {
    /// Numeric JSON value
    Number(f64),
    /// Textual JSON value
    Text(String),
}

/// Candidate fields extracted by the model, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiCandidate {
    /// `"gasto"`, `"ingreso"` or null
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Extracted amount
    #[serde(default)]
    pub amount: Option<AiAmount>,
    /// `"PEN"`, `"OTHER"` or `"UNKNOWN"`
    #[serde(default)]
    pub currency: Option<String>,
    /// Category from the fixed vocabulary
    #[serde(default)]
    pub category: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: Option<String>,
    /// Temporal reference as written by the user
    #[serde(default)]
    pub date_text: Option<String>,
}

/// A swappable extractor invoked after the rule engine finds no financial intent.
///
/// `Ok(None)` means the extractor answered but found nothing; `Err` means it was
/// unavailable. The parser treats both as "unparseable".
#[async_trait]
pub trait FallbackExtractor: Send + Sync {
    /// Extracts candidate fields from raw message text.
    async fn extract(&self, text: &str) -> Result<Option<AiCandidate>>;
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiExtractor {
    /// Creates a client for `model` authenticated with `api_key`.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Points the client at another endpoint (used by tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, text: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(SYSTEM_INSTRUCTION.to_string()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(format!(
                        "Texto del usuario:\n{text}\n\nResponde SOLO con JSON sin comentarios ni texto adicional."
                    )),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.1,
            },
        };

        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::AiFallback {
                message: format!("Gemini API error (status {status}): {body}"),
            });
        }

        let body: GenerateContentResponse = res.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| Error::AiFallback {
                message: "Gemini returned no text candidates".to_string(),
            })
    }
}

#[async_trait]
impl FallbackExtractor for GeminiExtractor {
    async fn extract(&self, text: &str) -> Result<Option<AiCandidate>> {
        let raw = self.generate(text).await?;
        let candidate = parse_candidate(&raw)?;
        tracing::debug!(?candidate, "AI fallback candidate");
        Ok(Some(candidate))
    }
}

/// Parses model output, tolerating markdown code fences around the JSON.
pub fn parse_candidate(raw: &str) -> Result<AiCandidate> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim()).map_err(Into::into)
}
