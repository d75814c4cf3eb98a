use crate::error::Result;
use crate::models::question::Question;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub insights: String,
    pub questions: Vec<Question>,
}

/// Client for the hosted generative endpoint. The service is an opaque
/// collaborator: it either returns the full structured report or the call
/// fails as a retryable error, never partial data.
#[derive(Clone)]
pub struct AnalyzerService {
    client: Client,
    api_key: String,
    api_base: String,
}

const ANALYZE_MODEL: &str = "gemini-3-pro-preview";
const OCR_MODEL: &str = "gemini-2.5-flash-image";

impl AnalyzerService {
    pub fn new(api_key: String, api_base: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            api_base,
        }
    }

    pub async fn analyze(&self, text: &str, question_count: usize) -> Result<AnalysisReport> {
        let system_prompt = format!(
            "You are an academic study assistant. Extract the core summary, 5 key points, \
             1 deep insight, and {} multiple choice questions (4 options each, exactly one \
             correct). Format: JSON only. No prose. No conversational filler.",
            question_count
        );

        let payload = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{
                    "text": format!(
                        "Analyze this material and return a structured JSON report.\n\nINPUT MATERIAL:\n{}",
                        text
                    )
                }]
            }],
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "summary": { "type": "STRING" },
                        "keyPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "insights": { "type": "STRING" },
                        "questions": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "question": { "type": "STRING" },
                                    "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                                    "correctIndex": { "type": "INTEGER" },
                                    "explanation": { "type": "STRING" }
                                },
                                "required": ["question", "options", "correctIndex", "explanation"]
                            }
                        }
                    },
                    "required": ["summary", "keyPoints", "insights", "questions"]
                }
            }
        });

        let output = self.generate_content(ANALYZE_MODEL, payload).await?;
        let cleaned = sanitize_json_response(&output);
        let raw: JsonValue = serde_json::from_str(&cleaned).map_err(|e| {
            tracing::error!("Analyzer returned non-standard JSON: {}", e);
            crate::error::Error::Analyzer(
                "The analyzer produced a non-standard report. Please retry.".to_string(),
            )
        })?;

        let mut report: AnalysisReport = serde_json::from_value(raw).map_err(|_| {
            crate::error::Error::Analyzer(
                "The analyzer report was missing required fields. Please retry.".to_string(),
            )
        })?;
        report.questions = sanitize_questions(report.questions, question_count);
        if report.questions.is_empty() {
            return Err(crate::error::Error::Analyzer(
                "The analyzer produced no usable questions. Please retry.".to_string(),
            ));
        }
        Ok(report)
    }

    /// High-precision transcription of an uploaded image.
    pub async fn ocr_image(&self, base64_data: &str, mime_type: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "data": base64_data, "mimeType": mime_type } },
                    { "text": "Act as a high-precision OCR engine. Transcribe every word in this image exactly." }
                ]
            }]
        });

        self.generate_content(OCR_MODEL, payload).await
    }

    async fn generate_content(&self, model: &str, payload: JsonValue) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, model, self.api_key
        );
        let res = self
            .client
            .post(&url)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!("Generative API error {}: {}", status, text);
            return Err(crate::error::Error::Analyzer(format!(
                "Generative API error: {}",
                status
            )));
        }

        let body: JsonValue = res.json().await?;
        body.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                crate::error::Error::Analyzer(
                    "The analyzer failed to synthesize a report. The content may be too short."
                        .to_string(),
                )
            })
    }
}

/// Strip markdown code fences some models wrap around JSON output.
pub fn sanitize_json_response(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Drop unusable questions, shuffle options to avoid position bias (fixing
/// the correct index up), and truncate to the requested count.
pub fn sanitize_questions(questions: Vec<Question>, count: usize) -> Vec<Question> {
    let mut rng = rand::thread_rng();
    let mut sanitized: Vec<Question> = Vec::new();

    for mut q in questions {
        if q.options.len() < 2 {
            continue;
        }
        if q.correct_index < 0 || q.correct_index as usize >= q.options.len() {
            continue;
        }
        let correct_option = q.options[q.correct_index as usize].clone();
        q.options.shuffle(&mut rng);
        q.correct_index = q
            .options
            .iter()
            .position(|o| o == &correct_option)
            .unwrap_or(0) as i32;
        sanitized.push(q);
    }

    sanitized.truncate(count);
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(correct: i32, options: &[&str]) -> Question {
        Question {
            question: "q".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_index: correct,
            explanation: "e".into(),
        }
    }

    #[test]
    fn fences_are_stripped() {
        let raw = "```json\n{\"summary\":\"s\"}\n```";
        assert_eq!(sanitize_json_response(raw), "{\"summary\":\"s\"}");
    }

    #[test]
    fn malformed_questions_are_dropped() {
        let out = sanitize_questions(
            vec![
                q(0, &["only"]),
                q(7, &["a", "b", "c", "d"]),
                q(-1, &["a", "b"]),
                q(1, &["a", "b", "c", "d"]),
            ],
            10,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn shuffle_keeps_correct_index_pointing_at_correct_option() {
        for _ in 0..20 {
            let out = sanitize_questions(vec![q(2, &["a", "b", "c", "d"])], 10);
            let sq = &out[0];
            assert_eq!(sq.options[sq.correct_index as usize], "c");
        }
    }

    #[test]
    fn truncates_to_requested_count() {
        let many = (0..8).map(|_| q(0, &["a", "b", "c", "d"])).collect();
        assert_eq!(sanitize_questions(many, 5).len(), 5);
    }
}
