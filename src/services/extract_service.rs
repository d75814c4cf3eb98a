use crate::error::Result;
use crate::models::session::SourceType;
use crate::services::analyzer_service::AnalyzerService;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::fs;
use tokio::process::Command;
use uuid::Uuid;

/// Minimum characters an extraction must yield before analysis is worth
/// attempting.
const MIN_EXTRACTED_CHARS: usize = 20;

/// Converts uploaded PDF/image bytes into plain text. PDFs go through
/// `pdftotext`; images are transcribed by the analyzer's OCR call.
#[derive(Clone)]
pub struct ExtractService {
    analyzer: AnalyzerService,
}

impl ExtractService {
    pub fn new(analyzer: AnalyzerService) -> Self {
        Self { analyzer }
    }

    pub fn source_type_for(mime_type: &str) -> Result<SourceType> {
        if mime_type == "application/pdf" {
            Ok(SourceType::Pdf)
        } else if mime_type.starts_with("image/") {
            Ok(SourceType::Image)
        } else {
            Err(crate::error::Error::BadRequest(
                "Unsupported format. Use PDF or Images.".to_string(),
            ))
        }
    }

    pub async fn extract_text(&self, data: &[u8], mime_type: &str) -> Result<String> {
        let text = match Self::source_type_for(mime_type)? {
            SourceType::Pdf => self.extract_pdf_text(data).await?,
            SourceType::Image => {
                let encoded = BASE64.encode(data);
                self.analyzer.ocr_image(&encoded, mime_type).await?
            }
            SourceType::Text => unreachable!("text input does not go through extraction"),
        };

        if text.trim().len() < MIN_EXTRACTED_CHARS {
            return Err(crate::error::Error::BadRequest(
                "Extraction yielded insufficient data.".to_string(),
            ));
        }
        Ok(text)
    }

    async fn extract_pdf_text(&self, data: &[u8]) -> Result<String> {
        let temp_dir = std::env::temp_dir().join(format!("exampro_pdf_{}", Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;
        let pdf_path = temp_dir.join("upload.pdf");
        let txt_path = temp_dir.join("upload.txt");
        fs::write(&pdf_path, data).await?;

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg(&pdf_path)
            .arg(&txt_path)
            .output()
            .await;

        let result = match output {
            Ok(out) if out.status.success() => {
                fs::read_to_string(&txt_path).await.map_err(Into::into)
            }
            Ok(out) => {
                tracing::error!("pdftotext failed: {}", String::from_utf8_lossy(&out.stderr));
                Err(anyhow::anyhow!(
                    "Document analysis failed. Ensure the PDF is not encrypted or corrupt."
                )
                .into())
            }
            Err(e) => {
                tracing::error!("Failed to run pdftotext: {}", e);
                Err(anyhow::anyhow!("PDF extraction engine not available").into())
            }
        };

        let _ = fs::remove_dir_all(&temp_dir).await;
        result
    }
}
