//! Fixtures shared by unit and router tests: in-memory PDF/DOCX documents,
//! a multipart body builder and a scripted chat transport.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Config;
use crate::llm_client::{ChatRequest, ChatTransport, LlmClient, LlmError, RetryPolicy};
use crate::rate_limit::RequestLimiter;
use crate::state::AppState;

pub const RESUME_LINES: &[&str] = &[
    "Jane Doe - Senior Backend Engineer",
    "jane.doe@example.com | Berlin, Germany",
    "Summary: Backend engineer with 8 years of experience building APIs.",
    "Experience: Acme Corp, 2019 - present. Led migration of billing to Rust.",
    "Reduced p99 latency by 40% across 12 services using PostgreSQL tuning.",
    "Skills: Rust, Go, PostgreSQL, Kubernetes, AWS, gRPC",
];

/// Thirty words.
pub const JOB_DESCRIPTION: &str = "We are hiring a senior backend engineer to design \
    reliable APIs in Rust, operate PostgreSQL at scale, mentor teammates, \
    and own services running on Kubernetes in AWS with strong observability.";

/// A minimal, valid PDF with one page per entry in `pages`, each line drawn
/// with the standard Helvetica font.
pub fn pdf_fixture(pages: &[&[&str]]) -> Vec<u8> {
    let page_count = pages.len();
    // 1 catalog, 2 page tree, 3 font, then (page, content) pairs.
    let page_id = |i: usize| 4 + 2 * i;
    let content_id = |i: usize| 5 + 2 * i;

    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>"),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (i, lines) in pages.iter().enumerate() {
        let mut stream = String::from("BT\n/F1 12 Tf\n72 720 Td\n");
        for (n, line) in lines.iter().enumerate() {
            if n > 0 {
                stream.push_str("0 -18 Td\n");
            }
            stream.push_str(&format!("({}) Tj\n", escape_pdf_string(line)));
        }
        stream.push_str("ET");

        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            content_id(i)
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

fn escape_pdf_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// A `.docx` with one paragraph per line.
pub fn docx_fixture(lines: &[&str]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for line in lines {
        docx = docx.add_paragraph(
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*line)),
        );
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("pack docx fixture");
    buf.into_inner()
}

/// A `.docx` with one paragraph per line followed by a table, one row per entry
/// in `rows`.
pub fn docx_table_fixture(lines: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for line in lines {
        docx = docx.add_paragraph(
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*line)),
        );
    }

    let rows = rows
        .iter()
        .map(|cells| {
            docx_rs::TableRow::new(
                cells
                    .iter()
                    .map(|cell| {
                        docx_rs::TableCell::new().add_paragraph(
                            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*cell)),
                        )
                    })
                    .collect(),
            )
        })
        .collect();
    docx = docx.add_table(docx_rs::Table::new(rows));

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("pack docx fixture");
    buf.into_inner()
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----ats-test-boundary-7MA4YWxkTrZu0gW".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, mime_type: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// A chat-completion response body whose first choice carries `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "gen-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 900, "completion_tokens": 400 }
    })
}

pub fn full_analysis_json() -> String {
    json!({
        "atsScore": 78,
        "keywordMatch": 64,
        "skillCoverage": "Strong backend coverage, light on observability tooling.",
        "suggestions": ["Mention Prometheus or OpenTelemetry experience."],
        "skills": { "present": ["Rust", "PostgreSQL", "Kubernetes"], "missing": ["Observability"] },
        "atsCompatibility": { "score": 85, "issues": [], "recommendations": [] },
        "keywordAnalysis": { "critical": ["Rust"], "moderate": ["AWS"], "missing": ["mentoring"], "density": 3.2 },
        "formatting": { "score": 90, "issues": [], "positives": ["Clear sections"] },
        "experience": { "relevance": 82, "gaps": [], "strengths": ["API design"] },
        "achievements": { "quantified": 1, "total": 2, "suggestions": [] },
        "competitiveAnalysis": { "ranking": "Top 30%", "improvements": [] }
    })
    .to_string()
}

pub fn improvements_json() -> String {
    json!({
        "formattingIssues": { "problems": ["Dense summary"], "fixes": ["Split into bullets"] },
        "keywordOptimization": { "missingKeywords": ["observability"], "placementSuggestions": ["Skills"], "examples": ["Built Grafana dashboards"] },
        "skillPresentation": { "weakSkills": ["AWS"], "improvedExamples": ["AWS (ECS, RDS, IAM)"] },
        "experienceImprovements": { "weakBullets": ["Led migration"], "quantifiedExamples": ["Led migration of 3 services"] },
        "actionPlan": { "immediate": ["Add metrics"], "mediumTerm": [], "longTerm": [] }
    })
    .to_string()
}

pub fn job_alignment_json() -> String {
    json!({
        "jobFit": { "score": 74, "matches": ["Rust"], "gaps": ["Mentoring"] },
        "tailoring": { "rewrites": [], "additions": [], "removals": [] },
        "keywords": { "missing": ["observability"], "placement": [], "examples": [] },
        "achievements": { "current": [], "suggested": [], "quantificationTips": [] },
        "positioning": { "summary": "Lead with Rust API work.", "reordering": [], "emphasis": [] }
    })
    .to_string()
}

type Responder = dyn Fn(u32) -> Result<Value, LlmError> + Send + Sync;

/// In-process `ChatTransport`. Each call gets its 1-based call number and
/// returns whatever the responder produces.
pub struct FakeTransport {
    calls: AtomicU32,
    last_request: Mutex<Option<Value>>,
    configured: bool,
    respond: Box<Responder>,
}

impl FakeTransport {
    pub fn new(respond: impl Fn(u32) -> Result<Value, LlmError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
            configured: true,
            respond: Box::new(respond),
        })
    }

    pub fn replying(body: Value) -> Arc<Self> {
        Self::new(move |_| Ok(body.clone()))
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
            configured: false,
            respond: Box::new(|_| Err(LlmError::MissingApiKey)),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Value> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, request: &ChatRequest<'_>) -> Result<Value, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = serde_json::to_value(request).ok();
        (self.respond)(call)
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Application state backed by `transport`, with no pause between retries.
pub fn test_state(transport: Arc<dyn ChatTransport>, config: Config) -> AppState {
    let llm = LlmClient::with_transport(
        transport,
        config.llm_model.clone(),
        true,
        config.llm_temperature,
        RetryPolicy {
            max_attempts: config.llm_max_attempts,
            delay: Duration::ZERO,
        },
    );
    let limiter = RequestLimiter::new(config.rate_limit_max_requests, config.rate_limit_window)
        .expect("valid limiter settings");

    AppState::from_parts(config, llm, limiter)
}
