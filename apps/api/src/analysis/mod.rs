// Résumé analysis: one pipeline parameterized by `AnalysisKind`.
// Extraction → normalization → prompt → completion (with retry) → validation.
// All LLM calls go through llm_client.

pub mod handlers;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod validation;

/// Which analysis to run. Each kind selects its own prompt template, required
/// response fields and completion budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// ATS score, keyword and skill breakdown for an uploaded résumé.
    FullAnalysis,
    /// Concrete fixes for formatting, keywords, skills and experience bullets.
    Improvements,
    /// How to tailor the résumé to this particular job.
    JobAlignment,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::FullAnalysis => "full_analysis",
            AnalysisKind::Improvements => "improvements",
            AnalysisKind::JobAlignment => "job_alignment",
        }
    }

    /// Top-level keys a model reply must contain (non-null) to be accepted.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            AnalysisKind::FullAnalysis => &["atsScore", "skills"],
            AnalysisKind::Improvements => &["formattingIssues", "actionPlan"],
            AnalysisKind::JobAlignment => &["jobFit", "tailoring"],
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            AnalysisKind::FullAnalysis => 1500,
            AnalysisKind::Improvements | AnalysisKind::JobAlignment => 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_per_kind() {
        assert_eq!(
            AnalysisKind::FullAnalysis.required_fields(),
            &["atsScore", "skills"]
        );
        assert_eq!(
            AnalysisKind::JobAlignment.required_fields(),
            &["jobFit", "tailoring"]
        );
        assert!(AnalysisKind::Improvements
            .required_fields()
            .contains(&"formattingIssues"));
    }

    #[test]
    fn test_follow_up_kinds_get_larger_budget() {
        assert!(AnalysisKind::Improvements.max_tokens() > AnalysisKind::FullAnalysis.max_tokens());
        assert_eq!(
            AnalysisKind::JobAlignment.max_tokens(),
            AnalysisKind::Improvements.max_tokens()
        );
    }
}
