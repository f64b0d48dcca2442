// Prompt templates for the three analysis kinds. Each template is an instruction,
// a schema block documenting every expected field, and the shared JSON-only
// directive from llm_client::prompts.

use crate::analysis::AnalysisKind;
use crate::llm_client::prompts::JSON_ONLY_DIRECTIVE;

struct PromptTemplate {
    instruction: &'static str,
    schema: &'static str,
}

const FULL_ANALYSIS: PromptTemplate = PromptTemplate {
    instruction: "You are an expert Applicant Tracking System (ATS) reviewer and career coach. \
Analyze the following resume text against this job description. \
Provide a structured JSON output matching this interface:",
    schema: r#"interface AnalysisResults {
  atsScore: number; // Overall ATS compatibility score (0-100)
  keywordMatch: number; // Percentage of keyword match (0-100)
  skillCoverage: string; // Brief description of skill coverage
  suggestions: string[]; // Array of actionable suggestions
  skills: {
    present: string[]; // Skills present in resume
    missing: string[]; // Skills missing from resume but in job description
  };
  atsCompatibility: {
    score: number; // ATS format score (0-100)
    issues: string[]; // Formatting issues
    recommendations: string[]; // Recommendations for ATS
  };
  keywordAnalysis: {
    critical: string[]; // Critical keywords matched
    moderate: string[]; // Moderate keywords
    missing: string[]; // Missing keywords
    density: number; // Keyword density percentage
  };
  formatting: {
    score: number; // Formatting score (0-100)
    issues: string[]; // Formatting issues
    positives: string[]; // Positive aspects
  };
  experience: {
    relevance: number; // Experience relevance (0-100)
    gaps: string[]; // Experience gaps
    strengths: string[]; // Strengths in experience
  };
  achievements: {
    quantified: number; // Number of quantified achievements
    total: number; // Total achievements
    suggestions: string[]; // Suggestions for achievements
  };
  competitiveAnalysis: {
    ranking: string; // e.g. "Top 30%"
    improvements: string[]; // Improvements for competitiveness
  };
}"#,
};

const IMPROVEMENTS: PromptTemplate = PromptTemplate {
    instruction: "You are an expert resume writer specializing in Applicant Tracking System (ATS) optimization. \
Review the following resume against the job description and produce concrete, actionable improvements. \
Every fix, placement suggestion and example must line up index-by-index with the problem, keyword or weak item it addresses. \
Provide a structured JSON output matching this interface:",
    schema: r#"interface ImprovementResults {
  formattingIssues: {
    problems: string[]; // Formatting problems that hurt ATS parsing
    fixes: string[]; // Fix for each problem, same order
  };
  keywordOptimization: {
    missingKeywords: string[]; // Job keywords absent from the resume
    placementSuggestions: string[]; // Where to add each keyword
    examples: string[]; // Example sentence using each keyword
  };
  skillPresentation: {
    weakSkills: string[]; // Skill statements that are vague or unsupported
    improvedExamples: string[]; // Rewritten version of each
  };
  experienceImprovements: {
    weakBullets: string[]; // Experience bullets lacking impact
    quantifiedExamples: string[]; // Quantified rewrite of each bullet
  };
  actionPlan: {
    immediate: string[]; // Changes to make today
    mediumTerm: string[]; // Changes for the next few weeks
    longTerm: string[]; // Skills or experience to build over months
  };
}"#,
};

const JOB_ALIGNMENT: PromptTemplate = PromptTemplate {
    instruction: "You are an expert career strategist. \
Compare the following resume with the job description and explain how to tailor the resume to this specific role. \
Only reference experience that actually appears in the resume. \
Provide a structured JSON output matching this interface:",
    schema: r#"interface JobAlignmentResults {
  jobFit: {
    score: number; // Alignment score (0-100)
    matches: string[]; // Requirements the resume already meets
    gaps: string[]; // Requirements the resume does not show
  };
  tailoring: {
    rewrites: { section: string; before: string; after: string }[]; // Line-level rewrites
    additions: { item: string; example: string }[]; // Content to add
    removals: { item: string; reason: string }[]; // Content to cut
  };
  keywords: {
    missing: string[]; // Job keywords to work in
    placement: { keyword: string; section: string }[]; // Where each keyword belongs
    examples: string[]; // Example phrasing
  };
  achievements: {
    current: string[]; // Achievements already relevant to this role
    suggested: { statement: string; example: string }[]; // Achievements to highlight
    quantificationTips: string[]; // How to add numbers to them
  };
  positioning: {
    summary: string; // Suggested professional summary for this role
    reordering: string[]; // Sections or bullets to move up
    emphasis: string[]; // Themes to emphasize
  };
}"#,
};

fn template(kind: AnalysisKind) -> &'static PromptTemplate {
    match kind {
        AnalysisKind::FullAnalysis => &FULL_ANALYSIS,
        AnalysisKind::Improvements => &IMPROVEMENTS,
        AnalysisKind::JobAlignment => &JOB_ALIGNMENT,
    }
}

/// Builds the prompt for `kind`. Inputs are appended verbatim and never scanned
/// for placeholders, so the same inputs always yield the same prompt.
pub fn build_prompt(kind: AnalysisKind, resume_text: &str, job_text: &str) -> String {
    let template = template(kind);

    let mut prompt = String::with_capacity(
        template.instruction.len()
            + template.schema.len()
            + resume_text.len()
            + job_text.len()
            + JSON_ONLY_DIRECTIVE.len()
            + 64,
    );
    prompt.push_str(template.instruction);
    prompt.push_str("\n\n");
    prompt.push_str(template.schema);
    prompt.push_str("\n\nResume Text:\n");
    prompt.push_str(resume_text);
    prompt.push_str("\n\nJob Description:\n");
    prompt.push_str(job_text);
    prompt.push_str("\n\n");
    prompt.push_str(JSON_ONLY_DIRECTIVE);
    prompt
}
