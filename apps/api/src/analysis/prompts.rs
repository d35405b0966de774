// LLM prompt constants for resume analysis.

/// System prompt for resume review. Demands bare JSON output.
pub const ANALYSIS_SYSTEM: &str = "You are an expert in ATS (Applicant Tracking System) \
    and resume analysis. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Expected response shape, embedded in the instruction payload.
pub const FEEDBACK_RESPONSE_FORMAT: &str = r#"{
  "overallScore": number (0-100),
  "ATS": {
    "score": number (0-100),
    "tips": [{"type": "good" | "improve", "tip": "string"}]
  },
  "toneAndStyle": {
    "score": number (0-100),
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "string"}]
  },
  "content": {
    "score": number (0-100),
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "string"}]
  },
  "structure": {
    "score": number (0-100),
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "string"}]
  },
  "skills": {
    "score": number (0-100),
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "string"}]
  }
}"#;

/// Builds the instruction payload sent alongside the resume.
///
/// Empty job fields are replaced with a placeholder so the model does not mistake
/// the next heading for the missing value.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        r#"Analyze and rate this resume and suggest how to improve it.

The rating can be low if the resume is bad. Be thorough and detailed. Do not be afraid to
point out mistakes or areas for improvement. If there is a lot to improve, do not hesitate
to give low scores. If available, use the job description of the job the user is applying
to when giving feedback.

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

Provide the feedback using the following format:
{FEEDBACK_RESPONSE_FORMAT}

Return the analysis as a JSON object, without any other text and without code fences.
Give 3-4 tips per section."#,
        job_title = or_not_provided(job_title),
        job_description = or_not_provided(job_description),
    )
}

fn or_not_provided(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "(not provided)"
    } else {
        value
    }
}

/// Wraps the extracted resume text so it is clearly separated from the instructions.
pub fn resume_text_block(resume_text: &str) -> String {
    format!("RESUME TEXT:\n{}", resume_text.trim())
}
