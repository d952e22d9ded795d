//! Prompt text sent to the models.

use vtrain_models::FrameAnalysis;

pub const FRAME_SYSTEM_PROMPT: &str = "You are an expert vocational trainer reviewing still frames \
from a trainee's practical-skills video. Respond with a single JSON object and nothing else.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert vocational trainer writing an assessment \
of a trainee's performance from frame-by-frame observations.";

/// Instruction for one frame, naming the fields the parser expects.
pub fn frame_prompt(timestamp: f64) -> String {
    format!(
        "Analyze this frame captured at {timestamp:.2} seconds into the training video.\n\
         Return a JSON object with exactly these fields:\n\
         - \"timestamp\": float, seconds from the start of the video ({timestamp:.2})\n\
         - \"description\": short description of what the trainee is doing\n\
         - \"errors\": list of strings describing technique mistakes (empty list if none)\n\
         - \"safety_issues\": list of strings describing safety concerns (empty list if none)\n\
         - \"skill_score\": integer between 0 and 100 estimating how well this step is executed"
    )
}

/// Instruction for the aggregation call over all frame records.
///
/// `strict` is the structured-output variant; the relaxed variant repeats the
/// JSON-only requirement in the text since the provider will not enforce it.
pub fn summary_prompt(analyses: &[FrameAnalysis], strict: bool) -> String {
    let records = serde_json::to_string_pretty(analyses).unwrap_or_else(|_| "[]".to_string());
    let closing = if strict {
        "Respond with a JSON object."
    } else {
        "Respond with ONLY the JSON object: no markdown fences, no commentary before or after it."
    };

    format!(
        "Here are per-frame observations of a trainee, as JSON:\n{records}\n\n\
         Compute an overall assessment and return a JSON object with these keys:\n\
         - \"overallScore\": integer 0-100\n\
         - \"accuracy\": integer 0-100\n\
         - \"stability\": integer 0-100\n\
         - \"toolUsage\": integer 0-100\n\
         - \"completionTime\": string describing how long the task took, or \"N/A\"\n\
         - \"feedback\": markdown feedback for the trainee with strengths, mistakes, \
         safety notes and concrete next steps\n\n\
         {closing}"
    )
}
