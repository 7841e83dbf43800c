//! Prompt Text
//!
//! The analysis brief request and the synthesis output contract. Wording is
//! deliberately direct: instructions first, hard output constraints last.

use crate::types::REQUIRED_FIELDS;

/// Analysis request: summarize the corpus and derive differentiation
/// guidelines for the next profile.
pub const ANALYSIS_PROMPT: &str = "\
### INSTRUCTION ###
You are a social network analyst and profile strategist. Below is an
aggregate summary of the profiles already stored in the corpus.

Your tasks:
1. Summarize the demographic, occupational, linguistic, and personality
   patterns the aggregates suggest, and name any oversaturated niches.
2. Produce concrete, actionable guidelines for creating ONE new profile
   that is clearly distinct from the existing corpus: demographic
   positioning, occupation and education choices that fill gaps, language
   combinations, and a personality and biography angle that avoids the
   common archetypes.

Keep the output to two short sections: A. Corpus summary, B. Guidelines
for a distinctive profile.

### CORPUS SUMMARY ###
";

/// Build the full analysis prompt around the rendered corpus summary.
pub fn analysis_prompt(corpus_summary: &str) -> String {
    format!("{ANALYSIS_PROMPT}{corpus_summary}")
}

/// Build the synthesis prompt: embed the strategy brief and the strict
/// output contract (exact field list, JSON only, no surrounding text).
pub fn synthesis_prompt(instructions: &str) -> String {
    let field_list = REQUIRED_FIELDS.join("\n- ");
    format!(
        "### INSTRUCTION ###\n\
         You are a social media profile architect. Create ONE unique,\n\
         internally consistent social network profile following the strategy\n\
         brief below. Do not duplicate any profile the brief describes as\n\
         already existing.\n\
         \n\
         Required JSON fields (snake_case keys, exactly these names):\n\
         - {field_list}\n\
         \n\
         Field notes: age is an integer; languages_known is a JSON array of\n\
         strings; date_of_birth is YYYY-MM-DD and must agree with age.\n\
         \n\
         [Strategy Brief]:\n\
         {instructions}\n\
         \n\
         CRITICAL: Output ONLY the JSON object itself, with no additional\n\
         text, explanations, or markdown formatting."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_prompt_embeds_summary() {
        let prompt = analysis_prompt("The corpus holds 7 profiles.");
        assert!(prompt.contains("7 profiles"));
        assert!(prompt.contains("### CORPUS SUMMARY ###"));
    }

    #[test]
    fn test_synthesis_prompt_lists_every_required_field() {
        let prompt = synthesis_prompt("emphasize rare languages");
        for field in REQUIRED_FIELDS {
            assert!(prompt.contains(field), "missing field {field}");
        }
        assert!(prompt.contains("emphasize rare languages"));
        assert!(prompt.contains("ONLY the JSON object"));
    }
}
