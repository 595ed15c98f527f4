//! Prompt templates for STEM solving and term definition.

/// System prompt for STEM problem solving.
pub const STEM_SYSTEM_PROMPT: &str = "You are an expert STEM tutor. Provide clear, detailed solutions with step-by-step explanations.";

/// System prompt for term definitions.
pub const DEFINITION_SYSTEM_PROMPT: &str =
    "You are an expert educator explaining concepts at an appropriate level.";

/// Build the user prompt for solving a STEM problem.
pub fn stem_prompt(problem: &str, subject: &str) -> String {
    format!(
        "<problem>\n{problem}\n</problem>\n\
         <subject>{subject}</subject>\n\
         <instructions>\n\
         Please solve this {subject} problem. Provide:\n\
         1. Initial problem analysis\n\
         2. Step-by-step solution with explanations\n\
         3. Final answer clearly marked\n\
         4. Key concepts used\n\
         \n\
         Format your response in markdown, with:\n\
         - Clear headings for each section\n\
         - Mathematical expressions in LaTeX when needed\n\
         - Numbered steps\n\
         - Clear explanations for each step\n\
         </instructions>"
    )
}

/// Build the user prompt for defining a term.
pub fn definition_prompt(term: &str, grade_level: &str, subject: &str) -> String {
    format!(
        "<term>{term}</term>\n\
         <context>\n\
         <grade_level>{grade_level}</grade_level>\n\
         <subject>{subject}</subject>\n\
         </context>\n\
         <instructions>\n\
         Please provide a comprehensive explanation of this term with:\n\
         1. A clear, grade-appropriate definition\n\
         2. Real-world examples and applications\n\
         3. Related concepts\n\
         4. Usage in the subject area\n\
         \n\
         Format your response in markdown with clear sections.\n\
         </instructions>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_prompt_embeds_problem_and_subject() {
        let prompt = stem_prompt("Solve 2x + 3 = 7", "algebra");
        assert!(prompt.contains("<problem>\nSolve 2x + 3 = 7\n</problem>"));
        assert!(prompt.contains("<subject>algebra</subject>"));
        assert!(prompt.contains("Please solve this algebra problem."));
        assert!(prompt.contains("3. Final answer clearly marked"));
    }

    #[test]
    fn test_definition_prompt_embeds_context() {
        let prompt = definition_prompt("osmosis", "middle school", "biology");
        assert!(prompt.contains("<term>osmosis</term>"));
        assert!(prompt.contains("<grade_level>middle school</grade_level>"));
        assert!(prompt.contains("<subject>biology</subject>"));
        assert!(prompt.contains("grade-appropriate definition"));
    }
}
