//! Prompt construction for watch identification.
//!
//! The answer template is identical in every mode so downstream display
//! logic can treat every answer uniformly.

use serde::{Deserialize, Serialize};

/// Fixed instruction requesting the five-part answer.
pub const BASE_PROMPT: &str = "What is the reference number of this watch?\n\n\
For your answer, use the following format:\n\
1. Reference Number: (Your best, most specific guess. If not certain, state the most likely reference number and explain your reasoning. Do NOT answer 'Not identifiable' or say you cannot identify the watch unless the image is truly blank or contains absolutely no watch-like features. If you are unsure, make your best expert guess based on any visible features, brand, or style, and explain your reasoning.)\n\
2. Brand and Model: (Be as specific as possible.)\n\
3. Summary: (Describe the watch, including all visible features and why you think it matches your guess.)\n\
4. Other Details: (Case size, year, movement, material, dial color, special features, etc.)\n\
5. Reasoning: (Explain in detail how you arrived at your guess, referencing specific features in the image.)\n\n\
Never use fallback phrases like 'I'm sorry, but I can't identify...' or 'Not identifiable' unless there is absolutely no possible guess. Always make your best expert guess, even if uncertain.\n\n\
Always use the exact same answer format as above for every guess, including Guess Again.";

const PREVIOUS_GUESSES_HEADER: &str = "Previous guesses (not correct):";

const NEW_HYPOTHESIS_INSTRUCTION: &str = "Please provide a new, different guess for the reference number, brand, and model, using a different approach or hypothesis. Do not repeat any previous guesses. Explain your new reasoning in detail, referencing features in the image that led you to this alternative guess.";

const AVOID_REPEAT_INSTRUCTION: &str = "If you have already provided an answer, try to provide a different guess for the reference number and other details, if possible. Do not repeat your previous answer.";

/// Which kind of attempt the prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    FirstAttempt,
    Retry,
}

/// Build the instruction sent alongside the image.
///
/// In `Retry` mode every prior guess is enumerated verbatim, in order.
pub fn build_prompt(mode: PromptMode, prior_guesses: &[String], user_hint: &str) -> String {
    if mode == PromptMode::FirstAttempt {
        return BASE_PROMPT.to_string();
    }

    let hint = user_hint.trim();
    let hint_clause = if hint.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nAdditional user-provided information about the watch: {}\nTake this into account for your new guess.",
            hint
        )
    };

    if prior_guesses.is_empty() {
        return format!("{}{}\n\n{}", BASE_PROMPT, hint_clause, AVOID_REPEAT_INSTRUCTION);
    }

    let enumerated = prior_guesses
        .iter()
        .enumerate()
        .map(|(i, guess)| format!("{}. {}", i + 1, guess))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n{}\n{}{}\n\n{}",
        BASE_PROMPT, PREVIOUS_GUESSES_HEADER, enumerated, hint_clause, NEW_HYPOTHESIS_INSTRUCTION
    )
}
