use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Answer to "close the whole group or just this window?".
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloseAnswer {
    All,
    #[default]
    One,
    Cancel,
}

/// Blocking modal confirmation.
pub trait Prompt {
    fn confirm(&mut self, message: &str, default: CloseAnswer) -> CloseAnswer;
}

/// Replays queued answers, falling back to the default once they run out.
/// Every message shown is recorded.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<CloseAnswer>,
    shown: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self { Self::default() }

    pub fn with_answers(answers: impl IntoIterator<Item = CloseAnswer>) -> Self {
        ScriptedPrompt {
            answers: answers.into_iter().collect(),
            shown: Vec::new(),
        }
    }

    pub fn push_answer(&mut self, answer: CloseAnswer) { self.answers.push_back(answer); }

    pub fn shown(&self) -> &[String] { &self.shown }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, message: &str, default: CloseAnswer) -> CloseAnswer {
        self.shown.push(message.to_string());
        let answer = self.answers.pop_front().unwrap_or(default);
        debug!(%answer, "Scripted prompt answered");
        answer
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn scripted_prompt_falls_back_to_default() {
        let mut prompt = ScriptedPrompt::with_answers([CloseAnswer::All]);
        assert_eq!(prompt.confirm("first", CloseAnswer::Cancel), CloseAnswer::All);
        assert_eq!(prompt.confirm("second", CloseAnswer::Cancel), CloseAnswer::Cancel);
        assert_eq!(prompt.shown(), ["first", "second"]);
    }

    #[test]
    fn close_answer_parses_snake_case() {
        assert_eq!(CloseAnswer::from_str("cancel").unwrap(), CloseAnswer::Cancel);
        assert_eq!(CloseAnswer::One.to_string(), "one");
    }
}
