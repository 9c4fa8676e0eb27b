use std::collections::VecDeque;
use std::io::{BufRead, Write};

use colored::Colorize;

/// Yes/no gate between the dry run and the real run of a mutating phase.
pub trait Confirm {
    /// Ask the question and return the answer.
    ///
    /// # Errors
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, question: &str) -> anyhow::Result<bool>;
}

/// Parse a yes/no answer. Empty input means no.
///
/// ```rust
/// use movie_sort::reorganize::parse_answer;
///
/// assert_eq!(parse_answer("Yes"), Some(true));
/// assert_eq!(parse_answer(""), Some(false));
/// assert_eq!(parse_answer("maybe"), None);
/// ```
#[must_use]
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Interactive prompt reading answers from a buffered reader, stdin by default.
pub struct StdinPrompt<R = std::io::StdinLock<'static>> {
    reader: R,
}

impl StdinPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: std::io::stdin().lock(),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> StdinPrompt<R> {
    pub const fn from_reader(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Confirm for StdinPrompt<R> {
    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        loop {
            print!("{}", format!("{question} [y/N]: ").magenta());
            std::io::stdout().flush()?;

            let mut input = String::new();
            if self.reader.read_line(&mut input)? == 0 {
                // EOF
                println!();
                return Ok(false);
            }
            match parse_answer(&input) {
                Some(answer) => return Ok(answer),
                None => println!("Please answer y or n."),
            }
        }
    }
}

/// Gives the same answer to every question without asking.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _question: &str) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

/// Answers questions from a fixed list, then says no. Records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    pub questions: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            questions: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}
