//! The boundary between interactive flows and whoever answers them.
//!
//! Resolver, search and mutation flows only talk to a [`Console`], so the
//! same code runs against the terminal or against a [`Script`] of canned
//! answers in tests.

use std::collections::VecDeque;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::Result;

pub trait Console {
    /// Show `prompt` and read one line. `None` means input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn write_line(&mut self, line: &str);

    /// Yes/no question, anything but `y`/`yes` is a no.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N]: "))?;
        Ok(matches!(
            answer.as_deref().map(|a| a.trim().to_ascii_lowercase()).as_deref(),
            Some("y") | Some("yes")
        ))
    }
}

/// Standard output, with line editing and history on input.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

/// Ctrl-D and Ctrl-C end input the same way an exhausted script does.
fn read_outcome(read: std::result::Result<String, ReadlineError>) -> Result<Option<String>> {
    match read {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Console for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let line = read_outcome(self.editor.readline(prompt))?;
        if let Some(line) = line.as_deref().filter(|l| !l.trim().is_empty()) {
            self.editor.add_history_entry(line)?;
        }
        Ok(line)
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Replays prepared answers and records everything shown.
#[derive(Debug, Default)]
pub struct Script {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl Script {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn saw(&self, fragment: &str) -> bool {
        self.transcript.iter().any(|l| l.contains(fragment))
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for Script {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let answer = self.answers.pop_front();
        self.transcript
            .push(format!("{prompt}{}", answer.as_deref().unwrap_or("")));
        Ok(answer)
    }

    fn write_line(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }
}
