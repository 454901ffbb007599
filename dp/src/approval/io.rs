//! Terminal I/O for approvals

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Line-oriented conversation with the reviewer
#[async_trait]
pub trait ApprovalIo: Send {
    /// Show text to the reviewer
    async fn write(&mut self, text: &str) -> io::Result<()>;

    /// Next line of input; `None` at end of input
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Reviewer at the terminal
pub struct ConsoleIo {
    lines: Lines<BufReader<Stdin>>,
    stdout: Stdout,
}

impl ConsoleIo {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalIo for ConsoleIo {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.write_all(b"\n").await?;
        self.stdout.flush().await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Pre-recorded answers, for automation and tests
///
/// Once the answers run out it reports end of input, or waits forever when
/// built with [`ScriptedIo::hanging`].
#[derive(Debug, Default)]
pub struct ScriptedIo {
    inputs: VecDeque<String>,
    output: Vec<String>,
    hang_when_empty: bool,
}

impl ScriptedIo {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Like [`new`](Self::new), but never answers once exhausted
    pub fn hanging<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hang_when_empty: true,
            ..Self::new(inputs)
        }
    }

    /// Everything written so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }
}

#[async_trait]
impl ApprovalIo for ScriptedIo {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.inputs.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.hang_when_empty => std::future::pending().await,
            None => Ok(None),
        }
    }
}
