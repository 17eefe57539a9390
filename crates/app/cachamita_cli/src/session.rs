//! Conversation session — keeps history and prints streamed replies.

use std::io::Write;

use cachamita_core::chat::ChatMessage;
use cachamita_core::render;
use cachamita_core::reply::{ReplyOutcome, ReplyReader, Transcript};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::client::ChatClient;

/// History lives only as long as the session, like the browser page.
pub struct Session {
    client: ChatClient,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Send `content` as the next user turn and print the reply to `out`.
    ///
    /// Whatever text arrived is kept as the assistant turn, even when the
    /// reply failed or was cancelled part-way.
    pub async fn ask<W: Write>(
        &mut self,
        content: &str,
        cancel: CancellationToken,
        out: W,
    ) -> Result<ReplyOutcome> {
        self.history.push(ChatMessage::user(content));
        let stream = self.client.send(&self.history).await?;

        let mut printer = TerminalPrinter::new(out);
        let mut transcript = Transcript::new();
        let outcome = ReplyReader::new(stream, cancel)
            .read_into(&mut transcript, |chunk| printer.push(chunk))
            .await;
        printer.finish()?;
        log::debug!("reply {outcome:?} after {} bytes", transcript.as_str().len());

        if !transcript.is_empty() {
            self.history.push(transcript.into_message());
        }
        Ok(outcome)
    }
}

/// Prints reply text line by line so photo markup is rendered whole.
pub struct TerminalPrinter<W: Write> {
    out: W,
    line: String,
    error: Option<std::io::Error>,
}

impl<W: Write> TerminalPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: String::new(),
            error: None,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.line.push_str(chunk);
        while let Some(pos) = self.line.find('\n') {
            let rest = self.line.split_off(pos + 1);
            let complete = std::mem::replace(&mut self.line, rest);
            self.write(&render::to_terminal(&complete));
        }
    }

    /// Print any unfinished line and surface the first write error.
    pub fn finish(mut self) -> std::io::Result<()> {
        if !self.line.is_empty() {
            let rest = std::mem::take(&mut self.line);
            self.write(&render::to_terminal(&rest));
        }
        self.write("\n");
        match self.error.take() {
            Some(e) => Err(e),
            None => self.out.flush(),
        }
    }

    fn write(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            self.error = Some(e);
        }
    }
}
