//! Interactive session: a line-oriented stand-in for the input form.
//!
//! Input stays live while requests are in flight, so a user can change the
//! form and submit again before the previous answer arrives.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::debug;

use crate::orchestrator::{ExecuteOutcome, RequestOrchestrator, RequestState};
use crate::query::{QueryInput, TopK};
use crate::render::{render, render_result};

const HELP: &str = "\
Commands:
  text <job description>   set the free-text field (no argument clears it)
  url <link>               set the job posting URL (no argument clears it)
  k <5-10>                 set how many recommendations to ask for
  submit                   send the current form
  show                     print the form and the latest state
  clear                    reset the form
  help                     show this message
  quit                     leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    Url(String),
    TopK(TopK),
    Submit,
    Show,
    Clear,
    Help,
    Quit,
    Nothing,
}

/// Parses one input line. The argument of `text` and `url` is everything
/// after the first run of whitespace, kept verbatim.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(Command::Nothing);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (trimmed, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "text" | "t" => Ok(Command::Text(rest.to_string())),
        "url" | "u" => Ok(Command::Url(rest.trim().to_string())),
        "k" | "top-k" | "topk" => rest.parse::<TopK>().map(Command::TopK),
        "submit" | "go" | "s" => Ok(Command::Submit),
        "show" => Ok(Command::Show),
        "clear" => Ok(Command::Clear),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

pub struct Shell<W: Write> {
    input: QueryInput,
    orchestrator: RequestOrchestrator,
    state: watch::Receiver<RequestState>,
    in_flight: JoinSet<ExecuteOutcome>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(orchestrator: RequestOrchestrator, out: W) -> Self {
        Self {
            input: QueryInput::new(),
            state: orchestrator.subscribe(),
            orchestrator,
            in_flight: JoinSet::new(),
            out,
        }
    }

    /// Runs until `quit` or end of input, then waits for anything still in flight.
    pub async fn run<R>(mut self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        writeln!(self.out, "Type 'help' for commands.")?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle_line(&line)? {
                        break;
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.report(joined?)?;
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            self.report(joined?)?;
        }
        Ok(())
    }

    /// Applies one line of input. Returns `false` when the session should end.
    pub fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(self.out, "! {message}")?;
                return Ok(true);
            }
        };

        match command {
            Command::Text(text) => self.input.set_text(text),
            Command::Url(url) => self.input.set_url(url),
            Command::TopK(k) => self.input.set_top_k(k),
            Command::Clear => self.input.clear(),
            Command::Submit => {
                let query = self.input.submit();
                self.in_flight.spawn(self.orchestrator.execute(query));
                writeln!(self.out, "Loading...")?;
            }
            Command::Show => self.show()?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(false),
            Command::Nothing => {}
        }
        Ok(true)
    }

    fn show(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "text: {:?}\nurl:  {:?}\nk:    {}",
            self.input.text(),
            self.input.url(),
            self.input.top_k()
        )?;
        let state = self.state.borrow_and_update().clone();
        if state.is_loading() {
            writeln!(self.out, "Loading...")?;
        }
        if let Some(table) = render(&state) {
            write!(self.out, "{table}")?;
        }
        Ok(())
    }

    fn report(&mut self, outcome: ExecuteOutcome) -> Result<()> {
        match outcome {
            ExecuteOutcome::Success(result) if result.is_empty() => {
                writeln!(self.out, "No results.")?
            }
            ExecuteOutcome::Success(result) => {
                if let Some(table) = render_result(&result) {
                    write!(self.out, "{table}")?;
                }
            }
            ExecuteOutcome::Failed(message) => writeln!(self.out, "! {message}")?,
            ExecuteOutcome::Superseded { generation } => {
                debug!(
                    generation,
                    latest = self.orchestrator.generation(),
                    "Superseded response not shown"
                );
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use crate::models::recommendation::RecommendationResult;
    use crate::query::Query;
    use crate::recommend_client::RecommendTransport;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[test]
    fn test_parse_text_keeps_argument_verbatim() {
        assert_eq!(
            parse_command("text  Java developer,  40 minutes max"),
            Ok(Command::Text("Java developer,  40 minutes max".to_string()))
        );
    }

    #[test]
    fn test_parse_splits_on_tab() {
        assert_eq!(
            parse_command("text\tData analyst"),
            Ok(Command::Text("Data analyst".to_string()))
        );
        assert_eq!(
            parse_command("k\t9"),
            Ok(Command::TopK(TopK::new(9).unwrap()))
        );
    }

    #[test]
    fn test_parse_bare_text_clears() {
        assert_eq!(parse_command("text"), Ok(Command::Text(String::new())));
    }

    #[test]
    fn test_parse_top_k() {
        assert_eq!(
            parse_command("k 8"),
            Ok(Command::TopK(TopK::new(8).unwrap()))
        );
        assert!(parse_command("k 11").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("   "), Ok(Command::Nothing));
        assert_eq!(parse_command("SUBMIT\n"), Ok(Command::Submit));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert!(parse_command("frobnicate").is_err());
    }

    /// Echoes `top_k` back as a one-row table.
    struct EchoTransport;

    #[async_trait]
    impl RecommendTransport for EchoTransport {
        async fn recommend(&self, query: &Query) -> Result<RecommendationResult, ClientError> {
            if query.query_text.is_none() && query.query_url.is_none() {
                return Err(ClientError::Api {
                    status: 400,
                    message: Some("Either query_text or query_url must be provided".into()),
                });
            }
            let body = format!(r#"{{"table": [{{"top_k": {}, "url": null}}]}}"#, query.top_k);
            Ok(serde_json::from_str(&body)?)
        }
    }

    async fn run_session(script: &str) -> String {
        let orchestrator = RequestOrchestrator::new(Arc::new(EchoTransport));
        let mut out = Vec::new();
        Shell::new(orchestrator, &mut out)
            .run(script.as_bytes())
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_session_renders_table_after_submit() {
        let output = run_session("text analyst\nk 6\nsubmit\n").await;
        assert!(output.contains("Loading..."));
        assert!(output.contains("top_k"));
        assert!(output.contains("6"));
        assert!(output.contains("N/A"));
    }

    #[tokio::test]
    async fn test_session_reports_error_inline() {
        let output = run_session("submit\nquit\n").await;
        assert!(output.contains("! Either query_text or query_url must be provided"));
    }

    #[tokio::test]
    async fn test_show_reads_latest_state() {
        let orchestrator = RequestOrchestrator::new(Arc::new(EchoTransport));
        let mut out = Vec::new();
        let mut shell = Shell::new(orchestrator, &mut out);

        shell.handle_line("text analyst").unwrap();
        shell.handle_line("submit").unwrap();
        shell.handle_line("show").unwrap();
        let outcome = shell.in_flight.join_next().await.unwrap().unwrap();
        assert!(matches!(outcome, ExecuteOutcome::Success(_)));
        shell.handle_line("show").unwrap();
        drop(shell);

        let output = String::from_utf8(out).unwrap();
        let (before, after) = output.split_at(output.rfind("text: ").unwrap());
        assert!(before.matches("Loading...").count() >= 2);
        assert!(!after.contains("Loading..."));
        assert!(after.contains("top_k"));
        assert!(after.contains("N/A"));
    }

    #[tokio::test]
    async fn test_session_reports_unknown_command() {
        let output = run_session("dance\n").await;
        assert!(output.contains("unknown command 'dance'"));
    }
}
