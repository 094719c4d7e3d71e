//! Terminal-facing collaborators: the interactive confirmation gate and the
//! console notifier.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Mutex;

use dropsync_core::contract::{ConfirmationGate, Notifier};
use dropsync_core::synchronise::{PairOutcome, PairReport};

/// Asks on an output stream and reads the answer from an input stream.
///
/// Empty input or end of input selects the prompt's default. Unrecognised
/// answers are asked again.
pub struct TerminalGate<R, W> {
    io: Mutex<(R, W)>,
}

impl TerminalGate<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        TerminalGate::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> TerminalGate<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        TerminalGate {
            io: Mutex::new((input, output)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        match self.io.into_inner() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn parse_answer(line: &str) -> Option<Option<bool>> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(None),
        "y" | "yes" => Some(Some(true)),
        "n" | "no" => Some(Some(false)),
        _ => None,
    }
}

impl<R, W> ConfirmationGate for TerminalGate<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn ask(&self, prompt: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let mut guard = match self.io.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (input, output) = &mut *guard;

        loop {
            if let Err(e) = write!(output, "{prompt} {hint} ").and_then(|_| output.flush()) {
                tracing::error!(error = ?e, "Could not write prompt, using default answer");
                return default;
            }

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => {
                    tracing::debug!(default, "End of input at prompt");
                    return default;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = ?e, "Could not read answer, using default");
                    return default;
                }
            }

            match parse_answer(&line) {
                Some(answer) => return answer.unwrap_or(default),
                None => {
                    let _ = writeln!(output, "Please answer y or n.");
                }
            }
        }
    }
}

/// Prints pair outcomes: failures to stderr, everything else to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, report: &PairReport) {
        match report.outcome {
            PairOutcome::Failed(_) => eprintln!("{report}"),
            _ => println!("{report}"),
        }
    }
}
