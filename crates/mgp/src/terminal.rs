//! Line-oriented presentation layer.
//!
//! Everything here is rendering and input routing; state and failure
//! semantics live in `mgp_core::poster::Poster`.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use mgp_core::{
    auth::factor_channel,
    config::Config,
    dispatch::Outcome,
    domain::ConversationTarget,
    events::{EventSink, UiEvent},
    platform::port::PlatformClient,
    poster::Poster,
};

struct Printer {
    json: bool,
}

impl Printer {
    /// Prompts go to stderr in JSON mode so stdout stays one event per line.
    fn prompt(&self, text: &str) {
        if self.json {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }

    fn event(&self, ev: &UiEvent) {
        if self.json {
            match serde_json::to_string(ev) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("failed to encode event: {e}"),
            }
            return;
        }

        match ev {
            UiEvent::Status { text } if !text.is_empty() => println!("{text}"),
            UiEvent::Status { .. } => {}
            UiEvent::Error { message, .. } => eprintln!("{message}"),
            UiEvent::AuthState { state } => tracing::debug!("auth state: {state:?}"),
            UiEvent::RevealSecondaryFactor { hint } => match hint {
                Some(h) => println!("Two-step verification is enabled (hint: {h})."),
                None => println!("Two-step verification is enabled."),
            },
            UiEvent::TargetsLoaded { targets } => print_targets(targets),
            UiEvent::Dispatched { report } => {
                for (id, outcome) in &report.entries {
                    match outcome {
                        Outcome::Delivered => println!("  {id}: delivered"),
                        Outcome::Failed(reason) => println!("  {id}: FAILED ({reason})"),
                        Outcome::NotAttempted => println!("  {id}: not attempted"),
                    }
                }
            }
        }
    }

    fn flush(&self, rx: &mut UnboundedReceiver<UiEvent>) {
        while let Ok(ev) = rx.try_recv() {
            self.event(&ev);
        }
    }
}

fn print_targets(targets: &[ConversationTarget]) {
    if targets.is_empty() {
        println!("No group conversations found.");
        return;
    }
    println!("Groups:");
    for (idx, t) in targets.iter().enumerate() {
        println!("  {:>3}. {} ({})", idx + 1, t.display_name, t.id);
    }
}

type StdinLines = Lines<BufReader<Stdin>>;

pub async fn run(cfg: Arc<Config>, platform: Arc<dyn PlatformClient>) -> anyhow::Result<()> {
    let (events, mut rx) = EventSink::channel();
    let poster = Arc::new(Poster::new(platform, events));
    let printer = Printer {
        json: cfg.events_json,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Failed or cancelled attempts were rendered from the event stream; the
    // operator gets the form back.
    let targets = loop {
        let attempt = if poster.session().is_some() {
            printer.prompt("Press Enter to fetch the groups again.");
            if read_line(&mut lines).await?.is_none() {
                return Ok(());
            }
            poster.load_targets().await
        } else {
            printer.prompt("Phone number:");
            let Some(phone) = read_line(&mut lines).await? else {
                return Ok(());
            };
            login(&poster, &printer, &mut lines, &mut rx, phone).await?
        };
        printer.flush(&mut rx);
        match attempt {
            Ok(targets) => break targets,
            Err(e) => tracing::debug!("login attempt ended: {e}"),
        }
    };

    loop {
        printer.prompt("Groups to post to (comma-separated numbers, empty to quit):");
        let Some(line) = read_line(&mut lines).await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        let picks = match parse_selection(&line, targets.len()) {
            Ok(p) => p,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        for id in poster.selection().await {
            poster.toggle_target(&id, false).await;
        }
        for idx in picks {
            poster.toggle_target(&targets[idx].id, true).await;
        }

        printer.prompt("Message:");
        let Some(message) = read_line(&mut lines).await? else {
            break;
        };
        poster.set_draft(message).await;

        // Failures were already rendered from the event stream.
        let _ = poster.send().await;
        printer.flush(&mut rx);
    }

    Ok(())
}

/// One handshake. Input lines go to the login code, or to the password once
/// the platform asks for it; Ctrl-C or EOF cancels.
async fn login(
    poster: &Arc<Poster>,
    printer: &Printer,
    lines: &mut StdinLines,
    rx: &mut UnboundedReceiver<UiEvent>,
    phone: String,
) -> anyhow::Result<mgp_core::Result<Vec<ConversationTarget>>> {
    let (inputs, source) = factor_channel();
    let cancel = CancellationToken::new();
    let mut task = {
        let poster = poster.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { poster.login(&phone, source, &cancel).await })
    };

    printer.prompt("Login code:");
    let mut awaiting_password = false;
    let mut stdin_open = true;
    loop {
        tokio::select! {
            res = &mut task => return Ok(res?),
            Some(ev) = rx.recv() => {
                printer.event(&ev);
                if matches!(ev, UiEvent::RevealSecondaryFactor { .. }) {
                    awaiting_password = true;
                    printer.prompt("Password:");
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let value = factor_input(&line, awaiting_password);
                    let accepted = if awaiting_password {
                        inputs.set_secondary(value)
                    } else {
                        inputs.set_primary(value)
                    };
                    if !accepted && !value.is_empty() {
                        tracing::debug!("input ignored: factor already supplied");
                    }
                }
                None => {
                    stdin_open = false;
                    cancel.cancel();
                }
            },
            _ = tokio::signal::ctrl_c() => cancel.cancel(),
        }
    }
}

/// Next input line, or `None` on EOF or Ctrl-C.
async fn read_line(lines: &mut StdinLines) -> anyhow::Result<Option<String>> {
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}

/// The login code is trimmed; the password is passed on as typed.
fn factor_input(line: &str, password: bool) -> &str {
    if password {
        line
    } else {
        line.trim()
    }
}

/// Parse "1, 3,2" into zero-based indexes, keeping order and dropping repeats.
fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .map_err(|_| format!("Not a number: {part}"))?;
        if n == 0 || n > len {
            return Err(format!("No group numbered {n}"));
        }
        if !out.contains(&(n - 1)) {
            out.push(n - 1);
        }
    }
    if out.is_empty() {
        return Err("Select at least one group".to_string());
    }
    Ok(out)
}
