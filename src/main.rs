use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sci_kalk::explain::{self, Explainer, Explanation, ExplanationState};
use sci_kalk::{
    Action, AngleUnit, ExplainError, JsonFileStore, Keypad, MemoryOp, MemoryStore, Store,
    help_text,
};
use thousands::Separable;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Scientific calculator with memory, history and step-by-step explanations.
#[derive(Parser, Debug)]
#[command(name = "sci-kalk", version, about)]
struct Args {
    /// Angle unit for trigonometry; overrides the stored preference.
    #[arg(long, value_name = "deg|rad")]
    angle: Option<AngleUnit>,

    /// JSON file holding history, memory and angle unit.
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Keep all state in memory only.
    #[arg(long)]
    no_persist: bool,

    /// Explanation backend (openai, anthropic, google, ollama, ...).
    #[arg(long, default_value = "openai")]
    backend: String,

    /// Model used for explanations.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// API key for the explanation backend.
    #[arg(long, env = "SCI_KALK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// Stands in when no explanation backend is configured.
struct Unavailable(&'static str);

impl Explainer for Unavailable {
    async fn explain(&self, _expression: &str) -> Result<Explanation, ExplainError> {
        Err(ExplainError::Backend(self.0.to_string()))
    }
}

fn open_store(args: &Args) -> Box<dyn Store> {
    if args.no_persist {
        return Box::new(MemoryStore::new());
    }
    let path = args.state.clone().or_else(|| {
        dirs::data_dir().map(|dir| dir.join("sci-kalk").join("state.json"))
    });
    match path {
        Some(path) => match JsonFileStore::open(&path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unusable, not persisting");
                Box::new(MemoryStore::new())
            }
        },
        None => {
            warn!("no data directory found, not persisting");
            Box::new(MemoryStore::new())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut keypad = Keypad::load(open_store(&args));
    if let Some(unit) = args.angle {
        keypad.handle(Action::SetAngleUnit(unit))?;
    }

    #[cfg(feature = "llm")]
    let explainer = match &args.api_key {
        Some(key) => Some(
            explain::LlmExplainer::new(&args.backend, &args.model, key)
                .context("could not set up the explanation backend")?,
        ),
        None => None,
    };
    #[cfg(not(feature = "llm"))]
    let explainer: Option<Unavailable> = {
        if args.api_key.is_some() {
            tracing::info!(backend = %args.backend, model = %args.model, "built without llm support, ignoring API key");
        }
        None
    };

    run_shell(&mut keypad, explainer.as_ref()).await
}

async fn run_shell<S: Store, E: Explainer>(
    keypad: &mut Keypad<S>,
    explainer: Option<&E>,
) -> Result<()> {
    let mut explanation = ExplanationState::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Welcome to sci-kalk. Type 'exit' to quit.");
    println!("Type 'help' for a list of all functions or 'help <func>' for specific usage.");

    loop {
        print!("[{}] > ", keypad.angle_unit());
        io::stdout().flush().context("could not flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("could not read input")?;
        // Check for comment marker (#) and strip the rest of the line
        let input = line.split('#').next().unwrap_or("").trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "exit" | "quit" => break,
            "help" => match help_text(rest) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Error: {}", e),
            },
            "deg" => report(keypad.handle(Action::SetAngleUnit(AngleUnit::Degrees))),
            "rad" => report(keypad.handle(Action::SetAngleUnit(AngleUnit::Radians))),
            "m+" => report(keypad.handle(Action::Memory(MemoryOp::Add))),
            "m-" => report(keypad.handle(Action::Memory(MemoryOp::Subtract))),
            "mc" => report(keypad.handle(Action::Memory(MemoryOp::Clear))),
            "mr" => {
                report(keypad.handle(Action::Memory(MemoryOp::Recall)));
                println!("{}", keypad.expression());
            }
            "memory" => println!("M = {}", keypad.memory().separate_with_commas()),
            "clear" | "c" => report(keypad.handle(Action::Clear)),
            "history" => {
                for (i, entry) in keypad.history().iter().enumerate() {
                    println!("{:>3}: {} = {}", i, entry.expression, entry.result);
                }
            }
            "load" => match rest.parse::<usize>().ok().and_then(|i| keypad.history().get(i)) {
                Some(entry) => {
                    let expression = entry.expression.clone();
                    report(keypad.handle(Action::LoadHistory(expression)));
                    println!("{}", keypad.expression());
                }
                None => eprintln!("Error: no history entry '{}'", rest),
            },
            "explain" => {
                let target = if rest.is_empty() {
                    keypad.expression().to_string()
                } else {
                    rest.to_string()
                };
                let outcome = match explainer {
                    Some(explainer) => explain::request(explainer, &mut explanation, &target).await,
                    None => {
                        let fallback = Unavailable("no explanation backend configured");
                        explain::request(&fallback, &mut explanation, &target).await
                    }
                };
                match outcome {
                    Ok(()) => println!("{}", explanation.text().unwrap_or_default()),
                    Err(e) => eprintln!("Error: {}", e),
                }
                explanation.dismiss();
            }
            _ => evaluate_line(keypad, input),
        }
    }

    Ok(())
}

/// Types `input` on the keypad and presses `=`. A line starting with an
/// operator continues from the previous result.
fn evaluate_line<S: Store>(keypad: &mut Keypad<S>, input: &str) {
    let continues = input.starts_with(['+', '-', '*', '/', '^', '%']) && keypad.result().is_some();
    if !continues {
        report(keypad.handle(Action::Clear));
    }

    let keys = match Action::keys_for(input) {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    for key in keys {
        if let Err(e) = keypad.handle(key) {
            eprintln!("{}", e);
            return;
        }
    }

    match keypad.handle(Action::Equals) {
        Ok(()) => {
            if let Some(result) = keypad.result() {
                println!("= {}", result.separate_with_commas());
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn report(outcome: Result<(), sci_kalk::KeypadError>) {
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
    }
}
