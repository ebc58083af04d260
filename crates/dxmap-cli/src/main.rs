//! Interactive decision-map shell.
//!
//! Seeds a session from intake symptoms given on the command line, then
//! drives it from a line-oriented prompt, rendering the graph as text.
//! The oracle base URL comes from `--oracle-url` or `DXMAP_ORACLE_URL`;
//! `--offline` replaces the oracle with one that always fails, so every
//! branch takes the fallback path.

use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser;

use dxmap_client::HttpOracle;
use dxmap_core::{GraphStore, NodeId};
use dxmap_session::{
    ClickOutcome, GraphSurface, HoverCard, Oracle, OracleError, OracleRequest, OracleResponse,
    Session, SurfaceEvent,
};

const DEFAULT_ORACLE_URL: &str = "http://localhost:5000";

/// Interactive diagnostic decision map.
#[derive(Parser)]
#[command(name = "dxmap", about = "Interactive diagnostic decision map")]
struct Cli {
    /// Intake symptom; repeat the flag for more than one.
    #[arg(short = 's', long = "symptom", required = true)]
    symptoms: Vec<String>,

    /// Recommendation service base URL (default: $DXMAP_ORACLE_URL).
    #[arg(long)]
    oracle_url: Option<String>,

    /// Run without a recommendation service; every branch falls back.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = if cli.offline {
        run(OfflineOracle, cli.symptoms).await
    } else {
        let base_url = cli
            .oracle_url
            .or_else(|| std::env::var("DXMAP_ORACLE_URL").ok())
            .unwrap_or_else(|| DEFAULT_ORACLE_URL.to_string());
        run(HttpOracle::new(&base_url), cli.symptoms).await
    };
    process::exit(exit_code);
}

/// Oracle stand-in for `--offline`: always unreachable.
struct OfflineOracle;

impl Oracle for OfflineOracle {
    async fn next_step(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        Err(OracleError::Transport {
            reason: "offline mode".into(),
        })
    }
}

/// Runs one session against stdin commands. Returns the exit code.
async fn run<O: Oracle>(oracle: O, symptoms: Vec<String>) -> i32 {
    let mut session = Session::new(oracle);
    let mut surface = TerminalSurface;

    if let Err(err) = session.start(symptoms, &mut surface).await {
        eprintln!("Error: {}", err);
        return 1;
    }

    println!();
    println!("Commands: show | hover <id> | blur | click <id> | complete <id> <note> | activate <id> | force <label> | quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("dxmap> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            return 0;
        };
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");
        let result = match command {
            "" => Ok(()),
            "quit" | "exit" => return 0,
            "show" => {
                print_graph(session.store());
                Ok(())
            }
            "hover" => match words.next() {
                Some(id) => session
                    .handle_event(SurfaceEvent::Hover(NodeId::from(id)), &mut surface)
                    .await
                    .map(|_| ()),
                None => {
                    println!("usage: hover <id>");
                    Ok(())
                }
            },
            "blur" => session
                .handle_event(SurfaceEvent::Blur, &mut surface)
                .await
                .map(|_| ()),
            "click" => match words.next() {
                Some(id) => {
                    handle_click(&mut session, &mut surface, NodeId::from(id), &mut lines).await
                }
                None => {
                    println!("usage: click <id>");
                    Ok(())
                }
            },
            "activate" => match words.next() {
                Some(id) => session
                    .activate_aggregator(&NodeId::from(id), &mut surface)
                    .await
                    .map(|activated| {
                        if !activated {
                            println!("nothing to activate at {}", id);
                        }
                    }),
                None => {
                    println!("usage: activate <id>");
                    Ok(())
                }
            },
            "complete" => match words.next() {
                Some(id) => {
                    let note = words.collect::<Vec<_>>().join(" ");
                    session.complete_test(&NodeId::from(id), &note, &mut surface)
                }
                None => {
                    println!("usage: complete <id> <note>");
                    Ok(())
                }
            },
            "force" => {
                let label = words.collect::<Vec<_>>().join(" ");
                if label.is_empty() {
                    println!("usage: force <label>");
                } else {
                    print_handoff(&session.force_diagnosis(&label));
                }
                Ok(())
            }
            other => {
                println!("unknown command: {}", other);
                Ok(())
            }
        };
        if let Err(err) = result {
            eprintln!("Error: {}", err);
            return 1;
        }
    }
}

/// Routes a click; test clicks prompt for a note on the next line.
async fn handle_click<O: Oracle>(
    session: &mut Session<O>,
    surface: &mut TerminalSurface,
    id: NodeId,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<(), dxmap_session::SessionError> {
    match session.handle_event(SurfaceEvent::Click(id), surface).await? {
        ClickOutcome::TestPrompt(prompt) => {
            print!("Complete test '{}' -- note: ", prompt.name);
            let _ = io::stdout().flush();
            let note = match lines.next() {
                Some(Ok(line)) => line,
                _ => return Ok(()),
            };
            session.complete_test(&prompt.test, note.trim(), surface)
        }
        ClickOutcome::Activated => Ok(()),
        ClickOutcome::Handoff(handoff) => {
            print_handoff(&handoff);
            Ok(())
        }
        ClickOutcome::Ignored => Ok(()),
    }
}

fn print_handoff(handoff: &dxmap_session::LiteratureHandoff) {
    println!(
        "literature lookup: {} (symptoms: {})",
        handoff.diagnosis,
        handoff.symptoms.join(", ")
    );
}

fn print_graph(store: &GraphStore) {
    println!("nodes:");
    for node in store.nodes() {
        println!(
            "  {:>5}  [{}]  ({:>7.1}, {:>7.1})  {}",
            node.id,
            node.kind().prefix(),
            node.pos.x,
            node.pos.y,
            node.payload.label()
        );
    }
    println!("edges:");
    for edge in store.edges() {
        println!("  {} -> {}", edge.from, edge.to);
    }
}

/// Text rendering of the decision map.
struct TerminalSurface;

impl GraphSurface for TerminalSurface {
    fn render(&mut self, store: &GraphStore) {
        println!(
            "-- map updated: {} node(s), {} edge(s) --",
            store.node_count(),
            store.edge_count()
        );
        print_graph(store);
    }

    fn show_hover_card(&mut self, card: HoverCard) {
        match card {
            HoverCard::Symptom { id, symptoms } => {
                println!("[{}] Symptoms: {}", id, symptoms.join(", "));
            }
            HoverCard::Diagnosis {
                id,
                label,
                confidence,
            } => match confidence {
                Some(c) => println!("[{}] Diagnosis: {} ({:.0}%)", id, label, c * 100.0),
                None => println!("[{}] Diagnosis: {}", id, label),
            },
            HoverCard::Test {
                id,
                name,
                description,
                cost,
            } => {
                let cost = cost.map(|c| format!(" (cost {})", c)).unwrap_or_default();
                println!("[{}] Test: {}{} -- {}", id, name, cost, description);
                println!("      click the node to complete this test");
            }
            HoverCard::Pending { id, noted_tests } => {
                println!(
                    "[{}] {} completed test(s) buffered; click to expand",
                    id, noted_tests
                );
            }
        }
    }

    fn hide_hover_card(&mut self) {}
}
