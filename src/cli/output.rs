//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use serde::Serialize;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

/// Events emitted by the one-shot commands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    /// One doctor check
    Check {
        name: String,
        ok: bool,
        detail: String,
    },
    Seeded {
        added: usize,
        total: usize,
    },
    SearchHit {
        rank: usize,
        score: f32,
        category: String,
        location: String,
        content: String,
    },
    Question {
        text: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);
}

/// Console output handler
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn preview(content: &str, max: usize) -> String {
        let single_line = content.replace('\n', " | ");
        if single_line.chars().count() <= max {
            single_line
        } else {
            let cut: String = single_line.chars().take(max).collect();
            format!("{}...", cut)
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::Check { name, ok, detail } => {
                let mark = if ok { "✓" } else { "✗" };
                println!("{} {} ({})", mark, name, detail);
            }
            OutputEvent::Seeded { added, total } => {
                println!("Seeded {} records ({} total)", added, total);
            }
            OutputEvent::SearchHit {
                rank,
                score,
                category,
                location,
                content,
            } => {
                println!(
                    "{}. [{:.3}] {} / {}: {}",
                    rank,
                    score,
                    category,
                    location,
                    Self::preview(&content, 100)
                );
            }
            OutputEvent::Question { text } => {
                println!("- {}", text);
            }
            OutputEvent::Info { message } => {
                println!("{}", message);
            }
        }
    }
}

/// JSON lines output handler
pub struct JsonHandler;

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        if let Ok(s) = serde_json::to_string(&event) {
            println!("{}", s);
        }
    }
}

/// Quiet handler that only prints failed checks
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Check {
            name,
            ok: false,
            detail,
        } = event
        {
            eprintln!("✗ {} ({})", name, detail);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every event for inspection
    #[derive(Default)]
    pub struct MockHandler {
        events: Mutex<Vec<OutputEvent>>,
    }

    impl MockHandler {
        pub fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_preview() {
        assert_eq!(ConsoleHandler::preview("a\nb", 10), "a | b");
        assert_eq!(ConsoleHandler::preview("abcdef", 3), "abc...");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(OutputEvent::Seeded { added: 9, total: 9 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "seeded", "added": 9, "total": 9}));
    }

    #[test]
    fn test_create_handler() {
        let _ = create_handler(OutputMode::Console);
        let _ = create_handler(OutputMode::Json);
        let _ = create_handler(OutputMode::Quiet);
    }
}
