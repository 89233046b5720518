//! Colorful console output for compiler events.
//!
//! Provides a custom `tracing` layer that renders type synthesis, graph
//! compilation and cache hits as single colored lines.

use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_DIRECTIVES: &str = "mapforge=debug,mapforge_dynamic=debug,mapforge_core=info";

/// Initializes the console output.
///
/// Safe to call multiple times - only the first call has effect. `RUST_LOG`
/// overrides the default filter, e.g. `RUST_LOG=mapforge_core=trace` to see
/// cache hits and root rewrites.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(CompileConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats compiler events with colors.
pub struct CompileConsoleLayer;

impl<S: Subscriber> Layer<S> for CompileConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("mapforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    name: Option<String>,
    source: Option<String>,
    target: Option<String>,
    graph: Option<String>,
    members: Option<u64>,
    ctor_params: Option<u64>,
    ctor_args: Option<u64>,
    conditions: Option<u64>,
    entries: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, format!("{:?}", value).trim_matches('"'));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "members" => self.members = Some(value),
            "ctor_params" => self.ctor_params = Some(value),
            "ctor_args" => self.ctor_args = Some(value),
            "conditions" => self.conditions = Some(value),
            "entries" => self.entries = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let slot = match field.name() {
            "event" => &mut self.event,
            "name" => &mut self.name,
            "source" => &mut self.source,
            "target" => &mut self.target,
            "graph" => &mut self.graph,
            _ => return,
        };
        *slot = Some(value.to_string());
    }
}

fn format_event(v: &EventVisitor) -> String {
    match v.event.as_deref().unwrap_or("") {
        "type_synthesized" => format_type_synthesized(v),
        "predicate_compiled" => format_predicate_compiled(v),
        "projection_compiled" => format_projection_compiled(v),
        "cache_hit" => format_cache_hit(v),
        _ => String::new(),
    }
}

fn format_type_synthesized(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} members ({}), constructor parameters ({})",
        timestamp().bright_black(),
        "DEBUG".bright_blue(),
        "[Synth]".bright_cyan(),
        v.name.as_deref().unwrap_or("?").white().bold(),
        v.members.unwrap_or(0).to_string().yellow(),
        v.ctor_params.unwrap_or(0).to_string().yellow(),
    )
}

fn format_predicate_compiled(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} conditions ({}): {}",
        timestamp().bright_black(),
        "DEBUG".bright_blue(),
        "[Predicate]".bright_cyan(),
        v.source.as_deref().unwrap_or("?").white().bold(),
        v.conditions.unwrap_or(0).to_string().yellow(),
        v.graph.as_deref().unwrap_or("").bright_magenta(),
    )
}

fn format_projection_compiled(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} -> {} members ({}), constructor arguments ({}): {}",
        timestamp().bright_black(),
        "DEBUG".bright_blue(),
        "[Projection]".bright_cyan(),
        v.source.as_deref().unwrap_or("?").white().bold(),
        v.target.as_deref().unwrap_or("?").white().bold(),
        v.members.unwrap_or(0).to_string().yellow(),
        v.ctor_args.unwrap_or(0).to_string().yellow(),
        v.graph.as_deref().unwrap_or("").bright_magenta(),
    )
}

fn format_cache_hit(v: &EventVisitor) -> String {
    format!(
        "    {} cache hit ({} entries)",
        "->".bright_blue(),
        v.entries.unwrap_or(0).to_string().white(),
    )
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}
