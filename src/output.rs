use crate::prelude::*;
use std::fmt::Debug;

use console::{Emoji, Style, StyledObject};
use tracing::{
    field::{Field, Visit},
    metadata::LevelFilter,
    span::Attributes,
    Event, Id, Level, Subscriber,
};
use tracing_subscriber::{
    filter::{EnvFilter, Targets},
    layer::{Context, Layer},
    prelude::*,
    registry::LookupSpan,
};

use clap::{Args, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Increase verbosity. (Can be repeated.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Reduce verbosity. (Can be repeated.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
    #[arg(long, default_value_t = ColorChoice::Auto, value_enum, value_name = "WHEN", global = true)]
    color: ColorChoice,
}

pub const CONTEXT_TARGET: &str = "platform_tag::context";

/// Note what we're in the middle of doing, for the benefit of advisories and error
/// reports. Lasts until the end of the enclosing block. (Don't hold one across an
/// .await.)
#[macro_export]
macro_rules! context {
    ($($arg:tt)*) => {
        let _guard = tracing::span!(
            target: "platform_tag::context",
            tracing::Level::ERROR,
            "context",
            message = %format_args!($($arg)*)
        )
        .entered();
    }
}

/// The fields the UI shows. `advisory` is the notify key that `WarnOnce` attaches to
/// its warnings.
#[derive(Debug, Default)]
struct UiFields {
    message: Option<String>,
    advisory: Option<String>,
}

impl UiFields {
    fn slot(&mut self, field: &Field) -> Option<&mut Option<String>> {
        match field.name() {
            "message" => Some(&mut self.message),
            "advisory" => Some(&mut self.advisory),
            _ => None,
        }
    }
}

impl Visit for UiFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if let Some(slot) = self.slot(field) {
            *slot = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if let Some(slot) = self.slot(field) {
            *slot = Some(format!("{value:?}"));
        }
    }
}

// The rendered message of a context!() span, kept in the registry next to the span.
struct ContextNote(String);

static WARNING: Lazy<StyledObject<Emoji<'static, 'static>>> = Lazy::new(|| {
    Style::new()
        .yellow()
        .bold()
        .for_stderr()
        .apply_to(Emoji("⚠️  Warning:", "Warning:"))
});

static ERROR: Lazy<StyledObject<Emoji<'static, 'static>>> = Lazy::new(|| {
    Style::new()
        .red()
        .bold()
        .for_stderr()
        .apply_to(Emoji("🛑  Error:", "Error:"))
});

static ADVISORY_KEY: Lazy<Style> = Lazy::new(|| Style::new().dim().for_stderr());

fn render(level: Level, fields: &UiFields) -> Option<String> {
    let message = fields.message.as_deref()?;
    Some(match (level, fields.advisory.as_deref()) {
        (Level::ERROR, _) => format!("{} {}", &*ERROR, message),
        (Level::WARN, Some(key)) => format!(
            "{} {} {}",
            &*WARNING,
            ADVISORY_KEY.apply_to(format!("[{key}]")),
            message
        ),
        (Level::WARN, None) => format!("{} {}", &*WARNING, message),
        _ => message.to_owned(),
    })
}

/// The messages of every context!() span we're currently inside, outermost first.
pub fn current_context() -> Vec<String> {
    tracing::dispatcher::get_default(|dispatch| {
        // Span::current() would go looking for the dispatcher we're borrowing right now
        // and find nothing, so ask the registry directly.
        let Some(registry) = dispatch.downcast_ref::<tracing_subscriber::Registry>() else {
            return vec![];
        };
        let Some(leaf) = registry.current_span().id().and_then(|id| registry.span(id)) else {
            return vec![];
        };
        leaf.scope()
            .from_root()
            .filter_map(|span| span.extensions().get::<ContextNote>().map(|n| n.0.clone()))
            .collect()
    })
}

struct TagUILayer;

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for TagUILayer {
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().target() != CONTEXT_TARGET {
            return;
        }
        let mut fields = UiFields::default();
        attrs.record(&mut fields);
        if let (Some(span), Some(message)) = (ctx.span(id), fields.message) {
            span.extensions_mut().insert(ContextNote(message));
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = UiFields::default();
        event.record(&mut fields);
        if let Some(line) = render(*event.metadata().level(), &fields) {
            eprintln!("{line}");
        }
    }
}

/// What the user can do about a fatal error, when we know.
fn remedy(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    match error.downcast_ref::<PlatformError>()? {
        PlatformError::UnsupportedMuslArchitecture { arch } => Some(format!(
            "There are no musl binaries for {arch}. Use a glibc-based image (e.g. \
             debian-slim) on this machine, or run Alpine on an x64 host."
        )),
        _ => None,
    }
}

struct TagEyreHandler {
    context: Vec<String>,
    backtrace: Option<backtrace::Backtrace>,
}

impl TagEyreHandler {
    fn new() -> TagEyreHandler {
        TagEyreHandler {
            context: current_context(),
            backtrace: std::env::var_os("PLATFORM_TAG_BACKTRACE")
                .map(|_| backtrace::Backtrace::new_unresolved()),
        }
    }
}

impl eyre::EyreHandler for TagEyreHandler {
    fn debug(
        &self,
        error: &(dyn std::error::Error + 'static),
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        for note in &self.context {
            writeln!(f, "while {note}:")?;
        }
        write!(f, "{error}")?;
        let mut source = error.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {cause}")?;
            source = cause.source();
        }
        if let Some(remedy) = remedy(error) {
            write!(f, "\n\n{remedy}")?;
        }
        if let Some(backtrace) = &self.backtrace {
            // clone to make it mutable so we can resolve symbols
            let mut backtrace = backtrace.clone();
            backtrace.resolve();
            write!(f, "\nBacktrace:\n{backtrace:?}")?;
        }
        Ok(())
    }
}

fn level_for(verbose: u8, quiet: u8) -> Level {
    match i16::from(verbose) - i16::from(quiet) {
        2.. => Level::TRACE,
        1 => Level::DEBUG,
        0 => Level::INFO,
        -1 => Level::WARN,
        _ => Level::ERROR,
    }
}

pub fn init(args: &OutputArgs) -> Result<()> {
    eyre::set_hook(Box::new(|_| Box::new(TagEyreHandler::new())))
        .wrap_err("eyre handler already installed?")?;

    match args.color {
        ColorChoice::Auto => (),
        ColorChoice::Always => console::set_colors_enabled_stderr(true),
        ColorChoice::Never => console::set_colors_enabled_stderr(false),
    }

    let ui_targets = Targets::new().with_target("platform_tag", level_for(args.verbose, args.quiet));
    tracing_subscriber::registry()
        .with(TagUILayer.with_filter(ui_targets))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::OFF.into())
                        .with_env_var("PLATFORM_TAG_DEBUG")
                        .from_env_lossy(),
                ),
        )
        .try_init()
        .wrap_err("tracing subscriber already installed?")?;
    Ok(())
}
