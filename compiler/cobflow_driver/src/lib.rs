//! Contains the main `run()` function of the translator.

use std::{path::PathBuf, process::ExitCode};

use cobflow_abort::{Abort, Cancellation};
use cobflow_diagnostic::{Handler, Issue, Message, Severity};
use cobflow_element::{Library, Module, UnitOutline};
use cobflow_extract::Config;
use cobflow_translate::{translate, Options};
use log::info;
use parking_lot::RwLock;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

pub mod script;

pub use script::{Script, ScriptError, ScriptUnit};

/// The format the translated units are written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum,
)]
pub enum Format {
    /// The indented pseudo-code outline.
    #[clap(name = "text")]
    Text,

    /// The outlines as pretty-printed RON.
    #[clap(name = "ron")]
    Ron,

    /// The outlines as pretty-printed JSON.
    #[clap(name = "json")]
    Json,
}

/// The arguments to the program.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, clap::Parser)]
#[clap(
    name = "cobflow",
    about = "Extracts COBOL paragraphs and sections into structured subroutines"
)]
pub struct Arguments {
    /// The event script to translate. Read as JSON if it ends in `.json` and
    /// as RON otherwise.
    pub script: PathBuf,

    /// The format of the output.
    #[clap(short, long, value_enum, default_value = "text")]
    pub format: Format,

    /// The output path. If not specified, the result is written to the
    /// standard output.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Keeps the local declarations in the program instead of moving them to
    /// a `<UNIT>_DATA` module.
    #[clap(long)]
    pub keep_declarations: bool,

    /// Keeps calls and no-ops that can never execute.
    #[clap(long)]
    pub keep_unreachable: bool,

    /// The prefix of the names generated for anonymous fields.
    #[clap(long, default_value = "FILLER")]
    pub filler_prefix: String,

    /// Logs more; repeat for even more.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Arguments {
    /// Returns the default log filter for the requested verbosity.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Returns the translation options the arguments ask for.
    #[must_use]
    pub fn options(&self) -> Options {
        Options::builder()
            .extraction(
                Config::builder()
                    .split_declarations(!self.keep_declarations)
                    .drop_unreachable(!self.keep_unreachable)
                    .build(),
            )
            .filler_prefix(self.filler_prefix.clone())
            .build()
    }
}

/// Prints every diagnostic to the standard error stream and counts the
/// errors among them.
#[derive(Debug, Default)]
pub struct Printer {
    errors: RwLock<usize>,
}

impl Printer {
    /// Creates a new [`Printer`].
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the number of error diagnostics printed so far.
    #[must_use]
    pub fn errors(&self) -> usize { *self.errors.read() }
}

impl Handler<Box<dyn Issue>> for Printer {
    fn receive(&self, issue: Box<dyn Issue>) {
        let diagnostic = issue.report();

        eprintln!("{diagnostic}\n");

        if diagnostic.severity == Severity::Error {
            *self.errors.write() += 1;
        }
    }
}

/// Everything produced from one script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Output {
    /// Every program followed by its subroutines, in script order.
    pub units: Vec<UnitOutline>,

    /// The shared-data modules, in creation order.
    pub modules: Vec<Module>,
}

impl Output {
    /// Renders the output in the given format.
    ///
    /// # Errors
    ///
    /// Returns the serializer's message if the output can't be serialized.
    pub fn render(&self, format: Format) -> Result<String, String> {
        match format {
            Format::Text => Ok(self
                .units
                .iter()
                .map(ToString::to_string)
                .chain(self.modules.iter().map(ToString::to_string))
                .collect::<Vec<_>>()
                .join("\n")),
            Format::Ron => ron::ser::to_string_pretty(self, PrettyConfig::default())
                .map_err(|error| error.to_string()),
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|error| error.to_string())
            }
        }
    }
}

/// Translates every unit of the script, in order, sharing one [`Library`].
///
/// # Errors
///
/// Returns [`Abort`] if the cancellation was requested.
pub fn process(
    script: Script,
    options: &Options,
    handler: &dyn Handler<Box<dyn Issue>>,
    cancellation: &Cancellation,
) -> Result<Output, Abort> {
    let mut library = Library::default();
    let mut output = Output::default();
    let mut module_names = Vec::new();

    for unit in script.units {
        let translation = translate(
            &unit.name,
            unit.nested_in.as_deref(),
            unit.events,
            options.clone(),
            &mut library,
            handler,
            cancellation,
        )?;

        output.units.extend(translation.outlines());
        module_names.extend(translation.modules);
    }

    output.modules = module_names
        .iter()
        .filter_map(|name| library.module(name).cloned())
        .collect();

    Ok(output)
}

/// Runs the translator with the given arguments.
#[must_use]
pub fn run(arguments: Arguments) -> ExitCode {
    let script = match Script::load(&arguments.script) {
        Ok(script) => script,
        Err(error) => {
            let msg = Message::new(Severity::Error, error);
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let printer = Printer::new();
    let cancellation = Cancellation::new();

    let output =
        match process(script, &arguments.options(), &printer, &cancellation) {
            Ok(output) => output,
            Err(Abort) => {
                let msg = Message::new(Severity::Error, "the translation was cancelled");
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        };

    let text = match output.render(arguments.format) {
        Ok(text) => text,
        Err(error) => {
            let msg = Message::new(
                Severity::Error,
                format!("failed to serialize the output: {error}"),
            );
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    match &arguments.output {
        Some(path) => {
            if let Err(error) = std::fs::write(path, text) {
                let msg = Message::new(
                    Severity::Error,
                    format!("failed to write `{}`: {error}", path.display()),
                );
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
            info!("wrote {} unit(s) to `{}`", output.units.len(), path.display());
        }
        None => print!("{text}"),
    }

    if printer.errors() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
