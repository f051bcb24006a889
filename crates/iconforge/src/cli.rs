//! Command-line surface.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::export::{ExportOptions, Exporter};
use crate::app::generate::{GenerateRequest, Generator};
use crate::app::schedule::{DispatchLimiter, Scheduler};
use crate::infra::config::{Config, parse_renames};
use crate::infra::figma::FigmaClient;
use crate::infra::format::SourceFormatter;
use crate::infra::svg::SvgJsx;

#[derive(Debug, Parser)]
#[command(
    name = "iconforge",
    author,
    version,
    about = "Generate typed React components from Figma variant sets"
)]
pub struct Cli {
    /// Increase log output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Decrease log output (-q, -qq)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> i8 {
        let verbose = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let quiet = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        verbose.saturating_sub(quiet)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate React components from a Figma file
    Generate(GenerateArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Figma file key
    pub file_id: String,
    /// The frame node to generate components from
    #[arg(long)]
    pub frame: String,
    /// The path pattern to write components to
    #[arg(long)]
    pub directory: String,
    /// The component name pattern to use, e.g. `{name}Icon`
    #[arg(long)]
    pub component_name: String,
    /// Include groups with names matching this regex, pass multiple times to include multiple
    #[arg(long, required = true)]
    pub include: Vec<String>,
    /// Rename prop values, pass multiple times as oldValue:newValue
    #[arg(long)]
    pub rename: Vec<String>,
    /// Number of parallel requests to the Figma API
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Time in milliseconds to wait between requests
    #[arg(long)]
    pub delay: Option<u64>,
    /// Skip writing index.ts after generating
    #[arg(long)]
    pub no_write_index: bool,
    /// Write Storybook stories for components after generating
    #[arg(long)]
    pub write_storybook: bool,
    /// Storybook title to use for components
    #[arg(long)]
    pub storybook_title: Option<String>,
    /// Layout size for the Storybook grid
    #[arg(long)]
    pub storybook_grid: Option<String>,
    /// Color to replace with `currentColor` in stroke and fill attributes
    #[arg(long)]
    pub current_color: Option<String>,
    /// Fail a component when any of its variants cannot be fetched
    #[arg(long)]
    pub strict: bool,
}

impl GenerateArgs {
    /// Flags win over every configuration layer.
    fn apply(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.scheduler.set_concurrency(concurrency);
        }
        if let Some(delay) = self.delay {
            config.scheduler.set_delay_ms(delay);
        }
        if self.no_write_index {
            config.output.set_write_index(false);
        }
        if self.write_storybook {
            config.output.set_write_storybook(true);
        }
        if let Some(title) = &self.storybook_title {
            config.output.set_storybook_title(title.clone());
        }
        if let Some(grid) = &self.storybook_grid {
            config.output.set_storybook_grid(grid.clone());
        }
        if let Some(color) = &self.current_color {
            config.output.set_current_color(color.clone());
        }
        if self.strict {
            config.variants.set_fail_on_missing(true);
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "iconforge", &mut io::stdout());
            Ok(())
        }
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let mut config = Config::load()?;
    args.apply(&mut config);
    config.validate()?;
    let token = config.access_token()?.to_owned();

    let mut renames = config.variants.rename.clone();
    renames.extend(parse_renames(&args.rename)?);

    let client = Arc::new(FigmaClient::new(&config.figma, &token, args.file_id.clone())?);
    let limiter = Arc::new(DispatchLimiter::new(
        config.scheduler.concurrency(),
        config.scheduler.delay(),
    ));
    let scheduler = Scheduler::new(client.clone(), Arc::new(SvgJsx::new()), limiter);
    let formatter = SourceFormatter::from_settings(&config.format);
    let generator = Generator::new(client, scheduler, formatter.clone());

    let request = GenerateRequest {
        frame: args.frame.clone(),
        directory: args.directory.clone(),
        component_name: args.component_name.clone(),
        include: args.include.clone(),
        renames,
        current_color: config.output.current_color().map(str::to_owned),
        fail_on_missing: config.variants.fail_on_missing(),
    };

    let report = generator.run(&request).await?;
    tracing::info!("generated {} icons", report.success_count());
    if report.failure_count() > 0 {
        tracing::warn!("{} failed to generate", report.failure_count());
        for failure in &report.failures {
            tracing::warn!(group = %failure.group, "{}", failure.reason);
        }
    }

    let options = ExportOptions::from_settings(&config.output);
    let artifacts = Exporter::new()?
        .export(&args.directory, &report.outcomes, &options, &formatter)
        .await?;

    for outcome in &report.outcomes {
        println!("{}", outcome.file_path.display());
    }
    for artifact in &artifacts {
        println!("{}", artifact.display());
    }
    Ok(())
}
