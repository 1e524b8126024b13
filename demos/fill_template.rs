//! Command-line front end for filling a presentation template.
//!
//! # Usage
//!
//! Replace text placeholders:
//! ```sh
//! cargo run --example fill_template -- template.pptx -o review.pptx \
//!     --set '{{TITLE}}=Quarterly Review' \
//!     --set '{{AGENDA}}=Numbers\nOutlook'
//! ```
//!
//! Swap the logo picture on the first slide:
//! ```sh
//! cargo run --example fill_template -- template.pptx -o review.pptx \
//!     --image assets/logo.png
//! ```
//!
//! `$key` placeholders on slides only:
//! ```sh
//! cargo run --example fill_template -- template.pptx -o out.pptx \
//!     --sigil '$' --scope slides --set name=Ada
//! ```

use clap::{Parser, ValueEnum};
use slidefill::ooxml::pptx::config::DEFAULT_IMAGE_KEY;
use slidefill::{ImagePolicy, PartScope, Substitutions, Template, TemplateOptions, TokenSyntax};
use std::path::PathBuf;

/// Fill a PowerPoint template with text and images
#[derive(Parser, Debug)]
#[command(
    name = "fill_template",
    about = "Fill placeholders in a PowerPoint (.pptx) template",
    version
)]
struct Args {
    /// Template to fill
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Substitution as KEY=VALUE; `\n` in VALUE starts a new paragraph
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Image for the pictures marked LOGO_PLACEHOLDER on the first slide
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Parts searched for text placeholders
    #[arg(long, value_enum, default_value = "all-xml")]
    scope: ScopeArg,

    /// Prefix prepended to every key to form its token
    #[arg(long, value_name = "PREFIX")]
    sigil: Option<String>,

    /// Add the image even when no picture carries the marker
    #[arg(long)]
    always_inject: bool,

    /// Force overwrite existing files
    #[arg(short, long)]
    force: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Every XML part in the package
    AllXml,
    /// Slide parts only
    Slides,
}

impl From<ScopeArg> for PartScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::AllXml => PartScope::AllXml,
            ScopeArg::Slides => PartScope::Slides,
        }
    }
}

fn parse_pair(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    Some((key.to_string(), value.replace("\\n", "\n")))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if args.output.exists() && !args.force {
        eprintln!("Error: Output file exists: {}", args.output.display());
        eprintln!("       Use --force to overwrite");
        std::process::exit(1);
    }

    let mut subs = Substitutions::new();
    for raw in &args.set {
        let Some((key, value)) = parse_pair(raw) else {
            eprintln!("Error: Expected KEY=VALUE, got '{}'", raw);
            std::process::exit(1);
        };
        subs.insert(key, value);
    }
    if let Some(image) = &args.image {
        subs.insert(DEFAULT_IMAGE_KEY, image.to_string_lossy());
    }

    let mut options = TemplateOptions::new().with_scope(args.scope.into());
    if let Some(prefix) = args.sigil {
        options = options.with_token_syntax(TokenSyntax::Sigil(prefix));
    }
    if args.always_inject {
        options = options.with_image_policy(ImagePolicy::Always);
    }

    let filled = Template::open(&args.template)?.with_options(options).fill(&subs)?;
    filled.save(&args.output)?;

    let report = filled.report();
    println!(
        "✓ {} -> {} ({} replacement(s), {} image(s))",
        args.template.display(),
        args.output.display(),
        report.replacements,
        report.media.len()
    );
    for key in &report.skipped_images {
        println!("  no marked picture for {}", key);
    }
    Ok(())
}
