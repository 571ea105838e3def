//! Texmdx CLI - convert LaTeX documents to MDX

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use texmdx::{
    CliDiagnostic, ConversionOutput, MdxConverter, MdxOptions, TikzRenderer,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "tex2mdx")]
#[command(version)]
#[command(about = "Texmdx - LaTeX to MDX converter with KaTeX-ready math", long_about = None)]
struct Cli {
    /// Input file path (reads from stdin if not provided)
    input_file: Option<PathBuf>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory where rendered SVG files are written
    #[arg(long, default_value = "./images")]
    images_dir: PathBuf,

    /// URL prefix for image references in the output document
    #[arg(long, default_value = "/blogs/images")]
    image_url_prefix: String,

    /// Skip graphics rendering; tikzpicture blocks stay as LaTeX source
    #[arg(long)]
    no_graphics: bool,

    /// Write a JSON conversion report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Suppress warning output on stderr
    #[arg(short, long)]
    quiet: bool,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionReport {
    images: Vec<String>,
    warnings: Vec<ReportWarning>,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ReportWarning {
    kind: String,
    message: String,
    location: Option<String>,
}

#[cfg(feature = "cli")]
impl ConversionReport {
    fn from_output(output: &ConversionOutput) -> Self {
        ConversionReport {
            images: output.images.clone(),
            warnings: output
                .warnings
                .iter()
                .map(|warning| ReportWarning {
                    kind: warning.kind.to_string(),
                    message: warning.message.clone(),
                    location: warning.location.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("\x1b[31merror:\x1b[0m {}", err);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = match &cli.input_file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let options = MdxOptions {
        image_url_prefix: cli.image_url_prefix.clone(),
        ..MdxOptions::default()
    };
    let mut converter = MdxConverter::new(options);
    if !cli.no_graphics {
        // a missing toolchain fails here, before any conversion work
        let renderer = TikzRenderer::new(&cli.images_dir)?;
        converter = converter.with_renderer(Box::new(renderer));
    }

    let output = converter.convert(&input);

    match &cli.output {
        Some(path) => fs::write(path, &output.content)?,
        None => io::stdout().write_all(output.content.as_bytes())?,
    }

    if !cli.quiet {
        for warning in &output.warnings {
            let diagnostic = CliDiagnostic::from_warning(warning);
            eprintln!("{}{}\x1b[0m", diagnostic.color_code(), diagnostic);
        }
    }

    if let Some(report_path) = &cli.report {
        let report = ConversionReport::from_output(&output);
        fs::write(report_path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("tex2mdx was built without the `cli` feature");
    std::process::exit(1);
}
