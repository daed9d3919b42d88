//! CLI binary for musegen.
//!
//! A thin shim over the library crate that maps CLI flags to `Config`,
//! prompts for missing inputs, and prints themed results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use musegen::{generate_lyrics, generate_poster, Config, ImageSize, LyricsRun, PosterRun};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// ── Ocean Professional theme (truecolor ANSI, no extra deps) ─────────────

/// Console palette: blue `#2563EB` for steps and prompts, amber `#F59E0B`
/// for success, red `#EF4444` for errors. Honors `--no-color` and the
/// `NO_COLOR` convention.
struct Theme {
    enabled: bool,
}

impl Theme {
    fn new(no_color_flag: bool) -> Self {
        Self {
            enabled: !no_color_flag && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("{code}{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    fn blue(&self, s: &str) -> String {
        self.paint("\x1b[38;2;37;99;235m", s)
    }

    fn amber(&self, s: &str) -> String {
        self.paint("\x1b[38;2;245;158;11m", s)
    }

    fn red(&self, s: &str) -> String {
        self.paint("\x1b[38;2;239;68;68m", s)
    }

    fn bold(&self, s: &str) -> String {
        self.paint("\x1b[1m", s)
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Poster from a local PDF
  musegen poster document.pdf

  # Poster from a URL, custom output path
  musegen poster https://example.com/paper.pdf -o poster.png

  # Lyrics from a video URL
  musegen lyrics https://www.youtube.com/watch?v=dQw4w9WgXcQ --style rock

  # Lyrics from a local transcript file
  musegen lyrics talk-transcript.txt --style ballad -o song.txt

  # Prompt interactively for the missing input
  musegen poster

PROVIDER CHAINS (tried in order, first usable output wins):
  poster text:    quick-parse → poppler-layout → pdfium-text → ocr (tesseract)
  poster image:   openai-images → stability → poster-render (offline)
  lyrics source:  captions → audio-download (yt-dlp)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY        Enables the openai-images provider
  STABILITY_API_KEY     Enables the stability provider
  MUSEGEN_IMAGE_MODEL   Remote image model / engine override
  MUSEGEN_IMAGE_SIZE    Image size WIDTHxHEIGHT (default 1024x1024)
  MUSEGEN_PDFTOTEXT     pdftotext command override
  MUSEGEN_TESSERACT     tesseract command override
  MUSEGEN_YTDLP         yt-dlp command override
  MUSEGEN_CAPTION_LANG  Caption language code (default en)
  PDFIUM_LIB_PATH       Path to an existing libpdfium
  NO_COLOR              Disable themed console output

SETUP:
  No setup is required for a first run. With no API keys, no pdfium, and
  no tesseract installed, the poster flow still produces a deterministic
  local render from the extracted text, and the lyrics flow still works
  from captions or a local transcript file. Install the optional tools to
  unlock the stronger providers.
"#;

/// Generate poster images from PDFs and song lyrics from video transcripts.
#[derive(Parser, Debug)]
#[command(
    name = "musegen",
    version,
    about = "Generate poster images from PDFs and song lyrics from video transcripts",
    long_about = "Generate a poster image from a PDF document (local file or URL) or templated \
song lyrics from a video transcript. Every stage runs through an ordered provider chain and \
degrades gracefully: remote APIs are used when credentials exist, local tools otherwise.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable themed console colors.
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MUSEGEN_VERBOSE")]
    verbose: bool,

    /// Suppress everything except the artifact path and errors.
    #[arg(short, long, global = true, env = "MUSEGEN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a poster image from a PDF file or URL.
    Poster {
        /// Local PDF file path or HTTP/HTTPS URL. Prompted for when omitted.
        input: Option<String>,

        /// Write the PNG artifact to this path.
        #[arg(short, long, default_value = "generated_image.png")]
        output: PathBuf,

        /// Image size as WIDTHxHEIGHT.
        #[arg(long, env = "MUSEGEN_IMAGE_SIZE")]
        size: Option<ImageSize>,

        /// Remote image model (openai) or engine (stability) override.
        #[arg(long, env = "MUSEGEN_IMAGE_MODEL")]
        model: Option<String>,

        /// Read at most this many pages from the PDF.
        #[arg(long, env = "MUSEGEN_MAX_PAGES", default_value_t = 5,
              value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        max_pages: usize,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "MUSEGEN_DOWNLOAD_TIMEOUT", default_value_t = 30,
              value_parser = clap::value_parser!(u64).range(1..))]
        download_timeout: u64,

        /// Per-call remote API timeout in seconds.
        #[arg(long, env = "MUSEGEN_API_TIMEOUT", default_value_t = 60,
              value_parser = clap::value_parser!(u64).range(1..))]
        api_timeout: u64,
    },

    /// Generate song lyrics from a video transcript.
    Lyrics {
        /// Video URL, bare video id, or local transcript file. Prompted for when omitted.
        source: Option<String>,

        /// Song style: pop, hiphop, rock, ballad, country, electronic.
        #[arg(short, long, env = "MUSEGEN_STYLE", default_value = "pop")]
        style: String,

        /// Write the lyrics artifact to this path.
        #[arg(short, long, default_value = "lyrics_output.txt")]
        output: PathBuf,

        /// Caption language code.
        #[arg(long, env = "MUSEGEN_CAPTION_LANG")]
        lang: Option<String>,

        /// Per-call remote API timeout in seconds.
        #[arg(long, env = "MUSEGEN_API_TIMEOUT", default_value_t = 60,
              value_parser = clap::value_parser!(u64).range(1..))]
        api_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let theme = Theme::new(cli.no_color);

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs go to stderr so stdout carries only the themed step
    // lines and the artifact path.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli, &theme).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", theme.red(&format!("✘ {e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, theme: &Theme) -> Result<()> {
    match cli.command {
        Command::Poster {
            input,
            output,
            size,
            model,
            max_pages,
            download_timeout,
            api_timeout,
        } => {
            let input = resolve_or_prompt(input, theme, "Enter the PDF file path or URL:")?;

            let mut config = Config::from_env().context("Invalid configuration")?;
            config.max_pages = max_pages;
            config.download_timeout_secs = download_timeout;
            config.api_timeout_secs = api_timeout;
            if let Some(size) = size {
                config.image_size = size;
            }
            if let Some(model) = model {
                config.image_model = Some(model);
            }

            if !cli.quiet {
                println!(
                    "{}",
                    theme.blue(&format!(
                        "→ Poster: resolve → extract → describe → generate → manifest ({input})"
                    ))
                );
            }

            let run = generate_poster(&input, &output, &config)
                .await
                .context("Poster generation failed")?;
            print_poster_summary(&run, theme, cli.quiet);
        }

        Command::Lyrics {
            source,
            style,
            output,
            lang,
            api_timeout,
        } => {
            let source = resolve_or_prompt(
                source,
                theme,
                "Enter a video URL, video id, or transcript file path:",
            )?;

            let mut config = Config::from_env().context("Invalid configuration")?;
            config.api_timeout_secs = api_timeout;
            if let Some(lang) = lang {
                config.caption_lang = lang;
            }

            if !cli.quiet {
                println!(
                    "{}",
                    theme.blue(&format!(
                        "→ Lyrics: resolve → transcript → template → manifest ({source})"
                    ))
                );
            }

            let run = generate_lyrics(&source, &style, &output, &config)
                .await
                .context("Lyrics generation failed")?;
            print_lyrics_summary(&run, theme, cli.quiet);
        }
    }

    Ok(())
}

/// Use the positional argument when given, otherwise prompt on stdin.
fn resolve_or_prompt(value: Option<String>, theme: &Theme, label: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    print!("{} ", theme.blue(label));
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn print_poster_summary(run: &PosterRun, theme: &Theme, quiet: bool) {
    if quiet {
        println!("{}", run.artifact_path.display());
        return;
    }
    println!(
        "  {} extracted via {} ({} chars used)",
        theme.blue("•"),
        run.extraction.provider.unwrap_or("?"),
        run.description.chars().count()
    );
    println!(
        "  {} generated via {}",
        theme.blue("•"),
        run.generation.provider.unwrap_or("?")
    );
    println!(
        "{} {}",
        theme.amber("✔ Image:"),
        theme.bold(&run.artifact_path.display().to_string())
    );
    println!(
        "{} {}",
        theme.amber("✔ Manifest:"),
        run.manifest_path.display()
    );
    println!("  {}", theme.blue(&format!("{}ms total", run.total_duration_ms)));
}

fn print_lyrics_summary(run: &LyricsRun, theme: &Theme, quiet: bool) {
    if quiet {
        println!("{}", run.artifact_path.display());
        return;
    }
    println!(
        "  {} transcript via {} (style: {})",
        theme.blue("•"),
        run.retrieval.provider.unwrap_or("?"),
        run.style
    );
    println!(
        "{} {}",
        theme.amber("✔ Lyrics:"),
        theme.bold(&run.artifact_path.display().to_string())
    );
    println!(
        "{} {}",
        theme.amber("✔ Manifest:"),
        run.manifest_path.display()
    );
    println!("  {}", theme.blue(&format!("{}ms total", run.total_duration_ms)));
}
