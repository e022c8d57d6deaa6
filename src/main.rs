use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use handbook_scraping::crawler::HandbookCrawler;
use handbook_scraping::extractor::LlmExtractor;
use handbook_scraping::parser::CourseParser;
use handbook_scraping::pipeline::{scrape, ScrapeOutcome};
use handbook_scraping::settings::{Settings, SettingsOverrides};
use log::{debug, warn, LevelFilter};

/// Scrape UNSW Handbook courses into CSV format.
#[derive(Parser)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every listed course and write the extracted fields to CSV
    Scrape {
        /// Path to the TOML settings file
        #[arg(long, default_value = "config/settings.toml")]
        config: PathBuf,
        #[command(flatten)]
        overrides: SettingsOverrides,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let dotenv = dotenvy::dotenv();
    let opts = Opts::parse();

    match opts.command {
        Command::Scrape { config, overrides } => {
            let mut settings = Settings::load(&config)?;
            settings.apply_overrides(&overrides);
            settings.validate()?;
            init_logger(settings.crawler.verbose);
            if let Some(e) = dotenv_problem(dotenv) {
                warn!("Ignoring the .env file: {e}");
            }
            run(&settings).await
        }
    }
}

fn init_logger(verbose: bool) {
    pretty_env_logger::formatted_builder()
        .filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();
}

/// A missing `.env` is not a problem; the credential may come from the environment.
fn dotenv_problem<T>(result: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    result.err().filter(|e| !e.not_found())
}

async fn run(settings: &Settings) -> anyhow::Result<ExitCode> {
    // Fails on a missing credential before any request is sent.
    let extractor = LlmExtractor::new(settings).context("While preparing the extractor")?;
    debug!(
        "Browser options: {} (headless: {})",
        settings.crawler.browser, settings.crawler.headless
    );
    let crawler = HandbookCrawler::new(
        extractor,
        CourseParser::new(settings.llm.placeholder.clone()),
        settings.crawler.delay()?,
        &settings.crawler.session_prefix,
    );

    let outcome = scrape(settings, &crawler).await?;
    if let ScrapeOutcome::Written { report, .. } = &outcome {
        println!("\n{report}");
    }
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::dotenv_problem;

    #[test]
    fn test_dotenv_problem() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dotenv_problem(dotenvy::from_path(dir.path().join(".env"))).is_none());

        let malformed = dir.path().join("malformed.env");
        fs_err::write(&malformed, "HANDBOOK_SCRAPING_TEST_KEY value\n").unwrap();
        assert!(dotenv_problem(dotenvy::from_path(&malformed)).is_some());
    }
}
