use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use log::{info, warn};

use crate::{
    course_list::CourseList,
    crawler::{HandbookCrawler, Pacer},
    extractor::Extractor,
    report::CompletenessReport,
    settings::Settings,
    url_template::build_urls,
    writer::write_csv,
};

#[derive(Debug)]
pub enum ScrapeOutcome {
    Written {
        destination: PathBuf,
        report: CompletenessReport,
    },
    NothingCaptured,
}
impl ScrapeOutcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ScrapeOutcome::Written { .. } => ExitCode::SUCCESS,
            ScrapeOutcome::NothingCaptured => ExitCode::FAILURE,
        }
    }
}

/// Loads the course list, crawls every course page and exports what was captured.
///
/// File and template errors abort before the first request.
pub async fn scrape<E: Extractor, P: Pacer>(
    settings: &Settings,
    crawler: &HandbookCrawler<E, P>,
) -> anyhow::Result<ScrapeOutcome> {
    let handbook = &settings.handbook;
    let input_file = settings.input_file()?;
    let mut course_list = CourseList::load(input_file)
        .with_context(|| format!("While loading the course list {input_file:?}"))?;
    if let Some(limit) = settings.limit {
        course_list.truncate(limit);
    }
    let urls = build_urls(
        &handbook.base_url_template,
        handbook.level,
        handbook.year,
        course_list.as_slice(),
    )?;

    let records = crawler.crawl(&urls, &handbook.css_selector).await;
    if records.is_empty() {
        warn!("No course data captured");
        return Ok(ScrapeOutcome::NothingCaptured);
    }

    let destination = write_csv(&records, &handbook.output_file)?;
    let report = CompletenessReport::build(&records, crawler.parser().placeholder());
    info!("Results stored at {destination:?}");
    Ok(ScrapeOutcome::Written {
        destination,
        report,
    })
}
