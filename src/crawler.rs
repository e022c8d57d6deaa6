use std::time::Duration;

use log::{error, info, warn};
use rand::Rng;

use crate::{
    extractor::{ExtractRequest, Extractor},
    parser::CourseParser,
    schema::CourseRecord,
};

/// Waits between two consecutive requests.
#[allow(async_fn_in_trait)]
pub trait Pacer {
    async fn pause(&self, delay: Duration);
}

pub struct TokioPacer;
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Drives fetch, extraction and normalisation over a list of URLs, one request at a time.
pub struct HandbookCrawler<E, P = TokioPacer> {
    extractor: E,
    parser: CourseParser,
    pacer: P,
    delay: Duration,
    session_prefix: String,
}

impl<E: Extractor> HandbookCrawler<E> {
    pub fn new(extractor: E, parser: CourseParser, delay: Duration, session_prefix: &str) -> Self {
        Self::with_pacer(extractor, parser, TokioPacer, delay, session_prefix)
    }
}

impl<E: Extractor, P: Pacer> HandbookCrawler<E, P> {
    pub fn with_pacer(
        extractor: E,
        parser: CourseParser,
        pacer: P,
        delay: Duration,
        session_prefix: &str,
    ) -> Self {
        Self {
            extractor,
            parser,
            pacer,
            delay,
            session_prefix: session_prefix.to_owned(),
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn parser(&self) -> &CourseParser {
        &self.parser
    }

    /// Visits every URL in order and returns all records captured.
    ///
    /// A failing URL is logged and skipped; the pause follows every request but the last.
    pub async fn crawl<S: AsRef<str>>(&self, urls: &[S], css_selector: &str) -> Vec<CourseRecord> {
        let session_id = session_id(&self.session_prefix);
        info!("Starting session {session_id} for {} URL(s)", urls.len());
        let mut harvested = vec![];

        for (position, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            let position = position + 1;
            info!("[{position}/{}] Fetching {url}", urls.len());

            let request = ExtractRequest::builder()
                .url(url)
                .css_selector(css_selector)
                .session_id(&session_id)
                .build();
            match self.extractor.extract(&request).await {
                Err(e) => error!("Extraction failed for {url}: {e}"),
                Ok(None) => warn!("No content returned for {url}"),
                Ok(Some(content)) if content.trim().is_empty() => {
                    warn!("No content returned for {url}")
                }
                Ok(Some(content)) => {
                    let records = self.parser.parse_payload(&content);
                    if records.is_empty() {
                        warn!("Parser produced no records for {url}");
                    } else {
                        info!("Captured {} course(s) from {url}", records.len());
                        harvested.extend(records);
                    }
                }
            }

            if position < urls.len() {
                self.pacer.pause(self.delay).await;
            }
        }

        harvested
    }
}

fn session_id(prefix: &str) -> String {
    let token: u32 = rand::thread_rng().gen();
    format!("{prefix}_{token:08x}")
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap, time::Duration};

    use itertools::Itertools;

    use super::{session_id, HandbookCrawler, Pacer};
    use crate::{
        extractor::{ExtractError, ExtractRequest, Extractor},
        parser::CourseParser,
        schema::Placeholder,
    };

    enum Scripted {
        Content(&'static str),
        Nothing,
        Fail,
    }

    #[derive(Default)]
    struct ScriptedExtractor {
        pages: HashMap<&'static str, Scripted>,
        seen: RefCell<Vec<(String, String, String)>>,
    }
    impl Extractor for ScriptedExtractor {
        async fn extract(
            &self,
            request: &ExtractRequest<'_>,
        ) -> Result<Option<String>, ExtractError> {
            self.seen.borrow_mut().push((
                request.url.to_owned(),
                request.css_selector.to_owned(),
                request.session_id.to_owned(),
            ));
            match self.pages.get(request.url) {
                Some(Scripted::Content(s)) => Ok(Some(s.to_string())),
                Some(Scripted::Nothing) | None => Ok(None),
                Some(Scripted::Fail) => Err(ExtractError::Llm("boom".to_owned())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPacer(RefCell<Vec<Duration>>);
    impl Pacer for RecordingPacer {
        async fn pause(&self, delay: Duration) {
            self.0.borrow_mut().push(delay);
        }
    }

    fn crawler(
        pages: impl IntoIterator<Item = (&'static str, Scripted)>,
    ) -> HandbookCrawler<ScriptedExtractor, RecordingPacer> {
        HandbookCrawler::with_pacer(
            ScriptedExtractor {
                pages: pages.into_iter().collect(),
                ..Default::default()
            },
            CourseParser::new(Placeholder::default()),
            RecordingPacer::default(),
            Duration::from_millis(500),
            "unsw_handbook",
        )
    }

    #[tokio::test]
    async fn test_failures_are_skipped() {
        let crawler = crawler([
            ("u1", Scripted::Content(r#"{"code": "COMP1511", "uoc": 6}"#)),
            ("u2", Scripted::Fail),
            ("u3", Scripted::Content("not json")),
            ("u4", Scripted::Content("   ")),
            ("u5", Scripted::Nothing),
            ("u6", Scripted::Content(r#"[{"code": "COMP2521"}, {"code": "COMP3121"}]"#)),
        ]);
        let urls = ["u1", "u2", "u3", "u4", "u5", "u6"];
        let records = crawler.crawl(&urls, "main").await;
        assert_eq!(
            records.iter().map(|r| r.code().as_str()).collect_vec(),
            ["COMP1511", "COMP2521", "COMP3121"]
        );
        assert_eq!(records[0].uoc(), "6");

        let seen = crawler.extractor.seen.borrow();
        assert_eq!(seen.iter().map(|(url, _, _)| url.as_str()).collect_vec(), urls);
        assert!(seen.iter().all(|(_, selector, _)| selector == "main"));
        assert_eq!(seen.iter().map(|(_, _, session)| session).unique().count(), 1);
        assert!(seen[0].2.starts_with("unsw_handbook_"));

        assert_eq!(
            *crawler.pacer.0.borrow(),
            vec![Duration::from_millis(500); urls.len() - 1]
        );
    }

    #[tokio::test]
    async fn test_single_and_empty_url_lists() {
        let crawler = crawler([("only", Scripted::Fail)]);
        assert!(crawler.crawl(&["only"], "main").await.is_empty());
        assert!(crawler.pacer.0.borrow().is_empty());

        assert!(crawler.crawl::<&str>(&[], "main").await.is_empty());
        assert!(crawler.pacer.0.borrow().is_empty());
    }

    #[test]
    fn test_session_id_format() {
        let id = session_id("unsw_handbook");
        let token = id.strip_prefix("unsw_handbook_").unwrap();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
