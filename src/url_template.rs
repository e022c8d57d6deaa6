use thiserror::Error;

use crate::schema::{StudyLevel, Year};

/// A URL template such as `https://example.edu/{level}/courses/{year}/{code}`.
///
/// `{{` and `}}` stand for literal braces.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum Segment {
    Literal(String),
    Level,
    Year,
    Code,
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{0}}} in URL template")]
    UnknownPlaceholder(String),
    #[error("Unbalanced brace at byte {0} of URL template")]
    UnbalancedBrace(usize),
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = vec![];
        let mut literal = String::new();
        let mut last = 0;
        for captures in regex!(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").captures_iter(template) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            literal.push_str(&template[last..whole.start()]);
            last = whole.end();
            match (whole.as_str(), captures.get(1)) {
                ("{{", _) => literal.push('{'),
                ("}}", _) => literal.push('}'),
                (_, Some(name)) => {
                    let segment = match name.as_str() {
                        "level" => Segment::Level,
                        "year" => Segment::Year,
                        "code" => Segment::Code,
                        other => return Err(TemplateError::UnknownPlaceholder(other.to_owned())),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                _ => return Err(TemplateError::UnbalancedBrace(whole.start())),
            }
        }
        literal.push_str(&template[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, level: StudyLevel, year: Year, code: &str) -> String {
        let mut ret = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => ret.push_str(s),
                Segment::Level => ret.push_str(&level.to_string()),
                Segment::Year => ret.push_str(&year.to_string()),
                Segment::Code => ret.push_str(code),
            }
        }
        ret
    }
}

/// Expands `template` once per code, preserving the order of `codes`.
pub fn build_urls<S: AsRef<str>>(
    template: &str,
    level: StudyLevel,
    year: Year,
    codes: &[S],
) -> Result<Vec<String>, TemplateError> {
    let template = UrlTemplate::parse(template)?;
    Ok(codes
        .iter()
        .map(|code| template.render(level, year, code.as_ref()))
        .collect())
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{build_urls, TemplateError, UrlTemplate};
    use crate::schema::{StudyLevel, Year};

    const TEMPLATE: &str = "https://www.handbook.unsw.edu.au/{level}/courses/{year}/{code}";

    fn year(y: u16) -> Year {
        Year::new(y).unwrap()
    }

    #[test]
    fn test_build_urls() {
        let urls = build_urls(
            TEMPLATE,
            StudyLevel::Postgraduate,
            year(2025),
            &["COMP1511", "COMP2521", "COMP1511X"],
        )
        .unwrap();
        assert_eq!(
            urls,
            [
                "https://www.handbook.unsw.edu.au/postgraduate/courses/2025/COMP1511",
                "https://www.handbook.unsw.edu.au/postgraduate/courses/2025/COMP2521",
                "https://www.handbook.unsw.edu.au/postgraduate/courses/2025/COMP1511X",
            ]
        );
        assert_eq!(urls.iter().unique().count(), urls.len());
    }

    #[test]
    fn test_empty_code_list() {
        let urls = build_urls::<&str>(TEMPLATE, StudyLevel::Undergraduate, year(2024), &[]);
        assert_eq!(urls, Ok(vec![]));
    }

    #[test]
    fn test_escaped_braces_and_repeats() {
        let template = UrlTemplate::parse("{{{code}}}/{code}?y={year}").unwrap();
        assert_eq!(
            template.render(StudyLevel::Undergraduate, year(2023), "ACCT1501"),
            "{ACCT1501}/ACCT1501?y=2023"
        );
    }

    #[test]
    fn test_template_errors() {
        assert_eq!(
            UrlTemplate::parse("https://x/{term}/{code}"),
            Err(TemplateError::UnknownPlaceholder("term".to_owned()))
        );
        assert_eq!(
            UrlTemplate::parse("https://x/{}"),
            Err(TemplateError::UnknownPlaceholder(String::new()))
        );
        assert_eq!(
            UrlTemplate::parse("https://x/{code"),
            Err(TemplateError::UnbalancedBrace(10))
        );
        assert_eq!(
            UrlTemplate::parse("https://x/code}"),
            Err(TemplateError::UnbalancedBrace(14))
        );
    }
}
