//! Pick the commit message line out of a model response.

use crate::error::Error;

/// Find the commit message in `response`.
///
/// Lines are scanned from last to first, since models tend to restate or
/// draft before giving the final answer. The priority keyword is tried
/// over the whole response before any fallback keyword. When a line
/// contains several fallback keywords, the first one in `fallbacks` wins.
pub fn extract(response: &str, priority: &str, fallbacks: &[String]) -> Result<String, Error> {
    let lines: Vec<&str> = response.lines().collect();

    let found = lines
        .iter()
        .rev()
        .find_map(|line| cut_at(line, priority))
        .or_else(|| {
            lines.iter().rev().find_map(|line| {
                fallbacks
                    .iter()
                    .find_map(|keyword| cut_at(line, keyword))
            })
        })
        .ok_or(Error::NoCommitMessage)?;

    Ok(sanitize(found))
}

/// The rest of `line` starting at the first occurrence of `keyword`.
fn cut_at<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    if keyword.is_empty() {
        return None;
    }
    line.find(keyword).map(|pos| &line[pos..])
}

fn sanitize(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '`' | '*'))
        .collect::<String>()
        .trim()
        .to_string()
}
