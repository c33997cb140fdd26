//! Page budget selection.
//!
//! Small frontiers are used whole. Larger ones are handed to the ranking
//! oracle, whose answer is parsed leniently; anything unusable becomes an
//! empty, degraded budget rather than an error.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use orgscout_shared::Outcome;

use crate::oracle::RankingOracle;

/// Choose at most `bound` URLs from `frontier`.
#[instrument(skip_all, fields(frontier = frontier.len(), bound))]
pub async fn select_budget(
    oracle: &dyn RankingOracle,
    frontier: &[String],
    bound: usize,
) -> Outcome<Vec<String>> {
    if frontier.len() <= bound {
        debug!("frontier within bound, using all of it");
        return Outcome::Complete(frontier.to_vec());
    }

    let prompt = ranking_prompt(frontier, bound);
    let answer = match oracle.rank(&prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "ranking oracle failed, budget is empty");
            return Outcome::degraded(Vec::new(), format!("ranking oracle failed: {e}"));
        }
    };

    match parse_url_list(&answer) {
        Some(urls) => {
            let budget = clean_budget(urls, bound);
            debug!(selected = budget.len(), "oracle selected budget");
            Outcome::Complete(budget)
        }
        None => {
            warn!(answer = %answer, "unparseable ranking answer, budget is empty");
            Outcome::degraded(Vec::new(), "ranking answer was not a list of URLs")
        }
    }
}

/// The instruction sent to the oracle for an oversized frontier.
pub fn ranking_prompt(frontier: &[String], bound: usize) -> String {
    let numbered = frontier
        .iter()
        .enumerate()
        .map(|(i, url)| format!("{}. {url}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Below is a list of URLs from the organization's website:\n\
         {numbered}\n\n\
         Return up to {bound} URLs that are most likely to contain content about the \
         organization, its mission, and its services.\n\
         Do not include URLs that appear to be blog posts, login pages, privacy policies, \
         or other non-content pages. Always include the homepage as the first URL.\n\
         Return only a JSON array of URL strings, with no other text."
    )
}

/// Parse a JSON array of strings, tolerating a surrounding code fence.
fn parse_url_list(answer: &str) -> Option<Vec<String>> {
    let trimmed = answer.trim();
    let body = trimmed
        .strip_prefix("```")
        .map(|rest| rest.trim_start_matches("json"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str::<Vec<String>>(body).ok()
}

/// Trim, drop empties and duplicates, keep order, cap at `bound`.
fn clean_budget(urls: Vec<String>, bound: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .take(bound)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use orgscout_shared::{OrgScoutError, Result};

    /// Returns a canned answer and records every prompt.
    pub(crate) struct ScriptedOracle {
        answer: Option<String>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        pub(crate) fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                answer: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RankingOracle for ScriptedOracle {
        async fn rank(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer
                .clone()
                .ok_or_else(|| OrgScoutError::Oracle("connection refused".into()))
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://pastorserve.org/p{i}")).collect()
    }

    #[tokio::test]
    async fn small_frontier_returned_unchanged() {
        let oracle = ScriptedOracle::failing();
        let frontier = urls(10);

        let outcome = select_budget(&oracle, &frontier, 10).await;

        assert!(!outcome.is_degraded());
        assert_eq!(outcome.value(), &frontier);
        assert!(oracle.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_frontier_is_empty_budget() {
        let oracle = ScriptedOracle::failing();
        let outcome = select_budget(&oracle, &[], 10).await;
        assert!(outcome.value().is_empty());
        assert!(!outcome.is_degraded());
    }

    #[tokio::test]
    async fn malformed_answer_degrades_to_empty() {
        let oracle = ScriptedOracle::answering("Sure! Here are the best pages: /about, /team");
        let outcome = select_budget(&oracle, &urls(11), 10).await;

        assert!(outcome.is_degraded());
        assert!(outcome.value().is_empty());
    }

    #[tokio::test]
    async fn oracle_failure_degrades_to_empty() {
        let oracle = ScriptedOracle::failing();
        let outcome = select_budget(&oracle, &urls(12), 10).await;

        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap().contains("connection refused"));
        assert!(outcome.value().is_empty());
    }

    #[tokio::test]
    async fn prompt_numbers_every_frontier_url() {
        let oracle = ScriptedOracle::answering("[]");
        let frontier = urls(15);

        select_budget(&oracle, &frontier, 10).await;

        let prompts = oracle.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        for (i, url) in frontier.iter().enumerate() {
            assert!(prompts[0].contains(&format!("{}. {url}\n", i + 1)));
        }
        assert!(!prompts[0].contains("16. "));
        assert!(prompts[0].contains("Return up to 10 URLs"));
    }

    #[tokio::test]
    async fn answer_is_cleaned_and_capped() {
        let answer = r#"```json
["https://pastorserve.org/", " https://pastorserve.org/p1 ", "https://pastorserve.org/p1", "",
 "https://pastorserve.org/p2", "https://pastorserve.org/p3"]
```"#;
        let oracle = ScriptedOracle::answering(answer);

        let outcome = select_budget(&oracle, &urls(20), 3).await;

        assert!(!outcome.is_degraded());
        assert_eq!(
            outcome.value(),
            &vec![
                "https://pastorserve.org/".to_string(),
                "https://pastorserve.org/p1".to_string(),
                "https://pastorserve.org/p2".to_string(),
            ]
        );
    }

    #[test]
    fn parses_bare_and_fenced_arrays() {
        assert_eq!(parse_url_list(r#"["a","b"]"#), Some(vec!["a".into(), "b".into()]));
        assert_eq!(parse_url_list("```\n[\"a\"]\n```"), Some(vec!["a".into()]));
        assert_eq!(parse_url_list("not json"), None);
        assert_eq!(parse_url_list(r#"{"urls": ["a"]}"#), None);
    }
}
