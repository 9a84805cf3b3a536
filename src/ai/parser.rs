// SPDX-License-Identifier: Apache-2.0

//! Turns raw model text into a candidate query or a missing-capability note.

use crate::ai::types::{GenerationOutcome, QuestionCategory};
use crate::engine::error::{EngineError, EngineResult};

const MISSING_PREFIX: &str = "MISSING:";

/// Classifies a completion.
///
/// The text is trimmed first. If it then starts with `MISSING:` (any case) it
/// becomes [`GenerationOutcome::Missing`] with the prefix removed. Anything
/// else has one leading code fence (```` ```sql ```` or bare ```` ``` ````)
/// and one trailing fence stripped, then is trimmed again. The result is not
/// validated here.
pub fn parse_response(raw: &str) -> GenerationOutcome {
    let text = raw.trim();
    if let Some(rest) = strip_missing_prefix(text) {
        return GenerationOutcome::Missing(rest.trim().to_string());
    }

    GenerationOutcome::Query(strip_code_fence(text).to_string())
}

fn strip_missing_prefix(raw: &str) -> Option<&str> {
    let head = raw.get(..MISSING_PREFIX.len())?;
    if head.eq_ignore_ascii_case(MISSING_PREFIX) {
        raw.get(MISSING_PREFIX.len()..)
    } else {
        None
    }
}

fn strip_code_fence(text: &str) -> &str {
    let mut body = text;

    if let Some(head) = body.get(..6) {
        if head.eq_ignore_ascii_case("```sql") {
            body = &body[6..];
        } else if let Some(rest) = body.strip_prefix("```") {
            body = rest;
        }
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }

    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Parses the discovery prompt's JSON answer.
///
/// Tolerates a surrounding code fence and prose before the first `[`.
pub fn parse_discovery(raw: &str) -> EngineResult<Vec<QuestionCategory>> {
    let body = strip_json_fence(raw.trim());
    let start = body.find('[');
    let end = body.rfind(']');

    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &body[s..=e],
        _ => {
            return Err(EngineError::empty_response(
                "discovery answer contains no JSON array",
            ))
        }
    };

    let categories: Vec<QuestionCategory> = serde_json::from_str(json)
        .map_err(|e| EngineError::empty_response(format!("discovery answer is not valid JSON: {e}")))?;

    Ok(categories
        .into_iter()
        .filter(|c| !c.questions.is_empty())
        .collect())
}

fn strip_json_fence(text: &str) -> &str {
    let body = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(s: &str) -> GenerationOutcome {
        GenerationOutcome::Query(s.to_string())
    }

    #[test]
    fn test_missing_prefix() {
        assert_eq!(
            parse_response("MISSING: need orders table"),
            GenerationOutcome::Missing("need orders table".into())
        );
        assert_eq!(
            parse_response("missing:   no weather data  \n"),
            GenerationOutcome::Missing("no weather data".into())
        );
    }

    #[test]
    fn test_missing_after_leading_whitespace() {
        assert_eq!(
            parse_response("  MISSING: x"),
            GenerationOutcome::Missing("x".into())
        );
        assert_eq!(
            parse_response("\n  MISSING: need orders table"),
            GenerationOutcome::Missing("need orders table".into())
        );
        assert_eq!(parse_response("MISS"), query("MISS"));
        assert_eq!(
            parse_response("SELECT 'MISSING: x'"),
            query("SELECT 'MISSING: x'")
        );
    }

    #[test]
    fn test_sql_fence_is_stripped() {
        assert_eq!(parse_response("```sql\nSELECT 1\n```"), query("SELECT 1"));
        assert_eq!(parse_response("```SQL\nSELECT 1\n```"), query("SELECT 1"));
        assert_eq!(parse_response("```\nSELECT 2\n```\n"), query("SELECT 2"));
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(parse_response("  select * from t;  "), query("select * from t;"));
    }

    #[test]
    fn test_output_is_not_validated() {
        assert_eq!(
            parse_response("```sql\nDROP TABLE customers;\n```"),
            query("DROP TABLE customers;")
        );
        assert_eq!(parse_response(""), query(""));
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert_eq!(parse_response("ñ"), query("ñ"));
        assert_eq!(parse_response("```ñ```"), query("ñ"));
    }

    #[test]
    fn test_parse_discovery() {
        let raw = r#"```json
[
  {"domain": "Sales", "description": "Orders.", "questions": ["Revenue last month?"]},
  {"domain": "Empty", "description": "Nothing.", "questions": []}
]
```"#;

        let categories = parse_discovery(raw).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].domain, "Sales");
        assert_eq!(categories[0].questions, vec!["Revenue last month?"]);
    }

    #[test]
    fn test_parse_discovery_rejects_non_json() {
        assert!(matches!(
            parse_discovery("I could not find anything."),
            Err(EngineError::GenerationEmptyResponse { .. })
        ));
        assert!(matches!(
            parse_discovery("[not json]"),
            Err(EngineError::GenerationEmptyResponse { .. })
        ));
    }
}
