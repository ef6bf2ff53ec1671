use serde::Serialize;
use thiserror::Error;

const PAIR_SEPARATOR: &str = ", ";
const NONE_LITERAL: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMetric {
    AgentInteractionDuration,
    AfterContactWorkDuration,
}

impl AgentMetric {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AgentInteractionDuration => "agentinteractionduration",
            Self::AfterContactWorkDuration => "aftercontactworkduration",
        }
    }

    #[must_use]
    pub const fn output_column(self) -> &'static str {
        match self {
            Self::AgentInteractionDuration => "agentinteractionduration_seconds",
            Self::AfterContactWorkDuration => "aftercontactworkduration_seconds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentFieldError {
    #[error("agent key `{key}` has non-integer value `{value}`")]
    NotInteger { key: String, value: String },
    #[error("agent key `{key}` has no value")]
    MissingValue { key: String },
}

/// Extracts one metric; `Ok(None)` means the key is absent, which is not `0`.
pub fn extract_agent_metric(raw: &str, metric: AgentMetric) -> Result<Option<i64>, AgentFieldError> {
    extract_agent_value(raw, metric.key())
}

pub fn extract_agent_value(raw: &str, key: &str) -> Result<Option<i64>, AgentFieldError> {
    let body = strip_enclosing_braces(raw.trim());

    for pair in body.split(PAIR_SEPARATOR) {
        let (pair_key, value) = match pair.split_once('=') {
            Some((pair_key, value)) => (pair_key, Some(value)),
            None => (pair, None),
        };
        if pair_key.trim() != key {
            continue;
        }
        let Some(value) = value else {
            return Err(AgentFieldError::MissingValue {
                key: key.to_string(),
            });
        };
        return coerce_numeric(key, value.trim()).map(Some);
    }

    Ok(None)
}

fn coerce_numeric(key: &str, value: &str) -> Result<i64, AgentFieldError> {
    if value == NONE_LITERAL {
        return Ok(0);
    }
    value.parse::<i64>().map_err(|_| AgentFieldError::NotInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn strip_enclosing_braces(raw: &str) -> &str {
    raw.strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(raw)
}
