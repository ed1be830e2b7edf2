//! Strict decision parsing - one JSON object, validated shape
//!
//! Oracle output is untrusted text. Exactly one JSON object is extracted
//! (string-aware brace scan, so fenced or prose-wrapped output still
//! parses) and validated against the decision schema. Anything else is
//! `MalformedDecision`; oracle text is never evaluated as code.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::{Decision, Error, OrderIntent, Result, Side, Symbol};

/// Contract pinned into every oracle call: analysis or order, never a qty.
pub const SYSTEM_PROMPT: &str = "You are a crypto trading analyst. RETURN EXACT JSON ONLY. \
If analysis: {\"action\":\"analysis\",\"text\":\"...\"}. \
If recommending a trade: {\"action\":\"order\",\"side\":\"buy|sell\",\"symbol\":\"BTCUSD|ETHUSD\",\
\"reason\":\"short reason\",\"suggested_stop\":<number or null>}. \
Do NOT include qty. Always include a concise reason and, if relevant, a suggested_stop price. \
If uncertain, return analysis not order.";

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum RawDecision {
    Analysis {
        text: String,
    },
    Order {
        side: Side,
        symbol: String,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        suggested_stop: Option<Decimal>,
        #[serde(default)]
        qty: Option<Decimal>,
    },
}

/// Parse raw oracle text into a validated decision.
pub fn parse_decision(raw: &str) -> Result<Decision> {
    let malformed = || Error::MalformedDecision {
        raw: raw.to_string(),
    };

    let object = extract_json_object(raw).ok_or_else(malformed)?;
    let decision: RawDecision = serde_json::from_str(object).map_err(|_| malformed())?;

    Ok(match decision {
        RawDecision::Analysis { text } => Decision::Analysis { text },
        RawDecision::Order {
            side,
            symbol,
            reason,
            suggested_stop,
            qty,
        } => Decision::Order(OrderIntent {
            symbol: Symbol::new(symbol),
            side,
            reason,
            stop: suggested_stop,
            qty,
        }),
    })
}

/// First balanced `{...}` in the text, skipping braces inside JSON strings.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
