//! Message lists for the two completion use cases. Wording is intentionally
//! short; the response contract is what the rest of the crate depends on.

use crate::llm::ChatMessage;

fn system_prompt() -> String {
    [
        "You are a cautious equity research assistant.",
        "Return ONLY a single JSON object. Do not wrap in markdown. No prose outside JSON.",
        "Schema:",
        "{",
        "  \"summary\": \"string\",",
        "  \"buy\": [IdeaCard], \"hold\": [IdeaCard], \"sell\": [IdeaCard],",
        "  \"underTheRadar\": [RadarCard],",
        "  \"disclaimers\": [\"string\"]",
        "}",
        "IdeaCard = {\"ticker\", \"name\", \"thesis\", \"timeframe\": \"short|medium|long\",",
        "  \"confidence\": 0-100, \"risk\": \"low|medium|high\", \"catalysts\": [\"string\"]}",
        "RadarCard = IdeaCard with \"whyInteresting\" instead of \"thesis\".",
    ]
    .join("\n")
}

pub fn screen_messages(risk: &str, region: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(format!(
            "Screen the market for a {risk}-risk investor focused on {region}. \
             Give up to 5 ideas per bucket and 3 under-the-radar names."
        )),
    ]
}

pub fn analyze_messages(ticker: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(format!(
            "Analyze {ticker}. Place it in exactly one of buy/hold/sell and list up to 3 \
             related under-the-radar names."
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn messages_are_system_then_user() {
        let m = analyze_messages("AAPL");
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].role, Role::System);
        assert_eq!(m[1].role, Role::User);
        assert!(m[1].content.contains("AAPL"));
        assert!(screen_messages("low", "Europe")[1].content.contains("Europe"));
    }
}
