use crate::{
    clients::CompletionService,
    error::AnalysisError,
    models::{ChatMessage, CompletionRequest, Dish, DishBatch, MAX_DISHES},
};
use serde_json::Value;
use std::sync::Arc;

/// Reply the model gives when the text is not a food menu.
pub const NOT_A_MENU_REPLY: &str = "ERROR";

/// Low temperature keeps extraction close to deterministic.
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

const FENCE: &str = "```";

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that extracts dish names and \
short, appetizing descriptions from restaurant menus. If the provided text is not a food menu, \
reply with ONLY the word 'ERROR'. If it is a menu, choose the top 5 dishes by your own opinion \
(based on popularity, uniqueness, or taste appeal) and reply with a JSON array of 5 objects, \
each with 'name' (dish name) and 'description' (a short, appetizing description of the dish). \
Reply ONLY with the JSON array or 'ERROR'. Example: [{\"name\":\"Tiramisu\",\"description\":\
\"Classic Italian dessert with coffee-soaked ladyfingers and mascarpone cream\"}, ...]";

/// Asks the completion service to pick the most appealing dishes from a menu.
#[derive(Clone)]
pub struct MenuAnalyzer {
    completion: Arc<dyn CompletionService>,
}

impl MenuAnalyzer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub async fn analyze(&self, menu_text: &str) -> Result<DishBatch, AnalysisError> {
        if menu_text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput);
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(menu_text),
            ],
            temperature: ANALYSIS_TEMPERATURE,
        };

        log::debug!("Analyzing menu text ({} chars)", menu_text.len());
        let reply = self.completion.complete(request).await?;
        let dishes = parse_dishes(&reply)?;
        log::info!("Extracted {} dishes from menu", dishes.len());
        Ok(dishes)
    }
}

/// Turns a raw model reply into a dish batch of at most [`MAX_DISHES`] entries.
pub fn parse_dishes(reply: &str) -> Result<DishBatch, AnalysisError> {
    let content = reply.trim();
    if content == NOT_A_MENU_REPLY {
        return Err(AnalysisError::NotAMenu);
    }

    let value: Value = serde_json::from_str(extract_json(content))
        .map_err(|e| AnalysisError::ParseError(e.to_string()))?;

    let items = match value {
        Value::Array(items) if !items.is_empty() => items,
        Value::Array(_) => return Err(AnalysisError::MalformedResult("empty array".into())),
        other => {
            return Err(AnalysisError::MalformedResult(format!(
                "expected an array, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .take(MAX_DISHES)
        .map(|item| match item {
            Value::Object(_) => serde_json::from_value::<Dish>(item)
                .map_err(|e| AnalysisError::MalformedResult(e.to_string())),
            other => Err(AnalysisError::MalformedResult(format!(
                "dish entry is {}, not an object",
                json_kind(&other)
            ))),
        })
        .collect()
}

/// Pulls the JSON payload out of a model reply.
///
/// When the reply contains a fenced block, the content of the first block is
/// returned with any language tag removed; an unterminated fence runs to the
/// end of the text. Replies without fences come back unchanged.
pub fn extract_json(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };

    let rest = &text[open + FENCE.len()..];
    let block = match rest.find(FENCE) {
        Some(close) => &rest[..close],
        None => rest,
    };

    strip_language_tag(block).trim()
}

fn strip_language_tag(block: &str) -> &str {
    let (first_line, remainder) = block.split_once('\n').unwrap_or((block, ""));
    let tag = first_line.trim();

    if !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return remainder;
    }

    // Tag glued to the payload, e.g. "```json[...]".
    block.strip_prefix("json").unwrap_or(block)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::pipeline::fakes::FakeCompletion;

    const TWO_DISHES: &str = r#"[{"name":"Margherita Pizza","description":"Tomato, mozzarella and fresh basil on a blistered crust"},{"name":"Spaghetti Carbonara","description":"Silky egg sauce with crisp pancetta and pecorino"}]"#;

    #[test]
    fn test_extract_json_without_fences() {
        assert_eq!(extract_json("[1, 2]"), "[1, 2]");
    }

    #[test]
    fn test_extract_json_with_language_tag() {
        let reply = "Here you go:\n```json\n[{\"name\":\"A\"}]\n```\nEnjoy!";
        assert_eq!(extract_json(reply), "[{\"name\":\"A\"}]");
    }

    #[test]
    fn test_extract_json_without_language_tag() {
        let reply = "```\n[{\"name\":\"A\"}]\n```";
        assert_eq!(extract_json(reply), "[{\"name\":\"A\"}]");
    }

    #[test]
    fn test_extract_json_tag_glued_to_payload() {
        assert_eq!(extract_json("```json[1]```"), "[1]");
    }

    #[test]
    fn test_extract_json_uses_first_fence_pair_only() {
        let reply = "```json\n[\"first\"]\n```\ntext\n```json\n[\"second\"]\n```";
        assert_eq!(extract_json(reply), "[\"first\"]");
    }

    #[test]
    fn test_extract_json_unterminated_fence() {
        assert_eq!(extract_json("```json\n[\"open\"]"), "[\"open\"]");
    }

    #[test]
    fn test_fenced_and_plain_replies_parse_the_same() {
        let fenced = format!("Sure! Here are the dishes:\n```json\n{}\n```", TWO_DISHES);
        assert_eq!(parse_dishes(&fenced).unwrap(), parse_dishes(TWO_DISHES).unwrap());
    }

    #[test]
    fn test_parse_dishes_not_a_menu() {
        assert!(matches!(
            parse_dishes("  ERROR \n"),
            Err(AnalysisError::NotAMenu)
        ));
        // Only the exact token counts.
        assert!(matches!(
            parse_dishes("ERROR: not a menu"),
            Err(AnalysisError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_dishes_rejects_bad_shapes() {
        assert!(matches!(
            parse_dishes("[]"),
            Err(AnalysisError::MalformedResult(_))
        ));
        assert!(matches!(
            parse_dishes(r#"{"name":"Soup"}"#),
            Err(AnalysisError::MalformedResult(_))
        ));
        assert!(matches!(
            parse_dishes(r#"["Soup", "Salad"]"#),
            Err(AnalysisError::MalformedResult(_))
        ));
        assert!(matches!(
            parse_dishes("I think the best dishes are"),
            Err(AnalysisError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_dishes_defers_missing_fields() {
        let dishes = parse_dishes(r#"[{"name":"Soup"}]"#).unwrap();
        assert_eq!(dishes, vec![Dish::new("Soup", "")]);
    }

    #[test]
    fn test_parse_dishes_tolerates_null_and_numeric_fields() {
        let dishes = parse_dishes(
            r#"[{"name":"Soup","description":null},{"name":12,"description":"Green"},{"name":null}]"#,
        )
        .unwrap();
        assert_eq!(
            dishes,
            vec![
                Dish::new("Soup", ""),
                Dish::new("12", "Green"),
                Dish::new("", ""),
            ]
        );
    }

    #[test]
    fn test_parse_dishes_caps_batch() {
        let many: Vec<Dish> = (0..8)
            .map(|i| Dish::new(format!("Dish {}", i), "Tasty"))
            .collect();
        let reply = serde_json::to_string(&many).unwrap();
        let dishes = parse_dishes(&reply).unwrap();
        assert_eq!(dishes.len(), MAX_DISHES);
        assert_eq!(dishes[4].name, "Dish 4");
    }

    #[tokio::test]
    async fn test_analyze_empty_text_makes_no_call() {
        let fake = Arc::new(FakeCompletion::replying(TWO_DISHES));
        let analyzer = MenuAnalyzer::new(fake.clone());

        assert!(matches!(
            analyzer.analyze("").await,
            Err(AnalysisError::InvalidInput)
        ));
        assert!(matches!(
            analyzer.analyze("   \n").await,
            Err(AnalysisError::InvalidInput)
        ));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_menu_text() {
        let fake = Arc::new(FakeCompletion::replying(TWO_DISHES));
        let analyzer = MenuAnalyzer::new(fake.clone());
        let menu = "Margherita Pizza - tomato, mozzarella, basil. \
                    Spaghetti Carbonara - egg, pancetta, pecorino.";

        let dishes = analyzer.analyze(menu).await.unwrap();
        assert!((2..=MAX_DISHES).contains(&dishes.len()));
        assert!(dishes
            .iter()
            .all(|d| !d.name.is_empty() && !d.description.is_empty()));

        let request = fake.last_request().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("'ERROR'"));
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, menu);
        assert!((request.temperature - ANALYSIS_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_analyze_non_menu_text() {
        let fake = Arc::new(FakeCompletion::replying("ERROR"));
        let analyzer = MenuAnalyzer::new(fake);
        let result = analyzer
            .analyze("The quarterly earnings report shows...")
            .await;
        assert!(matches!(result, Err(AnalysisError::NotAMenu)));
    }

    #[tokio::test]
    async fn test_analyze_upstream_failure_is_not_retried() {
        let fake = Arc::new(FakeCompletion::failing());
        let analyzer = MenuAnalyzer::new(fake.clone());
        let result = analyzer.analyze("Soup of the day").await;
        assert!(matches!(result, Err(AnalysisError::UpstreamError(_))));
        assert_eq!(fake.calls(), 1);
    }
}
