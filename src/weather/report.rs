use chrono::Local;

use crate::chat::client::ChatBackend;
use crate::chat::message::{ChatMessage, usage_line};
use crate::chat::tools::{ToolDefinition, ToolFunction, ToolParam, ToolParamType};
use crate::weather::{ForecastProvider, WeatherError};

/// Temperature used for every chat call in the reporting flows.
pub const REPORT_TEMPERATURE: f32 = 0.7;

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a helpful assistant who is an expert at \
    picking out UK town and city names from user prompts";

const REPHRASE_SYSTEM_PROMPT: &str = "You are a helpful assistant called 'Skylark' who \
    specialises in providing chatty and friendly weather forecasts for UK towns and cities. \
    ALWAYS use degrees Celsius and not Fahrenheit for temperatures. You MUST ONLY reply with \
    the forecast - NEVER say things like 'Sure thing! Here's the forecast for...'";

fn location_tool() -> ToolDefinition {
    ToolDefinition::from_function(
        ToolFunction::new(
            "get_location_for_forecast",
            "figure out what town or city the user wants the weather for",
        )
        .with_param(
            ToolParam::required("location", ToolParamType::String).describe(
                "A csv list of one or more UK city or town, eg London,Edinburgh,Manchester",
            ),
        ),
    )
}

/// Extracts candidate place names from free text via one forced tool call.
///
/// Returns the raw comma-separated entries (un-trimmed) plus the tokens the
/// extraction call consumed. Entries that are blank after trimming are
/// dropped, so a missing or empty argument yields an empty list.
pub async fn locations_from_prompt<B>(
    prompt: &str,
    chat: &B,
) -> Result<(Vec<String>, u32), WeatherError>
where
    B: ChatBackend + ?Sized,
{
    let messages = [
        ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ];
    let tools = [location_tool()];
    let response = chat
        .function_call(&messages, &tools, REPORT_TEMPERATURE)
        .await
        .map_err(WeatherError::Chat)?;

    let raw = response
        .parameters
        .get("location")
        .and_then(|value| value.as_str())
        .unwrap_or("");
    Ok((split_locations(raw), response.tokens))
}

fn split_locations(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

/// Answers a weather question in a conversational broadcast style.
///
/// Place names are extracted with one forced tool call, each one is looked
/// up sequentially, and a single rephrasing call turns the combined
/// forecasts into the final message. When extraction yields nothing, the
/// raw question goes to one plain chat call instead. Token usage
/// accumulates across every chat call made and is reported in the appended
/// footer.
pub async fn friendly_forecast<F, B>(
    question: &str,
    forecasts: &F,
    chat: &B,
) -> Result<String, WeatherError>
where
    F: ForecastProvider + ?Sized,
    B: ChatBackend + ?Sized,
{
    let trimmed = question.trim();
    let (locations, mut total_tokens) = locations_from_prompt(trimmed, chat).await?;

    if locations.is_empty() {
        // The raw question goes through untouched; only extraction and the
        // rephrase instruction see the trimmed form.
        let response = chat
            .chat(&[ChatMessage::user(question)], REPORT_TEMPERATURE)
            .await
            .map_err(WeatherError::Chat)?;
        total_tokens += response.tokens;
        return Ok(format!("{}\n{}", response.message, usage_line(total_tokens)));
    }

    let mut combined = String::new();
    for location in &locations {
        combined.push_str(&forecasts.forecast(location.trim()).await?);
        combined.push('\n');
    }

    let time = Local::now().format("%H:%M");
    let instruction = format!(
        "It is currently {time}. The user asked me ''{trimmed}''. I have got the following \
         weather forecasts for you based on their question. Could you make them a bit more \
         natural but still concise - like a weather presenter would give at the end of a \
         drive-time news segment on the radio or TV? ONLY reply with the rewritten forecast. \
         NEVER add any extra context - the user only wants to see the forecast. If the wind \
         speed is given in knots, convert it to MPH. Feel free to use weather-specific emoji. \
         ''{combined}''"
    );
    let messages = [
        ChatMessage::user(instruction),
        ChatMessage::system(REPHRASE_SYSTEM_PROMPT),
    ];
    let response = chat
        .chat(&messages, REPORT_TEMPERATURE)
        .await
        .map_err(WeatherError::Chat)?;
    total_tokens += response.tokens;
    Ok(format!("{}\n{}", response.message, usage_line(total_tokens)))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::*;
    use crate::chat::client::ChatError;
    use crate::chat::message::{ChatResponse, FunctionResponse};

    struct ScriptedChat {
        location_arg: Option<&'static str>,
        extraction_tokens: u32,
        chat_tokens: u32,
        chat_calls: Mutex<u32>,
        function_calls: Mutex<u32>,
    }

    impl ScriptedChat {
        fn new(location_arg: Option<&'static str>) -> Self {
            Self {
                location_arg,
                extraction_tokens: 30,
                chat_tokens: 70,
                chat_calls: Mutex::new(0),
                function_calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedChat {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> Result<ChatResponse, ChatError> {
            *self.chat_calls.lock().unwrap() += 1;
            Ok(ChatResponse::new("scripted reply".to_string(), self.chat_tokens))
        }

        async fn function_call(
            &self,
            _messages: &[ChatMessage],
            tools: &[ToolDefinition],
            _temperature: f32,
        ) -> Result<FunctionResponse, ChatError> {
            *self.function_calls.lock().unwrap() += 1;
            assert_eq!(tools[0].name(), "get_location_for_forecast");

            let mut parameters = Map::new();
            if let Some(arg) = self.location_arg {
                parameters.insert("location".to_string(), Value::String(arg.to_string()));
            }
            Ok(FunctionResponse::new(parameters, self.extraction_tokens))
        }
    }

    struct CountingForecasts {
        lookups: Mutex<Vec<String>>,
    }

    impl CountingForecasts {
        fn new() -> Self {
            Self {
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ForecastProvider for CountingForecasts {
        async fn forecast(&self, location_name: &str) -> Result<String, WeatherError> {
            self.lookups.lock().unwrap().push(location_name.to_string());
            Ok(format!("Forecast for {location_name}: Sunny day.\n"))
        }
    }

    #[test]
    fn split_keeps_entries_raw() {
        assert_eq!(
            split_locations("London, Edinburgh"),
            vec!["London".to_string(), " Edinburgh".to_string()]
        );
    }

    #[test]
    fn split_discards_blank_entries() {
        assert!(split_locations("").is_empty());
        assert!(split_locations(" , ").is_empty());
        assert_eq!(split_locations("London,,Leeds").len(), 2);
    }

    #[tokio::test]
    async fn extraction_returns_raw_entries_and_tokens() {
        let chat = ScriptedChat::new(Some("London,Edinburgh, Manchester"));
        let (locations, tokens) = locations_from_prompt("weather please", &chat)
            .await
            .expect("extraction should succeed");

        assert_eq!(locations, vec!["London", "Edinburgh", " Manchester"]);
        assert_eq!(tokens, 30);
    }

    #[tokio::test]
    async fn missing_argument_yields_no_locations() {
        let chat = ScriptedChat::new(None);
        let (locations, tokens) = locations_from_prompt("hello", &chat)
            .await
            .expect("extraction should succeed");
        assert!(locations.is_empty());
        assert_eq!(tokens, 30);
    }

    #[tokio::test]
    async fn no_locations_falls_back_to_one_chat_call() {
        let chat = ScriptedChat::new(Some(""));
        let forecasts = CountingForecasts::new();

        let answer = friendly_forecast("what is the capital of France?", &forecasts, &chat)
            .await
            .expect("fallback should succeed");

        assert_eq!(*chat.function_calls.lock().unwrap(), 1);
        assert_eq!(*chat.chat_calls.lock().unwrap(), 1);
        assert!(forecasts.lookups.lock().unwrap().is_empty());
        assert_eq!(
            answer,
            format!("scripted reply\n{}", usage_line(30 + 70))
        );
    }

    #[tokio::test]
    async fn each_location_is_looked_up_then_rephrased_once() {
        let chat = ScriptedChat::new(Some("London,Edinburgh, Manchester"));
        let forecasts = CountingForecasts::new();

        let answer = friendly_forecast("weather in a few places?", &forecasts, &chat)
            .await
            .expect("report should succeed");

        assert_eq!(
            *forecasts.lookups.lock().unwrap(),
            vec!["London", "Edinburgh", "Manchester"]
        );
        assert_eq!(*chat.function_calls.lock().unwrap(), 1);
        assert_eq!(*chat.chat_calls.lock().unwrap(), 1);
        assert_eq!(
            answer,
            format!("scripted reply\n{}", usage_line(30 + 70))
        );
    }
}
