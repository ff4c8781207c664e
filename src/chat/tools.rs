use serde_json::{Map, Value, json};

/// JSON schema primitive types accepted for tool parameters.
#[derive(Debug, Clone, Copy)]
pub enum ToolParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ToolParamType {
    fn as_str(self) -> &'static str {
        match self {
            ToolParamType::String => "string",
            ToolParamType::Integer => "integer",
            ToolParamType::Number => "number",
            ToolParamType::Boolean => "boolean",
            ToolParamType::Array => "array",
            ToolParamType::Object => "object",
        }
    }
}

/// One declared parameter of a tool function.
#[derive(Debug, Clone)]
pub struct ToolParam {
    /// Parameter name.
    pub name: String,
    /// JSON schema type.
    pub kind: ToolParamType,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether the model must supply the parameter.
    pub required: bool,
}

impl ToolParam {
    /// Declares a required parameter.
    pub fn required(name: impl Into<String>, kind: ToolParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: true,
        }
    }

    /// Declares an optional parameter.
    pub fn optional(name: impl Into<String>, kind: ToolParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: false,
        }
    }

    /// Attaches a human-readable description.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Function declaration exposed to the model.
#[derive(Debug, Clone)]
pub struct ToolFunction {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter declarations.
    pub params: Vec<ToolParam>,
}

impl ToolFunction {
    /// Creates a function declaration with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Appends one parameter declaration.
    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut entry = Map::new();
            entry.insert(
                "type".to_string(),
                Value::String(param.kind.as_str().to_string()),
            );
            if let Some(description) = &param.description {
                entry.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            properties.insert(param.name.clone(), Value::Object(entry));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// Tool wrapper matching the chat-completions function-calling format.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Function declaration.
    pub function: ToolFunction,
}

impl ToolDefinition {
    /// Wraps a function declaration as a tool.
    pub fn from_function(function: ToolFunction) -> Self {
        Self { function }
    }

    /// Name of the declared function.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Serializes the declaration for the request payload.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.function.name,
                "description": self.function.description,
                "parameters": self.function.schema(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tool() -> ToolDefinition {
        ToolDefinition::from_function(
            ToolFunction::new("lookup", "look something up")
                .with_param(
                    ToolParam::required("query", ToolParamType::String)
                        .describe("what to look for"),
                )
                .with_param(ToolParam::optional("limit", ToolParamType::Integer)),
        )
    }

    #[test]
    fn declaration_uses_function_calling_shape() {
        let body = sample_tool().to_json();
        assert_eq!(body["type"], "function");
        assert_eq!(body["function"]["name"], "lookup");
        assert_eq!(body["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn schema_lists_only_required_params() {
        let body = sample_tool().to_json();
        let required = body["function"]["parameters"]["required"]
            .as_array()
            .expect("required should be present");
        assert_eq!(required, &[Value::String("query".to_string())]);
    }

    #[test]
    fn schema_describes_typed_properties() {
        let body = sample_tool().to_json();
        let properties = &body["function"]["parameters"]["properties"];
        assert_eq!(properties["query"]["type"], "string");
        assert_eq!(properties["query"]["description"], "what to look for");
        assert_eq!(properties["limit"]["type"], "integer");
        assert!(properties["limit"].get("description").is_none());
    }

    #[test]
    fn schema_omits_required_when_empty() {
        let tool = ToolDefinition::from_function(ToolFunction::new("ping", "no params"));
        let body = tool.to_json();
        assert!(body["function"]["parameters"].get("required").is_none());
    }
}
