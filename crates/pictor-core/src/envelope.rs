use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned for every request-validation failure, matching what API
/// clients of the original endpoint already expect.
pub const NO_PROMPT_MESSAGE: &str = "No prompt specified";

/// Why a request carried no usable prompt.
///
/// Every variant renders to the same 400 response; the distinction exists
/// for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Neither a direct `prompt` field nor an HTTP envelope was present.
    Missing,
    /// HTTP envelope with a method other than POST.
    UnsupportedMethod(String),
    /// HTTP envelope whose body was absent or not valid JSON.
    BadBody,
    /// HTTP envelope whose body parsed but had no `prompt` field.
    BodyMissingPrompt,
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptError::Missing => write!(f, "no prompt field and no HTTP envelope"),
            PromptError::UnsupportedMethod(m) => write!(f, "unsupported HTTP method {m}"),
            PromptError::BadBody => write!(f, "request body is not valid JSON"),
            PromptError::BodyMissingPrompt => write!(f, "request body has no prompt field"),
        }
    }
}

/// Extract the prompt from an invocation payload.
///
/// Two shapes are accepted: a direct invocation `{"prompt": "..."}`, and an
/// HTTP-style envelope `{"httpMethod": "POST", "body": "<json string>"}` whose
/// body contains `prompt`. Parse failures are explicit results; the caller
/// decides the response, and no remote call happens on the error path.
pub fn extract_prompt(event: &Value) -> Result<String, PromptError> {
    if let Some(prompt) = event.get("prompt").and_then(Value::as_str) {
        return Ok(prompt.to_string());
    }

    let Some(method) = event.get("httpMethod").and_then(Value::as_str) else {
        return Err(PromptError::Missing);
    };

    if method != "POST" {
        return Err(PromptError::UnsupportedMethod(method.to_string()));
    }

    let Some(body) = event.get("body").and_then(Value::as_str) else {
        return Err(PromptError::BadBody);
    };

    let parsed: Value = serde_json::from_str(body).map_err(|_| PromptError::BadBody)?;

    parsed
        .get("prompt")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(PromptError::BodyMissingPrompt)
}

/// HTTP-shaped response envelope used for both success and failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded body text.
    pub body: String,
}

impl Response {
    /// 200 with the given JSON body.
    pub fn ok(body: &Value) -> Self {
        Self {
            status_code: 200,
            body: body.to_string(),
        }
    }

    /// 400 with the canonical "No prompt specified" body.
    pub fn no_prompt() -> Self {
        Self {
            status_code: 400,
            body: Value::String(NO_PROMPT_MESSAGE.to_string()).to_string(),
        }
    }

    /// Error envelope with a JSON `{"error": ...}` body.
    pub fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_direct_prompt() {
        let event = json!({ "prompt": "a cat" });
        assert_eq!(extract_prompt(&event).unwrap(), "a cat");
    }

    #[test]
    fn extracts_prompt_from_post_body() {
        let event = json!({ "httpMethod": "POST", "body": r#"{"prompt": "a cat"}"# });
        assert_eq!(extract_prompt(&event).unwrap(), "a cat");
    }

    #[test]
    fn non_json_body_is_bad_body() {
        let event = json!({ "httpMethod": "POST", "body": "not json" });
        assert_eq!(extract_prompt(&event), Err(PromptError::BadBody));
    }

    #[test]
    fn body_without_prompt_is_rejected() {
        let event = json!({ "httpMethod": "POST", "body": r#"{"steps": 50}"# });
        assert_eq!(extract_prompt(&event), Err(PromptError::BodyMissingPrompt));
    }

    #[test]
    fn missing_prompt_and_method_is_rejected() {
        let event = json!({ "something": "else" });
        assert_eq!(extract_prompt(&event), Err(PromptError::Missing));
    }

    #[test]
    fn get_method_is_rejected() {
        let event = json!({ "httpMethod": "GET", "body": r#"{"prompt": "a cat"}"# });
        assert_eq!(
            extract_prompt(&event),
            Err(PromptError::UnsupportedMethod("GET".into()))
        );
    }

    #[test]
    fn no_prompt_response_shape() {
        let resp = Response::no_prompt();
        assert_eq!(resp.status_code, 400);
        assert_eq!(resp.body, r#""No prompt specified""#);
    }

    #[test]
    fn response_serializes_with_status_code_key() {
        let resp = Response::ok(&json!({ "url": "https://example.com/x.png" }));
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["statusCode"], 200);
        assert!(wire["body"].as_str().unwrap().contains("url"));
    }
}
