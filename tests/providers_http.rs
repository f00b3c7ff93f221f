use fanllm::providers::{AnthropicClient, GoogleClient, OpenAiClient};
use fanllm::{
  Coordinator, CoordinatorConfig, GenerationParams, GenerationRequest
, LlmProvider, ModelSelection, ProviderConfig
};
use mockito::{Matcher, Server};
use serde_json::json;

fn endpoint(name: &str, server: &Server) -> ProviderConfig
{   ProviderConfig::new(name)
      .with_api_base(server.url())
      .with_timeout_secs(5)
}

fn request(provider: &str, model: &str, prompt: &str) -> GenerationRequest
{   GenerationRequest::new(
      prompt, provider, model, GenerationParams::new(0.7, 100)
    )
}

// ===== OpenAI =====

#[tokio::test]
async fn test_openai_success_is_normalized()
{   let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1/chat/completions")
      .match_header("authorization", "Bearer sk-test")
      .match_body(Matcher::PartialJson(json!({
        "model": "gpt-4",
        "max_tokens": 100,
        "messages": [{ "role": "user", "content": "Say hi" }]
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(json!({
        "choices": [
          { "message": { "role": "assistant", "content": "Hi!" },
            "finish_reason": "stop" }
        ],
        "usage": {
          "prompt_tokens": 10,
          "completion_tokens": 5,
          "total_tokens": 15
        }
      }).to_string())
      .create_async()
      .await;

    let client = OpenAiClient::with_config(
      "sk-test", &endpoint("openai", &server)
    ).unwrap();
    let result = client.generate(&request("openai", "gpt-4", "Say hi")).await;

    mock.assert_async().await;
    assert_eq!(result.error, None);
    assert_eq!(result.provider, "openai");
    assert_eq!(result.text, "Hi!");
    assert_eq!(result.tokens_used, Some(15));
    // 10 * 0.03 / 1000 + 5 * 0.06 / 1000
    assert!((result.cost.unwrap() - 0.0006).abs() < 1e-12);
    assert!(result.response_time > 0.0);
}

#[tokio::test]
async fn test_openai_without_usage_has_no_cost()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1/chat/completions")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"choices":[]}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_config(
      "sk-test", &endpoint("openai", &server)
    ).unwrap();
    let result = client
      .generate(&request("openai", "gpt-3.5-turbo", "hi"))
      .await;

    assert_eq!(result.error, None);
    assert_eq!(result.text, "");
    assert_eq!(result.tokens_used, None);
    assert_eq!(result.cost, None);
}

#[tokio::test]
async fn test_openai_rejected_key_is_an_error_result()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1/chat/completions")
      .with_status(401)
      .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_config(
      "sk-bad", &endpoint("openai", &server)
    ).unwrap();
    let result = client.generate(&request("openai", "gpt-4", "hi")).await;

    let error = result.error.expect("401 must surface as an error");
    assert!(error.contains("401"));
    assert!(error.contains("Incorrect API key"));
    assert!(result.text.is_empty());
    assert_eq!(result.cost, None);
    assert_eq!(result.model, "gpt-4");
}

#[tokio::test]
async fn test_openai_connection_check_uses_the_supplied_key()
{   let mut server = Server::new_async().await;
    let good = server.mock("POST", "/v1/chat/completions")
      .match_header("authorization", "Bearer sk-check")
      .match_body(Matcher::PartialJson(json!({
        "model": "gpt-3.5-turbo",
        "max_tokens": 5
      })))
      .with_status(200)
      .with_body(r#"{"choices":[{"message":{"content":"Hello"}}]}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_config(
      "sk-stored", &endpoint("openai", &server)
    ).unwrap();

    assert!(client.test_connection("sk-check").await);
    assert!(!client.test_connection("sk-other").await);
    good.assert_async().await;
}

// ===== Anthropic =====

#[tokio::test]
async fn test_anthropic_success_is_normalized()
{   let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1/messages")
      .match_header("x-api-key", "ak-test")
      .match_header("anthropic-version", "2023-06-01")
      .match_body(Matcher::PartialJson(json!({
        "model": "claude-3-haiku-20240307",
        "max_tokens": 100
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(json!({
        "content": [
          { "type": "text", "text": "Bonjour" },
          { "type": "text", "text": "ignored" }
        ],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 100, "output_tokens": 200 }
      }).to_string())
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-test", &endpoint("anthropic", &server)
    ).unwrap();
    let result = client
      .generate(&request("anthropic", "claude-3-haiku-20240307", "hello"))
      .await;

    mock.assert_async().await;
    assert_eq!(result.error, None);
    assert_eq!(result.text, "Bonjour");
    assert_eq!(result.tokens_used, Some(300));
    // 100 * 0.00025 / 1000 + 200 * 0.00125 / 1000
    assert!((result.cost.unwrap() - 0.000275).abs() < 1e-12);
}

#[tokio::test]
async fn test_anthropic_unknown_model_makes_no_request()
{   let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1/messages")
      .expect(0)
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-test", &endpoint("anthropic", &server)
    ).unwrap();
    let result = client
      .generate(&request("anthropic", "claude-2", "hello"))
      .await;

    mock.assert_async().await;
    assert_eq!(result.error.as_deref(), Some("Model claude-2 not available"));
    assert_eq!(result.response_time, 0.0);
}

#[tokio::test]
async fn test_anthropic_overflowing_usage_is_an_error_result()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1/messages")
      .with_status(200)
      .with_body(json!({
        "content": [{ "type": "text", "text": "hi" }],
        "usage": { "input_tokens": u64::MAX, "output_tokens": 1 }
      }).to_string())
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-test", &endpoint("anthropic", &server)
    ).unwrap();
    let result = client
      .generate(&request("anthropic", "claude-3-opus-20240229", "hello"))
      .await;

    let error = result.error.expect("overflow must surface as an error");
    assert!(error.starts_with("Parse error"));
    assert!(result.text.is_empty());
    assert_eq!(result.tokens_used, None);
    assert_eq!(result.cost, None);
}

#[tokio::test]
async fn test_anthropic_rate_limit_is_an_error_result()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1/messages")
      .with_status(429)
      .with_body(r#"{"type":"error","error":{"type":"rate_limit_error"}}"#)
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-test", &endpoint("anthropic", &server)
    ).unwrap();
    let result = client
      .generate(&request("anthropic", "claude-3-sonnet-20240229", "hello"))
      .await;

    let error = result.error.expect("429 must surface as an error");
    assert!(error.contains("429"));
    assert!(error.contains("rate_limit_error"));
    assert_eq!(result.provider, "anthropic");
    assert_eq!(result.cost, None);
}

#[tokio::test]
async fn test_anthropic_malformed_body_is_a_parse_error()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1/messages")
      .with_status(200)
      .with_body(r#"{"content": "not a list"}"#)
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-test", &endpoint("anthropic", &server)
    ).unwrap();
    let result = client
      .generate(&request("anthropic", "claude-3-haiku-20240307", "hello"))
      .await;

    assert!(result.error.unwrap().starts_with("Parse error"));
    assert!(result.text.is_empty());
}

#[tokio::test]
async fn test_anthropic_connection_check_uses_the_supplied_key()
{   let mut server = Server::new_async().await;
    let good = server.mock("POST", "/v1/messages")
      .match_header("x-api-key", "ak-check")
      .match_body(Matcher::PartialJson(json!({
        "model": "claude-3-haiku-20240307",
        "max_tokens": 5
      })))
      .with_status(200)
      .with_body(r#"{"content":[{"type":"text","text":"Hi"}]}"#)
      .create_async()
      .await;

    let client = AnthropicClient::with_config(
      "ak-stored", &endpoint("anthropic", &server)
    ).unwrap();

    assert!(client.test_connection("ak-check").await);
    assert!(!client.test_connection("ak-other").await);
    good.assert_async().await;
}

// ===== Google =====

#[tokio::test]
async fn test_google_estimates_units_when_usage_is_missing()
{   let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1beta/models/gemini-pro:generateContent")
      .match_header("x-goog-api-key", "g-test")
      .match_body(Matcher::PartialJson(json!({
        "contents": [{ "parts": [{ "text": "one two three" }] }],
        "generationConfig": { "maxOutputTokens": 100 }
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(json!({
        "candidates": [
          { "content": { "parts": [{ "text": "four five six seven" }] } }
        ]
      }).to_string())
      .create_async()
      .await;

    let client = GoogleClient::with_config(
      "g-test", &endpoint("google", &server)
    ).unwrap();
    let result = client
      .generate(&request("google", "gemini-pro", "one two three"))
      .await;

    mock.assert_async().await;
    assert_eq!(result.text, "four five six seven");
    // 7 words: 3 priced as input, 4 as output
    assert_eq!(result.tokens_used, Some(7));
    let expected = 3.0 * 0.0005 / 1000.0 + 4.0 * 0.0015 / 1000.0;
    assert!((result.cost.unwrap() - expected).abs() < 1e-15);
}

#[tokio::test]
async fn test_google_reported_usage_is_not_split()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1beta/models/gemini-1.5-pro:generateContent")
      .with_status(200)
      .with_body(json!({
        "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
        "usageMetadata": {
          "promptTokenCount": 1000,
          "candidatesTokenCount": 0,
          "totalTokenCount": 1000
        }
      }).to_string())
      .create_async()
      .await;

    let client = GoogleClient::with_config(
      "g-test", &endpoint("google", &server)
    ).unwrap();
    let result = client
      .generate(&request("google", "gemini-1.5-pro", "a long prompt"))
      .await;

    assert_eq!(result.tokens_used, Some(1000));
    assert!((result.cost.unwrap() - 0.0035).abs() < 1e-12);
}

#[tokio::test]
async fn test_google_malformed_body_is_a_parse_error()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1beta/models/gemini-pro:generateContent")
      .with_status(200)
      .with_body("<html>not json</html>")
      .create_async()
      .await;

    let client = GoogleClient::with_config(
      "g-test", &endpoint("google", &server)
    ).unwrap();
    let result = client
      .generate(&request("google", "gemini-pro", "hi"))
      .await;

    assert!(result.error.unwrap().starts_with("Parse error"));
    assert!(result.text.is_empty());
    assert_eq!(result.tokens_used, None);
}

#[tokio::test]
async fn test_google_connection_check_uses_the_supplied_key()
{   let mut server = Server::new_async().await;
    let good = server.mock("POST", "/v1beta/models/gemini-pro:generateContent")
      .match_header("x-goog-api-key", "g-check")
      .match_body(Matcher::PartialJson(json!({
        "contents": [{ "parts": [{ "text": "Hello" }] }],
        "generationConfig": { "maxOutputTokens": 5 }
      })))
      .with_status(200)
      .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Hi"}]}}]}"#)
      .create_async()
      .await;

    let client = GoogleClient::with_config(
      "g-stored", &endpoint("google", &server)
    ).unwrap();

    assert!(client.test_connection("g-check").await);
    assert!(!client.test_connection("g-other").await);
    good.assert_async().await;
}

#[tokio::test]
async fn test_google_overflowing_usage_is_an_error_result()
{   let mut server = Server::new_async().await;
    let _mock = server.mock("POST", "/v1beta/models/gemini-pro:generateContent")
      .with_status(200)
      .with_body(json!({
        "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
        "usageMetadata": {
          "promptTokenCount": u64::MAX,
          "candidatesTokenCount": 1
        }
      }).to_string())
      .create_async()
      .await;

    let client = GoogleClient::with_config(
      "g-test", &endpoint("google", &server)
    ).unwrap();
    let result = client
      .generate(&request("google", "gemini-pro", "hi"))
      .await;

    assert!(result.error.unwrap().starts_with("Parse error"));
    assert_eq!(result.tokens_used, None);
    assert_eq!(result.cost, None);
}

// ===== Coordinator over HTTP =====

#[tokio::test]
async fn test_coordinator_fans_out_to_real_adapters()
{   let mut server = Server::new_async().await;
    let openai = server.mock("POST", "/v1/chat/completions")
      .with_status(200)
      .with_body(json!({
        "choices": [{ "message": { "content": "from openai" } }],
        "usage": { "prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2 }
      }).to_string())
      .create_async()
      .await;
    let google = server.mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
      .with_status(500)
      .with_body("backend unavailable")
      .create_async()
      .await;

    let config = CoordinatorConfig
    {   providers: vec![
          endpoint("openai", &server)
        , endpoint("google", &server)
        ]
      , ..CoordinatorConfig::with_credentials([
          ("openai", "sk-test")
        , ("google", "g-test")
        ])
    };
    let coordinator = Coordinator::new(config).unwrap();

    let results = coordinator
      .dispatch_batch(
        "hi"
      , &[
          ModelSelection::new("google", "gemini-1.5-flash")
        , ModelSelection::new("anthropic", "claude-3-opus-20240229")
        , ModelSelection::new("openai", "gpt-4-turbo")
        ]
      , None
      , None
      )
      .await;

    openai.assert_async().await;
    google.assert_async().await;
    assert_eq!(results.len(), 3);
    assert!(results[0].error.as_deref().unwrap().contains("500"));
    assert_eq!(
      results[1].error.as_deref()
    , Some("Provider anthropic not configured")
    );
    assert_eq!(results[2].text, "from openai");
    assert!(results[2].error.is_none());
}

// ===== Live vendors (need real keys) =====

async fn live_check(provider: &str, model: &str, env_var: &str)
{   fanllm::init_logging();
    let Ok(key) = std::env::var(env_var)
    else
    {   println!("Skipping: {} not set", env_var);
        return;
    };
    let coordinator = Coordinator::from_credentials([(provider, key.as_str())])
      .unwrap();
    let results = coordinator
      .dispatch_batch(
        "What is 2+2?"
      , &[ModelSelection::new(provider, model)]
      , None
      , Some(20)
      )
      .await;
    println!("{:?}", results[0]);
    assert!(results[0].error.is_none());
    assert!(!results[0].text.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_live_openai()
{   live_check("openai", "gpt-3.5-turbo", "OPENAI_API_KEY").await;
}

#[tokio::test]
#[ignore]
async fn test_live_anthropic()
{   live_check("anthropic", "claude-3-haiku-20240307", "ANTHROPIC_API_KEY").await;
}

#[tokio::test]
#[ignore]
async fn test_live_google()
{   live_check("google", "gemini-1.5-flash", "GOOGLE_API_KEY").await;
}
