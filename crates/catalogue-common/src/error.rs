use reqwest::StatusCode;

/// Errors raised by the chat-completions client.
///
/// Application crates wrap this via `#[from]` in their own error enums;
/// route handlers typically convert it into a user-facing fallback string
/// rather than surfacing it to the browser.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("reply missing choices[0].message.content")]
    EmptyReply,
}
