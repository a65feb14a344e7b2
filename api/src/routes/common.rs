use axum::extract::rejection::JsonRejection;
use validator::ValidationErrors;

/// First message of each failed field, joined into one line.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            errs.first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{field} is invalid"))
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Body rejections are reported as a plain `400` message.
pub fn format_json_rejection(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected a JSON body".to_string(),
        other => format!("Invalid request body: {}", other.body_text()),
    }
}

/// Page and page size for list endpoints: page defaults to 1, size to 20 and is capped at 100.
pub fn clamp_pagination(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    (
        page.unwrap_or(1).max(1),
        per_page.unwrap_or(20).clamp(1, 100),
    )
}
