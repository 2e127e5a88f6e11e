//! Preset configuration for the appointment-booking concierge agent.
//!
//! The payload is constant except for the post-call webhook URL. The
//! extracted variables listed here are the fields the webhook receiver in
//! [`crate::api_workflow`] looks for.

use serde_json::{json, Map, Value};

/// Webhook used when a concierge creation request does not provide one.
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5000/omnidim-webhook";

/// Display name of the preset agent. The workflow endpoint finds an existing
/// concierge by looking for this word in agent names.
pub const CONCIERGE_NAME: &str = "AI Concierge";

/// Variables the agent extracts from each conversation, with the prompt the
/// platform uses to fill them.
pub const EXTRACTED_VARIABLES: [(&str, &str); 6] = [
    (
        "appointment_date",
        "The confirmed appointment date and time in ISO 8601 format.",
    ),
    (
        "business_name",
        "The name of the business or provider the appointment was booked with.",
    ),
    ("business_phone", "The phone number of the business."),
    ("business_address", "The street address of the business."),
    (
        "appointment_type",
        "The kind of appointment or service that was booked.",
    ),
    (
        "special_instructions",
        "Any instructions the business gave for the appointment.",
    ),
];

/// Builds the concierge agent configuration pointing at `webhook_url`.
pub fn concierge_payload(webhook_url: &str) -> Map<String, Value> {
    let extracted_variables: Vec<Value> = EXTRACTED_VARIABLES
        .iter()
        .map(|(key, prompt)| json!({ "key": key, "prompt": prompt }))
        .collect();

    let mut payload = Map::new();
    payload.insert("name".into(), json!(CONCIERGE_NAME));
    payload.insert(
        "welcome_message".into(),
        json!(
            "Hello! This is an AI concierge calling on behalf of a client. \
             I'd like to book an appointment, do you have a moment?"
        ),
    );
    payload.insert(
        "context_breakdown".into(),
        json!([
            {
                "title": "Purpose",
                "body": "You are a polite, efficient concierge that books appointments on \
                         behalf of a client. The client's request is provided in the \
                         user_instruction call variable. Use it to decide what to book.",
                "is_enabled": true
            },
            {
                "title": "Finding a provider",
                "body": "When the request names no specific business, search the web for a \
                         well-rated provider near the client and call the best option.",
                "is_enabled": true
            },
            {
                "title": "Booking",
                "body": "Ask for the earliest available slot that fits the request. Confirm \
                         the date, time, business name, phone number, address, appointment \
                         type, and any special instructions before ending the call.",
                "is_enabled": true
            },
            {
                "title": "Conduct",
                "body": "Be concise and courteous. Never share personal details beyond what \
                         the booking requires. If the business cannot help, thank them and \
                         end the call.",
                "is_enabled": true
            }
        ]),
    );
    payload.insert("call_type".into(), json!("Outgoing"));
    payload.insert(
        "transcriber".into(),
        json!({ "provider": "deepgram_stream", "silence_timeout_ms": 400 }),
    );
    payload.insert(
        "model".into(),
        json!({ "model": "gpt-4o-mini", "temperature": 0.7 }),
    );
    payload.insert(
        "voice".into(),
        json!({ "provider": "eleven_labs", "voice_id": "JBFqnCBsd6RMkjVDRZzb" }),
    );
    payload.insert(
        "web_search".into(),
        json!({ "enabled": true, "provider": "DuckDuckGo" }),
    );
    payload.insert(
        "post_call_actions".into(),
        json!({
            "webhook": {
                "enabled": true,
                "url": webhook_url,
                "include": ["summary", "fullConversation", "sentiment", "extracted_variables"],
                "extracted_variables": extracted_variables
            }
        }),
    );

    payload
}
