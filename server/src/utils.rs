use rand::Rng;
use serde_json::Value;
use shared::{DEFAULT_PLAYER_NAME, MAX_CHAT_LEN, MAX_NAME_LEN, PLAYER_ID_PREFIX};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

// Mint a fresh `player-xxxxxxxxx` identity
pub fn generate_player_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", PLAYER_ID_PREFIX, suffix)
}

// Random hue, fixed saturation and lightness
pub fn random_color() -> String {
    let hue = rand::thread_rng().gen_range(0..360);
    format!("hsl({}, 70%, 60%)", hue)
}

/// Normalizes a client-supplied display name.
///
/// Non-strings and blank strings become the default name; everything else is
/// trimmed and cut to `MAX_NAME_LEN` characters.
pub fn sanitize_name(input: Option<&Value>) -> String {
    match input.and_then(Value::as_str).map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.chars().take(MAX_NAME_LEN).collect(),
        _ => DEFAULT_PLAYER_NAME.to_string(),
    }
}

/// Accepts a client-supplied identity token if it has the shape of a player
/// id. Shape only: any client may claim any well-formed id.
pub fn resolve_client_id(input: Option<&Value>) -> Option<String> {
    let trimmed = input.and_then(Value::as_str)?.trim();
    if trimmed.len() > PLAYER_ID_PREFIX.len() && trimmed.starts_with(PLAYER_ID_PREFIX) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

pub fn sanitize_chat(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_CHAT_LEN).collect())
}
