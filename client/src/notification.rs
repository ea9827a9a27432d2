use chrono::Utc;
use inkwell_shared::Envelope;
use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A novel envelope currently in the visible list.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedNotification {
    /// Client-side id used for dismissal
    pub id: String,
    pub envelope: Envelope,
}

impl DisplayedNotification {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            id: new_display_id(),
            envelope,
        }
    }
}

/// `<unix-millis>-<9 base36 chars>`
pub fn new_display_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}
