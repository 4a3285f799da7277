//! Card id formatting

use cardkit_core::CardDocument;

/// Build a card id from a display name and card type
///
/// The id is the lowercased type, an underscore, then the lowercased name
/// with every character outside `[a-z0-9]` replaced by an underscore.
pub fn name_to_id(name: &str, card_type: &str) -> String {
    let mut id = card_type.to_lowercase();
    id.push('_');
    id.extend(name.to_lowercase().chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c
        } else {
            '_'
        }
    }));
    id
}

/// Id for a card from its `name` and `type` fields
///
/// Returns `None` if either field is missing or not a string.
pub fn card_id(card: &CardDocument) -> Option<String> {
    let name = card.get("name")?.as_str()?;
    let card_type = card.get("type")?.as_str()?;
    Some(name_to_id(name, card_type))
}
