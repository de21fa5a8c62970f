use uuid::Uuid;

/// Generate a fresh object key for a stored image.
///
/// 128-bit random identifier, so identical prompts still get distinct keys.
pub fn object_key() -> String {
    format!("{}.png", Uuid::new_v4())
}
