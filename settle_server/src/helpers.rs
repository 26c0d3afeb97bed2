use hmac::{digest::InvalidLength, Hmac, Mac};
use log::trace;
use settle_engine::Room;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Calculates the base64-encoded HMAC-SHA256 of `data`, keyed with `secret`. This is the value the chain relay puts
/// in the `X-Settle-Hmac-SHA256` header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(data);
    Ok(base64::encode(mac.finalize().into_bytes()))
}

/// Checks a base64-encoded signature against `data` in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        trace!("🔐️ HMAC signature is not valid base64");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// Parses the `rooms` query parameter of a WebSocket upgrade, e.g. `business:1,bill:7`. Blank entries are ignored.
pub fn parse_rooms(rooms: Option<&str>) -> Vec<Room> {
    rooms
        .map(|s| s.split(',').map(str::trim).filter(|r| !r.is_empty()).map(Room::from).collect())
        .unwrap_or_default()
}
