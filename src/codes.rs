use rand::Rng;
use sqlx::PgPool;

use crate::db;
use crate::error::AppError;

/// Human-entry alphabet. I, O, 0 and 1 are excluded because they are
/// routinely mistranscribed from printed cards.
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const MEMBER_CODE_LEN: usize = 7;
const HOUSEHOLD_CODE_LEN: usize = 5;

pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn generate_member_code() -> String {
    generate_code(MEMBER_CODE_LEN)
}

pub fn generate_household_code() -> String {
    generate_code(HOUSEHOLD_CODE_LEN)
}

/// 12-digit numeric barcode. Drawn from a range with a non-zero leading
/// digit so scanners and spreadsheets don't drop leading zeros.
pub fn generate_barcode() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000_000_000u64..=999_999_999_999u64)
        .to_string()
}

/// 6-digit zero-padded one-time passcode.
pub fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..=999_999u32))
}

/// Allocate a barcode not present in the store. The uniqueness check is
/// read-then-write; the unique index on members.barcode is the backstop
/// under concurrent allocation.
pub async fn allocate_barcode(pool: &PgPool) -> Result<String, AppError> {
    for _ in 0..10 {
        let candidate = generate_barcode();
        if !db::members::barcode_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
    tracing::error!("failed to allocate a unique barcode after 10 attempts");
    Err(AppError::Internal(
        "Failed to generate unique barcode".to_string(),
    ))
}

pub async fn allocate_member_code(pool: &PgPool) -> Result<String, AppError> {
    for _ in 0..5 {
        let candidate = generate_member_code();
        if !db::members::member_code_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
    tracing::error!("failed to allocate a unique member code after 5 attempts");
    Err(AppError::Internal(
        "Failed to generate unique member code".to_string(),
    ))
}

pub async fn allocate_household_code(pool: &PgPool) -> Result<String, AppError> {
    for _ in 0..5 {
        let candidate = generate_household_code();
        if !db::households::code_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
    tracing::error!("failed to allocate a unique household code after 5 attempts");
    Err(AppError::Internal(
        "Failed to generate unique account code".to_string(),
    ))
}
