use anyhow::Result;

/// bcrypt runs on the blocking pool; a high cost would otherwise stall the worker.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// Malformed hashes count as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(verified) => verified.unwrap_or(false),
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}
