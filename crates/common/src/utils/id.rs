use uuid::Uuid;

/// Generate a unique identifier for one forwarding connection using UUID v4
pub fn generate_connection_id() -> String {
    format!("conn_{}", Uuid::new_v4())
}
