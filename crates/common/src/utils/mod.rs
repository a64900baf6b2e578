mod id;

pub use id::generate_connection_id;
