//! Embedding encoding and the vector distance SQL function

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the distance function available in SQL
pub const COSINE_DISTANCE_FN: &str = "cosine_distance";

/// Encode an embedding as little-endian `f32` bytes
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian `f32` blob. Trailing partial chunks are dropped.
pub fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// `1 - cosine_similarity`, in `[0, 2]`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Register `cosine_distance(blob, blob) -> real` on `conn`
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        COSINE_DISTANCE_FN,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a = ctx
                .get_raw(0)
                .as_blob()
                .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            let b = ctx
                .get_raw(1)
                .as_blob()
                .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            let distance = cosine_distance(&decode_embedding(a), &decode_embedding(b));
            Ok(f64::from(distance))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_layout() {
        let blob = encode_embedding(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_embedding(&blob), vec![1.0, -0.5]);
    }

    #[test]
    fn test_cosine_distance_edges() {
        assert!(cosine_distance(&[1.0, 1.0], &[2.0, 2.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        // zero vectors and mismatched lengths are maximally uninformative
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_sql_function_orders_rows() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();

        conn.execute("CREATE TABLE v (name TEXT, embedding BLOB)", []).unwrap();
        for (name, vector) in [("near", [0.1f32, 1.0]), ("far", [10.0, 1.0])] {
            conn.execute(
                "INSERT INTO v (name, embedding) VALUES (?1, ?2)",
                rusqlite::params![name, encode_embedding(&vector)],
            )
            .unwrap();
        }

        let query = encode_embedding(&[0.1, 1.0]);
        let nearest: String = conn
            .query_row(
                "SELECT name FROM v ORDER BY cosine_distance(embedding, ?1) ASC LIMIT 1",
                [query],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nearest, "near");
    }
}
