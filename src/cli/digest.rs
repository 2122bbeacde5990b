use crate::error::{BenchError, Result};
use crate::pipeline::Sha256;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file in fixed-size chunks and return a sha256sum-style line
pub fn digest_file(path: &Path) -> Result<String> {
    let storage_err = |e: std::io::Error| BenchError::storage(path.display().to_string(), e);

    let mut file = File::open(path).map_err(storage_err)?;
    let mut hasher = Sha256::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut chunk).map_err(storage_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
    }

    Ok(format!("{}  {}\n", hasher.finish_hex(), path.display()))
}
