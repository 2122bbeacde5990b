use crate::error::Result;
use crate::options::Buffering;
use crate::pipeline::{decode_in_place, encode_in_place};
use crate::storage::{read_file, write_file};
use std::path::Path;

/// Encode `input` into `output`, returning the number of bytes written
pub fn encode_file(input: &Path, output: &Path) -> Result<usize> {
    transform_file(input, output, encode_in_place)
}

/// Decode `input` into `output`, returning the number of bytes written
pub fn decode_file(input: &Path, output: &Path) -> Result<usize> {
    transform_file(input, output, decode_in_place)
}

fn transform_file(input: &Path, output: &Path, apply: fn(&mut [u8])) -> Result<usize> {
    let mut data = read_file(input, Buffering::LargeBuffer)?;
    apply(&mut data);
    write_file(output, &data, Buffering::LargeBuffer)?;
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encode_decode_files() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let coded = dir.path().join("coded.txt");
        let back = dir.path().join("back.txt");
        std::fs::write(&plain, b"Hello123").unwrap();

        assert_eq!(encode_file(&plain, &coded).unwrap(), 8);
        assert_eq!(std::fs::read(&coded).unwrap(), b"Khoor876");

        decode_file(&coded, &back).unwrap();
        assert_eq!(std::fs::read(&back).unwrap(), b"Hello123");
    }
}
