//! File digests for every [`ChecksumAlgorithm`]

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake2::Blake2b512;
use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::integrity::algorithm::ChecksumAlgorithm;

/// Read buffer size for hashing large images
const READ_CHUNK_SIZE: usize = 512 * 1024;

/// Compute the lowercase hex digest of the file at `path`
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    digest_reader(file, algorithm)
}

/// Compute the lowercase hex digest of everything `reader` yields
pub fn digest_reader<R: Read>(reader: R, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    match algorithm {
        ChecksumAlgorithm::Md5 => digest_with::<Md5, _>(reader),
        ChecksumAlgorithm::Sha1 => digest_with::<Sha1, _>(reader),
        ChecksumAlgorithm::Sha256 => digest_with::<Sha256, _>(reader),
        ChecksumAlgorithm::Sha512 => digest_with::<Sha512, _>(reader),
        ChecksumAlgorithm::Blake2b => digest_with::<Blake2b512, _>(reader),
        ChecksumAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            read_chunks(reader, |chunk| {
                hasher.update(chunk);
            })?;
            Ok(hasher.finalize().to_hex().to_string())
        }
    }
}

fn digest_with<D: Digest, R: Read>(reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    read_chunks(reader, |chunk| hasher.update(chunk))?;
    Ok(hex::encode(hasher.finalize()))
}

fn read_chunks<R: Read>(mut reader: R, mut consume: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            return Ok(());
        }
        consume(&buffer[..bytes_read]);
    }
}
