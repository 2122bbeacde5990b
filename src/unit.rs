//! Per-copy state machine.
//!
//! ```text
//! Created → Duplicated → Encoded → DigestComputed ─┬→ DigestFailed
//!                                                  └→ DigestVerified → Decoded ─┬→ IdentityVerified
//!                                                                               └→ IdentityFailed
//! ```
//!
//! Transitions are strictly forward, one step at a time. A storage failure
//! parks the unit at its current stage with an `IoFailure` outcome; it is
//! never retried.

use crate::error::{BenchError, Result};
use crate::options::IoPath;
use crate::pipeline::{decode, digest, encode_in_place};
use crate::report::Outcome;
use crate::storage::{copy_name, decoded_name, digest_name, Storage};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Created,
    Duplicated,
    Encoded,
    DigestComputed,
    DigestVerified,
    DigestFailed,
    Decoded,
    IdentityVerified,
    IdentityFailed,
}

impl Stage {
    /// Whether `next` is the immediate successor of `self`
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Created, Duplicated)
                | (Duplicated, Encoded)
                | (Encoded, DigestComputed)
                | (DigestComputed, DigestVerified)
                | (DigestComputed, DigestFailed)
                | (DigestVerified, Decoded)
                | (Decoded, IdentityVerified)
                | (Decoded, IdentityFailed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::DigestFailed | Stage::IdentityVerified | Stage::IdentityFailed
        )
    }
}

/// Byte-length and byte-content equality. Pure; never mutates either side.
pub fn identical(decoded: &[u8], original: &[u8]) -> bool {
    decoded.len() == original.len() && decoded == original
}

/// Persisted digest text with one trailing newline tolerated
fn stored_digest_text(raw: &[u8]) -> &[u8] {
    raw.strip_suffix(b"\r\n")
        .or_else(|| raw.strip_suffix(b"\n"))
        .unwrap_or(raw)
}

/// One copy of the source, owned by whichever worker is processing it
#[derive(Debug)]
pub struct FileUnit {
    index: usize,
    stage: Stage,
    /// Bytes of the main copy as last written
    current: Vec<u8>,
    /// Set together with `current` at encode time and never after
    digest: Option<String>,
    decoded: Option<Vec<u8>>,
    failure: Option<Outcome>,
}

impl FileUnit {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            stage: Stage::Created,
            current: Vec::new(),
            digest: None,
            decoded: None,
            failure: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn current_bytes(&self) -> &[u8] {
        &self.current
    }

    pub fn decoded_bytes(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    /// First failure this unit hit, if any
    pub fn failure(&self) -> Option<Outcome> {
        self.failure
    }

    /// Still eligible for the next phase
    pub fn is_live(&self) -> bool {
        self.failure.is_none() && !self.stage.is_terminal()
    }

    /// `Success` once identity is verified, the failure if one occurred,
    /// `None` while the unit is still mid-pipeline
    pub fn final_outcome(&self) -> Option<Outcome> {
        match (self.failure, self.stage) {
            (Some(outcome), _) => Some(outcome),
            (None, Stage::IdentityVerified) => Some(Outcome::Success),
            _ => None,
        }
    }

    fn check(&self, next: Stage) -> Result<()> {
        if self.failure.is_some() || !self.stage.can_advance_to(next) {
            return Err(BenchError::StageOrder {
                index: self.index,
                from: self.stage,
                to: next,
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: Stage) -> Result<()> {
        self.check(next)?;
        self.stage = next;
        Ok(())
    }

    /// Record failures so the unit drops out of later phases
    fn settle(&mut self, result: Result<Outcome>) -> Result<Outcome> {
        match &result {
            Ok(outcome) if outcome.is_failure() => self.failure = Some(*outcome),
            Err(BenchError::StageOrder { .. }) => {}
            Err(_) => self.failure = Some(Outcome::IoFailure),
            Ok(_) => {}
        }
        result
    }

    /// Created → Duplicated
    pub fn duplicate(&mut self, source: &[u8], storage: &Storage) -> Result<Outcome> {
        let result = self.duplicate_inner(source, storage);
        self.settle(result)
    }

    fn duplicate_inner(&mut self, source: &[u8], storage: &Storage) -> Result<Outcome> {
        self.check(Stage::Duplicated)?;
        storage.write(&copy_name(self.index), source)?;
        self.current = source.to_vec();
        self.advance(Stage::Duplicated)?;
        Ok(Outcome::Success)
    }

    /// Duplicated → Encoded → DigestComputed
    pub fn transform(&mut self, storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        let result = self.transform_inner(storage, io_path);
        self.settle(result)
    }

    fn transform_inner(&mut self, storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        self.check(Stage::Encoded)?;
        let name = copy_name(self.index);

        let mut bytes = match io_path {
            IoPath::ReadBack => storage.read(&name)?,
            IoPath::InMemory => std::mem::take(&mut self.current),
        };
        encode_in_place(&mut bytes);
        storage.write(&name, &bytes)?;
        self.current = bytes;
        self.advance(Stage::Encoded)?;

        let fingerprint = digest(&self.current);
        storage.write(&digest_name(self.index), fingerprint.as_bytes())?;
        self.digest = Some(fingerprint);
        self.advance(Stage::DigestComputed)?;
        Ok(Outcome::Success)
    }

    /// DigestComputed → DigestVerified → Decoded, or DigestComputed → DigestFailed
    pub fn verify_and_decode(&mut self, storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        let result = self.verify_and_decode_inner(storage, io_path);
        self.settle(result)
    }

    fn verify_and_decode_inner(&mut self, storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        self.check(Stage::DigestVerified)?;

        let stored = storage.read(&digest_name(self.index))?;
        let reread = match io_path {
            IoPath::ReadBack => Some(storage.read(&copy_name(self.index))?),
            IoPath::InMemory => None,
        };
        let verified: &[u8] = reread.as_deref().unwrap_or(self.current.as_slice());

        let recomputed = digest(verified);
        if recomputed.as_bytes() != stored_digest_text(&stored) {
            debug!(unit = self.index, "stored digest does not match recomputed digest");
            self.advance(Stage::DigestFailed)?;
            return Ok(Outcome::HashMismatch);
        }
        let decoded = decode(verified);
        self.advance(Stage::DigestVerified)?;

        storage.write(&decoded_name(self.index), &decoded)?;
        self.decoded = Some(decoded);
        self.advance(Stage::Decoded)?;
        Ok(Outcome::Success)
    }

    /// Decoded → IdentityVerified | IdentityFailed
    pub fn compare(&mut self, original: &[u8], storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        let result = self.compare_inner(original, storage, io_path);
        self.settle(result)
    }

    fn compare_inner(&mut self, original: &[u8], storage: &Storage, io_path: IoPath) -> Result<Outcome> {
        self.check(Stage::IdentityVerified)?;

        let matches = match io_path {
            IoPath::ReadBack => identical(&storage.read(&decoded_name(self.index))?, original),
            IoPath::InMemory => identical(self.decoded.as_deref().unwrap_or_default(), original),
        };

        if matches {
            self.advance(Stage::IdentityVerified)?;
            Ok(Outcome::Success)
        } else {
            debug!(unit = self.index, "decoded bytes differ from source");
            self.advance(Stage::IdentityFailed)?;
            Ok(Outcome::ContentMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Buffering;
    use tempfile::tempdir;

    const SOURCE: &[u8] = b"Hello123";

    fn run_all(unit: &mut FileUnit, storage: &Storage, io_path: IoPath) -> Vec<Outcome> {
        vec![
            unit.duplicate(SOURCE, storage).unwrap(),
            unit.transform(storage, io_path).unwrap(),
            unit.verify_and_decode(storage, io_path).unwrap(),
            unit.compare(SOURCE, storage, io_path).unwrap(),
        ]
    }

    #[test]
    fn test_full_lifecycle_both_paths() {
        for io_path in [IoPath::ReadBack, IoPath::InMemory] {
            let dir = tempdir().unwrap();
            let storage = Storage::new(dir.path(), Buffering::Unbuffered);
            let mut unit = FileUnit::new(1);

            let outcomes = run_all(&mut unit, &storage, io_path);
            assert!(outcomes.iter().all(|o| *o == Outcome::Success));
            assert_eq!(unit.stage(), Stage::IdentityVerified);
            assert_eq!(unit.final_outcome(), Some(Outcome::Success));

            assert_eq!(storage.read("1.txt").unwrap(), b"Khoor876");
            assert_eq!(storage.read("1_2.txt").unwrap(), SOURCE);
            let stored = storage.read("1.sha").unwrap();
            assert_eq!(stored, digest(b"Khoor876").as_bytes());
            assert_eq!(unit.digest(), Some(digest(b"Khoor876").as_str()));
        }
    }

    #[test]
    fn test_digest_tracks_encoded_bytes() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::LargeBuffer);
        let mut unit = FileUnit::new(4);
        unit.duplicate(SOURCE, &storage).unwrap();
        unit.transform(&storage, IoPath::InMemory).unwrap();
        unit.verify_and_decode(&storage, IoPath::InMemory).unwrap();

        // Decoding goes to a separate buffer; the digest still describes `current`
        assert_eq!(unit.current_bytes(), b"Khoor876");
        assert_eq!(unit.digest(), Some(digest(unit.current_bytes()).as_str()));
        assert_eq!(unit.decoded_bytes(), Some(SOURCE));
    }

    #[test]
    fn test_stage_skipping_rejected() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        let mut unit = FileUnit::new(2);

        let err = unit.transform(&storage, IoPath::InMemory).unwrap_err();
        assert!(matches!(
            err,
            BenchError::StageOrder { from: Stage::Created, to: Stage::Encoded, .. }
        ));
        // A protocol violation does not mark the unit failed
        assert!(unit.is_live());

        unit.duplicate(SOURCE, &storage).unwrap();
        assert!(unit.duplicate(SOURCE, &storage).is_err(), "re-entry must be rejected");
    }

    #[test]
    fn test_tampered_digest_stops_before_decode() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        let mut unit = FileUnit::new(3);
        unit.duplicate(SOURCE, &storage).unwrap();
        unit.transform(&storage, IoPath::InMemory).unwrap();

        let mut stored = storage.read("3.sha").unwrap();
        stored[0] ^= 0x01;
        storage.write("3.sha", &stored).unwrap();

        let outcome = unit.verify_and_decode(&storage, IoPath::InMemory).unwrap();
        assert_eq!(outcome, Outcome::HashMismatch);
        assert_eq!(unit.stage(), Stage::DigestFailed);
        assert!(!unit.is_live());
        assert!(!storage.exists("3_2.txt"));
        assert!(unit.compare(SOURCE, &storage, IoPath::InMemory).is_err());
    }

    #[test]
    fn test_tampered_copy_detected_on_read_back() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        let mut unit = FileUnit::new(5);
        unit.duplicate(SOURCE, &storage).unwrap();
        unit.transform(&storage, IoPath::ReadBack).unwrap();

        storage.write("5.txt", b"Khoor877").unwrap();
        let outcome = unit.verify_and_decode(&storage, IoPath::ReadBack).unwrap();
        assert_eq!(outcome, Outcome::HashMismatch);
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        let mut unit = FileUnit::new(6);
        unit.duplicate(SOURCE, &storage).unwrap();
        unit.transform(&storage, IoPath::InMemory).unwrap();

        let mut stored = storage.read("6.sha").unwrap();
        stored.extend_from_slice(b"\n");
        storage.write("6.sha", &stored).unwrap();

        let outcome = unit.verify_and_decode(&storage, IoPath::InMemory).unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_content_mismatch() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        let mut unit = FileUnit::new(7);
        unit.duplicate(SOURCE, &storage).unwrap();
        unit.transform(&storage, IoPath::ReadBack).unwrap();
        unit.verify_and_decode(&storage, IoPath::ReadBack).unwrap();

        storage.write("7_2.txt", b"Hello124").unwrap();
        let outcome = unit.compare(SOURCE, &storage, IoPath::ReadBack).unwrap();
        assert_eq!(outcome, Outcome::ContentMismatch);
        assert_eq!(unit.stage(), Stage::IdentityFailed);
        assert_eq!(unit.final_outcome(), Some(Outcome::ContentMismatch));
    }

    #[test]
    fn test_storage_failure_parks_unit() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path(), Buffering::Unbuffered);
        std::fs::create_dir(dir.path().join("8.sha")).unwrap();

        let mut unit = FileUnit::new(8);
        unit.duplicate(SOURCE, &storage).unwrap();
        let err = unit.transform(&storage, IoPath::InMemory).unwrap_err();
        assert!(matches!(err, BenchError::Storage { .. }));
        assert_eq!(unit.failure(), Some(Outcome::IoFailure));
        assert_eq!(unit.stage(), Stage::Encoded);
        assert!(!unit.is_live());
    }

    #[test]
    fn test_identity_check_is_repeatable() {
        let a = b"same bytes".to_vec();
        let b = b"same bytes".to_vec();
        assert_eq!(identical(&a, &b), identical(&a, &b));
        assert!(identical(&a, &b));
        assert!(!identical(&a[..4], &b));
        assert_eq!(a, b"same bytes");
    }
}
